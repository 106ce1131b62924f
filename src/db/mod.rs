pub mod post_repository;
pub mod user_repository;

use rand_core::{OsRng, RngCore};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} already exists")]
    Duplicate(&'static str),
    #[error("storage error: {0}")]
    Backend(#[from] sled::Error),
    #[error("failed to encode record: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("failed to decode record: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("corrupt index entry: {0}")]
    CorruptIndex(String),
}

#[derive(Clone)]
pub struct Database {
    pub db: sled::Db,
}

impl Database {
    pub fn new(path: &str) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Database { db })
    }

    /// A database that lives only as long as the handle. Used by tests.
    #[cfg(test)]
    pub fn in_memory() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Database { db })
    }

    /// Cheap liveness probe used by the health endpoint.
    pub fn ping(&self) -> Result<(), StoreError> {
        self.db.get(b"__ping__")?;
        Ok(())
    }
}

/// Generates a 24-character hex identifier: 4 bytes of creation time
/// followed by 8 random bytes.
pub fn new_object_id() -> String {
    let mut bytes = [0u8; 12];
    let secs = chrono::Utc::now().timestamp() as u32;
    bytes[..4].copy_from_slice(&secs.to_be_bytes());
    OsRng.fill_bytes(&mut bytes[4..]);
    hex::encode(bytes)
}
