use crate::db::{Database, StoreError};
use crate::models::user::User;
use bincode::{Decode, Encode};
use sled::transaction::{abort, TransactionError};
use sled::Transactional;
use std::str;
use tracing::info;

const USERS_TREE: &str = "users";
const USERNAME_INDEX_TREE: &str = "username_index";

#[derive(Debug, Encode, Decode)]
pub struct StoredUser {
    pub id: String,
    pub name: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: i64, // Store as timestamp
}

impl From<User> for StoredUser {
    fn from(user: User) -> Self {
        StoredUser {
            id: user.id,
            name: user.name,
            username: user.username,
            password_hash: user.password_hash,
            created_at: user.created_at.timestamp(),
        }
    }
}

impl From<StoredUser> for User {
    fn from(stored: StoredUser) -> Self {
        User {
            id: stored.id,
            name: stored.name,
            username: stored.username,
            password_hash: stored.password_hash,
            created_at: chrono::DateTime::from_timestamp(stored.created_at, 0)
                .unwrap_or_else(chrono::Utc::now),
        }
    }
}

#[derive(Debug)]
struct UsernameTaken;

/// Credential store: user records plus a unique username index.
#[derive(Clone)]
pub struct UserRepository {
    db: Database,
}

impl UserRepository {
    pub fn new(db: Database) -> Self {
        UserRepository { db }
    }

    /// Inserts `user`, failing with [`StoreError::Duplicate`] when the
    /// username is taken. Nothing is written in that case.
    pub async fn create(&self, user: User) -> Result<User, StoreError> {
        let users_tree = self.db.db.open_tree(USERS_TREE)?;
        let username_index = self.db.db.open_tree(USERNAME_INDEX_TREE)?;

        let stored_user = StoredUser::from(user.clone());
        let encoded = bincode::encode_to_vec(&stored_user, bincode::config::standard())?;

        // Index entry and record commit together or not at all.
        let outcome = (&users_tree, &username_index).transaction(|(users, index)| {
            if index.get(user.username.as_bytes())?.is_some() {
                return abort(UsernameTaken);
            }
            index.insert(user.username.as_bytes(), user.id.as_bytes())?;
            users.insert(user.id.as_bytes(), encoded.as_slice())?;
            Ok(())
        });

        match outcome {
            Ok(()) => {}
            Err(TransactionError::Abort(UsernameTaken)) => {
                return Err(StoreError::Duplicate("username"))
            }
            Err(TransactionError::Storage(e)) => return Err(e.into()),
        }

        info!(user_id = %user.id, username = %user.username, "User created in database");

        Ok(user)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        let users_tree = self.db.db.open_tree(USERS_TREE)?;

        match users_tree.get(id.as_bytes())? {
            Some(data) => {
                let (stored_user, _): (StoredUser, usize) =
                    bincode::decode_from_slice(&data, bincode::config::standard())?;
                Ok(Some(User::from(stored_user)))
            }
            None => Ok(None),
        }
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let username_index = self.db.db.open_tree(USERNAME_INDEX_TREE)?;

        match username_index.get(username.as_bytes())? {
            Some(user_id) => {
                let id = str::from_utf8(&user_id)
                    .map_err(|e| StoreError::CorruptIndex(format!("invalid user id: {e}")))?;
                self.get_by_id(id).await
            }
            None => Ok(None),
        }
    }
}
