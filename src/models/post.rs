use chrono::{DateTime, Utc};
use std::fmt;

/// Length of a stored post identifier in hex digits.
pub const POST_ID_LEN: usize = 24;

#[derive(Debug, Clone)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub image: String,
    pub excerpt: String,
    /// Id of the authoring user.
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identifier of a persisted post: exactly 24 hex digits, kept lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PostId(String);

impl PostId {
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() == POST_ID_LEN && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(PostId(raw.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A `/posts/{id}` path segment, classified once at the HTTP boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostKey {
    /// Looks like a database identifier.
    Stored(PostId),
    /// Anything else; only the demo catalog can answer it.
    Demo(String),
}

impl PostKey {
    pub fn classify(raw: &str) -> Self {
        match PostId::parse(raw) {
            Some(id) => PostKey::Stored(id),
            None => PostKey::Demo(raw.to_string()),
        }
    }
}
