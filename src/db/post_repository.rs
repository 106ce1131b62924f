use crate::db::{Database, StoreError};
use crate::models::post::{Post, PostId};
use bincode::{Decode, Encode};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

const POSTS_TREE: &str = "posts";

#[derive(Debug, Encode, Decode)]
pub struct StoredPost {
    pub id: String,
    pub title: String,
    pub content: String,
    pub image: String,
    pub excerpt: String,
    pub author: String,
    pub created_at: i64, // millis
    pub updated_at: i64, // millis
    /// Insertion order, breaks ties between equal `created_at` values.
    pub seq: u64,
}

impl StoredPost {
    fn new(post: Post, seq: u64) -> Self {
        StoredPost {
            id: post.id.to_string(),
            title: post.title,
            content: post.content,
            image: post.image,
            excerpt: post.excerpt,
            author: post.author,
            created_at: post.created_at.timestamp_millis(),
            updated_at: post.updated_at.timestamp_millis(),
            seq,
        }
    }
}

impl TryFrom<StoredPost> for Post {
    type Error = StoreError;

    fn try_from(stored: StoredPost) -> Result<Self, Self::Error> {
        let id = PostId::parse(&stored.id)
            .ok_or_else(|| StoreError::CorruptIndex(format!("invalid post id {:?}", stored.id)))?;
        Ok(Post {
            id,
            title: stored.title,
            content: stored.content,
            image: stored.image,
            excerpt: stored.excerpt,
            author: stored.author,
            created_at: from_millis(stored.created_at),
            updated_at: from_millis(stored.updated_at),
        })
    }
}

fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
}

fn decode_stored(data: &[u8]) -> Result<StoredPost, StoreError> {
    let (stored, _): (StoredPost, usize) =
        bincode::decode_from_slice(data, bincode::config::standard())?;
    Ok(stored)
}

/// Post store keyed by [`PostId`].
#[derive(Clone)]
pub struct PostRepository {
    db: Database,
}

impl PostRepository {
    pub fn new(db: Database) -> Self {
        PostRepository { db }
    }

    pub async fn create(&self, post: Post) -> Result<Post, StoreError> {
        let posts_tree = self.db.db.open_tree(POSTS_TREE)?;

        let seq = self.db.db.generate_id()?;
        let stored = StoredPost::new(post.clone(), seq);
        let encoded = bincode::encode_to_vec(&stored, bincode::config::standard())?;

        let claimed = posts_tree.compare_and_swap(
            post.id.as_str().as_bytes(),
            None::<&[u8]>,
            Some(encoded),
        )?;
        if claimed.is_err() {
            return Err(StoreError::Duplicate("post id"));
        }

        info!(post_id = %post.id, author = %post.author, "Post created in database");

        Ok(post)
    }

    pub async fn get_by_id(&self, id: &PostId) -> Result<Option<Post>, StoreError> {
        let posts_tree = self.db.db.open_tree(POSTS_TREE)?;

        match posts_tree.get(id.as_str().as_bytes())? {
            Some(data) => Post::try_from(decode_stored(&data)?).map(Some),
            None => Ok(None),
        }
    }

    /// Every stored post, most recently created first.
    pub async fn list_newest_first(&self) -> Result<Vec<Post>, StoreError> {
        let posts_tree = self.db.db.open_tree(POSTS_TREE)?;

        let mut stored_posts = Vec::new();
        for entry in posts_tree.iter() {
            let (key, data) = entry?;
            match decode_stored(&data) {
                Ok(stored) => stored_posts.push(stored),
                Err(e) => {
                    warn!(key = %String::from_utf8_lossy(&key), error = %e, "Skipping undecodable post");
                }
            }
        }

        stored_posts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.seq.cmp(&a.seq))
        });

        stored_posts.into_iter().map(Post::try_from).collect()
    }

    /// Returns `false` when no post had that id.
    pub async fn delete(&self, id: &PostId) -> Result<bool, StoreError> {
        let posts_tree = self.db.db.open_tree(POSTS_TREE)?;

        let removed = posts_tree.remove(id.as_str().as_bytes())?.is_some();
        if removed {
            info!(post_id = %id, "Post deleted from database");
        }

        Ok(removed)
    }
}
