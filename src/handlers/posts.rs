use crate::catalog::{DemoCatalog, DemoPost};
use crate::db::new_object_id;
use crate::db::post_repository::PostRepository;
use crate::db::user_repository::UserRepository;
use crate::error::{ApiError, ApiResult};
use crate::handlers::{require, RequestDeadline};
use crate::models::post::{Post, PostId, PostKey};
use crate::models::user::Claims;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};
use utoipa::ToSchema;

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub excerpt: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct AuthorSummary {
    pub id: String,
    pub username: String,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub image: String,
    pub excerpt: String,
    /// `null` when the author record can no longer be found.
    pub author: Option<AuthorSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub formatted_date: String,
}

impl PostResponse {
    fn new(post: Post, author: Option<AuthorSummary>) -> Self {
        PostResponse {
            id: post.id.to_string(),
            title: post.title,
            content: post.content,
            image: post.image,
            excerpt: post.excerpt,
            author,
            formatted_date: post.created_at.format("%Y-%m-%d").to_string(),
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

/// A single post as returned by `GET /posts/{id}`.
#[derive(Serialize, ToSchema)]
#[serde(untagged)]
pub enum PostView {
    Stored(PostResponse),
    Demo(DemoPost),
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub msg: String,
}

async fn resolve_author(
    user_repo: &UserRepository,
    author_id: &str,
) -> ApiResult<Option<AuthorSummary>> {
    let user = user_repo.get_by_id(author_id).await?;
    Ok(user.map(|u| AuthorSummary {
        id: u.id,
        username: u.username,
    }))
}

/// List all posts, newest first
#[utoipa::path(
    get,
    path = "/posts",
    responses(
        (status = 200, description = "All posts, newest first", body = [PostResponse]),
        (status = 500, description = "Internal server error", body = crate::error::ErrorBody)
    ),
    tag = "Posts"
)]
pub async fn list_posts(
    post_repo: web::Data<PostRepository>,
    user_repo: web::Data<UserRepository>,
    deadline: web::Data<RequestDeadline>,
) -> ApiResult<HttpResponse> {
    let response = deadline
        .run(async {
            let posts = post_repo.list_newest_first().await?;

            let mut authors: HashMap<String, Option<AuthorSummary>> = HashMap::new();
            let mut response = Vec::with_capacity(posts.len());
            for post in posts {
                let author = match authors.get(&post.author) {
                    Some(cached) => cached.clone(),
                    None => {
                        let resolved = resolve_author(&user_repo, &post.author).await?;
                        authors.insert(post.author.clone(), resolved.clone());
                        resolved
                    }
                };
                response.push(PostResponse::new(post, author));
            }
            Ok::<_, ApiError>(response)
        })
        .await??;

    info!(count = response.len(), "Listed posts");

    Ok(HttpResponse::Ok().json(response))
}

/// Get a single post by database id or demo key
#[utoipa::path(
    get,
    path = "/posts/{id}",
    params(("id" = String, Path, description = "24-character hex post id, or a demo post key")),
    responses(
        (status = 200, description = "Post found", body = PostView),
        (status = 400, description = "Not a post id and no demo post matches", body = crate::error::ErrorBody),
        (status = 404, description = "No stored post with this id", body = crate::error::ErrorBody)
    ),
    tag = "Posts"
)]
pub async fn get_post(
    post_repo: web::Data<PostRepository>,
    user_repo: web::Data<UserRepository>,
    catalog: web::Data<DemoCatalog>,
    deadline: web::Data<RequestDeadline>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let view = match PostKey::classify(&path.into_inner()) {
        PostKey::Stored(id) => {
            let post = deadline.run(post_repo.get_by_id(&id)).await??.ok_or_else(|| {
                warn!(post_id = %id, "Post not found");
                ApiError::NotFound("Post")
            })?;
            let author = deadline
                .run(resolve_author(&user_repo, &post.author))
                .await??;
            PostView::Stored(PostResponse::new(post, author))
        }
        PostKey::Demo(key) => match catalog.find(&key) {
            Some(demo) => PostView::Demo(demo.clone()),
            None => {
                warn!(key = %key, "Invalid post id format");
                return Err(ApiError::InvalidFormat);
            }
        },
    };

    Ok(HttpResponse::Ok().json(view))
}

/// Create a post authored by the caller
#[utoipa::path(
    post,
    path = "/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created", body = PostResponse),
        (status = 400, description = "Missing fields", body = crate::error::ErrorBody),
        (status = 401, description = "Unauthenticated", body = crate::error::ErrorBody),
        (status = 500, description = "Internal server error", body = crate::error::ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Posts"
)]
pub async fn create_post(
    claims: web::ReqData<Claims>,
    post_repo: web::Data<PostRepository>,
    user_repo: web::Data<UserRepository>,
    deadline: web::Data<RequestDeadline>,
    payload: web::Json<CreatePostRequest>,
) -> ApiResult<HttpResponse> {
    let CreatePostRequest {
        title,
        content,
        image,
        excerpt,
    } = payload.into_inner();

    let now = Utc::now();
    let post = Post {
        id: PostId::parse(&new_object_id())
            .ok_or_else(|| ApiError::internal("generated post id is malformed"))?,
        title: require("title", title)?,
        content: require("content", content)?,
        image: require("image", image)?,
        excerpt: require("excerpt", excerpt)?,
        author: claims.sub.clone(),
        created_at: now,
        updated_at: now,
    };

    let post = deadline.run(post_repo.create(post)).await??;
    let author = deadline
        .run(resolve_author(&user_repo, &post.author))
        .await??;

    info!(
        user_id = %claims.sub,
        post_id = %post.id,
        title = %post.title,
        "User created new post"
    );

    Ok(HttpResponse::Created().json(PostResponse::new(post, author)))
}

/// Delete a post owned by the caller
#[utoipa::path(
    delete,
    path = "/posts/{id}",
    params(("id" = String, Path, description = "24-character hex post id")),
    responses(
        (status = 200, description = "Post deleted", body = MessageResponse),
        (status = 401, description = "Unauthenticated", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is not the author", body = crate::error::ErrorBody),
        (status = 404, description = "Post not found", body = crate::error::ErrorBody),
        (status = 500, description = "Internal server error", body = crate::error::ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Posts"
)]
pub async fn delete_post(
    claims: web::ReqData<Claims>,
    post_repo: web::Data<PostRepository>,
    deadline: web::Data<RequestDeadline>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    // Demo posts are not persisted, so only stored ids can ever match.
    let id = PostId::parse(&path.into_inner()).ok_or(ApiError::NotFound("Post"))?;

    let post = deadline
        .run(post_repo.get_by_id(&id))
        .await??
        .ok_or(ApiError::NotFound("Post"))?;

    if post.author != claims.sub {
        warn!(user_id = %claims.sub, post_id = %id, author = %post.author, "Delete refused: not the author");
        return Err(ApiError::Forbidden);
    }

    if !deadline.run(post_repo.delete(&id)).await?? {
        // Removed by a concurrent request between the lookup and the delete.
        return Err(ApiError::NotFound("Post"));
    }

    info!(user_id = %claims.sub, post_id = %id, "User deleted post");

    Ok(HttpResponse::Ok().json(MessageResponse {
        msg: "Post deleted successfully".to_string(),
    }))
}
