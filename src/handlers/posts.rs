//! Posts resource: `/api/v1/posts`

use axum::{
    extract::State,
    routing::get,
    Router,
};
use chrono::Utc;
use tracing::info;

use super::extractors::{JsonBody, PathId};
use super::response::{ApiResponse, Created, NoContent};
use super::store::BlogStore;
use crate::error::{ApiError, Result};
use crate::models::{CreatePostRequest, Post, RecordStatus, UpdatePostRequest};

/// Build posts routes: GET/POST /, GET/PATCH/DELETE /{id}
pub fn posts_router(store: BlogStore) -> Router {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route(
            "/{id}",
            get(get_post).patch(update_post).delete(delete_post),
        )
        .with_state(store)
}

pub async fn list_posts(State(store): State<BlogStore>) -> ApiResponse<Vec<Post>> {
    ApiResponse::list(store.posts.list_active())
}

pub async fn create_post(
    State(store): State<BlogStore>,
    JsonBody(request): JsonBody<CreatePostRequest>,
) -> Result<Created<Post>> {
    if !store.users.exists(request.user_id) {
        return Err(ApiError::validation_field(
            "user_id",
            format!("User {} does not exist", request.user_id),
        ));
    }

    let post = store.posts.insert_with(|id| Post {
        id,
        title: request.title,
        content: request.content,
        user_id: request.user_id,
        status: RecordStatus::Active,
        created_at: Utc::now(),
    });
    info!(post_id = post.id, user_id = post.user_id, "Post created");

    Ok(Created(post))
}

pub async fn get_post(
    State(store): State<BlogStore>,
    PathId(id): PathId,
) -> Result<ApiResponse<Post>> {
    store
        .posts
        .get_active(id)
        .map(ApiResponse::success)
        .ok_or_else(|| ApiError::not_found("Post"))
}

pub async fn update_post(
    State(store): State<BlogStore>,
    PathId(id): PathId,
    JsonBody(request): JsonBody<UpdatePostRequest>,
) -> Result<ApiResponse<Post>> {
    store
        .posts
        .update(id, |post| {
            if let Some(title) = request.title {
                post.title = title;
            }
            if let Some(content) = request.content {
                post.content = content;
            }
        })
        .map(ApiResponse::success)
        .ok_or_else(|| ApiError::not_found("Post"))
}

pub async fn delete_post(
    State(store): State<BlogStore>,
    PathId(id): PathId,
) -> Result<NoContent> {
    if store.posts.soft_delete(id) {
        info!(post_id = id, "Post deleted");
        Ok(NoContent)
    } else {
        Err(ApiError::not_found("Post"))
    }
}
