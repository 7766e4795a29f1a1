//! Comments resource: `/api/v1/comments`

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
use crate::models::{Comment, CreateCommentRequest, RecordStatus, UpdateCommentRequest};

/// Build comments routes: GET/POST /, GET/PATCH/DELETE /{id}
pub fn comments_router(store: BlogStore) -> Router {
    Router::new()
        .route("/", get(list_comments).post(create_comment))
        .route(
            "/{id}",
            get(get_comment).patch(update_comment).delete(delete_comment),
        )
        .with_state(store)
}

pub async fn list_comments(State(store): State<BlogStore>) -> ApiResponse<Vec<Comment>> {
    ApiResponse::list(store.comments.list_active())
}

pub async fn create_comment(
    State(store): State<BlogStore>,
    JsonBody(request): JsonBody<CreateCommentRequest>,
) -> Result<Created<Comment>> {
    if !store.users.exists(request.user_id) {
        return Err(ApiError::validation_field(
            "user_id",
            format!("User {} does not exist", request.user_id),
        ));
    }
    if !store.posts.exists(request.post_id) {
        return Err(ApiError::validation_field(
            "post_id",
            format!("Post {} does not exist", request.post_id),
        ));
    }

    let comment = store.comments.insert_with(|id| Comment {
        id,
        comment: request.comment,
        post_id: request.post_id,
        user_id: request.user_id,
        status: RecordStatus::Active,
        created_at: Utc::now(),
    });
    info!(comment_id = comment.id, post_id = comment.post_id, "Comment created");

    Ok(Created(comment))
}

pub async fn get_comment(
    State(store): State<BlogStore>,
    PathId(id): PathId,
) -> Result<ApiResponse<Comment>> {
    store
        .comments
        .get_active(id)
        .map(ApiResponse::success)
        .ok_or_else(|| ApiError::not_found("Comment"))
}

pub async fn update_comment(
    State(store): State<BlogStore>,
    PathId(id): PathId,
    JsonBody(request): JsonBody<UpdateCommentRequest>,
) -> Result<ApiResponse<Comment>> {
    store
        .comments
        .update(id, |comment| comment.comment = request.comment)
        .map(ApiResponse::success)
        .ok_or_else(|| ApiError::not_found("Comment"))
}

pub async fn delete_comment(
    State(store): State<BlogStore>,
    PathId(id): PathId,
) -> Result<NoContent> {
    if store.comments.soft_delete(id) {
        info!(comment_id = id, "Comment deleted");
        Ok(NoContent)
    } else {
        Err(ApiError::not_found("Comment"))
    }
}
