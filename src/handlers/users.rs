//! Users resource: `/api/v1/users`

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
use crate::models::{CreateUserRequest, RecordStatus, UpdateUserRequest, User};

/// Build users routes: GET/POST /, GET/PATCH/DELETE /{id}
pub fn users_router(store: BlogStore) -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route(
            "/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .with_state(store)
}

pub async fn list_users(State(store): State<BlogStore>) -> ApiResponse<Vec<User>> {
    ApiResponse::list(store.users.list_active())
}

pub async fn create_user(
    State(store): State<BlogStore>,
    JsonBody(request): JsonBody<CreateUserRequest>,
) -> Result<Created<User>> {
    let email = request.email.to_lowercase();
    let name = request.name;

    let user = store
        .insert_user(&email, |id| User {
            id,
            name,
            email: email.clone(),
            status: RecordStatus::Active,
            created_at: Utc::now(),
        })
        .ok_or_else(|| email_taken(&email))?;
    info!(user_id = user.id, "User created");

    Ok(Created(user))
}

pub async fn get_user(
    State(store): State<BlogStore>,
    PathId(id): PathId,
) -> Result<ApiResponse<User>> {
    store
        .users
        .get_active(id)
        .map(ApiResponse::success)
        .ok_or_else(|| ApiError::not_found("User"))
}

pub async fn update_user(
    State(store): State<BlogStore>,
    PathId(id): PathId,
    JsonBody(request): JsonBody<UpdateUserRequest>,
) -> Result<ApiResponse<User>> {
    let current = store
        .users
        .get_active(id)
        .ok_or_else(|| ApiError::not_found("User"))?;

    let new_email = request.email.map(|email| email.to_lowercase());
    if let Some(email) = &new_email {
        if !store.claim_email(email, id) {
            return Err(email_taken(email));
        }
    }

    let updated = store.users.update(id, |user| {
        if let Some(name) = request.name {
            user.name = name;
        }
        if let Some(email) = &new_email {
            user.email = email.clone();
        }
    });

    match updated {
        Some(user) => {
            if user.email != current.email {
                store.release_email(&current.email, id);
            }
            Ok(ApiResponse::success(user))
        }
        None => {
            // Deleted between the lookup and the update
            if let Some(email) = new_email.filter(|email| *email != current.email) {
                store.release_email(&email, id);
            }
            Err(ApiError::not_found("User"))
        }
    }
}

pub async fn delete_user(
    State(store): State<BlogStore>,
    PathId(id): PathId,
) -> Result<NoContent> {
    let user = store
        .users
        .get_active(id)
        .ok_or_else(|| ApiError::not_found("User"))?;

    if store.users.soft_delete(id) {
        store.release_email(&user.email, id);
        info!(user_id = id, "User deleted");
        Ok(NoContent)
    } else {
        Err(ApiError::not_found("User"))
    }
}

fn email_taken(email: &str) -> ApiError {
    ApiError::Conflict(format!("Email {} is already registered", email))
}
