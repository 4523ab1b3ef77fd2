//! services/api/src/web/users.rs
//!
//! Admin endpoints for managing reader accounts.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use course_highlights_core::domain::CurrentUser;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::port_failure;
use crate::web::{auth::UserResponse, highlights::MessageResponse, state::AppState};

/// List every reader account. Admin only.
#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "Reader accounts, without credentials", body = [UserResponse]),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_users_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let users = app_state
        .users
        .list_users()
        .await
        .map_err(|e| port_failure("Failed to list users", e))?;
    let body: Vec<UserResponse> = users.into_iter().map(Into::into).collect();
    Ok(Json(body))
}

/// Delete an account together with its sessions and highlights. Admin only.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "The account to delete.")),
    responses(
        (status = 200, description = "User deleted (or nothing to delete)", body = MessageResponse),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn delete_user_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(admin): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    app_state
        .users
        .delete_user(user_id)
        .await
        .map_err(|e| port_failure("Failed to delete user", e))?;

    info!("Admin {} deleted user {}", admin.user_id, user_id);
    Ok(Json(MessageResponse {
        message: "User deleted".to_string(),
    }))
}
