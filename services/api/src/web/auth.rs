//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for signup, login, logout and admin creation.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use course_highlights_core::domain::{Role, User};
use course_highlights_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::port_failure;
use crate::web::{middleware::session_token, state::AppState};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateAdminRequest {
    pub username: String,
    pub password: String,
    pub secret: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub username: String,
    pub role: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            username: user.username,
            role: user.role.as_str().to_string(),
        }
    }
}

/// Returned on signup and login. `token` may be sent back as a bearer token.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub username: String,
    pub role: String,
    pub token: String,
}

//=========================================================================================
// Helpers
//=========================================================================================

fn validate_credentials(username: &str, password: &str) -> Result<(), (StatusCode, String)> {
    if username.trim().is_empty() || password.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Username and password are required".to_string(),
        ));
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String, (StatusCode, String)> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password".to_string())
        })
}

/// Creates an auth session for `user_id` and the cookie that carries it.
async fn start_session(
    state: &AppState,
    user_id: Uuid,
) -> Result<(String, String), (StatusCode, String)> {
    let auth_session_id = Uuid::new_v4().to_string();
    let ttl = Duration::days(state.config.session_ttl_days);

    state
        .users
        .create_auth_session(&auth_session_id, user_id, Utc::now() + ttl)
        .await
        .map_err(|e| port_failure("Failed to create session", e))?;

    let cookie = format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        auth_session_id,
        ttl.num_seconds()
    );
    Ok((auth_session_id, cookie))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new reader account and log it in
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Missing username or password"),
        (status = 409, description = "Username already taken"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    validate_credentials(&req.username, &req.password)?;
    let password_hash = hash_password(&req.password)?;

    let user = state
        .users
        .create_user(req.username.trim(), &password_hash, Role::User)
        .await
        .map_err(|e| port_failure("Failed to create user", e))?;

    let (token, cookie) = start_session(&state, user.user_id).await?;
    info!("Registered user {}", user.user_id);

    let response = AuthResponse {
        user_id: user.user_id,
        username: user.username,
        role: user.role.as_str().to_string(),
        token,
    };
    Ok((StatusCode::CREATED, [(header::SET_COOKIE, cookie)], Json(response)))
}

/// POST /auth/login - Login with an existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let invalid = || (StatusCode::UNAUTHORIZED, "Invalid username or password".to_string());

    let user_creds = state
        .users
        .get_user_by_username(req.username.trim())
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => invalid(),
            other => port_failure("Failed to look up user", other),
        })?;

    let parsed_hash = PasswordHash::new(&user_creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
    })?;

    if Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(invalid());
    }

    let (token, cookie) = start_session(&state, user_creds.user_id).await?;

    let response = AuthResponse {
        user_id: user_creds.user_id,
        username: user_creds.username,
        role: user_creds.role.as_str().to_string(),
        token,
    };
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(response)))
}

/// POST /auth/logout - Invalidate the current session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let auth_session_id = session_token(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    state
        .users
        .delete_auth_session(auth_session_id)
        .await
        .map_err(|e| port_failure("Failed to logout", e))?;

    let cookie = "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0";
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie.to_string())]))
}

/// POST /auth/admin - Create an administrator account
///
/// Requires the shared secret configured through `ADMIN_SECRET`.
#[utoipa::path(
    post,
    path = "/auth/admin",
    request_body = CreateAdminRequest,
    responses(
        (status = 201, description = "Admin created", body = UserResponse),
        (status = 403, description = "Wrong secret or admin creation disabled"),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn create_admin_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAdminRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match state.config.admin_secret.as_deref() {
        Some(secret) if secret == req.secret => {}
        _ => {
            warn!("Rejected admin creation for '{}'", req.username);
            return Err((StatusCode::FORBIDDEN, "Invalid secret".to_string()));
        }
    }

    validate_credentials(&req.username, &req.password)?;
    let password_hash = hash_password(&req.password)?;

    let admin = state
        .users
        .create_user(req.username.trim(), &password_hash, Role::Admin)
        .await
        .map_err(|e| port_failure("Failed to create admin", e))?;

    info!("Created admin {}", admin.user_id);
    Ok((StatusCode::CREATED, Json(UserResponse::from(admin))))
}
