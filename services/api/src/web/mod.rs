pub mod auth;
pub mod highlights;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod users;

pub use middleware::{require_admin, require_auth};
pub use rest::ApiDoc;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::{config::Config, error::ApiError};
use state::AppState;

/// Upper bound on request bodies; a full course with all its chapters is the largest payload.
const COURSE_BODY_LIMIT: usize = 4 * 1024 * 1024;

/// Builds the API router: public auth routes, reader routes and admin routes.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/auth/admin", post(auth::create_admin_handler));

    // Authenticated routes. Course writes and user management additionally require the admin role;
    // `require_auth` wraps everything, so it has already run when `require_admin` checks.
    let admin_only = || axum_middleware::from_fn(require_admin);
    let protected_routes = Router::new()
        .route(
            "/courses",
            get(rest::list_courses_handler)
                .merge(post(rest::create_course_handler).layer(admin_only())),
        )
        .route(
            "/courses/{id}",
            get(rest::get_course_handler).merge(
                put(rest::update_course_handler)
                    .delete(rest::delete_course_handler)
                    .layer(admin_only()),
            ),
        )
        .route(
            "/courses/{id}/fields/{field}/segments",
            get(highlights::field_segments_handler),
        )
        .route(
            "/users",
            get(users::list_users_handler).layer(admin_only()),
        )
        .route(
            "/users/{id}",
            delete(users::delete_user_handler).layer(admin_only()),
        )
        .route("/highlights", post(highlights::create_highlight_handler))
        .route(
            "/highlights/{id}",
            get(highlights::list_highlights_handler).delete(highlights::delete_highlight_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(COURSE_BODY_LIMIT))
        .with_state(app_state)
}

/// CORS policy letting the SPA at `allowed_origin` call the API with credentials.
pub fn cors_layer(config: &Config) -> Result<CorsLayer, ApiError> {
    let origin = config.allowed_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!(
            "Invalid ALLOWED_ORIGIN '{}': {}",
            config.allowed_origin, e
        ))
    })?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]))
}
