//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the course endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::port_failure;
use crate::web::{auth, highlights, state::AppState, users};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use course_highlights_core::domain::{Chapter, Course, Subheading};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::create_admin_handler,
        list_courses_handler,
        get_course_handler,
        create_course_handler,
        update_course_handler,
        delete_course_handler,
        users::list_users_handler,
        users::delete_user_handler,
        highlights::create_highlight_handler,
        highlights::list_highlights_handler,
        highlights::delete_highlight_handler,
        highlights::field_segments_handler,
    ),
    components(
        schemas(
            auth::CredentialsRequest,
            auth::CreateAdminRequest,
            auth::AuthResponse,
            auth::UserResponse,
            CoursePayload,
            ChapterPayload,
            SubheadingPayload,
            CourseResponse,
            highlights::CreateHighlightRequest,
            highlights::HighlightResponse,
            highlights::MessageResponse,
            highlights::SegmentResponse,
            highlights::FieldSegmentsResponse,
        )
    ),
    tags(
        (name = "Course Highlights API", description = "Course content and per-reader text highlights.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct SubheadingPayload {
    pub title: String,
    #[serde(default)]
    pub points: Vec<String>,
    #[serde(default)]
    pub paragraph: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct ChapterPayload {
    pub heading: String,
    #[serde(default)]
    pub subheadings: Vec<SubheadingPayload>,
}

/// Body of course create and update requests.
#[derive(Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct CoursePayload {
    pub title: String,
    #[serde(default)]
    pub chapters: Vec<ChapterPayload>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CourseResponse {
    pub id: Uuid,
    pub title: String,
    pub chapters: Vec<ChapterPayload>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ChapterPayload> for Chapter {
    fn from(c: ChapterPayload) -> Self {
        Chapter {
            heading: c.heading,
            subheadings: c
                .subheadings
                .into_iter()
                .map(|s| Subheading {
                    title: s.title,
                    points: s.points,
                    paragraph: s.paragraph,
                    image: s.image.filter(|url| !url.is_empty()),
                })
                .collect(),
        }
    }
}

impl From<Chapter> for ChapterPayload {
    fn from(c: Chapter) -> Self {
        ChapterPayload {
            heading: c.heading,
            subheadings: c
                .subheadings
                .into_iter()
                .map(|s| SubheadingPayload {
                    title: s.title,
                    points: s.points,
                    paragraph: s.paragraph,
                    image: s.image,
                })
                .collect(),
        }
    }
}

impl From<Course> for CourseResponse {
    fn from(c: Course) -> Self {
        CourseResponse {
            id: c.id,
            title: c.title,
            chapters: c.chapters.into_iter().map(Into::into).collect(),
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

fn validate_course(payload: &CoursePayload) -> Result<(), (StatusCode, String)> {
    if payload.title.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Course title is required".to_string()));
    }
    Ok(())
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List every course.
#[utoipa::path(
    get,
    path = "/courses",
    responses(
        (status = 200, description = "All courses", body = [CourseResponse]),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn list_courses_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let courses = app_state
        .courses
        .list_courses()
        .await
        .map_err(|e| port_failure("Failed to list courses", e))?;
    let body: Vec<CourseResponse> = courses.into_iter().map(Into::into).collect();
    Ok(Json(body))
}

/// Fetch a single course with all of its content.
#[utoipa::path(
    get,
    path = "/courses/{id}",
    params(("id" = Uuid, Path, description = "The course.")),
    responses(
        (status = 200, description = "The course", body = CourseResponse),
        (status = 404, description = "Course not found")
    )
)]
pub async fn get_course_handler(
    State(app_state): State<Arc<AppState>>,
    Path(course_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let course = app_state
        .courses
        .get_course(course_id)
        .await
        .map_err(|e| port_failure("Failed to load course", e))?;
    Ok(Json(CourseResponse::from(course)))
}

/// Create a course. Admin only.
#[utoipa::path(
    post,
    path = "/courses",
    request_body = CoursePayload,
    responses(
        (status = 201, description = "Course created", body = CourseResponse),
        (status = 400, description = "Missing title"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn create_course_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CoursePayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    validate_course(&payload)?;
    let chapters = payload.chapters.into_iter().map(Into::into).collect();
    let course = app_state
        .courses
        .create_course(payload.title.trim(), chapters)
        .await
        .map_err(|e| port_failure("Failed to create course", e))?;

    info!("Created course {}", course.id);
    Ok((StatusCode::CREATED, Json(CourseResponse::from(course))))
}

/// Replace a course's title and content. Admin only.
///
/// Existing highlights keep their offsets; they are not adjusted to the new text.
#[utoipa::path(
    put,
    path = "/courses/{id}",
    request_body = CoursePayload,
    params(("id" = Uuid, Path, description = "The course.")),
    responses(
        (status = 200, description = "Course updated", body = CourseResponse),
        (status = 400, description = "Missing title"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Course not found")
    )
)]
pub async fn update_course_handler(
    State(app_state): State<Arc<AppState>>,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<CoursePayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    validate_course(&payload)?;
    let chapters = payload.chapters.into_iter().map(Into::into).collect();
    let course = app_state
        .courses
        .update_course(course_id, payload.title.trim(), chapters)
        .await
        .map_err(|e| port_failure("Failed to update course", e))?;

    info!("Updated course {}", course.id);
    Ok(Json(CourseResponse::from(course)))
}

/// Delete a course and every highlight made on it. Admin only.
#[utoipa::path(
    delete,
    path = "/courses/{id}",
    params(("id" = Uuid, Path, description = "The course.")),
    responses(
        (status = 204, description = "Course deleted"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Course not found")
    )
)]
pub async fn delete_course_handler(
    State(app_state): State<Arc<AppState>>,
    Path(course_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    app_state
        .courses
        .delete_course(course_id)
        .await
        .map_err(|e| port_failure("Failed to delete course", e))?;

    info!("Deleted course {}", course_id);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_covers_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/auth/signup",
            "/auth/login",
            "/auth/logout",
            "/auth/admin",
            "/courses",
            "/courses/{id}",
            "/courses/{id}/fields/{field}/segments",
            "/users",
            "/users/{id}",
            "/highlights",
            "/highlights/{course_id}",
            "/highlights/{id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }

    #[test]
    fn empty_image_urls_are_dropped() {
        let chapter: Chapter = ChapterPayload {
            heading: "Intro".to_string(),
            subheadings: vec![SubheadingPayload {
                title: "Speed".to_string(),
                image: Some(String::new()),
                ..Default::default()
            }],
        }
        .into();
        assert_eq!(chapter.subheadings[0].image, None);
    }
}
