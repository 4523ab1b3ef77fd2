//! services/api/src/web/highlights.rs
//!
//! Handlers for creating, listing and deleting a reader's highlights, and for
//! rendering a field with those highlights laid over it.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use course_highlights_core::{
    composite, CurrentUser, FieldKey, Highlight, NewHighlight, Segment,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::port_failure;
use crate::web::state::AppState;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateHighlightRequest {
    pub course_id: Uuid,
    /// Field key such as `ch0_sub1_para`.
    pub field: String,
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub color: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HighlightResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub course_id: Uuid,
    pub field: String,
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

impl From<Highlight> for HighlightResponse {
    fn from(h: Highlight) -> Self {
        Self {
            id: h.id,
            owner_id: h.owner_id,
            course_id: h.course_id,
            field: h.field.to_string(),
            text: h.text,
            start_offset: h.start_offset,
            end_offset: h.end_offset,
            color: h.color,
            created_at: h.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// One run of rendered text.
#[derive(Serialize, Deserialize, ToSchema, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentResponse {
    Plain { text: String },
    Highlighted { text: String, color: String, id: Uuid },
}

impl From<Segment<'_>> for SegmentResponse {
    fn from(segment: Segment<'_>) -> Self {
        match segment {
            Segment::Plain { text } => SegmentResponse::Plain {
                text: text.to_string(),
            },
            Segment::Highlighted { text, color, id } => SegmentResponse::Highlighted {
                text: text.to_string(),
                color: color.to_string(),
                id,
            },
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct FieldSegmentsResponse {
    pub course_id: Uuid,
    pub field: String,
    pub text: String,
    pub segments: Vec<SegmentResponse>,
}

fn parse_field(raw: &str) -> Result<FieldKey, (StatusCode, String)> {
    raw.parse()
        .map_err(|e: course_highlights_core::FieldKeyError| (StatusCode::BAD_REQUEST, e.to_string()))
}

/// Offsets are stored as `INTEGER`, so nothing past `i32::MAX` can be saved.
const MAX_OFFSET: usize = i32::MAX as usize;

fn validate_highlight(req: &CreateHighlightRequest) -> Result<FieldKey, (StatusCode, String)> {
    let field = parse_field(&req.field)?;
    if req.text.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Highlight text is required".to_string()));
    }
    if req.start_offset >= req.end_offset {
        return Err((
            StatusCode::BAD_REQUEST,
            "start_offset must be smaller than end_offset".to_string(),
        ));
    }
    if req.end_offset > MAX_OFFSET {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Offsets may not exceed {}", MAX_OFFSET),
        ));
    }
    Ok(field)
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Save a highlight for the calling user.
#[utoipa::path(
    post,
    path = "/highlights",
    request_body = CreateHighlightRequest,
    responses(
        (status = 201, description = "Highlight saved", body = HighlightResponse),
        (status = 400, description = "Empty text, invalid range or unknown field key"),
        (status = 404, description = "Course not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_highlight_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateHighlightRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let field = validate_highlight(&req)?;

    let highlight = app_state
        .highlights
        .create_highlight(NewHighlight {
            owner_id: user.user_id,
            course_id: req.course_id,
            field,
            text: req.text,
            start_offset: req.start_offset,
            end_offset: req.end_offset,
            color: req.color.filter(|c| !c.trim().is_empty()),
        })
        .await
        .map_err(|e| port_failure("Failed to save highlight", e))?;

    info!(
        "User {} highlighted {}..{} of {} in course {}",
        user.user_id, highlight.start_offset, highlight.end_offset, highlight.field, highlight.course_id
    );
    Ok((StatusCode::CREATED, Json(HighlightResponse::from(highlight))))
}

/// List the calling user's highlights for a course, across all fields.
#[utoipa::path(
    get,
    path = "/highlights/{course_id}",
    params(("course_id" = Uuid, Path, description = "The course to list highlights for.")),
    responses(
        (status = 200, description = "The caller's highlights", body = [HighlightResponse]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_highlights_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(course_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let highlights = app_state
        .highlights
        .list_highlights(user.user_id, course_id)
        .await
        .map_err(|e| port_failure("Failed to list highlights", e))?;

    let body: Vec<HighlightResponse> = highlights.into_iter().map(Into::into).collect();
    Ok(Json(body))
}

/// Delete one of the calling user's highlights.
///
/// Ids that do not exist or belong to someone else are ignored, so repeating
/// the call is harmless.
#[utoipa::path(
    delete,
    path = "/highlights/{id}",
    params(("id" = Uuid, Path, description = "The highlight to delete.")),
    responses(
        (status = 200, description = "Highlight deleted (or nothing to delete)", body = MessageResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_highlight_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    app_state
        .highlights
        .delete_highlight(id, user.user_id)
        .await
        .map_err(|e| port_failure("Failed to delete highlight", e))?;

    Ok(Json(MessageResponse {
        message: "Highlight deleted".to_string(),
    }))
}

/// Render one field of a course with the calling user's highlights applied.
#[utoipa::path(
    get,
    path = "/courses/{id}/fields/{field}/segments",
    params(
        ("id" = Uuid, Path, description = "The course."),
        ("field" = String, Path, description = "Field key such as `ch0_sub1_para`.")
    ),
    responses(
        (status = 200, description = "Segments in render order", body = FieldSegmentsResponse),
        (status = 400, description = "Malformed field key"),
        (status = 404, description = "Course or field not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn field_segments_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path((course_id, raw_field)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let field = parse_field(&raw_field)?;

    let course = app_state
        .courses
        .get_course(course_id)
        .await
        .map_err(|e| port_failure("Failed to load course", e))?;
    let text = course.field_text(&field).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            format!("Course {} has no field {}", course_id, field),
        )
    })?;

    let highlights: Vec<Highlight> = app_state
        .highlights
        .list_highlights(user.user_id, course_id)
        .await
        .map_err(|e| port_failure("Failed to list highlights", e))?
        .into_iter()
        .filter(|h| h.field == field)
        .collect();

    let segments = composite(text, &highlights).map(SegmentResponse::from).collect();

    Ok(Json(FieldSegmentsResponse {
        course_id,
        field: field.to_string(),
        text: text.to_string(),
        segments,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(start_offset: usize, end_offset: usize) -> CreateHighlightRequest {
        CreateHighlightRequest {
            course_id: Uuid::new_v4(),
            field: "ch0_sub0_para".to_string(),
            text: "quick".to_string(),
            start_offset,
            end_offset,
            color: None,
        }
    }

    #[test]
    fn accepts_offsets_up_to_the_column_limit() {
        assert_eq!(
            validate_highlight(&request(MAX_OFFSET - 1, MAX_OFFSET)),
            Ok(FieldKey::paragraph(0, 0))
        );
    }

    #[test]
    fn rejects_offsets_the_database_cannot_hold() {
        let (status, _) = validate_highlight(&request(0, MAX_OFFSET + 1)).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = validate_highlight(&request(usize::MAX - 1, usize::MAX)).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn rejects_empty_and_inverted_ranges() {
        for (start, end) in [(5, 5), (9, 4)] {
            let (status, _) = validate_highlight(&request(start, end)).unwrap_err();
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
    }
}
