//! crates/course_highlights_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific storage implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Chapter, Course, CurrentUser, Highlight, NewHighlight, Role, User, UserCredentials};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Persistence for highlights, always scoped to the owning user.
#[async_trait]
pub trait HighlightStore: Send + Sync {
    /// Stores a new highlight. No deduplication: the same range may be stored twice.
    async fn create_highlight(&self, highlight: NewHighlight) -> PortResult<Highlight>;

    /// All of `owner_id`'s highlights for a course, across every field.
    async fn list_highlights(&self, owner_id: Uuid, course_id: Uuid) -> PortResult<Vec<Highlight>>;

    /// Removes the highlight if `owner_id` owns it.
    ///
    /// Missing or foreign ids are not an error; the call simply removes nothing.
    async fn delete_highlight(&self, id: Uuid, owner_id: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait CourseRepository: Send + Sync {
    async fn list_courses(&self) -> PortResult<Vec<Course>>;

    async fn get_course(&self, course_id: Uuid) -> PortResult<Course>;

    async fn create_course(&self, title: &str, chapters: Vec<Chapter>) -> PortResult<Course>;

    async fn update_course(
        &self,
        course_id: Uuid,
        title: &str,
        chapters: Vec<Chapter>,
    ) -> PortResult<Course>;

    /// Deletes the course together with every highlight made on it.
    async fn delete_course(&self, course_id: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    // --- User Management ---
    async fn create_user(&self, username: &str, hashed_password: &str, role: Role) -> PortResult<User>;

    async fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials>;

    /// Every account holding the `user` role, sorted by username. Admins are not listed.
    async fn list_users(&self) -> PortResult<Vec<User>>;

    /// Removes an account along with its sessions and highlights. Unknown ids are a no-op.
    async fn delete_user(&self, user_id: Uuid) -> PortResult<()>;

    // --- Auth Sessions ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Resolves a live session to the user behind it. Expired or unknown ids are `Unauthorized`.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<CurrentUser>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}
