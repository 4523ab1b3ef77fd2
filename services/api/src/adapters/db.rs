//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete PostgreSQL implementation
//! of the core crate's storage ports (`HighlightStore`, `CourseRepository`,
//! `UserRepository`). It handles all interactions with the database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_highlights_core::domain::{
    Chapter, Course, CurrentUser, FieldKey, Highlight, NewHighlight, Role, Subheading, User,
    UserCredentials,
};
use course_highlights_core::ports::{
    CourseRepository, HighlightStore, PortError, PortResult, UserRepository,
};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the storage ports on top of PostgreSQL.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Maps a query error, turning a missing row into `NotFound` with the given description.
fn not_found_or_unexpected(e: sqlx::Error, what: impl FnOnce() -> String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what()),
        _ => PortError::Unexpected(e.to_string()),
    }
}

fn to_db_offset(offset: usize) -> PortResult<i32> {
    i32::try_from(offset)
        .map_err(|_| PortError::Unexpected(format!("Offset {} does not fit in the database", offset)))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    username: String,
    role: String,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            username: self.username,
            role: Role::from_name(&self.role),
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    username: String,
    hashed_password: String,
    role: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            username: self.username,
            hashed_password: self.hashed_password,
            role: Role::from_name(&self.role),
        }
    }
}

#[derive(FromRow)]
struct SessionUserRecord {
    user_id: Uuid,
    role: String,
}

/// JSONB shape of one chapter inside `courses.chapters`.
#[derive(Serialize, Deserialize)]
struct ChapterRecord {
    heading: String,
    #[serde(default)]
    subheadings: Vec<SubheadingRecord>,
}

#[derive(Serialize, Deserialize)]
struct SubheadingRecord {
    title: String,
    #[serde(default)]
    points: Vec<String>,
    #[serde(default)]
    paragraph: String,
    #[serde(default)]
    image: Option<String>,
}

impl ChapterRecord {
    fn from_domain(chapter: Chapter) -> Self {
        Self {
            heading: chapter.heading,
            subheadings: chapter
                .subheadings
                .into_iter()
                .map(|s| SubheadingRecord {
                    title: s.title,
                    points: s.points,
                    paragraph: s.paragraph,
                    image: s.image,
                })
                .collect(),
        }
    }

    fn to_domain(self) -> Chapter {
        Chapter {
            heading: self.heading,
            subheadings: self
                .subheadings
                .into_iter()
                .map(|s| Subheading {
                    title: s.title,
                    points: s.points,
                    paragraph: s.paragraph,
                    image: s.image,
                })
                .collect(),
        }
    }
}

#[derive(FromRow)]
struct CourseRecord {
    id: Uuid,
    title: String,
    chapters: Json<Vec<ChapterRecord>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl CourseRecord {
    fn to_domain(self) -> Course {
        Course {
            id: self.id,
            title: self.title,
            chapters: self.chapters.0.into_iter().map(ChapterRecord::to_domain).collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn chapters_to_json(chapters: Vec<Chapter>) -> Json<Vec<ChapterRecord>> {
    Json(chapters.into_iter().map(ChapterRecord::from_domain).collect())
}

#[derive(FromRow)]
struct HighlightRecord {
    id: Uuid,
    owner_id: Uuid,
    course_id: Uuid,
    field: String,
    text: String,
    start_offset: i32,
    end_offset: i32,
    color: String,
    created_at: DateTime<Utc>,
}
impl HighlightRecord {
    fn to_domain(self) -> PortResult<Highlight> {
        let field: FieldKey = self
            .field
            .parse()
            .map_err(|e| PortError::Unexpected(format!("Highlight {}: {}", self.id, e)))?;
        Ok(Highlight {
            id: self.id,
            owner_id: self.owner_id,
            course_id: self.course_id,
            field,
            text: self.text,
            start_offset: self.start_offset.max(0) as usize,
            end_offset: self.end_offset.max(0) as usize,
            color: self.color,
            created_at: self.created_at,
        })
    }
}

const COURSE_COLUMNS: &str = "id, title, chapters, created_at, updated_at";
const HIGHLIGHT_COLUMNS: &str =
    "id, owner_id, course_id, field, text, start_offset, end_offset, color, created_at";

//=========================================================================================
// `UserRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserRepository for DbAdapter {
    async fn create_user(&self, username: &str, hashed_password: &str, role: Role) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, username, hashed_password, role) VALUES ($1, $2, $3, $4) \
             RETURNING user_id, username, role",
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(hashed_password)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                PortError::Conflict(format!("Username '{}' is already taken", username))
            }
            _ => PortError::Unexpected(e.to_string()),
        })?;
        Ok(record.to_domain())
    }

    async fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, username, hashed_password, role FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, || format!("User '{}' not found", username)))?;
        Ok(record.to_domain())
    }

    async fn list_users(&self) -> PortResult<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, username, role FROM users WHERE role = $1 ORDER BY username",
        )
        .bind(Role::User.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(records.into_iter().map(UserRecord::to_domain).collect())
    }

    async fn delete_user(&self, user_id: Uuid) -> PortResult<()> {
        // Sessions and highlights go with the row through ON DELETE CASCADE.
        sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<CurrentUser> {
        let record = sqlx::query_as::<_, SessionUserRecord>(
            "SELECT u.user_id, u.role FROM auth_sessions s \
             JOIN users u ON u.user_id = s.user_id \
             WHERE s.id = $1 AND s.expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::Unauthorized,
            _ => PortError::Unexpected(e.to_string()),
        })?;
        Ok(CurrentUser {
            user_id: record.user_id,
            role: Role::from_name(&record.role),
        })
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}

//=========================================================================================
// `CourseRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl CourseRepository for DbAdapter {
    async fn list_courses(&self) -> PortResult<Vec<Course>> {
        let records = sqlx::query_as::<_, CourseRecord>(&format!(
            "SELECT {} FROM courses ORDER BY created_at ASC",
            COURSE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_course(&self, course_id: Uuid) -> PortResult<Course> {
        let record = sqlx::query_as::<_, CourseRecord>(&format!(
            "SELECT {} FROM courses WHERE id = $1",
            COURSE_COLUMNS
        ))
        .bind(course_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, || format!("Course {} not found", course_id)))?;
        Ok(record.to_domain())
    }

    async fn create_course(&self, title: &str, chapters: Vec<Chapter>) -> PortResult<Course> {
        let record = sqlx::query_as::<_, CourseRecord>(&format!(
            "INSERT INTO courses (id, title, chapters) VALUES ($1, $2, $3) RETURNING {}",
            COURSE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(chapters_to_json(chapters))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(record.to_domain())
    }

    async fn update_course(
        &self,
        course_id: Uuid,
        title: &str,
        chapters: Vec<Chapter>,
    ) -> PortResult<Course> {
        let record = sqlx::query_as::<_, CourseRecord>(&format!(
            "UPDATE courses SET title = $1, chapters = $2, updated_at = NOW() WHERE id = $3 RETURNING {}",
            COURSE_COLUMNS
        ))
        .bind(title)
        .bind(chapters_to_json(chapters))
        .bind(course_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, || format!("Course {} not found", course_id)))?;
        Ok(record.to_domain())
    }

    async fn delete_course(&self, course_id: Uuid) -> PortResult<()> {
        // Highlights go with it through `ON DELETE CASCADE`.
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(course_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Course {} not found", course_id)));
        }
        Ok(())
    }
}

//=========================================================================================
// `HighlightStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl HighlightStore for DbAdapter {
    async fn create_highlight(&self, highlight: NewHighlight) -> PortResult<Highlight> {
        let record = sqlx::query_as::<_, HighlightRecord>(&format!(
            "INSERT INTO highlights (id, owner_id, course_id, field, text, start_offset, end_offset, color) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            HIGHLIGHT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(highlight.owner_id)
        .bind(highlight.course_id)
        .bind(highlight.field.to_string())
        .bind(&highlight.text)
        .bind(to_db_offset(highlight.start_offset)?)
        .bind(to_db_offset(highlight.end_offset)?)
        .bind(highlight.color_or_default())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => PortError::NotFound(
                format!("Course {} not found", highlight.course_id),
            ),
            _ => PortError::Unexpected(e.to_string()),
        })?;
        record.to_domain()
    }

    async fn list_highlights(&self, owner_id: Uuid, course_id: Uuid) -> PortResult<Vec<Highlight>> {
        let records = sqlx::query_as::<_, HighlightRecord>(&format!(
            "SELECT {} FROM highlights WHERE owner_id = $1 AND course_id = $2 ORDER BY created_at ASC",
            HIGHLIGHT_COLUMNS
        ))
        .bind(owner_id)
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn delete_highlight(&self, id: Uuid, owner_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM highlights WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}
