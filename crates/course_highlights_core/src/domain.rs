//! crates/course_highlights_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use uuid::Uuid;

/// Color applied to a highlight when the caller does not pick one.
pub const DEFAULT_HIGHLIGHT_COLOR: &str = "#ffeb3b";

//=========================================================================================
// Users and Sessions
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    /// Parses the stored role name. Unknown names fall back to the least privileged role.
    pub fn from_name(name: &str) -> Self {
        match name {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub username: String,
    pub hashed_password: String,
    pub role: Role,
}

/// The identity behind a single authenticated request.
///
/// Resolved once from the session token by the auth middleware and handed to
/// whoever needs to know who is asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

//=========================================================================================
// Course Content
//=========================================================================================

/// A course: chapters of subheadings, each carrying the leaf text blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub chapters: Vec<Chapter>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chapter {
    pub heading: String,
    pub subheadings: Vec<Subheading>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Subheading {
    pub title: String,
    pub points: Vec<String>,
    pub paragraph: String,
    pub image: Option<String>,
}

impl Course {
    /// Looks up the text stored at `field`, if the course has such a block.
    pub fn field_text(&self, field: &FieldKey) -> Option<&str> {
        let sub = self
            .chapters
            .get(field.chapter)?
            .subheadings
            .get(field.subheading)?;
        match field.kind {
            FieldKind::Title => Some(sub.title.as_str()),
            FieldKind::Paragraph => Some(sub.paragraph.as_str()),
            FieldKind::Point(i) => sub.points.get(i).map(String::as_str),
        }
    }
}

//=========================================================================================
// Field Keys
//=========================================================================================

/// Which leaf block of a subheading a field key points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Title,
    Paragraph,
    Point(usize),
}

/// Addresses one text block inside a course, e.g. `ch0_sub2_para`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldKey {
    pub chapter: usize,
    pub subheading: usize,
    pub kind: FieldKind,
}

impl FieldKey {
    pub fn paragraph(chapter: usize, subheading: usize) -> Self {
        Self {
            chapter,
            subheading,
            kind: FieldKind::Paragraph,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid field key: '{0}'")]
pub struct FieldKeyError(pub String);

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch{}_sub{}_", self.chapter, self.subheading)?;
        match self.kind {
            FieldKind::Title => f.write_str("title"),
            FieldKind::Paragraph => f.write_str("para"),
            FieldKind::Point(i) => write!(f, "pt{}", i),
        }
    }
}

fn field_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^ch(\d+)_sub(\d+)_(title|para|pt(\d+))$").expect("field key pattern is valid")
    })
}

impl FromStr for FieldKey {
    type Err = FieldKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FieldKeyError(s.to_string());
        let caps = field_key_pattern().captures(s).ok_or_else(invalid)?;
        let index = |i: usize| -> Result<usize, FieldKeyError> {
            caps.get(i)
                .ok_or_else(invalid)?
                .as_str()
                .parse()
                .map_err(|_| invalid())
        };

        let kind = match &caps[3] {
            "title" => FieldKind::Title,
            "para" => FieldKind::Paragraph,
            _ => FieldKind::Point(index(4)?),
        };

        Ok(Self {
            chapter: index(1)?,
            subheading: index(2)?,
            kind,
        })
    }
}

//=========================================================================================
// Highlights
//=========================================================================================

/// A persisted annotation over a range of one field's text.
///
/// Offsets count characters from the start of the field text as it was when
/// the highlight was made. They are never revalidated against later edits.
#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub course_id: Uuid,
    pub field: FieldKey,
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to create a highlight. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHighlight {
    pub owner_id: Uuid,
    pub course_id: Uuid,
    pub field: FieldKey,
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub color: Option<String>,
}

impl NewHighlight {
    pub fn color_or_default(&self) -> &str {
        self.color.as_deref().unwrap_or(DEFAULT_HIGHLIGHT_COLOR)
    }

    /// Builds the stored record. Used by stores that mint ids themselves.
    pub fn into_highlight(self, id: Uuid, created_at: DateTime<Utc>) -> Highlight {
        let color = self.color_or_default().to_string();
        Highlight {
            id,
            owner_id: self.owner_id,
            course_id: self.course_id,
            field: self.field,
            text: self.text,
            start_offset: self.start_offset,
            end_offset: self.end_offset,
            color,
            created_at,
        }
    }
}
