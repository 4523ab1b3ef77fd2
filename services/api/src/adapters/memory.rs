//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the storage ports. It mirrors the
//! constraints the PostgreSQL schema enforces (unique usernames, user and
//! course deletion cascading to what hangs off them) and backs the integration tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_highlights_core::domain::{
    Chapter, Course, CurrentUser, Highlight, NewHighlight, Role, User, UserCredentials,
};
use course_highlights_core::ports::{
    CourseRepository, HighlightStore, PortError, PortResult, UserRepository,
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserCredentials>,
    auth_sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    // Kept in insertion order so listings are stable, like `ORDER BY created_at`.
    courses: Vec<Course>,
    highlights: Vec<Highlight>,
}

/// Storage adapter that keeps everything in memory.
#[derive(Default)]
pub struct MemoryAdapter {
    tables: RwLock<Tables>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryAdapter {
    async fn create_user(&self, username: &str, hashed_password: &str, role: Role) -> PortResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == username) {
            return Err(PortError::Conflict(format!(
                "Username '{}' is already taken",
                username
            )));
        }

        let user_id = Uuid::new_v4();
        tables.users.insert(
            user_id,
            UserCredentials {
                user_id,
                username: username.to_string(),
                hashed_password: hashed_password.to_string(),
                role,
            },
        );
        Ok(User {
            user_id,
            username: username.to_string(),
            role,
        })
    }

    async fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        self.tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User '{}' not found", username)))
    }

    async fn list_users(&self) -> PortResult<Vec<User>> {
        let mut users: Vec<User> = self
            .tables
            .read()
            .await
            .users
            .values()
            .filter(|u| u.role == Role::User)
            .map(|u| User {
                user_id: u.user_id,
                username: u.username.clone(),
                role: u.role,
            })
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn delete_user(&self, user_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&user_id).is_some() {
            tables.auth_sessions.retain(|_, (owner, _)| *owner != user_id);
            tables.highlights.retain(|h| h.owner_id != user_id);
        }
        Ok(())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        tables
            .auth_sessions
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<CurrentUser> {
        let tables = self.tables.read().await;
        let (user_id, expires_at) = tables
            .auth_sessions
            .get(session_id)
            .copied()
            .ok_or(PortError::Unauthorized)?;
        if expires_at <= Utc::now() {
            return Err(PortError::Unauthorized);
        }
        let user = tables.users.get(&user_id).ok_or(PortError::Unauthorized)?;
        Ok(CurrentUser {
            user_id,
            role: user.role,
        })
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.tables.write().await.auth_sessions.remove(session_id);
        Ok(())
    }
}

#[async_trait]
impl CourseRepository for MemoryAdapter {
    async fn list_courses(&self) -> PortResult<Vec<Course>> {
        Ok(self.tables.read().await.courses.clone())
    }

    async fn get_course(&self, course_id: Uuid) -> PortResult<Course> {
        self.tables
            .read()
            .await
            .courses
            .iter()
            .find(|c| c.id == course_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Course {} not found", course_id)))
    }

    async fn create_course(&self, title: &str, chapters: Vec<Chapter>) -> PortResult<Course> {
        let now = Utc::now();
        let course = Course {
            id: Uuid::new_v4(),
            title: title.to_string(),
            chapters,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.courses.push(course.clone());
        Ok(course)
    }

    async fn update_course(
        &self,
        course_id: Uuid,
        title: &str,
        chapters: Vec<Chapter>,
    ) -> PortResult<Course> {
        let mut tables = self.tables.write().await;
        let course = tables
            .courses
            .iter_mut()
            .find(|c| c.id == course_id)
            .ok_or_else(|| PortError::NotFound(format!("Course {} not found", course_id)))?;
        course.title = title.to_string();
        course.chapters = chapters;
        course.updated_at = Utc::now();
        Ok(course.clone())
    }

    async fn delete_course(&self, course_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        let before = tables.courses.len();
        tables.courses.retain(|c| c.id != course_id);
        if tables.courses.len() == before {
            return Err(PortError::NotFound(format!("Course {} not found", course_id)));
        }
        tables.highlights.retain(|h| h.course_id != course_id);
        Ok(())
    }
}

#[async_trait]
impl HighlightStore for MemoryAdapter {
    async fn create_highlight(&self, highlight: NewHighlight) -> PortResult<Highlight> {
        let mut tables = self.tables.write().await;
        if !tables.courses.iter().any(|c| c.id == highlight.course_id) {
            return Err(PortError::NotFound(format!(
                "Course {} not found",
                highlight.course_id
            )));
        }
        let stored = highlight.into_highlight(Uuid::new_v4(), Utc::now());
        tables.highlights.push(stored.clone());
        Ok(stored)
    }

    async fn list_highlights(&self, owner_id: Uuid, course_id: Uuid) -> PortResult<Vec<Highlight>> {
        Ok(self
            .tables
            .read()
            .await
            .highlights
            .iter()
            .filter(|h| h.owner_id == owner_id && h.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn delete_highlight(&self, id: Uuid, owner_id: Uuid) -> PortResult<()> {
        self.tables
            .write()
            .await
            .highlights
            .retain(|h| !(h.id == id && h.owner_id == owner_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_highlights_core::domain::FieldKey;

    fn new_highlight(owner_id: Uuid, course_id: Uuid) -> NewHighlight {
        NewHighlight {
            owner_id,
            course_id,
            field: FieldKey::paragraph(0, 0),
            text: "quick".to_string(),
            start_offset: 4,
            end_offset: 9,
            color: None,
        }
    }

    #[tokio::test]
    async fn delete_is_scoped_to_the_owner_and_idempotent() {
        let store = MemoryAdapter::new();
        let course = store.create_course("Rust", Vec::new()).await.unwrap();
        let (owner, stranger) = (Uuid::new_v4(), Uuid::new_v4());
        let created = store
            .create_highlight(new_highlight(owner, course.id))
            .await
            .unwrap();

        store.delete_highlight(created.id, stranger).await.unwrap();
        assert_eq!(store.list_highlights(owner, course.id).await.unwrap().len(), 1);

        store.delete_highlight(created.id, owner).await.unwrap();
        store.delete_highlight(created.id, owner).await.unwrap();
        assert!(store.list_highlights(owner, course.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_course_drops_its_highlights() {
        let store = MemoryAdapter::new();
        let kept = store.create_course("Kept", Vec::new()).await.unwrap();
        let dropped = store.create_course("Dropped", Vec::new()).await.unwrap();
        let owner = Uuid::new_v4();
        store.create_highlight(new_highlight(owner, kept.id)).await.unwrap();
        store.create_highlight(new_highlight(owner, dropped.id)).await.unwrap();

        store.delete_course(dropped.id).await.unwrap();
        assert!(store.list_highlights(owner, dropped.id).await.unwrap().is_empty());
        assert_eq!(store.list_highlights(owner, kept.id).await.unwrap().len(), 1);
        assert!(matches!(
            store.delete_course(dropped.id).await,
            Err(PortError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn expired_sessions_are_rejected() {
        let store = MemoryAdapter::new();
        let user = store.create_user("ada", "hash", Role::User).await.unwrap();
        store
            .create_auth_session("old", user.user_id, Utc::now() - chrono::Duration::minutes(1))
            .await
            .unwrap();
        assert!(matches!(
            store.validate_auth_session("old").await,
            Err(PortError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn deleting_a_user_drops_their_sessions_and_highlights() {
        let store = MemoryAdapter::new();
        let course = store.create_course("Rust", Vec::new()).await.unwrap();
        let gone = store.create_user("gone", "hash", Role::User).await.unwrap();
        let kept = store.create_user("kept", "hash", Role::User).await.unwrap();
        store.create_user("root", "hash", Role::Admin).await.unwrap();
        let expires_at = Utc::now() + chrono::Duration::days(1);
        store.create_auth_session("s1", gone.user_id, expires_at).await.unwrap();
        store.create_highlight(new_highlight(gone.user_id, course.id)).await.unwrap();
        store.create_highlight(new_highlight(kept.user_id, course.id)).await.unwrap();

        let names: Vec<_> = store
            .list_users()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["gone", "kept"]);

        store.delete_user(gone.user_id).await.unwrap();
        store.delete_user(gone.user_id).await.unwrap();
        assert!(matches!(
            store.validate_auth_session("s1").await,
            Err(PortError::Unauthorized)
        ));
        assert!(store.list_highlights(gone.user_id, course.id).await.unwrap().is_empty());
        assert_eq!(store.list_highlights(kept.user_id, course.id).await.unwrap().len(), 1);
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn usernames_are_unique() {
        let store = MemoryAdapter::new();
        store.create_user("ada", "hash", Role::User).await.unwrap();
        assert!(matches!(
            store.create_user("ada", "other", Role::Admin).await,
            Err(PortError::Conflict(_))
        ));
    }
}
