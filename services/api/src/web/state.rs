//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use course_highlights_core::ports::{CourseRepository, HighlightStore, UserRepository};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub courses: Arc<dyn CourseRepository>,
    pub highlights: Arc<dyn HighlightStore>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires every port to the same adapter, which is how both storage adapters are used.
    pub fn with_storage<S>(storage: Arc<S>, config: Arc<Config>) -> Self
    where
        S: UserRepository + CourseRepository + HighlightStore + 'static,
    {
        Self {
            users: storage.clone(),
            courses: storage.clone(),
            highlights: storage,
            config,
        }
    }
}
