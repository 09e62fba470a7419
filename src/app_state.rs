use sqlx::PgPool;
use std::sync::Arc;

use crate::services::{
    cv_list::CvListNotifier, events::DashboardEvents, profile_cache::ProfileCache,
    queue::MatchQueue,
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub profiles: Arc<ProfileCache>,
    /// Profiles that accept bulk CV lists.
    pub list_profiles: Arc<ProfileCache>,
    pub queue: Arc<MatchQueue>,
    pub events: Arc<DashboardEvents>,
    pub cv_lists: CvListNotifier,
}

impl AppState {
    pub fn new(
        db: PgPool,
        profiles: ProfileCache,
        list_profiles: ProfileCache,
        queue: MatchQueue,
        events: Arc<DashboardEvents>,
        cv_lists: CvListNotifier,
    ) -> Self {
        Self {
            db,
            profiles: Arc::new(profiles),
            list_profiles: Arc::new(list_profiles),
            queue: Arc::new(queue),
            events,
            cv_lists,
        }
    }
}
