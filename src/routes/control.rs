use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::api_key::{KeyRole, ScraperKey};
use crate::routes::scan::resolve_key;
use crate::services::profile_cache::ProfileCache;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadProfilesResponse {
    pub success: bool,
    pub profiles: usize,
    pub list_profiles: usize,
}

/// GET /api/v1/control/reload-profiles: pick up profile edits without waiting
/// for the cache to expire.
pub async fn reload_profiles(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ReloadProfilesResponse>, ApiError> {
    let key = resolve_key(&state.db, &headers).await?;
    let response = run_reload(&key, &state.profiles, &state.list_profiles).await?;
    Ok(Json(response))
}

/// Drop both profile snapshots and load them again straight away.
pub async fn run_reload(
    key: &ScraperKey,
    profiles: &ProfileCache,
    list_profiles: &ProfileCache,
) -> Result<ReloadProfilesResponse, ApiError> {
    if !key.has_role(KeyRole::Admin) && !key.has_role(KeyRole::Controller) {
        return Err(ApiError::Forbidden("admin"));
    }

    profiles.invalidate().await;
    list_profiles.invalidate().await;
    let response = ReloadProfilesResponse {
        success: true,
        profiles: profiles.snapshot().await?.len(),
        list_profiles: list_profiles.snapshot().await?.len(),
    };

    tracing::info!(
        key_id = %key.id,
        profiles = response.profiles,
        list_profiles = response.list_profiles,
        "Profiles reloaded"
    );
    Ok(response)
}
