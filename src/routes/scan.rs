use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use garde::Validate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::queries;
use crate::error::ApiError;
use crate::models::api_key::{KeyRole, ScraperKey};
use crate::models::matches::PendingMatchBatch;
use crate::models::profile::Profile;
use crate::models::scan::{
    HookListedCvData, ScanCvListRequest, ScanCvListResponse, ScanCvRequest, ScanCvResponse,
};
use crate::services::cv_list::{match_cv_list, CvListNotifier};
use crate::services::matcher::match_profiles;
use crate::services::queue::MatchQueue;

/// Header carrying the id of the caller's API key.
pub const API_KEY_HEADER: &str = "x-api-key-id";

/// Look up the API key named by the request headers.
pub async fn resolve_key(db: &PgPool, headers: &HeaderMap) -> Result<ScraperKey, ApiError> {
    let key_id = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .ok_or(ApiError::Unauthorized)?;

    queries::find_scraper_key(db, key_id)
        .await?
        .ok_or(ApiError::Unauthorized)
}

/// POST /api/v1/scraper/scan-cv: match a scraped CV against all profiles.
///
/// Matching happens inline; persistence and notifications are queued and never
/// delay or fail the response.
pub async fn scan_cv(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ScanCvRequest>, JsonRejection>,
) -> Result<Json<ScanCvResponse>, ApiError> {
    let key = resolve_key(&state.db, &headers).await?;
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let profiles = state.profiles.snapshot().await?;
    let response = run_scan(&key, request, &profiles, &state.queue)?;

    Ok(Json(response))
}

/// Validate, match and enqueue one scan.
pub fn run_scan(
    key: &ScraperKey,
    request: ScanCvRequest,
    profiles: &[Profile],
    queue: &MatchQueue,
) -> Result<ScanCvResponse, ApiError> {
    if !key.has_role(KeyRole::Scraper) {
        return Err(ApiError::Forbidden("scraper"));
    }
    if request.debug && !key.has_role(KeyRole::Dashboard) {
        return Err(ApiError::Forbidden("dashboard"));
    }
    request.cv.validate()?;

    metrics::counter!("cvs_scanned_total").increment(1);
    let matches = match_profiles(&key.domains, profiles, &request.cv, Utc::now());
    metrics::counter!("profile_matches_total").increment(matches.len() as u64);

    let request_id = Uuid::new_v4();
    tracing::info!(
        request_id = %request_id,
        key_id = %key.id,
        reference_number = %request.cv.reference_number,
        matches = matches.len(),
        debug = request.debug,
        "CV scanned"
    );

    let has_matches = !matches.is_empty();
    let debug_matches = request.debug.then(|| matches.clone());

    if has_matches {
        let span = tracing::info_span!(
            "match_batch",
            request_id = %request_id,
            key_id = %key.id,
            reference_number = %request.cv.reference_number,
        );
        queue.enqueue(PendingMatchBatch {
            matches,
            cv: request.cv,
            key_id: key.id,
            key_name: key.name.clone(),
            request_id,
            debug: request.debug,
            span,
        });
    }

    Ok(ScanCvResponse {
        success: true,
        has_matches,
        matches: debug_matches,
    })
}

/// POST /api/v1/scraper/scan-cv-list: forward a list of CVs to the hooks of
/// profiles covering their postal codes.
pub async fn scan_cv_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ScanCvListRequest>, JsonRejection>,
) -> Result<Json<ScanCvListResponse>, ApiError> {
    let key = resolve_key(&state.db, &headers).await?;
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let profiles = state.list_profiles.snapshot().await?;
    let response = run_list_scan(&key, request, &profiles, &state.cv_lists)?;

    Ok(Json(response))
}

/// Validate and match one CV list, handing any matches to the hooks.
pub fn run_list_scan(
    key: &ScraperKey,
    request: ScanCvListRequest,
    profiles: &[Profile],
    notifier: &CvListNotifier,
) -> Result<ScanCvListResponse, ApiError> {
    if !key.has_role(KeyRole::Scraper) {
        return Err(ApiError::Forbidden("scraper"));
    }
    if request.cvs.is_empty() {
        return Err(ApiError::BadRequest("no CVs were provided".to_string()));
    }
    for cv in &request.cvs {
        cv.validate()?;
    }

    let submitted = request.cvs.len();
    metrics::counter!("cvs_scanned_total").increment(submitted as u64);
    let matches = match_cv_list(profiles, request.cvs);
    let matched_cvs = matches.cvs.len();
    metrics::counter!("cv_list_matches_total").increment(matched_cvs as u64);

    let request_id = Uuid::new_v4();
    tracing::info!(
        request_id = %request_id,
        key_id = %key.id,
        submitted,
        matched_cvs,
        "CV list scanned"
    );

    if matched_cvs > 0 {
        let data = HookListedCvData {
            matches: &matches,
            key_id: key.id,
            key_name: &key.name,
            is_test: false,
        };
        match serde_json::to_vec(&data) {
            Ok(payload) => {
                notifier.notify(request_id, payload);
            }
            Err(e) => tracing::error!(request_id = %request_id, error = %e, "Unable to encode CV list payload"),
        }
    }

    Ok(ScanCvListResponse {
        success: true,
        matched_cvs,
    })
}
