//! Test helper utilities shared by the integration suites

#![allow(dead_code)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use cv_matcher::db::StoreError;
use cv_matcher::models::cv::Cv;
use cv_matcher::models::hook::{DataKind, OnMatchHook};
use cv_matcher::models::matches::{FoundMatch, Match, PendingMatchBatch};
use cv_matcher::models::profile::Profile;
use cv_matcher::services::actions::ActionError;
use cv_matcher::services::events::{DashboardEvent, EventError};
use cv_matcher::services::hooks::HookError;
use cv_matcher::services::processor::{
    EventPublisher, HookDispatcher, HookRegistry, MatchActions, MatchStore,
};

/// Response from POST /api/v1/scraper/scan-cv
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub success: bool,
    pub has_matches: bool,
    pub matches: Option<Vec<serde_json::Value>>,
}

/// Submit a scan to a running server
pub async fn scan_cv(
    client: &reqwest::Client,
    base_url: &str,
    key_id: &str,
    body: &serde_json::Value,
) -> Result<ScanResponse, Box<dyn std::error::Error>> {
    let response = client
        .post(format!("{}/api/v1/scraper/scan-cv", base_url))
        .header("X-Api-Key-Id", key_id)
        .json(body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await?;
        return Err(format!("Scan failed with status {}: {}", status, error_text).into());
    }

    Ok(response.json::<ScanResponse>().await?)
}

/// Match store kept in memory, recording every insert in order
#[derive(Default)]
pub struct MemoryMatchStore {
    pub matches: Mutex<Vec<Match>>,
}

impl MemoryMatchStore {
    pub fn stored(&self) -> Vec<Match> {
        self.matches.lock().unwrap().clone()
    }
}

#[async_trait]
impl MatchStore for MemoryMatchStore {
    async fn find_matches_by_reference_nr(
        &self,
        reference_nr: &str,
        key_id: Uuid,
    ) -> Result<Vec<Match>, StoreError> {
        Ok(self
            .matches
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.reference_nr == reference_nr && m.key_id == key_id)
            .cloned()
            .collect())
    }

    async fn insert_matches(&self, matches: &[Match]) -> Result<(), StoreError> {
        self.matches.lock().unwrap().extend_from_slice(matches);
        Ok(())
    }
}

/// No hooks configured
pub struct NoHooks;

#[async_trait]
impl HookRegistry for NoHooks {
    async fn enabled_hooks(&self) -> Result<Vec<OnMatchHook>, StoreError> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl HookDispatcher for NoHooks {
    async fn call(
        &self,
        hook: &OnMatchHook,
        _request_id: Uuid,
        _payload: &[u8],
        _kind: DataKind,
    ) -> Result<(), HookError> {
        panic!("no hooks are registered, yet {} was called", hook.url);
    }
}

/// Discards dashboard events
pub struct NoEvents;

impl EventPublisher for NoEvents {
    fn publish(
        &self,
        _event: DashboardEvent,
        _request_id: Uuid,
        _payload: serde_json::Value,
    ) -> Result<(), EventError> {
        Ok(())
    }
}

/// Forwards every handled match as `(reference number, profile name)`
pub struct ChannelActions {
    pub handled: mpsc::UnboundedSender<(String, String)>,
}

#[async_trait]
impl MatchActions for ChannelActions {
    fn needs_attachment(&self, _profile: &Profile) -> bool {
        false
    }

    async fn handle_match(
        &self,
        found: &FoundMatch,
        record: &Match,
        _cv: &Cv,
        _attachment: Option<&[u8]>,
        _key_name: &str,
    ) -> Result<(), ActionError> {
        let _ = self
            .handled
            .send((record.reference_nr.clone(), found.profile.name.clone()));
        Ok(())
    }
}

pub fn batch(key_id: Uuid, cv: Cv, matches: Vec<FoundMatch>) -> PendingMatchBatch {
    PendingMatchBatch {
        matches,
        cv,
        key_id,
        key_name: "test scraper".to_string(),
        request_id: Uuid::new_v4(),
        debug: false,
        span: tracing::Span::none(),
    }
}

/// Receive the next item or fail after five seconds
pub async fn recv_within<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for the match worker")
        .expect("match worker stopped")
}
