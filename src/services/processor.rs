use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use tracing::Instrument;
use uuid::Uuid;

use crate::db::StoreError;
use crate::models::cv::Cv;
use crate::models::hook::{DataKind, OnMatchHook};
use crate::models::matches::{FoundMatch, Match, MatchStamp, PendingMatchBatch};
use crate::models::profile::Profile;
use crate::models::scan::HookMatchedCvData;
use crate::services::actions::ActionError;
use crate::services::attachment::AttachmentError;
use crate::services::events::{DashboardEvent, EventError};
use crate::services::hooks::HookError;
use crate::services::queue::BatchProcessor;

/// Persistence of match records.
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// All matches previously recorded for a CV reference submitted by `key_id`.
    async fn find_matches_by_reference_nr(
        &self,
        reference_nr: &str,
        key_id: Uuid,
    ) -> Result<Vec<Match>, StoreError>;

    async fn insert_matches(&self, matches: &[Match]) -> Result<(), StoreError>;
}

#[async_trait]
pub trait HookRegistry: Send + Sync {
    async fn enabled_hooks(&self) -> Result<Vec<OnMatchHook>, StoreError>;
}

#[async_trait]
pub trait HookDispatcher: Send + Sync {
    async fn call(
        &self,
        hook: &OnMatchHook,
        request_id: Uuid,
        payload: &[u8],
        kind: DataKind,
    ) -> Result<(), HookError>;
}

pub trait EventPublisher: Send + Sync {
    fn publish(
        &self,
        event: DashboardEvent,
        request_id: Uuid,
        payload: serde_json::Value,
    ) -> Result<(), EventError>;
}

/// Renders a CV into a document attached to match e-mails.
#[async_trait]
pub trait AttachmentGenerator: Send + Sync {
    async fn generate(&self, cv: &Cv) -> Result<Vec<u8>, AttachmentError>;
}

/// What a single profile wants done when it matches.
#[async_trait]
pub trait MatchActions: Send + Sync {
    fn needs_attachment(&self, profile: &Profile) -> bool;

    async fn handle_match(
        &self,
        found: &FoundMatch,
        record: &Match,
        cv: &Cv,
        attachment: Option<&[u8]>,
        key_name: &str,
    ) -> Result<(), ActionError>;
}

/// Turns queued match batches into persisted, deduplicated, dispatched matches.
///
/// Every step logs its failure and carries on with a sensible default; nothing
/// that happens here is reported back to the scraper.
pub struct MatchProcessor {
    store: Arc<dyn MatchStore>,
    hooks: Arc<dyn HookRegistry>,
    dispatcher: Arc<dyn HookDispatcher>,
    events: Arc<dyn EventPublisher>,
    actions: Arc<dyn MatchActions>,
    attachments: Option<Arc<dyn AttachmentGenerator>>,
}

impl MatchProcessor {
    pub fn new(
        store: Arc<dyn MatchStore>,
        hooks: Arc<dyn HookRegistry>,
        dispatcher: Arc<dyn HookDispatcher>,
        events: Arc<dyn EventPublisher>,
        actions: Arc<dyn MatchActions>,
    ) -> Self {
        Self {
            store,
            hooks,
            dispatcher,
            events,
            actions,
            attachments: None,
        }
    }

    pub fn with_attachments(mut self, generator: Arc<dyn AttachmentGenerator>) -> Self {
        self.attachments = Some(generator);
        self
    }

    async fn handle(&self, mut batch: PendingMatchBatch) {
        let started = Instant::now();

        self.publish(
            DashboardEvent::CvReceived,
            batch.request_id,
            serde_json::json!({
                "referenceNumber": batch.cv.reference_number,
                "keyId": batch.key_id,
                "keyName": batch.key_name,
            }),
        );

        if batch.matches.is_empty() {
            return;
        }

        let previous = match self
            .store
            .find_matches_by_reference_nr(&batch.cv.reference_number, batch.key_id)
            .await
        {
            Ok(previous) => previous,
            Err(e) => {
                tracing::error!(error = %e, "Unable to load previous matches, assuming none");
                Vec::new()
            }
        };

        let before = batch.matches.len();
        batch
            .matches
            .retain(|found| !previous.iter().any(|m| m.profile_id == found.profile.id));
        let deduplicated = before - batch.matches.len();
        if deduplicated > 0 {
            metrics::counter!("matches_deduplicated_total").increment(deduplicated as u64);
            tracing::debug!(deduplicated, "Dropped matches that were already reported");
        }

        if batch.matches.is_empty() {
            return;
        }

        let stamp = MatchStamp {
            request_id: batch.request_id,
            key_id: batch.key_id,
            reference_nr: &batch.cv.reference_number,
            debug: batch.debug,
            when: Utc::now(),
        };
        let records: Vec<Match> = batch
            .matches
            .iter()
            .map(|found| Match::record(found, &stamp))
            .collect();

        match serde_json::to_value(&records) {
            Ok(payload) => self.publish(DashboardEvent::MatchesFound, batch.request_id, payload),
            Err(e) => tracing::error!(error = %e, "Unable to encode matches for dashboard"),
        }

        match self.store.insert_matches(&records).await {
            Ok(()) => {
                metrics::counter!("matches_persisted_total").increment(records.len() as u64);
            }
            Err(e) => tracing::error!(error = %e, "Unable to persist matches"),
        }

        if !batch.debug {
            self.call_hooks(&batch).await;
            self.run_profile_actions(&batch, &records).await;
        }

        metrics::histogram!("match_batch_processing_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(
            matches = records.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Match batch processed"
        );
    }

    fn publish(&self, event: DashboardEvent, request_id: Uuid, payload: serde_json::Value) {
        if let Err(e) = self.events.publish(event, request_id, payload) {
            tracing::warn!(event = %event, error = %e, "Unable to publish dashboard event");
        }
    }

    async fn call_hooks(&self, batch: &PendingMatchBatch) {
        let hooks = match self.hooks.enabled_hooks().await {
            Ok(hooks) => hooks,
            Err(e) => {
                tracing::error!(error = %e, "Unable to load on-match hooks");
                return;
            }
        };
        if hooks.is_empty() {
            return;
        }

        let data = HookMatchedCvData {
            matched_profiles: &batch.matches,
            cv: &batch.cv,
            key_id: batch.key_id,
            key_name: &batch.key_name,
            is_test: false,
        };
        let payload = match serde_json::to_vec(&data) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "Unable to encode hook payload");
                return;
            }
        };

        for hook in &hooks {
            if let Err(e) = self
                .dispatcher
                .call(hook, batch.request_id, &payload, DataKind::Match)
                .await
            {
                metrics::counter!("hook_calls_failed_total").increment(1);
                tracing::error!(hook_id = %hook.id, url = %hook.url, error = %e, "On-match hook call failed");
            }
        }
    }

    async fn run_profile_actions(&self, batch: &PendingMatchBatch, records: &[Match]) {
        let mut attachment: Option<Vec<u8>> = None;
        let mut attachment_attempted = false;

        for (found, record) in batch.matches.iter().zip(records) {
            if !attachment_attempted && self.actions.needs_attachment(&found.profile) {
                attachment_attempted = true;
                attachment = self.generate_attachment(&batch.cv).await;
            }

            if let Err(e) = self
                .actions
                .handle_match(found, record, &batch.cv, attachment.as_deref(), &batch.key_name)
                .await
            {
                tracing::error!(profile_id = %found.profile.id, error = %e, "On-match action failed");
            }
        }
    }

    async fn generate_attachment(&self, cv: &Cv) -> Option<Vec<u8>> {
        let generator = self.attachments.as_ref()?;
        match generator.generate(cv).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::error!(error = %e, "Unable to generate CV attachment");
                None
            }
        }
    }
}

#[async_trait]
impl BatchProcessor for MatchProcessor {
    async fn process(&self, batch: PendingMatchBatch) {
        let span = batch.span.clone();
        self.handle(batch).instrument(span).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::matches::MatchDetail;
    use crate::models::profile::ProfileSendEmailData;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        matches: Mutex<Vec<Match>>,
        fail_lookup: bool,
    }

    #[async_trait]
    impl MatchStore for MemoryStore {
        async fn find_matches_by_reference_nr(
            &self,
            reference_nr: &str,
            key_id: Uuid,
        ) -> Result<Vec<Match>, StoreError> {
            if self.fail_lookup {
                return Err(StoreError::Decode("lookup unavailable".to_string()));
            }
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

    #[derive(Default)]
    struct Hooks {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HookRegistry for Hooks {
        async fn enabled_hooks(&self) -> Result<Vec<OnMatchHook>, StoreError> {
            Ok(vec![OnMatchHook {
                id: Uuid::new_v4(),
                key_id: Uuid::new_v4(),
                disabled: false,
                url: "http://hooks.invalid/match".to_string(),
                method: Default::default(),
                add_headers: Vec::new(),
            }])
        }
    }

    #[async_trait]
    impl HookDispatcher for Hooks {
        async fn call(
            &self,
            _hook: &OnMatchHook,
            _request_id: Uuid,
            payload: &[u8],
            kind: DataKind,
        ) -> Result<(), HookError> {
            assert_eq!(kind, DataKind::Match);
            let body: serde_json::Value = serde_json::from_slice(payload).unwrap();
            assert!(body["matchedProfiles"].is_array());
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct Events {
        published: Mutex<Vec<DashboardEvent>>,
        fail: bool,
    }

    impl EventPublisher for Events {
        fn publish(
            &self,
            event: DashboardEvent,
            _request_id: Uuid,
            _payload: serde_json::Value,
        ) -> Result<(), EventError> {
            if self.fail {
                let broken = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
                return Err(EventError::Encode(broken));
            }
            self.published.lock().unwrap().push(event);
            Ok(())
        }
    }

    #[derive(Default)]
    struct Actions {
        handled: Mutex<Vec<(Uuid, Option<Vec<u8>>)>>,
    }

    #[async_trait]
    impl MatchActions for Actions {
        fn needs_attachment(&self, profile: &Profile) -> bool {
            !profile.on_match.send_mail.is_empty()
        }

        async fn handle_match(
            &self,
            found: &FoundMatch,
            _record: &Match,
            _cv: &Cv,
            attachment: Option<&[u8]>,
            _key_name: &str,
        ) -> Result<(), ActionError> {
            self.handled
                .lock()
                .unwrap()
                .push((found.profile.id, attachment.map(<[u8]>::to_vec)));
            Ok(())
        }
    }

    #[derive(Default)]
    struct Generator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AttachmentGenerator for Generator {
        async fn generate(&self, _cv: &Cv) -> Result<Vec<u8>, AttachmentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(b"%PDF".to_vec())
        }
    }

    struct Harness {
        store: Arc<MemoryStore>,
        hooks: Arc<Hooks>,
        events: Arc<Events>,
        actions: Arc<Actions>,
        generator: Arc<Generator>,
        processor: MatchProcessor,
    }

    fn harness(store: MemoryStore) -> Harness {
        let store = Arc::new(store);
        let hooks = Arc::new(Hooks::default());
        let events = Arc::new(Events::default());
        let actions = Arc::new(Actions::default());
        let generator = Arc::new(Generator::default());
        let processor = MatchProcessor::new(
            store.clone(),
            hooks.clone(),
            hooks.clone(),
            events.clone(),
            actions.clone(),
        )
        .with_attachments(generator.clone());
        Harness {
            store,
            hooks,
            events,
            actions,
            generator,
            processor,
        }
    }

    fn found(profile_id: Uuid, mail: bool) -> FoundMatch {
        let mut profile = Profile {
            id: profile_id,
            active: true,
            ..Default::default()
        };
        if mail {
            profile.on_match.send_mail.push(ProfileSendEmailData {
                email: "hr@example.com".to_string(),
            });
        }
        FoundMatch {
            matches: MatchDetail::default(),
            profile,
        }
    }

    fn batch(key_id: Uuid, matches: Vec<FoundMatch>, debug: bool) -> PendingMatchBatch {
        PendingMatchBatch {
            matches,
            cv: Cv {
                reference_number: "cv-1".to_string(),
                ..Default::default()
            },
            key_id,
            key_name: "scraper".to_string(),
            request_id: Uuid::new_v4(),
            debug,
            span: tracing::Span::none(),
        }
    }

    #[tokio::test]
    async fn test_persists_and_dispatches_new_matches() {
        let h = harness(MemoryStore::default());
        let key_id = Uuid::new_v4();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        h.processor
            .process(batch(key_id, vec![found(a, false), found(b, false)], false))
            .await;

        let stored = h.store.matches.lock().unwrap().clone();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|m| m.key_id == key_id && m.reference_nr == "cv-1"));
        assert_eq!(h.hooks.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.actions.handled.lock().unwrap().len(), 2);
        assert_eq!(
            *h.events.published.lock().unwrap(),
            vec![DashboardEvent::CvReceived, DashboardEvent::MatchesFound]
        );
    }

    #[tokio::test]
    async fn test_already_reported_profiles_are_skipped() {
        let h = harness(MemoryStore::default());
        let key_id = Uuid::new_v4();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        h.processor
            .process(batch(key_id, vec![found(a, false), found(b, false)], false))
            .await;
        h.processor
            .process(batch(key_id, vec![found(b, false)], false))
            .await;

        assert_eq!(h.store.matches.lock().unwrap().len(), 2);
        assert_eq!(h.hooks.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.actions.handled.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_dedup_is_scoped_to_key() {
        let h = harness(MemoryStore::default());
        let profile = Uuid::new_v4();

        h.processor
            .process(batch(Uuid::new_v4(), vec![found(profile, false)], false))
            .await;
        h.processor
            .process(batch(Uuid::new_v4(), vec![found(profile, false)], false))
            .await;

        assert_eq!(h.store.matches.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch_only_announces_cv() {
        let h = harness(MemoryStore::default());

        h.processor.process(batch(Uuid::new_v4(), Vec::new(), false)).await;

        assert!(h.store.matches.lock().unwrap().is_empty());
        assert_eq!(h.hooks.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            *h.events.published.lock().unwrap(),
            vec![DashboardEvent::CvReceived]
        );
    }

    #[tokio::test]
    async fn test_debug_batch_persisted_but_not_dispatched() {
        let h = harness(MemoryStore::default());

        h.processor
            .process(batch(Uuid::new_v4(), vec![found(Uuid::new_v4(), true)], true))
            .await;

        let stored = h.store.matches.lock().unwrap().clone();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].debug);
        assert_eq!(h.hooks.calls.load(Ordering::SeqCst), 0);
        assert!(h.actions.handled.lock().unwrap().is_empty());
        assert_eq!(h.generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_lookup_failure_treated_as_no_previous_matches() {
        let h = harness(MemoryStore {
            fail_lookup: true,
            ..Default::default()
        });

        h.processor
            .process(batch(Uuid::new_v4(), vec![found(Uuid::new_v4(), false)], false))
            .await;

        assert_eq!(h.store.matches.lock().unwrap().len(), 1);
        assert_eq!(h.actions.handled.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_matches_persisted_when_publishing_fails() {
        let store = Arc::new(MemoryStore::default());
        let hooks = Arc::new(Hooks::default());
        let actions = Arc::new(Actions::default());
        let processor = MatchProcessor::new(
            store.clone(),
            hooks.clone(),
            hooks.clone(),
            Arc::new(Events {
                fail: true,
                ..Default::default()
            }),
            actions.clone(),
        );

        processor
            .process(batch(Uuid::new_v4(), vec![found(Uuid::new_v4(), false)], false))
            .await;

        assert_eq!(store.matches.lock().unwrap().len(), 1);
        assert_eq!(hooks.calls.load(Ordering::SeqCst), 1);
        assert_eq!(actions.handled.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_attachment_generated_once_when_needed() {
        let h = harness(MemoryStore::default());
        let matches = vec![
            found(Uuid::new_v4(), false),
            found(Uuid::new_v4(), true),
            found(Uuid::new_v4(), true),
        ];

        h.processor.process(batch(Uuid::new_v4(), matches, false)).await;

        assert_eq!(h.generator.calls.load(Ordering::SeqCst), 1);
        let handled = h.actions.handled.lock().unwrap();
        assert!(handled[0].1.is_none());
        assert_eq!(handled[1].1.as_deref(), Some(&b"%PDF"[..]));
        assert_eq!(handled[2].1.as_deref(), Some(&b"%PDF"[..]));
    }

    #[tokio::test]
    async fn test_no_attachment_without_mail_recipients() {
        let h = harness(MemoryStore::default());

        h.processor
            .process(batch(Uuid::new_v4(), vec![found(Uuid::new_v4(), false)], false))
            .await;

        assert_eq!(h.generator.calls.load(Ordering::SeqCst), 0);
    }
}
