//! Bulk CV lists, matched on postal code alone and forwarded to the on-match hooks.

use std::ops::Range;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use crate::models::cv::Cv;
use crate::models::hook::DataKind;
use crate::models::profile::Profile;
use crate::models::scan::CvListMatches;
use crate::services::processor::{HookDispatcher, HookRegistry};

/// Valid city and area numbers of a Dutch postal code.
const POSTAL_CODE_NUMBERS: Range<u32> = 1000..10_000;

/// Match every CV against the list profiles covering its postal code.
///
/// CVs without a usable postal code are skipped.
pub fn match_cv_list(profiles: &[Profile], cvs: Vec<Cv>) -> CvListMatches {
    let mut matches = CvListMatches::default();

    for cv in cvs {
        let Some(code) = cv
            .personal_details
            .postal_code_number()
            .filter(|code| POSTAL_CODE_NUMBERS.contains(code))
        else {
            continue;
        };

        let mut matched = false;
        for profile in profiles.iter().filter(|p| p.is_list_profile()) {
            if profile
                .zip_codes
                .iter()
                .any(|range| !range.is_unset() && range.contains(code))
            {
                matched = true;
                matches
                    .profiles_match_cvs
                    .entry(profile.id)
                    .or_default()
                    .push(cv.reference_number.clone());
            }
        }

        if matched {
            matches.cvs.insert(cv.reference_number.clone(), cv);
        }
    }

    matches
}

/// Delivers matched CV lists to every enabled on-match hook.
#[derive(Clone)]
pub struct CvListNotifier {
    hooks: Arc<dyn HookRegistry>,
    dispatcher: Arc<dyn HookDispatcher>,
}

impl CvListNotifier {
    pub fn new(hooks: Arc<dyn HookRegistry>, dispatcher: Arc<dyn HookDispatcher>) -> Self {
        Self { hooks, dispatcher }
    }

    /// Deliver `payload` in the background so slow hooks never hold up the scraper.
    pub fn notify(&self, request_id: Uuid, payload: Vec<u8>) -> JoinHandle<usize> {
        let notifier = self.clone();
        let span = tracing::info_span!("cv_list_delivery", request_id = %request_id);
        tokio::spawn(async move { notifier.deliver(request_id, &payload).await }.instrument(span))
    }

    /// Call every enabled hook with `payload`, returning how many accepted it.
    pub async fn deliver(&self, request_id: Uuid, payload: &[u8]) -> usize {
        let hooks = match self.hooks.enabled_hooks().await {
            Ok(hooks) => hooks,
            Err(e) => {
                tracing::error!(error = %e, "Unable to load on-match hooks");
                return 0;
            }
        };
        if hooks.is_empty() {
            tracing::info!("No hooks configured to send matched CV lists to");
            return 0;
        }

        let mut delivered = 0;
        for hook in &hooks {
            match self
                .dispatcher
                .call(hook, request_id, payload, DataKind::List)
                .await
            {
                Ok(()) => delivered += 1,
                Err(e) => {
                    metrics::counter!("hook_calls_failed_total").increment(1);
                    tracing::error!(hook_id = %hook.id, url = %hook.url, error = %e, "CV list hook call failed");
                }
            }
        }
        delivered
    }
}
