use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::queries::{self, OutgoingEmail};
use crate::db::StoreError;
use crate::models::cv::Cv;
use crate::models::hook::DataKind;
use crate::models::matches::{FoundMatch, Match};
use crate::models::profile::Profile;
use crate::services::hooks::{HookError, HttpHookDispatcher};
use crate::services::processor::MatchActions;

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Profile HTTP call failed: {0}")]
    Http(#[from] HookError),

    #[error("Failed to queue e-mail: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Runs a profile's own on-match actions: HTTP calls and e-mails.
///
/// E-mails are written to the outbox table; rendering and delivery happen elsewhere.
pub struct ProfileActions {
    http: HttpHookDispatcher,
    db: PgPool,
    /// When set every e-mail goes here instead of to the profile's recipients.
    debug_send_emails_to: Option<String>,
}

impl ProfileActions {
    pub fn new(http: HttpHookDispatcher, db: PgPool, debug_send_emails_to: Option<String>) -> Self {
        Self {
            http,
            db,
            debug_send_emails_to,
        }
    }

    fn recipients<'a>(&'a self, profile: &'a Profile) -> Vec<&'a str> {
        match &self.debug_send_emails_to {
            Some(address) => vec![address.as_str()],
            None => profile
                .on_match
                .send_mail
                .iter()
                .map(|mail| mail.email.trim())
                .filter(|email| !email.is_empty())
                .collect(),
        }
    }
}

pub fn email_subject(profile: &Profile) -> String {
    format!("New match for {}", profile.name)
}

/// Plain text summary of a match, used as the e-mail body.
pub fn email_body(record: &Match, profile: &Profile, cv: &Cv, key_name: &str) -> String {
    let candidate = match cv.full_name() {
        name if name.is_empty() => format!("CV {}", cv.reference_number),
        name => name,
    };
    let reasons = match record.describe() {
        reasons if reasons.is_empty() => "its location".to_string(),
        reasons => reasons,
    };

    format!(
        "{candidate} matches profile \"{}\" on {reasons}.\n\nReference number: {}\nSource: {key_name}\n",
        profile.name, cv.reference_number,
    )
}

#[async_trait]
impl MatchActions for ProfileActions {
    fn needs_attachment(&self, profile: &Profile) -> bool {
        !self.recipients(profile).is_empty()
    }

    async fn handle_match(
        &self,
        found: &FoundMatch,
        record: &Match,
        cv: &Cv,
        attachment: Option<&[u8]>,
        key_name: &str,
    ) -> Result<(), ActionError> {
        let profile = &found.profile;
        let mut first_error: Option<ActionError> = None;

        if !profile.on_match.http_call.is_empty() {
            let payload = serde_json::to_vec(&serde_json::json!({
                "profileId": profile.id,
                "match": record,
            }))?;

            for call in &profile.on_match.http_call {
                if let Err(e) = self
                    .http
                    .call_with_retry(
                        call.method,
                        &call.uri,
                        &[],
                        record.request_id,
                        &payload,
                        DataKind::Match,
                    )
                    .await
                {
                    metrics::counter!("hook_calls_failed_total").increment(1);
                    tracing::error!(profile_id = %profile.id, uri = %call.uri, error = %e, "Profile HTTP call failed");
                    first_error.get_or_insert(e.into());
                }
            }
        }

        let recipients = self.recipients(profile);
        if !recipients.is_empty() {
            let subject = email_subject(profile);
            let body = email_body(record, profile, cv, key_name);
            for recipient in recipients {
                let email = OutgoingEmail {
                    recipient,
                    subject: subject.clone(),
                    body: body.clone(),
                    attachment,
                };
                match queries::insert_outgoing_email(&self.db, &email).await {
                    Ok(id) => tracing::info!(email_id = %id, profile_id = %profile.id, "Match e-mail queued"),
                    Err(e) => {
                        tracing::error!(profile_id = %profile.id, error = %e, "Unable to queue match e-mail");
                        first_error.get_or_insert(e.into());
                    }
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}
