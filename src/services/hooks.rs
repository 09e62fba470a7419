use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use uuid::Uuid;

use crate::models::hook::{DataKind, Header, HttpMethod, OnMatchHook};
use crate::services::processor::HookDispatcher;

pub const USER_AGENT: &str = "cv-matcher";

/// Wait before each retry. One more attempt is made than there are entries.
const RETRY_BACKOFF: [Duration; 4] = [
    Duration::from_millis(100),
    Duration::from_millis(500),
    Duration::from_secs(1),
    Duration::from_secs(2),
];

/// Gateway errors usually mean the receiver is restarting.
fn is_retryable(status: u16) -> bool {
    matches!(status, 502..=504)
}

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Hook responded with HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Sends match payloads to hook URLs over HTTP.
#[derive(Clone)]
pub struct HttpHookDispatcher {
    http: reqwest::Client,
}

impl HttpHookDispatcher {
    /// Without a timeout a slow receiver holds up the batches queued after it.
    pub fn new(timeout: Option<Duration>) -> Result<Self, HookError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
        })
    }

    /// Call `url`, retrying gateway errors with back-off.
    pub async fn call_with_retry(
        &self,
        method: HttpMethod,
        url: &str,
        add_headers: &[Header],
        request_id: Uuid,
        payload: &[u8],
        kind: DataKind,
    ) -> Result<(), HookError> {
        let mut retries = RETRY_BACKOFF.iter();
        loop {
            match self
                .send(method, url, add_headers, request_id, payload, kind)
                .await
            {
                Err(HookError::Status { status, body }) if is_retryable(status) => {
                    let Some(wait) = retries.next() else {
                        return Err(HookError::Status { status, body });
                    };
                    tracing::warn!(
                        url = %url,
                        status,
                        retry_in_ms = wait.as_millis() as u64,
                        "Hook unavailable, retrying"
                    );
                    tokio::time::sleep(*wait).await;
                }
                result => return result,
            }
        }
    }

    async fn send(
        &self,
        method: HttpMethod,
        url: &str,
        add_headers: &[Header],
        request_id: Uuid,
        payload: &[u8],
        kind: DataKind,
    ) -> Result<(), HookError> {
        let mut request = self
            .http
            .request(method.into(), url)
            .header(CONTENT_TYPE, "application/json")
            .header("X-Request-ID", request_id.to_string())
            .header("Data-Kind", kind.to_string());
        for header in add_headers {
            for value in &header.value {
                request = request.header(header.key.as_str(), value.as_str());
            }
        }

        let response = request.body(payload.to_vec()).send().await?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(HookError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(url = %url, status = status.as_u16(), "Hook called");
        Ok(())
    }
}

#[async_trait]
impl HookDispatcher for HttpHookDispatcher {
    async fn call(
        &self,
        hook: &OnMatchHook,
        request_id: Uuid,
        payload: &[u8],
        kind: DataKind,
    ) -> Result<(), HookError> {
        self.call_with_retry(
            hook.method,
            &hook.url,
            &hook.add_headers,
            request_id,
            payload,
            kind,
        )
        .await
    }
}
