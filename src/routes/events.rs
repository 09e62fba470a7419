use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};
use tokio::sync::broadcast::error::RecvError;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::api_key::KeyRole;
use crate::routes::scan::resolve_key;

/// GET /api/v1/events: live processing events for the dashboard.
pub async fn dashboard_events(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let key = resolve_key(&state.db, &headers).await?;
    if !key.has_role(KeyRole::Dashboard) {
        return Err(ApiError::Forbidden("dashboard"));
    }

    tracing::info!(key_id = %key.id, listeners = state.events.listener_count() + 1, "Dashboard listener connected");

    let receiver = state.events.subscribe();
    let stream = stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(message) => return Some((Ok(Event::default().data(&*message)), receiver)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Dashboard listener fell behind, events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(30))))
}
