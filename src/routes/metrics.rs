use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// GET /metrics: Prometheus text exposition.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}

/// Register descriptions for everything the service records.
pub fn describe_metrics() {
    metrics::describe_counter!("cvs_scanned_total", "CVs submitted by scrapers");
    metrics::describe_counter!("profile_matches_total", "Profile matches found while scanning");
    metrics::describe_counter!(
        "cv_list_matches_total",
        "CVs from scraped lists that fell inside a list profile's area"
    );
    metrics::describe_counter!(
        "matches_deduplicated_total",
        "Matches dropped because the CV was already reported for the profile"
    );
    metrics::describe_counter!("matches_persisted_total", "Match records written");
    metrics::describe_counter!("hook_calls_failed_total", "On-match HTTP calls that failed");
    metrics::describe_counter!(
        "match_batches_panicked_total",
        "Match batches whose processing panicked"
    );
    metrics::describe_gauge!("match_queue_depth", "Match batches waiting for the worker");
    metrics::describe_histogram!(
        "match_batch_processing_seconds",
        "Time spent processing one match batch"
    );
}
