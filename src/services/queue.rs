use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::sync::Notify;

use crate::models::matches::PendingMatchBatch;

/// Handles one dequeued batch. Implemented by the match processor.
#[async_trait]
pub trait BatchProcessor: Send + Sync + 'static {
    async fn process(&self, batch: PendingMatchBatch);
}

/// In-process FIFO of match batches drained by a single background worker.
///
/// `enqueue` never blocks on processing. The worker is spawned on the first
/// enqueue and then runs for the lifetime of the runtime, handing batches to
/// the processor one at a time in submission order.
pub struct MatchQueue {
    shared: Arc<Shared>,
    runtime: Handle,
}

struct Shared {
    state: Mutex<QueueState>,
    wake: Notify,
    processor: Arc<dyn BatchProcessor>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<PendingMatchBatch>,
    started: bool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // The state is a plain list, it stays consistent even if a holder panicked.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MatchQueue {
    /// Create a queue whose worker will run on the current tokio runtime.
    pub fn new(processor: Arc<dyn BatchProcessor>) -> Result<Self, QueueError> {
        let runtime = Handle::try_current()?;
        Ok(Self::with_runtime(processor, runtime))
    }

    pub fn with_runtime(processor: Arc<dyn BatchProcessor>, runtime: Handle) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::default()),
                wake: Notify::new(),
                processor,
            }),
            runtime,
        }
    }

    /// Append a batch and wake the worker, starting it on first use.
    pub fn enqueue(&self, batch: PendingMatchBatch) {
        let mut state = self.shared.lock();
        state.pending.push_back(batch);
        metrics::gauge!("match_queue_depth").set(state.pending.len() as f64);

        if !state.started {
            state.started = true;
            tracing::info!("Starting match processing worker");
            self.runtime.spawn(run_worker(Arc::clone(&self.shared)));
        }
        drop(state);

        self.shared.wake.notify_one();
    }

    /// Number of batches waiting for the worker.
    pub fn depth(&self) -> usize {
        self.shared.lock().pending.len()
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().started
    }
}

async fn run_worker(shared: Arc<Shared>) {
    loop {
        let next = {
            let mut state = shared.lock();
            let batch = state.pending.pop_front();
            metrics::gauge!("match_queue_depth").set(state.pending.len() as f64);
            batch
        };

        let Some(batch) = next else {
            shared.wake.notified().await;
            continue;
        };

        let request_id = batch.request_id;
        let processor = Arc::clone(&shared.processor);

        // A panicking batch must not take the worker down with it.
        let outcome = tokio::spawn(async move { processor.process(batch).await }).await;
        match outcome {
            Ok(()) => {
                tracing::debug!(request_id = %request_id, "Match batch processed");
            }
            Err(e) if e.is_panic() => {
                metrics::counter!("match_batches_panicked_total").increment(1);
                tracing::error!(
                    request_id = %request_id,
                    error = %e,
                    "Match batch panicked, continuing with next batch"
                );
            }
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Match batch cancelled");
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("No tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}
