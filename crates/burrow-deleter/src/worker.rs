use crate::queue::DeletionReceiver;
use burrow_core::{DeletionRequest, Storage};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use typed_builder::TypedBuilder;

/// Tuning knobs for [`DeletionWorker`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct WorkerSettings {
    /// Flush as soon as the pending batch holds at least this many codes.
    #[builder(default = 100)]
    pub batch_threshold: usize,
    /// Flush a non-empty batch at least this often.
    #[builder(default = Duration::from_secs(10))]
    pub flush_interval: Duration,
    /// Upper bound on a single `soft_delete` call.
    #[builder(default = Duration::from_secs(10))]
    pub flush_timeout: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Drains the deletion queue and applies batches to storage.
///
/// Exactly one worker should own a given receiver. A batch whose flush
/// fails is kept and retried on the next tick, so requests are never
/// dropped once they reach the worker while it keeps running. Until that
/// retry succeeds, new arrivals only grow the batch.
pub struct DeletionWorker<S: Storage + ?Sized> {
    storage: Arc<S>,
    receiver: DeletionReceiver,
    settings: WorkerSettings,
    pending: Vec<DeletionRequest>,
    pending_codes: usize,
    backing_off: bool,
}

impl<S: Storage + ?Sized> DeletionWorker<S> {
    pub fn new(storage: Arc<S>, receiver: DeletionReceiver, settings: WorkerSettings) -> Self {
        Self {
            storage,
            receiver,
            settings,
            pending: Vec::new(),
            pending_codes: 0,
            backing_off: false,
        }
    }

    /// Runs until `shutdown` resolves or every queue handle is dropped.
    ///
    /// On shutdown the queue is closed, whatever is still buffered is
    /// moved into the batch and a final flush is attempted.
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let period = self.settings.flush_interval.max(Duration::from_millis(1));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            batch_threshold = self.settings.batch_threshold,
            flush_interval_ms = period.as_millis() as u64,
            "deletion worker started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    self.receiver.close();
                    while let Some(request) = self.receiver.recv().await {
                        self.push(request);
                    }
                    self.flush().await;
                    break;
                }
                received = self.receiver.recv() => match received {
                    Some(request) => {
                        self.push(request);
                        if !self.backing_off
                            && self.pending_codes >= self.settings.batch_threshold
                        {
                            self.flush().await;
                        }
                    }
                    None => {
                        self.flush().await;
                        break;
                    }
                },
                _ = ticker.tick() => {
                    self.flush().await;
                }
            }
        }

        if self.pending.is_empty() {
            info!("deletion worker stopped");
        } else {
            error!(
                requests = self.pending.len(),
                codes = self.pending_codes,
                "deletion worker stopped with unflushed requests"
            );
        }
    }

    /// Spawns the worker on the current runtime.
    pub fn spawn(self) -> WorkerHandle
    where
        S: 'static,
    {
        let (tx, rx) = oneshot::channel::<()>();
        let join = tokio::spawn(self.run(async move {
            // A dropped handle counts as a shutdown request.
            let _ = rx.await;
        }));

        WorkerHandle { tx, join }
    }

    fn push(&mut self, request: DeletionRequest) {
        if request.short_codes.is_empty() {
            return;
        }
        self.pending_codes += request.short_codes.len();
        self.pending.push(request);
    }

    async fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        let requests = self.pending.len();
        let codes = self.pending_codes;
        let timeout = self.settings.flush_timeout;

        match tokio::time::timeout(timeout, self.storage.soft_delete(&self.pending)).await {
            Ok(Ok(())) => {
                debug!(requests, codes, "flushed deletion batch");
                self.pending.clear();
                self.pending_codes = 0;
                self.backing_off = false;
                return;
            }
            Ok(Err(err)) => {
                warn!(
                    requests,
                    codes,
                    error = %err,
                    "failed to flush deletion batch, keeping it for retry"
                );
            }
            Err(_) => {
                warn!(
                    requests,
                    codes,
                    timeout_ms = timeout.as_millis() as u64,
                    "deletion flush timed out, keeping batch for retry"
                );
            }
        }
        self.backing_off = true;
    }
}

/// Handle to a spawned [`DeletionWorker`].
pub struct WorkerHandle {
    tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Signals the worker and waits for its final flush.
    pub async fn shutdown(self) {
        let _ = self.tx.send(());
        if let Err(err) = self.join.await {
            error!(error = %err, "deletion worker task failed");
        }
    }
}
