use burrow_core::DeletionRequest;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tracing::warn;

/// Default number of requests the queue buffers before producers wait.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Default time a producer waits for queue space before giving up.
pub const DEFAULT_ENQUEUE_TIMEOUT: Duration = Duration::from_secs(2);

/// Outcome of [`DeletionQueue::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueue {
    Accepted,
    /// The queue stayed full for the whole timeout or the worker is gone.
    Dropped,
}

/// Producer side of the deletion queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DeletionQueue {
    sender: mpsc::Sender<DeletionRequest>,
}

/// Consumer side of the deletion queue, owned by the worker.
pub type DeletionReceiver = mpsc::Receiver<DeletionRequest>;

impl DeletionQueue {
    /// Creates a bounded queue. A zero capacity is raised to one.
    pub fn channel(capacity: usize) -> (Self, DeletionReceiver) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Pushes a request, waiting at most `timeout` for space.
    ///
    /// Requests that cannot be queued are logged and dropped; the caller
    /// has already answered its client by then.
    pub async fn enqueue(&self, request: DeletionRequest, timeout: Duration) -> Enqueue {
        match self.sender.send_timeout(request, timeout).await {
            Ok(()) => Enqueue::Accepted,
            Err(SendTimeoutError::Timeout(request)) => {
                warn!(
                    owner = %request.owner_id,
                    codes = request.short_codes.len(),
                    timeout_ms = timeout.as_millis() as u64,
                    "deletion queue full, dropping request"
                );
                Enqueue::Dropped
            }
            Err(SendTimeoutError::Closed(request)) => {
                warn!(
                    owner = %request.owner_id,
                    codes = request.short_codes.len(),
                    "deletion worker stopped, dropping request"
                );
                Enqueue::Dropped
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
