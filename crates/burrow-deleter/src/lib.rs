//! Asynchronous batch deletion.
//!
//! Request handlers push [`DeletionRequest`](burrow_core::DeletionRequest)s
//! into a bounded [`DeletionQueue`]. A single [`DeletionWorker`] drains the
//! queue and applies the accumulated batch to storage with one
//! `soft_delete` call once the batch is large enough, once the flush
//! interval elapses, or when the service shuts down.

pub mod queue;
pub mod worker;

pub use queue::{
    DeletionQueue, DeletionReceiver, Enqueue, DEFAULT_CAPACITY, DEFAULT_ENQUEUE_TIMEOUT,
};
pub use worker::{DeletionWorker, WorkerHandle, WorkerSettings};
