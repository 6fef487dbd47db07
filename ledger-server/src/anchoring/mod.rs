//! Anchoring subsystem
//!
//! Decouples digest submission to the external ledger from the request
//! path: the record builder enqueues, the worker consumes. The queue is
//! durable (redb) with at-least-once delivery; redelivery policy lives
//! in the queue, not the worker.

pub mod queue;
pub mod worker;

pub use queue::{AnchorJob, AnchorQueue, DeadLetterJob, QueueError};
pub use worker::AnchorWorker;
