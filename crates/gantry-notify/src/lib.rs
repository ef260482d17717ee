//! Notification dispatch for completed patchsets.
//!
//! A patchset is announced exactly once, after every queued job for it has
//! completed. The dispatcher consolidates all jobs into a single message and
//! only flips the per-item notified flags once the transport accepts it, so
//! a failed delivery is retried on the next trigger.

pub mod dispatcher;
pub mod transport;

pub use dispatcher::Dispatcher;
pub use transport::WebhookTransport;
