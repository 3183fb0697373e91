//! Resilience helpers: bounded retry for startup checks and shutdown signalling.

pub mod retry;
pub mod shutdown;

pub use retry::{retry, LinearBackoff, RetryError};
pub use shutdown::{drain_with_deadline, ShutdownError, ShutdownSignal};
