//! Operation-level error taxonomy.

use thiserror::Error;

use crate::transport::TransportFault;

#[derive(Debug, Error)]
pub enum OpError {
    /// Every candidate for the operation was tried and none classified as a
    /// success. Carries the last transport fault seen, if any — business
    /// failures (well-formed "no" responses) exhaust the list without one.
    #[error("{operation}: all {attempted} candidates exhausted")]
    Exhausted {
        operation: String,
        attempted: usize,
        #[source]
        last_fault: Option<TransportFault>,
    },

    /// Credentials rejected. Re-authentication is the only way forward.
    #[error("authentication required: {0}")]
    Auth(String),

    /// Throttled by the storefront; back off before anything else.
    #[error("rate limited, suggested wait {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// A previously seen product could not be found again, even after
    /// re-running its source query and falling back to name matching.
    #[error("product not locatable: {what}")]
    NotLocatable { what: String },

    /// Caller input rejected before touching the network.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The flow's cancel flag was raised; checked between steps only.
    #[error("cancelled by caller")]
    Cancelled,

    /// A transport fault that bypasses the candidate walk, e.g. the driven
    /// session dying during the liveness check.
    #[error("transport fault")]
    Transport(#[from] TransportFault),

    #[error("session store: {0}")]
    Session(#[from] crate::session::SessionError),
}

impl OpError {
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
