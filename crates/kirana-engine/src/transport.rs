//! The seam between operation logic and the two ways of reaching the
//! storefront (private endpoints, driven page).
//!
//! A transport does two things: translate an [`Operation`] into its ordered
//! candidate [`Action`]s, and execute a single action. It never classifies —
//! deciding whether a response means success belongs to the caller.

use async_trait::async_trait;
use thiserror::Error;

use crate::action::{Action, RawResult};
use crate::operation::Operation;

/// A fault at the transport level, before any business interpretation.
#[derive(Debug, Error)]
pub enum TransportFault {
    #[error("network error: {0}")]
    Network(String),

    #[error("timed out after {seconds}s waiting for {what}")]
    Timeout { what: String, seconds: u64 },

    /// The page never rendered the element the script needed. Distinct from
    /// [`TransportFault::Timeout`]: the page settled, the element is absent.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// The storefront rejected our credentials. Never worth another
    /// candidate — every one of them would carry the same session.
    #[error("authentication rejected by the storefront")]
    AuthRejected,

    /// Throttled. Hammering the remaining candidates would dig the hole
    /// deeper, so this aborts the whole attempt.
    #[error("rate limited, suggested wait {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The driven page or process died underneath us.
    #[error("session lost: {0}")]
    SessionLost(String),
}

impl TransportFault {
    /// Only plain network failures are worth re-running the *same*
    /// candidate. Everything else either moves to the next candidate or
    /// aborts the operation.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Faults that abort the whole candidate walk immediately.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::AuthRejected | Self::RateLimited { .. })
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Verify the transport is alive and authenticated enough to act,
    /// re-establishing whatever it can. Called before every operation.
    ///
    /// # Errors
    ///
    /// Returns a fault when the session cannot be (re-)established.
    async fn ensure_started(&self) -> Result<(), TransportFault>;

    /// The ordered candidate list for an operation. Order is meaningful:
    /// most-reliable first. An empty list means this transport cannot do
    /// the operation at all.
    fn candidates(&self, op: &Operation) -> Vec<Action>;

    /// Execute one action and return the raw material for classification.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportFault`]; see the variant docs for which ones
    /// the resolver retries, skips past, or aborts on.
    async fn execute(&self, action: &Action) -> Result<RawResult, TransportFault>;
}
