//! Structured operation outcomes.
//!
//! Every operation reports one of these rather than a bare boolean so that
//! callers can branch on unavailability, partial completion, and pending
//! authentication without string matching.

use serde::{Deserialize, Serialize};

/// Result of an add-to-cart operation. Hitting a per-item maximum caps the
/// achieved quantity; it is not a failure of the whole operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AddOutcome {
    pub requested: u32,
    pub achieved: u32,
    /// Set when a source-enforced per-item maximum stopped us short.
    pub capped: bool,
}

impl AddOutcome {
    #[must_use]
    pub fn shortfall(&self) -> u32 {
        self.requested.saturating_sub(self.achieved)
    }
}

/// Which screen the storefront landed on after a checkout/proceed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutState {
    /// Address-selection markers detected; the caller must select one.
    AddressRequired,
    /// Payment markers detected; ready for method selection.
    PaymentReady,
    /// Neither marker set appeared within the bounded wait. The caller
    /// should inspect the session before retrying.
    Unknown,
}

/// Authentication progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum AuthStatus {
    /// A one-time code was dispatched; confirmation is pending.
    OtpSent { session_id: Option<String> },
    LoggedIn,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortfall_is_requested_minus_achieved() {
        let outcome = AddOutcome {
            requested: 5,
            achieved: 3,
            capped: true,
        };
        assert_eq!(outcome.shortfall(), 2);
    }

    #[test]
    fn shortfall_never_underflows() {
        let outcome = AddOutcome {
            requested: 1,
            achieved: 1,
            capped: false,
        };
        assert_eq!(outcome.shortfall(), 0);
    }
}
