//! Ordered candidate execution with per-candidate retry.
//!
//! An operation maps to a list of candidate actions, most-reliable first.
//! [`attempt`] walks the list: each candidate is executed (with bounded
//! retry on plain network faults), its response classified, and the first
//! success wins. A definitive storefront answer — a refusal banner or a
//! quantity cap — stops the walk even though it is not a success; the
//! remaining candidates would only re-ask the same question.

use std::future::Future;
use std::time::Duration;

use crate::classify::{classify, Classification};
use crate::error::OpError;
use crate::operation::Operation;
use crate::transport::{Transport, TransportFault};

/// Retry and back-off knobs, taken from the app config.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_ms: 1_000,
        }
    }
}

/// A winning (or definitively answered) attempt.
#[derive(Debug)]
pub struct Resolved {
    pub classification: Classification,
    /// Which candidate produced the answer, zero-based. Logged so endpoint
    /// rot shows up as a creeping index before it becomes an outage.
    pub candidate_index: usize,
}

/// Walk the operation's candidates on `transport` until one classifies as
/// a success or gives a definitive refusal.
///
/// # Errors
///
/// - [`OpError::Auth`] / [`OpError::RateLimited`] as soon as any candidate
///   reports them; later candidates are not tried.
/// - [`OpError::Exhausted`] when every candidate failed, carrying the last
///   transport fault seen (if the failures were not all business-level).
pub async fn attempt<T>(
    transport: &T,
    op: &Operation,
    policy: RetryPolicy,
) -> Result<Resolved, OpError>
where
    T: Transport + ?Sized,
{
    let candidates = transport.candidates(op);
    if candidates.is_empty() {
        return Err(OpError::Exhausted {
            operation: op.name().to_owned(),
            attempted: 0,
            last_fault: None,
        });
    }

    let kind = op.kind();
    let mut last_fault: Option<TransportFault> = None;

    for (index, action) in candidates.iter().enumerate() {
        let outcome = retry_with_backoff(policy, || transport.execute(action)).await;
        match outcome {
            Ok(raw) => {
                let classification = classify(kind, &raw);
                if classification.success || classification.halts_walk() {
                    if index > 0 {
                        tracing::debug!(
                            operation = op.name(),
                            candidate = index,
                            action = %action.describe(),
                            "resolved on a fallback candidate"
                        );
                    }
                    return Ok(Resolved {
                        classification,
                        candidate_index: index,
                    });
                }
                tracing::debug!(
                    operation = op.name(),
                    candidate = index,
                    action = %action.describe(),
                    "candidate answered but did not classify as success"
                );
            }
            Err(fault) if fault.is_terminal() => {
                return Err(match fault {
                    TransportFault::AuthRejected => {
                        OpError::Auth("storefront rejected the session".to_owned())
                    }
                    TransportFault::RateLimited { retry_after_secs } => {
                        OpError::RateLimited { retry_after_secs }
                    }
                    other => OpError::Transport(other),
                });
            }
            Err(fault) => {
                tracing::debug!(
                    operation = op.name(),
                    candidate = index,
                    action = %action.describe(),
                    error = %fault,
                    "candidate faulted, moving to the next"
                );
                last_fault = Some(fault);
            }
        }
    }

    Err(OpError::Exhausted {
        operation: op.name().to_owned(),
        attempted: candidates.len(),
        last_fault,
    })
}

/// Runs `operation` with up to `policy.max_retries` additional attempts on
/// retriable faults.
///
/// Back-off schedule with `backoff_base_ms = 1_000`:
///
/// | Attempt | Sleep before next attempt    |
/// |---------|------------------------------|
/// | 1       | 1 000 ms × 2⁰ ± 25 % jitter |
/// | 2       | 1 000 ms × 2¹ ± 25 % jitter |
/// | 3       | 1 000 ms × 2² ± 25 % jitter |
///
/// Delay is capped at 60 s. Non-retriable faults are returned immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, TransportFault>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportFault>>,
{
    const MAX_DELAY_MS: u64 = 60_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(fault) => {
                if !fault.is_retriable() || attempt >= policy.max_retries {
                    return Err(fault);
                }
                attempt += 1;
                let computed = policy
                    .backoff_base_ms
                    .saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms,
                    error = %fault,
                    "transient network fault — retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
