//! End-to-end ordering flow as an explicit state machine.
//!
//! The storefront's checkout is a sequence of screens, so the workflow
//! tracks which screen it believes it is on and refuses steps that make no
//! sense from there. Every step is independently retryable: a failure
//! records where it happened and what went wrong, and re-invoking the same
//! step picks up from the state the failure interrupted. A cooperative
//! cancel flag is honored between steps, never mid-request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use kirana_core::models::{PaymentMethod, SearchResult};
use kirana_core::outcome::{AddOutcome, CheckoutState};

use crate::error::OpError;
use crate::ops::{OrderService, Outcome, ProductRef};
use crate::transport::Transport;

/// Cooperative cancellation handle. Cloneable; any clone can cancel.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlowState {
    Idle,
    Searched,
    InCart,
    AddressSelectionRequired,
    PaymentReady,
    PaymentMethodSelected,
    Placed,
    /// A step failed. Carries where and why, plus the state to resume
    /// from when the step is retried.
    Failed {
        step: &'static str,
        diagnostic: String,
        resume: Box<FlowState>,
    },
}

pub struct OrderWorkflow<'a, T> {
    service: &'a OrderService<T>,
    state: FlowState,
    method: Option<PaymentMethod>,
    cancel: CancelFlag,
}

impl<'a, T: Transport> OrderWorkflow<'a, T> {
    #[must_use]
    pub fn new(service: &'a OrderService<T>) -> Self {
        Self {
            service,
            state: FlowState::Idle,
            method: None,
            cancel: CancelFlag::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> &FlowState {
        &self.state
    }

    /// Handle for cancelling this flow from another task.
    #[must_use]
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// The state steps are gated on: a failed flow is gated on the state
    /// the failure interrupted, so the same step can be retried.
    fn effective_state(&self) -> &FlowState {
        match &self.state {
            FlowState::Failed { resume, .. } => resume,
            other => other,
        }
    }

    fn gate(&self, step: &'static str, allowed: &[FlowState]) -> Result<(), OpError> {
        if self.cancel.is_cancelled() {
            return Err(OpError::Cancelled);
        }
        let current = self.effective_state();
        if allowed.contains(current) {
            Ok(())
        } else {
            Err(OpError::validation(format!(
                "cannot {step} from {current:?}"
            )))
        }
    }

    fn fail(&mut self, step: &'static str, diagnostic: String) {
        let resume = Box::new(self.effective_state().clone());
        tracing::warn!(step, %diagnostic, "flow step failed");
        self.state = FlowState::Failed {
            step,
            diagnostic,
            resume,
        };
    }

    /// # Errors
    ///
    /// Gate violations, cancellation, and any service error; failures
    /// leave the flow retryable at the same step.
    pub async fn search(&mut self, query: &str) -> Result<Outcome<SearchResult>, OpError> {
        self.gate(
            "search",
            &[FlowState::Idle, FlowState::Searched, FlowState::InCart],
        )?;
        match self.service.search(query).await {
            Ok(Outcome::Completed(result)) => {
                if !result.products.is_empty() && self.state != FlowState::InCart {
                    self.state = FlowState::Searched;
                }
                Ok(Outcome::Completed(result))
            }
            Ok(Outcome::Unavailable { reason }) => {
                self.fail("search", reason.clone());
                Ok(Outcome::Unavailable { reason })
            }
            Err(e) => {
                self.fail("search", e.to_string());
                Err(e)
            }
        }
    }

    /// # Errors
    ///
    /// Gate violations, cancellation, and any service error.
    pub async fn add(
        &mut self,
        item: &ProductRef,
        quantity: u32,
    ) -> Result<Outcome<AddOutcome>, OpError> {
        self.gate("add", &[FlowState::Searched, FlowState::InCart])?;
        match self.service.add_to_cart(item, quantity).await {
            Ok(Outcome::Completed(outcome)) => {
                if outcome.achieved > 0 {
                    self.state = FlowState::InCart;
                }
                Ok(Outcome::Completed(outcome))
            }
            Ok(Outcome::Unavailable { reason }) => {
                self.fail("add", reason.clone());
                Ok(Outcome::Unavailable { reason })
            }
            Err(e) => {
                self.fail("add", e.to_string());
                Err(e)
            }
        }
    }

    /// Move from the cart toward payment.
    ///
    /// # Errors
    ///
    /// Gate violations, cancellation, and any service error. An
    /// indeterminate landing screen records a failure retryable at the
    /// cart.
    pub async fn proceed(&mut self) -> Result<Outcome<CheckoutState>, OpError> {
        self.gate(
            "proceed",
            &[FlowState::InCart, FlowState::AddressSelectionRequired],
        )?;
        match self.service.checkout().await {
            Ok(Outcome::Completed(state)) => {
                match state {
                    CheckoutState::AddressRequired => {
                        self.state = FlowState::AddressSelectionRequired;
                    }
                    CheckoutState::PaymentReady => self.state = FlowState::PaymentReady,
                    CheckoutState::Unknown => {
                        self.fail("proceed", "checkout landed on an unrecognized screen".to_owned());
                    }
                }
                Ok(Outcome::Completed(state))
            }
            Ok(Outcome::Unavailable { reason }) => {
                self.fail("proceed", reason.clone());
                Ok(Outcome::Unavailable { reason })
            }
            Err(e) => {
                self.fail("proceed", e.to_string());
                Err(e)
            }
        }
    }

    /// Select the nth saved address. Safe to repeat: re-selecting from the
    /// payment screen is accepted and leaves the flow payment-ready.
    ///
    /// # Errors
    ///
    /// Gate violations, cancellation, and any service error.
    pub async fn select_address(&mut self, index: usize) -> Result<Outcome<()>, OpError> {
        self.gate(
            "select_address",
            &[FlowState::AddressSelectionRequired, FlowState::PaymentReady],
        )?;
        match self.service.select_address(index).await {
            Ok(Outcome::Completed(())) => {
                self.state = FlowState::PaymentReady;
                Ok(Outcome::Completed(()))
            }
            Ok(Outcome::Unavailable { reason }) => {
                self.fail("select_address", reason.clone());
                Ok(Outcome::Unavailable { reason })
            }
            Err(e) => {
                self.fail("select_address", e.to_string());
                Err(e)
            }
        }
    }

    /// # Errors
    ///
    /// Gate violations, cancellation, and any service error.
    pub async fn select_payment(&mut self, method: PaymentMethod) -> Result<Outcome<()>, OpError> {
        self.gate(
            "select_payment",
            &[FlowState::PaymentReady, FlowState::PaymentMethodSelected],
        )?;
        match self.service.select_payment_method(method).await {
            Ok(Outcome::Completed(())) => {
                self.method = Some(method);
                self.state = FlowState::PaymentMethodSelected;
                Ok(Outcome::Completed(()))
            }
            Ok(Outcome::Unavailable { reason }) => {
                self.fail("select_payment", reason.clone());
                Ok(Outcome::Unavailable { reason })
            }
            Err(e) => {
                self.fail("select_payment", e.to_string());
                Err(e)
            }
        }
    }

    /// Enter the method detail (when given) and submit the payment.
    /// `Ok(Completed(false))` is a decline; the flow stays retryable.
    ///
    /// # Errors
    ///
    /// Gate violations, cancellation, and any service error.
    pub async fn pay(&mut self, detail: Option<&str>) -> Result<Outcome<bool>, OpError> {
        self.gate("pay", &[FlowState::PaymentMethodSelected])?;
        if let (Some(detail), Some(method)) = (detail, self.method) {
            match self.service.enter_payment_detail(method, detail).await {
                Ok(Outcome::Completed(())) => {}
                Ok(Outcome::Unavailable { reason }) => {
                    self.fail("pay", reason.clone());
                    return Ok(Outcome::Unavailable { reason });
                }
                Err(e) => {
                    self.fail("pay", e.to_string());
                    return Err(e);
                }
            }
        }
        match self.service.confirm_payment().await {
            Ok(Outcome::Completed(true)) => {
                self.state = FlowState::Placed;
                Ok(Outcome::Completed(true))
            }
            Ok(Outcome::Completed(false)) => {
                self.fail("pay", "payment declined by the storefront".to_owned());
                Ok(Outcome::Completed(false))
            }
            Ok(Outcome::Unavailable { reason }) => {
                self.fail("pay", reason.clone());
                Ok(Outcome::Unavailable { reason })
            }
            Err(e) => {
                self.fail("pay", e.to_string());
                Err(e)
            }
        }
    }
}
