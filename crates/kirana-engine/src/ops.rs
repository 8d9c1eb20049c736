//! The operation surface: everything a caller can do to the storefront.
//!
//! [`OrderService`] owns a transport, the product tracker, and the session
//! store, and exposes one method per storefront operation. Every method
//! follows the same shape: validate input, run the liveness guard, walk
//! the candidates, map the classification into a typed outcome.

use std::sync::Mutex;

use serde::Serialize;

use kirana_core::app_config::AppConfig;
use kirana_core::models::{Address, Cart, Order, PaymentMethod, PaymentOption, Product, SearchResult};
use kirana_core::outcome::{AddOutcome, AuthStatus, CheckoutState};

use crate::classify::Extracted;
use crate::error::OpError;
use crate::operation::Operation;
use crate::resolver::{self, Resolved, RetryPolicy};
use crate::session::{SessionRecord, SessionStore};
use crate::tracker::KnownProducts;
use crate::transport::Transport;

/// A normal-course result: either the operation completed, or the
/// storefront declared itself unable to serve. Unavailability is something
/// callers branch on, not an error.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum Outcome<T> {
    Completed(T),
    Unavailable { reason: String },
}

impl<T> Outcome<T> {
    /// The completed value, or `None` on unavailability.
    #[must_use]
    pub fn into_completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Unavailable { .. } => None,
        }
    }

    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// How a caller names a product: by storefront identifier, or by position
/// in the most recent search result.
#[derive(Debug, Clone)]
pub enum ProductRef {
    Id(String),
    Index(usize),
}

pub struct OrderService<T> {
    transport: T,
    tracker: KnownProducts,
    sessions: SessionStore,
    policy: RetryPolicy,
    country_code: String,
    /// Cap assumed when the storefront reports none of its own.
    max_per_item: u32,
    /// Random per-installation identifier sent with authentication calls.
    device_id: String,
    /// Pending OTP session between request and verify.
    otp_session: Mutex<Option<String>>,
    /// Most recent search, kept only so index references can resolve.
    last_search: Mutex<Option<SearchResult>>,
}

impl<T: Transport> OrderService<T> {
    #[must_use]
    pub fn new(transport: T, config: &AppConfig) -> Self {
        Self {
            transport,
            tracker: KnownProducts::new(),
            sessions: SessionStore::new(&config.session_path),
            policy: RetryPolicy {
                max_retries: config.max_retries,
                backoff_base_ms: config.retry_backoff_base_ms,
            },
            country_code: config.country_code.clone(),
            max_per_item: config.default_max_per_item,
            device_id: uuid::Uuid::new_v4().to_string(),
            otp_session: Mutex::new(None),
            last_search: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn tracker(&self) -> &KnownProducts {
        &self.tracker
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    async fn run(&self, op: &Operation) -> Result<Resolved, OpError> {
        self.transport.ensure_started().await?;
        resolver::attempt(&self.transport, op, self.policy).await
    }

    // --- authentication ---

    /// Request a one-time code for the phone number. An outage banner in
    /// the response is `Unavailable`, not a sent code.
    ///
    /// # Errors
    ///
    /// [`OpError::Validation`] unless the number is exactly ten digits;
    /// resolver errors otherwise.
    pub async fn request_otp(&self, phone: &str) -> Result<Outcome<AuthStatus>, OpError> {
        let phone = validate_phone(phone)?;
        let resolved = self
            .run(&Operation::RequestOtp {
                phone: phone.clone(),
                country_code: self.country_code.clone(),
                device_id: self.device_id.clone(),
            })
            .await?;
        if let Some(reason) = resolved.classification.unavailable {
            return Ok(Outcome::Unavailable { reason });
        }
        let session_id = match resolved.classification.data {
            Some(Extracted::Auth(auth)) => auth.session_id,
            _ => None,
        };
        *lock(&self.otp_session) = session_id.clone();
        Ok(Outcome::Completed(AuthStatus::OtpSent { session_id }))
    }

    /// Verify the one-time code. `Completed(false)` means the storefront
    /// rejected the code; a successful verification persists the session.
    /// An outage banner is `Unavailable` and persists nothing.
    ///
    /// # Errors
    ///
    /// [`OpError::Validation`] unless the code is four or six digits;
    /// transport-level resolver errors otherwise.
    pub async fn verify_otp(&self, phone: &str, otp: &str) -> Result<Outcome<bool>, OpError> {
        let phone = validate_phone(phone)?;
        let otp = otp.trim();
        if !(otp.len() == 4 || otp.len() == 6) || !otp.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OpError::validation("OTP must be 4 or 6 digits"));
        }
        let session_id = lock(&self.otp_session).clone();
        let resolved = self
            .run(&Operation::VerifyOtp {
                phone,
                otp: otp.to_owned(),
                session_id,
                device_id: self.device_id.clone(),
            })
            .await;
        match resolved {
            Ok(done) => {
                if let Some(reason) = done.classification.unavailable {
                    return Ok(Outcome::Unavailable { reason });
                }
                if let Some(Extracted::Auth(auth)) = done.classification.data {
                    let record =
                        SessionRecord::new(auth.token, auth.session_id, auth.user_id);
                    self.sessions.save(&record)?;
                    tracing::info!("authenticated, session persisted");
                }
                Ok(Outcome::Completed(true))
            }
            // Every candidate answered and none accepted the code.
            Err(OpError::Exhausted {
                last_fault: None, ..
            }) => Ok(Outcome::Completed(false)),
            Err(e) => Err(e),
        }
    }

    /// Whether a persisted, unexpired session exists.
    ///
    /// # Errors
    ///
    /// [`OpError::Session`] when the session file is unreadable.
    pub fn is_logged_in(&self) -> Result<bool, OpError> {
        Ok(self.sessions.load()?.is_some())
    }

    /// # Errors
    ///
    /// [`OpError::Session`] when the session file cannot be removed.
    pub fn logout(&self) -> Result<(), OpError> {
        Ok(self.sessions.clear()?)
    }

    // --- catalog ---

    /// # Errors
    ///
    /// [`OpError::Validation`] on an empty query; resolver errors when a
    /// transport fault (not a mere empty result) ended the walk.
    pub async fn search(&self, query: &str) -> Result<Outcome<SearchResult>, OpError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(OpError::validation("search query must not be empty"));
        }
        match self.run(&Operation::Search {
            query: query.to_owned(),
        })
        .await
        {
            Ok(resolved) => Ok(self.absorb_search(query, resolved)),
            // All candidates answered with no products: an empty result,
            // not a failure.
            Err(OpError::Exhausted {
                last_fault: None, ..
            }) => Ok(Outcome::Completed(SearchResult::empty(query))),
            Err(e) => Err(e),
        }
    }

    fn absorb_search(&self, query: &str, resolved: Resolved) -> Outcome<SearchResult> {
        if let Some(reason) = resolved.classification.unavailable {
            return Outcome::Unavailable { reason };
        }
        let products = match resolved.classification.data {
            Some(Extracted::Products(products)) => products,
            _ => Vec::new(),
        };
        self.tracker.record(query, &products);
        let result = SearchResult {
            query: query.to_owned(),
            total_results: products.len(),
            has_more: false,
            products,
        };
        *lock(&self.last_search) = Some(result.clone());
        Outcome::Completed(result)
    }

    /// Autocomplete for a partial query. Prefixes shorter than two
    /// characters and any storefront failure both yield an empty list.
    ///
    /// # Errors
    ///
    /// Only terminal resolver errors (auth, rate limit).
    pub async fn suggestions(&self, prefix: &str) -> Result<Vec<String>, OpError> {
        let prefix = prefix.trim();
        if prefix.chars().count() < 2 {
            return Ok(Vec::new());
        }
        match self.run(&Operation::Suggest {
            prefix: prefix.to_owned(),
        })
        .await
        {
            Ok(resolved) => Ok(match resolved.classification.data {
                Some(Extracted::Suggestions(words)) => words,
                _ => Vec::new(),
            }),
            Err(OpError::Exhausted { .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    // --- cart ---

    /// Add `quantity` units of a product. One unit is added first, then
    /// the rest as single increments so a per-item cap surfaces exactly at
    /// the unit where it fires; the outcome reports any shortfall. Requests
    /// beyond the configured per-item assumption are trimmed up front.
    ///
    /// # Errors
    ///
    /// [`OpError::Validation`] on a zero quantity or an index with no
    /// backing search; [`OpError::NotLocatable`] when the identifier
    /// cannot be re-acquired; resolver errors otherwise.
    pub async fn add_to_cart(
        &self,
        item: &ProductRef,
        quantity: u32,
    ) -> Result<Outcome<AddOutcome>, OpError> {
        if quantity == 0 {
            return Err(OpError::validation("quantity must be at least 1"));
        }
        let product_id = self.resolve_ref(item)?;

        let first = match self.add_one(&product_id).await? {
            Outcome::Unavailable { reason } => return Ok(Outcome::Unavailable { reason }),
            Outcome::Completed(added) => added,
        };
        if !first.added {
            return Ok(Outcome::Completed(AddOutcome {
                requested: quantity,
                achieved: 0,
                capped: true,
            }));
        }

        // Never ask for more than the assumed per-item cap; the storefront
        // would refuse the excess anyway.
        let target = quantity.min(self.max_per_item);
        let mut achieved = 1u32;
        let mut capped = target < quantity;
        let id = first.effective_id;
        for _ in 1..target {
            let resolved = self
                .run(&Operation::IncrementCartItem {
                    product_id: id.clone(),
                })
                .await;
            match resolved {
                Ok(done) if done.classification.limit_reached => {
                    capped = true;
                    break;
                }
                Ok(done) => {
                    if let Some(reason) = done.classification.unavailable {
                        return Ok(Outcome::Unavailable { reason });
                    }
                    achieved += 1;
                }
                // The storefront stopped answering increments for this
                // item; treat it as the cap rather than losing the units
                // already in the cart.
                Err(OpError::Exhausted {
                    last_fault: None, ..
                }) => {
                    capped = true;
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        if capped {
            tracing::info!(product_id = %id, achieved, requested = quantity, "per-item cap hit");
        }
        Ok(Outcome::Completed(AddOutcome {
            requested: quantity,
            achieved,
            capped,
        }))
    }

    /// One unit into the cart, with identity re-acquisition when the
    /// identifier has gone stale: re-run the recorded source query exactly
    /// once, then fall back to name-substring matching, then give up.
    async fn add_one(&self, product_id: &str) -> Result<Outcome<AddedUnit>, OpError> {
        match self.try_add(product_id).await? {
            AddAttempt::Done(outcome) => return Ok(outcome.map_id(product_id)),
            AddAttempt::Stale => {}
        }

        let Some(known) = self.tracker.lookup(product_id) else {
            return Err(OpError::NotLocatable {
                what: format!("product {product_id} (never seen in a search)"),
            });
        };
        tracing::warn!(
            product_id,
            source_query = %known.source_query,
            "identifier went stale, re-running its source query"
        );
        let refreshed = match self.search(&known.source_query).await? {
            Outcome::Unavailable { reason } => return Ok(Outcome::Unavailable { reason }),
            Outcome::Completed(result) => result,
        };

        if refreshed.products.iter().any(|p| p.id == product_id) {
            if let AddAttempt::Done(outcome) = self.try_add(product_id).await? {
                return Ok(outcome.map_id(product_id));
            }
        }

        // Same listing, new identifier: match on the recorded name against
        // what the query renders now.
        let needle = known.name.to_lowercase();
        let substitute = refreshed
            .products
            .iter()
            .find(|p| {
                let hay = p.name.to_lowercase();
                hay.contains(&needle) || needle.contains(&hay)
            })
            .map(Product::to_owned);
        if let Some(substitute) = substitute {
            tracing::warn!(
                stale_id = product_id,
                new_id = %substitute.id,
                name = %substitute.name,
                "re-acquired product under a new identifier"
            );
            if let AddAttempt::Done(outcome) = self.try_add(&substitute.id).await? {
                return Ok(outcome.map_id(&substitute.id));
            }
        }

        // Last resort for page transports: click the card whose rendered
        // text carries the recorded name. Endpoint transports have no
        // candidates for this and fall straight through.
        match self
            .run(&Operation::AddToCartByName {
                name: known.name.clone(),
            })
            .await
        {
            Ok(done) if done.classification.limit_reached => {
                return Ok(Outcome::Completed(AddedUnit::capped()));
            }
            Ok(done) => {
                if let Some(reason) = done.classification.unavailable {
                    return Ok(Outcome::Unavailable { reason });
                }
                tracing::warn!(
                    product_id,
                    name = %known.name,
                    "added by rendered name; identifier still unresolved"
                );
                return Ok(Outcome::Completed(AddedUnit::added()).map_id(product_id));
            }
            Err(OpError::Exhausted { .. }) => {}
            Err(e) => return Err(e),
        }

        Err(OpError::NotLocatable {
            what: format!("product {product_id} ({})", known.name),
        })
    }

    async fn try_add(&self, product_id: &str) -> Result<AddAttempt, OpError> {
        let resolved = self
            .run(&Operation::AddToCart {
                product_id: product_id.to_owned(),
            })
            .await;
        match resolved {
            Ok(done) if done.classification.limit_reached => Ok(AddAttempt::Done(
                Outcome::Completed(AddedUnit::capped()),
            )),
            Ok(done) => {
                if let Some(reason) = done.classification.unavailable {
                    Ok(AddAttempt::Done(Outcome::Unavailable { reason }))
                } else {
                    Ok(AddAttempt::Done(Outcome::Completed(AddedUnit::added())))
                }
            }
            Err(OpError::Exhausted {
                last_fault: None, ..
            }) => Ok(AddAttempt::Stale),
            Err(OpError::Exhausted {
                last_fault: Some(fault),
                operation,
                attempted,
            }) => {
                // An element-not-found everywhere usually means the card is
                // no longer rendered, which is the stale-identifier case.
                if matches!(fault, crate::transport::TransportFault::ElementNotFound(_)) {
                    Ok(AddAttempt::Stale)
                } else {
                    Err(OpError::Exhausted {
                        operation,
                        attempted,
                        last_fault: Some(fault),
                    })
                }
            }
            Err(e) => Err(e),
        }
    }

    fn resolve_ref(&self, item: &ProductRef) -> Result<String, OpError> {
        match item {
            ProductRef::Id(id) => Ok(id.clone()),
            ProductRef::Index(index) => {
                let guard = lock(&self.last_search);
                let Some(result) = guard.as_ref() else {
                    return Err(OpError::validation(
                        "index reference requires a preceding search",
                    ));
                };
                result
                    .products
                    .get(*index)
                    .map(|p| p.id.clone())
                    .ok_or_else(|| {
                        OpError::validation(format!(
                            "index {index} out of range for {} results",
                            result.products.len()
                        ))
                    })
            }
        }
    }

    /// Remove units of a product from the cart. `Ok(Completed(false))`
    /// means the storefront would not perform the removal (typically the
    /// item is not in the cart).
    ///
    /// # Errors
    ///
    /// [`OpError::Validation`] on a zero quantity; resolver errors on
    /// transport faults.
    pub async fn remove_from_cart(
        &self,
        product_id: &str,
        quantity: u32,
    ) -> Result<Outcome<bool>, OpError> {
        if quantity == 0 {
            return Err(OpError::validation("quantity must be at least 1"));
        }
        self.unit_op_as_bool(&Operation::RemoveFromCart {
            product_id: product_id.to_owned(),
            quantity,
        })
        .await
    }

    /// # Errors
    ///
    /// Resolver errors on transport faults.
    pub async fn get_cart(&self) -> Result<Outcome<Cart>, OpError> {
        let resolved = self.run(&Operation::GetCart).await?;
        if let Some(reason) = resolved.classification.unavailable {
            return Ok(Outcome::Unavailable { reason });
        }
        match resolved.classification.data {
            Some(Extracted::Cart(cart)) => Ok(Outcome::Completed(cart)),
            _ => Ok(Outcome::Completed(Cart::empty())),
        }
    }

    /// # Errors
    ///
    /// Resolver errors on transport faults.
    pub async fn clear_cart(&self) -> Result<Outcome<bool>, OpError> {
        self.unit_op_as_bool(&Operation::ClearCart).await
    }

    // --- location and addresses ---

    /// Point the storefront at a delivery location by name.
    ///
    /// # Errors
    ///
    /// [`OpError::Validation`] on an empty name; resolver errors otherwise.
    pub async fn set_location(&self, name: &str) -> Result<Outcome<()>, OpError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(OpError::validation("location name must not be empty"));
        }
        self.unit_op(&Operation::SetLocation {
            name: name.to_owned(),
        })
        .await
    }

    /// # Errors
    ///
    /// Resolver errors on transport faults or exhaustion.
    pub async fn get_addresses(&self) -> Result<Outcome<Vec<Address>>, OpError> {
        let resolved = self.run(&Operation::GetAddresses).await?;
        if let Some(reason) = resolved.classification.unavailable {
            return Ok(Outcome::Unavailable { reason });
        }
        match resolved.classification.data {
            Some(Extracted::Addresses(addresses)) => Ok(Outcome::Completed(addresses)),
            _ => Ok(Outcome::Completed(Vec::new())),
        }
    }

    /// # Errors
    ///
    /// [`OpError::Validation`] on an empty first line; resolver errors
    /// otherwise.
    pub async fn add_address(&self, address: Address) -> Result<Outcome<()>, OpError> {
        if address.line1.trim().is_empty() {
            return Err(OpError::validation("address line1 must not be empty"));
        }
        self.unit_op(&Operation::AddAddress { address }).await
    }

    /// Select the nth saved address. Re-selecting the already-selected
    /// address succeeds.
    ///
    /// # Errors
    ///
    /// Resolver errors; an index past the rendered list surfaces as
    /// exhaustion of the candidates.
    pub async fn select_address(&self, index: usize) -> Result<Outcome<()>, OpError> {
        self.unit_op(&Operation::SelectAddress { index }).await
    }

    // --- checkout and payment ---

    /// Proceed from the cart toward payment and report which screen the
    /// storefront landed on.
    ///
    /// # Errors
    ///
    /// Resolver errors on transport faults or exhaustion.
    pub async fn checkout(&self) -> Result<Outcome<CheckoutState>, OpError> {
        let resolved = self.run(&Operation::Checkout).await?;
        if let Some(reason) = resolved.classification.unavailable {
            return Ok(Outcome::Unavailable { reason });
        }
        match resolved.classification.data {
            Some(Extracted::Checkout(state)) => Ok(Outcome::Completed(state)),
            _ => Ok(Outcome::Completed(CheckoutState::Unknown)),
        }
    }

    /// The payment methods the storefront offers. Falls back to the known
    /// default set when no candidate yields a list — the payment screen
    /// always offers at least these.
    ///
    /// # Errors
    ///
    /// Terminal resolver errors only.
    pub async fn payment_methods(&self) -> Result<Outcome<Vec<PaymentOption>>, OpError> {
        match self.run(&Operation::GetPaymentMethods).await {
            Ok(resolved) => {
                if let Some(reason) = resolved.classification.unavailable {
                    return Ok(Outcome::Unavailable { reason });
                }
                match resolved.classification.data {
                    Some(Extracted::PaymentOptions(options)) => Ok(Outcome::Completed(options)),
                    _ => Ok(Outcome::Completed(default_payment_options())),
                }
            }
            Err(OpError::Exhausted {
                last_fault: None, ..
            }) => Ok(Outcome::Completed(default_payment_options())),
            Err(e) => Err(e),
        }
    }

    /// # Errors
    ///
    /// Resolver errors on transport faults or exhaustion.
    pub async fn select_payment_method(
        &self,
        method: PaymentMethod,
    ) -> Result<Outcome<()>, OpError> {
        self.unit_op(&Operation::SelectPaymentMethod { method }).await
    }

    /// Enter the free-form detail for the chosen method, e.g. a UPI handle.
    ///
    /// # Errors
    ///
    /// [`OpError::Validation`] on an empty detail or a UPI handle without
    /// an `@`; resolver errors otherwise.
    pub async fn enter_payment_detail(
        &self,
        method: PaymentMethod,
        detail: &str,
    ) -> Result<Outcome<()>, OpError> {
        let detail = detail.trim();
        if detail.is_empty() {
            return Err(OpError::validation("payment detail must not be empty"));
        }
        if method == PaymentMethod::Upi && !detail.contains('@') {
            return Err(OpError::validation("a UPI handle must contain '@'"));
        }
        self.unit_op(&Operation::EnterPaymentDetail {
            detail: detail.to_owned(),
        })
        .await
    }

    /// Submit the payment. `Ok(Completed(false))` is a decline — the
    /// storefront reports those inside successful HTTP responses, so the
    /// body classification is the only signal.
    ///
    /// # Errors
    ///
    /// Resolver errors on transport faults.
    pub async fn confirm_payment(&self) -> Result<Outcome<bool>, OpError> {
        self.unit_op_as_bool(&Operation::ConfirmPayment).await
    }

    /// # Errors
    ///
    /// [`OpError::Validation`] on an empty order id; resolver errors when
    /// the order cannot be found under any candidate.
    pub async fn order_status(&self, order_id: &str) -> Result<Outcome<Order>, OpError> {
        let order_id = order_id.trim();
        if order_id.is_empty() {
            return Err(OpError::validation("order id must not be empty"));
        }
        let resolved = self
            .run(&Operation::OrderStatus {
                order_id: order_id.to_owned(),
            })
            .await?;
        if let Some(reason) = resolved.classification.unavailable {
            return Ok(Outcome::Unavailable { reason });
        }
        match resolved.classification.data {
            Some(Extracted::Order(order)) => Ok(Outcome::Completed(order)),
            _ => Err(OpError::Exhausted {
                operation: "order_status".to_owned(),
                attempted: 0,
                last_fault: None,
            }),
        }
    }

    // --- shared tails ---

    async fn unit_op(&self, op: &Operation) -> Result<Outcome<()>, OpError> {
        let resolved = self.run(op).await?;
        match resolved.classification.unavailable {
            Some(reason) => Ok(Outcome::Unavailable { reason }),
            None => Ok(Outcome::Completed(())),
        }
    }

    async fn unit_op_as_bool(&self, op: &Operation) -> Result<Outcome<bool>, OpError> {
        match self.run(op).await {
            Ok(resolved) => match resolved.classification.unavailable {
                Some(reason) => Ok(Outcome::Unavailable { reason }),
                None => Ok(Outcome::Completed(resolved.classification.success)),
            },
            Err(OpError::Exhausted {
                last_fault: None, ..
            }) => Ok(Outcome::Completed(false)),
            Err(e) => Err(e),
        }
    }
}

/// Result of adding the first unit.
#[derive(Debug)]
struct AddedUnit {
    added: bool,
    effective_id: String,
}

impl AddedUnit {
    fn added() -> Self {
        Self {
            added: true,
            effective_id: String::new(),
        }
    }

    fn capped() -> Self {
        Self {
            added: false,
            effective_id: String::new(),
        }
    }
}

enum AddAttempt {
    Done(Outcome<AddedUnit>),
    /// Every candidate answered "no such product": the identifier is
    /// stale, try re-acquisition.
    Stale,
}

impl Outcome<AddedUnit> {
    fn map_id(mut self, id: &str) -> Self {
        if let Outcome::Completed(unit) = &mut self {
            unit.effective_id = id.to_owned();
        }
        self
    }
}

fn validate_phone(phone: &str) -> Result<String, OpError> {
    let phone = phone.trim();
    if phone.len() != 10 || !phone.bytes().all(|b| b.is_ascii_digit()) {
        return Err(OpError::validation("phone number must be exactly 10 digits"));
    }
    Ok(phone.to_owned())
}

fn default_payment_options() -> Vec<PaymentOption> {
    [
        (PaymentMethod::Cod, "Cash on Delivery"),
        (PaymentMethod::Upi, "UPI"),
        (PaymentMethod::Card, "Credit / Debit Card"),
        (PaymentMethod::Wallet, "Wallet"),
    ]
    .into_iter()
    .map(|(method, display_name)| PaymentOption {
        method,
        display_name: display_name.to_owned(),
        available: true,
    })
    .collect()
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::action::{Action, RawResult};
    use crate::transport::TransportFault;

    /// Transport that fails the test if any network activity happens;
    /// validation must reject bad input before reaching it.
    struct Unreachable;

    #[async_trait]
    impl Transport for Unreachable {
        async fn ensure_started(&self) -> Result<(), TransportFault> {
            panic!("validation should have rejected the input before transport use");
        }

        fn candidates(&self, _op: &Operation) -> Vec<Action> {
            Vec::new()
        }

        async fn execute(&self, _action: &Action) -> Result<RawResult, TransportFault> {
            panic!("validation should have rejected the input before transport use");
        }
    }

    fn service() -> OrderService<Unreachable> {
        let config = kirana_core::config::load_app_config_from_env()
            .expect("default config from empty env");
        OrderService::new(Unreachable, &config)
    }

    #[tokio::test]
    async fn phone_numbers_must_be_ten_digits() {
        let svc = service();
        assert!(matches!(
            svc.request_otp("12345").await,
            Err(OpError::Validation(_))
        ));
        assert!(matches!(
            svc.request_otp("98765432101").await,
            Err(OpError::Validation(_))
        ));
        assert!(matches!(
            svc.request_otp("98765abc10").await,
            Err(OpError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn otp_must_be_four_or_six_digits() {
        let svc = service();
        assert!(matches!(
            svc.verify_otp("9876543210", "12345").await,
            Err(OpError::Validation(_))
        ));
        assert!(matches!(
            svc.verify_otp("9876543210", "12ab").await,
            Err(OpError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn empty_search_query_is_rejected() {
        let svc = service();
        assert!(matches!(
            svc.search("   ").await,
            Err(OpError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected() {
        let svc = service();
        assert!(matches!(
            svc.add_to_cart(&ProductRef::Id("p1".to_owned()), 0).await,
            Err(OpError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn index_reference_requires_a_prior_search() {
        let svc = service();
        assert!(matches!(
            svc.add_to_cart(&ProductRef::Index(0), 1).await,
            Err(OpError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn short_suggestion_prefixes_short_circuit() {
        let svc = service();
        assert!(svc.suggestions("m").await.expect("no network needed").is_empty());
    }

    #[tokio::test]
    async fn upi_detail_must_carry_a_handle() {
        let svc = service();
        assert!(matches!(
            svc.enter_payment_detail(PaymentMethod::Upi, "myhandle").await,
            Err(OpError::Validation(_))
        ));
    }

    #[test]
    fn default_payment_options_cover_the_known_methods() {
        let options = default_payment_options();
        assert_eq!(options.len(), 4);
        assert!(options.iter().all(|o| o.available));
    }
}
