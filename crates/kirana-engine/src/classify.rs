//! Heuristic classification of storefront responses.
//!
//! Nothing the storefront returns is contractual: HTTP status codes are
//! unreliable (payment failures arrive as 200s), field names drift, and
//! unavailability is announced as a banner inside an otherwise healthy
//! response. This module turns a [`RawResult`] into a [`Classification`]
//! using ordered field probes and phrase scans.
//!
//! Precedence is fixed: an unavailability phrase overrides every success
//! indicator in the same response.

use chrono::{DateTime, Utc};
use serde_json::Value;

use kirana_core::models::{
    Address, AddressLabel, Cart, CartItem, Order, OrderStatus, PaymentMethod, PaymentOption,
    Product,
};
use kirana_core::outcome::CheckoutState;

use crate::action::{PageItem, PageSnapshot, RawResult};
use crate::extract;
use crate::operation::OperationKind;

/// Storefront-wide refusal banners. Matched case-insensitively anywhere in
/// the response.
pub const UNAVAILABILITY_PHRASES: [&str; 4] = [
    "currently unavailable",
    "can't take your order",
    "high demand",
    "store is closed",
];

/// Per-item quantity cap banners.
pub const QUANTITY_LIMIT_PHRASES: [&str; 3] = [
    "can't add more of this item",
    "maximum quantity reached",
    "limit reached",
];

/// Markers that mean the checkout flow landed on address selection.
/// Matched against visible text and confirmed probe selectors alike.
const ADDRESS_SCREEN_MARKERS: [&str; 4] = [
    "select delivery address",
    "select an address",
    "add new address",
    "addresslist",
];

/// Markers that mean the checkout flow landed on the payment screen.
const PAYMENT_SCREEN_MARKERS: [&str; 5] =
    ["payment method", "pay now", "to pay", "payment_widget", "zpayments"];

// Ordered key lists. First hit wins, so the most common spelling leads.
const PRICE_KEYS: [&str; 8] = [
    "price",
    "selling_price",
    "discounted_price",
    "final_price",
    "amount",
    "cost",
    "value",
    "sale_price",
];
const MRP_KEYS: [&str; 4] = ["mrp", "original_price", "list_price", "strike_price"];
const PRODUCT_ID_KEYS: [&str; 4] = ["product_id", "id", "item_id", "variant_id"];
const NAME_KEYS: [&str; 4] = ["name", "title", "product_name", "display_name"];
const TOKEN_KEYS: [&str; 5] = ["auth_token", "token", "access_token", "jwt", "bearer_token"];
const SESSION_KEYS: [&str; 3] = ["session_id", "otp_session_id", "verification_id"];
const USER_KEYS: [&str; 3] = ["user_id", "uid", "customer_id"];
const PRODUCT_LIST_KEYS: [&str; 4] = ["products", "items", "results", "objects"];
const CART_ITEM_KEYS: [&str; 4] = ["items", "cart_items", "products", "line_items"];
const ADDRESS_LIST_KEYS: [&str; 3] = ["addresses", "address_list", "saved_addresses"];
const PAYMENT_LIST_KEYS: [&str; 4] = ["payment_methods", "methods", "payment_options", "options"];
const SUGGESTION_KEYS: [&str; 3] = ["suggestions", "autocomplete", "keywords"];
const ERROR_KEYS: [&str; 3] = ["error", "error_message", "errors"];
const ORDER_ID_KEYS: [&str; 3] = ["order_id", "id", "cart_id"];

/// Session material pulled out of an authentication response.
#[derive(Debug, Clone, Default)]
pub struct AuthData {
    pub token: Option<String>,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
}

/// Structured payload recovered from a classified response.
#[derive(Debug, Clone)]
pub enum Extracted {
    Products(Vec<Product>),
    Suggestions(Vec<String>),
    Cart(Cart),
    Addresses(Vec<Address>),
    PaymentOptions(Vec<PaymentOption>),
    Order(Order),
    Auth(AuthData),
    Checkout(CheckoutState),
}

/// Verdict on one candidate's response.
#[derive(Debug, Clone)]
pub struct Classification {
    pub success: bool,
    /// The matched refusal banner, when the storefront declared itself
    /// unable to serve. Overrides `success` and halts the candidate walk.
    pub unavailable: Option<String>,
    /// A per-item quantity cap fired. Not a failure of the operation; the
    /// caller records the shortfall. Halts the candidate walk.
    pub limit_reached: bool,
    pub data: Option<Extracted>,
}

impl Classification {
    fn failure() -> Self {
        Self {
            success: false,
            unavailable: None,
            limit_reached: false,
            data: None,
        }
    }

    fn unavailable(reason: String) -> Self {
        Self {
            success: false,
            unavailable: Some(reason),
            limit_reached: false,
            data: None,
        }
    }

    fn success(data: Option<Extracted>) -> Self {
        Self {
            success: true,
            unavailable: None,
            limit_reached: false,
            data,
        }
    }

    /// Whether the resolver should stop walking candidates regardless of
    /// success: the storefront has answered definitively.
    #[must_use]
    pub fn halts_walk(&self) -> bool {
        self.unavailable.is_some() || self.limit_reached
    }
}

/// Classify one raw response under the rules for `kind`.
#[must_use]
pub fn classify(kind: OperationKind, raw: &RawResult) -> Classification {
    match raw {
        RawResult::Json(value) => classify_json(kind, value),
        RawResult::Page(snapshot) => classify_page(kind, snapshot),
    }
}

fn classify_json(kind: OperationKind, value: &Value) -> Classification {
    // Refusal banners first, no matter what else the response claims.
    if let Some(phrase) = extract::find_phrase(value, &UNAVAILABILITY_PHRASES) {
        return Classification::unavailable(phrase);
    }

    if kind == OperationKind::CartMutation
        && extract::find_phrase(value, &QUANTITY_LIMIT_PHRASES).is_some()
    {
        return Classification {
            success: false,
            unavailable: None,
            limit_reached: true,
            data: None,
        };
    }

    if has_explicit_failure(value) {
        return Classification::failure();
    }

    match kind {
        OperationKind::Search => {
            let products = extract_products(value);
            if products.is_empty() {
                Classification::failure()
            } else {
                Classification::success(Some(Extracted::Products(products)))
            }
        }
        OperationKind::Suggest => match extract_suggestions(value) {
            Some(words) => Classification::success(Some(Extracted::Suggestions(words))),
            None => Classification::failure(),
        },
        OperationKind::GetCart => match extract_cart(value) {
            Some(cart) => Classification::success(Some(Extracted::Cart(cart))),
            None => Classification::failure(),
        },
        OperationKind::GetAddresses => match extract_addresses(value) {
            Some(addresses) => Classification::success(Some(Extracted::Addresses(addresses))),
            None => Classification::failure(),
        },
        OperationKind::GetPaymentMethods => match extract_payment_options(value) {
            Some(options) if !options.is_empty() => {
                Classification::success(Some(Extracted::PaymentOptions(options)))
            }
            _ => Classification::failure(),
        },
        OperationKind::OrderStatus => match extract_order(value) {
            Some(order) => Classification::success(Some(Extracted::Order(order))),
            None => Classification::failure(),
        },
        OperationKind::VerifyOtp => {
            let auth = extract_auth(value);
            if auth.token.is_some() && generic_json_success(value) {
                Classification::success(Some(Extracted::Auth(auth)))
            } else {
                Classification::failure()
            }
        }
        OperationKind::RequestOtp => {
            if generic_json_success(value) {
                Classification::success(Some(Extracted::Auth(extract_auth(value))))
            } else {
                Classification::failure()
            }
        }
        OperationKind::Checkout => {
            if generic_json_success(value) {
                Classification::success(Some(Extracted::Checkout(checkout_state_from_json(
                    value,
                ))))
            } else {
                Classification::failure()
            }
        }
        OperationKind::CartMutation
        | OperationKind::SetLocation
        | OperationKind::AddAddress
        | OperationKind::SelectAddress
        | OperationKind::Payment => {
            if generic_json_success(value) {
                Classification::success(None)
            } else {
                Classification::failure()
            }
        }
    }
}

/// An error field with content, or a status that spells failure. This is
/// how 200-with-failure payment responses are caught.
fn has_explicit_failure(value: &Value) -> bool {
    if let Some(err) = extract::probe(value, &ERROR_KEYS) {
        let empty = match err {
            Value::String(s) => s.trim().is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            Value::Bool(b) => !b,
            _ => false,
        };
        if !empty {
            return true;
        }
    }
    if let Some(status) = extract::first_str(value, &["status", "state"]) {
        if matches!(
            status.to_lowercase().as_str(),
            "failed" | "failure" | "error" | "declined" | "rejected"
        ) {
            return true;
        }
    }
    matches!(extract::first_bool(value, &["success"]), Some(false))
}

/// The storefront's success vocabulary is a disjunction: an explicit flag,
/// a success-ish status string, or simply the absence of an error field.
fn generic_json_success(value: &Value) -> bool {
    if extract::first_bool(value, &["success"]) == Some(true) {
        return true;
    }
    if let Some(status) = extract::first_str(value, &["status", "state"]) {
        if matches!(
            status.to_lowercase().as_str(),
            "success" | "ok" | "done" | "completed"
        ) {
            return true;
        }
    }
    !has_explicit_failure(value)
}

fn classify_page(kind: OperationKind, snapshot: &PageSnapshot) -> Classification {
    let lower = snapshot.text.to_lowercase();
    for phrase in UNAVAILABILITY_PHRASES {
        if lower.contains(phrase) {
            return Classification::unavailable(phrase.to_owned());
        }
    }
    for marker in &snapshot.denied {
        let marker_lower = marker.to_lowercase();
        if UNAVAILABILITY_PHRASES
            .iter()
            .any(|p| marker_lower.contains(p))
        {
            return Classification::unavailable(marker.clone());
        }
    }

    if kind == OperationKind::CartMutation {
        let limit_hit = QUANTITY_LIMIT_PHRASES.iter().any(|p| lower.contains(p))
            || snapshot
                .denied
                .iter()
                .any(|m| QUANTITY_LIMIT_PHRASES.iter().any(|p| m.to_lowercase().contains(p)));
        if limit_hit {
            return Classification {
                success: false,
                unavailable: None,
                limit_reached: true,
                data: None,
            };
        }
    }

    if !snapshot.denied.is_empty() {
        return Classification::failure();
    }

    match kind {
        OperationKind::Search => {
            let products = products_from_items(&snapshot.items);
            if products.is_empty() {
                Classification::failure()
            } else {
                Classification::success(Some(Extracted::Products(products)))
            }
        }
        OperationKind::GetAddresses => {
            let addresses = addresses_from_items(&snapshot.items);
            Classification::success(Some(Extracted::Addresses(addresses)))
        }
        OperationKind::GetCart => Classification::success(Some(Extracted::Cart(
            cart_from_page(&snapshot.items, &snapshot.text),
        ))),
        OperationKind::OrderStatus => match order_from_page(&snapshot.items, &lower) {
            Some(order) => Classification::success(Some(Extracted::Order(order))),
            None => Classification::failure(),
        },
        OperationKind::Checkout => Classification::success(Some(Extracted::Checkout(
            checkout_state_from_page(snapshot, &lower),
        ))),
        _ => {
            // The script finished, no failure marker rendered. When the
            // script declared confirm probes, at least one must have shown.
            if snapshot.confirmed.is_empty() && kind == OperationKind::Payment {
                Classification::failure()
            } else {
                Classification::success(None)
            }
        }
    }
}

fn checkout_state_from_json(value: &Value) -> CheckoutState {
    if extract::probe(value, &PAYMENT_LIST_KEYS).is_some() {
        return CheckoutState::PaymentReady;
    }
    if extract::probe(value, &ADDRESS_LIST_KEYS).is_some()
        || extract::first_bool(value, &["address_required", "needs_address"]) == Some(true)
    {
        return CheckoutState::AddressRequired;
    }
    CheckoutState::Unknown
}

fn checkout_state_from_page(snapshot: &PageSnapshot, lower_text: &str) -> CheckoutState {
    let confirmed_lower: Vec<String> = snapshot
        .confirmed
        .iter()
        .map(|m| m.to_lowercase())
        .collect();
    let seen = |markers: &[&str]| {
        markers.iter().any(|marker| {
            lower_text.contains(marker) || confirmed_lower.iter().any(|c| c.contains(marker))
        })
    };
    // Address markers win when both screens leak into the same snapshot:
    // an unselected address blocks payment anyway.
    if seen(&ADDRESS_SCREEN_MARKERS) {
        CheckoutState::AddressRequired
    } else if seen(&PAYMENT_SCREEN_MARKERS) {
        CheckoutState::PaymentReady
    } else {
        CheckoutState::Unknown
    }
}

// --- JSON extraction ---

fn extract_products(value: &Value) -> Vec<Product> {
    let Some(items) = extract::first_array(value, &PRODUCT_LIST_KEYS) else {
        return Vec::new();
    };
    items.iter().filter_map(extract_product).collect()
}

fn extract_product(value: &Value) -> Option<Product> {
    let id = extract::first_str(value, &PRODUCT_ID_KEYS)?;
    let name = extract::first_str(value, &NAME_KEYS)?;
    let in_stock = extract::first_bool(value, &["in_stock", "available", "is_available"])
        .unwrap_or_else(|| extract::first_u32(value, &["inventory", "stock"]).map_or(true, |n| n > 0));
    Some(Product {
        id,
        name,
        price: extract::money_or_zero(value, &PRICE_KEYS),
        original_price: extract::first_money(value, &MRP_KEYS),
        in_stock,
        brand: extract::first_str(value, &["brand", "brand_name"]),
        category: extract::first_str(value, &["category", "category_name"]),
        unit: extract::first_str(value, &["unit", "quantity_text", "weight", "pack_size"]),
        max_quantity: extract::first_u32(value, &["max_quantity", "max_allowed_quantity"]),
    })
}

fn extract_suggestions(value: &Value) -> Option<Vec<String>> {
    let items = extract::first_array(value, &SUGGESTION_KEYS)?;
    Some(
        items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                other => extract::first_str(other, &["keyword", "name", "text", "suggestion"]),
            })
            .collect(),
    )
}

/// A response counts as a cart when it carries an item list or cart-shaped
/// totals; anything else is some other payload on a shared endpoint.
fn extract_cart(value: &Value) -> Option<Cart> {
    let scope = match extract::probe(value, &["cart"]) {
        Some(inner) if inner.is_object() => inner,
        _ => value,
    };
    let items = extract::first_array(scope, &CART_ITEM_KEYS);
    let has_totals = extract::first_money(scope, &["total", "total_amount", "grand_total"]).is_some();
    if items.is_none() && !has_totals {
        return None;
    }

    let mut cart = Cart {
        items: items
            .map(|list| list.iter().filter_map(extract_cart_item).collect())
            .unwrap_or_default(),
        subtotal: extract::money_or_zero(scope, &["subtotal", "sub_total", "items_total", "item_total"]),
        delivery_fee: extract::money_or_zero(scope, &["delivery_fee", "delivery_charge", "shipping_fee"]),
        taxes: extract::money_or_zero(scope, &["taxes", "tax", "tax_amount"]),
        total_amount: extract::money_or_zero(
            scope,
            &["total", "total_amount", "grand_total", "bill_total", "total_cost"],
        ),
        min_order_value: extract::first_money(
            scope,
            &["min_order_value", "minimum_order_value", "min_cart_value"],
        ),
    };
    cart.finalize();
    Some(cart)
}

fn extract_cart_item(value: &Value) -> Option<CartItem> {
    let product_id = extract::first_str(value, &PRODUCT_ID_KEYS)?;
    let quantity = extract::first_u32(value, &["quantity", "qty", "count"]).unwrap_or(1);
    let unit_price = extract::money_or_zero(value, &PRICE_KEYS);
    let line_total = extract::first_money(value, &["line_total", "item_total", "total"])
        .unwrap_or_else(|| unit_price * f64::from(quantity));
    Some(CartItem {
        product_id,
        name: extract::first_str(value, &NAME_KEYS).unwrap_or_default(),
        quantity,
        unit_price,
        line_total,
    })
}

fn extract_addresses(value: &Value) -> Option<Vec<Address>> {
    let items = extract::first_array(value, &ADDRESS_LIST_KEYS)?;
    Some(items.iter().filter_map(extract_address).collect())
}

fn extract_address(value: &Value) -> Option<Address> {
    let id = extract::first_str(value, &["id", "address_id"])?;
    let label = extract::first_str(value, &["label", "type", "address_type", "tag"])
        .map_or(AddressLabel::Unspecified, |raw| AddressLabel::from_raw(&raw));
    Some(Address {
        id,
        label,
        line1: extract::first_str(value, &["line1", "address_line1", "address", "street", "flat"])
            .unwrap_or_default(),
        line2: extract::first_str(value, &["line2", "address_line2", "area", "locality"]),
        landmark: extract::first_str(value, &["landmark"]),
        city: extract::first_str(value, &["city"]),
        state: extract::first_str(value, &["state"]),
        postal_code: extract::first_str(value, &["postal_code", "pincode", "zip", "pin"]),
        is_default: extract::first_bool(value, &["is_default", "default", "selected"])
            .unwrap_or(false),
    })
}

fn extract_payment_options(value: &Value) -> Option<Vec<PaymentOption>> {
    let items = extract::first_array(value, &PAYMENT_LIST_KEYS)?;
    Some(
        items
            .iter()
            .filter_map(|item| {
                let code = extract::first_str(item, &["code", "method", "type", "mode"])?;
                let method = PaymentMethod::from_code(&code)?;
                Some(PaymentOption {
                    method,
                    display_name: extract::first_str(item, &["display_name", "name", "title", "label"])
                        .unwrap_or_else(|| code.clone()),
                    available: extract::first_bool(item, &["available", "enabled", "is_enabled"])
                        .unwrap_or(true),
                })
            })
            .collect(),
    )
}

fn extract_order(value: &Value) -> Option<Order> {
    let id = extract::first_str(value, &ORDER_ID_KEYS)?;
    let status = extract::first_str(value, &["status", "order_status", "state"])
        .map_or(OrderStatus::Pending, |raw| OrderStatus::from_raw(&raw));
    let created_at = extract::first_str(value, &["created_at", "placed_at", "order_time"])
        .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
        .map_or_else(Utc::now, |dt| dt.with_timezone(&Utc));
    Some(Order {
        id,
        status,
        items: extract::first_array(value, &CART_ITEM_KEYS)
            .map(|list| list.iter().filter_map(extract_cart_item).collect())
            .unwrap_or_default(),
        delivery_address: extract::probe(value, &["delivery_address", "address"])
            .and_then(extract_address),
        payment_method: extract::first_str(value, &["payment_method", "payment_mode"])
            .and_then(|code| PaymentMethod::from_code(&code)),
        total_amount: extract::money_or_zero(
            value,
            &["total", "total_amount", "grand_total", "bill_total"],
        ),
        created_at,
        estimated_delivery: extract::first_str(value, &["estimated_delivery", "eta", "expected_delivery"])
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        tracking_reference: extract::first_str(value, &["tracking_reference", "tracking_id"]),
    })
}

fn extract_auth(value: &Value) -> AuthData {
    AuthData {
        token: extract::first_str(value, &TOKEN_KEYS),
        session_id: extract::first_str(value, &SESSION_KEYS),
        user_id: extract::first_str(value, &USER_KEYS),
    }
}

// --- page extraction ---

/// Best-effort product from a scraped card: first plausible line is the
/// name, the currency-anchored amount is the price. Cards render the unit
/// size above the price, so an unanchored scan would read "500 ml" as 500.
fn products_from_items(items: &[PageItem]) -> Vec<Product> {
    items
        .iter()
        .enumerate()
        .filter_map(|(position, item)| {
            let name = item
                .text
                .lines()
                .map(str::trim)
                .find(|line| {
                    !line.is_empty()
                        && !line.eq_ignore_ascii_case("add")
                        && !line.starts_with('₹')
                })?
                .to_owned();
            let lower = item.text.to_lowercase();
            Some(Product {
                id: item.id.clone().unwrap_or_else(|| format!("pos:{position}")),
                name,
                price: extract::priced_amount_in(&item.text).unwrap_or(0.0),
                original_price: None,
                in_stock: !lower.contains("out of stock") && !lower.contains("sold out"),
                brand: None,
                category: None,
                unit: None,
                max_quantity: None,
            })
        })
        .collect()
}

/// Cart from scraped line items plus a grand-total line when one renders.
fn cart_from_page(items: &[PageItem], text: &str) -> Cart {
    let cart_items: Vec<CartItem> = items
        .iter()
        .enumerate()
        .filter_map(|(position, item)| {
            let name = item
                .text
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty() && !line.starts_with('₹'))?
                .to_owned();
            let quantity = quantity_in(&item.text).unwrap_or(1);
            let unit_price = extract::priced_amount_in(&item.text).unwrap_or(0.0);
            Some(CartItem {
                product_id: item.id.clone().unwrap_or_else(|| format!("pos:{position}")),
                name,
                quantity,
                unit_price,
                line_total: unit_price * f64::from(quantity),
            })
        })
        .collect();

    let total_amount = text
        .lines()
        .find(|line| {
            let lower = line.to_lowercase();
            lower.contains("grand total") || lower.contains("to pay") || lower.contains("bill total")
        })
        .and_then(extract::priced_amount_in)
        .unwrap_or(0.0);

    let mut cart = Cart {
        items: cart_items,
        subtotal: 0.0,
        delivery_fee: 0.0,
        taxes: 0.0,
        total_amount,
        min_order_value: None,
    };
    cart.finalize();
    cart
}

/// Looks for a rendered quantity like "x 2" or "Qty: 3".
fn quantity_in(text: &str) -> Option<u32> {
    let lower = text.to_lowercase();
    for needle in ["qty", "x "] {
        if let Some(pos) = lower.find(needle) {
            let tail: String = lower[pos + needle.len()..]
                .chars()
                .skip_while(|c| *c == ':' || c.is_whitespace())
                .take_while(char::is_ascii_digit)
                .collect();
            if let Ok(n) = tail.parse() {
                return Some(n);
            }
        }
    }
    None
}

fn order_from_page(items: &[PageItem], lower_text: &str) -> Option<Order> {
    let scope = items.first().map_or(lower_text, |item| item.text.as_str());
    let lower = scope.to_lowercase();
    let status = if lower.contains("delivered") {
        OrderStatus::Delivered
    } else if lower.contains("out for delivery") || lower.contains("on the way") {
        OrderStatus::OutForDelivery
    } else if lower.contains("preparing") || lower.contains("packing") {
        OrderStatus::Preparing
    } else if lower.contains("cancelled") || lower.contains("canceled") {
        OrderStatus::Cancelled
    } else if lower.contains("confirmed") || lower.contains("accepted") {
        OrderStatus::Confirmed
    } else if lower.contains("order") {
        OrderStatus::Pending
    } else {
        return None;
    };
    Some(Order {
        id: items
            .first()
            .and_then(|item| item.id.clone())
            .unwrap_or_else(|| "pos:0".to_owned()),
        status,
        items: Vec::new(),
        delivery_address: None,
        payment_method: None,
        total_amount: extract::first_amount_in(scope).unwrap_or(0.0),
        created_at: Utc::now(),
        estimated_delivery: None,
        tracking_reference: None,
    })
}

fn addresses_from_items(items: &[PageItem]) -> Vec<Address> {
    items
        .iter()
        .enumerate()
        .map(|(position, item)| {
            let mut lines = item.text.lines().map(str::trim).filter(|l| !l.is_empty());
            let first = lines.next().unwrap_or_default();
            let label = AddressLabel::from_raw(first);
            let line1 = if label == AddressLabel::Unspecified {
                first.to_owned()
            } else {
                lines.next().unwrap_or_default().to_owned()
            };
            Address {
                id: item.id.clone().unwrap_or_else(|| format!("pos:{position}")),
                label,
                line1,
                line2: lines.next().map(str::to_owned),
                landmark: None,
                city: None,
                state: None,
                postal_code: None,
                is_default: false,
            }
        })
        .collect()
}
