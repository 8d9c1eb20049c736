//! Domain records shared by both transport modes.
//!
//! Everything here is a best-effort snapshot extracted from whatever shape
//! the storefront happened to return; none of it is authoritative. Product
//! identifiers in particular are only stable within the catalog view that
//! produced them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A product as surfaced by a search, tied to the query that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: f64,
    /// Original/MRP price, when the listing shows a strike-through.
    pub original_price: Option<f64>,
    pub in_stock: bool,
    pub brand: Option<String>,
    pub category: Option<String>,
    /// Unit of sale, e.g. "500 ml" or "1 pack".
    pub unit: Option<String>,
    /// Per-item order cap, when the source reports one.
    pub max_quantity: Option<u32>,
}

/// Ordered search results. Position is significant: downstream operations
/// may reference products by index as well as by identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub query: String,
    pub products: Vec<Product>,
    pub total_results: usize,
    pub has_more: bool,
}

impl SearchResult {
    #[must_use]
    pub fn empty(query: &str) -> Self {
        Self {
            query: query.to_owned(),
            products: Vec::new(),
            total_results: 0,
            has_more: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub line_total: f64,
}

/// A cart snapshot. Never cached across mutating operations — any
/// add/remove/update invalidates a previously held snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub taxes: f64,
    pub total_amount: f64,
    pub min_order_value: Option<f64>,
}

impl Cart {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            subtotal: 0.0,
            delivery_fee: 0.0,
            taxes: 0.0,
            total_amount: 0.0,
            min_order_value: None,
        }
    }

    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Fills in totals the source left out. The grand total must never stay
    /// at a silent zero when items exist, so when the source omits it the
    /// invariant `total = subtotal + delivery_fee + taxes` is applied; a
    /// missing subtotal is likewise recomputed from line totals.
    pub fn finalize(&mut self) {
        if self.subtotal == 0.0 && !self.items.is_empty() {
            self.subtotal = self.items.iter().map(|i| i.line_total).sum();
        }
        if self.total_amount == 0.0 && self.subtotal > 0.0 {
            self.total_amount = self.subtotal + self.delivery_fee + self.taxes;
        }
    }
}

/// Label/type of a saved delivery address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressLabel {
    Home,
    Work,
    Other,
    Unspecified,
}

impl AddressLabel {
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "home" => Self::Home,
            "work" | "office" => Self::Work,
            "other" => Self::Other,
            _ => Self::Unspecified,
        }
    }
}

/// A saved delivery address. Listed and selected, never mutated in place;
/// creation is a separate side operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub id: String,
    pub label: AddressLabel,
    pub line1: String,
    pub line2: Option<String>,
    pub landmark: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub is_default: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cod,
    Upi,
    Card,
    Wallet,
}

impl PaymentMethod {
    /// Maps the source's payment-method vocabulary onto the known set.
    /// Returns `None` for codes we cannot drive.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "cod" | "cash" | "cash_on_delivery" => Some(Self::Cod),
            "upi" => Some(Self::Upi),
            "card" | "credit_card" | "debit_card" => Some(Self::Card),
            "wallet" => Some(Self::Wallet),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_code(self) -> &'static str {
        match self {
            Self::Cod => "cod",
            Self::Upi => "upi",
            Self::Card => "card",
            Self::Wallet => "wallet",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOption {
    pub method: PaymentMethod,
    pub display_name: String,
    pub available: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Permissive parse: the source's status vocabulary is not fully known,
    /// so unrecognized strings map to [`OrderStatus::Pending`] rather than
    /// failing the whole extraction.
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "confirmed" | "accepted" => Self::Confirmed,
            "preparing" | "packing" | "packed" => Self::Preparing,
            "out_for_delivery" | "dispatched" | "on_the_way" => Self::OutForDelivery,
            "delivered" | "completed" => Self::Delivered,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Pending,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

/// An order as observed via a status query. Immutable after placement
/// except for status transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub status: OrderStatus,
    pub items: Vec<CartItem>,
    pub delivery_address: Option<Address>,
    pub payment_method: Option<PaymentMethod>,
    pub total_amount: f64,
    pub created_at: DateTime<Utc>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub tracking_reference: Option<String>,
}
