//! The operations callers can ask for, independent of transport.
//!
//! Each variant carries exactly the parameters the storefront needs; the
//! transports turn a variant into an ordered candidate list of [`Action`]s.
//!
//! [`Action`]: crate::action::Action

use kirana_core::models::{Address, PaymentMethod};

#[derive(Debug, Clone)]
pub enum Operation {
    RequestOtp {
        phone: String,
        country_code: String,
        device_id: String,
    },
    VerifyOtp {
        phone: String,
        otp: String,
        session_id: Option<String>,
        device_id: String,
    },
    Search {
        query: String,
    },
    Suggest {
        prefix: String,
    },
    /// Add a single unit. Larger quantities are reached through repeated
    /// [`Operation::IncrementCartItem`] so a per-item cap surfaces per step.
    AddToCart {
        product_id: String,
    },
    /// Add a single unit of the product whose card text contains the name.
    /// Last-resort fallback when the identifier no longer resolves.
    AddToCartByName {
        name: String,
    },
    IncrementCartItem {
        product_id: String,
    },
    RemoveFromCart {
        product_id: String,
        quantity: u32,
    },
    GetCart,
    ClearCart,
    SetLocation {
        name: String,
    },
    GetAddresses,
    AddAddress {
        address: Address,
    },
    /// Zero-based index into the saved-address list as currently rendered.
    SelectAddress {
        index: usize,
    },
    /// Proceed from cart toward payment. Lands on either the address screen
    /// or the payment screen; the classifier reports which.
    Checkout,
    GetPaymentMethods,
    SelectPaymentMethod {
        method: PaymentMethod,
    },
    /// Free-form detail for the chosen method, e.g. a UPI handle.
    EnterPaymentDetail {
        detail: String,
    },
    ConfirmPayment,
    OrderStatus {
        order_id: String,
    },
}

/// Classifier lens: which extraction and success rules apply to a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    RequestOtp,
    VerifyOtp,
    Search,
    Suggest,
    CartMutation,
    GetCart,
    SetLocation,
    GetAddresses,
    AddAddress,
    SelectAddress,
    Checkout,
    GetPaymentMethods,
    Payment,
    OrderStatus,
}

impl Operation {
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::RequestOtp { .. } => OperationKind::RequestOtp,
            Self::VerifyOtp { .. } => OperationKind::VerifyOtp,
            Self::Search { .. } => OperationKind::Search,
            Self::Suggest { .. } => OperationKind::Suggest,
            Self::AddToCart { .. }
            | Self::AddToCartByName { .. }
            | Self::IncrementCartItem { .. }
            | Self::RemoveFromCart { .. }
            | Self::ClearCart => OperationKind::CartMutation,
            Self::GetCart => OperationKind::GetCart,
            Self::SetLocation { .. } => OperationKind::SetLocation,
            Self::GetAddresses => OperationKind::GetAddresses,
            Self::AddAddress { .. } => OperationKind::AddAddress,
            Self::SelectAddress { .. } => OperationKind::SelectAddress,
            Self::Checkout => OperationKind::Checkout,
            Self::GetPaymentMethods => OperationKind::GetPaymentMethods,
            Self::SelectPaymentMethod { .. }
            | Self::EnterPaymentDetail { .. }
            | Self::ConfirmPayment => OperationKind::Payment,
            Self::OrderStatus { .. } => OperationKind::OrderStatus,
        }
    }

    /// Label used in logs and in `Exhausted` diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::RequestOtp { .. } => "request_otp",
            Self::VerifyOtp { .. } => "verify_otp",
            Self::Search { .. } => "search",
            Self::Suggest { .. } => "suggest",
            Self::AddToCart { .. } => "add_to_cart",
            Self::AddToCartByName { .. } => "add_to_cart_by_name",
            Self::IncrementCartItem { .. } => "increment_cart_item",
            Self::RemoveFromCart { .. } => "remove_from_cart",
            Self::GetCart => "get_cart",
            Self::ClearCart => "clear_cart",
            Self::SetLocation { .. } => "set_location",
            Self::GetAddresses => "get_addresses",
            Self::AddAddress { .. } => "add_address",
            Self::SelectAddress { .. } => "select_address",
            Self::Checkout => "checkout",
            Self::GetPaymentMethods => "get_payment_methods",
            Self::SelectPaymentMethod { .. } => "select_payment_method",
            Self::EnterPaymentDetail { .. } => "enter_payment_detail",
            Self::ConfirmPayment => "confirm_payment",
            Self::OrderStatus { .. } => "order_status",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cart_mutations_share_a_kind() {
        let add = Operation::AddToCart {
            product_id: "p1".to_owned(),
        };
        let inc = Operation::IncrementCartItem {
            product_id: "p1".to_owned(),
        };
        assert_eq!(add.kind(), OperationKind::CartMutation);
        assert_eq!(inc.kind(), OperationKind::CartMutation);
    }
}
