//! Candidate endpoint tables for the private API surface.
//!
//! The storefront renames and retires endpoints without notice, so every
//! operation maps to an ordered list: the path observed most recently
//! first, older spellings behind it. A path dropping to a later position
//! in practice (visible as a rising candidate index in the logs) is the
//! early warning that the table needs refreshing.

use serde_json::json;

use kirana_engine::action::{Action, HttpCall};
use kirana_engine::operation::Operation;

/// Build the ordered candidates for one operation.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn candidates(op: &Operation) -> Vec<Action> {
    match op {
        Operation::RequestOtp {
            phone,
            country_code,
            device_id,
        } => {
            let payload = json!({
                "phone": phone,
                "country_code": country_code,
                "device_id": device_id,
            });
            posts(
                &["/v2/accounts/login/", "/api/auth/login", "/v1/auth/otp"],
                &payload,
                false,
            )
        }
        Operation::VerifyOtp {
            phone,
            otp,
            session_id,
            device_id,
        } => {
            let payload = json!({
                "phone": phone,
                "otp": otp,
                "session_id": session_id,
                "device_id": device_id,
            });
            posts(
                &[
                    "/v2/accounts/otp/verify/",
                    "/api/auth/verify",
                    "/v1/auth/otp/verify",
                ],
                &payload,
                false,
            )
        }
        Operation::Search { query } => ["/v6/search/products", "/api/search", "/v1/search"]
            .iter()
            .map(|path| {
                Action::Http(
                    HttpCall::get(path)
                        .with_query("q", query)
                        .with_query("page_size", "20"),
                )
            })
            .collect(),
        Operation::Suggest { prefix } => {
            ["/v1/search/suggestions", "/api/search/autocomplete"]
                .iter()
                .map(|path| Action::Http(HttpCall::get(path).with_query("q", prefix)))
                .collect()
        }
        Operation::AddToCart { product_id } | Operation::IncrementCartItem { product_id } => {
            let payload = json!({"product_id": product_id, "quantity": 1});
            posts(
                &["/v2/cart/add/", "/api/cart/add", "/v1/cart/items"],
                &payload,
                true,
            )
        }
        // Clicking a card by name is a rendered-page affordance; the
        // endpoint surface has no equivalent.
        Operation::AddToCartByName { .. } => Vec::new(),
        Operation::RemoveFromCart {
            product_id,
            quantity,
        } => {
            let payload = json!({"product_id": product_id, "quantity": quantity});
            posts(
                &["/v2/cart/remove/", "/api/cart/remove"],
                &payload,
                true,
            )
        }
        Operation::GetCart => ["/v2/cart/", "/api/cart", "/v1/cart/details", "/cart"]
            .iter()
            .map(|path| Action::Http(HttpCall::get(path)))
            .collect(),
        Operation::ClearCart => posts(
            &["/v2/cart/clear/", "/api/cart/clear"],
            &json!({}),
            true,
        ),
        Operation::SetLocation { name } => {
            let payload = json!({"location": name});
            posts(
                &["/v2/locations/set/", "/api/location", "/v1/user/location"],
                &payload,
                true,
            )
        }
        Operation::GetAddresses => {
            ["/v2/addresses/", "/api/addresses", "/v1/user/addresses"]
                .iter()
                .map(|path| Action::Http(HttpCall::get(path)))
                .collect()
        }
        Operation::AddAddress { address } => {
            let payload = json!({
                "label": address.label,
                "line1": address.line1,
                "line2": address.line2,
                "landmark": address.landmark,
                "city": address.city,
                "state": address.state,
                "pincode": address.postal_code,
            });
            posts(&["/v2/addresses/add/", "/api/addresses"], &payload, true)
        }
        Operation::SelectAddress { index } => {
            let payload = json!({"address_index": index});
            posts(
                &["/v2/addresses/select/", "/api/addresses/select"],
                &payload,
                true,
            )
        }
        Operation::Checkout => posts(
            &["/v2/checkout/", "/api/checkout", "/v1/checkout/init"],
            &json!({}),
            true,
        ),
        Operation::GetPaymentMethods => {
            ["/v2/payments/methods/", "/api/payment/methods"]
                .iter()
                .map(|path| Action::Http(HttpCall::get(path)))
                .collect()
        }
        Operation::SelectPaymentMethod { method } => {
            let payload = json!({"method": method.as_code()});
            posts(
                &["/v2/payments/select/", "/api/payment/select"],
                &payload,
                true,
            )
        }
        Operation::EnterPaymentDetail { detail } => {
            let payload = json!({"detail": detail});
            posts(
                &["/v2/payments/detail/", "/api/payment/detail"],
                &payload,
                true,
            )
        }
        Operation::ConfirmPayment => posts(
            &[
                "/v2/payments/confirm/",
                "/api/payment/confirm",
                "/v1/order/place",
            ],
            &json!({}),
            true,
        ),
        Operation::OrderStatus { order_id } => vec![
            Action::Http(HttpCall::get(&format!("/v2/orders/{order_id}/"))),
            Action::Http(HttpCall::get(&format!("/api/orders/{order_id}"))),
            Action::Http(HttpCall::get("/v1/order/status").with_query("order_id", order_id)),
        ],
    }
}

fn posts(paths: &[&str], payload: &serde_json::Value, requires_auth: bool) -> Vec<Action> {
    paths
        .iter()
        .map(|path| {
            let call = HttpCall::post(path, payload.clone());
            Action::Http(if requires_auth { call } else { call.public() })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cart_candidates_keep_their_observed_order() {
        let actions = candidates(&Operation::GetCart);
        let paths: Vec<String> = actions
            .iter()
            .map(|a| match a {
                Action::Http(call) => call.path.clone(),
                Action::Page(_) => unreachable!("cart candidates are all http"),
            })
            .collect();
        assert_eq!(paths, ["/v2/cart/", "/api/cart", "/v1/cart/details", "/cart"]);
    }

    #[test]
    fn auth_operations_do_not_require_a_session() {
        let actions = candidates(&Operation::RequestOtp {
            phone: "9876543210".to_owned(),
            country_code: "91".to_owned(),
            device_id: "dev".to_owned(),
        });
        for action in actions {
            let Action::Http(call) = action else {
                unreachable!("auth candidates are all http");
            };
            assert!(!call.requires_auth);
        }
    }

    #[test]
    fn by_name_add_has_no_endpoint_equivalent() {
        assert!(candidates(&Operation::AddToCartByName {
            name: "milk".to_owned()
        })
        .is_empty());
    }
}
