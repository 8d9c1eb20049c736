//! Scripted page interactions per operation.
//!
//! Selector dialect follows the driven page's markup: BEM-ish class
//! prefixes (`SearchBar__`, `AddressList__`, `Zpayments__`) plus a few
//! stable attributes. Where the markup offers nothing stable the scripts
//! fall back to visible-text needles. As with the endpoint tables, order
//! is most-reliable first.

use kirana_engine::action::{Action, PageScript, PageStep};
use kirana_engine::classify::QUANTITY_LIMIT_PHRASES;
use kirana_engine::operation::Operation;

/// Card container rendered per product on a listing page.
const PRODUCT_CARD: &str = "div[role='button'][id]";
/// Saved-address rows on the checkout address screen.
const ADDRESS_ROW: &str = ".AddressList__AddressItemWrapper";
/// The cart summary / proceed strip.
const CART_BUTTON: &str = ".CartButton__Button";
/// Payment iframe mount point.
const PAYMENT_WIDGET: &str = "#payment_widget";

/// Build the ordered page-script candidates for one operation.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn candidates(op: &Operation) -> Vec<Action> {
    match op {
        // Authentication needs the phone keyed in and the code relayed by
        // the caller; the scripts just drive the two dialogs.
        Operation::RequestOtp { phone, .. } => vec![Action::Page(
            PageScript::new(vec![
                PageStep::Goto("/".to_owned()),
                PageStep::ClickIfVisible("[data-test-id='login-button']".to_owned()),
                PageStep::ClickByText("Login".to_owned()),
                PageStep::Fill {
                    selector: "input[type='tel']".to_owned(),
                    text: phone.clone(),
                },
                PageStep::ClickByText("Continue".to_owned()),
                PageStep::WaitFor("input[autocomplete='one-time-code']".to_owned()),
            ])
            .confirm_on(&["input[autocomplete='one-time-code']"]),
        )],
        Operation::VerifyOtp { otp, .. } => vec![Action::Page(
            PageScript::new(vec![
                PageStep::Fill {
                    selector: "input[autocomplete='one-time-code']".to_owned(),
                    text: otp.clone(),
                },
                PageStep::WaitFor("[data-test-id='user-avatar']".to_owned()),
            ])
            .confirm_on(&["[data-test-id='user-avatar']"])
            .deny_on(&["Incorrect OTP"]),
        )],
        Operation::Search { query } => vec![
            // Direct listing URL, cheapest when it works.
            Action::Page(
                PageScript::new(vec![
                    PageStep::Goto(format!("/s/?q={query}")),
                    PageStep::WaitFor(PRODUCT_CARD.to_owned()),
                ])
                .collecting(PRODUCT_CARD, Some("id")),
            ),
            // The search-bar flow the site actually ships.
            Action::Page(
                PageScript::new(vec![
                    PageStep::Click("a[href='/s/']".to_owned()),
                    PageStep::Fill {
                        selector: ".SearchBar__PlaceholderContainer input".to_owned(),
                        text: query.clone(),
                    },
                    PageStep::Press("Enter".to_owned()),
                    PageStep::WaitFor(PRODUCT_CARD.to_owned()),
                ])
                .collecting(PRODUCT_CARD, Some("id")),
            ),
        ],
        Operation::Suggest { prefix } => vec![Action::Page(
            PageScript::new(vec![
                PageStep::Click("a[href='/s/']".to_owned()),
                PageStep::Fill {
                    selector: ".SearchBar__PlaceholderContainer input".to_owned(),
                    text: prefix.clone(),
                },
                PageStep::WaitFor(".SearchSuggestions__Item".to_owned()),
            ])
            .collecting(".SearchSuggestions__Item", None),
        )],
        Operation::AddToCart { product_id } | Operation::IncrementCartItem { product_id } => {
            let card = format!("div[id='{product_id}']");
            // The increment control is the last button on a card already
            // in the cart; ADD is the only button otherwise. Clicking the
            // last one covers both.
            vec![Action::Page(
                PageScript::new(vec![PageStep::ClickLast(format!("{card} button"))])
                    .confirm_on(&[CART_BUTTON])
                    .deny_on(&QUANTITY_LIMIT_PHRASES),
            )]
        }
        Operation::AddToCartByName { name } => vec![Action::Page(
            PageScript::new(vec![PageStep::ClickByText(format!("{name}\nADD"))])
                .confirm_on(&[CART_BUTTON])
                .deny_on(&QUANTITY_LIMIT_PHRASES),
        )],
        Operation::RemoveFromCart {
            product_id,
            quantity,
        } => {
            let minus = format!("div[id='{product_id}'] button[aria-label='Remove']");
            let steps = (0..*quantity)
                .map(|_| PageStep::Click(minus.clone()))
                .collect();
            vec![Action::Page(PageScript::new(steps))]
        }
        Operation::GetCart => vec![Action::Page(
            PageScript::new(vec![
                PageStep::Click(CART_BUTTON.to_owned()),
                PageStep::WaitFor(".CartItem__Wrapper".to_owned()),
            ])
            .collecting(".CartItem__Wrapper", Some("id")),
        )],
        Operation::ClearCart => vec![Action::Page(PageScript::new(vec![
            PageStep::Click(CART_BUTTON.to_owned()),
            PageStep::ClickByText("Clear cart".to_owned()),
            PageStep::ClickByText("Confirm".to_owned()),
        ]))],
        Operation::SetLocation { name } => vec![Action::Page(
            PageScript::new(vec![
                PageStep::Click(".LocationBar__Container".to_owned()),
                PageStep::Fill {
                    selector: "input[name='select-locality']".to_owned(),
                    text: name.clone(),
                },
                PageStep::WaitFor(".LocationSearchList__LocationItem".to_owned()),
                PageStep::ClickNth(".LocationSearchList__LocationItem".to_owned(), 0),
            ])
            .confirm_on(&[".LocationBar__Title"]),
        )],
        Operation::GetAddresses => vec![Action::Page(
            PageScript::new(vec![PageStep::WaitFor(ADDRESS_ROW.to_owned())])
                .collecting(ADDRESS_ROW, Some("id")),
        )],
        Operation::AddAddress { address } => vec![Action::Page(PageScript::new(vec![
            PageStep::ClickByText("Add new address".to_owned()),
            PageStep::Fill {
                selector: "input[name='flat']".to_owned(),
                text: address.line1.clone(),
            },
            PageStep::Fill {
                selector: "input[name='landmark']".to_owned(),
                text: address.landmark.clone().unwrap_or_default(),
            },
            PageStep::ClickByText("Save address".to_owned()),
        ]))],
        Operation::SelectAddress { index } => vec![Action::Page(
            PageScript::new(vec![PageStep::ClickNth(ADDRESS_ROW.to_owned(), *index)])
                .confirm_on(&[PAYMENT_WIDGET, CART_BUTTON]),
        )],
        // A screen that matches neither probe set is still a reportable
        // checkout state (unknown), so the wait budget elapsing must hand
        // the snapshot to the classifier instead of faulting.
        Operation::Checkout => vec![Action::Page(
            PageScript::new(vec![PageStep::Click(CART_BUTTON.to_owned())])
                .confirm_on(&[ADDRESS_ROW, PAYMENT_WIDGET, "Select delivery address"])
                .snapshot_on_timeout(),
        )],
        Operation::GetPaymentMethods => vec![Action::Page(
            PageScript::new(vec![PageStep::WaitFor(PAYMENT_WIDGET.to_owned())])
                .collecting(".PaymentMethod__Row", None),
        )],
        Operation::SelectPaymentMethod { method } => {
            let label = match method {
                kirana_core::models::PaymentMethod::Cod => "Cash on Delivery",
                kirana_core::models::PaymentMethod::Upi => "UPI",
                kirana_core::models::PaymentMethod::Card => "Card",
                kirana_core::models::PaymentMethod::Wallet => "Wallet",
            };
            vec![Action::Page(
                PageScript::new(vec![PageStep::ClickByText(label.to_owned())])
                    .confirm_on(&[PAYMENT_WIDGET]),
            )]
        }
        // Filling the handle leaves no dedicated marker behind; the widget
        // still rendering after the fill is the confirmation.
        Operation::EnterPaymentDetail { detail } => vec![Action::Page(
            PageScript::new(vec![PageStep::Fill {
                selector: format!("{PAYMENT_WIDGET} input"),
                text: detail.clone(),
            }])
            .confirm_on(&[PAYMENT_WIDGET]),
        )],
        Operation::ConfirmPayment => vec![Action::Page(
            PageScript::new(vec![PageStep::ClickByText("Pay Now".to_owned())])
                .confirm_on(&["order placed", "order confirmed", ".Zpayments__Success"])
                .deny_on(&["payment failed", "transaction declined"]),
        )],
        Operation::OrderStatus { .. } => vec![Action::Page(
            PageScript::new(vec![
                PageStep::Goto("/account/orders".to_owned()),
                PageStep::WaitFor(".OrderCard".to_owned()),
            ])
            .collecting(".OrderCard", Some("id")),
        )],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_has_a_direct_and_a_search_bar_candidate() {
        let actions = candidates(&Operation::Search {
            query: "milk".to_owned(),
        });
        assert_eq!(actions.len(), 2);
        let Action::Page(first) = &actions[0] else {
            panic!("page transport issues page scripts");
        };
        assert!(matches!(&first.steps[0], PageStep::Goto(path) if path == "/s/?q=milk"));
        assert!(first.collect.is_some());
    }

    #[test]
    fn cart_mutations_watch_for_the_cap_toast() {
        let actions = candidates(&Operation::IncrementCartItem {
            product_id: "381406".to_owned(),
        });
        let Action::Page(script) = &actions[0] else {
            panic!("expected a page script");
        };
        assert!(script
            .deny
            .iter()
            .any(|m| m.contains("can't add more of this item")));
    }
}
