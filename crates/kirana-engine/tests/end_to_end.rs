//! Service-level scenarios against an in-memory storefront stub.
//!
//! The stub behaves like the real thing in the ways that matter: its
//! first search endpoint is dead, its product identifiers can rot between
//! calls, it enforces per-item caps with a toast message instead of an
//! error code, and when the store closes it says so inside otherwise
//! healthy responses.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use kirana_core::config::load_app_config_from_env;
use kirana_engine::{
    Action, HttpCall, OpError, Operation, OrderService, ProductRef, RawResult, Transport,
    TransportFault,
};

#[derive(Clone)]
struct StubProduct {
    id: String,
    name: String,
    price: f64,
}

#[derive(Default)]
struct StoreState {
    /// query -> products currently rendered for it
    catalog: HashMap<String, Vec<StubProduct>>,
    /// product id -> units in cart
    cart: HashMap<String, u32>,
    /// product id -> per-item cap
    caps: HashMap<String, u32>,
}

struct StubStore {
    state: Mutex<StoreState>,
    closed: AtomicBool,
    search_hits: AtomicU32,
    legacy_search_hits: AtomicU32,
}

impl StubStore {
    fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            closed: AtomicBool::new(false),
            search_hits: AtomicU32::new(0),
            legacy_search_hits: AtomicU32::new(0),
        }
    }

    fn stock(&self, query: &str, products: Vec<StubProduct>) {
        self.state
            .lock()
            .unwrap()
            .catalog
            .insert(query.to_owned(), products);
    }

    fn cap(&self, id: &str, max: u32) {
        self.state
            .lock()
            .unwrap()
            .caps
            .insert(id.to_owned(), max);
    }

    fn cart_quantity(&self, id: &str) -> u32 {
        self.state.lock().unwrap().cart.get(id).copied().unwrap_or(0)
    }

    fn product_exists(&self, id: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .catalog
            .values()
            .flatten()
            .any(|p| p.id == id)
    }

    fn bump(&self, id: &str) -> Value {
        let mut state = self.state.lock().unwrap();
        let current = state.cart.get(id).copied().unwrap_or(0);
        let cap = state.caps.get(id).copied().unwrap_or(u32::MAX);
        if current >= cap {
            return json!({"success": false, "message": "Sorry, you can't add more of this item"});
        }
        state.cart.insert(id.to_owned(), current + 1);
        json!({"success": true})
    }
}

#[async_trait]
impl Transport for StubStore {
    async fn ensure_started(&self) -> Result<(), TransportFault> {
        Ok(())
    }

    fn candidates(&self, op: &Operation) -> Vec<Action> {
        match op {
            // Two search endpoints; the legacy one is first and dead.
            Operation::Search { query } => vec![
                Action::Http(HttpCall::get("/v1/search").with_query("q", query)),
                Action::Http(HttpCall::get("/v2/search").with_query("q", query)),
            ],
            Operation::AddToCart { product_id } | Operation::IncrementCartItem { product_id } => {
                vec![Action::Http(HttpCall::post(
                    "/cart/add",
                    json!({"product_id": product_id}),
                ))]
            }
            // By-name adds are a rendered-page affordance.
            Operation::AddToCartByName { .. } => Vec::new(),
            other => vec![Action::Http(HttpCall::get(other.name()))],
        }
    }

    async fn execute(&self, action: &Action) -> Result<RawResult, TransportFault> {
        let Action::Http(call) = action else {
            unreachable!("the stub only issues http actions");
        };
        if self.closed.load(Ordering::SeqCst) {
            return Ok(RawResult::Json(
                json!({"success": true, "banner": "Store is closed due to High Demand"}),
            ));
        }
        let body = match call.path.as_str() {
            "/v1/search" => {
                self.legacy_search_hits.fetch_add(1, Ordering::SeqCst);
                json!({"products": []})
            }
            "/v2/search" => {
                self.search_hits.fetch_add(1, Ordering::SeqCst);
                let query = call
                    .query
                    .iter()
                    .find(|(k, _)| k == "q")
                    .map(|(_, v)| v.clone())
                    .unwrap_or_default();
                let state = self.state.lock().unwrap();
                let products: Vec<Value> = state
                    .catalog
                    .get(&query)
                    .into_iter()
                    .flatten()
                    .map(|p| json!({"id": p.id, "name": p.name, "price": p.price}))
                    .collect();
                json!({"data": {"products": products}})
            }
            "/cart/add" => {
                let id = call
                    .payload
                    .as_ref()
                    .and_then(|p| p.get("product_id"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned();
                if self.product_exists(&id) {
                    self.bump(&id)
                } else {
                    json!({"error": "product not found"})
                }
            }
            "get_cart" => {
                let state = self.state.lock().unwrap();
                let items: Vec<Value> = state
                    .cart
                    .iter()
                    .map(|(id, qty)| {
                        let price = state
                            .catalog
                            .values()
                            .flatten()
                            .find(|p| p.id == *id)
                            .map_or(0.0, |p| p.price);
                        json!({
                            "product_id": id,
                            "name": id,
                            "quantity": qty,
                            "price": price,
                            "line_total": price * f64::from(*qty),
                        })
                    })
                    .collect();
                // No grand total on purpose; the client must derive it.
                json!({"cart": {"items": items, "delivery_fee": 15}})
            }
            _ => json!({"success": true}),
        };
        Ok(RawResult::Json(body))
    }
}

fn milk() -> StubProduct {
    StubProduct {
        id: "381406".to_owned(),
        name: "Amul Taaza Toned Milk".to_owned(),
        price: 27.0,
    }
}

fn service(store: StubStore) -> OrderService<StubStore> {
    let config = load_app_config_from_env().expect("default config");
    OrderService::new(store, &config)
}

#[tokio::test]
async fn search_resolves_on_the_fallback_endpoint() {
    let store = StubStore::new();
    store.stock("milk", vec![milk()]);
    let svc = service(store);

    let result = svc
        .search("milk")
        .await
        .expect("search")
        .into_completed()
        .expect("store open");
    assert_eq!(result.products.len(), 1);
    assert_eq!(result.products[0].id, "381406");
    assert!((result.products[0].price - 27.0).abs() < f64::EPSILON);
    assert_eq!(svc.tracker().len(), 1, "search results feed the tracker");
    assert_eq!(
        svc.transport().legacy_search_hits.load(Ordering::SeqCst),
        1,
        "the dead endpoint is tried first, in order"
    );
}

#[tokio::test]
async fn stale_identifier_is_reacquired_with_exactly_one_research() {
    let store = StubStore::new();
    store.stock("milk", vec![milk()]);
    let svc = service(store);

    svc.search("milk").await.expect("initial search");

    // The storefront re-keys the listing: same milk, new identifier.
    svc.transport().stock(
        "milk",
        vec![StubProduct {
            id: "909090".to_owned(),
            name: "Amul Taaza Toned Milk 500ml".to_owned(),
            price: 27.0,
        }],
    );

    let outcome = svc
        .add_to_cart(&ProductRef::Id("381406".to_owned()), 1)
        .await
        .expect("re-acquisition should rescue the add")
        .into_completed()
        .expect("store open");
    assert_eq!(outcome.achieved, 1);
    assert_eq!(
        svc.transport().cart_quantity("909090"),
        1,
        "the re-acquired identifier is the one added"
    );
    assert_eq!(
        svc.transport().search_hits.load(Ordering::SeqCst),
        2,
        "one initial search plus exactly one re-acquisition search"
    );
}

#[tokio::test]
async fn never_seen_identifier_is_not_locatable() {
    let store = StubStore::new();
    store.stock("milk", vec![milk()]);
    let svc = service(store);

    let err = svc
        .add_to_cart(&ProductRef::Id("ghost".to_owned()), 1)
        .await
        .expect_err("nothing recorded for this id");
    assert!(matches!(err, OpError::NotLocatable { .. }));
    assert_eq!(
        svc.transport().search_hits.load(Ordering::SeqCst),
        0,
        "no recorded query means nothing to re-run"
    );
}

#[tokio::test]
async fn renamed_product_is_not_silently_substituted() {
    let store = StubStore::new();
    store.stock("milk", vec![milk()]);
    let svc = service(store);

    svc.search("milk").await.expect("initial search");

    // The query now renders something entirely different.
    svc.transport().stock(
        "milk",
        vec![StubProduct {
            id: "777".to_owned(),
            name: "Soy Beverage".to_owned(),
            price: 99.0,
        }],
    );

    let err = svc
        .add_to_cart(&ProductRef::Id("381406".to_owned()), 1)
        .await
        .expect_err("no name match, no substitution");
    assert!(matches!(err, OpError::NotLocatable { .. }));
    assert_eq!(
        svc.transport().cart_quantity("777"),
        0,
        "an unrelated product must never be added in place of the stale one"
    );
}

#[tokio::test]
async fn per_item_cap_reports_the_shortfall() {
    let store = StubStore::new();
    store.stock("milk", vec![milk()]);
    store.cap("381406", 3);
    let svc = service(store);

    svc.search("milk").await.expect("search");
    let outcome = svc
        .add_to_cart(&ProductRef::Index(0), 5)
        .await
        .expect("capped adds still complete")
        .into_completed()
        .expect("store open");
    assert_eq!(outcome.requested, 5);
    assert_eq!(outcome.achieved, 3);
    assert!(outcome.capped);
    assert_eq!(outcome.shortfall(), 2);
    assert_eq!(svc.transport().cart_quantity("381406"), 3);
}

#[tokio::test]
async fn requests_beyond_the_assumed_cap_are_trimmed_up_front() {
    let store = StubStore::new();
    store.stock("milk", vec![milk()]);
    // No storefront cap: the configured per-item assumption (10) governs.
    let svc = service(store);

    svc.search("milk").await.expect("search");
    let outcome = svc
        .add_to_cart(&ProductRef::Index(0), 25)
        .await
        .expect("add")
        .into_completed()
        .expect("store open");
    assert_eq!(outcome.requested, 25);
    assert_eq!(outcome.achieved, 10);
    assert!(outcome.capped);
    assert_eq!(svc.transport().cart_quantity("381406"), 10);
}

#[tokio::test]
async fn cart_total_is_derived_when_the_source_omits_it() {
    let store = StubStore::new();
    store.stock("milk", vec![milk()]);
    let svc = service(store);

    svc.search("milk").await.expect("search");
    svc.add_to_cart(&ProductRef::Index(0), 2)
        .await
        .expect("add");
    let cart = svc
        .get_cart()
        .await
        .expect("get cart")
        .into_completed()
        .expect("store open");
    assert_eq!(cart.total_items(), 2);
    assert!((cart.subtotal - 54.0).abs() < f64::EPSILON);
    assert!((cart.total_amount - 69.0).abs() < f64::EPSILON, "subtotal plus delivery fee");
}

#[tokio::test]
async fn closed_store_does_not_report_a_verified_login() {
    let store = StubStore::new();
    let mut config = load_app_config_from_env().expect("default config");
    config.session_path = std::env::temp_dir().join(format!(
        "kirana-e2e-closed-auth-{}.json",
        std::process::id()
    ));
    let svc = OrderService::new(store, &config);
    svc.transport().closed.store(true, Ordering::SeqCst);

    let sent = svc.request_otp("9876543210").await.expect("not an error");
    assert!(sent.is_unavailable(), "an outage banner is not a sent code");

    let verified = svc
        .verify_otp("9876543210", "1234")
        .await
        .expect("not an error");
    assert!(
        verified.is_unavailable(),
        "an outage banner is not a verified login"
    );
    assert!(
        !svc.is_logged_in().expect("session store readable"),
        "nothing may be persisted while the store is down"
    );
}

#[tokio::test]
async fn closed_store_is_a_normal_outcome_not_an_error() {
    let store = StubStore::new();
    store.stock("milk", vec![milk()]);
    let svc = service(store);
    svc.transport().closed.store(true, Ordering::SeqCst);

    let outcome = svc.search("milk").await.expect("not an error");
    assert!(outcome.is_unavailable());

    let cart = svc.get_cart().await.expect("not an error");
    assert!(cart.is_unavailable());
}
