//! Endpoint-transport behavior against a mocked storefront.

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kirana_core::app_config::AppConfig;
use kirana_core::config::load_app_config_from_env;
use kirana_engine::session::{SessionRecord, SessionStore};
use kirana_engine::{OpError, OrderService};

use kirana_api::HttpTransport;

fn test_config(name: &str) -> AppConfig {
    let mut config = load_app_config_from_env().expect("defaults");
    config.session_path = std::env::temp_dir().join(format!(
        "kirana-api-test-{name}-{}.json",
        uuid::Uuid::new_v4()
    ));
    config.inter_request_delay_ms = 0;
    config.max_retries = 0;
    config.geo_lookup = false;
    config
}

fn service(config: &AppConfig, base_url: &str) -> OrderService<HttpTransport> {
    let transport = HttpTransport::new(config)
        .expect("client builds")
        .with_base_url(base_url);
    OrderService::new(transport, config)
}

fn cart_body() -> serde_json::Value {
    serde_json::json!({
        "cart": {
            "items": [
                {"product_id": "381406", "name": "Milk", "quantity": 2, "price": 27, "line_total": 54}
            ],
            "delivery_fee": 15
        }
    })
}

#[tokio::test]
async fn falls_back_when_the_primary_endpoint_is_gone() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/cart/"))
        .respond_with(ResponseTemplate::new(404).set_body_string("<html>gone</html>"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/cart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_body()))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config("fallback");
    let svc = service(&config, &server.uri());
    let cart = svc
        .get_cart()
        .await
        .expect("second endpoint serves the cart")
        .into_completed()
        .expect("store open");
    assert_eq!(cart.total_items(), 2);
    assert!((cart.total_amount - 69.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn persisted_session_rides_along_as_bearer_and_cookie() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/cart/"))
        .and(header("authorization", "Bearer tok123"))
        .and(header("cookie", "session=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_body()))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config("bearer");
    let mut record = SessionRecord::new(Some("tok123".to_owned()), None, None);
    record
        .cookies
        .insert("session".to_owned(), "abc".to_owned());
    SessionStore::new(&config.session_path)
        .save(&record)
        .expect("seed session");

    let svc = service(&config, &server.uri());
    svc.get_cart()
        .await
        .expect("authenticated fetch")
        .into_completed()
        .expect("store open");
}

#[tokio::test]
async fn throttling_aborts_with_the_suggested_wait() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/cart/"))
        .respond_with(
            ResponseTemplate::new(429).insert_header("Retry-After", "30"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/cart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_body()))
        .expect(0)
        .mount(&server)
        .await;

    let config = test_config("throttle");
    let svc = service(&config, &server.uri());
    let err = svc.get_cart().await.expect_err("throttled");
    assert!(matches!(
        err,
        OpError::RateLimited {
            retry_after_secs: 30
        }
    ));
}

#[tokio::test]
async fn auth_rejection_stops_the_walk_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/cart/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/cart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_body()))
        .expect(0)
        .mount(&server)
        .await;

    let config = test_config("auth");
    let svc = service(&config, &server.uri());
    let err = svc.get_cart().await.expect_err("rejected");
    assert!(matches!(err, OpError::Auth(_)));
}

#[tokio::test]
async fn refusal_banner_in_an_error_status_still_classifies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/cart/"))
        .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
            "message": "Sorry, we can't take your order right now"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/cart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_body()))
        .expect(0)
        .mount(&server)
        .await;

    let config = test_config("banner");
    let svc = service(&config, &server.uri());
    let outcome = svc.get_cart().await.expect("refusal is a normal outcome");
    assert!(outcome.is_unavailable());
}

#[tokio::test]
async fn set_cookie_is_captured_and_replayed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/cart/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Set-Cookie", "__session=xyz; Path=/; HttpOnly")
                .set_body_json(cart_body()),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/cart/"))
        .and(header("cookie", "__session=xyz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_body()))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config("cookies");
    let svc = service(&config, &server.uri());
    svc.get_cart().await.expect("first fetch");
    svc.get_cart().await.expect("second fetch rides the cookie");
}
