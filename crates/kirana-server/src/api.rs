//! HTTP surface over the order service.
//!
//! One route per operation, all returning either the operation's
//! [`Outcome`] (unavailability included, so callers can branch) or an
//! error envelope with a stable `code`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use kirana_api::HttpTransport;
use kirana_core::models::{Address, AddressLabel, PaymentMethod};
use kirana_engine::{OpError, OrderService, ProductRef};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<OrderService<HttpTransport>>,
    /// Storefront operations share one session, so concurrent requests
    /// must not interleave mid-operation. Every handler holds this for
    /// the duration of its call.
    pub gate: Arc<tokio::sync::Mutex<()>>,
}

impl AppState {
    #[must_use]
    pub fn new(service: Arc<OrderService<HttpTransport>>) -> Self {
        Self {
            service,
            gate: Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    fn from_op(error: &OpError) -> Self {
        let code = match error {
            OpError::Validation(_) => "validation_error",
            OpError::Auth(_) => "unauthorized",
            OpError::RateLimited { .. } => "rate_limited",
            OpError::NotLocatable { .. } => "not_found",
            OpError::Cancelled => "cancelled",
            OpError::Exhausted { .. } => "upstream_exhausted",
            OpError::Transport(_) | OpError::Session(_) => "internal_error",
        };
        Self {
            code,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.code {
            "validation_error" => StatusCode::BAD_REQUEST,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "not_found" => StatusCode::NOT_FOUND,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "cancelled" => StatusCode::CONFLICT,
            "upstream_exhausted" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

impl From<OpError> for ApiError {
    fn from(error: OpError) -> Self {
        if matches!(error, OpError::Transport(_) | OpError::Session(_)) {
            tracing::error!(error = %error, "operation failed");
        }
        Self::from_op(&error)
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/otp", post(request_otp))
        .route("/api/auth/verify", post(verify_otp))
        .route("/api/auth/status", get(auth_status))
        .route("/api/auth/logout", post(logout))
        .route("/api/search", get(search))
        .route("/api/suggestions", get(suggestions))
        .route("/api/cart", get(get_cart))
        .route("/api/cart/items", post(add_to_cart))
        .route("/api/cart/items/remove", post(remove_from_cart))
        .route("/api/cart/clear", post(clear_cart))
        .route("/api/location", post(set_location))
        .route("/api/addresses", get(get_addresses).post(add_address))
        .route("/api/addresses/select", post(select_address))
        .route("/api/checkout", post(checkout))
        .route("/api/payments/methods", get(payment_methods))
        .route("/api/payments/select", post(select_payment))
        .route("/api/payments/detail", post(payment_detail))
        .route("/api/payments/confirm", post(confirm_payment))
        .route("/api/orders/{order_id}", get(order_status))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[derive(Debug, Deserialize)]
struct OtpRequest {
    phone: String,
}

async fn request_otp(
    State(state): State<AppState>,
    Json(body): Json<OtpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let _gate = state.gate.lock().await;
    let status = state.service.request_otp(&body.phone).await?;
    Ok(Json(status))
}

#[derive(Debug, Deserialize)]
struct VerifyRequest {
    phone: String,
    otp: String,
}

async fn verify_otp(
    State(state): State<AppState>,
    Json(body): Json<VerifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let _gate = state.gate.lock().await;
    Ok(Json(state.service.verify_otp(&body.phone, &body.otp).await?))
}

async fn auth_status(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let _gate = state.gate.lock().await;
    let logged_in = state.service.is_logged_in()?;
    Ok(Json(serde_json::json!({"logged_in": logged_in})))
}

async fn logout(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let _gate = state.gate.lock().await;
    state.service.logout()?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: String,
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let _gate = state.gate.lock().await;
    Ok(Json(state.service.search(&params.q).await?))
}

async fn suggestions(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let _gate = state.gate.lock().await;
    Ok(Json(state.service.suggestions(&params.q).await?))
}

#[derive(Debug, Deserialize)]
struct AddItemRequest {
    product_id: Option<String>,
    /// Zero-based position in the latest search result; used when the
    /// identifier is not known.
    index: Option<usize>,
    #[serde(default = "one")]
    quantity: u32,
}

fn one() -> u32 {
    1
}

async fn add_to_cart(
    State(state): State<AppState>,
    Json(body): Json<AddItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let _gate = state.gate.lock().await;
    let item = match (body.product_id, body.index) {
        (Some(id), _) => ProductRef::Id(id),
        (None, Some(index)) => ProductRef::Index(index),
        (None, None) => {
            return Err(ApiError::from(OpError::Validation(
                "either product_id or index is required".to_owned(),
            )))
        }
    };
    Ok(Json(state.service.add_to_cart(&item, body.quantity).await?))
}

#[derive(Debug, Deserialize)]
struct RemoveItemRequest {
    product_id: String,
    #[serde(default = "one")]
    quantity: u32,
}

async fn remove_from_cart(
    State(state): State<AppState>,
    Json(body): Json<RemoveItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let _gate = state.gate.lock().await;
    Ok(Json(
        state
            .service
            .remove_from_cart(&body.product_id, body.quantity)
            .await?,
    ))
}

async fn get_cart(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let _gate = state.gate.lock().await;
    Ok(Json(state.service.get_cart().await?))
}

async fn clear_cart(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let _gate = state.gate.lock().await;
    Ok(Json(state.service.clear_cart().await?))
}

#[derive(Debug, Deserialize)]
struct LocationRequest {
    name: String,
}

async fn set_location(
    State(state): State<AppState>,
    Json(body): Json<LocationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let _gate = state.gate.lock().await;
    Ok(Json(state.service.set_location(&body.name).await?))
}

async fn get_addresses(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let _gate = state.gate.lock().await;
    Ok(Json(state.service.get_addresses().await?))
}

#[derive(Debug, Deserialize)]
struct AddAddressRequest {
    label: Option<String>,
    line1: String,
    line2: Option<String>,
    landmark: Option<String>,
    city: Option<String>,
    state: Option<String>,
    postal_code: Option<String>,
}

async fn add_address(
    State(state): State<AppState>,
    Json(body): Json<AddAddressRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let _gate = state.gate.lock().await;
    let address = Address {
        id: String::new(),
        label: body
            .label
            .as_deref()
            .map_or(AddressLabel::Unspecified, AddressLabel::from_raw),
        line1: body.line1,
        line2: body.line2,
        landmark: body.landmark,
        city: body.city,
        state: body.state,
        postal_code: body.postal_code,
        is_default: false,
    };
    Ok(Json(state.service.add_address(address).await?))
}

#[derive(Debug, Deserialize)]
struct SelectAddressRequest {
    index: usize,
}

async fn select_address(
    State(state): State<AppState>,
    Json(body): Json<SelectAddressRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let _gate = state.gate.lock().await;
    Ok(Json(state.service.select_address(body.index).await?))
}

async fn checkout(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let _gate = state.gate.lock().await;
    Ok(Json(state.service.checkout().await?))
}

async fn payment_methods(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let _gate = state.gate.lock().await;
    Ok(Json(state.service.payment_methods().await?))
}

#[derive(Debug, Deserialize)]
struct SelectPaymentRequest {
    method: String,
}

async fn select_payment(
    State(state): State<AppState>,
    Json(body): Json<SelectPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let _gate = state.gate.lock().await;
    let method = parse_method(&body.method)?;
    Ok(Json(state.service.select_payment_method(method).await?))
}

#[derive(Debug, Deserialize)]
struct PaymentDetailRequest {
    method: String,
    detail: String,
}

async fn payment_detail(
    State(state): State<AppState>,
    Json(body): Json<PaymentDetailRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let _gate = state.gate.lock().await;
    let method = parse_method(&body.method)?;
    Ok(Json(
        state
            .service
            .enter_payment_detail(method, &body.detail)
            .await?,
    ))
}

async fn confirm_payment(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let _gate = state.gate.lock().await;
    Ok(Json(state.service.confirm_payment().await?))
}

async fn order_status(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let _gate = state.gate.lock().await;
    Ok(Json(state.service.order_status(&order_id).await?))
}

fn parse_method(raw: &str) -> Result<PaymentMethod, ApiError> {
    PaymentMethod::from_code(raw).ok_or_else(|| {
        ApiError::from(OpError::Validation(format!(
            "unknown payment method: {raw}"
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_map_to_statuses() {
        let cases = [
            (OpError::Validation("bad".to_owned()), "validation_error"),
            (OpError::Auth("no".to_owned()), "unauthorized"),
            (
                OpError::RateLimited {
                    retry_after_secs: 30,
                },
                "rate_limited",
            ),
            (
                OpError::NotLocatable {
                    what: "milk".to_owned(),
                },
                "not_found",
            ),
            (
                OpError::Exhausted {
                    operation: "get_cart".to_owned(),
                    attempted: 4,
                    last_fault: None,
                },
                "upstream_exhausted",
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(ApiError::from_op(&error).code, expected);
        }
    }
}
