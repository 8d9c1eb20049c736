//! Thin HTTP layer under the endpoint transport.
//!
//! Owns the reqwest client, the bearer token, a hand-rolled cookie jar
//! (the storefront's session cookies matter more than RFC conformance),
//! and the inter-request pacing that keeps the bot from looking like a
//! flood.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tokio::time::Instant;

use kirana_core::app_config::AppConfig;
use kirana_engine::action::{HttpCall, HttpMethod};
use kirana_engine::transport::TransportFault;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("building http client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    request_timeout_secs: u64,
    inter_request_delay: Duration,
    last_request: tokio::sync::Mutex<Option<Instant>>,
    bearer: Mutex<Option<String>>,
    cookies: Mutex<HashMap<String, String>>,
}

impl HttpClient {
    /// # Errors
    ///
    /// Returns [`ApiError::ClientBuild`] when the TLS backend cannot be
    /// initialized.
    pub fn new(config: &AppConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(ApiError::ClientBuild)?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            request_timeout_secs: config.request_timeout_secs,
            inter_request_delay: Duration::from_millis(config.inter_request_delay_ms),
            last_request: tokio::sync::Mutex::new(None),
            bearer: Mutex::new(None),
            cookies: Mutex::new(HashMap::new()),
        })
    }

    /// Point the client at a different origin. Test hook.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_owned();
        self
    }

    pub fn set_bearer(&self, token: Option<String>) {
        *lock(&self.bearer) = token;
    }

    pub fn set_cookies(&self, cookies: HashMap<String, String>) {
        *lock(&self.cookies) = cookies;
    }

    #[must_use]
    pub fn cookies(&self) -> HashMap<String, String> {
        lock(&self.cookies).clone()
    }

    #[must_use]
    pub fn has_bearer(&self) -> bool {
        lock(&self.bearer).is_some()
    }

    /// Issue one call and return the parsed body.
    ///
    /// Body parsing is deliberately forgiving: the storefront answers
    /// refusals with 4xx/5xx *and* a JSON body worth classifying, so any
    /// parseable body is returned as-is and only auth/throttle statuses
    /// become faults. A non-JSON body becomes an error object so the
    /// classifier moves on to the next candidate.
    ///
    /// # Errors
    ///
    /// [`TransportFault::Timeout`] and [`TransportFault::Network`] for
    /// request-level failures; [`TransportFault::AuthRejected`] on
    /// 401/403; [`TransportFault::RateLimited`] on 429.
    pub async fn execute(&self, call: &HttpCall) -> Result<Value, TransportFault> {
        self.pace().await;

        let url = format!(
            "{}/{}",
            self.base_url,
            call.path.trim_start_matches('/')
        );
        let mut request = match call.method {
            HttpMethod::Get => self.http.get(&url),
            HttpMethod::Post => self.http.post(&url),
            HttpMethod::Delete => self.http.delete(&url),
        };
        if !call.query.is_empty() {
            request = request.query(&call.query);
        }
        if let Some(payload) = &call.payload {
            request = request.json(payload);
        }
        if call.requires_auth {
            if let Some(token) = lock(&self.bearer).clone() {
                request = request.bearer_auth(token);
            }
        }
        let cookie_header = self.cookie_header();
        if !cookie_header.is_empty() {
            request = request.header(reqwest::header::COOKIE, cookie_header);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportFault::Timeout {
                    what: format!("{} {}", call.method.as_str(), call.path),
                    seconds: self.request_timeout_secs,
                }
            } else {
                TransportFault::Network(e.to_string())
            }
        })?;

        self.capture_cookies(&response);

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(TransportFault::AuthRejected);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            return Err(TransportFault::RateLimited { retry_after_secs });
        }

        let body = response
            .text()
            .await
            .map_err(|e| TransportFault::Network(e.to_string()))?;
        match serde_json::from_str(&body) {
            Ok(value) => Ok(value),
            Err(_) => {
                tracing::debug!(
                    path = %call.path,
                    status = status.as_u16(),
                    "non-JSON body, handing the classifier an error object"
                );
                Ok(serde_json::json!({
                    "error": format!("non-JSON response with status {}", status.as_u16())
                }))
            }
        }
    }

    /// Respect the configured gap between consecutive requests.
    async fn pace(&self) {
        if self.inter_request_delay.is_zero() {
            return;
        }
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.inter_request_delay {
                tokio::time::sleep(self.inter_request_delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    fn cookie_header(&self) -> String {
        lock(&self.cookies)
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn capture_cookies(&self, response: &reqwest::Response) {
        let mut jar = lock(&self.cookies);
        for header in response.headers().get_all(reqwest::header::SET_COOKIE) {
            let Ok(raw) = header.to_str() else { continue };
            let Some(pair) = raw.split(';').next() else {
                continue;
            };
            if let Some((name, value)) = pair.split_once('=') {
                jar.insert(name.trim().to_owned(), value.trim().to_owned());
            }
        }
    }

}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
