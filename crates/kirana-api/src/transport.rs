//! [`Transport`] implementation over the private endpoint surface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use kirana_core::app_config::AppConfig;
use kirana_engine::action::{Action, RawResult};
use kirana_engine::operation::Operation;
use kirana_engine::session::SessionStore;
use kirana_engine::transport::{Transport, TransportFault};

use crate::client::{ApiError, HttpClient};
use crate::endpoints;
use crate::geo::{self, GeoLocation};

pub struct HttpTransport {
    client: HttpClient,
    sessions: SessionStore,
    geo_lookup: bool,
    /// Coordinates from the one-shot IP probe, when it succeeded.
    location: Mutex<Option<GeoLocation>>,
    geo_probed: AtomicBool,
}

impl HttpTransport {
    /// # Errors
    ///
    /// Returns [`ApiError`] when the underlying HTTP client cannot be
    /// built.
    pub fn new(config: &AppConfig) -> Result<Self, ApiError> {
        Ok(Self {
            client: HttpClient::new(config)?,
            sessions: SessionStore::new(&config.session_path),
            geo_lookup: config.geo_lookup,
            location: Mutex::new(None),
            geo_probed: AtomicBool::new(false),
        })
    }

    /// Point the transport at a different origin. Test hook.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.client = self.client.with_base_url(base_url);
        self
    }

    #[must_use]
    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    fn coordinates(&self) -> Option<(f64, f64)> {
        self.location
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .as_ref()
            .map(|loc| (loc.latitude, loc.longitude))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    /// Refresh the bearer token and cookie jar from the persisted
    /// session, and run the one-shot location probe. An absent session is
    /// fine — unauthenticated operations (OTP request/verify, search)
    /// still work; authenticated ones will surface the storefront's
    /// rejection.
    async fn ensure_started(&self) -> Result<(), TransportFault> {
        if self.geo_lookup && !self.geo_probed.swap(true, Ordering::SeqCst) {
            if let Some(found) = geo::detect_location().await {
                *self
                    .location
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(found);
            }
        }
        match self.sessions.load() {
            Ok(Some(record)) => {
                self.client.set_bearer(record.auth_token.clone());
                if !record.cookies.is_empty() {
                    self.client.set_cookies(record.cookies.clone());
                }
                Ok(())
            }
            Ok(None) => {
                self.client.set_bearer(None);
                Ok(())
            }
            Err(e) => Err(TransportFault::SessionLost(e.to_string())),
        }
    }

    fn candidates(&self, op: &Operation) -> Vec<Action> {
        let mut actions = endpoints::candidates(op);
        // Search relevance improves with coordinates, but they are
        // strictly optional.
        if matches!(op, Operation::Search { .. }) {
            if let Some((lat, lon)) = self.coordinates() {
                for action in &mut actions {
                    if let Action::Http(call) = action {
                        call.query.push(("lat".to_owned(), lat.to_string()));
                        call.query.push(("lon".to_owned(), lon.to_string()));
                    }
                }
            }
        }
        actions
    }

    async fn execute(&self, action: &Action) -> Result<RawResult, TransportFault> {
        match action {
            Action::Http(call) => Ok(RawResult::Json(self.client.execute(call).await?)),
            Action::Page(script) => Err(TransportFault::Network(format!(
                "endpoint transport cannot run page scripts ({} steps)",
                script.steps.len()
            ))),
        }
    }
}
