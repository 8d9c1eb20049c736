use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    /// Storefront origin. The target site changes endpoints without notice,
    /// so this stays configurable rather than baked in.
    pub base_url: String,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub user_agent: String,
    /// Where the authenticated session record is persisted.
    pub session_path: PathBuf,
    pub country_code: String,
    pub request_timeout_secs: u64,
    /// Upper bound on any single condition wait (element render, response
    /// settle). Unbounded waits are a defect.
    pub wait_timeout_secs: u64,
    pub inter_request_delay_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    /// Probe ip-api.com once at startup and attach the coordinates to
    /// search calls. Off for offline runs.
    pub geo_lookup: bool,
    /// Per-item quantity cap assumed when the source reports none.
    pub default_max_per_item: u32,
}
