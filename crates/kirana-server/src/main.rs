mod api;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use kirana_api::HttpTransport;
use kirana_engine::OrderService;

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = kirana_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let transport = HttpTransport::new(&config)?;
    let service = Arc::new(OrderService::new(transport, &config));
    let app = build_app(AppState::new(service));

    tracing::info!(addr = %config.bind_addr, origin = %config.base_url, "starting server");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Resolves on ctrl-c or SIGTERM, whichever lands first.
async fn shutdown_signal() {
    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("sigterm handler installs");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.expect("ctrl-c handler installs");
        }
        () = sigterm => {}
    }

    tracing::info!("shutdown signal caught, draining in-flight requests");
}
