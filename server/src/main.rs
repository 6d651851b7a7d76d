mod app;
mod config;
mod routes;
mod services;
mod state;
mod view_state;

use std::sync::Arc;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use crate::services::catalog_loader::load_catalog;
use crate::services::view_driver;
use crate::services::weather_provider::{OpenWeatherMapProvider, build_http_client};
use crate::state::AppState;
use crate::view_state::ViewState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let api_key = match config::provider_api_key() {
        Ok(key) => key,
        Err(e) => {
            tracing::error!(error = %e, "cannot start cyclops-server");
            return;
        }
    };

    let catalog_path = config::catalog_path();
    let catalog = match load_catalog(catalog_path.as_deref()).await {
        Ok(catalog) => Arc::new(catalog),
        Err(e) => {
            tracing::error!(error = %e, "failed to load region catalog");
            return;
        }
    };

    let initial_region =
        config::initial_region().unwrap_or_else(|| catalog.default_region().to_string());
    let view = match ViewState::for_region(&catalog, &initial_region) {
        Ok(view) => view,
        Err(e) => {
            tracing::error!(error = %e, "invalid initial region");
            return;
        }
    };

    let client = match build_http_client() {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "failed to build HTTP client");
            return;
        }
    };
    let provider = OpenWeatherMapProvider::new(client, config::provider_url(), api_key);

    let scale = config::temperature_scale();
    let (state, commands) = AppState::new(catalog, scale);
    let refresh_interval = config::refresh_interval();
    tracing::info!(
        region = %view.active_region(),
        cities = view.len(),
        refresh_secs = refresh_interval.as_secs(),
        scale_low = scale.low,
        scale_high = scale.high,
        "starting view driver"
    );
    tokio::spawn(view_driver::run(
        state.clone(),
        provider,
        commands,
        view,
        refresh_interval,
    ));

    let app = app::build_app(state.clone());

    let addr = format!("0.0.0.0:{}", config::server_port());
    tracing::info!("Cyclops weather dashboard listening on {addr}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind TCP listener");
            return;
        }
    };
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
    {
        tracing::error!(error = %e, "server failed");
    }

    tracing::info!("Server shut down gracefully");
}

/// Waits for Ctrl+C or SIGTERM, then tells the view driver and SSE streams to finish.
async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    state.begin_shutdown();
}
