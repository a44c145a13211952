//! Entry point for the elibrary-server binary.

use std::sync::Arc;
use std::time::Duration;

use axum::middleware;
use elibrary_server::{
    bootstrap,
    config::{LogFormat, ServerConfig, StorageBackend},
    middleware::request_id::{RequestSpan, propagate_request_id, request_id_layer},
    routes,
    state::AppState,
};
use elibrary_store::{LibraryRepository, MemoryStore, Store, StoreConfig};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// How often idle notification channels are dropped.
const CHANNEL_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = ServerConfig::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level, config.log_format);

    tracing::info!("Starting elibrary-server");
    tracing::info!(
        port = config.port,
        log_level = %config.log_level,
        storage = ?config.storage,
        max_active_borrows = config.lending.max_active_borrows,
        loan_days = config.lending.loan_days,
        max_renewals = config.lending.max_renewals,
        "Configuration loaded"
    );

    // Open storage
    let repo: Arc<dyn LibraryRepository> = match config.storage {
        StorageBackend::Postgres => {
            let store = Store::connect(StoreConfig::from_env()?).await?;
            tracing::info!("Connected to database");
            Arc::new(store)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
    };

    // Build application state
    let state = AppState::new(repo, config.clone());
    bootstrap::run(&state).await?;
    spawn_channel_cleanup(&state);

    // Build CORS layer
    let cors = build_cors_layer(&config.cors_allowed_origins)?;

    // Build router with middleware
    let app = routes::build_router(state)
        .layer(middleware::from_fn(propagate_request_id))
        .layer(TraceLayer::new_for_http().make_span_with(RequestSpan))
        .layer(request_id_layer())
        .layer(cors);

    // Create listener
    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initialize the tracing subscriber.
fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Build CORS layer from configuration.
fn build_cors_layer(allowed_origins: &str) -> Result<CorsLayer, http::header::InvalidHeaderValue> {
    if allowed_origins == "*" {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any));
    }

    // Parse comma-separated origins
    let origins = allowed_origins
        .split(',')
        .map(|s| s.trim().parse())
        .collect::<Result<Vec<http::HeaderValue>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any))
}

/// Periodically drop notification channels whose subscribers disconnected.
fn spawn_channel_cleanup(state: &AppState) {
    let broadcaster = state.broadcaster().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CHANNEL_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = broadcaster.cleanup_empty_channels().await;
            if removed > 0 {
                tracing::debug!(removed, "Cleaned up notification channels");
            }
        }
    });
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
