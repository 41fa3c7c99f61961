use anyhow::Context;
use astrology_server::api::{build_routes, common};
use astrology_server::config::Config;
use astrology_server::scheduler::start_scheduler;
use astrology_server::state::AppState;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid configuration")?;

    let port = config.port;
    let static_dir = config.static_dir.clone();

    let state = AppState::new(config)
        .await
        .context("Failed to open database")?;
    let app_state = Arc::new(state);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = start_scheduler(app_state.clone(), shutdown_rx);

    let app = build_routes(app_state.clone())
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn(common::request_logger));

    // Serve the SPA bundle when one is provided
    let app = if let Some(static_dir) = &static_dir {
        let index_path = static_dir.join("index.html");
        if static_dir.exists() && index_path.exists() {
            tracing::info!("Serving static files from {:?}", static_dir);
            let serve_dir =
                ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_path));
            app.fallback_service(serve_dir)
        } else {
            tracing::warn!("Static directory {:?} or index.html not found", static_dir);
            app
        }
    } else {
        app
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = scheduler.await {
        tracing::warn!("Scheduler task ended abnormally: {}", e);
    }
    app_state.db_pool.close().await;
    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
