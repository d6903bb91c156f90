//! Tax Document Server
//!
//! Upload W-2 and 1099-NEC forms, chat with a tax intake advisor about them
//! and export the extracted data.

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taxdoc_server::config::Config;
use taxdoc_server::prompts::Prompts;
use taxdoc_server::routes;
use taxdoc_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taxdoc_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    if config.model.api_key.is_empty() {
        tracing::warn!("OPENAI_API_KEY is not set; model calls will be rejected upstream");
    }

    tracing::info!("Starting Tax Document Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Model endpoint: {}", config.model.base_url);
    tracing::info!(
        "Models: chat={}, extraction={}, search={}",
        config.model.chat_model,
        config.model.extraction_model,
        config.model.search_model
    );
    if !cfg!(feature = "pdf-render") {
        tracing::warn!("Built without the pdf-render feature; PDF uploads will be rejected");
    }

    let prompts = Prompts::load(&config.prompts).context("Failed to load prompts")?;

    let addr = config.bind_address();
    let app_state =
        AppState::new(config, prompts).context("Failed to initialize application state")?;
    let app = routes::app(app_state);

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Tax Document Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
