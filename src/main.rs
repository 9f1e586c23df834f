// Entry point for the sign detection and translation backend

use sign_bridge::{create_app, AppState, Config, ModelRegistry, TranslationBridge};

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::new().context("Failed to load configuration")?;

    use tracing_subscriber::EnvFilter;

    let level = match config.log_level() {
        tracing::Level::TRACE => "trace",
        tracing::Level::DEBUG => "debug",
        tracing::Level::INFO => "info",
        tracing::Level::WARN => "warn",
        tracing::Level::ERROR => "error",
    };
    let filter = EnvFilter::new(format!("sign_bridge={level},ort=off,tower_http={level}"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("=== SIGN BRIDGE BACKEND ===");
    info!(
        "Config: backend={:?} pool={} target={} iou={}",
        config.detection.inference_backend,
        config.detection.pool_size,
        config.detection.target_size,
        config.detection.iou_threshold
    );

    // Both models load before the listener binds; any failure ends the process
    let detection = config.detection.clone();
    let registry = tokio::task::spawn_blocking(move || ModelRegistry::load(&detection))
        .await
        .context("Model loading task panicked")?
        .context("Failed to load detection models")?;

    let bridge = TranslationBridge::from_config(&config.providers)?;

    let state = AppState {
        registry: Arc::new(registry),
        bridge: Arc::new(bridge),
        max_upload_bytes: config.server.max_upload_bytes,
    };

    let app = create_app(state);

    let addr = format!("{}:{}", config.server_host(), config.server_port());
    info!("{}", "=".repeat(60));
    info!("Server starting on http://{}", addr);
    info!("{}", "-".repeat(60));
    info!("Endpoints:");
    info!("  GET     /           - Liveness check");
    info!("  POST    /detect     - Sign detection (multipart: frame, modelType)");
    info!("  POST    /translate  - Translation with speech (JSON: text, language)");
    info!("  OPTIONS /translate  - CORS pre-flight");
    info!("{}", "=".repeat(60));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
