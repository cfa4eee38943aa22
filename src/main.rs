//! Piper Speech Server - an OpenAI-compatible text-to-speech endpoint.
//!
//! Exposes `POST /v1/audio/speech` in front of the Piper synthesis engine,
//! downloading voice models on demand from the voice store and streaming
//! the synthesized audio back.

mod audio;
mod config;
mod error;
mod server;
mod tts;
mod voice;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::LocalTime;

use audio::FfmpegTranscoder;
use config::AppConfig;
use server::AppState;
use tts::PiperEngine;
use voice::VoiceCache;

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("🛑 Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
                    .expect("Failed to register SIGTERM handler");
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("🛑 Received SIGTERM, shutting down...");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let config = AppConfig::from_args();

    // Respect RUST_LOG env var, fallback to verbose flag, default to info
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| if config.verbose { EnvFilter::try_new("debug") } else { EnvFilter::try_new("info") })
        .unwrap();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(LocalTime::new(time::macros::format_description!("[hour]:[minute]:[second]")))
        .init();

    info!("🗣️  Piper Speech Server v{}", env!("CARGO_PKG_VERSION"));

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("❌ Configuration error: {}", e);
        std::process::exit(1);
    }
    config.log_config();

    let state = AppState {
        cache: Arc::new(VoiceCache::new(config.data_dir.clone(), config.voice_store_url.clone())),
        engine: Arc::new(PiperEngine::new(config.piper_bin.clone(), config.engine_timeout())),
        transcoder: Arc::new(FfmpegTranscoder::new(config.ffmpeg_bin.clone())),
    };

    let app = server::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr()))?;
    info!("🚀 Listening on {}", config.bind_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("✅ Speech server stopped");
    Ok(())
}
