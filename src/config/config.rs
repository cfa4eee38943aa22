//! Application configuration and CLI argument parsing.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Speech server application configuration.
#[derive(Parser, Debug, Clone)]
#[command(name = "piper-speech-server")]
#[command(author, version, about = "An OpenAI-compatible speech endpoint backed by Piper", long_about = None)]
pub struct AppConfig {
    /// Address to bind the HTTP listener on
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port for the HTTP listener
    #[arg(long, short = 'p', env = "PORT", default_value = "5000")]
    pub port: u16,

    /// Directory where downloaded voice models are cached
    #[arg(long, short = 'd', env = "DATA_DIR", default_value = "/data")]
    pub data_dir: PathBuf,

    /// Base URL of the store voice models are fetched from
    #[arg(
        long,
        env = "VOICE_STORE_URL",
        default_value = "https://huggingface.co/rhasspy/piper-voices/resolve/v1.0.0"
    )]
    pub voice_store_url: String,

    /// Piper binary used for synthesis
    #[arg(long, env = "PIPER_BIN", default_value = "piper")]
    pub piper_bin: PathBuf,

    /// ffmpeg binary used for non-WAV output formats
    #[arg(long, env = "FFMPEG_BIN", default_value = "ffmpeg")]
    pub ffmpeg_bin: PathBuf,

    /// Maximum seconds one synthesis run may take before it is killed
    #[arg(long, env = "SYNTHESIS_TIMEOUT", default_value = "120")]
    pub synthesis_timeout: u64,

    /// Enable verbose logging
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl AppConfig {
    /// Parse configuration from command line arguments.
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Bounded wait for one engine run.
    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesis_timeout)
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.synthesis_timeout == 0 {
            anyhow::bail!("Synthesis timeout must be positive");
        }

        if !self.voice_store_url.starts_with("http://") && !self.voice_store_url.starts_with("https://") {
            anyhow::bail!("Voice store URL must be an http(s) URL: {}", self.voice_store_url);
        }

        if self.data_dir.exists() && !self.data_dir.is_dir() {
            anyhow::bail!("Data directory is not a directory: {}", self.data_dir.display());
        }

        Ok(())
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        info!("Configuration:");
        info!("  Listen address: {}", self.bind_addr());
        info!("  Voice cache: {}", self.data_dir.display());
        info!("  Voice store: {}", self.voice_store_url);
        info!("  Piper binary: {}", self.piper_bin.display());
        info!("  ffmpeg binary: {}", self.ffmpeg_bin.display());
        info!("  Synthesis timeout: {}s", self.synthesis_timeout);
    }
}
