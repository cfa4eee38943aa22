//! Output format registry and audio transcoding.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{Result, TtsError};

/// Output formats the endpoint can produce.
///
/// `Wav` is what the engine emits natively; everything else goes through a
/// transcoder. Unknown names are rejected before any codec tool runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
}

impl AudioFormat {
    /// Parse a requested format name.
    ///
    /// # Errors
    /// `UnsupportedFormat` for anything outside the registry.
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "wav" => Ok(AudioFormat::Wav),
            "mp3" => Ok(AudioFormat::Mp3),
            _ => Err(TtsError::UnsupportedFormat(name.to_string())),
        }
    }

    /// MIME type sent in the response's Content-Type header.
    pub fn media_type(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Mp3 => "audio/mpeg",
        }
    }

    /// File extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
        }
    }

    /// Whether the engine emits this format directly, with no transcode step.
    pub fn is_native(&self) -> bool {
        matches!(self, AudioFormat::Wav)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Converts a native WAV artifact into another container/codec.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Transcode the WAV file at `input` into `format`, writing `output`.
    ///
    /// # Errors
    /// `UnsupportedFormat` if the codec tool is not available on this host,
    /// `SynthesisEngine` if the tool runs but fails.
    async fn transcode(&self, input: &Path, format: AudioFormat, output: &Path) -> Result<()>;
}

/// Shells out to ffmpeg for transcoding.
pub struct FfmpegTranscoder {
    binary: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, input: &Path, format: AudioFormat, output: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-y")
            .arg("-i")
            .arg(input)
            .arg("-f")
            .arg(format.extension())
            .arg(output)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        debug!("Running transcode: {:?}", cmd);

        let result = match cmd.output().await {
            Ok(result) => result,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Codec tool '{}' not found, cannot produce '{}'", self.binary.display(), format);
                return Err(TtsError::UnsupportedFormat(format.to_string()));
            }
            Err(e) => return Err(TtsError::Io(e)),
        };

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            return Err(TtsError::SynthesisEngine(format!("transcode to {format} failed: {stderr}")));
        }

        Ok(())
    }
}
