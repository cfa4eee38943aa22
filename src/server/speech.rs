//! The speech endpoint: request schema and the request-to-audio pipeline.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tempfile::TempPath;
use tokio::io::{AsyncRead, ReadBuf};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::audio::{AudioFormat, Transcoder};
use crate::error::{Result, TtsError};
use crate::tts::{SpeechEngine, SynthesisParams};
use crate::voice::{VoiceCache, VoiceName};

/// Shared handles for the request pipeline.
///
/// Engine and transcoder sit behind trait objects so tests can run the whole
/// pipeline against stubs.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<VoiceCache>,
    pub engine: Arc<dyn SpeechEngine>,
    pub transcoder: Arc<dyn Transcoder>,
}

/// Text to synthesize: one string, or several joined with newlines.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TextInput {
    One(String),
    Many(Vec<String>),
}

impl TextInput {
    fn joined(&self) -> String {
        match self {
            TextInput::One(text) => text.clone(),
            TextInput::Many(lines) => lines.join("\n"),
        }
    }
}

fn default_speed() -> f32 {
    1.0
}

fn default_noise_scale() -> f32 {
    0.667
}

fn default_noise_scale_w() -> f32 {
    0.8
}

/// Body of `POST /v1/audio/speech`, OpenAI-style.
#[derive(Debug, Deserialize)]
pub struct SynthesisRequest {
    /// Voice identifier. `voice` wins when both fields are present.
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    voice: Option<String>,

    input: TextInput,

    /// Output format; `response_format` is accepted as an alias.
    #[serde(default, alias = "response_format")]
    format: Option<String>,

    /// Speech speed multiplier. The effective length scale is its inverse.
    #[serde(default = "default_speed")]
    speed: f32,

    #[serde(default = "default_noise_scale")]
    noise_scale: f32,

    #[serde(default = "default_noise_scale_w")]
    noise_scale_w: f32,

    /// Direct length scale. Wins over `speed` when present.
    #[serde(default)]
    length_scale: Option<f32>,

    /// Speaker index for multi-speaker voices.
    #[serde(default)]
    speaker: Option<u32>,
}

impl SynthesisRequest {
    /// The requested voice identifier, not yet validated.
    fn voice_id(&self) -> Result<&str> {
        self.voice
            .as_deref()
            .or(self.model.as_deref())
            .ok_or_else(|| TtsError::InvalidRequest("either `voice` or `model` must name a voice".to_string()))
    }

    /// The text to synthesize.
    fn text(&self) -> Result<String> {
        let text = self.input.joined();
        if text.trim().is_empty() {
            return Err(TtsError::InvalidRequest("`input` text must not be empty.".to_string()));
        }
        Ok(text)
    }

    /// The requested output format, `wav` when unspecified.
    fn output_format(&self) -> Result<AudioFormat> {
        match self.format.as_deref() {
            Some(name) => AudioFormat::parse(name),
            None => Ok(AudioFormat::Wav),
        }
    }

    /// Resolve the engine parameters. Exactly one length scale applies per
    /// request: the explicit override, else `1 / max(0.1, speed)`.
    fn params(&self) -> SynthesisParams {
        let length_scale = self.length_scale.unwrap_or_else(|| 1.0 / self.speed.max(0.1));
        SynthesisParams {
            length_scale,
            noise_scale: self.noise_scale,
            noise_scale_w: self.noise_scale_w,
            speaker: self.speaker,
        }
    }
}

/// Handle `POST /v1/audio/speech`: validate, resolve the voice, synthesize,
/// optionally transcode, stream the audio back.
///
/// Every artifact is a `TempPath`, removed on drop. That one mechanism covers
/// cleanup after a fully sent response, an error at any stage, and a client
/// that disconnects mid-stream.
pub async fn synthesize_speech(
    State(state): State<AppState>,
    Json(request): Json<SynthesisRequest>,
) -> Result<Response> {
    let voice = VoiceName::parse(request.voice_id()?)?;
    let text = request.text()?;
    let format = request.output_format()?;
    let params = request.params();

    debug!("Synthesis request: voice='{}', format={}, params={:?}", voice, format, params);

    let assets = state.cache.ensure(&voice).await?;

    let wav = new_artifact("wav")?;
    state.engine.synthesize(&assets, &text, params, &wav).await?;

    let artifact = if format.is_native() {
        wav
    } else {
        let converted = new_artifact(format.extension())?;
        state.transcoder.transcode(&wav, format, &converted).await?;
        // The intermediate WAV is not part of the response; remove it now.
        drop(wav);
        converted
    };

    info!("🔊 Streaming {} response for voice '{}'", format, voice);
    stream_artifact(artifact, format).await
}

/// Create an empty request-scoped artifact with the given extension.
fn new_artifact(extension: &str) -> Result<TempPath> {
    let file = tempfile::Builder::new().prefix("speech-").suffix(&format!(".{extension}")).tempfile()?;
    Ok(file.into_temp_path())
}

/// Reader that owns the artifact it streams. The file is removed when the
/// response body is dropped, fully sent or not.
struct ArtifactReader {
    file: tokio::fs::File,
    _artifact: TempPath,
}

impl AsyncRead for ArtifactReader {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().file).poll_read(cx, buf)
    }
}

/// Build the chunked streaming response around the final artifact.
async fn stream_artifact(artifact: TempPath, format: AudioFormat) -> Result<Response> {
    let file = tokio::fs::File::open(&artifact).await?;
    let reader = ArtifactReader { file, _artifact: artifact };
    let body = Body::from_stream(ReaderStream::new(reader));
    Ok(([(header::CONTENT_TYPE, format.media_type())], body).into_response())
}
