//! External speech synthesis engine boundary.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, TtsError};
use crate::voice::VoiceAssets;

/// Acoustic parameters for one synthesis run, fully resolved.
///
/// `length_scale` is the effective value: an explicit request override, or
/// the inverse of the requested speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthesisParams {
    pub length_scale: f32,
    pub noise_scale: f32,
    pub noise_scale_w: f32,
    pub speaker: Option<u32>,
}

/// Abstraction over the synthesis engine, so the pipeline runs against a
/// stub in tests without a real engine installed.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Synthesize `text` with the given voice assets into a WAV file at
    /// `out_wav`.
    ///
    /// # Errors
    /// `SynthesisEngine` on abnormal exit or a missing output artifact,
    /// `SynthesisTimeout` if the run exceeds the engine's bounded wait.
    async fn synthesize(
        &self,
        assets: &VoiceAssets,
        text: &str,
        params: SynthesisParams,
        out_wav: &Path,
    ) -> Result<()>;
}

/// Drives the Piper CLI as a child process.
///
/// Text goes in on stdin, audio comes out as a WAV file at the requested
/// path. The child is killed if dropped mid-run, so an abandoned request
/// never leaves a stray engine process behind.
pub struct PiperEngine {
    binary: PathBuf,
    timeout: Duration,
}

impl PiperEngine {
    /// Create an engine around the given Piper binary with a per-run wait
    /// bound.
    pub fn new(binary: PathBuf, timeout: Duration) -> Self {
        Self { binary, timeout }
    }
}

/// Build the Piper CLI argument list for one run.
fn engine_args(assets: &VoiceAssets, params: SynthesisParams, out_wav: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--model".into(),
        assets.model.as_os_str().to_os_string(),
        "--output_file".into(),
        out_wav.as_os_str().to_os_string(),
        "--length-scale".into(),
        params.length_scale.to_string().into(),
        "--noise-scale".into(),
        params.noise_scale.to_string().into(),
        "--noise-w".into(),
        params.noise_scale_w.to_string().into(),
    ];
    if let Some(speaker) = params.speaker {
        args.push("--speaker".into());
        args.push(speaker.to_string().into());
    }
    args
}

#[async_trait]
impl SpeechEngine for PiperEngine {
    async fn synthesize(
        &self,
        assets: &VoiceAssets,
        text: &str,
        params: SynthesisParams,
        out_wav: &Path,
    ) -> Result<()> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(engine_args(assets, params, out_wav))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Running synthesis engine: {:?}", cmd);

        let mut child = cmd
            .spawn()
            .map_err(|e| TtsError::SynthesisEngine(format!("failed to spawn '{}': {}", self.binary.display(), e)))?;

        // Feeding stdin counts against the bounded wait: an engine that
        // stalls without draining its pipe still times out.
        let run = async {
            if let Some(mut stdin) = child.stdin.take() {
                // The engine may exit before draining stdin; its stderr is
                // the better diagnostic than a broken pipe here.
                let _ = stdin.write_all(text.as_bytes()).await;
                let _ = stdin.shutdown().await;
            }
            child.wait_with_output().await
        };

        // kill_on_drop reaps the child if the timeout wins the race.
        let output = match tokio::time::timeout(self.timeout, run).await {
            Ok(result) => result.map_err(|e| TtsError::SynthesisEngine(e.to_string()))?,
            Err(_) => return Err(TtsError::SynthesisTimeout(self.timeout.as_secs())),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(TtsError::SynthesisEngine(if stderr.is_empty() {
                format!("engine exited with {}", output.status)
            } else {
                stderr
            }));
        }

        if !out_wav.exists() {
            return Err(TtsError::SynthesisEngine("engine produced no output artifact".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn dummy_assets(dir: &Path) -> VoiceAssets {
        VoiceAssets { model: dir.join("en_US-amy-low.model"), config: dir.join("en_US-amy-low.model.json") }
    }

    fn default_params() -> SynthesisParams {
        SynthesisParams { length_scale: 1.0, noise_scale: 0.667, noise_scale_w: 0.8, speaker: None }
    }

    #[cfg(unix)]
    fn write_script(path: &Path, body: &str) {
        use std::os::unix::fs::PermissionsExt;
        std::fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms).unwrap();
    }

    #[test]
    fn test_engine_args_order_and_flags() {
        let dir = std::env::temp_dir();
        let assets = dummy_assets(&dir);
        let out = dir.join("out.wav");

        let params = SynthesisParams { length_scale: 0.5, ..default_params() };
        let args = engine_args(&assets, params, &out);

        assert_eq!(args[0], OsString::from("--model"));
        assert_eq!(args[1], assets.model.clone().into_os_string());
        assert_eq!(args[2], OsString::from("--output_file"));
        assert_eq!(args[4], OsString::from("--length-scale"));
        assert_eq!(args[5], OsString::from("0.5"));
        assert!(!args.contains(&OsString::from("--speaker")));
    }

    #[test]
    fn test_engine_args_include_speaker_when_set() {
        let dir = std::env::temp_dir();
        let assets = dummy_assets(&dir);
        let out = dir.join("out.wav");

        let params = SynthesisParams { speaker: Some(3), ..default_params() };
        let args = engine_args(&assets, params, &out);

        let flag = OsString::from("--speaker");
        let pos = args.iter().position(|a| *a == flag).unwrap();
        assert_eq!(args[pos + 1], OsString::from("3"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_engine_error() {
        let dir = tempdir().unwrap();
        let engine = PiperEngine::new(PathBuf::from("/nonexistent/piper-bin"), Duration::from_secs(5));

        let err = engine
            .synthesize(&dummy_assets(dir.path()), "hello", default_params(), &dir.path().join("out.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, TtsError::SynthesisEngine(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_run_writes_artifact() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("fake-engine");
        // $4 is the --output_file value in the argument list.
        write_script(&script, "cat >/dev/null\nprintf RIFF > \"$4\"");

        let engine = PiperEngine::new(script, Duration::from_secs(5));
        let out_wav = dir.path().join("out.wav");
        engine.synthesize(&dummy_assets(dir.path()), "hello", default_params(), &out_wav).await.unwrap();

        assert_eq!(std::fs::read(&out_wav).unwrap(), b"RIFF");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_surfaces_stderr() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("fake-engine");
        write_script(&script, "cat >/dev/null\necho 'phonemizer blew up' >&2\nexit 3");

        let engine = PiperEngine::new(script, Duration::from_secs(5));
        let err = engine
            .synthesize(&dummy_assets(dir.path()), "hello", default_params(), &dir.path().join("out.wav"))
            .await
            .unwrap_err();

        match err {
            TtsError::SynthesisEngine(detail) => assert!(detail.contains("phonemizer blew up")),
            other => panic!("expected engine error, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_engine_times_out() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("slow-engine");
        write_script(&script, "cat >/dev/null\nsleep 5");

        let engine = PiperEngine::new(script, Duration::from_millis(100));
        let err = engine
            .synthesize(&dummy_assets(dir.path()), "hello", default_params(), &dir.path().join("out.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, TtsError::SynthesisTimeout(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_engine_that_never_reads_stdin_times_out() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("deaf-engine");
        // Never reads stdin, so an input larger than the pipe buffer backs
        // up the write.
        write_script(&script, "sleep 5");

        let engine = PiperEngine::new(script, Duration::from_millis(100));
        let text = "a".repeat(1 << 20);
        let err = engine
            .synthesize(&dummy_assets(dir.path()), &text, default_params(), &dir.path().join("out.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, TtsError::SynthesisTimeout(_)));
    }
}
