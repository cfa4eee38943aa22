//! On-disk voice asset cache with lazy downloads from the voice store.

use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{Result, TtsError};
use crate::voice::VoiceName;

/// The two local files backing one voice: the binary model and its metadata.
///
/// Presence of both files on disk is the cache's source of truth; there is no
/// manifest. Assets persist until an operator removes them.
#[derive(Debug, Clone)]
pub struct VoiceAssets {
    pub model: PathBuf,
    pub config: PathBuf,
}

/// Maps validated voice names to local assets, fetching missing files from
/// the remote store.
///
/// Writes are atomic (unique temp file + rename), so a concurrent reader
/// never observes a partial asset and concurrent downloads of the same voice
/// are benign: both produce identical bytes and the last rename wins.
pub struct VoiceCache {
    root: PathBuf,
    base_url: String,
    client: reqwest::Client,
}

impl VoiceCache {
    /// Create a cache rooted at `root`, fetching from `base_url` on miss.
    pub fn new(root: PathBuf, base_url: String) -> Self {
        Self { root, base_url: base_url.trim_end_matches('/').to_string(), client: reqwest::Client::new() }
    }

    /// Ensure both assets for `voice` exist locally and return their paths.
    ///
    /// A full cache hit performs no network traffic. On a miss only the
    /// missing file(s) are fetched; if any fetch fails, files fetched during
    /// this call are removed again so the pair never changes halfway.
    ///
    /// # Errors
    /// `VoiceNotFound` if the store answers 404, `VoiceFetchFailed` for any
    /// other transport or write failure.
    pub async fn ensure(&self, voice: &VoiceName) -> Result<VoiceAssets> {
        let assets = self.local_paths(voice);
        let model_missing = !assets.model.exists();
        let config_missing = !assets.config.exists();

        if !model_missing && !config_missing {
            debug!("Voice '{}' served from cache", voice);
            return Ok(assets);
        }

        info!("Voice '{}' not found locally. Downloading...", voice);
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| TtsError::VoiceFetchFailed { voice: voice.to_string(), reason: e.to_string() })?;

        let targets = [(model_missing, ".model", &assets.model), (config_missing, ".model.json", &assets.config)];

        let mut fetched: Vec<&Path> = Vec::new();
        for (missing, ext, dest) in targets {
            if !missing {
                continue;
            }
            let url = format!("{}/{}{}", self.base_url, voice.store_path(), ext);
            if let Err(e) = self.fetch_asset(voice, &url, dest).await {
                for path in fetched {
                    let _ = tokio::fs::remove_file(path).await;
                }
                return Err(e);
            }
            fetched.push(dest);
        }

        Ok(assets)
    }

    fn local_paths(&self, voice: &VoiceName) -> VoiceAssets {
        VoiceAssets { model: self.root.join(voice.model_file()), config: self.root.join(voice.config_file()) }
    }

    /// Download one asset to `dest`. Transport and local write failures both
    /// surface as `VoiceFetchFailed`; only a store 404 is `VoiceNotFound`.
    async fn fetch_asset(&self, voice: &VoiceName, url: &str, dest: &Path) -> Result<()> {
        info!("Downloading: {}", url);

        let fetch_failed =
            |reason: String| TtsError::VoiceFetchFailed { voice: voice.to_string(), reason };

        let response = self.client.get(url).send().await.map_err(|e| fetch_failed(e.to_string()))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(TtsError::VoiceNotFound(voice.to_string()));
        }
        let response = response.error_for_status().map_err(|e| fetch_failed(e.to_string()))?;

        self.write_asset(response, dest).await.map_err(|e| fetch_failed(e.to_string()))?;
        debug!("Cached {}", dest.display());
        Ok(())
    }

    /// Stream a response body into `dest` via a unique temp file and atomic
    /// rename.
    async fn write_asset(&self, mut response: reqwest::Response, dest: &Path) -> std::io::Result<()> {
        // The temp file is removed on drop, so an interrupted download
        // leaves nothing behind.
        let tmp = NamedTempFile::new_in(&self.root)?;
        let mut file = tokio::fs::File::from_std(tmp.reopen()?);
        while let Some(chunk) = response.chunk().await.map_err(std::io::Error::other)? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        tmp.persist(dest).map_err(|e| e.error)?;
        Ok(())
    }
}
