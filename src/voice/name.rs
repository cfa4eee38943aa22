//! Voice name validation and asset path derivation.

use std::fmt;

use crate::error::{Result, TtsError};

/// A validated voice identifier of the form `<lang>_<REGION>-<name>-<quality>`
/// (e.g. `en_US-amy-low`).
///
/// Parsing is the only way to obtain a `VoiceName`, and it runs before any
/// filesystem path or store URL is built. Separators, traversal sequences and
/// leading dots never survive `parse`, so every path derived from a
/// `VoiceName` stays inside the cache root and the store base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceName {
    id: String,
    language: String, // "en_US"
    name: String,     // "amy"
    quality: String,  // "low", "medium", "x_low", ...
}

impl VoiceName {
    /// Parse and validate a candidate voice name.
    ///
    /// # Errors
    /// Returns `InvalidVoiceName` if the candidate contains path separators,
    /// traversal sequences, a leading dot, or does not follow the
    /// `<lang>_<REGION>-<name>-<quality>` grammar.
    pub fn parse(candidate: &str) -> Result<Self> {
        let invalid = || TtsError::InvalidVoiceName(candidate.to_string());

        // Separator and traversal rejection comes first: nothing below may
        // run against a string that could escape the cache root.
        if candidate.is_empty()
            || candidate.contains('/')
            || candidate.contains('\\')
            || candidate.contains("..")
            || candidate.starts_with('.')
        {
            return Err(invalid());
        }

        let parts: Vec<&str> = candidate.split('-').collect();
        if parts.len() < 3 {
            return Err(invalid());
        }

        // Voice names beyond three segments keep the full id for file names;
        // the store layout is derived from the first three.
        let (language, name, quality) = (parts[0], parts[1], parts[2]);

        let (lang, region) = language.split_once('_').ok_or_else(|| invalid())?;
        if lang.is_empty() || region.is_empty() {
            return Err(invalid());
        }

        for part in &parts {
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(invalid());
            }
        }

        Ok(Self {
            id: candidate.to_string(),
            language: language.to_string(),
            name: name.to_string(),
            quality: quality.to_string(),
        })
    }

    /// File name of the binary model asset: `<id>.model`.
    pub fn model_file(&self) -> String {
        format!("{}.model", self.id)
    }

    /// File name of the model metadata asset: `<id>.model.json`.
    pub fn config_file(&self) -> String {
        format!("{}.model.json", self.id)
    }

    /// Relative path of this voice inside the remote store, without
    /// extension: `<lang>/<lang_REGION>/<name>/<quality>/<id>`.
    pub fn store_path(&self) -> String {
        let lang_short = self.language.split('_').next().unwrap_or(&self.language);
        format!("{}/{}/{}/{}/{}", lang_short, self.language, self.name, self.quality, self.id)
    }
}

impl fmt::Display for VoiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}
