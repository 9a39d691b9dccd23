//! Settings file parser for ~/.config/skiff/settings.toml.
//!
//! The settings file is optional: a missing file yields `Settings::default()`.
//! Unknown keys are accepted by serde but logged as warnings so typos surface
//! in the debug log.
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in settings file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Settings file exceeds the maximum allowed size.
    #[error("Settings file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Settings
// ============================================================================

/// User settings.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// The custom Debug impl masks `reader_api_key`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// How long transient bottom-bar messages stay visible, in seconds.
    pub status_timeout_secs: u64,

    /// Cap on simultaneous fetches during "reload all". 0 = one task per feed.
    pub max_concurrent_fetches: usize,

    /// Text-mode browser used by the `l` command.
    pub pager: String,

    /// Base URL of the reader service used to extract article text.
    pub reader_base_url: Option<String>,

    /// Reader service API key (alternative to the JINA_API_KEY env var).
    /// Env var takes precedence over the settings file.
    pub reader_api_key: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            status_timeout_secs: 3,
            max_concurrent_fetches: 0,
            pager: "lynx".to_string(),
            reader_base_url: None,
            reader_api_key: None,
        }
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("status_timeout_secs", &self.status_timeout_secs)
            .field("max_concurrent_fetches", &self.max_concurrent_fetches)
            .field("pager", &self.pager)
            .field("reader_base_url", &self.reader_base_url)
            .field(
                "reader_api_key",
                &self.reader_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Settings {
    /// Maximum settings file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 5] = [
        "status_timeout_secs",
        "max_concurrent_fetches",
        "pager",
        "reader_base_url",
        "reader_api_key",
    ];

    /// Load settings from a TOML file.
    ///
    /// - Missing file → `Ok(Settings::default())`
    /// - Empty file → `Ok(Settings::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Settings file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No settings file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Settings file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Settings file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in settings file, ignoring");
                }
            }
        }

        let settings: Settings = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs.max(1))
    }

    /// API key for the reader service: `JINA_API_KEY` wins over the file.
    pub fn resolved_api_key(&self) -> Option<String> {
        std::env::var("JINA_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.reader_api_key.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================
