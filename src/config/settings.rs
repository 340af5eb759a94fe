//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// VoiceConfig
// ---------------------------------------------------------------------------

/// Preferences fed into the default-voice selection policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Substring looked for in voice names first (e.g. `"Google"`).
    /// An empty string disables this step.
    pub preferred_provider: String,
    /// Substring looked for in voice language tags when no provider match
    /// exists (e.g. `"hi"`).  An empty string disables this step.
    pub preferred_language: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            preferred_provider: "Google".into(),
            preferred_language: "hi".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// PlaybackConfig
// ---------------------------------------------------------------------------

/// Initial playback parameters for a new session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Speaking rate multiplier, clamped to `0.5 ..= 2.0`.
    pub rate: f32,
    /// Pitch multiplier, clamped to `0.5 ..= 2.0`.
    pub pitch: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
        }
    }
}

// ---------------------------------------------------------------------------
// OcrConfig
// ---------------------------------------------------------------------------

/// Settings for the optical recognition engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Executable used for recognition.
    pub tesseract_path: String,
    /// Language hint passed to the engine (`-l`), e.g. `"eng+hin"`.
    pub language: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_path: "tesseract".into(),
            language: "eng+hin".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// SpeechConfig
// ---------------------------------------------------------------------------

/// Settings for the speech synthesis backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Executable used for synthesis and voice enumeration.
    pub espeak_path: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            espeak_path: "espeak-ng".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// StoreConfig
// ---------------------------------------------------------------------------

/// Client-side settings for the remote story store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base URL of the story store service, without a trailing slash.
    pub base_url: String,
    /// Maximum seconds to wait for a store response.
    pub timeout_secs: u64,
    /// Title used when a save command does not name one.
    pub default_title: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".into(),
            timeout_secs: 10,
            default_title: "My Story".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

/// Settings for the `story-store` service binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// TCP port the service binds on all interfaces.
    pub port: u16,
    /// Connection string: `"memory"` or a path to a JSON file.
    /// `None` means the `stories.json` file in the data directory.
    pub database: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            database: None,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use voice_reader::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default-voice selection preferences.
    pub voice: VoiceConfig,
    /// Initial rate / pitch.
    pub playback: PlaybackConfig,
    /// Recognition engine settings.
    pub ocr: OcrConfig,
    /// Speech backend settings.
    pub speech: SpeechConfig,
    /// Story store client settings.
    pub store: StoreConfig,
    /// Story store service settings.
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// so callers never need to special-case a missing file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Like [`AppConfig::load`], but writes the defaults out on first run so
    /// there is a `settings.toml` to edit.
    pub fn load_or_init() -> Result<Self> {
        Self::load_or_init_from(&AppPaths::new().settings_file)
    }

    /// Load from `path`, writing the defaults there when it does not exist.
    ///
    /// A failed write is logged and the defaults are still returned.
    pub fn load_or_init_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            return Self::load_from(path);
        }
        let config = Self::default();
        match config.save_to(path) {
            Ok(()) => log::info!("Wrote default settings to {}", path.display()),
            Err(e) => log::warn!("Could not write {}: {e}", path.display()),
        }
        Ok(config)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
