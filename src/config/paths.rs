//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\voice-reader\
//!   macOS:   ~/Library/Application Support/voice-reader/
//!   Linux:   ~/.config/voice-reader/
//!
//! Data dir (story store):
//!   Windows: %LOCALAPPDATA%\voice-reader\
//!   macOS:   ~/Library/Application Support/voice-reader/
//!   Linux:   ~/.local/share/voice-reader/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory for data owned by the story store service.
    pub data_dir: PathBuf,
    /// Default JSON file backing the story store.
    pub stories_file: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "voice-reader";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");
        let stories_file = data_dir.join("stories.json");

        Self {
            config_dir,
            settings_file,
            data_dir,
            stories_file,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_non_empty() {
        let paths = AppPaths::new();
        assert!(paths.config_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths.data_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths
            .settings_file
            .file_name()
            .is_some_and(|n| n == "settings.toml"));
        assert!(paths
            .stories_file
            .file_name()
            .is_some_and(|n| n == "stories.json"));
    }
}
