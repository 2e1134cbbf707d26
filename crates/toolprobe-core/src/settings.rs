//! Settings parser for `toolprobe/config.toml`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::paths::DEFAULT_SEARCH_DEPTH;

const CONFIG_DIR: &str = "toolprobe";
const CONFIG_FILENAME: &str = "config.toml";

/// Detection settings (`config.toml`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub search: SearchSettings,

    #[serde(default)]
    pub watch: WatchSettings,

    #[serde(default)]
    pub ndk: ToolSettings,

    #[serde(default)]
    pub genymotion: ToolSettings,
}

/// Candidate search settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SearchSettings {
    /// Directory levels probed below each search root
    #[serde(default = "default_depth")]
    pub depth: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            depth: default_depth(),
        }
    }
}

fn default_depth() -> usize {
    DEFAULT_SEARCH_DEPTH
}

/// File watcher settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WatchSettings {
    /// Debounce duration in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    200
}

/// Per-tool settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ToolSettings {
    /// Extra search roots, probed before the platform defaults
    #[serde(default)]
    pub paths: Vec<String>,
}

/// Location of the per-user settings file
pub fn user_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILENAME))
}

/// Load settings from the per-user config directory
pub fn load_user_settings() -> Settings {
    match user_settings_path() {
        Some(path) => load_settings(&path),
        None => {
            debug!("No config directory on this platform, using defaults");
            Settings::default()
        }
    }
}

/// Load settings from a TOML file, falling back to defaults
pub fn load_settings(config_path: &Path) -> Settings {
    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}
