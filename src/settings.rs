use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::pdf::{DEFAULT_INITIAL_PAGES, DEFAULT_PAGES_AFTER, DEFAULT_PAGES_BEFORE, LaneConfig};

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "pagepool";

/// Window sizing and timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Quiet period before a viewport change is acted upon
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_pages_before")]
    pub pages_before: usize,

    #[serde(default = "default_pages_after")]
    pub pages_after: usize,

    /// Number of pages rendered when a document is opened
    #[serde(default = "default_initial_pages")]
    pub initial_pages: usize,

    /// Width of rendered bitmaps in pixels; native page size when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_width_px: Option<u32>,
}

fn default_debounce_ms() -> u64 {
    20
}

fn default_pages_before() -> usize {
    DEFAULT_PAGES_BEFORE
}

fn default_pages_after() -> usize {
    DEFAULT_PAGES_AFTER
}

fn default_initial_pages() -> usize {
    DEFAULT_INITIAL_PAGES
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            pages_before: default_pages_before(),
            pages_after: default_pages_after(),
            initial_pages: default_initial_pages(),
            target_width_px: None,
        }
    }
}

impl WindowConfig {
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Parameters handed to the render lane
    #[must_use]
    pub fn lane_config(&self) -> LaneConfig {
        LaneConfig {
            debounce: self.debounce(),
            pages_before: self.pages_before,
            pages_after: self.pages_after,
            initial_pages: self.initial_pages,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub window: WindowConfig,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            window: WindowConfig::default(),
        }
    }
}

#[must_use]
pub fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Load settings from the user config directory, creating the file with
/// defaults when it does not exist yet
#[must_use]
pub fn load_settings() -> Settings {
    let Some(path) = preferred_config_path() else {
        warn!("Could not determine config directory, using default settings");
        return Settings::default();
    };
    if !path.exists() {
        info!("Settings file not found, creating with defaults at {path:?}");
        let settings = Settings::default();
        save_settings_to_file(&settings, &path);
        return settings;
    }
    load_settings_from_path(&path)
}

/// Load settings from `path`; unreadable or malformed files fall back to
/// defaults
#[must_use]
pub fn load_settings_from_path(path: &Path) -> Settings {
    match fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
            Ok(mut settings) => {
                debug!("Loaded settings from {path:?}");
                if settings.version < CURRENT_VERSION {
                    migrate_settings(&mut settings);
                    save_settings_to_file(&settings, path);
                }
                settings
            }
            Err(e) => {
                error!("Failed to parse settings file {path:?}: {e}");
                Settings::default()
            }
        },
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
            Settings::default()
        }
    }
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );
    settings.version = CURRENT_VERSION;
}

pub fn save_settings_to_file(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            error!("Failed to create config directory {parent:?}: {e}");
            return;
        }
    }

    match serde_yaml::to_string(settings) {
        Ok(yaml) => {
            let content = format!(
                "# pagepool settings\n# Window sizes are in pages, debounce_ms in milliseconds\n\n{yaml}"
            );
            if let Err(e) = fs::write(path, content) {
                error!("Failed to write settings file {path:?}: {e}");
            } else {
                debug!("Saved settings to {path:?}");
            }
        }
        Err(e) => {
            error!("Failed to serialize settings: {e}");
        }
    }
}
