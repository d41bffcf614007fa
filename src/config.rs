use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};

pub const SETTINGS_FILE: &str = "settings.yaml";
pub const APPLICATION_NAME: &str = "TaskTracker";

/// Application settings kept in the settings directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Log level for the `tasktracker` target (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Project file used when no `--project` is given
    #[serde(default)]
    pub default_project: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            default_project: None,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl AppConfig {
    /// Load `settings.yaml` from `settings_dir`, writing the defaults there
    /// the first time.
    pub fn load(settings_dir: &Path) -> Result<Self> {
        let path = settings_dir.join(SETTINGS_FILE);
        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            serde_yaml::from_str(&contents).map_err(|e| {
                TrackerError::Config(format!("Failed to parse {}: {}", path.display(), e))
            })
        } else {
            let config = AppConfig::default();
            config.save(settings_dir)?;
            Ok(config)
        }
    }

    pub fn save(&self, settings_dir: &Path) -> Result<()> {
        fs::create_dir_all(settings_dir)?;
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| TrackerError::Config(format!("Failed to serialize settings: {}", e)))?;
        fs::write(settings_dir.join(SETTINGS_FILE), yaml)?;
        Ok(())
    }
}

/// Platform config directory for TaskTracker, if a home directory exists.
pub fn default_settings_dir() -> Option<PathBuf> {
    ProjectDirs::from("ca", "corbett", APPLICATION_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}
