use std::path::{Path, PathBuf};

use crate::config::{default_settings_dir, AppConfig};
use crate::error::{Result, TrackerError};

pub const DEFAULT_PROJECT_FILE: &str = "project.json";

/// Everything the command handlers need, built once in `main`.
#[derive(Debug, Clone)]
pub struct AppContext {
    settings_dir: PathBuf,
    config: AppConfig,
    project_file: PathBuf,
    json: bool,
}

impl AppContext {
    /// Resolve settings and the project file.
    ///
    /// The project file is `project` if given, else the configured default,
    /// else `project.json` in the working directory.
    pub fn new(settings_dir: Option<PathBuf>, project: Option<PathBuf>, json: bool) -> Result<Self> {
        let settings_dir = settings_dir
            .or_else(default_settings_dir)
            .ok_or_else(|| TrackerError::Config("Could not determine settings directory".to_string()))?;
        let config = AppConfig::load(&settings_dir)?;
        Ok(Self::with_config(settings_dir, config, project, json))
    }

    pub fn with_config(
        settings_dir: PathBuf,
        config: AppConfig,
        project: Option<PathBuf>,
        json: bool,
    ) -> Self {
        let project_file = project
            .or_else(|| config.default_project.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROJECT_FILE));
        Self {
            settings_dir,
            config,
            project_file,
            json,
        }
    }

    pub fn settings_dir(&self) -> &Path {
        &self.settings_dir
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn project_file(&self) -> &Path {
        &self.project_file
    }

    /// Whether commands print JSON instead of text.
    pub fn json(&self) -> bool {
        self.json
    }
}
