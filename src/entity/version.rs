use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{optional_text, require_non_empty};
use crate::date::StrictDate;
use crate::error::{Result, ValidationError};
use crate::storage::{self, Persisted};

/// A release milestone of one project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectVersion {
    internal_id: Uuid,
    project_id: Uuid,
    label: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    start_date: StrictDate,
    #[serde(default)]
    release_date: StrictDate,
    #[serde(skip)]
    source_file: Option<PathBuf>,
}

impl ProjectVersion {
    pub fn create(
        project_id: Uuid,
        label: impl Into<String>,
    ) -> std::result::Result<Self, ValidationError> {
        Ok(Self {
            internal_id: Uuid::new_v4(),
            project_id,
            label: require_non_empty("label", label)?,
            description: None,
            start_date: StrictDate::unset(),
            release_date: StrictDate::unset(),
            source_file: None,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        storage::load(path.as_ref())
    }

    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        storage::save(self, path.as_ref())
    }

    pub fn is_dirty(&self) -> bool {
        storage::is_dirty(self)
    }

    pub fn set_label(
        &mut self,
        label: impl Into<String>,
    ) -> std::result::Result<&mut Self, ValidationError> {
        self.label = require_non_empty("label", label)?;
        Ok(self)
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = optional_text(description);
        self
    }

    pub fn set_start_date(&mut self, date: StrictDate) -> &mut Self {
        self.start_date = date;
        self
    }

    pub fn set_release_date(&mut self, date: StrictDate) -> &mut Self {
        self.release_date = date;
        self
    }

    pub fn internal_id(&self) -> Uuid {
        self.internal_id
    }

    pub fn project_id(&self) -> Uuid {
        self.project_id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn start_date(&self) -> StrictDate {
        self.start_date
    }

    pub fn release_date(&self) -> StrictDate {
        self.release_date
    }

    pub fn is_released(&self) -> bool {
        self.release_date.is_valid()
    }

    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }
}

impl PartialEq for ProjectVersion {
    fn eq(&self, other: &Self) -> bool {
        self.internal_id == other.internal_id
            && self.project_id == other.project_id
            && self.label == other.label
            && self.description == other.description
            && self.start_date == other.start_date
            && self.release_date == other.release_date
    }
}

impl Persisted for ProjectVersion {
    const KIND: &'static str = "version";

    fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }

    fn bind_source_file(&mut self, path: PathBuf) {
        self.source_file = Some(path);
    }

    fn validate(&self) -> std::result::Result<(), ValidationError> {
        require_non_empty("label", self.label.as_str())?;
        Ok(())
    }
}
