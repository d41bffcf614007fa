use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::{optional_text, require_non_empty};
use crate::date::StrictDate;
use crate::error::{Result, ValidationError};
use crate::storage::{self, Persisted};

/// Display color packed as `0xRRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Rgb(u32);

/// Older files store a signed ARGB int (opaque black is `-16777216`); the
/// alpha byte is dropped.
impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let packed = i64::deserialize(deserializer)?;
        Ok(Rgb::from_packed(packed as u32))
    }
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    pub const fn from_packed(packed: u32) -> Self {
        Rgb(packed & 0x00FF_FFFF)
    }

    pub const fn packed(&self) -> u32 {
        self.0
    }

    pub const fn r(&self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn g(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn b(&self) -> u8 {
        self.0 as u8
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0)
    }
}

impl std::str::FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 {
            return Err(format!("Invalid color: {} (expected RRGGBB)", s));
        }
        u32::from_str_radix(hex, 16)
            .map(Rgb::from_packed)
            .map_err(|_| format!("Invalid color: {} (expected RRGGBB)", s))
    }
}

/// Top-level container for versions and tickets.
///
/// Children point at the project through `internal_id`; the project itself
/// keeps no list of them. The identifier is never shown to users, the
/// `prefix` is what appears in ticket keys such as `TT-12`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    internal_id: Uuid,
    prefix: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    start_date: StrictDate,
    #[serde(default)]
    bg_color: Option<Rgb>,
    #[serde(default)]
    fg_color: Option<Rgb>,
    #[serde(skip)]
    source_file: Option<PathBuf>,
}

impl Project {
    /// Create an unsaved project with a fresh identifier.
    pub fn create(
        prefix: impl Into<String>,
        name: impl Into<String>,
    ) -> std::result::Result<Self, ValidationError> {
        Ok(Self {
            internal_id: Uuid::new_v4(),
            prefix: require_non_empty("prefix", prefix)?,
            name: require_non_empty("name", name)?,
            description: None,
            start_date: StrictDate::unset(),
            bg_color: None,
            fg_color: None,
            source_file: None,
        })
    }

    /// Read a project file and bind it as the backing file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        storage::load(path.as_ref())
    }

    /// Write the project file and bind `path` as the backing file, replacing
    /// any earlier binding.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        storage::save(self, path.as_ref())
    }

    /// True when the in-memory project no longer matches its backing file,
    /// or there is no backing file at all.
    pub fn is_dirty(&self) -> bool {
        storage::is_dirty(self)
    }

    pub fn set_prefix(
        &mut self,
        prefix: impl Into<String>,
    ) -> std::result::Result<&mut Self, ValidationError> {
        self.prefix = require_non_empty("prefix", prefix)?;
        Ok(self)
    }

    pub fn set_name(
        &mut self,
        name: impl Into<String>,
    ) -> std::result::Result<&mut Self, ValidationError> {
        self.name = require_non_empty("name", name)?;
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

    pub fn set_colors(&mut self, bg: Rgb, fg: Rgb) -> &mut Self {
        self.bg_color = Some(bg);
        self.fg_color = Some(fg);
        self
    }

    pub fn internal_id(&self) -> Uuid {
        self.internal_id
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn start_date(&self) -> StrictDate {
        self.start_date
    }

    pub fn bg_color(&self) -> Option<Rgb> {
        self.bg_color
    }

    pub fn fg_color(&self) -> Option<Rgb> {
        self.fg_color
    }

    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }
}

// The backing path is bookkeeping, not content.
impl PartialEq for Project {
    fn eq(&self, other: &Self) -> bool {
        self.internal_id == other.internal_id
            && self.prefix == other.prefix
            && self.name == other.name
            && self.description == other.description
            && self.start_date == other.start_date
            && self.bg_color == other.bg_color
            && self.fg_color == other.fg_color
    }
}

impl Persisted for Project {
    const KIND: &'static str = "project";

    fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }

    fn bind_source_file(&mut self, path: PathBuf) {
        self.source_file = Some(path);
    }

    fn validate(&self) -> std::result::Result<(), ValidationError> {
        require_non_empty("prefix", self.prefix.as_str())?;
        require_non_empty("name", self.name.as_str())?;
        Ok(())
    }
}
