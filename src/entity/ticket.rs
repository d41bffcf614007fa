use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::{optional_text, require_non_empty, TicketComment};
use crate::date::StrictDate;
use crate::error::{Result, TrackerError, ValidationError};
use crate::storage::{self, Persisted};

/// Workflow state of a ticket.
///
/// Any state may follow any other; only the close-date rule depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TicketState {
    #[default]
    Open,
    InProgress,
    Blocked,
    Resolved,
    Closed,
}

impl TicketState {
    pub const ALL: [TicketState; 5] = [
        TicketState::Open,
        TicketState::InProgress,
        TicketState::Blocked,
        TicketState::Resolved,
        TicketState::Closed,
    ];

    /// Resolved and Closed are the states a close date may accompany.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TicketState::Resolved | TicketState::Closed)
    }
}

impl std::fmt::Display for TicketState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketState::Open => write!(f, "open"),
            TicketState::InProgress => write!(f, "in_progress"),
            TicketState::Blocked => write!(f, "blocked"),
            TicketState::Resolved => write!(f, "resolved"),
            TicketState::Closed => write!(f, "closed"),
        }
    }
}

impl std::str::FromStr for TicketState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "open" => Ok(TicketState::Open),
            "in_progress" | "inprogress" => Ok(TicketState::InProgress),
            "blocked" => Ok(TicketState::Blocked),
            "resolved" => Ok(TicketState::Resolved),
            "closed" => Ok(TicketState::Closed),
            _ => Err(format!("Invalid ticket state: {}", s)),
        }
    }
}

impl<'de> Deserialize<'de> for TicketState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// A unit of work inside a project.
///
/// Setters never fail on cross-field rules; [`Ticket::validate`] checks
/// them and saving refuses a ticket that does not pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    internal_id: Uuid,
    project_id: Uuid,
    #[serde(default)]
    target_version_id: Option<Uuid>,
    display_id: u32,
    #[serde(default)]
    create_date: StrictDate,
    #[serde(default)]
    start_date: StrictDate,
    #[serde(default)]
    close_date: StrictDate,
    short_description: String,
    #[serde(default)]
    long_description: Option<String>,
    #[serde(default)]
    hours_worked: Option<f64>,
    #[serde(default)]
    state: TicketState,
    #[serde(default)]
    resolution: Option<String>,
    #[serde(default)]
    comments: Vec<TicketComment>,
    #[serde(skip)]
    source_file: Option<PathBuf>,
}

impl Ticket {
    /// Create an open ticket dated today. `display_id` is the number users
    /// see; the owning repository hands these out.
    pub fn create(
        project_id: Uuid,
        display_id: u32,
        short_description: impl Into<String>,
    ) -> std::result::Result<Self, ValidationError> {
        Ok(Self {
            internal_id: Uuid::new_v4(),
            project_id,
            target_version_id: None,
            display_id,
            create_date: StrictDate::today(),
            start_date: StrictDate::unset(),
            close_date: StrictDate::unset(),
            short_description: require_non_empty("shortDescription", short_description)?,
            long_description: None,
            hours_worked: None,
            state: TicketState::Open,
            resolution: None,
            comments: Vec::new(),
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

    pub fn set_short_description(
        &mut self,
        text: impl Into<String>,
    ) -> std::result::Result<&mut Self, ValidationError> {
        self.short_description = require_non_empty("shortDescription", text)?;
        Ok(self)
    }

    pub fn set_long_description(&mut self, text: impl Into<String>) -> &mut Self {
        self.long_description = optional_text(text);
        self
    }

    /// Repositories check that the version belongs to the same project.
    pub fn set_target_version(&mut self, version_id: Option<Uuid>) -> &mut Self {
        self.target_version_id = version_id;
        self
    }

    pub fn set_create_date(&mut self, date: StrictDate) -> &mut Self {
        self.create_date = date;
        self
    }

    pub fn set_start_date(&mut self, date: StrictDate) -> &mut Self {
        self.start_date = date;
        self
    }

    pub fn set_close_date(&mut self, date: StrictDate) -> &mut Self {
        self.close_date = date;
        self
    }

    pub fn set_state(&mut self, state: TicketState) -> &mut Self {
        self.state = state;
        self
    }

    pub fn set_resolution(&mut self, resolution: impl Into<String>) -> &mut Self {
        self.resolution = optional_text(resolution);
        self
    }

    /// `None` means hours are not tracked for this ticket.
    pub fn set_hours_worked(&mut self, hours: Option<f64>) -> &mut Self {
        self.hours_worked = hours;
        self
    }

    /// Add to the hours worked, starting tracking if it was off.
    pub fn log_hours(&mut self, hours: f64) -> std::result::Result<&mut Self, ValidationError> {
        let total = self.hours_worked.unwrap_or(0.0) + hours;
        if !total.is_finite() || total < 0.0 {
            return Err(ValidationError::NegativeHours(total));
        }
        self.hours_worked = Some(total);
        Ok(self)
    }

    /// Move to `InProgress`, recording `date` as the start unless one is set.
    pub fn start(&mut self, date: StrictDate) -> &mut Self {
        if !self.start_date.is_valid() {
            self.start_date = date;
        }
        self.state = TicketState::InProgress;
        self
    }

    /// Close in one step. Nothing changes if `state` is not terminal or the
    /// date falls before the start date.
    pub fn close(
        &mut self,
        state: TicketState,
        date: StrictDate,
        resolution: impl Into<String>,
    ) -> std::result::Result<&mut Self, ValidationError> {
        if !state.is_terminal() {
            return Err(ValidationError::ClosedInNonTerminalState(state));
        }
        check_close_after_start(self.start_date, date)?;
        self.state = state;
        self.close_date = date;
        self.resolution = optional_text(resolution);
        Ok(self)
    }

    pub fn reopen(&mut self) -> &mut Self {
        self.state = TicketState::Open;
        self.close_date.clear();
        self.resolution = None;
        self
    }

    pub fn add_comment(
        &mut self,
        text: impl Into<String>,
    ) -> std::result::Result<&TicketComment, ValidationError> {
        let comment = TicketComment::create(self.internal_id, text)?;
        let index = self.comments.len();
        self.comments.push(comment);
        Ok(&self.comments[index])
    }

    pub fn edit_comment(&mut self, comment_id: Uuid, text: impl Into<String>) -> Result<()> {
        let comment = self
            .comments
            .iter_mut()
            .find(|c| c.internal_id() == comment_id)
            .ok_or_else(|| TrackerError::EntityNotFound(comment_id.to_string()))?;
        comment.edit(text)?;
        Ok(())
    }

    pub fn remove_comment(&mut self, comment_id: Uuid) -> Option<TicketComment> {
        let index = self
            .comments
            .iter()
            .position(|c| c.internal_id() == comment_id)?;
        Some(self.comments.remove(index))
    }

    /// Key shown to users, e.g. `TT-7`.
    pub fn display_key(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.display_id)
    }

    pub fn internal_id(&self) -> Uuid {
        self.internal_id
    }

    pub fn project_id(&self) -> Uuid {
        self.project_id
    }

    pub fn target_version_id(&self) -> Option<Uuid> {
        self.target_version_id
    }

    pub fn display_id(&self) -> u32 {
        self.display_id
    }

    pub fn create_date(&self) -> StrictDate {
        self.create_date
    }

    pub fn start_date(&self) -> StrictDate {
        self.start_date
    }

    pub fn close_date(&self) -> StrictDate {
        self.close_date
    }

    pub fn short_description(&self) -> &str {
        &self.short_description
    }

    pub fn long_description(&self) -> Option<&str> {
        self.long_description.as_deref()
    }

    pub fn hours_worked(&self) -> Option<f64> {
        self.hours_worked
    }

    pub fn state(&self) -> TicketState {
        self.state
    }

    pub fn resolution(&self) -> Option<&str> {
        self.resolution.as_deref()
    }

    pub fn comments(&self) -> &[TicketComment] {
        &self.comments
    }

    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }

    /// Check the rules that span fields: hours, close date against state and
    /// start date, and every comment.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        require_non_empty("shortDescription", self.short_description.as_str())?;
        if let Some(hours) = self.hours_worked {
            if !hours.is_finite() || hours < 0.0 {
                return Err(ValidationError::NegativeHours(hours));
            }
        }
        if self.close_date.is_valid() {
            if !self.state.is_terminal() {
                return Err(ValidationError::ClosedInNonTerminalState(self.state));
            }
            check_close_after_start(self.start_date, self.close_date)?;
        }
        for comment in &self.comments {
            if comment.ticket_id() != self.internal_id {
                return Err(ValidationError::ForeignTicket(comment.ticket_id()));
            }
            comment.validate()?;
        }
        Ok(())
    }
}

fn check_close_after_start(
    start: StrictDate,
    close: StrictDate,
) -> std::result::Result<(), ValidationError> {
    if close.compare(&start) == Ordering::Less {
        return Err(ValidationError::CloseBeforeStart {
            start: start.format(),
            close: close.format(),
        });
    }
    Ok(())
}

impl PartialEq for Ticket {
    fn eq(&self, other: &Self) -> bool {
        self.internal_id == other.internal_id
            && self.project_id == other.project_id
            && self.target_version_id == other.target_version_id
            && self.display_id == other.display_id
            && self.create_date == other.create_date
            && self.start_date == other.start_date
            && self.close_date == other.close_date
            && self.short_description == other.short_description
            && self.long_description == other.long_description
            && self.hours_worked == other.hours_worked
            && self.state == other.state
            && self.resolution == other.resolution
            && self.comments == other.comments
    }
}

impl Persisted for Ticket {
    const KIND: &'static str = "ticket";

    fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }

    fn bind_source_file(&mut self, path: PathBuf) {
        self.source_file = Some(path);
    }

    fn validate(&self) -> std::result::Result<(), ValidationError> {
        Ticket::validate(self)
    }
}
