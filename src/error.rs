use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use crate::entity::TicketState;

/// Required-field and cross-field rule violations on entities.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("Close date {close} is earlier than start date {start}")]
    CloseBeforeStart { start: String, close: String },

    #[error("Ticket has a close date but is in non-terminal state '{0}'")]
    ClosedInNonTerminalState(TicketState),

    #[error("Hours worked must not be negative (got {0})")]
    NegativeHours(f64),

    #[error("Comment was last edited before it was created")]
    EditBeforeCreate,

    #[error("Target version {0} does not belong to this project")]
    ForeignVersion(Uuid),

    #[error("Entity belongs to another project ({0})")]
    ForeignProject(Uuid),

    #[error("Comment belongs to another ticket ({0})")]
    ForeignTicket(Uuid),
}

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to load {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    #[error("Failed to save {}: {source}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("No project file at {}. Run 'tasktracker init' first.", .0.display())]
    NotInitialized(PathBuf),

    #[error("A project already exists at {}", .0.display())]
    AlreadyInitialized(PathBuf),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TrackerError {
    pub(crate) fn load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        TrackerError::Load {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn save(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TrackerError::Save {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
