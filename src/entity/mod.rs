mod comment;
mod project;
mod ticket;
mod version;

pub use comment::TicketComment;
pub use project::{Project, Rgb};
pub use ticket::{Ticket, TicketState};
pub use version::ProjectVersion;

use crate::error::ValidationError;

/// Trim and reject blank values for fields that must be filled in.
pub(crate) fn require_non_empty(
    field: &'static str,
    value: impl Into<String>,
) -> Result<String, ValidationError> {
    let value = value.into();
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(value)
}

/// Blank optional text is stored as absent.
pub(crate) fn optional_text(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
