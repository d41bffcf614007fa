use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::require_non_empty;
use crate::error::ValidationError;

/// A timestamped note on a ticket. Comments are stored inside their ticket's
/// document and have no file of their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketComment {
    internal_id: Uuid,
    ticket_id: Uuid,
    create_date: DateTime<Utc>,
    last_edit_date: DateTime<Utc>,
    comment_text: String,
}

impl TicketComment {
    pub fn create(
        ticket_id: Uuid,
        text: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let now = Utc::now();
        Ok(Self {
            internal_id: Uuid::new_v4(),
            ticket_id,
            create_date: now,
            last_edit_date: now,
            comment_text: require_non_empty("commentText", text)?,
        })
    }

    /// Replace the body and stamp the edit time.
    pub fn edit(&mut self, text: impl Into<String>) -> Result<&mut Self, ValidationError> {
        self.comment_text = require_non_empty("commentText", text)?;
        self.last_edit_date = Utc::now().max(self.create_date);
        Ok(self)
    }

    pub fn internal_id(&self) -> Uuid {
        self.internal_id
    }

    pub fn ticket_id(&self) -> Uuid {
        self.ticket_id
    }

    pub fn create_date(&self) -> DateTime<Utc> {
        self.create_date
    }

    pub fn last_edit_date(&self) -> DateTime<Utc> {
        self.last_edit_date
    }

    pub fn text(&self) -> &str {
        &self.comment_text
    }

    pub fn is_edited(&self) -> bool {
        self.last_edit_date > self.create_date
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("commentText", self.comment_text.as_str())?;
        if self.last_edit_date < self.create_date {
            return Err(ValidationError::EditBeforeCreate);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;

    #[test]
    fn test_create_rejects_blank_text() {
        assert_eq!(
            TicketComment::create(Uuid::new_v4(), " ").unwrap_err(),
            ValidationError::EmptyField("commentText")
        );
    }

    #[test]
    fn test_edit_moves_last_edit_forward() {
        let mut comment = TicketComment::create(Uuid::new_v4(), "first").unwrap();
        assert_eq!(comment.create_date(), comment.last_edit_date());

        comment.edit("second").unwrap();
        assert_eq!(comment.text(), "second");
        assert!(comment.last_edit_date() >= comment.create_date());
        assert!(comment.validate().is_ok());
    }

    #[test]
    fn test_edit_before_create_is_invalid() {
        let comment = TicketComment::create(Uuid::new_v4(), "text").unwrap();
        let mut doc = codec::encode(&comment).unwrap();
        doc["lastEditDate"] = serde_json::json!("2000-01-01T00:00:00Z");

        let decoded: TicketComment = codec::decode(doc).unwrap();
        assert_eq!(decoded.validate(), Err(ValidationError::EditBeforeCreate));
    }

    #[test]
    fn test_timestamps_survive_roundtrip() {
        let comment = TicketComment::create(Uuid::new_v4(), "hello").unwrap();
        let decoded: TicketComment = codec::decode(codec::encode(&comment).unwrap()).unwrap();
        assert_eq!(decoded, comment);
    }
}
