//! What `--json` prints. Internal identifiers stay out of these; entities
//! are named by prefix, label and ticket key the same way the text output
//! names them.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::date::StrictDate;
use crate::entity::{Project, ProjectVersion, Ticket, TicketComment, TicketState};
use crate::storage::ProjectRepository;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView<'a> {
    pub prefix: &'a str,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub start_date: StrictDate,
    pub bg_color: Option<String>,
    pub fg_color: Option<String>,
}

impl<'a> ProjectView<'a> {
    pub fn new(project: &'a Project) -> Self {
        Self {
            prefix: project.prefix(),
            name: project.name(),
            description: project.description(),
            start_date: project.start_date(),
            bg_color: project.bg_color().map(|c| c.to_string()),
            fg_color: project.fg_color().map(|c| c.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionView<'a> {
    pub label: &'a str,
    pub description: Option<&'a str>,
    pub start_date: StrictDate,
    pub release_date: StrictDate,
    pub released: bool,
}

impl<'a> VersionView<'a> {
    pub fn new(version: &'a ProjectVersion) -> Self {
        Self {
            label: version.label(),
            description: version.description(),
            start_date: version.start_date(),
            release_date: version.release_date(),
            released: version.is_released(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView<'a> {
    pub create_date: DateTime<Utc>,
    pub last_edit_date: DateTime<Utc>,
    pub edited: bool,
    pub text: &'a str,
}

impl<'a> CommentView<'a> {
    pub fn new(comment: &'a TicketComment) -> Self {
        Self {
            create_date: comment.create_date(),
            last_edit_date: comment.last_edit_date(),
            edited: comment.is_edited(),
            text: comment.text(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketView<'a> {
    pub key: String,
    pub display_id: u32,
    pub state: TicketState,
    pub short_description: &'a str,
    pub long_description: Option<&'a str>,
    /// Label of the target version.
    pub target: Option<&'a str>,
    pub create_date: StrictDate,
    pub start_date: StrictDate,
    pub close_date: StrictDate,
    pub hours_worked: Option<f64>,
    pub resolution: Option<&'a str>,
    pub comments: Vec<CommentView<'a>>,
}

impl<'a> TicketView<'a> {
    pub fn new(repo: &'a ProjectRepository, ticket: &'a Ticket) -> Self {
        Self {
            key: ticket.display_key(repo.project().prefix()),
            display_id: ticket.display_id(),
            state: ticket.state(),
            short_description: ticket.short_description(),
            long_description: ticket.long_description(),
            target: ticket
                .target_version_id()
                .and_then(|id| repo.version(id))
                .map(|v| v.label()),
            create_date: ticket.create_date(),
            start_date: ticket.start_date(),
            close_date: ticket.close_date(),
            hours_worked: ticket.hours_worked(),
            resolution: ticket.resolution(),
            comments: ticket.comments().iter().map(CommentView::new).collect(),
        }
    }
}
