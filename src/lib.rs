pub mod cli;
pub mod codec;
pub mod config;
pub mod context;
pub mod date;
pub mod entity;
pub mod error;
pub mod logging;
pub mod storage;

pub use context::AppContext;
pub use date::StrictDate;
pub use entity::{Project, ProjectVersion, Rgb, Ticket, TicketComment, TicketState};
pub use error::{Result, TrackerError, ValidationError};
pub use storage::ProjectRepository;
