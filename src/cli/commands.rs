use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tasktracker")]
#[command(version, about = "A personal issue tracker that keeps its data in plain files")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Project file to work on (default: project.json or the configured default)
    #[arg(long, short = 'p', global = true, value_name = "FILE")]
    pub project: Option<PathBuf>,

    /// Settings directory (default: the platform config directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub settings_dir: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new project file
    Init {
        /// Short prefix used in ticket keys, e.g. "TT"
        prefix: String,

        /// Project name
        name: String,

        /// Project description
        #[arg(long, short = 'd')]
        description: Option<String>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,
    },

    /// Show project details
    Info,

    /// Report entries whose files differ from what would be saved
    Status,

    /// Change project fields
    Set {
        /// New project name
        #[arg(long)]
        name: Option<String>,

        /// New ticket prefix
        #[arg(long)]
        prefix: Option<String>,

        /// New description (empty string clears it)
        #[arg(long, short = 'd')]
        description: Option<String>,

        /// Start date (YYYY-MM-DD, empty string clears it)
        #[arg(long)]
        start: Option<String>,

        /// Background color as RRGGBB (requires --fg)
        #[arg(long, requires = "fg")]
        bg: Option<String>,

        /// Foreground color as RRGGBB (requires --bg)
        #[arg(long, requires = "bg")]
        fg: Option<String>,
    },

    /// Manage versions
    Version(VersionCommand),

    /// Manage tickets
    Ticket(TicketCommand),
}

#[derive(Args, Debug)]
pub struct VersionCommand {
    #[command(subcommand)]
    pub action: VersionAction,
}

#[derive(Subcommand, Debug)]
pub enum VersionAction {
    /// Add a version
    Add {
        /// Version label, e.g. "1.2"
        label: String,

        /// Version description
        #[arg(long, short = 'd')]
        description: Option<String>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// Release date (YYYY-MM-DD)
        #[arg(long)]
        release: Option<String>,
    },

    /// List versions
    List,

    /// Set the release date of a version
    Release {
        /// Version label
        label: String,

        /// Release date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Args, Debug)]
pub struct TicketCommand {
    #[command(subcommand)]
    pub action: TicketAction,
}

#[derive(Subcommand, Debug)]
pub enum TicketAction {
    /// Add a ticket
    Add {
        /// One-line summary
        summary: String,

        /// Longer description
        #[arg(long, short = 'd')]
        description: Option<String>,

        /// Target version label
        #[arg(long)]
        target: Option<String>,
    },

    /// List tickets
    List {
        /// Only show tickets in this state
        #[arg(long)]
        state: Option<String>,
    },

    /// Show one ticket with its comments
    Show {
        /// Ticket number or key ("7" or "TT-7")
        id: String,
    },

    /// Mark a ticket as in progress
    Start {
        /// Ticket number or key
        id: String,

        /// Start date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Set a ticket's workflow state without touching its dates
    State {
        /// Ticket number or key
        id: String,

        /// open, in_progress, blocked, resolved or closed
        state: String,
    },

    /// Close a ticket
    Close {
        /// Ticket number or key
        id: String,

        /// Terminal state: resolved or closed
        #[arg(long, default_value = "closed")]
        state: String,

        /// Resolution text
        #[arg(long, short = 'r')]
        resolution: Option<String>,

        /// Close date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Reopen a closed ticket
    Reopen {
        /// Ticket number or key
        id: String,
    },

    /// Log hours worked on a ticket
    Hours {
        /// Ticket number or key
        id: String,

        /// Hours to add
        #[arg(allow_negative_numbers = true)]
        hours: f64,
    },

    /// Add a comment to a ticket
    Comment {
        /// Ticket number or key
        id: String,

        /// Comment text
        text: String,
    },

    /// Set or clear a ticket's target version
    Target {
        /// Ticket number or key
        id: String,

        /// Version label; omit to clear
        label: Option<String>,
    },

    /// Delete a ticket and its file
    Delete {
        /// Ticket number or key
        id: String,
    },
}
