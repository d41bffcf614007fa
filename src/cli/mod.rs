mod commands;
mod handlers;
mod views;

pub use commands::{
    Cli, Commands, TicketAction, TicketCommand, VersionAction, VersionCommand,
};
pub use handlers::{
    handle_info, handle_init, handle_set, handle_status, handle_ticket_add, handle_ticket_close,
    handle_ticket_comment, handle_ticket_delete, handle_ticket_hours, handle_ticket_list,
    handle_ticket_reopen, handle_ticket_show, handle_ticket_start, handle_ticket_state,
    handle_ticket_target, handle_version_add, handle_version_list, handle_version_release,
};
