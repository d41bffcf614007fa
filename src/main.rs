use clap::Parser;
use tasktracker::cli::{
    handle_info, handle_init, handle_set, handle_status, handle_ticket_add, handle_ticket_close,
    handle_ticket_comment, handle_ticket_delete, handle_ticket_hours, handle_ticket_list,
    handle_ticket_reopen, handle_ticket_show, handle_ticket_start, handle_ticket_state,
    handle_ticket_target, handle_version_add, handle_version_list, handle_version_release, Cli,
    Commands, TicketAction, VersionAction,
};
use tasktracker::logging::init_logging;
use tasktracker::{AppContext, Result};

fn run(cli: Cli) -> Result<()> {
    let ctx = AppContext::new(cli.settings_dir, cli.project, cli.json)?;
    init_logging(&ctx.config().log_level);

    match cli.command {
        Commands::Init {
            prefix,
            name,
            description,
            start,
        } => handle_init(&ctx, prefix, name, description, start),
        Commands::Info => handle_info(&ctx),
        Commands::Status => handle_status(&ctx),
        Commands::Set {
            name,
            prefix,
            description,
            start,
            bg,
            fg,
        } => handle_set(&ctx, name, prefix, description, start, bg, fg),
        Commands::Version(cmd) => match cmd.action {
            VersionAction::Add {
                label,
                description,
                start,
                release,
            } => handle_version_add(&ctx, label, description, start, release),
            VersionAction::List => handle_version_list(&ctx),
            VersionAction::Release { label, date } => handle_version_release(&ctx, label, date),
        },
        Commands::Ticket(cmd) => match cmd.action {
            TicketAction::Add {
                summary,
                description,
                target,
            } => handle_ticket_add(&ctx, summary, description, target),
            TicketAction::List { state } => handle_ticket_list(&ctx, state),
            TicketAction::Show { id } => handle_ticket_show(&ctx, id),
            TicketAction::Start { id, date } => handle_ticket_start(&ctx, id, date),
            TicketAction::State { id, state } => handle_ticket_state(&ctx, id, state),
            TicketAction::Close {
                id,
                state,
                resolution,
                date,
            } => handle_ticket_close(&ctx, id, state, resolution, date),
            TicketAction::Reopen { id } => handle_ticket_reopen(&ctx, id),
            TicketAction::Hours { id, hours } => handle_ticket_hours(&ctx, id, hours),
            TicketAction::Comment { id, text } => handle_ticket_comment(&ctx, id, text),
            TicketAction::Target { id, label } => handle_ticket_target(&ctx, id, label),
            TicketAction::Delete { id } => handle_ticket_delete(&ctx, id),
        },
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
