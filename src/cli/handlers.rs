use serde_json::json;
use uuid::Uuid;

use super::views::{CommentView, ProjectView, TicketView, VersionView};
use crate::context::AppContext;
use crate::date::StrictDate;
use crate::entity::{Rgb, Ticket, TicketState};
use crate::error::{Result, TrackerError, ValidationError};
use crate::storage::ProjectRepository;

fn open_repo(ctx: &AppContext) -> Result<ProjectRepository> {
    let path = ctx.project_file();
    if !path.exists() {
        return Err(TrackerError::NotInitialized(path.to_path_buf()));
    }
    ProjectRepository::open(path)
}

fn save_repo(ctx: &AppContext, repo: &mut ProjectRepository) -> Result<()> {
    repo.save(ctx.project_file())?;
    Ok(())
}

/// Dates follow the forgiving rule: bad text becomes "no date". The user
/// gets a warning so a typo does not go unnoticed.
fn date_arg(field: &str, text: &str) -> StrictDate {
    let date = StrictDate::parse(text.trim());
    if !date.is_valid() && !text.trim().is_empty() {
        eprintln!(
            "Warning: '{}' is not a YYYY-MM-DD date; {} left unset",
            text, field
        );
    }
    date
}

fn date_or_today(field: &str, text: Option<String>) -> StrictDate {
    match text {
        Some(text) => date_arg(field, &text),
        None => StrictDate::today(),
    }
}

fn parse_state(text: &str) -> Result<TicketState> {
    text.parse()
        .map_err(TrackerError::InvalidArgument)
}

/// Accept "7", "TT-7" or "tt-7".
fn resolve_ticket(repo: &ProjectRepository, id: &str) -> Result<Uuid> {
    let prefix = repo.project().prefix();
    let number = match id.rsplit_once('-') {
        Some((p, n)) if p.eq_ignore_ascii_case(prefix) => n,
        _ => id,
    };
    number
        .trim()
        .parse::<u32>()
        .ok()
        .and_then(|n| repo.ticket_by_display_id(n))
        .map(|t| t.internal_id())
        .ok_or_else(|| TrackerError::EntityNotFound(id.to_string()))
}

fn resolve_version(repo: &ProjectRepository, label: &str) -> Result<Uuid> {
    repo.version_by_label(label)
        .map(|v| v.internal_id())
        .ok_or_else(|| TrackerError::EntityNotFound(format!("version {}", label)))
}

fn ticket_mut(repo: &mut ProjectRepository, id: Uuid) -> Result<&mut Ticket> {
    repo.ticket_mut(id)
        .ok_or_else(|| TrackerError::EntityNotFound(id.to_string()))
}

fn ticket_line(repo: &ProjectRepository, ticket: &Ticket) -> String {
    let target = ticket
        .target_version_id()
        .and_then(|id| repo.version(id))
        .map(|v| format!(" [{}]", v.label()))
        .unwrap_or_default();
    format!(
        "{:<8} {:<12} {}{}",
        ticket.display_key(repo.project().prefix()),
        ticket.state().to_string(),
        ticket.short_description(),
        target
    )
}

fn print_ticket(ctx: &AppContext, repo: &ProjectRepository, id: Uuid, verb: &str) -> Result<()> {
    let ticket = repo
        .ticket(id)
        .ok_or_else(|| TrackerError::EntityNotFound(id.to_string()))?;
    if ctx.json() {
        println!("{}", serde_json::to_string_pretty(&TicketView::new(repo, ticket))?);
    } else {
        println!(
            "{} {} - {}",
            verb,
            ticket.display_key(repo.project().prefix()),
            ticket.short_description()
        );
    }
    Ok(())
}

pub fn handle_init(
    ctx: &AppContext,
    prefix: String,
    name: String,
    description: Option<String>,
    start: Option<String>,
) -> Result<()> {
    let path = ctx.project_file();
    if path.exists() {
        return Err(TrackerError::AlreadyInitialized(path.to_path_buf()));
    }

    let mut repo = ProjectRepository::create(prefix, name)?;
    if let Some(description) = description {
        repo.project_mut().set_description(description);
    }
    if let Some(start) = start {
        repo.project_mut().set_start_date(date_arg("start date", &start));
    }
    save_repo(ctx, &mut repo)?;

    let project = repo.project();
    if ctx.json() {
        println!("{}", serde_json::to_string_pretty(&ProjectView::new(project))?);
    } else {
        println!(
            "Initialized project {} ({}) in {}",
            project.prefix(),
            project.name(),
            path.display()
        );
    }
    Ok(())
}

pub fn handle_info(ctx: &AppContext) -> Result<()> {
    let repo = open_repo(ctx)?;
    let project = repo.project();
    let tickets = repo.tickets();
    let open = tickets.iter().filter(|t| !t.state().is_terminal()).count();

    if ctx.json() {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "project": ProjectView::new(project),
                "versions": repo.versions().len(),
                "tickets": tickets.len(),
                "open_tickets": open,
            }))?
        );
        return Ok(());
    }

    println!("{} ({})", project.name(), project.prefix());
    if let Some(description) = project.description() {
        println!("  {}", description);
    }
    if project.start_date().is_valid() {
        println!(
            "Started:  {} ({})",
            project.start_date(),
            project.start_date().day_name()
        );
    }
    if let (Some(bg), Some(fg)) = (project.bg_color(), project.fg_color()) {
        println!("Colors:   {} on {}", fg, bg);
    }
    println!("Versions: {}", repo.versions().len());
    println!("Tickets:  {} ({} open)", tickets.len(), open);
    println!("File:     {}", ctx.project_file().display());
    Ok(())
}

pub fn handle_status(ctx: &AppContext) -> Result<()> {
    let repo = open_repo(ctx)?;
    let entries = repo.dirty_entries();

    if ctx.json() {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "dirty": !entries.is_empty(),
                "entries": entries,
            }))?
        );
    } else if entries.is_empty() {
        println!("Clean: every file matches its entry");
    } else {
        println!("Would change on next save:");
        for entry in entries {
            println!("  {}", entry);
        }
    }
    Ok(())
}

pub fn handle_set(
    ctx: &AppContext,
    name: Option<String>,
    prefix: Option<String>,
    description: Option<String>,
    start: Option<String>,
    bg: Option<String>,
    fg: Option<String>,
) -> Result<()> {
    let mut repo = open_repo(ctx)?;
    let project = repo.project_mut();

    if let Some(name) = name {
        project.set_name(name)?;
    }
    if let Some(prefix) = prefix {
        project.set_prefix(prefix)?;
    }
    if let Some(description) = description {
        project.set_description(description);
    }
    if let Some(start) = start {
        project.set_start_date(date_arg("start date", &start));
    }
    if let (Some(bg), Some(fg)) = (bg, fg) {
        let bg: Rgb = bg.parse().map_err(TrackerError::InvalidArgument)?;
        let fg: Rgb = fg.parse().map_err(TrackerError::InvalidArgument)?;
        project.set_colors(bg, fg);
    }

    if !repo.is_dirty() {
        println!("Nothing changed");
        return Ok(());
    }
    save_repo(ctx, &mut repo)?;

    if ctx.json() {
        println!("{}", serde_json::to_string_pretty(&ProjectView::new(repo.project()))?);
    } else {
        println!("Updated project {}", repo.project().prefix());
    }
    Ok(())
}

pub fn handle_version_add(
    ctx: &AppContext,
    label: String,
    description: Option<String>,
    start: Option<String>,
    release: Option<String>,
) -> Result<()> {
    let mut repo = open_repo(ctx)?;
    if repo.version_by_label(&label).is_some() {
        return Err(TrackerError::InvalidArgument(format!("version {} already exists", label)));
    }

    let version = repo.add_version(label)?;
    if let Some(description) = description {
        version.set_description(description);
    }
    if let Some(start) = start {
        version.set_start_date(date_arg("start date", &start));
    }
    if let Some(release) = release {
        version.set_release_date(date_arg("release date", &release));
    }
    let id = version.internal_id();
    save_repo(ctx, &mut repo)?;

    let version = repo
        .version(id)
        .ok_or_else(|| TrackerError::EntityNotFound(id.to_string()))?;
    if ctx.json() {
        println!("{}", serde_json::to_string_pretty(&VersionView::new(version))?);
    } else {
        println!("Created version {}", version.label());
    }
    Ok(())
}

pub fn handle_version_list(ctx: &AppContext) -> Result<()> {
    let repo = open_repo(ctx)?;
    let versions = repo.versions();

    if ctx.json() {
        let views: Vec<VersionView> = versions.iter().map(|v| VersionView::new(v)).collect();
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }
    if versions.is_empty() {
        println!("No versions");
        return Ok(());
    }
    for version in versions {
        let targeted = repo
            .tickets()
            .iter()
            .filter(|t| t.target_version_id() == Some(version.internal_id()))
            .count();
        println!(
            "{:<10} start {:<10} release {:<10} {} ticket(s)",
            version.label(),
            version.start_date().format(),
            version.release_date().format(),
            targeted
        );
    }
    Ok(())
}

pub fn handle_version_release(ctx: &AppContext, label: String, date: Option<String>) -> Result<()> {
    let mut repo = open_repo(ctx)?;
    let id = resolve_version(&repo, &label)?;
    let date = date_or_today("release date", date);
    if let Some(version) = repo.version_mut(id) {
        version.set_release_date(date);
    }
    save_repo(ctx, &mut repo)?;
    println!("Released {} on {}", label, date);
    Ok(())
}

pub fn handle_ticket_add(
    ctx: &AppContext,
    summary: String,
    description: Option<String>,
    target: Option<String>,
) -> Result<()> {
    let mut repo = open_repo(ctx)?;
    let target = match target {
        Some(label) => Some(resolve_version(&repo, &label)?),
        None => None,
    };

    let ticket = repo.add_ticket(summary)?;
    if let Some(description) = description {
        ticket.set_long_description(description);
    }
    let id = ticket.internal_id();
    repo.set_ticket_target(id, target)?;
    save_repo(ctx, &mut repo)?;

    print_ticket(ctx, &repo, id, "Created ticket")
}

pub fn handle_ticket_list(ctx: &AppContext, state: Option<String>) -> Result<()> {
    let repo = open_repo(ctx)?;
    let state = state.as_deref().map(parse_state).transpose()?;
    let tickets: Vec<&Ticket> = repo
        .tickets()
        .into_iter()
        .filter(|t| state.map(|s| t.state() == s).unwrap_or(true))
        .collect();

    if ctx.json() {
        let views: Vec<TicketView> = tickets.iter().map(|t| TicketView::new(&repo, t)).collect();
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }
    if tickets.is_empty() {
        println!("No tickets");
        return Ok(());
    }
    for ticket in tickets {
        println!("{}", ticket_line(&repo, ticket));
    }
    Ok(())
}

pub fn handle_ticket_show(ctx: &AppContext, id: String) -> Result<()> {
    let repo = open_repo(ctx)?;
    let ticket_id = resolve_ticket(&repo, &id)?;
    let ticket = repo
        .ticket(ticket_id)
        .ok_or_else(|| TrackerError::EntityNotFound(id.clone()))?;

    if ctx.json() {
        println!("{}", serde_json::to_string_pretty(&TicketView::new(&repo, ticket))?);
        return Ok(());
    }

    println!("{}", ticket_line(&repo, ticket));
    if let Some(description) = ticket.long_description() {
        println!();
        println!("{}", description);
        println!();
    }
    println!("Created:  {}", ticket.create_date());
    if ticket.start_date().is_valid() {
        println!("Started:  {}", ticket.start_date());
    }
    if ticket.close_date().is_valid() {
        println!("Closed:   {}", ticket.close_date());
    }
    if let Some(resolution) = ticket.resolution() {
        println!("Resolution: {}", resolution);
    }
    if let Some(hours) = ticket.hours_worked() {
        println!("Hours:    {}", hours);
    }
    for comment in ticket.comments() {
        let edited = if comment.is_edited() { " (edited)" } else { "" };
        println!(
            "--- {}{}",
            comment.create_date().format("%Y-%m-%d %H:%M"),
            edited
        );
        println!("{}", comment.text());
    }
    Ok(())
}

pub fn handle_ticket_start(ctx: &AppContext, id: String, date: Option<String>) -> Result<()> {
    let mut repo = open_repo(ctx)?;
    let ticket_id = resolve_ticket(&repo, &id)?;
    let date = date_or_today("start date", date);
    ticket_mut(&mut repo, ticket_id)?.start(date);
    save_repo(ctx, &mut repo)?;
    print_ticket(ctx, &repo, ticket_id, "Started")
}

pub fn handle_ticket_state(ctx: &AppContext, id: String, state: String) -> Result<()> {
    let mut repo = open_repo(ctx)?;
    let ticket_id = resolve_ticket(&repo, &id)?;
    let state = parse_state(&state)?;
    ticket_mut(&mut repo, ticket_id)?.set_state(state);
    save_repo(ctx, &mut repo)?;
    print_ticket(ctx, &repo, ticket_id, "Updated")
}

pub fn handle_ticket_close(
    ctx: &AppContext,
    id: String,
    state: String,
    resolution: Option<String>,
    date: Option<String>,
) -> Result<()> {
    let mut repo = open_repo(ctx)?;
    let ticket_id = resolve_ticket(&repo, &id)?;
    let state = parse_state(&state)?;
    let date = date_or_today("close date", date);
    if !date.is_valid() {
        return Err(ValidationError::EmptyField("closeDate").into());
    }

    ticket_mut(&mut repo, ticket_id)?.close(state, date, resolution.unwrap_or_default())?;
    save_repo(ctx, &mut repo)?;
    print_ticket(ctx, &repo, ticket_id, "Closed")
}

pub fn handle_ticket_reopen(ctx: &AppContext, id: String) -> Result<()> {
    let mut repo = open_repo(ctx)?;
    let ticket_id = resolve_ticket(&repo, &id)?;
    ticket_mut(&mut repo, ticket_id)?.reopen();
    save_repo(ctx, &mut repo)?;
    print_ticket(ctx, &repo, ticket_id, "Reopened")
}

pub fn handle_ticket_hours(ctx: &AppContext, id: String, hours: f64) -> Result<()> {
    let mut repo = open_repo(ctx)?;
    let ticket_id = resolve_ticket(&repo, &id)?;
    let total = ticket_mut(&mut repo, ticket_id)?
        .log_hours(hours)?
        .hours_worked()
        .unwrap_or(0.0);
    save_repo(ctx, &mut repo)?;

    if ctx.json() {
        print_ticket(ctx, &repo, ticket_id, "Logged")
    } else {
        println!("Logged {} hour(s) on {} (total {})", hours, id, total);
        Ok(())
    }
}

pub fn handle_ticket_comment(ctx: &AppContext, id: String, text: String) -> Result<()> {
    let mut repo = open_repo(ctx)?;
    let ticket_id = resolve_ticket(&repo, &id)?;
    let comment = ticket_mut(&mut repo, ticket_id)?.add_comment(text)?.clone();
    save_repo(ctx, &mut repo)?;

    if ctx.json() {
        println!("{}", serde_json::to_string_pretty(&CommentView::new(&comment))?);
    } else {
        let ticket = repo
            .ticket(ticket_id)
            .ok_or_else(|| TrackerError::EntityNotFound(id.clone()))?;
        println!(
            "Commented on {} ({} comment(s))",
            ticket.display_key(repo.project().prefix()),
            ticket.comments().len()
        );
    }
    Ok(())
}

pub fn handle_ticket_target(ctx: &AppContext, id: String, label: Option<String>) -> Result<()> {
    let mut repo = open_repo(ctx)?;
    let ticket_id = resolve_ticket(&repo, &id)?;
    let version_id = match label {
        Some(label) => Some(resolve_version(&repo, &label)?),
        None => None,
    };
    repo.set_ticket_target(ticket_id, version_id)?;
    save_repo(ctx, &mut repo)?;
    print_ticket(ctx, &repo, ticket_id, "Retargeted")
}

pub fn handle_ticket_delete(ctx: &AppContext, id: String) -> Result<()> {
    let mut repo = open_repo(ctx)?;
    let ticket_id = resolve_ticket(&repo, &id)?;
    let ticket = repo.remove_ticket(ticket_id)?;
    save_repo(ctx, &mut repo)?;
    println!(
        "Deleted {} - {}",
        ticket.display_key(repo.project().prefix()),
        ticket.short_description()
    );
    Ok(())
}
