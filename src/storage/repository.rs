use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use uuid::Uuid;

use super::Persisted;
use crate::entity::{Project, ProjectVersion, Ticket};
use crate::error::{Result, TrackerError, ValidationError};

/// Ticket files live here, next to the project file.
pub const TICKETS_DIR: &str = "tickets";
/// Version files live here, next to the project file.
pub const VERSIONS_DIR: &str = "versions";

const FILE_EXTENSION: &str = "json";

/// What a cascading save wrote.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub versions_written: usize,
    pub tickets_written: usize,
    pub files_removed: usize,
}

/// A project together with its versions and tickets, indexed by identifier.
///
/// Tickets and versions refer to the project (and tickets to versions) by
/// id; this is where those ids are resolved.
pub struct ProjectRepository {
    project: Project,
    versions: BTreeMap<Uuid, ProjectVersion>,
    tickets: BTreeMap<Uuid, Ticket>,
    pending_removals: Vec<PathBuf>,
}

impl ProjectRepository {
    /// Start an unsaved repository around a new project.
    pub fn create(prefix: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        Ok(Self::from_project(Project::create(prefix, name)?))
    }

    pub fn from_project(project: Project) -> Self {
        Self {
            project,
            versions: BTreeMap::new(),
            tickets: BTreeMap::new(),
            pending_removals: Vec::new(),
        }
    }

    /// Load the project file plus every version and ticket file stored
    /// beside it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let project = Project::load(path)?;
        let root = storage_root(path);
        let project_id = project.internal_id();

        let mut repo = Self::from_project(project);
        for version in load_children::<ProjectVersion>(&root.join(VERSIONS_DIR))? {
            check_owner(version.source_file(), version.project_id(), project_id)?;
            repo.versions.insert(version.internal_id(), version);
        }
        let mut display_ids: BTreeMap<u32, PathBuf> = BTreeMap::new();
        for ticket in load_children::<Ticket>(&root.join(TICKETS_DIR))? {
            let source = ticket.source_file().map(Path::to_path_buf).unwrap_or_default();
            check_owner(ticket.source_file(), ticket.project_id(), project_id)?;
            if let Some(other) = display_ids.get(&ticket.display_id()) {
                return Err(TrackerError::load(
                    source,
                    format!(
                        "display number {} is already used by {}",
                        ticket.display_id(),
                        other.display()
                    ),
                ));
            }
            display_ids.insert(ticket.display_id(), source);
            repo.tickets.insert(ticket.internal_id(), ticket);
        }

        debug!(
            path = %path.display(),
            versions = repo.versions.len(),
            tickets = repo.tickets.len(),
            "opened project"
        );
        Ok(repo)
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn project_mut(&mut self) -> &mut Project {
        &mut self.project
    }

    /// Versions ordered by start date, then label.
    pub fn versions(&self) -> Vec<&ProjectVersion> {
        let mut versions: Vec<&ProjectVersion> = self.versions.values().collect();
        versions.sort_by(|a, b| {
            a.start_date()
                .compare(&b.start_date())
                .then_with(|| a.label().cmp(b.label()))
        });
        versions
    }

    pub fn version(&self, id: Uuid) -> Option<&ProjectVersion> {
        self.versions.get(&id)
    }

    pub fn version_mut(&mut self, id: Uuid) -> Option<&mut ProjectVersion> {
        self.versions.get_mut(&id)
    }

    pub fn version_by_label(&self, label: &str) -> Option<&ProjectVersion> {
        self.versions.values().find(|v| v.label() == label)
    }

    pub fn add_version(&mut self, label: impl Into<String>) -> Result<&mut ProjectVersion> {
        let version = ProjectVersion::create(self.project.internal_id(), label)?;
        let id = version.internal_id();
        Ok(self.versions.entry(id).or_insert(version))
    }

    /// Drop a version; tickets that targeted it lose their target.
    pub fn remove_version(&mut self, id: Uuid) -> Result<ProjectVersion> {
        let version = self
            .versions
            .remove(&id)
            .ok_or_else(|| TrackerError::EntityNotFound(id.to_string()))?;
        for ticket in self.tickets.values_mut() {
            if ticket.target_version_id() == Some(id) {
                ticket.set_target_version(None);
            }
        }
        if let Some(path) = version.source_file() {
            self.pending_removals.push(path.to_path_buf());
        }
        Ok(version)
    }

    /// Tickets ordered by display number.
    pub fn tickets(&self) -> Vec<&Ticket> {
        let mut tickets: Vec<&Ticket> = self.tickets.values().collect();
        tickets.sort_by_key(|t| t.display_id());
        tickets
    }

    pub fn ticket(&self, id: Uuid) -> Option<&Ticket> {
        self.tickets.get(&id)
    }

    pub fn ticket_mut(&mut self, id: Uuid) -> Option<&mut Ticket> {
        self.tickets.get_mut(&id)
    }

    pub fn ticket_by_display_id(&self, display_id: u32) -> Option<&Ticket> {
        self.tickets.values().find(|t| t.display_id() == display_id)
    }

    pub fn ticket_by_display_id_mut(&mut self, display_id: u32) -> Option<&mut Ticket> {
        self.tickets
            .values_mut()
            .find(|t| t.display_id() == display_id)
    }

    /// One past the highest display number in use. Numbers of removed
    /// tickets are reused only if they were the highest.
    pub fn next_display_id(&self) -> u32 {
        self.tickets
            .values()
            .map(|t| t.display_id())
            .max()
            .unwrap_or(0)
            + 1
    }

    pub fn add_ticket(&mut self, short_description: impl Into<String>) -> Result<&mut Ticket> {
        let ticket = Ticket::create(
            self.project.internal_id(),
            self.next_display_id(),
            short_description,
        )?;
        let id = ticket.internal_id();
        Ok(self.tickets.entry(id).or_insert(ticket))
    }

    pub fn remove_ticket(&mut self, id: Uuid) -> Result<Ticket> {
        let ticket = self
            .tickets
            .remove(&id)
            .ok_or_else(|| TrackerError::EntityNotFound(id.to_string()))?;
        if let Some(path) = ticket.source_file() {
            self.pending_removals.push(path.to_path_buf());
        }
        Ok(ticket)
    }

    /// Point a ticket at one of this project's versions, or clear it.
    pub fn set_ticket_target(&mut self, ticket_id: Uuid, version_id: Option<Uuid>) -> Result<()> {
        if let Some(version_id) = version_id {
            if !self.versions.contains_key(&version_id) {
                return Err(ValidationError::ForeignVersion(version_id).into());
            }
        }
        let ticket = self
            .tickets
            .get_mut(&ticket_id)
            .ok_or_else(|| TrackerError::EntityNotFound(ticket_id.to_string()))?;
        ticket.set_target_version(version_id);
        Ok(())
    }

    /// Ticket rules plus the ones that need the rest of the project.
    pub fn validate_ticket(&self, ticket: &Ticket) -> std::result::Result<(), ValidationError> {
        ticket.validate()?;
        if ticket.project_id() != self.project.internal_id() {
            return Err(ValidationError::ForeignProject(ticket.project_id()));
        }
        if let Some(version_id) = ticket.target_version_id() {
            if !self.versions.contains_key(&version_id) {
                return Err(ValidationError::ForeignVersion(version_id));
            }
        }
        Ok(())
    }

    /// Save the project to `path`, then every version and ticket that
    /// changed, under the same directory.
    ///
    /// All tickets are validated first; if one fails nothing is written.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<SaveSummary> {
        let path = path.as_ref();
        for ticket in self.tickets.values() {
            self.validate_ticket(ticket)?;
        }
        for version in self.versions.values() {
            version.validate()?;
        }

        self.project.save(path)?;

        let root = storage_root(path);
        let versions_dir = root.join(VERSIONS_DIR);
        let tickets_dir = root.join(TICKETS_DIR);
        create_dir(&versions_dir)?;
        create_dir(&tickets_dir)?;

        let mut summary = SaveSummary::default();
        for version in self.versions.values_mut() {
            let target = child_path(&versions_dir, version.internal_id());
            if needs_write(version, &target) {
                version.save(&target)?;
                summary.versions_written += 1;
            }
        }
        for ticket in self.tickets.values_mut() {
            let target = child_path(&tickets_dir, ticket.internal_id());
            if needs_write(ticket, &target) {
                ticket.save(&target)?;
                summary.tickets_written += 1;
            }
        }

        // Paths that could not be removed stay pending for the next save.
        let mut failure = None;
        self.pending_removals
            .retain(|stale| match fs::remove_file(stale) {
                Ok(()) => {
                    summary.files_removed += 1;
                    false
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => false,
                Err(e) => {
                    failure.get_or_insert_with(|| TrackerError::save(stale.clone(), e));
                    true
                }
            });
        if let Some(e) = failure {
            return Err(e);
        }

        info!(
            path = %path.display(),
            versions = summary.versions_written,
            tickets = summary.tickets_written,
            removed = summary.files_removed,
            "saved project"
        );
        Ok(summary)
    }

    /// True if the project, any version or any ticket is dirty, or a removal
    /// has not been saved yet.
    pub fn is_dirty(&self) -> bool {
        !self.pending_removals.is_empty()
            || self.project.is_dirty()
            || self.versions.values().any(|v| v.is_dirty())
            || self.tickets.values().any(|t| t.is_dirty())
    }

    /// Human-readable names of everything that is dirty.
    pub fn dirty_entries(&self) -> Vec<String> {
        let mut entries = Vec::new();
        if self.project.is_dirty() {
            entries.push(format!("project {}", self.project.prefix()));
        }
        for version in self.versions() {
            if version.is_dirty() {
                entries.push(format!("version {}", version.label()));
            }
        }
        for ticket in self.tickets() {
            if ticket.is_dirty() {
                entries.push(format!("ticket {}", ticket.display_key(self.project.prefix())));
            }
        }
        for removed in &self.pending_removals {
            entries.push(format!("removed {}", removed.display()));
        }
        entries
    }
}

fn storage_root(project_file: &Path) -> PathBuf {
    match project_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn child_path(dir: &Path, id: Uuid) -> PathBuf {
    dir.join(format!("{}.{}", id, FILE_EXTENSION))
}

fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| TrackerError::save(dir, e))
}

/// Write when the entity changed, or when the project moved and the child's
/// file is somewhere else.
fn needs_write<T: Persisted>(entity: &T, target: &Path) -> bool {
    entity.source_file() != Some(target) || super::is_dirty(entity)
}

fn check_owner(source: Option<&Path>, owner: Uuid, project_id: Uuid) -> Result<()> {
    if owner == project_id {
        return Ok(());
    }
    let path = source.map(Path::to_path_buf).unwrap_or_default();
    Err(TrackerError::load(path, ValidationError::ForeignProject(owner)))
}

/// Every `*.json` file in `dir`; a missing directory means no children.
fn load_children<T: Persisted>(dir: &Path) -> Result<Vec<T>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(TrackerError::load(dir, e)),
    };

    let mut children = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| TrackerError::load(dir, e))?.path();
        let is_hidden = path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with('.'))
            .unwrap_or(true);
        let is_json = path.extension().map(|e| e == FILE_EXTENSION).unwrap_or(false);
        if path.is_file() && is_json && !is_hidden {
            children.push(super::load::<T>(&path)?);
        }
    }
    Ok(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::StrictDate;
    use crate::entity::TicketState;
    use tempfile::TempDir;

    fn count_files(dir: &Path) -> usize {
        fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn test_display_ids_are_sequential() {
        let mut repo = ProjectRepository::create("TT", "TaskTracker").unwrap();
        assert_eq!(repo.add_ticket("one").unwrap().display_id(), 1);
        assert_eq!(repo.add_ticket("two").unwrap().display_id(), 2);
        let third = repo.add_ticket("three").unwrap().internal_id();
        assert_eq!(repo.next_display_id(), 4);

        let second = repo.ticket_by_display_id(2).unwrap().internal_id();
        repo.remove_ticket(second).unwrap();
        assert_eq!(repo.next_display_id(), 4);

        repo.remove_ticket(third).unwrap();
        assert_eq!(repo.next_display_id(), 2);
    }

    #[test]
    fn test_cascading_save_writes_children() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("project.json");

        let mut repo = ProjectRepository::create("TT", "TaskTracker").unwrap();
        repo.add_version("1.0").unwrap();
        repo.add_ticket("first").unwrap();
        repo.add_ticket("second").unwrap().add_comment("note").unwrap();

        let summary = repo.save(&path).unwrap();
        assert_eq!(summary.versions_written, 1);
        assert_eq!(summary.tickets_written, 2);
        assert_eq!(count_files(&tmp.path().join(TICKETS_DIR)), 2);
        assert_eq!(count_files(&tmp.path().join(VERSIONS_DIR)), 1);
        assert!(!repo.is_dirty());
    }

    #[test]
    fn test_second_save_only_writes_changes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("project.json");

        let mut repo = ProjectRepository::create("TT", "TaskTracker").unwrap();
        repo.add_ticket("first").unwrap();
        let second = repo.add_ticket("second").unwrap().internal_id();
        repo.save(&path).unwrap();

        repo.ticket_mut(second).unwrap().set_state(TicketState::Blocked);
        assert!(repo.is_dirty());
        assert_eq!(repo.dirty_entries(), vec!["ticket TT-2".to_string()]);

        let summary = repo.save(&path).unwrap();
        assert_eq!(summary.tickets_written, 1);
        assert_eq!(summary.versions_written, 0);
    }

    #[test]
    fn test_open_restores_everything() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("project.json");

        let mut repo = ProjectRepository::create("TT", "TaskTracker").unwrap();
        let version = repo.add_version("1.0").unwrap().internal_id();
        let ticket = repo.add_ticket("first").unwrap().internal_id();
        repo.set_ticket_target(ticket, Some(version)).unwrap();
        repo.ticket_mut(ticket).unwrap().add_comment("hello").unwrap();
        repo.save(&path).unwrap();

        let reopened = ProjectRepository::open(&path).unwrap();
        assert_eq!(reopened.project(), repo.project());
        assert_eq!(reopened.versions().len(), 1);
        let loaded = reopened.ticket(ticket).unwrap();
        assert_eq!(loaded, repo.ticket(ticket).unwrap());
        assert_eq!(loaded.target_version_id(), Some(version));
        assert!(!reopened.is_dirty());
    }

    #[test]
    fn test_target_must_belong_to_project() {
        let mut repo = ProjectRepository::create("TT", "TaskTracker").unwrap();
        let ticket = repo.add_ticket("first").unwrap().internal_id();
        let stranger = Uuid::new_v4();

        assert!(matches!(
            repo.set_ticket_target(ticket, Some(stranger)),
            Err(TrackerError::Validation(ValidationError::ForeignVersion(_)))
        ));

        // bypassing the repository is caught on save
        repo.ticket_mut(ticket)
            .unwrap()
            .set_target_version(Some(stranger));
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("project.json");
        assert!(matches!(repo.save(&path), Err(TrackerError::Validation(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_invalid_ticket_blocks_whole_save() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("project.json");

        let mut repo = ProjectRepository::create("TT", "TaskTracker").unwrap();
        repo.add_ticket("first")
            .unwrap()
            .set_state(TicketState::Resolved)
            .set_start_date(StrictDate::parse("2024-05-02"))
            .set_close_date(StrictDate::parse("2024-05-01"));

        let err = repo.save(&path).unwrap_err();
        assert!(matches!(
            err,
            TrackerError::Validation(ValidationError::CloseBeforeStart { .. })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_remove_ticket_deletes_file_on_save() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("project.json");

        let mut repo = ProjectRepository::create("TT", "TaskTracker").unwrap();
        let ticket = repo.add_ticket("first").unwrap().internal_id();
        repo.save(&path).unwrap();
        assert_eq!(count_files(&tmp.path().join(TICKETS_DIR)), 1);

        repo.remove_ticket(ticket).unwrap();
        assert!(repo.is_dirty());
        let summary = repo.save(&path).unwrap();
        assert_eq!(summary.files_removed, 1);
        assert_eq!(count_files(&tmp.path().join(TICKETS_DIR)), 0);
        assert!(!repo.is_dirty());
    }

    #[test]
    fn test_remove_version_clears_targets() {
        let mut repo = ProjectRepository::create("TT", "TaskTracker").unwrap();
        let version = repo.add_version("1.0").unwrap().internal_id();
        let ticket = repo.add_ticket("first").unwrap().internal_id();
        repo.set_ticket_target(ticket, Some(version)).unwrap();

        repo.remove_version(version).unwrap();
        assert_eq!(repo.ticket(ticket).unwrap().target_version_id(), None);
        assert!(repo.remove_version(version).is_err());
    }

    #[test]
    fn test_save_as_moves_children() {
        let tmp = TempDir::new().unwrap();
        let first = tmp.path().join("a").join("project.json");
        let second = tmp.path().join("b").join("project.json");
        fs::create_dir_all(first.parent().unwrap()).unwrap();
        fs::create_dir_all(second.parent().unwrap()).unwrap();

        let mut repo = ProjectRepository::create("TT", "TaskTracker").unwrap();
        repo.add_ticket("first").unwrap();
        repo.save(&first).unwrap();

        let summary = repo.save(&second).unwrap();
        assert_eq!(summary.tickets_written, 1);
        assert_eq!(count_files(&tmp.path().join("b").join(TICKETS_DIR)), 1);
    }

    #[test]
    fn test_open_rejects_foreign_ticket() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("project.json");

        let mut repo = ProjectRepository::create("TT", "TaskTracker").unwrap();
        repo.save(&path).unwrap();

        let mut stray = Ticket::create(Uuid::new_v4(), 1, "stray").unwrap();
        stray
            .save(tmp.path().join(TICKETS_DIR).join("stray.json"))
            .unwrap();

        assert!(matches!(
            ProjectRepository::open(&path),
            Err(TrackerError::Load { .. })
        ));
    }

    #[test]
    fn test_open_fails_on_corrupt_ticket() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("project.json");

        let mut repo = ProjectRepository::create("TT", "TaskTracker").unwrap();
        repo.save(&path).unwrap();
        fs::write(tmp.path().join(TICKETS_DIR).join("bad.json"), "[]").unwrap();

        assert!(matches!(
            ProjectRepository::open(&path),
            Err(TrackerError::Load { .. })
        ));
    }

    #[test]
    fn test_open_ignores_other_files() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("project.json");

        let mut repo = ProjectRepository::create("TT", "TaskTracker").unwrap();
        repo.add_ticket("first").unwrap();
        repo.save(&path).unwrap();
        let tickets = tmp.path().join(TICKETS_DIR);
        fs::write(tickets.join("README.txt"), "notes").unwrap();
        fs::write(tickets.join(".partial.json.tmp"), "{").unwrap();

        let reopened = ProjectRepository::open(&path).unwrap();
        assert_eq!(reopened.tickets().len(), 1);
    }

    #[test]
    fn test_failed_removal_stays_pending() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("project.json");

        let mut repo = ProjectRepository::create("TT", "TaskTracker").unwrap();
        let first = repo.add_ticket("first").unwrap().internal_id();
        let second = repo.add_ticket("second").unwrap().internal_id();
        repo.save(&path).unwrap();
        let first_file = repo.ticket(first).unwrap().source_file().unwrap().to_path_buf();
        let second_file = repo.ticket(second).unwrap().source_file().unwrap().to_path_buf();

        repo.remove_ticket(first).unwrap();
        repo.remove_ticket(second).unwrap();
        // a non-empty directory where the first file was cannot be removed
        fs::remove_file(&first_file).unwrap();
        fs::create_dir(&first_file).unwrap();
        fs::write(first_file.join("keep"), "x").unwrap();

        assert!(matches!(repo.save(&path), Err(TrackerError::Save { .. })));
        assert!(repo.is_dirty());
        assert_eq!(
            repo.dirty_entries(),
            vec![format!("removed {}", first_file.display())]
        );
        assert!(!second_file.exists());

        fs::remove_dir_all(&first_file).unwrap();
        repo.save(&path).unwrap();
        assert!(!repo.is_dirty());
    }

    #[test]
    fn test_open_rejects_duplicate_display_numbers() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("project.json");

        let mut repo = ProjectRepository::create("TT", "TaskTracker").unwrap();
        repo.add_ticket("first").unwrap();
        repo.save(&path).unwrap();

        let mut twin = Ticket::create(repo.project().internal_id(), 1, "twin").unwrap();
        twin.save(child_path(&tmp.path().join(TICKETS_DIR), twin.internal_id()))
            .unwrap();

        match ProjectRepository::open(&path) {
            Err(TrackerError::Load { reason, .. }) => {
                assert!(reason.contains("display number 1"));
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("duplicate display number was accepted"),
        }
    }

    #[test]
    fn test_logged_hours_reopen_clean() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("project.json");

        let mut repo = ProjectRepository::create("TT", "TaskTracker").unwrap();
        let ticket = repo.add_ticket("first").unwrap().internal_id();
        for hours in [0.1, 0.2, 1.1, 7.35, 0.45] {
            repo.ticket_mut(ticket).unwrap().log_hours(hours).unwrap();
        }
        repo.save(&path).unwrap();
        assert!(!repo.is_dirty());

        let reopened = ProjectRepository::open(&path).unwrap();
        assert_eq!(
            reopened.ticket(ticket).unwrap().hours_worked(),
            repo.ticket(ticket).unwrap().hours_worked()
        );
        assert!(reopened.dirty_entries().is_empty());
    }
}
