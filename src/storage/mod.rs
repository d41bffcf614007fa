//! File-backed persistence and change detection.
//!
//! Every persisted entity is one JSON file. An entity remembers the file it
//! was loaded from or last saved to, and [`is_dirty`] compares the entity
//! against whatever that file holds right now.

mod repository;

pub use repository::{ProjectRepository, SaveSummary, TICKETS_DIR, VERSIONS_DIR};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::codec;
use crate::error::{Result, TrackerError, ValidationError};

/// An entity stored as a file of its own.
pub trait Persisted: Serialize + DeserializeOwned {
    /// Name used in log lines.
    const KIND: &'static str;

    fn source_file(&self) -> Option<&Path>;

    fn bind_source_file(&mut self, path: PathBuf);

    fn validate(&self) -> std::result::Result<(), ValidationError>;
}

/// Read and decode `path`, then bind it as the entity's backing file.
///
/// Unreadable files, malformed documents and documents that fail validation
/// all come back as [`TrackerError::Load`].
pub fn load<T: Persisted>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).map_err(|e| TrackerError::load(path, e))?;
    let mut entity: T = codec::from_text(&text).map_err(|e| TrackerError::load(path, e))?;
    entity
        .validate()
        .map_err(|e| TrackerError::load(path, e))?;
    entity.bind_source_file(path.to_path_buf());
    debug!(kind = T::KIND, path = %path.display(), "loaded");
    Ok(entity)
}

/// Encode and write the entity to `path`, then bind `path` as its backing
/// file. An invalid entity is refused before anything touches the disk.
pub fn save<T: Persisted>(entity: &mut T, path: &Path) -> Result<()> {
    entity.validate()?;
    let text = codec::to_text(entity)?;
    write_atomic(path, &text)?;
    entity.bind_source_file(path.to_path_buf());
    debug!(kind = T::KIND, path = %path.display(), "saved");
    Ok(())
}

/// Whether the entity differs from its backing file.
///
/// No backing file, a deleted backing file, or one that cannot be read or
/// parsed all count as dirty. This never fails and never writes.
pub fn is_dirty<T: Persisted>(entity: &T) -> bool {
    let Some(path) = entity.source_file() else {
        return true;
    };
    if !path.exists() {
        debug!(kind = T::KIND, path = %path.display(), "backing file missing");
        return true;
    }

    let on_disk = match fs::read_to_string(path).map_err(TrackerError::from) {
        Ok(text) => codec::parse_document(&text),
        Err(e) => Err(e),
    };
    let on_disk = match on_disk {
        Ok(doc) => doc,
        Err(e) => {
            warn!(kind = T::KIND, path = %path.display(), error = %e, "treating unreadable file as dirty");
            return true;
        }
    };
    let in_memory = match codec::encode(entity) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(kind = T::KIND, error = %e, "treating unencodable entity as dirty");
            return true;
        }
    };

    !codec::tree_eq(&in_memory, &on_disk)
}

/// Write through a hidden sibling file and rename it over `path`, so readers
/// see either the old content or the new content.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let file_name = path.file_name().ok_or_else(|| {
        TrackerError::save(
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
        )
    })?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    fs::write(&tmp, contents).map_err(|e| TrackerError::save(path, e))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(TrackerError::save(path, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Project, Ticket};
    use tempfile::TempDir;

    #[test]
    fn test_fresh_entity_is_dirty() {
        let project = Project::create("TT", "TaskTracker").unwrap();
        assert!(is_dirty(&project));
    }

    #[test]
    fn test_reformatted_file_is_not_dirty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("project.json");

        let mut project = Project::create("TT", "TaskTracker").unwrap();
        project.set_description("desc");
        save(&mut project, &path).unwrap();

        // same content, different key order and layout
        let rewritten = format!(
            "{{\"name\":\"TaskTracker\",   \"startDate\":\"\",\n\"description\":\"desc\",\"prefix\":\"TT\",\"internalId\":\"{}\"}}",
            project.internal_id()
        );
        fs::write(&path, rewritten).unwrap();

        assert!(!is_dirty(&project));
    }

    #[test]
    fn test_external_edit_is_dirty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("project.json");

        let mut project = Project::create("TT", "TaskTracker").unwrap();
        save(&mut project, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        fs::write(&path, text.replace("TaskTracker", "Renamed")).unwrap();
        assert!(is_dirty(&project));
    }

    #[test]
    fn test_garbage_file_is_dirty_not_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("project.json");

        let mut project = Project::create("TT", "TaskTracker").unwrap();
        save(&mut project, &path).unwrap();
        fs::write(&path, "{ not json").unwrap();

        assert!(is_dirty(&project));
        // the check did not touch the file
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_dirty_check_on_directory_is_dirty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("project.json");

        let mut project = Project::create("TT", "TaskTracker").unwrap();
        save(&mut project, &path).unwrap();
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(is_dirty(&project));
    }

    #[test]
    fn test_load_missing_file() {
        let tmp = TempDir::new().unwrap();
        let result: Result<Project> = load(&tmp.path().join("nope.json"));
        assert!(matches!(result, Err(TrackerError::Load { .. })));
    }

    #[test]
    fn test_load_wrong_shape() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("project.json");
        fs::write(&path, r#"{"prefix": "TT"}"#).unwrap();

        let result: Result<Project> = load(&path);
        assert!(matches!(result, Err(TrackerError::Load { .. })));
    }

    #[test]
    fn test_load_ignores_unknown_fields() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("project.json");

        let mut project = Project::create("TT", "TaskTracker").unwrap();
        save(&mut project, &path).unwrap();
        let mut doc = codec::parse_document(&fs::read_to_string(&path).unwrap()).unwrap();
        doc["archived"] = serde_json::json!(false);
        fs::write(&path, doc.to_string()).unwrap();

        let loaded: Project = load(&path).unwrap();
        assert_eq!(loaded, project);
        // the extra key is content the in-memory copy does not have
        assert!(is_dirty(&loaded));
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("missing").join("project.json");

        let mut project = Project::create("TT", "TaskTracker").unwrap();
        let result = save(&mut project, &path);
        assert!(matches!(result, Err(TrackerError::Save { .. })));
        assert!(project.source_file().is_none());
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ticket.json");

        let mut ticket = Ticket::create(uuid::Uuid::new_v4(), 1, "A ticket").unwrap();
        save(&mut ticket, &path).unwrap();
        save(&mut ticket, &path).unwrap();

        let names: Vec<String> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["ticket.json".to_string()]);
    }
}
