//! Folder-per-state procedure record storage.
//!
//! [`ProcedureStore`] owns a root directory with one sub-folder per [`Folder`]. Each record is
//! stored at `<root>/<Folder>/<procedureId>.json`. The store applies lifecycle transitions via
//! `excision-core` and performs the corresponding file moves; it holds no state beyond the root
//! path, so several stores over the same root see the same records.

use crate::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use excision_core::{Folder, ProcedureRecord, Transition};
use std::fs;
use std::path::{Path, PathBuf};

const RECORD_EXTENSION: &str = "json";

/// Directory-backed store of procedure records.
#[derive(Debug, Clone)]
pub struct ProcedureStore {
    /// Canonicalised root containing the three state folders
    root_directory: PathBuf,
}

impl ProcedureStore {
    /// Opens a store rooted at `root_directory`, creating it and its state folders if needed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if:
    /// - The root path exists but is not a directory
    /// - The root or a state folder cannot be created (I/O)
    /// - Path canonicalisation fails
    pub fn open(root_directory: &Path) -> StoreResult<Self> {
        if root_directory.exists() && !root_directory.is_dir() {
            return Err(StoreError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                root_directory.display()
            )));
        }

        fs::create_dir_all(root_directory).map_err(|e| {
            StoreError::InvalidRootDirectory(format!(
                "Cannot create {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        let root_directory = root_directory.canonicalize().map_err(|e| {
            StoreError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        for folder in Folder::ALL {
            fs::create_dir_all(root_directory.join(folder.dir_name()))?;
        }

        tracing::debug!("opened procedure store at {}", root_directory.display());
        Ok(Self { root_directory })
    }

    #[must_use]
    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    /// Lists the records in a folder, newest first.
    ///
    /// Files that cannot be read or parsed are logged and skipped so one damaged file does not
    /// hide the rest of the folder.
    pub fn list(&self, folder: Folder) -> StoreResult<Vec<ProcedureRecord>> {
        let mut records = Vec::new();

        for entry in fs::read_dir(self.folder_dir(folder))?.flatten() {
            let path = entry.path();
            if !path.is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION)
            {
                continue;
            }

            match read_record(&path) {
                Ok(record) => records.push(record),
                Err(err) => tracing::warn!("skipping unreadable procedure file: {err}"),
            }
        }

        records.sort_by(|a, b| b.procedure_id.cmp(&a.procedure_id));
        Ok(records)
    }

    /// Loads one record from a folder.
    pub fn load(&self, folder: Folder, procedure_id: i64) -> StoreResult<ProcedureRecord> {
        let path = self.record_path(folder, procedure_id);
        if !path.is_file() {
            return Err(StoreError::ProcedureNotFound {
                folder,
                id: procedure_id,
            });
        }
        read_record(&path)
    }

    /// Searches every folder for a record, returning it with the folder it was found in.
    pub fn find(&self, procedure_id: i64) -> StoreResult<(Folder, ProcedureRecord)> {
        for folder in Folder::ALL {
            if self.record_path(folder, procedure_id).is_file() {
                return Ok((folder, self.load(folder, procedure_id)?));
            }
        }
        Err(StoreError::ProcedureNotFound {
            folder: Folder::Unprocessed,
            id: procedure_id,
        })
    }

    /// Writes a new record into the folder for its status.
    pub fn save_new(&self, record: &ProcedureRecord) -> StoreResult<PathBuf> {
        let path = self.record_path(record.status.folder(), record.procedure_id);
        write_record(&path, record)?;
        tracing::info!(
            "saved procedure {} to {}",
            record.procedure_id,
            record.status.folder()
        );
        Ok(path)
    }

    /// Saves an edited record that was loaded from `folder` under `original_id`.
    ///
    /// If the doctor changed, the edit is stored as a new record with an id allocated from `now`
    /// and the original file is left untouched. Otherwise the original file is overwritten in
    /// place. Returns the record as written.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ClosedRecord` when the original is archived or deleted, and
    /// `StoreError::ProcedureNotFound` when it does not exist.
    pub fn save_edit(
        &self,
        folder: Folder,
        original_id: i64,
        mut edited: ProcedureRecord,
        now: DateTime<Utc>,
    ) -> StoreResult<ProcedureRecord> {
        let original = self.load(folder, original_id)?;
        if original.status.is_terminal() {
            return Err(StoreError::ClosedRecord(original_id));
        }

        if edited.doctor_code.trim() != original.doctor_code.trim() {
            let mut procedure_id = now.timestamp_millis();
            while self.exists(procedure_id) {
                procedure_id += 1;
            }
            edited.procedure_id = procedure_id;
            edited.procedure_date = now;
            tracing::info!(
                "doctor changed on procedure {original_id}; saving as new procedure {procedure_id}"
            );
        } else {
            edited.procedure_id = original_id;
        }

        edited.status = original.status;
        write_record(&self.record_path(folder, edited.procedure_id), &edited)?;
        Ok(edited)
    }

    /// Applies a lifecycle transition to a stored record and moves it to its new folder.
    ///
    /// A non-blank `comment` replaces the billing comment; deletion requires one.
    pub fn transition(
        &self,
        folder: Folder,
        procedure_id: i64,
        transition: Transition,
        comment: Option<&str>,
    ) -> StoreResult<ProcedureRecord> {
        let mut record = self.load(folder, procedure_id)?;
        record.apply_transition(transition, comment)?;
        self.commit(folder, &record)?;
        Ok(record)
    }

    /// Writes a record into the folder for its status and removes it from `source` if that
    /// differs.
    ///
    /// Used after a status change made outside the store, e.g. billing finalised in an editing
    /// session. The target file is written before the source file is removed.
    pub fn commit(&self, source: Folder, record: &ProcedureRecord) -> StoreResult<PathBuf> {
        let target = record.status.folder();
        let target_path = self.record_path(target, record.procedure_id);
        write_record(&target_path, record)?;

        if target != source {
            let source_path = self.record_path(source, record.procedure_id);
            if source_path.is_file() {
                fs::remove_file(&source_path)?;
            }
            tracing::info!(
                "moved procedure {} from {source} to {target} ({})",
                record.procedure_id,
                record.status
            );
        }
        Ok(target_path)
    }

    fn exists(&self, procedure_id: i64) -> bool {
        Folder::ALL
            .into_iter()
            .any(|folder| self.record_path(folder, procedure_id).is_file())
    }

    fn folder_dir(&self, folder: Folder) -> PathBuf {
        self.root_directory.join(folder.dir_name())
    }

    fn record_path(&self, folder: Folder, procedure_id: i64) -> PathBuf {
        self.folder_dir(folder)
            .join(format!("{procedure_id}.{RECORD_EXTENSION}"))
    }
}

fn read_record(path: &Path) -> StoreResult<ProcedureRecord> {
    let contents = fs::read_to_string(path)?;
    ProcedureRecord::from_json(&contents).map_err(|source| StoreError::Deserialization {
        path: path.to_path_buf(),
        source,
    })
}

fn write_record(path: &Path, record: &ProcedureRecord) -> StoreResult<()> {
    let json = record.to_json()?;
    fs::write(path, json).map_err(|e| {
        StoreError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to write procedure file {}: {}", path.display(), e),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use excision_core::{CoreError, Lesion, Procedure, RecordStatus};
    use tempfile::TempDir;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 9, minute, 0).unwrap()
    }

    fn record(minute: u32) -> ProcedureRecord {
        let mut record = ProcedureRecord::new("Dr Avery", "Jordan Blake", at(minute));
        record.lesions.push(Lesion {
            id: 1,
            location: "Left forearm".into(),
            ..Lesion::new(Procedure::Excision)
        });
        record
    }

    fn store() -> (TempDir, ProcedureStore) {
        let temp = TempDir::new().unwrap();
        let store = ProcedureStore::open(&temp.path().join("procedure_data")).unwrap();
        (temp, store)
    }

    #[test]
    fn test_open_creates_state_folders() {
        let (_temp, store) = store();
        for folder in Folder::ALL {
            assert!(store.root_directory().join(folder.dir_name()).is_dir());
        }
    }

    #[test]
    fn test_open_rejects_file_root() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("not_a_dir");
        fs::write(&file, "x").unwrap();
        assert!(matches!(
            ProcedureStore::open(&file),
            Err(StoreError::InvalidRootDirectory(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let (_temp, store) = store();
        let original = record(0);
        let path = store.save_new(&original).unwrap();

        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some(format!("{}.json", original.procedure_id).as_str())
        );
        let loaded = store.load(Folder::Unprocessed, original.procedure_id).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_load_missing() {
        let (_temp, store) = store();
        assert!(matches!(
            store.load(Folder::Billed, 42),
            Err(StoreError::ProcedureNotFound { id: 42, .. })
        ));
        assert!(matches!(
            store.find(42),
            Err(StoreError::ProcedureNotFound { id: 42, .. })
        ));
    }

    #[test]
    fn test_list_newest_first_and_skips_bad_files() {
        let (_temp, store) = store();
        store.save_new(&record(1)).unwrap();
        store.save_new(&record(3)).unwrap();
        store.save_new(&record(2)).unwrap();

        let dir = store.root_directory().join("Unprocessed");
        fs::write(dir.join("broken.json"), "{ not json").unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let ids: Vec<i64> = store
            .list(Folder::Unprocessed)
            .unwrap()
            .iter()
            .map(|r| r.procedure_id)
            .collect();
        assert_eq!(
            ids,
            vec![
                at(3).timestamp_millis(),
                at(2).timestamp_millis(),
                at(1).timestamp_millis()
            ]
        );
    }

    #[test]
    fn test_edit_same_doctor_overwrites_in_place() {
        let (_temp, store) = store();
        let original = record(0);
        store.save_new(&original).unwrap();

        let mut edited = original.clone();
        edited.patient_name = "Jordan A. Blake".into();
        let saved = store
            .save_edit(Folder::Unprocessed, original.procedure_id, edited, at(30))
            .unwrap();

        assert_eq!(saved.procedure_id, original.procedure_id);
        let listed = store.list(Folder::Unprocessed).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].patient_name, "Jordan A. Blake");
    }

    #[test]
    fn test_edit_doctor_change_forks_new_record() {
        let (_temp, store) = store();
        let original = record(0);
        store.save_new(&original).unwrap();

        let mut edited = original.clone();
        edited.doctor_code = "Dr Okafor".into();
        let saved = store
            .save_edit(Folder::Unprocessed, original.procedure_id, edited, at(30))
            .unwrap();

        assert_eq!(saved.procedure_id, at(30).timestamp_millis());
        assert_eq!(saved.procedure_date, at(30));

        let untouched = store.load(Folder::Unprocessed, original.procedure_id).unwrap();
        assert_eq!(untouched, original);
        assert_eq!(store.list(Folder::Unprocessed).unwrap().len(), 2);
    }

    #[test]
    fn test_fork_id_avoids_collision() {
        let (_temp, store) = store();
        let original = record(0);
        store.save_new(&original).unwrap();

        let mut edited = original.clone();
        edited.doctor_code = "Dr Okafor".into();
        let saved = store
            .save_edit(Folder::Unprocessed, original.procedure_id, edited, at(0))
            .unwrap();
        assert_eq!(saved.procedure_id, original.procedure_id + 1);
    }

    #[test]
    fn test_bill_then_archive_moves_files() {
        let (_temp, store) = store();
        let original = record(0);
        let id = original.procedure_id;
        store.save_new(&original).unwrap();

        let billed = store
            .transition(Folder::Unprocessed, id, Transition::Bill, Some("bulk billed"))
            .unwrap();
        assert_eq!(billed.status, RecordStatus::Billed);
        assert_eq!(billed.billing_comment, "bulk billed");
        assert!(store.list(Folder::Unprocessed).unwrap().is_empty());
        assert_eq!(store.find(id).unwrap().0, Folder::Billed);

        store
            .transition(Folder::Billed, id, Transition::Archive, None)
            .unwrap();
        let (folder, archived) = store.find(id).unwrap();
        assert_eq!(folder, Folder::Archived);
        assert_eq!(archived.status, RecordStatus::Archived);
        assert_eq!(archived.billing_comment, "bulk billed");
        assert!(store.list(Folder::Billed).unwrap().is_empty());
    }

    #[test]
    fn test_delete_keeps_tombstone() {
        let (_temp, store) = store();
        let original = record(0);
        let id = original.procedure_id;
        store.save_new(&original).unwrap();

        assert!(matches!(
            store.transition(Folder::Unprocessed, id, Transition::Delete, Some("  ")),
            Err(StoreError::Core(CoreError::InvalidInput(_)))
        ));
        assert_eq!(store.find(id).unwrap().0, Folder::Unprocessed);

        store
            .transition(Folder::Unprocessed, id, Transition::Delete, Some("duplicate entry"))
            .unwrap();
        let tombstone = store.load(Folder::Archived, id).unwrap();
        assert_eq!(tombstone.status, RecordStatus::Deleted);
        assert_eq!(tombstone.billing_comment, "duplicate entry");
        assert_eq!(tombstone.lesions.len(), 1);
    }

    #[test]
    fn test_invalid_transition_leaves_files_alone() {
        let (_temp, store) = store();
        let original = record(0);
        let id = original.procedure_id;
        store.save_new(&original).unwrap();

        assert!(matches!(
            store.transition(Folder::Unprocessed, id, Transition::Archive, None),
            Err(StoreError::Core(CoreError::LifecycleViolation { .. }))
        ));
        assert_eq!(store.find(id).unwrap().0, Folder::Unprocessed);
    }

    #[test]
    fn test_closed_records_cannot_be_edited() {
        let (_temp, store) = store();
        let original = record(0);
        let id = original.procedure_id;
        store.save_new(&original).unwrap();
        store
            .transition(Folder::Unprocessed, id, Transition::Delete, Some("wrong patient"))
            .unwrap();

        let edited = store.load(Folder::Archived, id).unwrap();
        assert!(matches!(
            store.save_edit(Folder::Archived, id, edited, at(5)),
            Err(StoreError::ClosedRecord(_))
        ));
    }

    #[test]
    fn test_commit_after_external_status_change() {
        let (_temp, store) = store();
        let mut record = record(0);
        store.save_new(&record).unwrap();

        record.apply_transition(Transition::Bill, None).unwrap();
        store.commit(Folder::Unprocessed, &record).unwrap();

        assert!(store.list(Folder::Unprocessed).unwrap().is_empty());
        assert_eq!(store.list(Folder::Billed).unwrap(), vec![record]);
    }
}
