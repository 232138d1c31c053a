//! Procedure records and their billing lifecycle.
//!
//! A [`ProcedureRecord`] is the persisted unit of work: one patient visit with its lesions. The
//! record moves through billing states:
//!
//! ```text
//! Unprocessed --bill--> Billed --archive--> Archived
//! Unprocessed --delete--> Deleted (kept in the archive folder)
//! ```
//!
//! No transition leaves `Archived` or `Deleted`. The store performs the file moves; the valid
//! transition set is decided here.

use crate::constants::{ARCHIVED_DIR_NAME, BILLED_DIR_NAME, UNPROCESSED_DIR_NAME};
use crate::error::{CoreError, CoreResult};
use crate::lesion::Lesion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Billing state of a procedure record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    #[default]
    Unprocessed,
    Billed,
    Archived,
    /// Tombstone for a record deleted by the doctor; never physically erased.
    Deleted,
}

/// Storage folder a record lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Folder {
    Unprocessed,
    Billed,
    Archived,
}

/// Lifecycle step requested by a doctor or practice manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Bill,
    Archive,
    Delete,
}

impl RecordStatus {
    /// Returns the status reached by applying `transition`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::LifecycleViolation` for any pair outside the allowed set.
    pub fn apply(self, transition: Transition) -> CoreResult<RecordStatus> {
        match (self, transition) {
            (RecordStatus::Unprocessed, Transition::Bill) => Ok(RecordStatus::Billed),
            (RecordStatus::Billed, Transition::Archive) => Ok(RecordStatus::Archived),
            (RecordStatus::Unprocessed, Transition::Delete) => Ok(RecordStatus::Deleted),
            (from, transition) => Err(CoreError::LifecycleViolation { from, transition }),
        }
    }

    pub fn folder(self) -> Folder {
        match self {
            RecordStatus::Unprocessed => Folder::Unprocessed,
            RecordStatus::Billed => Folder::Billed,
            RecordStatus::Archived | RecordStatus::Deleted => Folder::Archived,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RecordStatus::Archived | RecordStatus::Deleted)
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RecordStatus::Unprocessed => "Unprocessed",
            RecordStatus::Billed => "Billed",
            RecordStatus::Archived => "Archived",
            RecordStatus::Deleted => "Deleted",
        };
        f.write_str(label)
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Transition::Bill => "bill",
            Transition::Archive => "archive",
            Transition::Delete => "delete",
        };
        f.write_str(label)
    }
}

impl Folder {
    pub const ALL: [Folder; 3] = [Folder::Unprocessed, Folder::Billed, Folder::Archived];

    pub fn dir_name(self) -> &'static str {
        match self {
            Folder::Unprocessed => UNPROCESSED_DIR_NAME,
            Folder::Billed => BILLED_DIR_NAME,
            Folder::Archived => ARCHIVED_DIR_NAME,
        }
    }
}

impl std::fmt::Display for Folder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl std::str::FromStr for Folder {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Folder::ALL
            .into_iter()
            .find(|folder| folder.dir_name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| CoreError::InvalidInput(format!("unknown folder: {trimmed}")))
    }
}

/// Persisted procedure record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcedureRecord {
    /// Creation timestamp in milliseconds; identifies the canonical file.
    pub procedure_id: i64,
    #[serde(default)]
    pub doctor_code: String,
    #[serde(default)]
    pub patient_name: String,
    pub procedure_date: DateTime<Utc>,
    #[serde(default)]
    pub lesions: Vec<Lesion>,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default)]
    pub consult_item: String,
    #[serde(default)]
    pub billing_comment: String,
}

impl ProcedureRecord {
    /// A new, empty, unprocessed record stamped with `now`.
    pub fn new(
        doctor_code: impl Into<String>,
        patient_name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            procedure_id: now.timestamp_millis(),
            doctor_code: doctor_code.into(),
            patient_name: patient_name.into(),
            procedure_date: now,
            lesions: Vec::new(),
            status: RecordStatus::Unprocessed,
            consult_item: String::new(),
            billing_comment: String::new(),
        }
    }

    /// Applies a lifecycle transition to this record.
    ///
    /// A non-blank `comment` replaces the billing comment. Deletion requires one, since the
    /// tombstone has to say why the record was withdrawn.
    pub fn apply_transition(
        &mut self,
        transition: Transition,
        comment: Option<&str>,
    ) -> CoreResult<()> {
        let comment = comment.map(str::trim).filter(|c| !c.is_empty());
        if transition == Transition::Delete && comment.is_none() {
            return Err(CoreError::InvalidInput(
                "a comment is required to delete a procedure record".into(),
            ));
        }

        self.status = self.status.apply(transition)?;
        if let Some(comment) = comment {
            self.billing_comment = comment.to_string();
        }
        Ok(())
    }

    pub fn to_json(&self) -> CoreResult<String> {
        serde_json::to_string_pretty(self).map_err(CoreError::Serialization)
    }

    pub fn from_json(text: &str) -> CoreResult<Self> {
        serde_json::from_str(text).map_err(CoreError::Deserialization)
    }
}
