//! Constants used throughout the excision core crate.
//!
//! Folder names, placeholder texts and numeric sentinels live here so that the store, the
//! composer and the CLI agree on them.

/// Default directory for procedure records when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "procedure_data";

/// Folder holding records that have not yet been coded.
pub const UNPROCESSED_DIR_NAME: &str = "Unprocessed";

/// Folder holding records with finalised billing codes.
pub const BILLED_DIR_NAME: &str = "Billed";

/// Folder holding archived and deleted (tombstoned) records.
pub const ARCHIVED_DIR_NAME: &str = "Archived";

/// A bracket with this `maxSize` has no upper bound.
pub const NO_UPPER_BOUND_MM: f64 = 999.0;

/// Audit text rendered for an empty lesion list.
pub const EMPTY_AUDIT_PLACEHOLDER: &str = "No lesions recorded.";

/// Operative note body rendered when every lesion is billing-only.
pub const NO_CLINICAL_NOTE: &str =
    "No clinical note: all lesions in this procedure were entered for billing only.";

/// Follow-up advice appended when any wound is left open.
pub const OPEN_WOUND_CARE: &str =
    "Keep the open wound clean and covered with a moist dressing until fully healed.";

/// Separator used when joining procedure item numbers.
pub const ITEM_SEPARATOR: &str = ", ";

pub(crate) const BUILTIN_CODE_TABLE: &str = include_str!("../config/code_table.yaml");
pub(crate) const BUILTIN_REGION_TABLE: &str = include_str!("../config/regions.yaml");
pub(crate) const BUILTIN_PATHOLOGY_TABLE: &str = include_str!("../config/pathology.yaml");
