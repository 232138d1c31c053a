//! # Excision Core
//!
//! Core business logic for recording skin-lesion excisions.
//!
//! This crate contains pure data operations:
//! - Lesion and procedure record model with its JSON wire format
//! - Defect size calculation and billing code resolution against a configurable code table
//! - Rendering of the audit/billing line and the operative note
//! - The procedure record lifecycle (Unprocessed, Billed, Archived, Deleted)
//! - An editing session that keeps the rendered texts in step with the lesion list
//!
//! **No storage or UI concerns**: reading and writing record files belongs in `excision-store`,
//! the command line in `excision-cli`.

pub mod code_table;
pub mod composer;
pub mod config;
pub mod constants;
pub mod defect;
pub mod error;
pub mod lesion;
pub mod procedure;
pub mod regions;
pub mod resolver;
pub mod session;

pub use code_table::{CodeEntry, CodeTable, HistologyClass, RegionClass, RepairCodeEntry};
pub use composer::{combined_output, management_code, render_audit_line, render_operative_note};
pub use config::{ClinicConfig, ConfigFormat};
pub use defect::{compute_defect_size, parse_mm};
pub use error::{CoreError, CoreResult};
pub use lesion::{ClosureType, GraftType, Lesion, Procedure, PunchType, SkinSuture};
pub use procedure::{Folder, ProcedureRecord, RecordStatus, Transition};
pub use regions::{PathologyTable, RegionTable};
pub use resolver::{
    merge_selection, resolve_excision_code, resolve_repair_codes, BillingSelection,
    ExcisionCandidate, RepairCandidate,
};
pub use session::EditingSession;
