//! Free-text rendering of a lesion list.
//!
//! Two independent renderers run over the same lesions:
//! - [`render_audit_line`] produces the compact billing/audit request, one line per lesion.
//! - [`render_operative_note`] produces the clinical operative note.
//!
//! Both are pure functions of their input and never fail; missing attributes simply omit the
//! clause that would have described them.

mod audit;
mod note;

pub use audit::{management_code, render_audit_line};
pub use note::render_operative_note;

use crate::constants::EMPTY_AUDIT_PLACEHOLDER;

/// Joins the audit text and operative note for copying as one block.
///
/// When the audit text is the empty-list placeholder only the note is returned.
pub fn combined_output(audit: &str, note: &str) -> String {
    if audit == EMPTY_AUDIT_PLACEHOLDER {
        return note.to_string();
    }
    format!("{audit}\n\n{note}")
}
