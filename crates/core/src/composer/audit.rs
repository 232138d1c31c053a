//! Audit/billing request line.
//!
//! One line per lesion, for example:
//!
//! ```text
//! 1. Left forearm; BCC, SK; ex NMSC; E; D=Yes [Excision, 8x6mm, Margin: 3mm, Dia: 14.00mm], Suture: 12 o'clock
//! ```

use crate::constants::EMPTY_AUDIT_PLACEHOLDER;
use crate::defect::{compute_defect_size, format_mm, parse_mm};
use crate::lesion::{ClosureType, GraftType, Lesion, Procedure, PunchType};

/// Short token summarising the procedure and closure.
///
/// Anything without a specific mapping, including an excision with an unrecorded or unknown
/// closure type, is reported as `O` (other).
pub fn management_code(lesion: &Lesion) -> &'static str {
    match &lesion.procedure {
        Procedure::Excision => match &lesion.excision_closure_type {
            Some(ClosureType::Ellipse) => "E",
            Some(ClosureType::FlapRepair) => "F",
            Some(ClosureType::GraftRepair) => match &lesion.graft_type {
                Some(GraftType::SplitSkin) => "SSG",
                Some(GraftType::FullThickness) => "FTG",
                Some(GraftType::Other(_)) | None => "O",
            },
            Some(ClosureType::GraftAndFlap) => match &lesion.graft_type {
                Some(GraftType::SplitSkin) => "SSG+F",
                Some(GraftType::FullThickness) => "FTG+F",
                Some(GraftType::Other(_)) | None => "O",
            },
            Some(ClosureType::SecondaryIntention) => "NC",
            Some(ClosureType::Other(_)) | None => "O",
        },
        Procedure::Punch => match &lesion.punch_type {
            Some(PunchType::PunchBiopsy) => "PS",
            Some(PunchType::PunchExcision) | Some(PunchType::Other(_)) | None => "PR",
        },
        Procedure::Shave => "SxEx",
        Procedure::Other(_) => "O",
    }
}

/// Name of the procedure as shown inside the bracketed detail clause.
pub(crate) fn procedure_name(lesion: &Lesion) -> &str {
    match (&lesion.procedure, &lesion.punch_type) {
        (Procedure::Punch, Some(punch_type)) => punch_type.as_label(),
        (procedure, _) => procedure.as_label(),
    }
}

/// Renders the audit text for a lesion list, one line per lesion.
///
/// An empty list renders [`EMPTY_AUDIT_PLACEHOLDER`] rather than an empty string.
pub fn render_audit_line(lesions: &[Lesion]) -> String {
    if lesions.is_empty() {
        return EMPTY_AUDIT_PLACEHOLDER.to_string();
    }

    lesions
        .iter()
        .map(audit_line_for)
        .collect::<Vec<_>>()
        .join("\n")
}

fn audit_line_for(lesion: &Lesion) -> String {
    let mut segments: Vec<String> = Vec::new();

    let location = lesion.location.trim();
    if !location.is_empty() {
        segments.push(location.to_string());
    }

    let codes = lesion.pathology_codes();
    if !codes.is_empty() {
        segments.push(codes.join(", "));
    }
    if lesion.exclude_nmsc {
        segments.push("ex NMSC".to_string());
    }
    if lesion.exclude_melanoma {
        segments.push("ex MEL".to_string());
    }

    segments.push(management_code(lesion).to_string());

    let dermoscopy = lesion.dermoscopy_used.trim();
    if !dermoscopy.is_empty() {
        segments.push(format!("D={dermoscopy}"));
    }

    let mut line = format!("{}. {}", lesion.id, segments.join("; "));
    line.push_str(&format!(" [{}]", detail_clause(lesion).join(", ")));

    if let Some(orientation) = orientation_clause(lesion) {
        line.push_str(", ");
        line.push_str(&orientation);
    }

    line
}

fn detail_clause(lesion: &Lesion) -> Vec<String> {
    let mut parts = vec![procedure_name(lesion).to_string()];
    let diameter = compute_defect_size(lesion);

    if !lesion.billing_only {
        if lesion.is_punch_biopsy() {
            let punch = parse_mm(&lesion.punch_size);
            if punch > 0.0 {
                parts.push(format!("Punch: {}mm", format_mm(punch)));
            }
        } else {
            let length = parse_mm(&lesion.length);
            let width = parse_mm(&lesion.width);
            if length > 0.0 || width > 0.0 {
                parts.push(format!("{}x{}mm", format_mm(length), format_mm(width)));
            }
            if !lesion.margin.trim().is_empty() {
                parts.push(format!("Margin: {}mm", format_mm(parse_mm(&lesion.margin))));
            }
        }
    }

    if diameter > 0.0 {
        parts.push(format!("Dia: {:.2}mm", diameter));
    }
    parts
}

fn orientation_clause(lesion: &Lesion) -> Option<String> {
    let kind = lesion
        .orientation_type
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())?;

    match lesion
        .orientation_description
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        Some(description) => Some(format!("{kind}: {description}")),
        None => Some(kind.to_string()),
    }
}
