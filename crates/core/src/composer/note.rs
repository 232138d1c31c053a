//! Operative note.
//!
//! The note is a plain-text clinical narrative: a patient/doctor header, one block per clinical
//! lesion, then a consolidated follow-up section. Billing-only lesions are left out entirely.

use crate::constants::{NO_CLINICAL_NOTE, OPEN_WOUND_CARE};
use crate::defect::{compute_defect_size, format_mm, parse_mm};
use crate::lesion::{
    join_non_blank, ClosureType, GraftType, Lesion, Procedure, PunchType, SkinSuture,
};
use crate::regions::{PathologyTable, RegionTable};

/// Renders the operative note for a procedure.
///
/// Absent optional attributes omit their clause. When no lesion carries a full clinical record
/// the header is followed by [`NO_CLINICAL_NOTE`].
pub fn render_operative_note(
    lesions: &[Lesion],
    patient_name: &str,
    doctor_name: &str,
    regions: &RegionTable,
    pathology: &PathologyTable,
) -> String {
    let mut note = format!(
        "PATIENT: {}\nDOCTOR: {}\n",
        patient_name.trim(),
        doctor_name.trim()
    );

    let clinical: Vec<&Lesion> = lesions.iter().filter(|l| !l.billing_only).collect();
    if clinical.is_empty() {
        note.push('\n');
        note.push_str(NO_CLINICAL_NOTE);
        note.push('\n');
        return note;
    }

    for lesion in &clinical {
        note.push('\n');
        note.push_str(&lesion_block(lesion, regions, pathology));
    }

    let follow_up = follow_up_lines(&clinical);
    if !follow_up.is_empty() {
        note.push_str("\nFOLLOW UP\n");
        for line in follow_up {
            note.push_str(&line);
            note.push('\n');
        }
    }

    note
}

fn lesion_block(lesion: &Lesion, regions: &RegionTable, pathology: &PathologyTable) -> String {
    let mut block = format!("LESION {}: {}\n", lesion.id, procedure_title(lesion));

    let site = site_line(lesion, regions);
    if !site.is_empty() {
        block.push_str(&format!("Site: {site}\n"));
    }

    let anesthetic = lesion.anesthetic.trim();
    if !anesthetic.is_empty() {
        block.push_str(&format!("Anaesthetic: {anesthetic}\n"));
    }

    let findings = findings_sentences(lesion, pathology);
    if !findings.is_empty() {
        block.push_str(&format!("Findings: {}\n", findings.join(" ")));
    }

    let closure = closure_sentences(lesion);
    if !closure.is_empty() {
        block.push_str(&format!("Closure: {}\n", closure.join(" ")));
    }

    block.push_str(&format!("Specimen: {}\n", specimen_sentence(lesion)));
    block
}

fn procedure_title(lesion: &Lesion) -> String {
    match &lesion.procedure {
        Procedure::Excision => match &lesion.excision_closure_type {
            Some(ClosureType::Ellipse) => "Elliptical excision with primary closure".to_string(),
            Some(ClosureType::FlapRepair) => "Excision with flap repair".to_string(),
            Some(ClosureType::GraftRepair) => {
                format!("Excision with {} repair", graft_name(lesion.graft_type.as_ref()))
            }
            Some(ClosureType::GraftAndFlap) => format!(
                "Excision with flap and {} repair",
                graft_name(lesion.graft_type.as_ref())
            ),
            Some(ClosureType::SecondaryIntention) => {
                "Excision with healing by secondary intention".to_string()
            }
            Some(ClosureType::Other(label)) => format!("Excision with {} closure", label.trim()),
            None => "Excision".to_string(),
        },
        Procedure::Punch => match &lesion.punch_type {
            Some(PunchType::PunchBiopsy) => "Punch biopsy".to_string(),
            Some(PunchType::PunchExcision) => "Punch excision".to_string(),
            Some(PunchType::Other(label)) => label.trim().to_string(),
            None => "Punch procedure".to_string(),
        },
        Procedure::Shave => "Shave excision".to_string(),
        Procedure::Other(label) => label.trim().to_string(),
    }
}

fn graft_name(graft: Option<&GraftType>) -> String {
    match graft {
        Some(GraftType::Other(label)) if !label.trim().is_empty() => label.trim().to_lowercase(),
        Some(graft) => graft.as_label().to_lowercase(),
        None => "skin graft".to_string(),
    }
}

fn site_line(lesion: &Lesion, regions: &RegionTable) -> String {
    let location = lesion.location.trim();
    let region = regions.label(&lesion.anatomical_region).unwrap_or("").trim();

    match (location.is_empty(), region.is_empty()) {
        (false, false) => format!("{location} ({region})"),
        (false, true) => location.to_string(),
        (true, false) => region.to_string(),
        (true, true) => String::new(),
    }
}

fn findings_sentences(lesion: &Lesion, pathology: &PathologyTable) -> Vec<String> {
    let mut sentences = Vec::new();

    let diagnoses: Vec<&str> = lesion
        .pathology_codes()
        .into_iter()
        .map(|code| pathology.label(code))
        .collect();
    if !diagnoses.is_empty() {
        sentences.push(format!("Clinical diagnosis: {}.", diagnoses.join(", ")));
    }

    if lesion.is_punch_biopsy() {
        let punch = parse_mm(&lesion.punch_size);
        if punch > 0.0 {
            sentences.push(format!("A {}mm punch biopsy was taken.", format_mm(punch)));
        }
    } else {
        let length = parse_mm(&lesion.length);
        let width = parse_mm(&lesion.width);
        if length > 0.0 && width > 0.0 {
            sentences.push(format!(
                "Lesion measured {} x {}mm.",
                format_mm(length),
                format_mm(width)
            ));
        } else if length > 0.0 || width > 0.0 {
            sentences.push(format!("Lesion measured {}mm.", format_mm(length.max(width))));
        }

        let margin = parse_mm(&lesion.margin);
        if margin > 0.0 {
            sentences.push(format!("Excised with a {}mm margin.", format_mm(margin)));
        }

        let defect = compute_defect_size(lesion);
        if defect > 0.0 {
            sentences.push(format!("Resulting defect {}mm.", format_mm(defect)));
        }
    }

    let dermoscopy = lesion.dermoscopy_used.trim();
    if !dermoscopy.is_empty() {
        sentences.push(format!("Dermoscopy: {dermoscopy}."));
    }

    if let Some(justification) = lesion
        .justification
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        sentences.push(as_sentence(justification));
    }

    sentences
}

fn closure_sentences(lesion: &Lesion) -> Vec<String> {
    let mut sentences = Vec::new();

    match (&lesion.procedure, &lesion.excision_closure_type) {
        (Procedure::Excision, Some(ClosureType::Ellipse)) => {
            sentences.push("Defect closed directly as an ellipse.".to_string());
        }
        (Procedure::Excision, Some(ClosureType::FlapRepair)) => {
            sentences.push("Defect repaired with a local flap.".to_string());
        }
        (Procedure::Excision, Some(ClosureType::GraftRepair)) => {
            sentences.push(format!(
                "Defect repaired with a {}.",
                graft_name(lesion.graft_type.as_ref())
            ));
        }
        (Procedure::Excision, Some(ClosureType::GraftAndFlap)) => {
            sentences.push("Defect partly repaired with a local flap.".to_string());
            sentences.push(format!(
                "Remaining defect covered with a {}.",
                graft_name(lesion.graft_type.as_ref())
            ));
        }
        (Procedure::Excision, Some(ClosureType::SecondaryIntention)) => {
            sentences.push("Wound left to heal by secondary intention.".to_string());
        }
        (Procedure::Shave, _) => {
            sentences.push(
                "Haemostasis achieved; wound left to heal by secondary intention.".to_string(),
            );
        }
        _ => {}
    }

    if lesion.is_sutured() {
        if lesion.use_deep_suture {
            let deep = join_non_blank(&[&lesion.deep_suture_size, &lesion.deep_suture_type], " ");
            if deep.is_empty() {
                sentences.push("Deep layer closed with buried sutures.".to_string());
            } else {
                sentences.push(format!("Deep layer closed with {deep} buried sutures."));
            }
        }

        let description = lesion.skin_suture.description();
        let kind = if lesion.skin_suture.is_dissolvable() {
            "dissolvable"
        } else {
            "non-dissolvable"
        };
        if description.is_empty() {
            sentences.push(format!("Skin closed with {kind} sutures."));
        } else {
            sentences.push(format!("Skin closed with {description} {kind} sutures."));
        }
    }

    sentences
}

fn specimen_sentence(lesion: &Lesion) -> String {
    let label = join_non_blank(&[&lesion.id.to_string(), &lesion.location], ". ");
    let mut sentence = format!("Sent for histopathology labelled \"{label}\".");

    let kind = lesion
        .orientation_type
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let description = lesion
        .orientation_description
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    match (kind, description) {
        (Some(kind), Some(description)) => {
            sentence.push_str(&format!(
                " Orientation marked with {}: {description}.",
                kind.to_lowercase()
            ));
        }
        (Some(kind), None) => {
            sentence.push_str(&format!(" Orientation marked with {}.", kind.to_lowercase()));
        }
        (None, Some(description)) => {
            sentence.push_str(&format!(" Orientation: {description}."));
        }
        (None, None) => {}
    }

    sentence
}

fn follow_up_lines(clinical: &[&Lesion]) -> Vec<String> {
    let mut lines = Vec::new();

    for lesion in clinical.iter().filter(|l| l.is_sutured()) {
        let subject = match lesion.location.trim() {
            "" => format!("Lesion {}", lesion.id),
            location => format!("Lesion {} ({location})", lesion.id),
        };

        match &lesion.skin_suture {
            SkinSuture::Dissolvable { .. } => {
                lines.push(format!(
                    "{subject}: dissolvable sutures used; these do not require removal."
                ));
            }
            SkinSuture::NonDissolvable {
                skin_suture_removal,
                ..
            } => {
                let days = parse_mm(skin_suture_removal);
                if days > 0.0 {
                    let unit = if days == 1.0 { "day" } else { "days" };
                    lines.push(format!(
                        "{subject}: remove sutures in {} {unit}.",
                        format_mm(days)
                    ));
                } else {
                    lines.push(format!("{subject}: sutures require removal."));
                }
            }
        }
    }

    if clinical.iter().any(|l| l.heals_open()) {
        lines.push(OPEN_WOUND_CARE.to_string());
    }

    lines
}

fn as_sentence(text: &str) -> String {
    if text.ends_with(['.', '!', '?']) {
        text.to_string()
    } else {
        format!("{text}.")
    }
}
