//! Defect size calculation.
//!
//! The defect size is the post-excision wound diameter in millimetres. It drives both the billing
//! bracket lookup and the figures quoted in the generated notes.
//!
//! Measurement fields arrive as the strings typed into the capture form and are parsed leniently:
//! anything unparseable counts as zero so that live previews never fail while a value is still
//! being typed.

use crate::lesion::Lesion;

/// Parses a millimetre value leniently.
///
/// The longest leading numeric prefix is used (`"8mm"` reads as 8). Blank, unparseable,
/// negative and non-finite input all read as 0.
pub fn parse_mm(raw: &str) -> f64 {
    let trimmed = raw.trim();
    let prefix_len = trimmed
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || *c == '.' || (*i == 0 && *c == '+'))
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0);

    match trimmed[..prefix_len].parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => value,
        _ => 0.0,
    }
}

/// Computes the defect size for a lesion.
///
/// 1. Billing-only entries use the final size typed by the operator; when that field was never
///    captured the stored `defect_size` is kept.
/// 2. Punch biopsies remove exactly the punch diameter.
/// 3. Everything else is the longer axis plus the margin on both sides.
pub fn compute_defect_size(lesion: &Lesion) -> f64 {
    if lesion.billing_only {
        return match &lesion.final_defect_size {
            Some(raw) => parse_mm(raw),
            None => lesion.defect_size.max(0.0),
        };
    }

    if lesion.is_punch_biopsy() {
        return parse_mm(&lesion.punch_size);
    }

    let length = parse_mm(&lesion.length);
    let width = parse_mm(&lesion.width);
    let margin = parse_mm(&lesion.margin);
    length.max(width) + 2.0 * margin
}

/// Formats a millimetre value without trailing zeros (`8`, `2.5`).
pub fn format_mm(value: f64) -> String {
    let text = format!("{:.2}", value);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}
