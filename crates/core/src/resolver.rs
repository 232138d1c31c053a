//! Billing code resolution.
//!
//! The resolver proposes defaults; the operator has the final say. For each lesion a
//! [`BillingSelection`] holds the candidate codes, which of them are toggled on, and produces the
//! comma-joined procedure item string written to the record when billing is finalised.

use crate::code_table::{CodeEntry, CodeTable, HistologyClass, RegionClass, RepairCodeEntry};
use crate::constants::ITEM_SEPARATOR;
use crate::lesion::{ClosureType, Lesion};
use crate::regions::RegionTable;

/// Selects the excision code for a defect.
///
/// Biopsy always resolves to the fixed biopsy code. Other classes scan the ascending brackets for
/// the histology/region pair and return the first whose `max_size` covers `defect_size`. An
/// unconfigured combination, an unknown region, or a defect larger than every bracket yields
/// `None`, which callers treat as "no automatic suggestion".
pub fn resolve_excision_code(
    table: &CodeTable,
    histology: HistologyClass,
    region: Option<RegionClass>,
    defect_size: f64,
) -> Option<&CodeEntry> {
    if histology == HistologyClass::Biopsy {
        return table.biopsy();
    }

    let region = region?;
    table
        .brackets(histology, region)
        .iter()
        .find(|bracket| bracket.max_size >= defect_size)
}

/// A repair code offered for selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepairCandidate {
    pub entry: RepairCodeEntry,
    pub selected: bool,
}

/// An excision code offered for selection.
#[derive(Clone, Debug, PartialEq)]
pub struct ExcisionCandidate {
    pub entry: CodeEntry,
    pub selected: bool,
}

/// Surfaces every repair code, pre-selecting those matching the recorded closure.
///
/// A Graft + Flap closure also matches the separate graft and flap repair entries, so both
/// repairs are proposed together.
pub fn resolve_repair_codes(
    entries: &[RepairCodeEntry],
    closure: Option<&ClosureType>,
) -> Vec<RepairCandidate> {
    entries
        .iter()
        .map(|entry| RepairCandidate {
            entry: entry.clone(),
            selected: closure.is_some_and(|closure| closure_matches(&entry.clinical_type, closure)),
        })
        .collect()
}

fn closure_matches(clinical_type: &str, closure: &ClosureType) -> bool {
    let clinical_type = clinical_type.trim();
    if clinical_type.is_empty() {
        return false;
    }
    if clinical_type == closure.as_label() {
        return true;
    }
    *closure == ClosureType::GraftAndFlap
        && (clinical_type == ClosureType::GraftRepair.as_label()
            || clinical_type == ClosureType::FlapRepair.as_label())
}

/// Joins the excision code and selected repair codes with `", "`, skipping blanks.
pub fn merge_selection(excision: Option<&str>, repairs: &[&str]) -> String {
    excision
        .into_iter()
        .chain(repairs.iter().copied())
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect::<Vec<_>>()
        .join(ITEM_SEPARATOR)
}

/// Operator's code selection for one lesion.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BillingSelection {
    histology: Option<HistologyClass>,
    excision: Vec<ExcisionCandidate>,
    repair: Vec<RepairCandidate>,
}

impl BillingSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn histology(&self) -> Option<HistologyClass> {
        self.histology
    }

    pub fn excision_candidates(&self) -> &[ExcisionCandidate] {
        &self.excision
    }

    pub fn repair_candidates(&self) -> &[RepairCandidate] {
        &self.repair
    }

    pub fn selected_excision(&self) -> Option<&CodeEntry> {
        self.excision
            .iter()
            .find(|candidate| candidate.selected)
            .map(|candidate| &candidate.entry)
    }

    pub fn selected_repairs(&self) -> impl Iterator<Item = &RepairCodeEntry> {
        self.repair
            .iter()
            .filter(|candidate| candidate.selected)
            .map(|candidate| &candidate.entry)
    }

    /// Chooses a histology classification.
    ///
    /// All previous choices are discarded and the default pre-selection for the new class is
    /// applied, so switching class never leaves codes from the previous one behind.
    pub fn select_histology(
        &mut self,
        histology: HistologyClass,
        lesion: &Lesion,
        table: &CodeTable,
        regions: &RegionTable,
    ) {
        self.clear();
        self.histology = Some(histology);

        let region = regions.class(&lesion.anatomical_region);
        let suggested = resolve_excision_code(table, histology, region, lesion.defect_size);

        let offered: Vec<CodeEntry> = if histology == HistologyClass::Biopsy {
            table.biopsy().cloned().into_iter().collect()
        } else {
            region
                .map(|region| table.brackets(histology, region).to_vec())
                .unwrap_or_default()
        };

        self.excision = offered
            .into_iter()
            .map(|entry| ExcisionCandidate {
                selected: suggested.is_some_and(|s| *s == entry),
                entry,
            })
            .collect();

        if histology != HistologyClass::Biopsy {
            self.repair = resolve_repair_codes(
                table.repair_entries(),
                lesion.excision_closure_type.as_ref(),
            );
        }

        if suggested.is_none() {
            tracing::debug!(
                "no excision suggestion for lesion {} ({histology}, region '{}', {}mm)",
                lesion.id,
                lesion.anatomical_region,
                lesion.defect_size
            );
        }
    }

    /// Re-applies defaults for the current histology after the lesion or table changed.
    pub fn refresh(&mut self, lesion: &Lesion, table: &CodeTable, regions: &RegionTable) {
        if let Some(histology) = self.histology {
            self.select_histology(histology, lesion, table, regions);
        }
    }

    /// Toggles an excision code. Only one excision code is selected at a time.
    ///
    /// Returns `false` when `item` is not a candidate.
    pub fn toggle_excision(&mut self, item: &str) -> bool {
        let item = item.trim();
        let Some(index) = self.excision.iter().position(|c| c.entry.item == item) else {
            return false;
        };

        let turn_on = !self.excision[index].selected;
        for (i, candidate) in self.excision.iter_mut().enumerate() {
            candidate.selected = turn_on && i == index;
        }
        true
    }

    /// Toggles a repair code. Any number of repair codes may be selected.
    ///
    /// Returns `false` when `item` is not a candidate.
    pub fn toggle_repair(&mut self, item: &str) -> bool {
        let item = item.trim();
        match self.repair.iter_mut().find(|c| c.entry.item == item) {
            Some(candidate) => {
                candidate.selected = !candidate.selected;
                true
            }
            None => false,
        }
    }

    /// Discards the histology and every candidate.
    pub fn clear(&mut self) {
        self.histology = None;
        self.excision.clear();
        self.repair.clear();
    }

    /// The comma-joined item string for the current selection.
    pub fn procedure_item_number(&self) -> String {
        let repairs: Vec<&str> = self.selected_repairs().map(|e| e.item.as_str()).collect();
        merge_selection(
            self.selected_excision().map(|e| e.item.as_str()),
            &repairs,
        )
    }
}
