//! Editing session.
//!
//! An [`EditingSession`] owns the procedure record being edited, the operator's code selection for
//! each lesion, and the most recent rendered texts. Every mutation finalises the affected lesions
//! (normalisation and defect size), re-resolves billing defaults where needed and re-renders both
//! texts before returning, so the derived output always matches the current lesion list.
//!
//! Billing defaults for a lesion are re-resolved only when an input to resolution changed: defect
//! size, anatomical region or closure type. Other edits keep the operator's code toggles.

use crate::code_table::HistologyClass;
use crate::composer::{combined_output, render_audit_line, render_operative_note};
use crate::config::ClinicConfig;
use crate::defect::compute_defect_size;
use crate::error::{CoreError, CoreResult};
use crate::lesion::{ClosureType, Lesion};
use crate::procedure::{ProcedureRecord, Transition};
use crate::resolver::BillingSelection;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Debug)]
pub struct EditingSession {
    config: Arc<ClinicConfig>,
    record: ProcedureRecord,
    selections: Vec<BillingSelection>,
    audit_line: String,
    operative_note: String,
}

/// Lesion attributes the billing defaults are resolved from.
#[derive(PartialEq)]
struct BillingInputs {
    defect_size: f64,
    anatomical_region: String,
    closure: Option<ClosureType>,
}

impl BillingInputs {
    fn of(lesion: &Lesion) -> Self {
        Self {
            defect_size: lesion.defect_size,
            anatomical_region: lesion.anatomical_region.trim().to_string(),
            closure: lesion.excision_closure_type.clone(),
        }
    }
}

impl EditingSession {
    /// Starts a session on a new, empty procedure.
    pub fn new(
        config: Arc<ClinicConfig>,
        doctor_code: impl Into<String>,
        patient_name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self::open(config, ProcedureRecord::new(doctor_code, patient_name, now))
    }

    /// Starts a session on an existing record, e.g. one loaded from the store.
    ///
    /// Lesion ids are renumbered densely in list order.
    pub fn open(config: Arc<ClinicConfig>, record: ProcedureRecord) -> Self {
        let selections = vec![BillingSelection::new(); record.lesions.len()];
        let mut session = Self {
            config,
            record,
            selections,
            audit_line: String::new(),
            operative_note: String::new(),
        };
        session.renumber();
        for index in 0..session.record.lesions.len() {
            session.finalise(index);
        }
        session.render();
        session
    }

    pub fn record(&self) -> &ProcedureRecord {
        &self.record
    }

    pub fn into_record(self) -> ProcedureRecord {
        self.record
    }

    pub fn config(&self) -> &ClinicConfig {
        &self.config
    }

    pub fn lesions(&self) -> &[Lesion] {
        &self.record.lesions
    }

    pub fn lesion(&self, id: u32) -> Option<&Lesion> {
        self.index_of(id).ok().map(|index| &self.record.lesions[index])
    }

    pub fn audit_line(&self) -> &str {
        &self.audit_line
    }

    pub fn operative_note(&self) -> &str {
        &self.operative_note
    }

    /// Audit text and note as one block, see [`combined_output`].
    pub fn combined_output(&self) -> String {
        combined_output(&self.audit_line, &self.operative_note)
    }

    pub fn billing_selection(&self, id: u32) -> Option<&BillingSelection> {
        self.index_of(id).ok().map(|index| &self.selections[index])
    }

    /// Adds a lesion, or replaces the lesion with the same id.
    ///
    /// A lesion whose id is 0 or not present is appended and numbered after the last one.
    /// Replacing a lesion resets its code selection to the defaults only if its defect size,
    /// region or closure type changed. Returns the id the lesion ended up with.
    pub fn add_or_update_lesion(&mut self, mut lesion: Lesion) -> u32 {
        match self.index_of(lesion.id) {
            Ok(index) => {
                tracing::debug!("updating lesion {}", lesion.id);
                let before = BillingInputs::of(&self.record.lesions[index]);
                self.record.lesions[index] = lesion;
                self.finalise(index);
                self.re_resolve_if_changed(index, &before);
                self.render();
                self.record.lesions[index].id
            }
            Err(_) => {
                lesion.id = self.record.lesions.len() as u32 + 1;
                tracing::debug!("adding lesion {}", lesion.id);
                self.record.lesions.push(lesion);
                self.selections.push(BillingSelection::new());
                let index = self.record.lesions.len() - 1;
                self.finalise(index);
                self.render();
                self.record.lesions[index].id
            }
        }
    }

    /// Edits a lesion in place.
    ///
    /// The lesion's code selection is reset to the defaults only if the edit changed its defect
    /// size, region or closure type.
    pub fn edit_lesion(&mut self, id: u32, edit: impl FnOnce(&mut Lesion)) -> CoreResult<()> {
        let index = self.index_of(id)?;
        let before = BillingInputs::of(&self.record.lesions[index]);
        edit(&mut self.record.lesions[index]);
        self.record.lesions[index].id = id;
        tracing::debug!("edited lesion {id}");

        self.finalise(index);
        self.re_resolve_if_changed(index, &before);
        self.render();
        Ok(())
    }

    /// Removes a lesion and renumbers the rest densely from 1, keeping their order.
    pub fn remove_lesion(&mut self, id: u32) -> CoreResult<Lesion> {
        let index = self.index_of(id)?;
        let removed = self.record.lesions.remove(index);
        self.selections.remove(index);
        tracing::debug!("removed lesion {id}");

        self.renumber();
        self.render();
        Ok(removed)
    }

    pub fn set_patient_name(&mut self, patient_name: impl Into<String>) {
        self.record.patient_name = patient_name.into();
        self.render();
    }

    /// Reassigns the responsible doctor.
    ///
    /// The store treats a saved doctor change as a new record; see `ProcedureStore::save_edit`.
    pub fn set_doctor(&mut self, doctor_code: impl Into<String>) {
        self.record.doctor_code = doctor_code.into();
        self.render();
    }

    pub fn set_consult_item(&mut self, consult_item: impl Into<String>) {
        self.record.consult_item = consult_item.into();
    }

    pub fn set_billing_comment(&mut self, comment: impl Into<String>) {
        self.record.billing_comment = comment.into();
    }

    /// Swaps in a new configuration and re-resolves every lesion against it.
    pub fn replace_config(&mut self, config: Arc<ClinicConfig>) {
        self.config = config;
        for index in 0..self.record.lesions.len() {
            self.finalise(index);
            self.re_resolve(index);
        }
        self.render();
    }

    /// Chooses the histology classification for a lesion, resetting its code selection to the
    /// defaults for that class.
    pub fn select_histology(&mut self, id: u32, histology: HistologyClass) -> CoreResult<()> {
        let index = self.index_of(id)?;
        let lesion = &mut self.record.lesions[index];
        let selection = &mut self.selections[index];

        lesion.procedure_item_number.clear();
        selection.select_histology(
            histology,
            lesion,
            self.config.code_table(),
            self.config.regions(),
        );
        lesion.procedure_item_number = selection.procedure_item_number();
        tracing::debug!(
            "lesion {id}: histology {histology}, codes '{}'",
            lesion.procedure_item_number
        );
        Ok(())
    }

    /// Toggles an excision code for a lesion. Returns `false` if it was not a candidate.
    pub fn toggle_excision_code(&mut self, id: u32, item: &str) -> CoreResult<bool> {
        let index = self.index_of(id)?;
        let toggled = self.selections[index].toggle_excision(item);
        self.sync_item_number(index);
        Ok(toggled)
    }

    /// Toggles a repair code for a lesion. Returns `false` if it was not a candidate.
    pub fn toggle_repair_code(&mut self, id: u32, item: &str) -> CoreResult<bool> {
        let index = self.index_of(id)?;
        let toggled = self.selections[index].toggle_repair(item);
        self.sync_item_number(index);
        Ok(toggled)
    }

    /// Sets a lesion's item numbers by hand, discarding any resolver selection.
    pub fn set_manual_item_number(&mut self, id: u32, items: impl Into<String>) -> CoreResult<()> {
        let index = self.index_of(id)?;
        self.selections[index].clear();
        self.record.lesions[index].procedure_item_number = items.into();
        Ok(())
    }

    /// Writes the final code selection into the record and marks it billed.
    pub fn finalise_billing(&mut self, comment: Option<&str>) -> CoreResult<()> {
        for index in 0..self.record.lesions.len() {
            self.sync_item_number(index);
        }
        self.record.apply_transition(Transition::Bill, comment)?;
        tracing::info!(
            "procedure {} billed with {} lesion(s)",
            self.record.procedure_id,
            self.record.lesions.len()
        );
        Ok(())
    }

    fn index_of(&self, id: u32) -> CoreResult<usize> {
        self.record
            .lesions
            .iter()
            .position(|lesion| lesion.id == id && id != 0)
            .ok_or(CoreError::LesionNotFound(id))
    }

    fn renumber(&mut self) {
        for (index, lesion) in self.record.lesions.iter_mut().enumerate() {
            lesion.id = index as u32 + 1;
        }
    }

    fn finalise(&mut self, index: usize) {
        let lesion = &mut self.record.lesions[index];
        lesion.normalise();
        lesion.defect_size = compute_defect_size(lesion);
    }

    fn re_resolve_if_changed(&mut self, index: usize, before: &BillingInputs) {
        if BillingInputs::of(&self.record.lesions[index]) != *before {
            self.re_resolve(index);
        }
    }

    fn re_resolve(&mut self, index: usize) {
        let lesion = &mut self.record.lesions[index];
        let selection = &mut self.selections[index];
        selection.refresh(lesion, self.config.code_table(), self.config.regions());
        if selection.histology().is_some() {
            lesion.procedure_item_number = selection.procedure_item_number();
        }
    }

    fn sync_item_number(&mut self, index: usize) {
        let selection = &self.selections[index];
        if selection.histology().is_some() {
            self.record.lesions[index].procedure_item_number = selection.procedure_item_number();
        }
    }

    fn render(&mut self) {
        self.audit_line = render_audit_line(&self.record.lesions);
        self.operative_note = render_operative_note(
            &self.record.lesions,
            &self.record.patient_name,
            &self.record.doctor_code,
            self.config.regions(),
            self.config.pathology(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code_table::CodeTable;
    use crate::config::ConfigFormat;
    use crate::constants::EMPTY_AUDIT_PLACEHOLDER;
    use crate::lesion::{ClosureType, Procedure};
    use crate::procedure::RecordStatus;
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn config() -> Arc<ClinicConfig> {
        Arc::new(ClinicConfig::builtin(PathBuf::from("unused")).expect("built-in config"))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 14, 0, 0).unwrap()
    }

    fn excision(location: &str, region: &str) -> Lesion {
        Lesion {
            location: location.into(),
            anatomical_region: region.into(),
            pathology: "BCC".into(),
            excision_closure_type: Some(ClosureType::Ellipse),
            length: "8".into(),
            width: "6".into(),
            margin: "3".into(),
            ..Lesion::new(Procedure::Excision)
        }
    }

    fn session_with(lesions: Vec<Lesion>) -> EditingSession {
        let mut session = EditingSession::new(config(), "Dr Avery", "Jordan Blake", now());
        for lesion in lesions {
            session.add_or_update_lesion(lesion);
        }
        session
    }

    #[test]
    fn test_new_session_renders_placeholders() {
        let session = EditingSession::new(config(), "Dr Avery", "Jordan Blake", now());
        assert_eq!(session.audit_line(), EMPTY_AUDIT_PLACEHOLDER);
        assert!(session.operative_note().starts_with("PATIENT: Jordan Blake"));
        assert_eq!(session.combined_output(), session.operative_note());
    }

    #[test]
    fn test_add_assigns_ids_and_defect_size() {
        let session = session_with(vec![
            excision("Left forearm", "upper-limb"),
            excision("Nose", "nose"),
        ]);
        let ids: Vec<u32> = session.lesions().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(session.lesion(1).unwrap().defect_size, 14.0);
        assert!(session.audit_line().contains("Dia: 14.00mm"));
        assert_eq!(session.audit_line().lines().count(), 2);
    }

    #[test]
    fn test_update_replaces_in_place() {
        let mut session = session_with(vec![excision("Left forearm", "upper-limb")]);
        let mut changed = session.lesion(1).unwrap().clone();
        changed.location = "Right forearm".into();
        let id = session.add_or_update_lesion(changed);

        assert_eq!(id, 1);
        assert_eq!(session.lesions().len(), 1);
        assert!(session.audit_line().starts_with("1. Right forearm;"));
        assert!(session.operative_note().contains("Right forearm"));
    }

    #[test]
    fn test_remove_renumbers_densely() {
        let mut session = session_with(vec![
            excision("A", "trunk"),
            excision("B", "trunk"),
            excision("C", "trunk"),
        ]);
        let removed = session.remove_lesion(2).expect("lesion 2 exists");
        assert_eq!(removed.location, "B");

        let remaining: Vec<(u32, &str)> = session
            .lesions()
            .iter()
            .map(|l| (l.id, l.location.as_str()))
            .collect();
        assert_eq!(remaining, vec![(1, "A"), (2, "C")]);
        assert!(session.audit_line().contains("2. C;"));
        assert!(!session.audit_line().contains("3."));
    }

    #[test]
    fn test_remove_unknown_lesion() {
        let mut session = session_with(vec![excision("A", "trunk")]);
        assert!(matches!(
            session.remove_lesion(7),
            Err(CoreError::LesionNotFound(7))
        ));
        assert!(matches!(
            session.remove_lesion(0),
            Err(CoreError::LesionNotFound(0))
        ));
    }

    #[test]
    fn test_edit_recomputes_derived_text() {
        let mut session = session_with(vec![excision("Nose", "nose")]);
        session
            .edit_lesion(1, |lesion| lesion.margin = "5".into())
            .expect("edit");
        assert_eq!(session.lesion(1).unwrap().defect_size, 18.0);
        assert!(session.audit_line().contains("Dia: 18.00mm"));
        assert!(session.operative_note().contains("Resulting defect 18mm."));
    }

    #[test]
    fn test_histology_switch_clears_previous_codes() {
        let mut session = session_with(vec![excision("Nose", "nose")]);
        session.select_histology(1, HistologyClass::BccScc).unwrap();
        assert_eq!(session.lesion(1).unwrap().procedure_item_number, "31358");

        assert!(session.toggle_excision_code(1, "31356").unwrap());
        assert_eq!(session.lesion(1).unwrap().procedure_item_number, "31356");

        session.select_histology(1, HistologyClass::Melanoma).unwrap();
        let items = &session.lesion(1).unwrap().procedure_item_number;
        assert!(!items.contains("31356"));
        assert_eq!(items, "31372");
    }

    #[test]
    fn test_edit_re_resolves_selection() {
        let mut session = session_with(vec![excision("Nose", "nose")]);
        session.select_histology(1, HistologyClass::BccScc).unwrap();
        session
            .edit_lesion(1, |lesion| {
                lesion.length = "2".into();
                lesion.width = "2".into();
                lesion.margin = "1".into();
            })
            .unwrap();
        assert_eq!(session.lesion(1).unwrap().procedure_item_number, "31356");
    }

    #[test]
    fn test_edit_keeps_toggles_when_billing_inputs_unchanged() {
        let mut session = session_with(vec![excision("Nose", "nose")]);
        session.select_histology(1, HistologyClass::BccScc).unwrap();
        assert!(session.toggle_repair_code(1, "45439").unwrap());
        assert_eq!(session.lesion(1).unwrap().procedure_item_number, "31358, 45439");

        session
            .edit_lesion(1, |lesion| lesion.location = "Nasal tip".into())
            .unwrap();
        assert_eq!(session.lesion(1).unwrap().procedure_item_number, "31358, 45439");

        let mut replaced = session.lesion(1).unwrap().clone();
        replaced.anesthetic = "1% lignocaine".into();
        session.add_or_update_lesion(replaced);
        assert_eq!(session.lesion(1).unwrap().procedure_item_number, "31358, 45439");

        session
            .edit_lesion(1, |lesion| lesion.margin = "4".into())
            .unwrap();
        assert_eq!(session.lesion(1).unwrap().procedure_item_number, "31358");
    }

    #[test]
    fn test_finalise_billing_writes_codes_and_status() {
        let mut session = session_with(vec![
            Lesion {
                excision_closure_type: Some(ClosureType::FlapRepair),
                ..excision("Nose", "nose")
            },
            excision("Back", "trunk"),
        ]);
        session.select_histology(1, HistologyClass::BccScc).unwrap();
        session.set_manual_item_number(2, "30071").unwrap();
        session.set_consult_item("23");
        session.finalise_billing(Some("checked")).expect("bill");

        let record = session.record();
        assert_eq!(record.status, RecordStatus::Billed);
        assert_eq!(record.lesions[0].procedure_item_number, "31358, 45201");
        assert_eq!(record.lesions[1].procedure_item_number, "30071");
        assert_eq!(record.consult_item, "23");
        assert_eq!(record.billing_comment, "checked");

        assert!(matches!(
            session.finalise_billing(None),
            Err(CoreError::LifecycleViolation { .. })
        ));
    }

    #[test]
    fn test_open_renumbers_and_finalises() {
        let mut record = ProcedureRecord::new("Dr Avery", "Jordan Blake", now());
        record.lesions = vec![
            Lesion {
                id: 4,
                ..excision("A", "trunk")
            },
            Lesion {
                id: 9,
                procedure_item_number: "31362".into(),
                ..excision("B", "trunk")
            },
        ];
        let session = EditingSession::open(config(), record);
        let ids: Vec<u32> = session.lesions().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(session.lesion(2).unwrap().defect_size, 14.0);
        assert_eq!(session.lesion(2).unwrap().procedure_item_number, "31362");
    }

    #[test]
    fn test_replace_config_re_resolves() {
        let mut session = session_with(vec![excision("Nose", "nose")]);
        session.select_histology(1, HistologyClass::BccScc).unwrap();

        let table = CodeTable::parse(
            r#"{"excision": {"BCC/SCC": {"Option1": [{"maxSize": 999, "item": "NEW"}]}}}"#,
            ConfigFormat::Json,
            "test",
        )
        .unwrap();
        let replaced = (*config()).clone().with_code_table(table);
        session.replace_config(Arc::new(replaced));

        assert_eq!(session.lesion(1).unwrap().procedure_item_number, "NEW");
    }

    #[test]
    fn test_doctor_and_patient_changes_re_render() {
        let mut session = session_with(vec![excision("Nose", "nose")]);
        session.set_patient_name("Sam Rivera");
        session.set_doctor("Dr Okafor");
        assert!(session
            .operative_note()
            .starts_with("PATIENT: Sam Rivera\nDOCTOR: Dr Okafor\n"));
    }
}
