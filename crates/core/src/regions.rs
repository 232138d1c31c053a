//! Region and pathology label tables.
//!
//! Both tables map short codes stored on a lesion to human-readable text for the operative note.
//! The region table additionally assigns each region its billing class.

use crate::code_table::RegionClass;
use crate::config::{parse_config, ConfigFormat};
use crate::constants::{BUILTIN_PATHOLOGY_TABLE, BUILTIN_REGION_TABLE};
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionEntry {
    pub code: String,
    pub label: String,
    pub class: RegionClass,
}

/// Region code → descriptive label and billing class.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegionTable {
    regions: Vec<RegionEntry>,
}

#[derive(Deserialize)]
struct RegionTableWire {
    #[serde(default)]
    regions: Vec<RegionEntryWire>,
}

#[derive(Debug, Deserialize)]
struct RegionEntryWire {
    #[serde(default)]
    code: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    class: String,
}

impl RegionTable {
    pub fn builtin() -> CoreResult<Self> {
        Self::parse(BUILTIN_REGION_TABLE, ConfigFormat::Yaml, "built-in region table")
    }

    pub fn load(path: &Path) -> CoreResult<Self> {
        let format = ConfigFormat::from_path(path)?;
        let text = read_config(path)?;
        Self::parse(&text, format, &path.display().to_string())
    }

    pub fn parse(text: &str, format: ConfigFormat, origin: &str) -> CoreResult<Self> {
        let wire: RegionTableWire = parse_config(text, format, origin)?;
        let regions = wire
            .regions
            .into_iter()
            .filter_map(|entry| {
                if entry.code.trim().is_empty() {
                    tracing::warn!("{origin}: dropping region without code: {:?}", entry);
                    return None;
                }
                let Ok(class) = entry.class.parse::<RegionClass>() else {
                    tracing::warn!(
                        "{origin}: dropping region '{}' with unknown class '{}'",
                        entry.code,
                        entry.class
                    );
                    return None;
                };
                Some(RegionEntry {
                    code: entry.code,
                    label: entry.label,
                    class,
                })
            })
            .collect();
        Ok(Self { regions })
    }

    pub fn get(&self, code: &str) -> Option<&RegionEntry> {
        let code = code.trim();
        self.regions.iter().find(|entry| entry.code == code)
    }

    /// Descriptive label for a region code, if configured.
    pub fn label(&self, code: &str) -> Option<&str> {
        self.get(code).map(|entry| entry.label.as_str())
    }

    /// Billing class for a region code, if configured.
    pub fn class(&self, code: &str) -> Option<RegionClass> {
        self.get(code).map(|entry| entry.class)
    }

    pub fn entries(&self) -> &[RegionEntry] {
        &self.regions
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathologyEntry {
    pub code: String,
    pub label: String,
}

/// Pathology short code → display label.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathologyTable {
    pathology: Vec<PathologyEntry>,
}

#[derive(Deserialize)]
struct PathologyTableWire {
    #[serde(default)]
    pathology: Vec<PathologyEntry>,
}

impl PathologyTable {
    pub fn builtin() -> CoreResult<Self> {
        Self::parse(
            BUILTIN_PATHOLOGY_TABLE,
            ConfigFormat::Yaml,
            "built-in pathology table",
        )
    }

    pub fn load(path: &Path) -> CoreResult<Self> {
        let format = ConfigFormat::from_path(path)?;
        let text = read_config(path)?;
        Self::parse(&text, format, &path.display().to_string())
    }

    pub fn parse(text: &str, format: ConfigFormat, origin: &str) -> CoreResult<Self> {
        let wire: PathologyTableWire = parse_config(text, format, origin)?;
        Ok(Self {
            pathology: wire.pathology,
        })
    }

    /// Display label for a short code. Codes not in the table (free text entered under
    /// "other") are returned as typed.
    pub fn label<'a>(&'a self, code: &'a str) -> &'a str {
        let code = code.trim();
        self.pathology
            .iter()
            .find(|entry| entry.code.eq_ignore_ascii_case(code))
            .map(|entry| entry.label.as_str())
            .unwrap_or(code)
    }
}

fn read_config(path: &Path) -> CoreResult<String> {
    std::fs::read_to_string(path).map_err(|source| CoreError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_regions_cover_all_classes() {
        let table = RegionTable::builtin().expect("built-in regions should parse");
        for class in [RegionClass::Option1, RegionClass::Option2, RegionClass::Option3] {
            assert!(table.entries().iter().any(|entry| entry.class == class));
        }
    }

    #[test]
    fn test_region_lookup() {
        let table = RegionTable::builtin().expect("built-in regions should parse");
        assert_eq!(table.class("nose"), Some(RegionClass::Option1));
        assert!(table.label("nose").is_some());
        assert_eq!(table.class("not-a-region"), None);
        assert_eq!(table.label(""), None);
    }

    #[test]
    fn test_region_table_from_json() {
        let json = r#"{"regions": [
            {"code": "back", "label": "Back", "class": "Option3"},
            {"code": " ", "label": "Nothing", "class": "Option1"}
        ]}"#;
        let table = RegionTable::parse(json, ConfigFormat::Json, "test").expect("parse");
        assert_eq!(table.entries().len(), 1);
        assert_eq!(table.label("back"), Some("Back"));
    }

    #[test]
    fn test_region_table_drops_bad_class() {
        let json = r#"{"regions": [
            {"code": "nose", "label": "Nose", "class": "Option1"},
            {"code": "back", "label": "Back", "class": "Option4"},
            {"code": "scalp", "label": "Scalp"}
        ]}"#;
        let table = RegionTable::parse(json, ConfigFormat::Json, "test").expect("parse");
        assert_eq!(table.entries().len(), 1);
        assert_eq!(table.class("nose"), Some(RegionClass::Option1));
        assert_eq!(table.class("back"), None);
        assert_eq!(table.label("scalp"), None);
    }

    #[test]
    fn test_region_table_shape_mismatch_reports_path() {
        let json = r#"{"regions": {"code": "nose"}}"#;
        let err = RegionTable::parse(json, ConfigFormat::Json, "test").expect_err("not a list");
        assert!(matches!(err, CoreError::ConfigParse { .. }));
    }

    #[test]
    fn test_pathology_label_falls_back_to_code() {
        let table = PathologyTable::builtin().expect("built-in pathology should parse");
        assert_eq!(table.label("BCC"), "basal cell carcinoma");
        assert_eq!(table.label("bcc"), "basal cell carcinoma");
        assert_eq!(table.label("Dermatofibroma?"), "Dermatofibroma?");
    }
}
