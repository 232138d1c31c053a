//! Billing code table.
//!
//! The code table is supplied as configuration and may be replaced at runtime. It holds:
//! - excision brackets keyed by histology classification and region class, each an ascending
//!   list of `{maxSize, item, desc}` entries,
//! - repair codes tagged with the clinical closure type they correspond to,
//! - a single biopsy code.
//!
//! Loading validates the shape and fails closed: malformed entries and unknown keys are dropped
//! with a warning so that lookups against them simply find nothing.

use crate::config::{parse_config, ConfigFormat};
use crate::constants::{BUILTIN_CODE_TABLE, NO_UPPER_BOUND_MM};
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Coarse category of the final pathology result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HistologyClass {
    BccScc,
    Melanoma,
    NonMalignant,
    Biopsy,
}

impl HistologyClass {
    pub const ALL: [HistologyClass; 4] = [
        HistologyClass::BccScc,
        HistologyClass::Melanoma,
        HistologyClass::NonMalignant,
        HistologyClass::Biopsy,
    ];

    pub fn as_label(&self) -> &'static str {
        match self {
            HistologyClass::BccScc => "BCC/SCC",
            HistologyClass::Melanoma => "Melanoma",
            HistologyClass::NonMalignant => "Non-Malignant",
            HistologyClass::Biopsy => "Biopsy",
        }
    }
}

impl std::fmt::Display for HistologyClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

impl std::str::FromStr for HistologyClass {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        HistologyClass::ALL
            .into_iter()
            .find(|class| class.as_label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| CoreError::UnknownHistology(trimmed.to_string()))
    }
}

/// Billing-relevant anatomical grouping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RegionClass {
    Option1,
    Option2,
    Option3,
}

impl RegionClass {
    pub fn as_label(&self) -> &'static str {
        match self {
            RegionClass::Option1 => "Option1",
            RegionClass::Option2 => "Option2",
            RegionClass::Option3 => "Option3",
        }
    }
}

impl std::fmt::Display for RegionClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

impl std::str::FromStr for RegionClass {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Option1" => Ok(RegionClass::Option1),
            "Option2" => Ok(RegionClass::Option2),
            "Option3" => Ok(RegionClass::Option3),
            other => Err(CoreError::UnknownRegionClass(other.to_string())),
        }
    }
}

/// One size bracket: the code applies to defects up to and including `max_size`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeEntry {
    pub max_size: f64,
    pub item: String,
    #[serde(default)]
    pub desc: String,
}

/// A repair code and the closure type it corresponds to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairCodeEntry {
    pub item: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub clinical_type: String,
}

/// Validated code table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CodeTable {
    excision: BTreeMap<HistologyClass, BTreeMap<RegionClass, Vec<CodeEntry>>>,
    repair: Vec<RepairCodeEntry>,
    biopsy: Option<CodeEntry>,
}

impl CodeTable {
    /// The table shipped with the crate.
    pub fn builtin() -> CoreResult<Self> {
        Self::parse(BUILTIN_CODE_TABLE, ConfigFormat::Yaml, "built-in code table")
    }

    /// Loads a table from a `.yaml`, `.yml` or `.json` file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let format = ConfigFormat::from_path(path)?;
        let text = std::fs::read_to_string(path).map_err(|source| CoreError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, format, &path.display().to_string())
    }

    pub fn parse(text: &str, format: ConfigFormat, origin: &str) -> CoreResult<Self> {
        let wire: CodeTableWire = parse_config(text, format, origin)?;
        Ok(wire_to_table(wire, origin))
    }

    /// Ascending brackets for a histology/region pair; empty when unconfigured.
    pub fn brackets(&self, histology: HistologyClass, region: RegionClass) -> &[CodeEntry] {
        self.excision
            .get(&histology)
            .and_then(|regions| regions.get(&region))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn repair_entries(&self) -> &[RepairCodeEntry] {
        &self.repair
    }

    pub fn biopsy(&self) -> Option<&CodeEntry> {
        self.biopsy.as_ref()
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CodeTableWire {
    #[serde(default)]
    excision: BTreeMap<String, BTreeMap<String, Vec<CodeEntry>>>,
    #[serde(default)]
    repair: Vec<RepairCodeEntry>,
    #[serde(default)]
    biopsy: Option<BiopsyWire>,
}

#[derive(Debug, Deserialize)]
struct BiopsyWire {
    item: String,
    #[serde(default)]
    desc: String,
}

fn wire_to_table(wire: CodeTableWire, origin: &str) -> CodeTable {
    let mut excision = BTreeMap::new();

    for (histology_label, regions) in wire.excision {
        let Ok(histology) = histology_label.parse::<HistologyClass>() else {
            tracing::warn!("{origin}: ignoring unknown histology class '{histology_label}'");
            continue;
        };

        let mut by_region = BTreeMap::new();
        for (region_label, entries) in regions {
            let Ok(region) = region_label.parse::<RegionClass>() else {
                tracing::warn!("{origin}: ignoring unknown region class '{region_label}'");
                continue;
            };

            let mut brackets: Vec<CodeEntry> = entries
                .into_iter()
                .filter(|entry| {
                    let valid = entry.max_size.is_finite()
                        && entry.max_size >= 0.0
                        && !entry.item.trim().is_empty();
                    if !valid {
                        tracing::warn!(
                            "{origin}: dropping malformed bracket {histology}/{region}: {:?}",
                            entry
                        );
                    }
                    valid
                })
                .collect();
            brackets.sort_by(|a, b| a.max_size.total_cmp(&b.max_size));
            by_region.insert(region, brackets);
        }
        excision.insert(histology, by_region);
    }

    let repair = wire
        .repair
        .into_iter()
        .filter(|entry| {
            let valid = !entry.item.trim().is_empty();
            if !valid {
                tracing::warn!("{origin}: dropping repair code without item: {:?}", entry);
            }
            valid
        })
        .collect();

    let biopsy = wire
        .biopsy
        .filter(|b| !b.item.trim().is_empty())
        .map(|b| CodeEntry {
            max_size: NO_UPPER_BOUND_MM,
            item: b.item,
            desc: b.desc,
        });

    CodeTable {
        excision,
        repair,
        biopsy,
    }
}
