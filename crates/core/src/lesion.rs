//! Lesion record model.
//!
//! A [`Lesion`] is one treated skin lesion within a procedure visit. The JSON shape uses the
//! camelCase field names of the persisted procedure file, so a record written by this crate can
//! be read back without loss.
//!
//! Procedure and closure variants are serialised as their human labels (for example
//! `"Graft + Flap"`). Labels this crate does not know are kept in an `Other` variant so they
//! survive a save/load cycle; blank labels load as `None`.

use serde::{Deserialize, Deserializer, Serialize};

/// Kind of procedure performed on a lesion.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Procedure {
    #[default]
    Excision,
    Punch,
    Shave,
    Other(String),
}

impl Procedure {
    pub fn as_label(&self) -> &str {
        match self {
            Procedure::Excision => "Excision",
            Procedure::Punch => "Punch",
            Procedure::Shave => "Shave",
            Procedure::Other(label) => label,
        }
    }
}

impl From<String> for Procedure {
    fn from(label: String) -> Self {
        match label.trim() {
            "Excision" => Procedure::Excision,
            "Punch" => Procedure::Punch,
            "Shave" => Procedure::Shave,
            _ => Procedure::Other(label),
        }
    }
}

impl From<Procedure> for String {
    fn from(value: Procedure) -> Self {
        value.as_label().to_owned()
    }
}

/// How an excision defect was closed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClosureType {
    Ellipse,
    FlapRepair,
    GraftRepair,
    GraftAndFlap,
    SecondaryIntention,
    Other(String),
}

impl ClosureType {
    pub fn as_label(&self) -> &str {
        match self {
            ClosureType::Ellipse => "Ellipse",
            ClosureType::FlapRepair => "Flap Repair",
            ClosureType::GraftRepair => "Graft Repair",
            ClosureType::GraftAndFlap => "Graft + Flap",
            ClosureType::SecondaryIntention => "Secondary Intention",
            ClosureType::Other(label) => label,
        }
    }

    /// Whether this closure uses a skin graft.
    pub fn uses_graft(&self) -> bool {
        matches!(self, ClosureType::GraftRepair | ClosureType::GraftAndFlap)
    }
}

impl From<String> for ClosureType {
    fn from(label: String) -> Self {
        match label.trim() {
            "Ellipse" => ClosureType::Ellipse,
            "Flap Repair" => ClosureType::FlapRepair,
            "Graft Repair" => ClosureType::GraftRepair,
            "Graft + Flap" => ClosureType::GraftAndFlap,
            "Secondary Intention" => ClosureType::SecondaryIntention,
            _ => ClosureType::Other(label),
        }
    }
}

impl From<ClosureType> for String {
    fn from(value: ClosureType) -> Self {
        value.as_label().to_owned()
    }
}

/// Punch variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PunchType {
    PunchBiopsy,
    PunchExcision,
    Other(String),
}

impl PunchType {
    pub fn as_label(&self) -> &str {
        match self {
            PunchType::PunchBiopsy => "Punch Biopsy",
            PunchType::PunchExcision => "Punch Excision",
            PunchType::Other(label) => label,
        }
    }
}

impl From<String> for PunchType {
    fn from(label: String) -> Self {
        match label.trim() {
            "Punch Biopsy" => PunchType::PunchBiopsy,
            "Punch Excision" => PunchType::PunchExcision,
            _ => PunchType::Other(label),
        }
    }
}

impl From<PunchType> for String {
    fn from(value: PunchType) -> Self {
        value.as_label().to_owned()
    }
}

/// Graft harvested for a graft repair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GraftType {
    SplitSkin,
    FullThickness,
    Other(String),
}

impl GraftType {
    pub fn as_label(&self) -> &str {
        match self {
            GraftType::SplitSkin => "Split-Skin Graft",
            GraftType::FullThickness => "Full-Thickness Graft",
            GraftType::Other(label) => label,
        }
    }
}

impl From<String> for GraftType {
    fn from(label: String) -> Self {
        match label.trim() {
            "Split-Skin Graft" => GraftType::SplitSkin,
            "Full-Thickness Graft" => GraftType::FullThickness,
            _ => GraftType::Other(label),
        }
    }
}

impl From<GraftType> for String {
    fn from(value: GraftType) -> Self {
        value.as_label().to_owned()
    }
}

/// Skin suture used for closure.
///
/// Exactly one of the two kinds is active at any time; there is no "both" or "neither" state.
/// On the wire the suture is spread over the lesion's top-level `skinSutureDissolvable`,
/// `skinSutureSize`, `skinSutureType` and `skinSutureRemoval` fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SkinSutureWire", into = "SkinSutureWire")]
pub enum SkinSuture {
    NonDissolvable {
        size: String,
        suture_type: String,
        /// Days until removal.
        skin_suture_removal: String,
    },
    Dissolvable {
        size: String,
        suture_type: String,
    },
}

/// Flat persisted form of [`SkinSuture`], flattened into the lesion object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SkinSutureWire {
    #[serde(default)]
    skin_suture_dissolvable: bool,
    #[serde(default)]
    skin_suture_size: String,
    #[serde(default)]
    skin_suture_type: String,
    #[serde(default)]
    skin_suture_removal: String,
}

impl From<SkinSutureWire> for SkinSuture {
    fn from(wire: SkinSutureWire) -> Self {
        if wire.skin_suture_dissolvable {
            SkinSuture::Dissolvable {
                size: wire.skin_suture_size,
                suture_type: wire.skin_suture_type,
            }
        } else {
            SkinSuture::NonDissolvable {
                size: wire.skin_suture_size,
                suture_type: wire.skin_suture_type,
                skin_suture_removal: wire.skin_suture_removal,
            }
        }
    }
}

impl From<SkinSuture> for SkinSutureWire {
    fn from(suture: SkinSuture) -> Self {
        match suture {
            SkinSuture::NonDissolvable {
                size,
                suture_type,
                skin_suture_removal,
            } => SkinSutureWire {
                skin_suture_dissolvable: false,
                skin_suture_size: size,
                skin_suture_type: suture_type,
                skin_suture_removal,
            },
            SkinSuture::Dissolvable { size, suture_type } => SkinSutureWire {
                skin_suture_dissolvable: true,
                skin_suture_size: size,
                skin_suture_type: suture_type,
                skin_suture_removal: String::new(),
            },
        }
    }
}

impl Default for SkinSuture {
    fn default() -> Self {
        SkinSuture::NonDissolvable {
            size: String::new(),
            suture_type: String::new(),
            skin_suture_removal: String::new(),
        }
    }
}

impl SkinSuture {
    pub fn is_dissolvable(&self) -> bool {
        matches!(self, SkinSuture::Dissolvable { .. })
    }

    /// Size and material joined for display, e.g. `5-0 nylon`. Blank parts are dropped.
    pub fn description(&self) -> String {
        let (size, suture_type) = match self {
            SkinSuture::NonDissolvable {
                size, suture_type, ..
            } => (size, suture_type),
            SkinSuture::Dissolvable { size, suture_type } => (size, suture_type),
        };
        join_non_blank(&[size, suture_type], " ")
    }
}

/// One excised or treated skin lesion.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesion {
    /// Dense 1-based position within the procedure.
    pub id: u32,
    #[serde(default)]
    pub procedure: Procedure,
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub excision_closure_type: Option<ClosureType>,
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub punch_type: Option<PunchType>,
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub graft_type: Option<GraftType>,
    #[serde(default)]
    pub location: String,
    /// Region code, resolved to a label and billing class through the region table.
    #[serde(default)]
    pub anatomical_region: String,
    #[serde(default)]
    pub anesthetic: String,
    /// Semicolon-joined pathology short codes, e.g. `BCC;SK`.
    #[serde(default)]
    pub pathology: String,
    #[serde(rename = "excludeNMSC", default)]
    pub exclude_nmsc: bool,
    #[serde(default)]
    pub exclude_melanoma: bool,
    #[serde(default)]
    pub dermoscopy_used: String,
    #[serde(default)]
    pub length: String,
    #[serde(default)]
    pub width: String,
    #[serde(default)]
    pub margin: String,
    #[serde(default)]
    pub punch_size: String,
    /// Size typed in directly for billing-only entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_defect_size: Option<String>,
    /// Derived defect diameter in millimetres.
    #[serde(default)]
    pub defect_size: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
    #[serde(default)]
    pub use_deep_suture: bool,
    #[serde(default)]
    pub deep_suture_size: String,
    #[serde(default)]
    pub deep_suture_type: String,
    #[serde(flatten)]
    pub skin_suture: SkinSuture,
    #[serde(default)]
    pub billing_only: bool,
    #[serde(default)]
    pub procedure_item_number: String,
}

impl Lesion {
    /// A blank lesion of the given procedure kind, not yet numbered.
    pub fn new(procedure: Procedure) -> Self {
        Self {
            procedure,
            ..Self::default()
        }
    }

    /// Pathology short codes in entry order, blanks removed.
    pub fn pathology_codes(&self) -> Vec<&str> {
        self.pathology
            .split(';')
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .collect()
    }

    pub fn is_punch_biopsy(&self) -> bool {
        self.procedure == Procedure::Punch && self.punch_type == Some(PunchType::PunchBiopsy)
    }

    /// Whether the wound is left open rather than sutured.
    pub fn heals_open(&self) -> bool {
        match self.procedure {
            Procedure::Shave => true,
            Procedure::Excision => {
                self.excision_closure_type == Some(ClosureType::SecondaryIntention)
            }
            Procedure::Punch | Procedure::Other(_) => false,
        }
    }

    /// Whether skin sutures apply to this lesion.
    pub fn is_sutured(&self) -> bool {
        match self.procedure {
            Procedure::Excision => !self.heals_open(),
            Procedure::Punch => true,
            Procedure::Shave | Procedure::Other(_) => false,
        }
    }

    /// Clears attributes that do not apply to the current procedure variant.
    pub fn normalise(&mut self) {
        if self.procedure != Procedure::Punch {
            self.punch_type = None;
            self.punch_size.clear();
        }
        if self.procedure != Procedure::Excision {
            self.excision_closure_type = None;
        }
        let uses_graft = self
            .excision_closure_type
            .as_ref()
            .is_some_and(ClosureType::uses_graft);
        if !uses_graft {
            self.graft_type = None;
        }
        if !self.use_deep_suture {
            self.deep_suture_size.clear();
            self.deep_suture_type.clear();
        }
        if !self.billing_only {
            self.final_defect_size = None;
        }
    }
}

pub(crate) fn join_non_blank<S: AsRef<str>>(parts: &[S], separator: &str) -> String {
    parts
        .iter()
        .map(|part| part.as_ref().trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.trim().is_empty()).map(T::from))
}
