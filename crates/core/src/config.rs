//! Clinic configuration.
//!
//! Configuration is resolved once at process startup and then passed into editing sessions and
//! the store. Nothing in this crate reads environment variables; binaries decide where the
//! override files live and hand the paths in.

use crate::code_table::CodeTable;
use crate::constants::DEFAULT_DATA_DIR;
use crate::error::{CoreError, CoreResult};
use crate::regions::{PathologyTable, RegionTable};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// On-disk format of a configuration table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Picks the format from a file extension (`yaml`, `yml` or `json`).
    pub fn from_path(path: &Path) -> CoreResult<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("json") => Ok(ConfigFormat::Json),
            _ => Err(CoreError::UnsupportedConfigFormat(
                path.display().to_string(),
            )),
        }
    }
}

/// Deserialises a configuration table, reporting the failing field path on schema mismatch.
pub(crate) fn parse_config<T: DeserializeOwned>(
    text: &str,
    format: ConfigFormat,
    origin: &str,
) -> CoreResult<T> {
    let mismatch = |path: String, message: String| CoreError::ConfigParse {
        origin: origin.to_string(),
        path: if path.is_empty() || path == "." {
            "<root>".to_string()
        } else {
            path
        },
        message,
    };

    match format {
        ConfigFormat::Yaml => {
            let deserializer = serde_yaml::Deserializer::from_str(text);
            serde_path_to_error::deserialize(deserializer).map_err(|err| {
                let path = err.path().to_string();
                mismatch(path, err.into_inner().to_string())
            })
        }
        ConfigFormat::Json => {
            let mut deserializer = serde_json::Deserializer::from_str(text);
            serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
                let path = err.path().to_string();
                mismatch(path, err.into_inner().to_string())
            })
        }
    }
}

/// Configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct ClinicConfig {
    data_dir: PathBuf,
    code_table: CodeTable,
    regions: RegionTable,
    pathology: PathologyTable,
}

impl ClinicConfig {
    pub fn new(
        data_dir: PathBuf,
        code_table: CodeTable,
        regions: RegionTable,
        pathology: PathologyTable,
    ) -> Self {
        Self {
            data_dir,
            code_table,
            regions,
            pathology,
        }
    }

    /// Built-in tables with the given data directory.
    pub fn builtin(data_dir: PathBuf) -> CoreResult<Self> {
        Ok(Self::new(
            data_dir,
            CodeTable::builtin()?,
            RegionTable::builtin()?,
            PathologyTable::builtin()?,
        ))
    }

    /// Resolves configuration from optional overrides, falling back to the built-in tables.
    pub fn resolve(
        data_dir: Option<PathBuf>,
        code_table_path: Option<PathBuf>,
        region_table_path: Option<PathBuf>,
        pathology_table_path: Option<PathBuf>,
    ) -> CoreResult<Self> {
        let data_dir = data_dir
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let code_table = match code_table_path {
            Some(path) => CodeTable::load(&path)?,
            None => CodeTable::builtin()?,
        };
        let regions = match region_table_path {
            Some(path) => RegionTable::load(&path)?,
            None => RegionTable::builtin()?,
        };
        let pathology = match pathology_table_path {
            Some(path) => PathologyTable::load(&path)?,
            None => PathologyTable::builtin()?,
        };

        Ok(Self::new(data_dir, code_table, regions, pathology))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn code_table(&self) -> &CodeTable {
        &self.code_table
    }

    pub fn regions(&self) -> &RegionTable {
        &self.regions
    }

    pub fn pathology(&self) -> &PathologyTable {
        &self.pathology
    }

    /// Replaces the code table, e.g. after the settings file was edited.
    pub fn with_code_table(mut self, code_table: CodeTable) -> Self {
        self.code_table = code_table;
        self
    }
}
