use directories::ProjectDirs;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::csv_codec::Dialect;
use crate::error::{Result, TagCsvError};

const PROJECT_DIR_PLACEHOLDER: &str = "%PROJECTDIR%";
const FILE_URI_PREFIX: &str = "file://";

/// Exchange settings as stored on disk. Every field is optional so that a
/// file and command-line flags can each supply part of the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_separator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap_fields: Option<bool>,
}

impl SettingsFile {
    pub fn load(path: &Path) -> Result<SettingsFile> {
        debug!("Loading settings from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// `settings.json` in the platform configuration directory.
    pub fn default_path() -> Option<PathBuf> {
        let proj_dirs = ProjectDirs::from("", "", "tagcsv")?;
        Some(proj_dirs.config_dir().join("settings.json"))
    }

    /// Load `path` when given, otherwise the default file if it exists.
    pub fn discover(path: Option<&Path>) -> Result<SettingsFile> {
        match path {
            Some(path) => SettingsFile::load(path),
            None => match SettingsFile::default_path() {
                Some(path) if path.is_file() => SettingsFile::load(&path),
                _ => Ok(SettingsFile::default()),
            },
        }
    }

    /// Fields set in `overrides` win over the ones already here.
    pub fn merge(self, overrides: SettingsFile) -> SettingsFile {
        SettingsFile {
            driver_reference: overrides.driver_reference.or(self.driver_reference),
            csv_path: overrides.csv_path.or(self.csv_path),
            field_separator: overrides.field_separator.or(self.field_separator),
            wrap_fields: overrides.wrap_fields.or(self.wrap_fields),
        }
    }

    /// Validate the settings. `project_dir` replaces the `%PROJECTDIR%`
    /// placeholder in the CSV path.
    pub fn resolve(self, project_dir: &Path) -> Result<ExchangeSettings> {
        let csv_path = match self.csv_path.as_deref() {
            Some(raw) => resolve_csv_path(raw, project_dir)?,
            None => {
                return Err(TagCsvError::Config(
                    "Invalid CSV file path, please check settings".to_string(),
                ));
            }
        };

        let separator = self.field_separator.as_deref().unwrap_or(",");
        let mut chars = separator.chars();
        let delimiter = match (chars.next(), chars.next()) {
            (Some(c), None) => c,
            _ => {
                return Err(TagCsvError::Config(format!(
                    "Wrong field separator \"{}\", please insert a single character",
                    separator
                )));
            }
        };

        let dialect = Dialect::new(delimiter, self.wrap_fields.unwrap_or(false))?;
        let driver_reference = self.driver_reference.filter(|r| !r.trim().is_empty());

        Ok(ExchangeSettings {
            driver_reference,
            csv_path,
            dialect,
        })
    }
}

/// Validated settings for one export or import pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeSettings {
    pub driver_reference: Option<String>,
    pub csv_path: PathBuf,
    pub dialect: Dialect,
}

impl ExchangeSettings {
    /// The export root reference; only exports need it.
    pub fn driver_reference(&self) -> Result<&str> {
        self.driver_reference.as_deref().ok_or_else(|| {
            TagCsvError::Config(
                "Driver reference is empty or invalid, please check settings".to_string(),
            )
        })
    }
}

/// Turn a configured CSV location into a filesystem path.
///
/// Accepts plain paths, `file://` URIs, and a leading `%PROJECTDIR%`.
pub fn resolve_csv_path(raw: &str, project_dir: &Path) -> Result<PathBuf> {
    let raw = raw.trim();
    let raw = raw.strip_prefix(FILE_URI_PREFIX).unwrap_or(raw);
    if raw.is_empty() {
        return Err(TagCsvError::Config(
            "Invalid CSV file path, please check settings".to_string(),
        ));
    }

    if let Some(rest) = raw.strip_prefix(PROJECT_DIR_PLACEHOLDER) {
        let rest = rest.trim_start_matches(['/', '\\']);
        if rest.is_empty() {
            return Err(TagCsvError::Config(format!(
                "CSV file path \"{}\" names a directory, not a file",
                raw
            )));
        }
        return Ok(project_dir.join(rest));
    }
    Ok(PathBuf::from(raw))
}
