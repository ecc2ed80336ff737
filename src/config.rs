//! Invocation configuration
//!
//! Loaded once per run and passed down explicitly.

use crate::error::{SheetError, SheetResult};
use crate::extract::SelectionPolicy;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
pub const DEFAULT_DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3/files";
pub const TOKEN_ENV_VAR: &str = "SHEETBASE_ACCESS_TOKEN";

fn default_export_dir() -> PathBuf {
    PathBuf::from("formula_exports")
}

/// Which sheets an extraction run visits, as written in the config file.
///
/// The camelCase aliases accept config files written for the older scripts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SelectionConfig {
    #[serde(default, alias = "templateSheetName")]
    pub template: Option<String>,
    #[serde(default, alias = "otherSheetsToProcess")]
    pub explicit: Vec<String>,
    #[serde(default, alias = "houseSheetNamePattern")]
    pub pattern: Option<String>,
}

impl SelectionConfig {
    pub fn to_policy(&self) -> SheetResult<SelectionPolicy> {
        SelectionPolicy::new(
            self.template.clone(),
            self.explicit.clone(),
            self.pattern.as_deref(),
        )
    }
}

/// One target system: a spreadsheet plus how to extract from it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SystemConfig {
    pub spreadsheet_id: String,
    #[serde(default, alias = "config")]
    pub selection: SelectionConfig,
}

/// All known systems keyed by name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SystemsConfig {
    pub systems: BTreeMap<String, SystemConfig>,
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
}

impl SystemsConfig {
    /// Read a YAML or JSON config file.
    pub fn load(path: &Path) -> SheetResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> SheetResult<Self> {
        let config: SystemsConfig = serde_yaml::from_str(content)?;
        for (name, system) in &config.systems {
            if system.spreadsheet_id.trim().is_empty() {
                return Err(SheetError::Validation(format!(
                    "system '{}' has an empty spreadsheet_id",
                    name
                )));
            }
        }
        Ok(config)
    }

    pub fn system(&self, name: &str) -> SheetResult<&SystemConfig> {
        self.systems.get(name).ok_or_else(|| {
            let available: Vec<&str> = self.systems.keys().map(String::as_str).collect();
            SheetError::NotFound(format!(
                "system '{}' (available: {})",
                name,
                available.join(", ")
            ))
        })
    }
}

/// Connection settings for [`crate::service::GoogleSheetsService`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub sheets_base_url: String,
    pub drive_base_url: String,
    /// Bearer token issued elsewhere; acquiring it is the caller's job.
    pub access_token: Option<String>,
    /// Per-request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            sheets_base_url: DEFAULT_SHEETS_BASE_URL.to_string(),
            drive_base_url: DEFAULT_DRIVE_BASE_URL.to_string(),
            access_token: None,
            timeout: None,
        }
    }
}

impl ServiceConfig {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
            ..Self::default()
        }
    }

    /// The configured token, or an authentication failure if there is none.
    pub fn require_token(&self) -> SheetResult<&str> {
        match self.access_token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(SheetError::Authentication(format!(
                "no access token (pass --token or set {})",
                TOKEN_ENV_VAR
            ))),
        }
    }
}
