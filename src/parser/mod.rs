//! Definition and populate files
//!
//! Both are YAML. Definition files are checked against the embedded JSON
//! Schema before they are deserialized, so structural mistakes are reported
//! with a path into the document rather than a serde message.

use crate::error::{SheetError, SheetResult};
use crate::types::{FormulaPair, SheetDefinition, ValidationRule};
use jsonschema::JSONSchema;
use serde::Deserialize;
use serde_yaml::Value;
use std::path::{Path, PathBuf};

/// A spreadsheet to create: its title, sheets, and column validations.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DefinitionFile {
    pub title: String,
    pub sheets: Vec<SheetDefinition>,
    #[serde(default)]
    pub validations: Vec<ValidationRule>,
}

/// Seed rows for one sheet, read from a CSV file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeedSource {
    pub sheet: String,
    pub csv: PathBuf,
}

/// Data and formulas to write into an existing spreadsheet.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PopulateFile {
    #[serde(default)]
    pub seeds: Vec<SeedSource>,
    #[serde(default)]
    pub formulas: Vec<FormulaPair>,
}

/// Parse and schema-check a definition file.
pub fn parse_definition(path: &Path) -> SheetResult<DefinitionFile> {
    let content = std::fs::read_to_string(path)?;
    parse_definition_str(&content)
}

pub fn parse_definition_str(content: &str) -> SheetResult<DefinitionFile> {
    let yaml: Value = serde_yaml::from_str(content)?;
    check_schema(&yaml)?;
    Ok(serde_yaml::from_value(yaml)?)
}

const DEFINITION_SCHEMA: &str = include_str!("../../schema/definition.schema.json");

fn definition_schema() -> SheetResult<JSONSchema> {
    let schema: serde_json::Value = serde_json::from_str(DEFINITION_SCHEMA)?;
    JSONSchema::compile(&schema)
        .map_err(|e| SheetError::Validation(format!("definition schema does not compile: {}", e)))
}

/// Every violation is reported as `path: message`, the document root as `/`.
fn check_schema(document: &Value) -> SheetResult<()> {
    let schema = definition_schema()?;
    let instance = serde_json::to_value(document)?;
    let violations: Vec<String> = match schema.validate(&instance) {
        Ok(()) => return Ok(()),
        Err(errors) => errors
            .map(|e| {
                let path = e.instance_path.to_string();
                let path = if path.is_empty() { "/" } else { path.as_str() };
                format!("  - {}: {}", path, e)
            })
            .collect(),
    };
    Err(SheetError::Validation(format!(
        "Schema validation failed:\n{}",
        violations.join("\n")
    )))
}

/// Parse a populate file. Relative CSV paths are resolved against the
/// file's own directory.
pub fn parse_populate(path: &Path) -> SheetResult<PopulateFile> {
    let content = std::fs::read_to_string(path)?;
    let mut file: PopulateFile = serde_yaml::from_str(&content)?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    for seed in &mut file.seeds {
        if seed.csv.is_relative() {
            seed.csv = base.join(&seed.csv);
        }
    }
    Ok(file)
}
