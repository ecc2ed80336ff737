//! Entry points: one function per command, each a complete run against a
//! [`SpreadsheetService`].

use crate::codec::{letters_to_column, sheet_range};
use crate::compiler::{compile_formulas, compile_schema, compile_validations, validate_definitions};
use crate::config::SystemsConfig;
use crate::error::{SheetError, SheetResult};
use crate::extract::{self, ExtractionReport, SheetDump};
use crate::parser::{DefinitionFile, PopulateFile};
use crate::service::SpreadsheetService;
use crate::tabular::TabularSource;
use crate::types::{MutationOp, SheetMetadata};
use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutcome {
    pub spreadsheet_id: String,
    pub placeholder_id: i64,
    /// The schema batch, in execution order.
    pub ops: Vec<MutationOp>,
    pub validations: usize,
}

/// Reject validation rules that cannot apply to the sheets being defined.
fn check_validation_rules(definition: &DefinitionFile) -> SheetResult<()> {
    let defined: HashSet<&str> = definition.sheets.iter().map(|s| s.name.as_str()).collect();
    for rule in &definition.validations {
        if letters_to_column(&rule.column).is_none() {
            return Err(SheetError::InvalidReference(rule.column.clone()));
        }
        if !defined.contains(rule.sheet.as_str()) {
            return Err(SheetError::Validation(format!(
                "validation targets sheet '{}' which is not defined",
                rule.sheet
            )));
        }
    }
    Ok(())
}

/// Create a spreadsheet from a definition file.
///
/// Everything is validated before `create`, so a bad file never leaves an
/// empty spreadsheet behind.
pub fn build<S: SpreadsheetService + ?Sized>(
    service: &mut S,
    definition: &DefinitionFile,
) -> SheetResult<BuildOutcome> {
    validate_definitions(&definition.sheets)?;
    check_validation_rules(definition)?;

    let handle = service.create(&definition.title)?;
    let spreadsheet_id = handle.id().to_string();
    info!(spreadsheet_id = %spreadsheet_id, title = %definition.title, "created spreadsheet");

    let placeholder_id = service
        .get_metadata(&spreadsheet_id)?
        .sheets
        .first()
        .map(|s| s.id)
        .ok_or_else(|| SheetError::Service {
            status: 200,
            message: format!("new spreadsheet {} has no sheets", spreadsheet_id),
        })?;

    let ops = compile_schema(&definition.sheets, placeholder_id)?;
    service.batch_execute(&spreadsheet_id, &ops)?;
    info!(sheets = definition.sheets.len(), "applied schema");

    let mut validations = 0;
    if !definition.validations.is_empty() {
        let metadata = service.get_metadata(&spreadsheet_id)?;
        let compiled = compile_validations(&definition.validations, &metadata)?;
        service.batch_execute(&spreadsheet_id, &compiled.ops)?;
        validations = compiled.ops.len();
        info!(validations, "applied validations");
    }

    Ok(BuildOutcome {
        spreadsheet_id,
        placeholder_id,
        ops,
        validations,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulateOutcome {
    /// `(sheet, data rows written)` per seed
    pub seeded: Vec<(String, usize)>,
    pub formulas: usize,
    /// Sheets named in the file that do not exist, one entry per skipped item.
    pub skipped: Vec<String>,
}

/// Write seed tables and formulas into an existing spreadsheet.
///
/// Every seed file is read and every cell reference decoded before the first
/// write.
pub fn populate<S, T>(
    service: &mut S,
    spreadsheet_id: &str,
    file: &PopulateFile,
    source: &T,
) -> SheetResult<PopulateOutcome>
where
    S: SpreadsheetService + ?Sized,
    T: TabularSource + ?Sized,
{
    let metadata = service.get_metadata(spreadsheet_id)?;

    let tables = file
        .seeds
        .iter()
        .map(|seed| source.read(&seed.csv))
        .collect::<SheetResult<Vec<_>>>()?;
    let compiled = compile_formulas(&file.formulas, &metadata)?;

    let mut outcome = PopulateOutcome::default();
    for (seed, (header, rows)) in file.seeds.iter().zip(tables) {
        if metadata.id_of(&seed.sheet).is_none() {
            warn!(sheet = %seed.sheet, "sheet not found, skipping seed data");
            outcome.skipped.push(seed.sheet.clone());
            continue;
        }
        let count = rows.len();
        let mut grid = Vec::with_capacity(count + 1);
        grid.push(header);
        grid.extend(rows);
        service.update_range(spreadsheet_id, &sheet_range(&seed.sheet, "A1"), &grid)?;
        info!(sheet = %seed.sheet, rows = count, "seeded sheet");
        outcome.seeded.push((seed.sheet.clone(), count));
    }

    service.batch_execute(spreadsheet_id, &compiled.ops)?;
    outcome.formulas = compiled.ops.len();
    outcome.skipped.extend(compiled.skipped);
    info!(formulas = outcome.formulas, "wrote formulas");

    Ok(outcome)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOutcome {
    pub report: ExtractionReport,
    pub export: PathBuf,
}

/// Extract one configured system and write its export.
pub fn extract<S: SpreadsheetService + ?Sized>(
    service: &S,
    config: &SystemsConfig,
    system: &str,
    captured_at: DateTime<Local>,
) -> SheetResult<ExtractOutcome> {
    let target = config.system(system)?;
    let policy = target.selection.to_policy()?;
    info!(system, spreadsheet_id = %target.spreadsheet_id, "extracting formulas");

    let report = extract::extract(service, &target.spreadsheet_id, &policy)?;
    let export =
        extract::export_formulas(&report.formulas, &config.export_dir, system, &captured_at)?;
    Ok(ExtractOutcome { report, export })
}

/// Dump formulas and values of every sheet of a system to `out`.
pub fn dump<S: SpreadsheetService + ?Sized>(
    service: &S,
    config: &SystemsConfig,
    system: &str,
    out: &Path,
) -> SheetResult<Vec<SheetDump>> {
    let target = config.system(system)?;
    let dumps = extract::dump(service, &target.spreadsheet_id, &[])?;
    extract::export_dump(&dumps, out)?;
    Ok(dumps)
}

pub fn list_sheets<S: SpreadsheetService + ?Sized>(
    service: &S,
    spreadsheet_id: &str,
) -> SheetResult<SheetMetadata> {
    service.get_metadata(spreadsheet_id)
}

/// Delete a file through the storage service. Returns `false` if it did not
/// exist; a missing file is not an error for cleanup runs.
pub fn delete_file<S: SpreadsheetService + ?Sized>(
    service: &mut S,
    file_id: &str,
) -> SheetResult<bool> {
    match service.delete_file(file_id) {
        Ok(()) => {
            info!(file_id, "deleted file");
            Ok(true)
        }
        Err(SheetError::NotFound(_)) => {
            warn!(file_id, "file not found, nothing to delete");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}
