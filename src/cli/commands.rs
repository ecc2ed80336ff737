use crate::actions;
use crate::config::{ServiceConfig, SystemsConfig};
use crate::error::{SheetError, SheetResult};
use crate::parser;
use crate::service::{GoogleSheetsService, MemoryService, SpreadsheetService};
use crate::tabular::CsvSource;
use crate::types::MutationOp;
use colored::Colorize;
use std::path::{Path, PathBuf};

/// One line per op for the build plan listing
fn describe_op(op: &MutationOp) -> String {
    match op {
        MutationOp::AddSheet {
            id,
            name,
            frozen_rows,
            ..
        } => format!("add sheet {} '{}' (frozen rows: {})", id, name, frozen_rows),
        MutationOp::WriteHeaderRow { sheet_id, labels } => {
            format!("header on sheet {}: {}", sheet_id, labels.join(", "))
        }
        MutationOp::DeleteSheet { id } => format!("delete placeholder sheet {}", id),
        MutationOp::AddFilterView { sheet_id, title } => {
            format!("filter view on sheet {}: {}", sheet_id, title)
        }
        MutationOp::SetValidation {
            sheet_id,
            allowed_source,
            ..
        } => format!("validation on sheet {}: {}", sheet_id, allowed_source),
        MutationOp::WriteFormula {
            sheet_id,
            row,
            col,
            formula,
            ..
        } => format!(
            "formula on sheet {} at {}: {}",
            sheet_id,
            crate::codec::encode_ref(*row, *col),
            formula
        ),
    }
}

/// Advice printed under a failed command, for the error classes that have any.
pub fn failure_hint(err: &SheetError) -> Option<&'static str> {
    if err.is_validation() {
        Some("the input was rejected before anything was written; fix it and run again")
    } else if err.is_retryable() {
        Some("the service looks temporarily unavailable; try again shortly")
    } else {
        None
    }
}

fn connect(service_config: &ServiceConfig) -> SheetResult<GoogleSheetsService> {
    GoogleSheetsService::new(service_config.clone())
}

/// Execute the build command
pub fn build(file: PathBuf, dry_run: bool, service_config: &ServiceConfig) -> SheetResult<()> {
    println!("{}", "🏗️  Sheetbase - Building spreadsheet".bold().green());
    println!("   File: {}", file.display());
    println!();

    let definition = parser::parse_definition(&file)?;
    println!(
        "   Title: {} ({} sheets, {} validations)",
        definition.title.bright_blue().bold(),
        definition.sheets.len(),
        definition.validations.len()
    );
    println!();

    if dry_run {
        println!(
            "{}",
            "📋 DRY RUN MODE - building against an in-memory spreadsheet\n".yellow()
        );
        let mut service = MemoryService::new();
        let outcome = actions::build(&mut service, &definition)?;
        println!("{}", "🧾 Mutation plan:".bold().cyan());
        for (idx, op) in outcome.ops.iter().enumerate() {
            println!("   {:>3}. {}", idx + 1, describe_op(op));
        }
        if outcome.validations > 0 {
            println!("   + {} column validations", outcome.validations);
        }
        println!();
        println!("{}", "📋 Dry run complete - nothing was created".yellow());
        return Ok(());
    }

    let mut service = connect(service_config)?;
    let outcome = actions::build(&mut service, &definition)?;

    println!("{}", "✅ Spreadsheet created".bold().green());
    println!("   ID: {}", outcome.spreadsheet_id.bright_yellow().bold());
    println!(
        "   Sheets: {}, validations: {}",
        definition.sheets.len(),
        outcome.validations
    );
    Ok(())
}

/// Execute the populate command
pub fn populate(
    spreadsheet_id: String,
    file: PathBuf,
    service_config: &ServiceConfig,
) -> SheetResult<()> {
    println!("{}", "🌱 Sheetbase - Populating spreadsheet".bold().green());
    println!("   Spreadsheet: {}", spreadsheet_id.bright_blue());
    println!("   File: {}", file.display());
    println!();

    let populate = parser::parse_populate(&file)?;
    let mut service = connect(service_config)?;
    let outcome = actions::populate(&mut service, &spreadsheet_id, &populate, &CsvSource)?;

    for (sheet, rows) in &outcome.seeded {
        println!("   📊 {}: {} rows", sheet.bright_blue().bold(), rows);
    }
    println!("   🧮 Formulas written: {}", outcome.formulas);
    for sheet in &outcome.skipped {
        println!("   {} Sheet not found, skipped: {}", "⚠️".yellow(), sheet.yellow());
    }
    println!();
    println!("{}", "✅ Populate complete".bold().green());
    Ok(())
}

/// Execute the extract command
pub fn extract(system: String, config: &Path, service_config: &ServiceConfig) -> SheetResult<()> {
    println!("{}", "🔍 Sheetbase - Extracting formulas".bold().green());
    println!("   System: {}", system.bright_blue().bold());
    println!();

    let systems = SystemsConfig::load(config)?;
    let service = connect(service_config)?;
    let outcome = actions::extract(&service, &systems, &system, chrono::Local::now())?;

    println!(
        "   Found {} formulas",
        outcome.report.formulas.len().to_string().bold()
    );
    for skipped in &outcome.report.skipped {
        println!(
            "   {} Skipped '{}': {}",
            "⚠️".yellow(),
            skipped.name.yellow(),
            skipped.reason
        );
    }
    println!();
    println!("{}", "✅ Export written".bold().green());
    println!("   {}", outcome.export.display());
    Ok(())
}

/// Execute the dump command
pub fn dump(
    system: String,
    out: PathBuf,
    config: &Path,
    service_config: &ServiceConfig,
) -> SheetResult<()> {
    println!("{}", "📦 Sheetbase - Dumping formulas and values".bold().green());
    println!("   System: {}", system.bright_blue().bold());
    println!();

    let systems = SystemsConfig::load(config)?;
    let service = connect(service_config)?;
    let dumps = actions::dump(&service, &systems, &system, &out)?;

    for sheet in &dumps {
        println!(
            "   📄 {}: {} cells",
            sheet.sheet.bright_blue(),
            sheet.cells.len()
        );
    }
    println!();
    println!("{}", "✅ Dump complete".bold().green());
    println!("   {}", out.display());
    Ok(())
}

/// Execute the sheets command
pub fn sheets(system: String, config: &Path, service_config: &ServiceConfig) -> SheetResult<()> {
    let systems = SystemsConfig::load(config)?;
    let target = systems.system(&system)?;
    let service = connect(service_config)?;
    list(&service, &target.spreadsheet_id)
}

fn list<S: SpreadsheetService + ?Sized>(service: &S, spreadsheet_id: &str) -> SheetResult<()> {
    let metadata = actions::list_sheets(service, spreadsheet_id)?;
    println!("{}", "📋 Sheets:".bold().cyan());
    for sheet in &metadata.sheets {
        println!(
            "   {:>3}  {}  (id {})",
            sheet.index,
            sheet.title.bright_blue(),
            sheet.id
        );
    }
    Ok(())
}

/// Execute the delete-file command
pub fn delete_file(file_id: String, service_config: &ServiceConfig) -> SheetResult<()> {
    let mut service = connect(service_config)?;
    if actions::delete_file(&mut service, &file_id)? {
        println!("{} Deleted {}", "✅".green(), file_id.bright_blue());
    } else {
        println!(
            "{} File {} not found, nothing to delete",
            "⚠️".yellow(),
            file_id.bright_blue()
        );
    }
    Ok(())
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
