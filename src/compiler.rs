//! Schema compiler - declarative sheet definitions → ordered mutation batch
//!
//! The compiler is a generator, not a reconciler: it never looks at what the
//! remote spreadsheet already contains beyond resolving sheet ids, and name
//! collisions surface from the service when the batch runs.

use crate::codec::{decode_ref, hex_to_fraction, letters_to_column};
use crate::error::{SheetError, SheetResult};
use crate::types::{
    FormulaPair, GridRange, MutationOp, SheetDefinition, SheetMetadata, ValidationRule,
};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Reject definitions that would fail mid-batch, before anything is sent.
pub fn validate_definitions(definitions: &[SheetDefinition]) -> SheetResult<()> {
    let mut seen = HashSet::new();
    for (idx, def) in definitions.iter().enumerate() {
        if def.name.trim().is_empty() {
            return Err(SheetError::Validation(format!(
                "sheet definition #{} has an empty name",
                idx + 1
            )));
        }
        if !seen.insert(def.name.as_str()) {
            return Err(SheetError::Validation(format!(
                "sheet '{}' is defined more than once",
                def.name
            )));
        }
        if def.headers.is_empty() {
            return Err(SheetError::Validation(format!(
                "sheet '{}' has no header labels",
                def.name
            )));
        }
        hex_to_fraction(&def.color)?;
    }
    Ok(())
}

/// Title given to the filter view of a table sheet.
pub fn filter_view_title(sheet: &str) -> String {
    format!("Data_Table_{}", sheet.replace(' ', "_"))
}

/// Compile definitions into `AddSheet`/`WriteHeaderRow` pairs followed by a
/// single `DeleteSheet` for the placeholder. Sheets asking for a filter view
/// get an `AddFilterView` right after their header.
///
/// Ids are allocated from 1 upward in input order, skipping `placeholder_id`,
/// so they are positive, pairwise distinct and never the placeholder.
pub fn compile_schema(
    definitions: &[SheetDefinition],
    placeholder_id: i64,
) -> SheetResult<Vec<MutationOp>> {
    validate_definitions(definitions)?;

    let mut ops = Vec::with_capacity(definitions.len() * 2 + 1);
    let mut next_id: i64 = 1;

    for def in definitions {
        if next_id == placeholder_id {
            next_id += 1;
        }
        let id = next_id;
        next_id += 1;

        ops.push(MutationOp::AddSheet {
            id,
            name: def.name.clone(),
            color: hex_to_fraction(&def.color)?,
            frozen_rows: def.frozen_rows,
        });
        ops.push(MutationOp::WriteHeaderRow {
            sheet_id: id,
            labels: def.headers.clone(),
        });
        if def.filter_view {
            ops.push(MutationOp::AddFilterView {
                sheet_id: id,
                title: filter_view_title(&def.name),
            });
        }
        debug!(sheet = %def.name, id, "compiled sheet definition");
    }

    // Last, so the placeholder outlives every sheet being created.
    ops.push(MutationOp::DeleteSheet { id: placeholder_id });

    Ok(ops)
}

/// Output of the formula and validation compile modes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledOps {
    pub ops: Vec<MutationOp>,
    /// Sheet names that did not resolve, in input order (one entry per skipped item).
    pub skipped: Vec<String>,
}

/// Compile formula/note pairs against the spreadsheet's current sheets.
///
/// Every cell reference is decoded before any op is produced, so a malformed
/// reference fails the whole compile. Unknown sheets are skipped.
pub fn compile_formulas(
    pairs: &[FormulaPair],
    metadata: &SheetMetadata,
) -> SheetResult<CompiledOps> {
    let coords = pairs
        .iter()
        .map(|pair| decode_ref(&pair.cell))
        .collect::<SheetResult<Vec<_>>>()?;

    let mut compiled = CompiledOps::default();
    for (pair, (row, col)) in pairs.iter().zip(coords) {
        let Some(sheet_id) = metadata.id_of(&pair.sheet) else {
            warn!(sheet = %pair.sheet, cell = %pair.cell, "sheet not found, skipping formula");
            compiled.skipped.push(pair.sheet.clone());
            continue;
        };
        compiled.ops.push(MutationOp::WriteFormula {
            sheet_id,
            row,
            col,
            formula: pair.formula.clone(),
            note: pair.note.clone().filter(|n| !n.is_empty()),
        });
    }
    Ok(compiled)
}

/// Compile one-of-range validation rules. Each rule covers its column from the
/// first data row (below the header) to the bottom of the sheet.
pub fn compile_validations(
    rules: &[ValidationRule],
    metadata: &SheetMetadata,
) -> SheetResult<CompiledOps> {
    let columns = rules
        .iter()
        .map(|rule| {
            letters_to_column(&rule.column)
                .ok_or_else(|| SheetError::InvalidReference(rule.column.clone()))
        })
        .collect::<SheetResult<Vec<_>>>()?;

    let mut compiled = CompiledOps::default();
    for (rule, col) in rules.iter().zip(columns) {
        let Some(sheet_id) = metadata.id_of(&rule.sheet) else {
            warn!(sheet = %rule.sheet, column = %rule.column, "sheet not found, skipping validation");
            compiled.skipped.push(rule.sheet.clone());
            continue;
        };
        compiled.ops.push(MutationOp::SetValidation {
            sheet_id,
            range: GridRange::column_from(col, 1),
            allowed_source: rule.source.clone(),
        });
    }
    Ok(compiled)
}
