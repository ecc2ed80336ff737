//! Reading sheets and picking out formulas

use super::selection::{plan_selection, SelectionPolicy};
use crate::codec::{encode_ref, quote_sheet};
use crate::error::{SheetError, SheetResult};
use crate::service::SpreadsheetService;
use crate::types::{ExtractedFormula, Grid, RenderMode};
use tracing::{debug, info, warn};

/// Formula detection is textual: a cell holds a formula iff its raw text
/// starts with `=`. A literal string beginning with `=` is misclassified.
pub fn is_formula(raw: &str) -> bool {
    raw.starts_with('=')
}

/// Every formula cell of `grid`, row-major, labelled with `sheet_label`.
pub fn scan_grid(sheet_label: &str, grid: &Grid) -> Vec<ExtractedFormula> {
    let mut found = Vec::new();
    for (row, cells) in grid.iter().enumerate() {
        for (col, raw) in cells.iter().enumerate() {
            if is_formula(raw) {
                found.push(ExtractedFormula {
                    sheet: sheet_label.to_string(),
                    cell: encode_ref(row, col),
                    formula: raw.clone(),
                });
            }
        }
    }
    found
}

/// A sheet the run meant to visit but could not read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSheet {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    pub formulas: Vec<ExtractedFormula>,
    pub skipped: Vec<SkippedSheet>,
}

/// The inner `Err` carries per-sheet failures the run survives. Only
/// authentication failures propagate, since no other sheet could be read either.
fn read_sheet<S: SpreadsheetService + ?Sized>(
    service: &S,
    spreadsheet_id: &str,
    sheet: &str,
    mode: RenderMode,
) -> SheetResult<Result<Grid, SheetError>> {
    match service.read_cells(spreadsheet_id, &quote_sheet(sheet), mode) {
        Ok(grid) => Ok(Ok(grid)),
        Err(e @ SheetError::Authentication(_)) => Err(e),
        Err(e) => {
            warn!(sheet, error = %e, "could not read sheet, skipping");
            Ok(Err(e))
        }
    }
}

/// Run the selection policy against the spreadsheet and scan every chosen sheet.
pub fn extract<S: SpreadsheetService + ?Sized>(
    service: &S,
    spreadsheet_id: &str,
    policy: &SelectionPolicy,
) -> SheetResult<ExtractionReport> {
    let available = service.get_metadata(spreadsheet_id)?.names();
    let plan = plan_selection(policy, &available);
    let mut report = ExtractionReport::default();

    for name in plan.missing {
        warn!(sheet = %name, "configured sheet does not exist");
        report.skipped.push(SkippedSheet {
            name,
            reason: "sheet does not exist".to_string(),
        });
    }

    for visit in &plan.visits {
        match read_sheet(service, spreadsheet_id, &visit.name, RenderMode::Formula)? {
            Ok(grid) => {
                let found = scan_grid(&visit.label(), &grid);
                info!(sheet = %visit.name, formulas = found.len(), "scanned sheet");
                report.formulas.extend(found);
            }
            Err(e) => report.skipped.push(SkippedSheet {
                name: visit.name.clone(),
                reason: e.to_string(),
            }),
        }
    }

    Ok(report)
}

//==============================================================================
// Formula + value dump
//==============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpedCell {
    pub row: usize,
    pub col: usize,
    pub formula: String,
    pub value: String,
}

impl DumpedCell {
    pub fn cell(&self) -> String {
        encode_ref(self.row, self.col)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetDump {
    pub sheet: String,
    /// Number of rows covered by either grid.
    pub rows: usize,
    pub cells: Vec<DumpedCell>,
}

/// Merge a formula grid and a value grid of the same sheet cell by cell.
///
/// The grids should have the same shape. When they don't, the shorter side is
/// padded with empty strings and the mismatch is logged. Cells empty in both
/// grids are dropped.
pub fn merge_grids(sheet: &str, formulas: &Grid, values: &Grid) -> SheetDump {
    let rows = formulas.len().max(values.len());
    if formulas.len() != values.len() {
        let diag = SheetError::PartialData {
            sheet: sheet.to_string(),
            detail: format!(
                "{} formula rows vs {} value rows",
                formulas.len(),
                values.len()
            ),
        };
        warn!("{}", diag);
    }

    let mut cells = Vec::new();
    let empty: Vec<String> = Vec::new();
    for row in 0..rows {
        let formula_row = formulas.get(row).unwrap_or(&empty);
        let value_row = values.get(row).unwrap_or(&empty);
        let cols = formula_row.len().max(value_row.len());
        if formula_row.len() != value_row.len() {
            debug!(sheet, row = row + 1, "row widths differ, padding");
        }
        for col in 0..cols {
            let formula = formula_row.get(col).cloned().unwrap_or_default();
            let value = value_row.get(col).cloned().unwrap_or_default();
            if formula.is_empty() && value.is_empty() {
                continue;
            }
            cells.push(DumpedCell {
                row,
                col,
                formula,
                value,
            });
        }
    }

    SheetDump {
        sheet: sheet.to_string(),
        rows,
        cells,
    }
}

/// Read formulas and displayed values of each sheet. An empty `sheets` list
/// means every sheet in the spreadsheet. Unreadable sheets are skipped; an
/// authentication failure ends the run.
pub fn dump<S: SpreadsheetService + ?Sized>(
    service: &S,
    spreadsheet_id: &str,
    sheets: &[String],
) -> SheetResult<Vec<SheetDump>> {
    let names = if sheets.is_empty() {
        service.get_metadata(spreadsheet_id)?.names()
    } else {
        sheets.to_vec()
    };

    let mut dumps = Vec::with_capacity(names.len());
    for name in &names {
        let Ok(formulas) = read_sheet(service, spreadsheet_id, name, RenderMode::Formula)? else {
            continue;
        };
        let Ok(values) = read_sheet(service, spreadsheet_id, name, RenderMode::FormattedValue)?
        else {
            continue;
        };
        let sheet_dump = merge_grids(name, &formulas, &values);
        info!(sheet = %name, cells = sheet_dump.cells.len(), "dumped sheet");
        dumps.push(sheet_dump);
    }
    Ok(dumps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::MemoryService;
    use crate::types::{MutationOp, SheetMetadata, SpreadsheetHandle};

    /// Delegates to an in-memory store but fails every read of one sheet.
    struct FailingReads {
        inner: MemoryService,
        sheet: String,
        error: fn() -> SheetError,
    }

    impl FailingReads {
        fn new(inner: MemoryService, sheet: &str, error: fn() -> SheetError) -> Self {
            Self {
                inner,
                sheet: sheet.to_string(),
                error,
            }
        }
    }

    impl SpreadsheetService for FailingReads {
        fn create(&mut self, title: &str) -> SheetResult<SpreadsheetHandle> {
            self.inner.create(title)
        }

        fn get_metadata(&self, spreadsheet_id: &str) -> SheetResult<SheetMetadata> {
            self.inner.get_metadata(spreadsheet_id)
        }

        fn batch_execute(&mut self, spreadsheet_id: &str, ops: &[MutationOp]) -> SheetResult<()> {
            self.inner.batch_execute(spreadsheet_id, ops)
        }

        fn read_cells(
            &self,
            spreadsheet_id: &str,
            range: &str,
            mode: RenderMode,
        ) -> SheetResult<Grid> {
            if range == quote_sheet(&self.sheet) {
                return Err((self.error)());
            }
            self.inner.read_cells(spreadsheet_id, range, mode)
        }

        fn append_row(
            &mut self,
            spreadsheet_id: &str,
            sheet: &str,
            values: &[String],
        ) -> SheetResult<()> {
            self.inner.append_row(spreadsheet_id, sheet, values)
        }

        fn update_range(
            &mut self,
            spreadsheet_id: &str,
            range: &str,
            rows: &[Vec<String>],
        ) -> SheetResult<()> {
            self.inner.update_range(spreadsheet_id, range, rows)
        }

        fn delete_rows(
            &mut self,
            spreadsheet_id: &str,
            sheet_id: i64,
            start: usize,
            end: usize,
        ) -> SheetResult<()> {
            self.inner.delete_rows(spreadsheet_id, sheet_id, start, end)
        }

        fn delete_file(&mut self, file_id: &str) -> SheetResult<()> {
            self.inner.delete_file(file_id)
        }
    }

    fn malformed_body() -> SheetError {
        SheetError::Json(serde_json::from_str::<serde_json::Value>("").unwrap_err())
    }

    fn server_error() -> SheetError {
        SheetError::Service {
            status: 500,
            message: "backend error".into(),
        }
    }

    fn expired_token() -> SheetError {
        SheetError::Authentication("token expired".into())
    }

    fn bad_and_good() -> MemoryService {
        let mut service = MemoryService::new();
        service.insert_sheet("s", "Bad", grid(&[&["=1"]]));
        service.insert_sheet("s", "Good", grid(&[&["", "=A1*2"]]));
        service
    }

    fn grid(rows: &[&[&str]]) -> Grid {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_scan_grid_finds_formula() {
        let g = grid(&[&["", "", ""], &["", "", "=SUM(A1:A10)"]]);
        assert_eq!(
            scan_grid("Summary", &g),
            vec![ExtractedFormula {
                sheet: "Summary".into(),
                cell: "C2".into(),
                formula: "=SUM(A1:A10)".into(),
            }]
        );
    }

    #[test]
    fn test_scan_grid_ignores_plain_values() {
        let g = grid(&[&["Total", "12", " =not"], &[]]);
        assert!(scan_grid("S", &g).is_empty());
    }

    #[test]
    fn test_merge_pads_shorter_grid() {
        let formulas = grid(&[&["Name", "=B1*2"], &["x"]]);
        let values = grid(&[&["Name", "4", "extra"]]);
        let merged = merge_grids("S", &formulas, &values);
        assert_eq!(merged.rows, 2);
        let cells: Vec<(String, &str, &str)> = merged
            .cells
            .iter()
            .map(|c| (c.cell(), c.formula.as_str(), c.value.as_str()))
            .collect();
        assert_eq!(
            cells,
            vec![
                ("A1".to_string(), "Name", "Name"),
                ("B1".to_string(), "=B1*2", "4"),
                ("C1".to_string(), "", "extra"),
                ("A2".to_string(), "x", ""),
            ]
        );
    }

    #[test]
    fn test_extract_skips_unreadable_sheet() {
        let mut service = MemoryService::new();
        service.insert_sheet("s", "Summary", grid(&[&["=1+1"]]));
        let policy =
            SelectionPolicy::new(None, vec!["Summary".into(), "Gone".into()], None).unwrap();
        let report = extract(&service, "s", &policy).unwrap();
        assert_eq!(report.formulas.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].name, "Gone");
    }

    #[test]
    fn test_extract_survives_failed_read() {
        let policy = SelectionPolicy::new(None, vec!["Bad".into(), "Good".into()], None).unwrap();
        for error in [malformed_body as fn() -> SheetError, server_error] {
            let service = FailingReads::new(bad_and_good(), "Bad", error);
            let report = extract(&service, "s", &policy).unwrap();

            assert_eq!(report.formulas.len(), 1);
            assert_eq!(report.formulas[0].sheet, "Good");
            assert_eq!(report.formulas[0].cell, "B1");
            assert_eq!(report.skipped.len(), 1);
            assert_eq!(report.skipped[0].name, "Bad");
            assert_eq!(report.skipped[0].reason, error().to_string());
        }
    }

    #[test]
    fn test_extract_aborts_on_authentication() {
        let service = FailingReads::new(bad_and_good(), "Good", expired_token);
        let policy = SelectionPolicy::new(None, vec!["Bad".into(), "Good".into()], None).unwrap();
        assert!(matches!(
            extract(&service, "s", &policy),
            Err(SheetError::Authentication(_))
        ));
    }

    #[test]
    fn test_dump_skips_failed_read() {
        let service = FailingReads::new(bad_and_good(), "Bad", malformed_body);
        let dumps = dump(&service, "s", &[]).unwrap();
        assert_eq!(dumps.len(), 1);
        assert_eq!(dumps[0].sheet, "Good");
        assert_eq!(dumps[0].cells[0].formula, "=A1*2");
    }

    #[test]
    fn test_dump_aborts_on_authentication() {
        let service = FailingReads::new(bad_and_good(), "Bad", expired_token);
        assert!(matches!(
            dump(&service, "s", &["Good".into(), "Bad".into()]),
            Err(SheetError::Authentication(_))
        ));
    }

    #[test]
    fn test_dump_all_sheets() {
        let mut service = MemoryService::new();
        service.insert_sheet("s", "A", grid(&[&["1", "=A1+1"]]));
        service.insert_sheet("s", "B", grid(&[]));
        let dumps = dump(&service, "s", &[]).unwrap();
        assert_eq!(dumps.len(), 2);
        assert_eq!(dumps[0].cells.len(), 2);
        assert!(dumps[1].cells.is_empty());
    }
}
