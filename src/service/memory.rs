//! In-process spreadsheet store

use super::SpreadsheetService;
use crate::codec::parse_range;
use crate::error::{SheetError, SheetResult};
use crate::types::{
    Grid, GridRange, MutationOp, RenderMode, Rgb, SheetMetadata, SheetProperties,
    SpreadsheetHandle,
};
use std::collections::{BTreeMap, HashMap};

/// Title of the sheet every new spreadsheet starts with.
const PLACEHOLDER_TITLE: &str = "Sheet1";

#[derive(Debug, Clone, PartialEq)]
pub struct MemorySheet {
    pub id: i64,
    pub title: String,
    pub frozen_rows: u32,
    pub tab_color: Option<Rgb>,
    pub cells: Grid,
    pub bold_rows: Vec<usize>,
    pub notes: HashMap<(usize, usize), String>,
    pub validations: Vec<(GridRange, String)>,
    pub filter_views: Vec<String>,
}

impl MemorySheet {
    fn new(id: i64, title: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            frozen_rows: 0,
            tab_color: None,
            cells: Vec::new(),
            bold_rows: Vec::new(),
            notes: HashMap::new(),
            validations: Vec::new(),
            filter_views: Vec::new(),
        }
    }

    fn set(&mut self, row: usize, col: usize, value: &str) {
        if self.cells.len() <= row {
            self.cells.resize(row + 1, Vec::new());
        }
        let line = &mut self.cells[row];
        if line.len() <= col {
            line.resize(col + 1, String::new());
        }
        line[col] = value.to_string();
    }

    /// Index of the first row after the last row with any content.
    fn first_unused_row(&self) -> usize {
        self.cells
            .iter()
            .rposition(|row| row.iter().any(|c| !c.is_empty()))
            .map_or(0, |idx| idx + 1)
    }
}

#[derive(Debug, Clone)]
struct MemorySpreadsheet {
    sheets: Vec<MemorySheet>,
}

impl MemorySpreadsheet {
    fn sheet_by_id(&mut self, id: i64) -> SheetResult<&mut MemorySheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| bad_request(format!("No grid with id: {}", id)))
    }

    fn sheet_by_title(&self, title: &str) -> SheetResult<&MemorySheet> {
        self.sheets
            .iter()
            .find(|s| s.title == title)
            .ok_or_else(|| SheetError::NotFound(format!("Unable to parse range: {}", title)))
    }

    fn sheet_by_title_mut(&mut self, title: &str) -> SheetResult<&mut MemorySheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.title == title)
            .ok_or_else(|| SheetError::NotFound(format!("Unable to parse range: {}", title)))
    }

    fn apply(&mut self, op: &MutationOp) -> SheetResult<()> {
        match op {
            MutationOp::AddSheet {
                id,
                name,
                color,
                frozen_rows,
            } => {
                if self.sheets.iter().any(|s| s.id == *id) {
                    return Err(bad_request(format!("Sheet with id {} already exists", id)));
                }
                if self.sheets.iter().any(|s| &s.title == name) {
                    return Err(bad_request(format!(
                        "A sheet with the name \"{}\" already exists. Please enter another name.",
                        name
                    )));
                }
                let mut sheet = MemorySheet::new(*id, name);
                sheet.tab_color = Some(*color);
                sheet.frozen_rows = *frozen_rows;
                self.sheets.push(sheet);
            }
            MutationOp::WriteHeaderRow { sheet_id, labels } => {
                let sheet = self.sheet_by_id(*sheet_id)?;
                for (col, label) in labels.iter().enumerate() {
                    sheet.set(0, col, label);
                }
                if !sheet.bold_rows.contains(&0) {
                    sheet.bold_rows.push(0);
                }
            }
            MutationOp::DeleteSheet { id } => {
                let pos = self
                    .sheets
                    .iter()
                    .position(|s| s.id == *id)
                    .ok_or_else(|| bad_request(format!("No sheet with id: {}", id)))?;
                if self.sheets.len() == 1 {
                    return Err(bad_request(
                        "You can't remove all the sheets in a document.".to_string(),
                    ));
                }
                self.sheets.remove(pos);
            }
            MutationOp::AddFilterView { sheet_id, title } => {
                let sheet = self.sheet_by_id(*sheet_id)?;
                sheet.filter_views.push(title.clone());
            }
            MutationOp::SetValidation {
                sheet_id,
                range,
                allowed_source,
            } => {
                let sheet = self.sheet_by_id(*sheet_id)?;
                sheet.validations.push((*range, allowed_source.clone()));
            }
            MutationOp::WriteFormula {
                sheet_id,
                row,
                col,
                formula,
                note,
            } => {
                let sheet = self.sheet_by_id(*sheet_id)?;
                sheet.set(*row, *col, formula);
                if let Some(note) = note {
                    sheet.notes.insert((*row, *col), note.clone());
                }
            }
        }
        Ok(())
    }
}

/// Trailing empty cells are not part of a row, as with the hosted API.
fn trim_row(mut cells: Vec<String>) -> Vec<String> {
    while cells.last().is_some_and(|c| c.is_empty()) {
        cells.pop();
    }
    cells
}

fn bad_request(message: String) -> SheetError {
    SheetError::Service {
        status: 400,
        message,
    }
}

/// Spreadsheet store held in memory.
///
/// Batches are applied to a copy and committed only if every op succeeds.
/// Values are stored as entered: `FormattedValue` reads return the same text as
/// `Formula` reads because nothing is evaluated.
#[derive(Debug, Default)]
pub struct MemoryService {
    spreadsheets: BTreeMap<String, MemorySpreadsheet>,
    placeholder_id: i64,
    next_spreadsheet: usize,
    batches: Vec<(String, Vec<MutationOp>)>,
}

impl MemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// New spreadsheets get a placeholder sheet with this id instead of 0.
    pub fn with_placeholder_id(placeholder_id: i64) -> Self {
        Self {
            placeholder_id,
            ..Self::default()
        }
    }

    /// Add a sheet with existing content, bypassing batches.
    pub fn insert_sheet(&mut self, spreadsheet_id: &str, title: &str, cells: Grid) -> i64 {
        let spreadsheet = self
            .spreadsheets
            .entry(spreadsheet_id.to_string())
            .or_insert_with(|| MemorySpreadsheet { sheets: Vec::new() });
        let id = spreadsheet.sheets.iter().map(|s| s.id + 1).max().unwrap_or(0);
        let mut sheet = MemorySheet::new(id, title);
        sheet.cells = cells;
        spreadsheet.sheets.push(sheet);
        id
    }

    pub fn sheet(&self, spreadsheet_id: &str, title: &str) -> Option<&MemorySheet> {
        self.spreadsheets
            .get(spreadsheet_id)?
            .sheets
            .iter()
            .find(|s| s.title == title)
    }

    pub fn exists(&self, spreadsheet_id: &str) -> bool {
        self.spreadsheets.contains_key(spreadsheet_id)
    }

    /// Every committed batch, in execution order.
    pub fn batches(&self) -> &[(String, Vec<MutationOp>)] {
        &self.batches
    }

    fn spreadsheet(&self, spreadsheet_id: &str) -> SheetResult<&MemorySpreadsheet> {
        self.spreadsheets
            .get(spreadsheet_id)
            .ok_or_else(|| SheetError::NotFound(format!("spreadsheet {}", spreadsheet_id)))
    }

    fn spreadsheet_mut(&mut self, spreadsheet_id: &str) -> SheetResult<&mut MemorySpreadsheet> {
        self.spreadsheets
            .get_mut(spreadsheet_id)
            .ok_or_else(|| SheetError::NotFound(format!("spreadsheet {}", spreadsheet_id)))
    }
}

impl SpreadsheetService for MemoryService {
    fn create(&mut self, _title: &str) -> SheetResult<SpreadsheetHandle> {
        self.next_spreadsheet += 1;
        let id = format!("mem-{}", self.next_spreadsheet);
        self.spreadsheets.insert(
            id.clone(),
            MemorySpreadsheet {
                sheets: vec![MemorySheet::new(self.placeholder_id, PLACEHOLDER_TITLE)],
            },
        );
        Ok(SpreadsheetHandle::new(id))
    }

    fn get_metadata(&self, spreadsheet_id: &str) -> SheetResult<SheetMetadata> {
        let spreadsheet = self.spreadsheet(spreadsheet_id)?;
        Ok(SheetMetadata {
            sheets: spreadsheet
                .sheets
                .iter()
                .enumerate()
                .map(|(index, s)| SheetProperties {
                    id: s.id,
                    title: s.title.clone(),
                    index,
                })
                .collect(),
        })
    }

    fn batch_execute(&mut self, spreadsheet_id: &str, ops: &[MutationOp]) -> SheetResult<()> {
        let current = self.spreadsheet(spreadsheet_id)?;
        let mut staged = current.clone();
        for op in ops {
            staged.apply(op)?;
        }
        self.spreadsheets.insert(spreadsheet_id.to_string(), staged);
        self.batches
            .push((spreadsheet_id.to_string(), ops.to_vec()));
        Ok(())
    }

    fn read_cells(
        &self,
        spreadsheet_id: &str,
        range: &str,
        _mode: RenderMode,
    ) -> SheetResult<Grid> {
        let range = parse_range(range)?;
        let sheet = self.spreadsheet(spreadsheet_id)?.sheet_by_title(&range.sheet)?;

        let mut grid: Grid = if range.is_whole_sheet() {
            sheet.cells.iter().cloned().map(trim_row).collect()
        } else {
            let row_start = range.start_row.unwrap_or(0).min(sheet.cells.len());
            let row_end = range
                .end_row
                .map_or(sheet.cells.len(), |r| r.saturating_add(1).min(sheet.cells.len()));
            let col_start = range.start_col.unwrap_or(0);

            (row_start..row_end.max(row_start))
                .map(|r| {
                    let line = &sheet.cells[r];
                    let col_end = range
                        .end_col
                        .map_or(line.len(), |c| c.saturating_add(1).min(line.len()));
                    if col_start < col_end {
                        trim_row(line[col_start..col_end].to_vec())
                    } else {
                        Vec::new()
                    }
                })
                .collect()
        };
        while grid.last().is_some_and(|row| row.is_empty()) {
            grid.pop();
        }
        Ok(grid)
    }

    fn append_row(
        &mut self,
        spreadsheet_id: &str,
        sheet: &str,
        values: &[String],
    ) -> SheetResult<()> {
        let sheet = self.spreadsheet_mut(spreadsheet_id)?.sheet_by_title_mut(sheet)?;
        let row = sheet.first_unused_row();
        for (col, value) in values.iter().enumerate() {
            sheet.set(row, col, value);
        }
        Ok(())
    }

    fn update_range(
        &mut self,
        spreadsheet_id: &str,
        range: &str,
        rows: &[Vec<String>],
    ) -> SheetResult<()> {
        let range = parse_range(range)?;
        let sheet = self
            .spreadsheet_mut(spreadsheet_id)?
            .sheet_by_title_mut(&range.sheet)?;
        let row_start = range.start_row.unwrap_or(0);
        let col_start = range.start_col.unwrap_or(0);
        for (r, values) in rows.iter().enumerate() {
            for (c, value) in values.iter().enumerate() {
                sheet.set(row_start + r, col_start + c, value);
            }
        }
        Ok(())
    }

    fn delete_rows(
        &mut self,
        spreadsheet_id: &str,
        sheet_id: i64,
        start: usize,
        end: usize,
    ) -> SheetResult<()> {
        if start >= end {
            return Err(bad_request(format!(
                "Invalid row range {}..{}",
                start, end
            )));
        }
        let sheet = self.spreadsheet_mut(spreadsheet_id)?.sheet_by_id(sheet_id)?;
        let end = end.min(sheet.cells.len());
        if start < end {
            sheet.cells.drain(start..end);
        }
        Ok(())
    }

    fn delete_file(&mut self, file_id: &str) -> SheetResult<()> {
        self.spreadsheets
            .remove(file_id)
            .map(|_| ())
            .ok_or_else(|| SheetError::NotFound(format!("File not found: {}", file_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb() -> Rgb {
        Rgb {
            red: 1.0,
            green: 1.0,
            blue: 1.0,
        }
    }

    fn add(id: i64, name: &str) -> MutationOp {
        MutationOp::AddSheet {
            id,
            name: name.to_string(),
            color: rgb(),
            frozen_rows: 1,
        }
    }

    #[test]
    fn test_create_has_placeholder() {
        let mut service = MemoryService::with_placeholder_id(42);
        let handle = service.create("Test").unwrap();
        let metadata = service.get_metadata(handle.id()).unwrap();
        assert_eq!(metadata.sheets.len(), 1);
        assert_eq!(metadata.sheets[0].id, 42);
        assert_eq!(metadata.sheets[0].title, "Sheet1");
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let mut service = MemoryService::new();
        let handle = service.create("Test").unwrap();
        let ops = vec![add(1, "A"), add(2, "A")];

        let err = service.batch_execute(handle.id(), &ops).unwrap_err();
        assert!(matches!(err, SheetError::Service { status: 400, .. }));

        let metadata = service.get_metadata(handle.id()).unwrap();
        assert_eq!(metadata.names(), vec!["Sheet1"]);
        assert!(service.batches().is_empty());
    }

    #[test]
    fn test_filter_view_recorded_on_sheet() {
        let mut service = MemoryService::new();
        let handle = service.create("Test").unwrap();
        let ops = vec![
            add(1, "[DB] Units"),
            MutationOp::AddFilterView {
                sheet_id: 1,
                title: "Data_Table_[DB]_Units".into(),
            },
        ];
        service.batch_execute(handle.id(), &ops).unwrap();
        let sheet = service.sheet(handle.id(), "[DB] Units").unwrap();
        assert_eq!(sheet.filter_views, vec!["Data_Table_[DB]_Units"]);

        let orphan = MutationOp::AddFilterView {
            sheet_id: 9,
            title: "x".into(),
        };
        assert!(service.batch_execute(handle.id(), &[orphan]).is_err());
    }

    #[test]
    fn test_cannot_delete_last_sheet() {
        let mut service = MemoryService::new();
        let handle = service.create("Test").unwrap();
        let err = service
            .batch_execute(handle.id(), &[MutationOp::DeleteSheet { id: 0 }])
            .unwrap_err();
        assert!(err.to_string().contains("remove all the sheets"));
    }

    #[test]
    fn test_read_cells_trims_like_the_api() {
        let mut service = MemoryService::new();
        service.insert_sheet(
            "s",
            "Data",
            vec![
                vec!["id".into(), "name".into(), "".into()],
                vec!["".into(), "x".into()],
                vec![],
            ],
        );
        let grid = service.read_cells("s", "'Data'", RenderMode::Formula).unwrap();
        assert_eq!(grid, vec![vec!["id", "name"], vec!["", "x"]]);

        let column = service.read_cells("s", "'Data'!A:A", RenderMode::FormattedValue).unwrap();
        assert_eq!(column, vec![vec!["id".to_string()]]);

        let below = service.read_cells("s", "'Data'!A9:B9", RenderMode::Formula).unwrap();
        assert!(below.is_empty());
    }

    #[test]
    fn test_read_unknown_sheet_is_not_found() {
        let mut service = MemoryService::new();
        service.insert_sheet("s", "Data", vec![]);
        let err = service.read_cells("s", "'Nope'", RenderMode::Formula).unwrap_err();
        assert!(matches!(err, SheetError::NotFound(_)));
    }

    #[test]
    fn test_delete_file() {
        let mut service = MemoryService::new();
        let handle = service.create("Test").unwrap();
        service.delete_file(handle.id()).unwrap();
        assert!(!service.exists(handle.id()));
        assert!(matches!(
            service.delete_file(handle.id()),
            Err(SheetError::NotFound(_))
        ));
    }
}
