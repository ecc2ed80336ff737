//! Row-store adapter - one sheet as an append-only, identity-indexed table
//!
//! Layout: sheet row 1 holds the header, data starts at row 2. Row numbers
//! handed out by [`RowStore::find_by_id`] are 1-based sheet rows and go stale as
//! soon as any row above them is inserted or deleted, so look them up right
//! before every `update`/`delete`. Nothing here detects stale row numbers or
//! guards against a concurrent writer between the lookup and the mutation.

use crate::codec::{column_to_letters, sheet_range};
use crate::error::{SheetError, SheetResult};
use crate::service::SpreadsheetService;
use crate::types::{LengthPolicy, RenderMode, SpreadsheetHandle, TableRow};
use std::sync::Arc;
use tracing::debug;

/// Sheet row number of the header.
const HEADER_ROW: usize = 1;

pub struct RowStore<'a, S: SpreadsheetService + ?Sized> {
    service: &'a mut S,
    handle: SpreadsheetHandle,
    sheet: String,
    id_column: usize,
}

impl<'a, S: SpreadsheetService + ?Sized> RowStore<'a, S> {
    /// `id_column` is zero-based (0 = column A).
    pub fn new(
        service: &'a mut S,
        handle: SpreadsheetHandle,
        sheet: impl Into<String>,
        id_column: usize,
    ) -> Self {
        Self {
            service,
            handle,
            sheet: sheet.into(),
            id_column,
        }
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    /// Append a row after the last used row. Formula text is evaluated by the
    /// service rather than stored literally.
    pub fn append(&mut self, values: &[String]) -> SheetResult<()> {
        self.check_identity(values)?;
        debug!(sheet = %self.sheet, id = %values[self.id_column], "appending row");
        self.service
            .append_row(self.handle.id(), &self.sheet, values)
    }

    /// First data row whose identity cell equals `id`.
    pub fn find_by_id(&self, id: &str) -> SheetResult<usize> {
        let letters = column_to_letters(self.id_column);
        let range = sheet_range(&self.sheet, &format!("{}:{}", letters, letters));
        let column = self
            .service
            .read_cells(self.handle.id(), &range, RenderMode::FormattedValue)?;

        column
            .iter()
            .enumerate()
            .skip(HEADER_ROW)
            .find(|(_, row)| row.first().is_some_and(|cell| cell == id))
            .map(|(idx, _)| idx + 1)
            .ok_or_else(|| {
                SheetError::NotFound(format!("no row with id '{}' in '{}'", id, self.sheet))
            })
    }

    /// Overwrite the row starting at column A. Nothing is merged from the
    /// existing row; pass the full row.
    pub fn update(&mut self, row_number: usize, values: &[String]) -> SheetResult<()> {
        self.check_data_row(row_number)?;
        self.check_identity(values)?;
        let range = sheet_range(&self.sheet, &format!("A{}", row_number));
        debug!(sheet = %self.sheet, row_number, "updating row");
        self.service
            .update_range(self.handle.id(), &range, &[values.to_vec()])
    }

    /// Remove the row; every row below moves up by one.
    pub fn delete(&mut self, row_number: usize) -> SheetResult<()> {
        self.check_data_row(row_number)?;
        let sheet_id = self.sheet_id()?;
        debug!(sheet = %self.sheet, row_number, "deleting row");
        self.service
            .delete_rows(self.handle.id(), sheet_id, row_number - 1, row_number)
    }

    /// Every data row bound to the header. Short rows are padded, long rows
    /// truncated.
    pub fn records(&self) -> SheetResult<Vec<TableRow>> {
        let grid = self.service.read_cells(
            self.handle.id(),
            &sheet_range(&self.sheet, ""),
            RenderMode::FormattedValue,
        )?;
        let mut rows = grid.into_iter();
        let header: Arc<[String]> = match rows.next() {
            Some(header) => header.into(),
            None => return Ok(Vec::new()),
        };

        rows.enumerate()
            .map(|(idx, values)| {
                TableRow::bind(
                    Arc::clone(&header),
                    values,
                    idx + HEADER_ROW + 1,
                    LengthPolicy::PadOrTruncate,
                )
            })
            .collect()
    }

    /// Numeric id of the sheet. A miss in the cached map re-reads metadata
    /// once, so sheets added after the first lookup still resolve.
    fn sheet_id(&mut self) -> SheetResult<i64> {
        match self.handle.sheet_id(&*self.service, &self.sheet) {
            Err(SheetError::NotFound(_)) => {
                debug!(sheet = %self.sheet, "sheet not in cached map, refreshing");
                self.handle.refresh();
                self.handle.sheet_id(&*self.service, &self.sheet)
            }
            other => other,
        }
    }

    fn check_identity(&self, values: &[String]) -> SheetResult<()> {
        match values.get(self.id_column) {
            Some(id) if !id.trim().is_empty() => Ok(()),
            _ => Err(SheetError::Validation(format!(
                "row for '{}' needs a non-empty identity value in column {}",
                self.sheet,
                column_to_letters(self.id_column)
            ))),
        }
    }

    fn check_data_row(&self, row_number: usize) -> SheetResult<()> {
        if row_number <= HEADER_ROW {
            return Err(SheetError::Validation(format!(
                "row {} of '{}' is not a data row",
                row_number, self.sheet
            )));
        }
        Ok(())
    }
}
