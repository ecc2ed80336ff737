//! Spreadsheet service boundary
//!
//! The core never talks HTTP directly. Everything it needs from the remote
//! store goes through [`SpreadsheetService`]:
//! - [`GoogleSheetsService`] - Sheets v4 / Drive v3 over blocking HTTP
//! - [`MemoryService`] - in-process store used by tests and dry runs

mod google;
mod memory;
mod wire;

pub use google::GoogleSheetsService;
pub use memory::{MemoryService, MemorySheet};
pub use wire::op_to_request;

use crate::error::SheetResult;
use crate::types::{Grid, MutationOp, RenderMode, SheetMetadata, SpreadsheetHandle};

/// Operations the core consumes from the remote spreadsheet store.
///
/// Calls are synchronous and may block on network I/O. Implementations apply a
/// batch all-or-nothing when the backend supports it; callers do not roll back.
pub trait SpreadsheetService {
    fn create(&mut self, title: &str) -> SheetResult<SpreadsheetHandle>;

    /// Sheets in tab order.
    fn get_metadata(&self, spreadsheet_id: &str) -> SheetResult<SheetMetadata>;

    fn batch_execute(&mut self, spreadsheet_id: &str, ops: &[MutationOp]) -> SheetResult<()>;

    fn read_cells(&self, spreadsheet_id: &str, range: &str, mode: RenderMode)
        -> SheetResult<Grid>;

    /// Appends after the last non-empty row. Values are interpreted as if typed
    /// by a user, so `=...` becomes a live formula.
    fn append_row(&mut self, spreadsheet_id: &str, sheet: &str, values: &[String])
        -> SheetResult<()>;

    /// Writes `rows` starting at the top-left cell of `range`, user-entered.
    fn update_range(&mut self, spreadsheet_id: &str, range: &str, rows: &[Vec<String>])
        -> SheetResult<()>;

    /// Removes zero-based rows `start..end`; rows below shift up.
    fn delete_rows(&mut self, spreadsheet_id: &str, sheet_id: i64, start: usize, end: usize)
        -> SheetResult<()>;

    fn delete_file(&mut self, file_id: &str) -> SheetResult<()>;
}
