//! Tabular seed data for populating sheets

use crate::error::{SheetError, SheetResult};
use std::path::Path;

/// A header row plus data rows.
pub type Table = (Vec<String>, Vec<Vec<String>>);

/// Anything that can hand back a table for a path.
pub trait TabularSource {
    fn read(&self, path: &Path) -> SheetResult<Table>;
}

/// Comma-separated files with a header line. Ragged rows are kept as-is.
#[derive(Debug, Clone, Default)]
pub struct CsvSource;

impl TabularSource for CsvSource {
    fn read(&self, path: &Path) -> SheetResult<Table> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| match e.kind() {
                csv::ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                    SheetError::NotFound(format!("seed file {}", path.display()))
                }
                _ => SheetError::Csv(e),
            })?;

        let header = reader.headers()?.iter().map(str::to_string).collect();
        let rows = reader
            .records()
            .map(|record| record.map(|r| r.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, csv::Error>>()?;
        Ok((header, rows))
    }
}
