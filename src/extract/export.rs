//! Writing extraction results to disk

use super::scan::SheetDump;
use crate::error::{SheetError, SheetResult};
use crate::types::ExtractedFormula;
use chrono::{DateTime, TimeZone};
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::info;

pub const EXPORT_HEADER: [&str; 3] = ["Sheet Name", "Cell", "Formula"];

/// File name format of formula exports, second resolution.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// A system name is used as a directory, so it must be a single plain
/// path component.
fn check_system_name(system: &str) -> SheetResult<()> {
    let mut components = Path::new(system).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(SheetError::Validation(format!(
            "system name '{}' cannot be used as a directory name",
            system
        ))),
    }
}

/// `<out_root>/<system>/formulas_<timestamp>.csv`
pub fn export_path<Tz: TimeZone>(
    out_root: &Path,
    system: &str,
    captured_at: &DateTime<Tz>,
) -> SheetResult<PathBuf>
where
    Tz::Offset: std::fmt::Display,
{
    check_system_name(system)?;
    Ok(out_root.join(system).join(format!(
        "formulas_{}.csv",
        captured_at.format(TIMESTAMP_FORMAT)
    )))
}

/// Write the records as CSV under the system's own directory. The file is
/// written even when there are no records.
pub fn export_formulas<Tz: TimeZone>(
    records: &[ExtractedFormula],
    out_root: &Path,
    system: &str,
    captured_at: &DateTime<Tz>,
) -> SheetResult<PathBuf>
where
    Tz::Offset: std::fmt::Display,
{
    let path = export_path(out_root, system, captured_at)?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(EXPORT_HEADER)?;
    for record in records {
        writer.write_record([&record.sheet, &record.cell, &record.formula])?;
    }
    writer.flush()?;

    info!(path = %path.display(), records = records.len(), "wrote formula export");
    Ok(path)
}

/// Human-readable dump report, one block per sheet.
pub fn write_dump<W: Write>(out: &mut W, dumps: &[SheetDump]) -> SheetResult<()> {
    let rule = "=".repeat(80);
    for sheet in dumps {
        writeln!(out, "{}", rule)?;
        writeln!(out, "SHEET NAME: {}", sheet.sheet)?;
        writeln!(out, "{}", rule)?;
        writeln!(out)?;

        let mut cells = sheet.cells.iter().peekable();
        for row in 0..sheet.rows {
            writeln!(out, "--- Row {} ---", row + 1)?;
            while let Some(cell) = cells.next_if(|c| c.row == row) {
                writeln!(
                    out,
                    "  {:<6} | Formula: {:<40} | Value: {}",
                    cell.cell(),
                    cell.formula,
                    cell.value
                )?;
            }
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Write the dump report to `path`, creating parent directories.
pub fn export_dump(dumps: &[SheetDump], path: &Path) -> SheetResult<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let mut file = std::io::BufWriter::new(fs::File::create(path)?);
    write_dump(&mut file, dumps)?;
    file.flush()?;
    info!(path = %path.display(), sheets = dumps.len(), "wrote dump");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::scan::DumpedCell;
    use chrono::Utc;
    use tempfile::TempDir;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 16, 9, 5, 7).unwrap()
    }

    #[test]
    fn test_export_path_layout() {
        let path = export_path(Path::new("out"), "bms", &at()).unwrap();
        assert_eq!(path, PathBuf::from("out/bms/formulas_2025-06-16_09-05-07.csv"));
    }

    #[test]
    fn test_system_name_must_be_plain() {
        for bad in ["", "..", "a/b", "/abs"] {
            assert!(
                export_path(Path::new("out"), bad, &at()).is_err(),
                "accepted '{}'",
                bad
            );
        }
    }

    #[test]
    fn test_empty_export_has_header() {
        let dir = TempDir::new().unwrap();
        let path = export_formulas(&[], dir.path(), "bms", &at()).unwrap();
        let content = fs::read_to_string(path).unwrap();
        assert_eq!(content, "Sheet Name,Cell,Formula\n");
    }

    #[test]
    fn test_export_quotes_commas() {
        let dir = TempDir::new().unwrap();
        let records = vec![ExtractedFormula {
            sheet: "T (TEMPLATE)".into(),
            cell: "B4".into(),
            formula: "=IF(A1>0,1,0)".into(),
        }];
        let path = export_formulas(&records, dir.path(), "bms", &at()).unwrap();
        let content = fs::read_to_string(path).unwrap();
        assert!(content.ends_with("T (TEMPLATE),B4,\"=IF(A1>0,1,0)\"\n"));
    }

    #[test]
    fn test_write_dump_layout() {
        let dumps = vec![SheetDump {
            sheet: "Summary".into(),
            rows: 2,
            cells: vec![DumpedCell {
                row: 1,
                col: 0,
                formula: "=A1".into(),
                value: "3".into(),
            }],
        }];
        let mut out = Vec::new();
        write_dump(&mut out, &dumps).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("SHEET NAME: Summary\n"));
        assert!(text.contains("--- Row 1 ---\n\n--- Row 2 ---\n  A2"));
        assert!(text.contains("| Value: 3\n"));
    }
}
