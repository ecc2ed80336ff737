use crate::error::{SheetError, SheetResult};
use crate::service::SpreadsheetService;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

//==============================================================================
// Declarative definitions
//==============================================================================

fn default_frozen_rows() -> u32 {
    1
}

/// One sheet of a declarative spreadsheet layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetDefinition {
    pub name: String,
    /// Tab color as `#rrggbb`
    pub color: String,
    pub headers: Vec<String>,
    #[serde(default = "default_frozen_rows")]
    pub frozen_rows: u32,
    /// Add a filter view spanning the whole sheet, so the data reads as a table.
    #[serde(default)]
    pub filter_view: bool,
}

impl SheetDefinition {
    pub fn new(name: impl Into<String>, color: impl Into<String>, headers: &[&str]) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            frozen_rows: default_frozen_rows(),
            filter_view: false,
        }
    }
}

/// A formula (and optional note) to place in a named cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaPair {
    pub sheet: String,
    /// A1 reference, e.g. `C2`
    pub cell: String,
    pub formula: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Restricts a column's data rows to the values of another range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub sheet: String,
    /// Column letter, e.g. `B`
    pub column: String,
    /// Source range formula, e.g. `='[DB] Investors'!A2:A`
    pub source: String,
}

//==============================================================================
// Mutation operations
//==============================================================================

/// Normalized RGB color, each component in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

/// Zero-based, half-open grid rectangle. `None` ends run to the sheet edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridRange {
    pub start_row: usize,
    pub end_row: Option<usize>,
    pub start_col: usize,
    pub end_col: Option<usize>,
}

impl GridRange {
    /// A single column from `start_row` down to the last row.
    pub fn column_from(col: usize, start_row: usize) -> Self {
        Self {
            start_row,
            end_row: None,
            start_col: col,
            end_col: Some(col + 1),
        }
    }
}

/// One operation in a mutation batch. Batches execute in order.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOp {
    AddSheet {
        id: i64,
        name: String,
        color: Rgb,
        frozen_rows: u32,
    },
    /// Header labels written to row 0 in bold.
    WriteHeaderRow { sheet_id: i64, labels: Vec<String> },
    DeleteSheet { id: i64 },
    /// Named filter view over the whole sheet.
    AddFilterView { sheet_id: i64, title: String },
    SetValidation {
        sheet_id: i64,
        range: GridRange,
        allowed_source: String,
    },
    WriteFormula {
        sheet_id: i64,
        row: usize,
        col: usize,
        formula: String,
        note: Option<String>,
    },
}

impl MutationOp {
    pub fn kind(&self) -> &'static str {
        match self {
            MutationOp::AddSheet { .. } => "AddSheet",
            MutationOp::WriteHeaderRow { .. } => "WriteHeaderRow",
            MutationOp::DeleteSheet { .. } => "DeleteSheet",
            MutationOp::AddFilterView { .. } => "AddFilterView",
            MutationOp::SetValidation { .. } => "SetValidation",
            MutationOp::WriteFormula { .. } => "WriteFormula",
        }
    }
}

//==============================================================================
// Remote spreadsheet state
//==============================================================================

/// Whether a read returns formula text or displayed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Formula,
    FormattedValue,
}

impl RenderMode {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            RenderMode::Formula => "FORMULA",
            RenderMode::FormattedValue => "FORMATTED_VALUE",
        }
    }
}

/// Row-major cell contents. Rows may be ragged; trailing empty cells are omitted
/// by the service.
pub type Grid = Vec<Vec<String>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetProperties {
    pub id: i64,
    pub title: String,
    pub index: usize,
}

/// Sheets of a spreadsheet, in tab order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetMetadata {
    pub sheets: Vec<SheetProperties>,
}

impl SheetMetadata {
    pub fn id_of(&self, title: &str) -> Option<i64> {
        self.sheets.iter().find(|s| s.title == title).map(|s| s.id)
    }

    pub fn names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.title.clone()).collect()
    }

    pub fn to_map(&self) -> HashMap<String, i64> {
        self.sheets
            .iter()
            .map(|s| (s.title.clone(), s.id))
            .collect()
    }
}

/// A remote spreadsheet plus a lazily fetched name → sheet id map.
#[derive(Debug, Clone)]
pub struct SpreadsheetHandle {
    id: String,
    sheet_ids: Option<HashMap<String, i64>>,
}

impl SpreadsheetHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sheet_ids: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Resolves a sheet title, querying the service on first use.
    pub fn sheet_id<S: SpreadsheetService + ?Sized>(
        &mut self,
        service: &S,
        title: &str,
    ) -> SheetResult<i64> {
        if self.sheet_ids.is_none() {
            let metadata = service.get_metadata(&self.id)?;
            self.sheet_ids = Some(metadata.to_map());
        }
        self.sheet_ids
            .as_ref()
            .and_then(|ids| ids.get(title).copied())
            .ok_or_else(|| {
                SheetError::NotFound(format!("sheet '{}' in spreadsheet {}", title, self.id))
            })
    }

    /// Drops the cached map; the next lookup re-queries the service.
    pub fn refresh(&mut self) {
        self.sheet_ids = None;
    }
}

//==============================================================================
// Extracted and tabular records
//==============================================================================

/// A formula found during extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFormula {
    /// Sheet name, tagged ` (TEMPLATE)` for the template sheet
    pub sheet: String,
    pub cell: String,
    pub formula: String,
}

/// How [`TableRow::bind`] treats a value count that differs from the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthPolicy {
    Strict,
    PadOrTruncate,
}

/// A row bound to its sheet's header.
///
/// `row_number` is the 1-based sheet row at read time. It shifts whenever rows
/// above it are inserted or deleted, so it must be re-resolved before reuse.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    header: Arc<[String]>,
    values: Vec<String>,
    row_number: usize,
}

impl TableRow {
    pub fn bind(
        header: Arc<[String]>,
        mut values: Vec<String>,
        row_number: usize,
        policy: LengthPolicy,
    ) -> SheetResult<Self> {
        let expected = header.len();
        if values.len() != expected {
            if policy == LengthPolicy::Strict {
                return Err(SheetError::Validation(format!(
                    "row {} has {} values, header has {} columns",
                    row_number,
                    values.len(),
                    expected
                )));
            }
            if values.len() > expected {
                tracing::warn!(
                    row = row_number,
                    dropped = values.len() - expected,
                    "row is wider than header, truncating"
                );
            } else {
                tracing::debug!(
                    row = row_number,
                    missing = expected - values.len(),
                    "row is shorter than header, padding"
                );
            }
            values.resize(expected, String::new());
        }
        Ok(Self {
            header,
            values,
            row_number,
        })
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.header
            .iter()
            .position(|h| h == label)
            .map(|idx| self.values[idx].as_str())
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn row_number(&self) -> usize {
        self.row_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Arc<[String]> {
        vec!["Investor_ID".to_string(), "Full_Name".to_string(), "Email".to_string()].into()
    }

    #[test]
    fn test_bind_pads_short_rows() {
        let row = TableRow::bind(header(), vec!["inv_1".into()], 2, LengthPolicy::PadOrTruncate)
            .unwrap();
        assert_eq!(row.values(), &["inv_1", "", ""]);
        assert_eq!(row.get("Email"), Some(""));
        assert_eq!(row.row_number(), 2);
    }

    #[test]
    fn test_bind_truncates_long_rows() {
        let values = vec!["a", "b", "c", "d"].into_iter().map(String::from).collect();
        let row = TableRow::bind(header(), values, 3, LengthPolicy::PadOrTruncate).unwrap();
        assert_eq!(row.values().len(), 3);
        assert_eq!(row.get("Full_Name"), Some("b"));
    }

    #[test]
    fn test_bind_strict_rejects_mismatch() {
        let result = TableRow::bind(header(), vec!["x".into()], 2, LengthPolicy::Strict);
        assert!(matches!(result, Err(SheetError::Validation(_))));
    }

    #[test]
    fn test_get_unknown_label() {
        let values = vec!["a", "b", "c"].into_iter().map(String::from).collect();
        let row = TableRow::bind(header(), values, 2, LengthPolicy::Strict).unwrap();
        assert_eq!(row.get("Phone"), None);
    }

    #[test]
    fn test_metadata_lookup() {
        let metadata = SheetMetadata {
            sheets: vec![
                SheetProperties { id: 0, title: "Sheet1".into(), index: 0 },
                SheetProperties { id: 7, title: "Summary".into(), index: 1 },
            ],
        };
        assert_eq!(metadata.id_of("Summary"), Some(7));
        assert_eq!(metadata.id_of("Missing"), None);
        assert_eq!(metadata.names(), vec!["Sheet1", "Summary"]);
    }

    #[test]
    fn test_definition_defaults_frozen_rows() {
        let def: SheetDefinition = serde_yaml::from_str(
            "name: \"[DB] Investors\"\ncolor: \"#cfe2f3\"\nheaders: [Investor_ID, Full_Name]\n",
        )
        .unwrap();
        assert_eq!(def.frozen_rows, 1);
        assert!(!def.filter_view);
        assert_eq!(def.headers.len(), 2);
    }
}
