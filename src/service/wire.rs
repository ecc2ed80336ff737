//! Sheets v4 `batchUpdate` request encoding
//!
//! The only place [`MutationOp`] turns into the service's nested JSON payloads
//! and field masks.

use crate::types::{GridRange, MutationOp};
use serde_json::{json, Map, Value};

/// Encode one op as a `batchUpdate` request object.
pub fn op_to_request(op: &MutationOp) -> Value {
    match op {
        MutationOp::AddSheet {
            id,
            name,
            color,
            frozen_rows,
        } => json!({
            "addSheet": {
                "properties": {
                    "sheetId": id,
                    "title": name,
                    "gridProperties": { "frozenRowCount": frozen_rows },
                    "tabColor": {
                        "red": color.red,
                        "green": color.green,
                        "blue": color.blue
                    }
                }
            }
        }),
        MutationOp::WriteHeaderRow { sheet_id, labels } => {
            let values: Vec<Value> = labels
                .iter()
                .map(|label| {
                    json!({
                        "userEnteredValue": { "stringValue": label },
                        "userEnteredFormat": { "textFormat": { "bold": true } }
                    })
                })
                .collect();
            json!({
                "updateCells": {
                    "rows": [{ "values": values }],
                    "start": { "sheetId": sheet_id, "rowIndex": 0, "columnIndex": 0 },
                    "fields": "userEnteredValue,userEnteredFormat.textFormat.bold"
                }
            })
        }
        MutationOp::DeleteSheet { id } => json!({ "deleteSheet": { "sheetId": id } }),
        MutationOp::AddFilterView { sheet_id, title } => json!({
            "addFilterView": {
                "filter": {
                    "title": title,
                    "range": { "sheetId": sheet_id }
                }
            }
        }),
        MutationOp::SetValidation {
            sheet_id,
            range,
            allowed_source,
        } => json!({
            "setDataValidation": {
                "range": grid_range(*sheet_id, range),
                "rule": {
                    "condition": {
                        "type": "ONE_OF_RANGE",
                        "values": [{ "userEnteredValue": allowed_source }]
                    },
                    "strict": true
                }
            }
        }),
        MutationOp::WriteFormula {
            sheet_id,
            row,
            col,
            formula,
            note,
        } => {
            let mut cell = Map::new();
            cell.insert(
                "userEnteredValue".to_string(),
                json!({ "formulaValue": formula }),
            );
            let fields = match note {
                Some(note) => {
                    cell.insert("note".to_string(), json!(note));
                    "userEnteredValue,note"
                }
                None => "userEnteredValue",
            };
            json!({
                "updateCells": {
                    "rows": [{ "values": [Value::Object(cell)] }],
                    "start": { "sheetId": sheet_id, "rowIndex": row, "columnIndex": col },
                    "fields": fields
                }
            })
        }
    }
}

/// `deleteDimension` request for zero-based rows `start..end`.
pub(crate) fn delete_rows_request(sheet_id: i64, start: usize, end: usize) -> Value {
    json!({
        "deleteDimension": {
            "range": {
                "sheetId": sheet_id,
                "dimension": "ROWS",
                "startIndex": start,
                "endIndex": end
            }
        }
    })
}

fn grid_range(sheet_id: i64, range: &GridRange) -> Value {
    let mut obj = Map::new();
    obj.insert("sheetId".to_string(), json!(sheet_id));
    obj.insert("startRowIndex".to_string(), json!(range.start_row));
    if let Some(end_row) = range.end_row {
        obj.insert("endRowIndex".to_string(), json!(end_row));
    }
    obj.insert("startColumnIndex".to_string(), json!(range.start_col));
    if let Some(end_col) = range.end_col {
        obj.insert("endColumnIndex".to_string(), json!(end_col));
    }
    Value::Object(obj)
}
