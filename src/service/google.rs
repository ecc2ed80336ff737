//! Google Sheets v4 / Drive v3 backend

use super::wire::{delete_rows_request, op_to_request};
use super::SpreadsheetService;
use crate::codec::quote_sheet;
use crate::config::ServiceConfig;
use crate::error::{SheetError, SheetResult};
use crate::types::{
    Grid, MutationOp, RenderMode, SheetMetadata, SheetProperties, SpreadsheetHandle,
};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::Url;
use serde_json::{json, Value};
use tracing::debug;

/// Talks to the hosted service with an already-issued bearer token.
pub struct GoogleSheetsService {
    client: Client,
    config: ServiceConfig,
    token: String,
}

impl GoogleSheetsService {
    pub fn new(config: ServiceConfig) -> SheetResult<Self> {
        let token = config.require_token()?.to_string();
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("sheetbase/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            config,
            token,
        })
    }

    fn url(&self, base: &str, segments: &[&str]) -> SheetResult<Url> {
        let mut url = Url::parse(base)
            .map_err(|e| SheetError::Validation(format!("invalid base url '{}': {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| SheetError::Validation(format!("base url '{}' cannot hold a path", base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn sheets_url(&self, segments: &[&str]) -> SheetResult<Url> {
        self.url(&self.config.sheets_base_url, segments)
    }

    /// Send, map non-2xx onto [`SheetError`], decode the JSON body (if any).
    fn send(&self, request: RequestBuilder) -> SheetResult<Value> {
        let response = request.bearer_auth(&self.token).send()?;
        let status = response.status();
        let body = response.text()?;
        debug!(status = status.as_u16(), bytes = body.len(), "service response");

        if !status.is_success() {
            return Err(SheetError::from_status(status.as_u16(), error_message(&body)));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    fn batch_update(&self, spreadsheet_id: &str, requests: Vec<Value>) -> SheetResult<Value> {
        let segment = format!("{}:batchUpdate", spreadsheet_id);
        let url = self.sheets_url(&[&segment])?;
        self.send(
            self.client
                .post(url)
                .json(&json!({ "requests": requests })),
        )
    }
}

/// Pull `error.message` out of a Google error body, else the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

fn cell_to_string(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn parse_grid(body: &Value) -> Grid {
    body["values"]
        .as_array()
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    row.as_array()
                        .map(|cells| cells.iter().map(cell_to_string).collect::<Vec<String>>())
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_metadata(body: &Value) -> SheetResult<SheetMetadata> {
    let sheets = body["sheets"].as_array().cloned().unwrap_or_default();
    let mut parsed = Vec::with_capacity(sheets.len());
    for (position, sheet) in sheets.iter().enumerate() {
        let props = &sheet["properties"];
        let title = props["title"].as_str().ok_or_else(|| SheetError::Service {
            status: 200,
            message: "sheet properties without a title".to_string(),
        })?;
        parsed.push(SheetProperties {
            // The service omits sheetId when it is 0.
            id: props["sheetId"].as_i64().unwrap_or(0),
            title: title.to_string(),
            index: props["index"].as_u64().map_or(position, |i| i as usize),
        });
    }
    parsed.sort_by_key(|s| s.index);
    Ok(SheetMetadata { sheets: parsed })
}

impl SpreadsheetService for GoogleSheetsService {
    fn create(&mut self, title: &str) -> SheetResult<SpreadsheetHandle> {
        let url = self.sheets_url(&[])?;
        let body = self.send(
            self.client
                .post(url)
                .query(&[("fields", "spreadsheetId")])
                .json(&json!({ "properties": { "title": title } })),
        )?;
        let id = body["spreadsheetId"]
            .as_str()
            .ok_or_else(|| SheetError::Service {
                status: 200,
                message: "create response without spreadsheetId".to_string(),
            })?;
        Ok(SpreadsheetHandle::new(id))
    }

    fn get_metadata(&self, spreadsheet_id: &str) -> SheetResult<SheetMetadata> {
        let url = self.sheets_url(&[spreadsheet_id])?;
        let body = self.send(
            self.client
                .get(url)
                .query(&[("fields", "sheets.properties(sheetId,title,index)")]),
        )?;
        parse_metadata(&body)
    }

    fn batch_execute(&mut self, spreadsheet_id: &str, ops: &[MutationOp]) -> SheetResult<()> {
        if ops.is_empty() {
            return Ok(());
        }
        let requests = ops.iter().map(op_to_request).collect();
        self.batch_update(spreadsheet_id, requests)?;
        Ok(())
    }

    fn read_cells(
        &self,
        spreadsheet_id: &str,
        range: &str,
        mode: RenderMode,
    ) -> SheetResult<Grid> {
        let url = self.sheets_url(&[spreadsheet_id, "values", range])?;
        let body = self.send(self.client.get(url).query(&[
            ("valueRenderOption", mode.as_api_str()),
            ("majorDimension", "ROWS"),
        ]))?;
        Ok(parse_grid(&body))
    }

    fn append_row(
        &mut self,
        spreadsheet_id: &str,
        sheet: &str,
        values: &[String],
    ) -> SheetResult<()> {
        let segment = format!("{}:append", quote_sheet(sheet));
        let url = self.sheets_url(&[spreadsheet_id, "values", &segment])?;
        self.send(
            self.client
                .post(url)
                .query(&[
                    ("valueInputOption", "USER_ENTERED"),
                    ("insertDataOption", "INSERT_ROWS"),
                ])
                .json(&json!({ "values": [values] })),
        )?;
        Ok(())
    }

    fn update_range(
        &mut self,
        spreadsheet_id: &str,
        range: &str,
        rows: &[Vec<String>],
    ) -> SheetResult<()> {
        let url = self.sheets_url(&[spreadsheet_id, "values", range])?;
        self.send(
            self.client
                .put(url)
                .query(&[("valueInputOption", "USER_ENTERED")])
                .json(&json!({
                    "range": range,
                    "majorDimension": "ROWS",
                    "values": rows
                })),
        )?;
        Ok(())
    }

    fn delete_rows(
        &mut self,
        spreadsheet_id: &str,
        sheet_id: i64,
        start: usize,
        end: usize,
    ) -> SheetResult<()> {
        self.batch_update(spreadsheet_id, vec![delete_rows_request(sheet_id, start, end)])?;
        Ok(())
    }

    fn delete_file(&mut self, file_id: &str) -> SheetResult<()> {
        let url = self.url(&self.config.drive_base_url, &[file_id])?;
        self.send(self.client.delete(url))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_token() {
        let result = GoogleSheetsService::new(ServiceConfig::default());
        assert!(matches!(result, Err(SheetError::Authentication(_))));
    }

    #[test]
    fn test_url_encodes_range_segment() {
        let service = GoogleSheetsService::new(ServiceConfig::with_token("t")).unwrap();
        let url = service
            .sheets_url(&["abc", "values", "'[DB] Investors'!A:A"])
            .unwrap();
        assert!(url
            .as_str()
            .starts_with("https://sheets.googleapis.com/v4/spreadsheets/abc/values/"));
        assert!(url.as_str().contains("%20Investors"));
    }

    #[test]
    fn test_error_message_prefers_google_shape() {
        let body = r#"{"error":{"code":400,"message":"Unable to parse range: Nope","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message(body), "Unable to parse range: Nope");
        assert_eq!(error_message("  plain failure \n"), "plain failure");
    }

    #[test]
    fn test_parse_grid_stringifies_cells() {
        let body = json!({ "values": [["=SUM(A1:A3)", 12, true], [], [null, "x"]] });
        let grid = parse_grid(&body);
        assert_eq!(
            grid,
            vec![
                vec!["=SUM(A1:A3)".to_string(), "12".to_string(), "true".to_string()],
                vec![],
                vec![String::new(), "x".to_string()],
            ]
        );
        assert!(parse_grid(&json!({ "range": "A1:B2" })).is_empty());
    }

    #[test]
    fn test_parse_metadata_defaults_missing_id() {
        let body = json!({
            "sheets": [
                { "properties": { "title": "Summary", "index": 1, "sheetId": 55 } },
                { "properties": { "title": "Sheet1", "index": 0 } }
            ]
        });
        let metadata = parse_metadata(&body).unwrap();
        assert_eq!(metadata.names(), vec!["Sheet1", "Summary"]);
        assert_eq!(metadata.id_of("Sheet1"), Some(0));
        assert_eq!(metadata.id_of("Summary"), Some(55));
    }
}
