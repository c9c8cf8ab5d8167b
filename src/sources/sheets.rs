//! Spreadsheet client: roster source and result sink
//!
//! Talks to the spreadsheet values REST API with a bearer token supplied by
//! configuration (acquiring the token is outside this system). The same
//! client serves both roles: the roster is read from fixed columns, and
//! contest results are written as one column per contest.
//!
//! Column writes are idempotent: if a column with the contest's display name
//! already exists in the header row it is reused, so rerunning a contest
//! overwrites its own results instead of appending a duplicate column.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use super::{ColumnCell, ResultSink, RosterRow, RosterSource, SheetError};
use crate::constants::{ROSTER_ID_COLUMN, ROSTER_NAME_COLUMN, SHEET_HEADER_ROW};

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// HTTP spreadsheet client implementing [`RosterSource`] and [`ResultSink`]
pub struct SheetsClient {
    http: reqwest::Client,
    base_url: String,
    sheet_id: String,
    tab: String,
    token: String,
}

impl SheetsClient {
    pub fn new(
        base_url: impl Into<String>,
        sheet_id: impl Into<String>,
        tab: impl Into<String>,
        token: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, SheetError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SheetError::Request(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            sheet_id: sheet_id.into(),
            tab: tab.into(),
            token: token.into(),
        })
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/spreadsheets/{}/values/{}",
            self.base_url, self.sheet_id, range
        )
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, SheetError> {
        let response = self
            .http
            .get(self.values_url(range))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| SheetError::Request(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(SheetError::Request(format!(
                "sheet read of '{}' returned {}",
                range,
                response.status()
            )));
        }

        let body: ValueRange = response
            .json()
            .await
            .map_err(|e| SheetError::Malformed(e.to_string()))?;
        Ok(body.values)
    }

    async fn put_values(&self, range: &str, values: serde_json::Value) -> Result<(), SheetError> {
        let url = format!("{}?valueInputOption=RAW", self.values_url(range));
        let response = self
            .http
            .put(url)
            .bearer_auth(&self.token)
            .json(&json!({ "range": range, "values": values }))
            .send()
            .await
            .map_err(|e| SheetError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SheetError::Request(format!(
                "sheet write to '{}' returned {}",
                range,
                response.status()
            )));
        }
        Ok(())
    }

    /// Find the column holding this contest's results, creating its header
    /// cell when absent. Returns the 1-based column index.
    async fn find_or_create_column(&self, display_name: &str) -> Result<u32, SheetError> {
        let header_range = format!("{}!{}:{}", self.tab, SHEET_HEADER_ROW, SHEET_HEADER_ROW);
        let header = self
            .get_values(&header_range)
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();

        if let Some(idx) = header.iter().position(|h| h == display_name) {
            let col = idx as u32 + 1;
            tracing::info!(column = col, "Reusing existing contest column '{}'", display_name);
            return Ok(col);
        }

        let col = header.len() as u32 + 1;
        tracing::info!(column = col, "Creating contest column '{}'", display_name);
        let header_cell = format!(
            "{}!{}{}",
            self.tab,
            column_letter(col),
            SHEET_HEADER_ROW
        );
        self.put_values(&header_cell, json!([[display_name]])).await?;
        Ok(col)
    }
}

#[async_trait]
impl RosterSource for SheetsClient {
    async fn read_rows(&self) -> Result<Vec<RosterRow>, SheetError> {
        let all_values = self.get_values(&self.tab).await?;

        let mut rows = Vec::new();
        for (idx, row) in all_values.iter().enumerate() {
            let sheet_row = idx as u32 + 1;
            if sheet_row <= SHEET_HEADER_ROW {
                continue;
            }
            if row.len() <= ROSTER_ID_COLUMN {
                tracing::warn!(row = sheet_row, "Roster row has too few columns, skipping");
                continue;
            }
            rows.push(RosterRow {
                raw_id: row[ROSTER_ID_COLUMN].clone(),
                display_name: row[ROSTER_NAME_COLUMN].clone(),
                row: sheet_row,
            });
        }
        Ok(rows)
    }
}

#[async_trait]
impl ResultSink for SheetsClient {
    async fn append_column(
        &self,
        contest_display_name: &str,
        cells: &[ColumnCell],
    ) -> Result<(), SheetError> {
        let col = self.find_or_create_column(contest_display_name).await?;
        let letter = column_letter(col);

        let data: Vec<serde_json::Value> = cells
            .iter()
            .map(|cell| {
                json!({
                    "range": format!("{}!{}{}", self.tab, letter, cell.row),
                    "values": [[cell.value]]
                })
            })
            .collect();

        let url = format!(
            "{}/spreadsheets/{}/values:batchUpdate",
            self.base_url, self.sheet_id
        );
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(&json!({ "valueInputOption": "RAW", "data": data }))
            .send()
            .await
            .map_err(|e| SheetError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SheetError::Request(format!(
                "result batch write returned {}",
                response.status()
            )));
        }

        tracing::info!(
            cells = cells.len(),
            column = %letter,
            "Wrote contest results to sheet"
        );
        Ok(())
    }
}

/// Convert a 1-based column index to its sheet letter(s): 1 -> A, 27 -> AA
pub fn column_letter(mut col: u32) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        col -= 1;
        letters.push(b'A' + (col % 26) as u8);
        col /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}
