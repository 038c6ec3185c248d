//! Reading tracked documents from a Google spreadsheet
//!
//! Expected columns: name, issue date, expiry date, duration in days, status.
//! Dates use `YYYY-MM-DD`. Rows that do not decode are skipped with a warning.

use chrono::{Duration, NaiveDate};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::google::{sheets_values_url, GoogleApiClient};
use crate::models::{DocumentRecord, DATE_FORMAT};

const MIN_SPREADSHEET_ID_LEN: usize = 10;
const MAX_SPREADSHEET_ID_LEN: usize = 100;
const ROW_COLUMNS: usize = 5;

static SPREADSHEET_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("spreadsheet ID pattern is valid"));

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("invalid spreadsheet id: {0}")]
    Validation(String),

    #[error("unable to retrieve data from sheet: {0}")]
    Read(String),
}

/// Check the shape of a spreadsheet ID before it is put into a request URL
///
/// # Errors
///
/// Returns [`SheetError::Validation`] if the ID has the wrong length or
/// contains characters outside `[A-Za-z0-9_-]`
pub fn validate_spreadsheet_id(spreadsheet_id: &str) -> Result<(), SheetError> {
    let len = spreadsheet_id.len();
    if !(MIN_SPREADSHEET_ID_LEN..=MAX_SPREADSHEET_ID_LEN).contains(&len) {
        return Err(SheetError::Validation(format!(
            "length {len} outside {MIN_SPREADSHEET_ID_LEN}..={MAX_SPREADSHEET_ID_LEN}"
        )));
    }
    if !SPREADSHEET_ID_PATTERN.is_match(spreadsheet_id) {
        return Err(SheetError::Validation(
            "unexpected characters".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    TooFewColumns { found: usize },
    InvalidIssueDate,
    InvalidExpiryDate,
    InvalidDuration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Parsed(DocumentRecord),
    Skipped { reason: SkipReason },
}

/// Text of a cell regardless of its JSON type
fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn parse_date(cell: &Value) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(cell_text(cell).trim(), DATE_FORMAT).ok()
}

fn parse_duration(cell: &Value) -> Option<Duration> {
    cell_text(cell)
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(Duration::try_days)
}

/// Decode a single row; a record is produced only when every field parses
#[must_use]
pub fn decode_row(row: &[Value]) -> RowOutcome {
    if row.len() < ROW_COLUMNS {
        return RowOutcome::Skipped {
            reason: SkipReason::TooFewColumns { found: row.len() },
        };
    }

    let Some(issue_date) = parse_date(&row[1]) else {
        return RowOutcome::Skipped {
            reason: SkipReason::InvalidIssueDate,
        };
    };
    let Some(expiry_date) = parse_date(&row[2]) else {
        return RowOutcome::Skipped {
            reason: SkipReason::InvalidExpiryDate,
        };
    };
    let Some(duration) = parse_duration(&row[3]) else {
        return RowOutcome::Skipped {
            reason: SkipReason::InvalidDuration,
        };
    };

    RowOutcome::Parsed(DocumentRecord {
        name: cell_text(&row[0]),
        issue_date,
        expiry_date,
        duration,
        status: cell_text(&row[4]),
    })
}

/// Decode every row, logging and dropping the ones that fail
#[must_use]
pub fn decode_rows(rows: &[Vec<Value>]) -> Vec<DocumentRecord> {
    rows.iter()
        .enumerate()
        .filter_map(|(index, row)| match decode_row(row) {
            RowOutcome::Parsed(record) => Some(record),
            RowOutcome::Skipped { reason } => {
                warn!("Skipping sheet row {}: {reason:?}", index + 1);
                None
            }
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Reads document rows through the Sheets values API
pub struct SheetReader<'a> {
    api: &'a GoogleApiClient,
}

impl<'a> SheetReader<'a> {
    #[must_use]
    pub fn new(api: &'a GoogleApiClient) -> Self {
        Self { api }
    }

    /// Read and decode `range` of the spreadsheet
    ///
    /// # Errors
    ///
    /// Returns [`SheetError::Validation`] for a malformed ID (no request is
    /// made) and [`SheetError::Read`] when the values call fails
    pub async fn read_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<DocumentRecord>, SheetError> {
        validate_spreadsheet_id(spreadsheet_id)?;

        let url = sheets_values_url(&self.api.settings().sheets_base_url, spreadsheet_id, range)
            .map_err(|e| SheetError::Read(e.to_string()))?;
        let value_range: ValueRange = self
            .api
            .get_json(&url)
            .await
            .map_err(|e| SheetError::Read(e.to_string()))?;

        debug!(
            "Read {} rows from spreadsheet {spreadsheet_id}",
            value_range.values.len()
        );
        Ok(decode_rows(&value_range.values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestFixtures;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn row(cells: &[Value]) -> Vec<Value> {
        cells.to_vec()
    }

    #[test]
    fn test_validate_spreadsheet_id() {
        assert!(validate_spreadsheet_id("1ioCzdKVejCLjVk3h7_-abc").is_ok());
        assert!(validate_spreadsheet_id("short").is_err());
        assert!(validate_spreadsheet_id(&"a".repeat(101)).is_err());
        assert!(validate_spreadsheet_id(&"a".repeat(100)).is_ok());
        assert!(validate_spreadsheet_id("abc/../def123").is_err());
        assert!(validate_spreadsheet_id("abcdefghij klm").is_err());
    }

    #[test]
    fn test_decode_valid_row() {
        let outcome = decode_row(&row(&[
            json!("Passport"),
            json!("2020-01-01"),
            json!("2030-01-01"),
            json!("3653"),
            json!("valid"),
        ]));

        let RowOutcome::Parsed(record) = outcome else {
            panic!("expected a parsed row, got {outcome:?}");
        };
        assert_eq!(record.name, "Passport");
        assert_eq!(record.issue_date, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(record.expiry_date, NaiveDate::from_ymd_opt(2030, 1, 1).unwrap());
        assert_eq!(record.duration, Duration::days(3653));
        assert_eq!(record.status, "valid");
    }

    #[test]
    fn test_decode_stringifies_non_string_cells() {
        let outcome = decode_row(&row(&[
            json!(12345),
            json!(" 2024-02-29 "),
            json!("2025-02-28"),
            json!(365),
            json!(true),
        ]));

        let RowOutcome::Parsed(record) = outcome else {
            panic!("expected a parsed row, got {outcome:?}");
        };
        assert_eq!(record.name, "12345");
        assert_eq!(record.duration, Duration::days(365));
        assert_eq!(record.status, "true");
    }

    #[test]
    fn test_decode_skip_reasons() {
        assert_eq!(
            decode_row(&row(&[json!("A"), json!("2020-01-01")])),
            RowOutcome::Skipped {
                reason: SkipReason::TooFewColumns { found: 2 }
            }
        );
        assert_eq!(
            decode_row(&row(&[
                json!("A"),
                json!("01/01/2020"),
                json!("2030-01-01"),
                json!("10"),
                json!("ok")
            ])),
            RowOutcome::Skipped {
                reason: SkipReason::InvalidIssueDate
            }
        );
        assert_eq!(
            decode_row(&row(&[
                json!("A"),
                json!("2020-01-01"),
                json!("2030-13-01"),
                json!("10"),
                json!("ok")
            ])),
            RowOutcome::Skipped {
                reason: SkipReason::InvalidExpiryDate
            }
        );
        assert_eq!(
            decode_row(&row(&[
                json!("A"),
                json!("2020-01-01"),
                json!("2030-01-01"),
                json!("ten"),
                json!("ok")
            ])),
            RowOutcome::Skipped {
                reason: SkipReason::InvalidDuration
            }
        );
    }

    #[test]
    fn test_decode_rows_keeps_only_complete_records() {
        let rows = vec![
            row(&[
                json!("Name"),
                json!("Issue Date"),
                json!("Expiry Date"),
                json!("Duration"),
                json!("Status"),
            ]),
            row(&[
                json!("Passport"),
                json!("2020-01-01"),
                json!("2030-01-01"),
                json!("3653"),
                json!("valid"),
            ]),
            row(&[json!("Visa")]),
        ];

        let records = decode_rows(&rows);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Passport");
    }

    #[tokio::test]
    async fn test_read_range_invalid_id_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let api = TestFixtures::api_client(&server.uri());
        let result = SheetReader::new(&api).read_range("bad id!", "Sheet1!A1:E10").await;
        assert!(matches!(result, Err(SheetError::Validation(_))));
    }

    #[tokio::test]
    async fn test_read_range_decodes_values() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!(
                "/v4/spreadsheets/{}/values/Sheet1!A1:E10",
                TestFixtures::SPREADSHEET_ID
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "range": "Sheet1!A1:E10",
                "majorDimension": "ROWS",
                "values": [
                    ["Passport", "2020-01-01", "2030-01-01", "3653", "valid"],
                    ["Licence", "2019-05-01", "bad", "365", "valid"]
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = TestFixtures::api_client(&server.uri());
        let records = SheetReader::new(&api)
            .read_range(TestFixtures::SPREADSHEET_ID, "Sheet1!A1:E10")
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Passport");
    }

    #[tokio::test]
    async fn test_read_range_empty_sheet_and_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!(
                "/v4/spreadsheets/{}/values/Empty!A1:E10",
                TestFixtures::SPREADSHEET_ID
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"range": "Empty!A1:E10"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!(
                "/v4/spreadsheets/{}/values/Missing!A1:E10",
                TestFixtures::SPREADSHEET_ID
            )))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let api = TestFixtures::api_client(&server.uri());
        let reader = SheetReader::new(&api);

        let empty = reader
            .read_range(TestFixtures::SPREADSHEET_ID, "Empty!A1:E10")
            .await
            .unwrap();
        assert!(empty.is_empty());

        let missing = reader
            .read_range(TestFixtures::SPREADSHEET_ID, "Missing!A1:E10")
            .await;
        assert!(matches!(missing, Err(SheetError::Read(_))));
    }
}
