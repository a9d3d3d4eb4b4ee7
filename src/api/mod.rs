//! Access to the Google Sheet that holds the sales, surplus and stock logs.
//!
//! There are two layers:
//! - `Sheet` reads and writes raw cells of a worksheet. It is implemented by `GoogleSheet` for the
//!   real thing and `TestSheet` for an in-memory spreadsheet.
//! - `Store` is what the sales pipeline sees: recent rows, the last row, the headings and appending
//!   a row to a named log. It is implemented once, on top of any `Sheet`.

mod files;
mod oauth;
mod sheet;
mod sheet_test_client;
mod store;

use crate::{Config, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub(crate) use oauth::TokenProvider;
pub(crate) use sheet_test_client::TestSheet;
#[cfg(test)]
pub(crate) use sheet_test_client::TestSheetState;

/// The environment variable that switches the app to an in-memory spreadsheet.
pub const TEST_MODE_ENV: &str = "SANDWICHES_IN_TEST_MODE";

// OAuth scopes required for Sheets API access
const OAUTH_SCOPES: &[&str] = &["https://www.googleapis.com/auth/spreadsheets"];

/// The append-only logs kept in the spreadsheet, one worksheet each.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Log {
    /// Figures sold at each market.
    Sales,
    /// Stock minus sales for each market.
    Surplus,
    /// Figures prepared for each market. The restock suggestion is appended here.
    Stock,
}

serde_plain::derive_display_from_serialize!(Log);
serde_plain::derive_fromstr_from_deserialize!(Log);

/// Whether to talk to Google or to an in-memory spreadsheet.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Google,
    Test,
}

serde_plain::derive_display_from_serialize!(Mode);

impl Mode {
    /// `Mode::Test` when `SANDWICHES_IN_TEST_MODE` is set and non-empty, otherwise `Mode::Google`.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Google,
        }
    }
}

/// A block of rows to write, starting at the top-left cell of `range` in A1 notation.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct SheetRange {
    pub(crate) range: String,
    pub(crate) values: Vec<Vec<String>>,
}

/// Raw access to the worksheets of a spreadsheet.
#[async_trait::async_trait]
pub(crate) trait Sheet {
    /// All rows of the worksheet named `sheet_name`, header row included, as formatted strings.
    async fn get(&mut self, sheet_name: &str) -> Result<Vec<Vec<String>>>;

    /// Writes each block of rows at its range.
    async fn write_ranges(&mut self, data: &[SheetRange]) -> Result<()>;
}

/// Builds an A1 range such as `'roast beef'!A7`. The sheet name is always quoted so that names
/// with spaces or punctuation work.
pub(crate) fn a1_range(sheet_name: &str, cells: &str) -> String {
    format!("'{}'!{cells}", sheet_name.replace('\'', "''"))
}

/// Splits an A1 range built by `a1_range` back into the sheet name and the cell part.
pub(crate) fn split_a1_range(range: &str) -> Option<(String, &str)> {
    let (sheet, cells) = range.rsplit_once('!')?;
    let sheet = match sheet.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        Some(quoted) => quoted.replace("''", "'"),
        None => sheet.to_string(),
    };
    Some((sheet, cells))
}

/// A row read from a log along with its 1-based row number in the worksheet.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct StoredRow {
    pub number: usize,
    pub cells: Vec<String>,
}

/// The operations the sales pipeline needs from the spreadsheet. Row 1 of each worksheet is the
/// header row and is never returned as data.
#[async_trait::async_trait]
pub trait Store {
    /// The worksheet name that holds `log`, for messages.
    fn worksheet(&self, log: Log) -> &str;

    /// The most recent `count` data rows of `log` with their row numbers, oldest first. Fewer when
    /// the log is shorter.
    async fn read_recent_rows(&mut self, log: Log, count: usize) -> Result<Vec<StoredRow>>;

    /// The most recently appended data row of `log`, if there is one.
    async fn read_last_row(&mut self, log: Log) -> Result<Option<StoredRow>>;

    /// The header row of `log`.
    async fn read_headings(&mut self, log: Log) -> Result<Vec<String>>;

    /// Appends `row` after the last row of `log` and returns its row number.
    async fn append_row(&mut self, log: Log, row: &[String]) -> Result<usize>;
}

/// Creates the `Store` for `config`, backed by Google or by the in-memory `TestSheet`.
pub(crate) async fn store(config: &Config, mode: Mode) -> Result<Box<dyn Store + Send>> {
    debug!("Opening the {mode} spreadsheet {}", config.spreadsheet_id());
    let sheet: Box<dyn Sheet + Send> = match mode {
        Mode::Google => {
            let token_provider =
                TokenProvider::load(config.client_secret_path(), config.token_path()).await?;
            Box::new(sheet::GoogleSheet::new(config.clone(), token_provider).await?)
        }
        Mode::Test => Box::new(TestSheet::new(config.spreadsheet_id())),
    };
    Ok(Box::new(store::StoreImpl::new(
        sheet,
        config.worksheets().clone(),
        config.store_retry(),
    )))
}
