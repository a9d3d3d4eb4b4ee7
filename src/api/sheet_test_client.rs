//! Implements the very simple `Sheet` trait using in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without using Google Sheets.

use crate::api::{split_a1_range, Sheet, SheetRange};
use crate::Result;
use anyhow::{bail, Context};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{LazyLock, Mutex, PoisonError};

/// The in-memory spreadsheets, keyed by spreadsheet ID. They live for the life of the process, so
/// separate `TestSheet` objects with the same ID see each other's writes.
static SPREADSHEETS: LazyLock<Mutex<HashMap<String, TestSheetState>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// The contents of one in-memory spreadsheet. The map key is the worksheet name and the map value
/// is the rows of the worksheet.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub(crate) struct TestSheetState {
    pub(crate) worksheets: HashMap<String, Vec<Vec<String>>>,
}

/// An implementation of the `Sheet` trait that does not use Google sheets. The first time a
/// spreadsheet ID is used it is seeded with sample data.
pub(crate) struct TestSheet {
    spreadsheet_id: String,
}

impl TestSheet {
    pub(crate) fn new(spreadsheet_id: impl Into<String>) -> Self {
        let spreadsheet_id = spreadsheet_id.into();
        lock()
            .entry(spreadsheet_id.clone())
            .or_insert_with(default_data);
        Self { spreadsheet_id }
    }

    /// A copy of the current contents of this spreadsheet.
    #[cfg(test)]
    pub(crate) fn get_state(&self) -> TestSheetState {
        lock()
            .get(&self.spreadsheet_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Replaces the contents of this spreadsheet.
    #[cfg(test)]
    pub(crate) fn set_state(&self, state: TestSheetState) {
        lock().insert(self.spreadsheet_id.clone(), state);
    }
}

fn lock() -> std::sync::MutexGuard<'static, HashMap<String, TestSheetState>> {
    SPREADSHEETS.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait::async_trait]
impl Sheet for TestSheet {
    async fn get(&mut self, sheet_name: &str) -> Result<Vec<Vec<String>>> {
        lock()
            .get(&self.spreadsheet_id)
            .and_then(|state| state.worksheets.get(sheet_name))
            .cloned()
            .with_context(|| format!("Worksheet '{sheet_name}' not found"))
    }

    async fn write_ranges(&mut self, data: &[SheetRange]) -> Result<()> {
        let mut spreadsheets = lock();
        let state = spreadsheets
            .get_mut(&self.spreadsheet_id)
            .with_context(|| format!("Spreadsheet '{}' not found", self.spreadsheet_id))?;
        for sheet_range in data {
            let (sheet_name, start_row) = parse_start(&sheet_range.range)?;
            let rows = state
                .worksheets
                .get_mut(&sheet_name)
                .with_context(|| format!("Worksheet '{sheet_name}' not found"))?;
            for (offset, values) in sheet_range.values.iter().enumerate() {
                let ix = start_row - 1 + offset;
                if rows.len() <= ix {
                    rows.resize(ix + 1, Vec::new());
                }
                rows[ix] = values.clone();
            }
        }
        Ok(())
    }
}

/// Parses a range like `'sales'!A7` into the sheet name and the 1-based row. Only ranges that start
/// in column A are supported.
fn parse_start(range: &str) -> Result<(String, usize)> {
    let (sheet_name, cells) =
        split_a1_range(range).with_context(|| format!("Invalid range '{range}'"))?;
    let row = match cells.strip_prefix('A') {
        Some(row) => row
            .parse::<usize>()
            .with_context(|| format!("Invalid row in range '{range}'"))?,
        None => bail!("Only ranges starting in column A are supported, got '{range}'"),
    };
    if row == 0 {
        bail!("Rows are numbered from 1, got '{range}'");
    }
    Ok((sheet_name, row))
}

/// Provides the seed data from this module.
fn default_data() -> TestSheetState {
    let mut worksheets = HashMap::new();
    for (name, data) in [
        ("sales", SALES_DATA),
        ("surplus", SURPLUS_DATA),
        ("stock", STOCK_DATA),
    ] {
        let rows = load_csv(data).unwrap_or_default();
        worksheets.insert(name.to_string(), rows);
    }
    TestSheetState { worksheets }
}

/// Loads data from a CSV-formatted string.
fn load_csv(csv_data: &str) -> Result<Vec<Vec<String>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false) // Ensure headers are treated as part of the data
        .flexible(true)
        .from_reader(Cursor::new(csv_data.as_bytes()));

    let mut rows: Vec<Vec<String>> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(|field| field.to_string()).collect());
    }
    Ok(rows)
}

/// Seed sales data.
const SALES_DATA: &str = r##"cheese,ham,turkey,roast beef,tuna,chicken
22,23,17,21,19,17
28,25,18,26,23,21
30,28,21,25,19,22
32,28,26,31,26,22
26,24,19,21,22,25
24,26,27,29,27,21
29,27,23,25,22,22
25,23,22,21,20,24
"##;

/// Seed surplus data.
const SURPLUS_DATA: &str = r##"cheese,ham,turkey,roast beef,tuna,chicken
2,1,8,4,5,6
-4,4,3,-3,1,2
-2,1,-2,1,5,0
-4,-3,-4,-6,-1,1
6,1,5,7,2,-3
6,2,-3,1,2,-1
"##;

/// Seed stock data.
const STOCK_DATA: &str = r##"cheese,ham,turkey,roast beef,tuna,chicken
24,24,25,25,24,23
24,29,21,23,24,23
28,29,19,26,24,22
28,25,22,25,25,23
32,25,24,28,24,22
30,28,24,30,29,20
31,27,25,28,24,23
"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_data() {
        let state = default_data();
        assert_eq!(state.worksheets.len(), 3);
        let sales = &state.worksheets["sales"];
        assert_eq!(sales[0][3], "roast beef");
        assert_eq!(sales.len(), 9);
        assert!(state
            .worksheets
            .values()
            .flatten()
            .all(|row| row.len() == 6));
    }

    #[tokio::test]
    async fn test_write_then_get() {
        let mut sheet = TestSheet::new("test-sheet-write-then-get");
        let range = SheetRange {
            range: "'surplus'!A8".to_string(),
            values: vec![vec!["1".to_string(); 6]],
        };
        sheet.write_ranges(&[range]).await.unwrap();
        let rows = sheet.get("surplus").await.unwrap();
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[7], vec!["1".to_string(); 6]);

        // Another handle on the same spreadsheet sees the write
        let mut other = TestSheet::new("test-sheet-write-then-get");
        assert_eq!(other.get("surplus").await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_get_missing_worksheet() {
        let mut sheet = TestSheet::new("test-sheet-missing");
        let e = sheet.get("Transactions").await.unwrap_err();
        assert!(e.to_string().contains("'Transactions' not found"));
    }

    #[test]
    fn test_parse_start() {
        assert_eq!(parse_start("'sales'!A12").unwrap(), ("sales".to_string(), 12));
        assert!(parse_start("'sales'!B12").is_err());
        assert!(parse_start("'sales'!A0").is_err());
        assert!(parse_start("sales").is_err());
    }
}
