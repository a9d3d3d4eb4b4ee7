use crate::api::StoredRow;
use crate::error::PipelineError;
use crate::model::{SalesRow, HISTORY_PERIODS, ROW_WIDTH};
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};

/// The most recent `HISTORY_PERIODS` sales figures for each sandwich type, oldest first. Rows from
/// the sales log are reshaped into one column per sandwich type.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SalesHistory {
    columns: [[i64; HISTORY_PERIODS]; ROW_WIDTH],
}

impl SalesHistory {
    pub fn new(columns: [[i64; HISTORY_PERIODS]; ROW_WIDTH]) -> Self {
        Self { columns }
    }

    /// Builds the history from sales log rows, oldest first, as read from `worksheet`.
    ///
    /// Only the newest `HISTORY_PERIODS` rows are used, so every column covers the same markets. A
    /// missing or blank cell means that sandwich type has no figure for that market, and then the
    /// history is short: this fails with `PipelineError::InsufficientHistory`. A row wider than
    /// `ROW_WIDTH` is a `PipelineError::Shape` naming its row in the worksheet.
    pub fn from_rows(worksheet: &str, rows: &[StoredRow]) -> Result<Self> {
        let newest = &rows[rows.len().saturating_sub(HISTORY_PERIODS)..];
        let mut found: Vec<Vec<i64>> = vec![Vec::new(); ROW_WIDTH];
        for row in newest {
            if row.cells.len() > ROW_WIDTH {
                return Err(PipelineError::Shape {
                    worksheet: worksheet.to_string(),
                    row: row.number,
                    expected: ROW_WIDTH,
                    found: row.cells.len(),
                }
                .into());
            }
            for (col_ix, cell) in row.cells.iter().enumerate() {
                let cell = cell.trim();
                if cell.is_empty() {
                    continue;
                }
                let value: i64 = cell.parse().with_context(|| {
                    format!(
                        "The sales figure '{cell}' in row {}, column {} of the '{worksheet}' \
                        worksheet is not a whole number",
                        row.number,
                        col_ix + 1
                    )
                })?;
                found[col_ix].push(value);
            }
        }

        let mut columns = [[0i64; HISTORY_PERIODS]; ROW_WIDTH];
        for (item, values) in found.iter().enumerate() {
            let values: [i64; HISTORY_PERIODS] = values.as_slice().try_into().map_err(|_| {
                PipelineError::InsufficientHistory {
                    item,
                    found: values.len(),
                    required: HISTORY_PERIODS,
                }
            })?;
            columns[item] = values;
        }
        Ok(Self { columns })
    }

    /// Builds the history that will exist once `pending` has been appended after `prior`. Used to
    /// check that a restock can be suggested before anything is written.
    pub fn with_pending(worksheet: &str, prior: &[StoredRow], pending: &SalesRow) -> Result<Self> {
        let mut rows = prior.to_vec();
        rows.push(StoredRow {
            number: prior.last().map_or(2, |row| row.number + 1),
            cells: pending.to_cells(),
        });
        Self::from_rows(worksheet, &rows)
    }

    /// One column per sandwich type, each holding its figures oldest first.
    pub fn columns(&self) -> &[[i64; HISTORY_PERIODS]; ROW_WIDTH] {
        &self.columns
    }
}
