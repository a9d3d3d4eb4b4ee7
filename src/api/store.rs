//! Implements the `Store` trait on top of any `Sheet`.

use crate::api::{a1_range, Log, Sheet, SheetRange, Store, StoredRow};
use crate::config::{StoreRetry, Worksheets};
use crate::Result;
use anyhow::{bail, Context};
use std::collections::HashMap;
use tracing::{trace, warn};

/// Implements the `Store` trait over a dynamically-dispatched `sheet`.
///
/// Reads that fail are retried with backoff according to `retry`. Appends are not retried. Before
/// an append, the worksheet's row count is compared with the count seen when it was last read in
/// this run; if another writer added or removed rows in between, the append fails instead of
/// writing over or beside their rows.
pub(super) struct StoreImpl {
    sheet: Box<dyn Sheet + Send>,
    worksheets: Worksheets,
    retry: StoreRetry,
    /// Worksheet name -> number of rows (header included) when last read or written.
    observed: HashMap<String, usize>,
}

impl StoreImpl {
    pub(super) fn new(
        sheet: Box<dyn Sheet + Send>,
        worksheets: Worksheets,
        retry: StoreRetry,
    ) -> Self {
        Self {
            sheet,
            worksheets,
            retry,
            observed: HashMap::new(),
        }
    }

    /// Reads every row of `name`, retrying failed reads.
    async fn get_with_retry(&mut self, name: &str) -> Result<Vec<Vec<String>>> {
        let attempts = self.retry.attempts();
        let mut attempt = 1;
        loop {
            match self.sheet.get(name).await {
                Ok(rows) => return Ok(rows),
                Err(e) if attempt < attempts => {
                    let delay = self.retry.delay(attempt);
                    warn!(
                        "Reading the '{name}' worksheet failed (attempt {attempt} of {attempts}), \
                        retrying in {delay:?}: {e:#}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(e.context(format!(
                        "Unable to read the '{name}' worksheet after {attempts} attempts"
                    )))
                }
            }
        }
    }

    /// Reads every row of the worksheet for `log` and remembers how many there were.
    async fn fetch(&mut self, log: Log) -> Result<Vec<Vec<String>>> {
        let name = self.worksheets.name(log).to_string();
        let rows = self.get_with_retry(&name).await?;
        trace!("Read {} rows from '{name}'", rows.len());
        if rows.is_empty() {
            bail!("The '{name}' worksheet has no header row");
        }
        self.observed.insert(name, rows.len());
        Ok(rows)
    }
}

#[async_trait::async_trait]
impl Store for StoreImpl {
    fn worksheet(&self, log: Log) -> &str {
        self.worksheets.name(log)
    }

    async fn read_recent_rows(&mut self, log: Log, count: usize) -> Result<Vec<StoredRow>> {
        let rows = self.fetch(log).await?;
        let start = rows.len().saturating_sub(count).max(1);
        Ok(rows
            .into_iter()
            .enumerate()
            .skip(start)
            .map(|(ix, cells)| StoredRow {
                number: ix + 1,
                cells,
            })
            .collect())
    }

    async fn read_last_row(&mut self, log: Log) -> Result<Option<StoredRow>> {
        let mut rows = self.fetch(log).await?;
        let number = rows.len();
        if number < 2 {
            return Ok(None);
        }
        Ok(rows.pop().map(|cells| StoredRow { number, cells }))
    }

    async fn read_headings(&mut self, log: Log) -> Result<Vec<String>> {
        let mut rows = self.fetch(log).await?;
        Ok(rows.swap_remove(0))
    }

    async fn append_row(&mut self, log: Log, row: &[String]) -> Result<usize> {
        let name = self.worksheets.name(log).to_string();
        let current = self.get_with_retry(&name).await?.len();
        if current == 0 {
            bail!("The '{name}' worksheet has no header row");
        }
        if let Some(&expected) = self.observed.get(&name) {
            if expected != current {
                bail!(
                    "The '{name}' worksheet changed while this run was using it: it had \
                    {expected} rows and now has {current}. Another run may be writing to the \
                    same spreadsheet"
                );
            }
        }

        let number = current + 1;
        let range = SheetRange {
            range: a1_range(&name, &format!("A{number}")),
            values: vec![row.to_vec()],
        };
        trace!("Appending {row:?} at {}", range.range);
        self.sheet
            .write_ranges(&[range])
            .await
            .with_context(|| format!("Unable to append a row to the '{name}' worksheet"))?;
        self.observed.insert(name, number);
        Ok(number)
    }
}
