use crate::api::{Log, Store};
use crate::error::PipelineError;
use crate::model::{
    Headings, RestockRow, SalesHistory, SalesRow, StockRow, Suggestion, SurplusRow,
    HISTORY_PERIODS,
};
use crate::pipeline::{estimate, read_sales, surplus};
use crate::{Error, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use tracing::{debug, info};

/// The stages of one run, in order. A run moves through every stage exactly once; only
/// `AwaitingInput` repeats, while the entered figures are invalid.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    AwaitingInput,
    Validated,
    SalesPersisted,
    SurplusComputed,
    SurplusPersisted,
    HistoryFetched,
    RestockComputed,
    RestockPersisted,
    Done,
}

serde_plain::derive_display_from_serialize!(Stage);

impl Stage {
    /// The stage that must follow this one, `None` after `Done`.
    pub fn next(self) -> Option<Stage> {
        use Stage::*;
        match self {
            AwaitingInput => Some(Validated),
            Validated => Some(SalesPersisted),
            SalesPersisted => Some(SurplusComputed),
            SurplusComputed => Some(SurplusPersisted),
            SurplusPersisted => Some(HistoryFetched),
            HistoryFetched => Some(RestockComputed),
            RestockComputed => Some(RestockPersisted),
            RestockPersisted => Some(Done),
            Done => None,
        }
    }
}

#[derive(Debug, Default)]
struct Progress {
    stage: Stage,
}

impl Progress {
    fn advance(&mut self, to: Stage) -> Result<()> {
        if self.stage.next() != Some(to) {
            bail!("A run cannot move from {} to {to}", self.stage);
        }
        debug!("{} -> {to}", self.stage);
        self.stage = to;
        Ok(())
    }
}

/// Everything one run computed and wrote.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub sales: SalesRow,
    /// The row of the sales worksheet the figures were written to.
    pub sales_row: usize,
    /// The row of the stock worksheet the surplus was computed against.
    pub stock_row: usize,
    pub surplus: SurplusRow,
    pub restock: RestockRow,
    /// The restock figures labelled with the sandwich names, in column order.
    pub suggestions: Vec<Suggestion>,
}

/// What is read and checked before anything is written.
struct Preflight {
    headings: Headings,
    stock: StockRow,
    stock_row: usize,
}

/// Prompts for sales figures until valid ones are entered, then runs `submit` with them.
pub async fn run<R, W>(
    store: &mut (dyn Store + Send),
    input: &mut R,
    output: &mut W,
) -> Result<Submission>
where
    R: BufRead + ?Sized,
    W: Write + ?Sized,
{
    let sales = read_sales(input, output)?;
    submit(store, sales, output).await
}

/// Records validated `sales` and computes the surplus and restock rows, writing progress messages
/// to `output`.
///
/// The stock row, headings and enough sales history are read and checked first, so a `Shape` or
/// `InsufficientHistory` error, or a surplus out of range, leaves the spreadsheet untouched. After
/// that, a store failure ends the run where it happened; rows already written stay written.
pub async fn submit<W>(
    store: &mut (dyn Store + Send),
    sales: SalesRow,
    output: &mut W,
) -> Result<Submission>
where
    W: Write + ?Sized,
{
    let mut progress = Progress::default();
    progress.advance(Stage::Validated)?;
    let Preflight {
        headings,
        stock,
        stock_row,
    } = preflight(store, &sales).await?;

    let sales_row = persist(store, Log::Sales, &sales.to_cells(), output).await?;
    progress.advance(Stage::SalesPersisted)?;

    let surplus = surplus(&sales, &stock)?;
    debug!("Surplus against stock row {stock_row}: {surplus}");
    progress.advance(Stage::SurplusComputed)?;

    persist(store, Log::Surplus, &surplus.to_cells(), output).await?;
    progress.advance(Stage::SurplusPersisted)?;

    let sales_sheet = store.worksheet(Log::Sales).to_string();
    let recent = store
        .read_recent_rows(Log::Sales, HISTORY_PERIODS)
        .await
        .map_err(store_failure(format!(
            "read recent rows of the '{sales_sheet}' worksheet"
        )))?;
    let history = SalesHistory::from_rows(&sales_sheet, &recent)?;
    progress.advance(Stage::HistoryFetched)?;

    writeln!(output, "Calculating stock data...")?;
    let restock = estimate(&history)?;
    progress.advance(Stage::RestockComputed)?;

    persist(store, Log::Stock, &restock.to_cells(), output).await?;
    progress.advance(Stage::RestockPersisted)?;

    let suggestions = headings.label(&restock);
    progress.advance(Stage::Done)?;
    info!("Recorded sales in row {sales_row}, suggested restock {restock}");

    Ok(Submission {
        sales,
        sales_row,
        stock_row,
        surplus,
        restock,
        suggestions,
    })
}

async fn preflight(store: &mut (dyn Store + Send), sales: &SalesRow) -> Result<Preflight> {
    let stock_sheet = store.worksheet(Log::Stock).to_string();
    let sales_sheet = store.worksheet(Log::Sales).to_string();

    let headings = store
        .read_headings(Log::Stock)
        .await
        .map_err(store_failure(format!(
            "read the headings of the '{stock_sheet}' worksheet"
        )))?;
    let headings = Headings::new(&stock_sheet, headings)?;

    let last = store
        .read_last_row(Log::Stock)
        .await
        .map_err(store_failure(format!(
            "read the last row of the '{stock_sheet}' worksheet"
        )))?
        .with_context(|| {
            format!("The '{stock_sheet}' worksheet has no stock figures to compare the sales with")
        })?;
    let stock = StockRow::from_cells(&stock_sheet, last.number, &last.cells)?;
    surplus(sales, &stock)?;

    let prior = store
        .read_recent_rows(Log::Sales, HISTORY_PERIODS - 1)
        .await
        .map_err(store_failure(format!(
            "read recent rows of the '{sales_sheet}' worksheet"
        )))?;
    SalesHistory::with_pending(&sales_sheet, &prior, sales)?;

    Ok(Preflight {
        headings,
        stock,
        stock_row: last.number,
    })
}

async fn persist<W>(
    store: &mut (dyn Store + Send),
    log: Log,
    row: &[String],
    output: &mut W,
) -> Result<usize>
where
    W: Write + ?Sized,
{
    let name = store.worksheet(log).to_string();
    writeln!(output, "Updating {name} worksheet...")?;
    let number = store
        .append_row(log, row)
        .await
        .map_err(store_failure(format!("update the '{name}' worksheet")))?;
    writeln!(output, "{name} worksheet updated successfully.\n")?;
    Ok(number)
}

fn store_failure(operation: String) -> impl FnOnce(Error) -> Error {
    move |e| PipelineError::store(operation, e).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{StoredRow, TestSheetState};
    use crate::test::TestEnv;
    use anyhow::anyhow;
    use std::io::Cursor;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    const HEADER: &[&str] = &["cheese", "ham", "turkey", "roast beef", "tuna", "chicken"];

    /// A spreadsheet with the given data rows under the standard header.
    fn state(sales: &[&[&str]], surplus: &[&[&str]], stock: &[&[&str]]) -> TestSheetState {
        let mut state = TestSheetState::default();
        for (name, rows) in [("sales", sales), ("surplus", surplus), ("stock", stock)] {
            let mut all = vec![cells(HEADER)];
            all.extend(rows.iter().map(|r| cells(r)));
            state.worksheets.insert(name.to_string(), all);
        }
        state
    }

    /// Passes everything through to `inner` except appends to `fail_on`.
    struct FailingStore {
        inner: Box<dyn Store + Send>,
        fail_on: Log,
    }

    #[async_trait::async_trait]
    impl Store for FailingStore {
        fn worksheet(&self, log: Log) -> &str {
            self.inner.worksheet(log)
        }

        async fn read_recent_rows(&mut self, log: Log, count: usize) -> Result<Vec<StoredRow>> {
            self.inner.read_recent_rows(log, count).await
        }

        async fn read_last_row(&mut self, log: Log) -> Result<Option<StoredRow>> {
            self.inner.read_last_row(log).await
        }

        async fn read_headings(&mut self, log: Log) -> Result<Vec<String>> {
            self.inner.read_headings(log).await
        }

        async fn append_row(&mut self, log: Log, row: &[String]) -> Result<usize> {
            if log == self.fail_on {
                return Err(anyhow!("The caller does not have permission"));
            }
            self.inner.append_row(log, row).await
        }
    }

    #[test]
    fn test_stages_are_sequential() {
        let mut progress = Progress::default();
        assert!(progress.advance(Stage::SalesPersisted).is_err());
        let mut stage = Stage::AwaitingInput;
        while let Some(next) = stage.next() {
            progress.advance(next).unwrap();
            stage = next;
        }
        assert_eq!(progress.stage, Stage::Done);
        assert!(progress.advance(Stage::AwaitingInput).is_err());
    }

    #[tokio::test]
    async fn test_run_with_seed_data() {
        let env = TestEnv::new().await;
        let before = env.get_state();
        let mut store = env.store().await;
        let mut input = Cursor::new("10,20,30\n10,20,30,40,50,60\n");
        let mut output = Vec::new();

        let submission = run(store.as_mut(), &mut input, &mut output)
            .await
            .unwrap();

        assert_eq!(submission.sales, SalesRow::new([10, 20, 30, 40, 50, 60]));
        assert_eq!(submission.sales_row, 10);
        assert_eq!(submission.stock_row, 8);
        // Last stock row is 31,27,25,28,24,23
        assert_eq!(
            submission.surplus,
            SurplusRow::new([21, 7, -5, -12, -26, -37])
        );
        // Means of the last five markets: 22.8, 24, 24.2, 27.2, 28.2, 30.4
        assert_eq!(submission.restock, RestockRow::new([25, 26, 27, 30, 31, 33]));
        assert_eq!(submission.suggestions[0].item, "cheese");
        assert_eq!(submission.suggestions[0].quantity, 25);
        assert_eq!(submission.suggestions[3].item, "roast beef");

        let after = env.get_state();
        for (name, added) in [("sales", "10"), ("surplus", "21"), ("stock", "25")] {
            let rows = &after.worksheets[name];
            assert_eq!(rows.len(), before.worksheets[name].len() + 1);
            assert_eq!(rows.last().unwrap()[0], added);
        }

        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("exactly 6 values required, you provided 3"));
        assert!(shown.contains("Updating sales worksheet..."));
        assert!(shown.contains("surplus worksheet updated successfully."));
        assert!(shown.contains("Calculating stock data..."));
    }

    #[tokio::test]
    async fn test_surplus_uses_last_stock_row() {
        let env = TestEnv::new().await;
        let history: &[&str] = &["1", "1", "1", "1", "1", "1"];
        env.set_state(state(
            &[history, history, history, history],
            &[],
            &[
                &["99", "99", "99", "99", "99", "99"],
                &["15", "25", "35", "45", "55", "65"],
            ],
        ));
        let mut store = env.store().await;
        let mut output = Vec::new();

        let submission = submit(
            store.as_mut(),
            SalesRow::new([10, 20, 30, 40, 50, 60]),
            &mut output,
        )
        .await
        .unwrap();

        assert_eq!(submission.stock_row, 3);
        assert_eq!(submission.surplus, SurplusRow::new([5, 5, 5, 5, 5, 5]));
        let after = env.get_state();
        assert_eq!(after.worksheets["surplus"][1], cells(&["5"; 6]));
    }

    #[tokio::test]
    async fn test_insufficient_history_writes_nothing() {
        let env = TestEnv::new().await;
        let row: &[&str] = &["1", "1", "1", "1", "1", "1"];
        let initial = state(&[row, row], &[], &[row]);
        env.set_state(initial.clone());
        let mut store = env.store().await;
        let mut output = Vec::new();

        let e = submit(store.as_mut(), SalesRow::new([1; 6]), &mut output)
            .await
            .unwrap_err();

        assert_eq!(
            e.downcast_ref::<PipelineError>(),
            Some(&PipelineError::InsufficientHistory {
                item: 0,
                found: 3,
                required: 5
            })
        );
        assert_eq!(env.get_state(), initial);
    }

    #[tokio::test]
    async fn test_short_stock_row_writes_nothing() {
        let env = TestEnv::new().await;
        let row: &[&str] = &["1", "1", "1", "1", "1", "1"];
        let initial = state(
            &[row, row, row, row],
            &[],
            &[&["15", "25", "35", "45", "55"]],
        );
        env.set_state(initial.clone());
        let mut store = env.store().await;
        let mut output = Vec::new();

        let e = submit(store.as_mut(), SalesRow::new([1; 6]), &mut output)
            .await
            .unwrap_err();

        assert_eq!(
            e.downcast_ref::<PipelineError>(),
            Some(&PipelineError::Shape {
                worksheet: "stock".to_string(),
                row: 2,
                expected: 6,
                found: 5
            })
        );
        assert_eq!(env.get_state(), initial);
    }

    #[tokio::test]
    async fn test_empty_stock_log() {
        let env = TestEnv::new().await;
        let row: &[&str] = &["1", "1", "1", "1", "1", "1"];
        let initial = state(&[row, row, row, row], &[], &[]);
        env.set_state(initial.clone());
        let mut store = env.store().await;
        let mut output = Vec::new();

        let e = submit(store.as_mut(), SalesRow::new([1; 6]), &mut output)
            .await
            .unwrap_err();
        assert!(e.to_string().contains("no stock figures"));
        assert_eq!(env.get_state(), initial);
    }

    #[tokio::test]
    async fn test_store_failure_ends_run_without_rollback() {
        let env = TestEnv::new().await;
        let before = env.get_state();
        let mut store = FailingStore {
            inner: env.store().await,
            fail_on: Log::Surplus,
        };
        let mut output = Vec::new();

        let e = submit(&mut store, SalesRow::new([1, 2, 3, 4, 5, 6]), &mut output)
            .await
            .unwrap_err();

        match e.downcast_ref::<PipelineError>() {
            Some(PipelineError::Store { operation, message }) => {
                assert_eq!(operation, "update the 'surplus' worksheet");
                assert!(message.contains("permission"));
            }
            other => panic!("expected a store error, got {other:?}"),
        }

        // The sales row stays written; nothing after it was
        let after = env.get_state();
        assert_eq!(
            after.worksheets["sales"].len(),
            before.worksheets["sales"].len() + 1
        );
        assert_eq!(after.worksheets["surplus"], before.worksheets["surplus"]);
        assert_eq!(after.worksheets["stock"], before.worksheets["stock"]);
    }

    #[tokio::test]
    async fn test_surplus_out_of_range_writes_nothing() {
        let env = TestEnv::new().await;
        let row: &[&str] = &["1", "1", "1", "1", "1", "1"];
        let initial = state(&[row, row, row, row], &[], &[&["-2", "0", "0", "0", "0", "0"]]);
        env.set_state(initial.clone());
        let mut store = env.store().await;
        let mut output = Vec::new();

        let sales = crate::pipeline::parse("9223372036854775807,0,0,0,0,0").unwrap();
        let e = submit(store.as_mut(), sales, &mut output)
            .await
            .unwrap_err();
        assert!(e.to_string().contains("out of range"));
        assert_eq!(env.get_state(), initial);
    }
}
