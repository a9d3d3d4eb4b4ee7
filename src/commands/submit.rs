use crate::commands::Out;
use crate::pipeline::{self, Submission};
use crate::{api, Config, Mode, Result};
use anyhow::Context;
use std::io::{BufRead, Write};

/// Handles `sandwiches submit`. Records one market's sales figures and suggests what to prepare
/// for the next market.
///
/// With `data` the figures are validated once and invalid figures are an error. Without it they
/// are read from stdin, prompting again until they are valid.
pub async fn submit(config: Config, mode: Mode, data: Option<&str>) -> Result<Out<Submission>> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stdout();
    submit_with(config, mode, data, &mut input, &mut output).await
}

async fn submit_with<R, W>(
    config: Config,
    mode: Mode,
    data: Option<&str>,
    input: &mut R,
    output: &mut W,
) -> Result<Out<Submission>>
where
    R: BufRead + ?Sized,
    W: Write + ?Sized,
{
    let sales = match data {
        Some(raw) => Some(
            pipeline::parse(raw).with_context(|| format!("Invalid sales data '{raw}'"))?,
        ),
        None => None,
    };

    let mut store = api::store(&config, mode).await?;
    let submission = match sales {
        Some(sales) => pipeline::submit(store.as_mut(), sales, output).await?,
        None => pipeline::run(store.as_mut(), input, output).await?,
    };

    present(&submission, output)?;
    Ok(Out::new(
        format!(
            "Recorded the sales in row {} and the restock suggestion in the stock worksheet",
            submission.sales_row
        ),
        submission,
    ))
}

/// Writes the restock suggestions to `output`, one `item: quantity` line each in heading order.
fn present<W: Write + ?Sized>(submission: &Submission, output: &mut W) -> Result<()> {
    writeln!(
        output,
        "Make the following numbers of sandwiches for next market:"
    )?;
    for suggestion in &submission.suggestions {
        writeln!(output, "{}: {}", suggestion.item, suggestion.quantity)?;
    }
    output.flush()?;
    Ok(())
}
