use crate::model::{RestockRow, SalesHistory, ROW_WIDTH};
use crate::Result;
use anyhow::Context;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Suggested stock is the average of past sales plus 10%.
fn safety_margin() -> Decimal {
    Decimal::new(11, 1)
}

/// Suggests how many of each sandwich type to make for the next market: the mean of its sales
/// history times 1.1, rounded to the nearest whole number with halves rounded away from zero.
///
/// The arithmetic is done in decimal so that, e.g., a mean of 15 gives exactly 16.5 and rounds to 17.
pub fn estimate(history: &SalesHistory) -> Result<RestockRow> {
    let mut values = [0i64; ROW_WIDTH];
    for (item, column) in history.columns().iter().enumerate() {
        let total: Decimal = column.iter().map(|&v| Decimal::from(v)).sum();
        let mean = total / Decimal::from(column.len());
        let suggestion = (mean * safety_margin())
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        values[item] = suggestion
            .to_i64()
            .with_context(|| format!("The restock suggestion {suggestion} is too large"))?;
    }
    Ok(RestockRow::new(values))
}
