use crate::model::{SalesRow, StockRow, SurplusRow, ROW_WIDTH};
use crate::Result;
use anyhow::Context;

/// Computes `stock[i] - sales[i]` for each sandwich type. Positive values are waste, negative
/// values mean more sold than were prepared.
///
/// Both rows are exactly `ROW_WIDTH` wide by construction, so a stock row of the wrong width has
/// already failed with `PipelineError::Shape` when it was read. Fails if a difference does not fit
/// in an `i64`.
pub fn surplus(sales: &SalesRow, stock: &StockRow) -> Result<SurplusRow> {
    let mut values = [0i64; ROW_WIDTH];
    for (ix, value) in values.iter_mut().enumerate() {
        let (stocked, sold) = (stock.values()[ix], sales.values()[ix]);
        *value = stocked.checked_sub(sold).with_context(|| {
            format!(
                "The surplus in column {} is out of range: {stocked} prepared, {sold} sold",
                ix + 1
            )
        })?;
    }
    Ok(SurplusRow::new(values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surplus() {
        let stock = StockRow::new([15, 25, 35, 45, 55, 65]);
        let sales = SalesRow::new([10, 20, 30, 40, 50, 60]);
        assert_eq!(surplus(&sales, &stock).unwrap(), SurplusRow::new([5, 5, 5, 5, 5, 5]));
    }

    #[test]
    fn test_surplus_negative_when_sold_out() {
        let stock = StockRow::new([10, 10, 10, 10, 10, 10]);
        let sales = SalesRow::new([12, 10, 0, 9, 11, 30]);
        assert_eq!(
            surplus(&sales, &stock).unwrap(),
            SurplusRow::new([-2, 0, 10, 1, -1, -20])
        );
    }

    #[test]
    fn test_surplus_plus_sales_is_stock() {
        let cases = [
            ([0, 0, 0, 0, 0, 0], [0, 0, 0, 0, 0, 0]),
            ([22, 23, 17, 21, 19, 17], [28, 25, 18, 26, 23, 21]),
            ([100, 1, 50, 7, 0, 3], [3, 99, 50, 0, 8, 3]),
        ];
        for (sales, stock) in cases {
            let sales = SalesRow::new(sales);
            let stock = StockRow::new(stock);
            let result = surplus(&sales, &stock).unwrap();
            for ix in 0..ROW_WIDTH {
                assert_eq!(
                    result.values()[ix] + sales.values()[ix],
                    stock.values()[ix]
                );
            }
        }
    }

    #[test]
    fn test_surplus_out_of_range() {
        let sales = SalesRow::new([i64::MAX, 0, 0, 0, 0, 0]);
        let stock = StockRow::from_cells("stock", 2, &["-2", "0", "0", "0", "0", "0"]).unwrap();
        let e = surplus(&sales, &stock).unwrap_err();
        assert!(e.to_string().contains("column 1 is out of range"));
    }
}
