use crate::error::PipelineError;
use crate::model::ROW_WIDTH;
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Defines a fixed-width row of figures with the conversions every row kind shares.
macro_rules! figures_row {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
        pub struct $name([i64; ROW_WIDTH]);

        impl $name {
            pub fn new(values: [i64; ROW_WIDTH]) -> Self {
                Self(values)
            }

            pub fn values(&self) -> &[i64; ROW_WIDTH] {
                &self.0
            }

            /// The cells to append to a worksheet.
            pub(crate) fn to_cells(&self) -> Vec<String> {
                self.0.iter().map(|v| v.to_string()).collect()
            }
        }

        impl From<[i64; ROW_WIDTH]> for $name {
            fn from(values: [i64; ROW_WIDTH]) -> Self {
                Self(values)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_cells().join(","))
            }
        }
    };
}

figures_row!(
    /// The number of each sandwich type sold at one market.
    SalesRow
);

figures_row!(
    /// The number of each sandwich type prepared for one market.
    StockRow
);

figures_row!(
    /// Stock minus sales for one market. Positive values are waste, negative values mean the item
    /// sold out and extra had to be made.
    SurplusRow
);

figures_row!(
    /// The suggested number of each sandwich type to prepare for the next market.
    RestockRow
);

impl StockRow {
    /// Parses a row read from `worksheet`, where `row` is its 1-based row number. Fails with
    /// `PipelineError::Shape` if there are not exactly `ROW_WIDTH` cells.
    pub(crate) fn from_cells<S: AsRef<str>>(worksheet: &str, row: usize, cells: &[S]) -> Result<Self> {
        Ok(Self(parse_cells(worksheet, row, cells)?))
    }
}

fn parse_cells<S: AsRef<str>>(worksheet: &str, row: usize, cells: &[S]) -> Result<[i64; ROW_WIDTH]> {
    if cells.len() != ROW_WIDTH {
        return Err(PipelineError::Shape {
            worksheet: worksheet.to_string(),
            row,
            expected: ROW_WIDTH,
            found: cells.len(),
        }
        .into());
    }
    let mut values = [0i64; ROW_WIDTH];
    for (ix, cell) in cells.iter().enumerate() {
        let cell = cell.as_ref().trim();
        values[ix] = cell.parse().with_context(|| {
            format!(
                "The value '{cell}' in row {row}, column {} of the '{worksheet}' worksheet is not a \
                whole number",
                ix + 1
            )
        })?;
    }
    Ok(values)
}
