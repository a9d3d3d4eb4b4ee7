//! Types that represent the core data model, such as `SalesRow` and `SalesHistory`.
//!
//! Every row holds one whole number per sandwich type. The position in the row is the only
//! identity of the sandwich type; the names live in the header row of the stock worksheet.
mod headings;
mod history;
mod row;

pub use headings::{Headings, Suggestion};
pub use history::SalesHistory;
pub use row::{RestockRow, SalesRow, StockRow, SurplusRow};

/// The number of sandwich types, i.e. the width of every row.
pub const ROW_WIDTH: usize = 6;

/// The number of past markets that a restock suggestion is averaged over.
pub const HISTORY_PERIODS: usize = 5;
