//! The sales pipeline: validate the figures from the last market, record them, work out the surplus
//! against what was prepared, and suggest what to prepare for the next market.

mod input;
mod orchestrator;
mod restock;
mod surplus;

pub use input::{parse, read_sales};
pub use orchestrator::{run, submit, Stage, Submission};
pub use restock::estimate;
pub use surplus::surplus;
