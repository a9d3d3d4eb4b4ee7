mod api;
pub mod args;
pub mod commands;
mod config;
mod error;
pub mod model;
pub mod pipeline;
mod utils;

pub use api::{Log, Mode, Store, StoredRow, TEST_MODE_ENV};
pub use config::{Config, StoreRetry, Worksheets};
pub use error::{Error, PipelineError, Result};

#[cfg(test)]
mod test;
