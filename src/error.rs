//! Error types for the sandwiches CLI.
//!
//! Most functions return `anyhow` errors with context attached at each I/O boundary. The failures
//! that the sales pipeline needs to tell apart are `PipelineError` variants carried inside the
//! `anyhow::Error`, and can be recovered with `downcast_ref::<PipelineError>()`.

use thiserror::Error;

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// The failures that can happen while processing one submission of sales figures.
///
/// `Format`, `Count` and `Range` are input validation failures. The interactive input loop reports
/// them and asks again, so they never end a run. The others end the run.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum PipelineError {
    /// A comma-separated token was not a whole number.
    #[error("'{token}' is not a whole number")]
    Format { token: String },

    /// The input did not have exactly the required number of values.
    #[error("exactly {expected} values required, you provided {found}")]
    Count { expected: usize, found: usize },

    /// A value was outside the accepted range.
    #[error("{value} is negative, sales figures cannot be less than zero")]
    Range { value: i64 },

    /// A row read from the store does not have the expected number of columns.
    #[error("row {row} of the '{worksheet}' worksheet has {found} columns, expected {expected}")]
    Shape {
        worksheet: String,
        row: usize,
        expected: usize,
        found: usize,
    },

    /// There are not enough past markets to average.
    #[error(
        "item {item} has {found} periods of sales history, at least {required} are needed to \
        suggest a restock"
    )]
    InsufficientHistory {
        item: usize,
        found: usize,
        required: usize,
    },

    /// The store could not be read or written.
    #[error("unable to {operation}: {message}")]
    Store { operation: String, message: String },
}

impl PipelineError {
    /// Wraps an error from the store, keeping its full context chain in the message.
    pub(crate) fn store(operation: impl Into<String>, e: Error) -> Self {
        Self::Store {
            operation: operation.into(),
            message: format!("{e:#}"),
        }
    }

    /// True for the errors that the input loop recovers from by prompting again.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PipelineError::Format { .. } | PipelineError::Count { .. } | PipelineError::Range { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_message_reports_found() {
        let e = PipelineError::Count {
            expected: 6,
            found: 3,
        };
        assert_eq!(e.to_string(), "exactly 6 values required, you provided 3");
    }

    #[test]
    fn test_store_error_keeps_context_chain() {
        let inner = anyhow::anyhow!("connection reset").context("Failed to fetch sales sheet data");
        let e = PipelineError::store("read the sales worksheet", inner);
        let message = e.to_string();
        assert!(message.starts_with("unable to read the sales worksheet"));
        assert!(message.contains("connection reset"));
        assert!(!e.is_input_error());
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let e: Error = PipelineError::Range { value: -1 }.into();
        let typed = e.downcast_ref::<PipelineError>().unwrap();
        assert!(typed.is_input_error());
    }
}
