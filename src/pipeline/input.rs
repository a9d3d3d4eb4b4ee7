//! Reading and validating the sales figures entered at the terminal.

use crate::error::PipelineError;
use crate::model::{SalesRow, ROW_WIDTH};
use crate::Result;
use anyhow::{bail, Context};
use std::io::{BufRead, Write};
use tracing::{debug, warn};

/// Parses one line of comma-separated sales figures.
///
/// Every token must be a whole number (surrounding whitespace is ignored), otherwise this is a
/// `Format` error, whatever the number of tokens. Then there must be exactly `ROW_WIDTH` tokens
/// (`Count`), and none of them may be negative (`Range`). An empty string is one empty token, which
/// is a `Format` error.
pub fn parse(raw: &str) -> std::result::Result<SalesRow, PipelineError> {
    let tokens: Vec<&str> = raw.split(',').collect();
    let mut values = Vec::with_capacity(tokens.len());
    for token in &tokens {
        let value: i64 = token.trim().parse().map_err(|_| PipelineError::Format {
            token: token.to_string(),
        })?;
        values.push(value);
    }

    let values: [i64; ROW_WIDTH] =
        values
            .as_slice()
            .try_into()
            .map_err(|_| PipelineError::Count {
                expected: ROW_WIDTH,
                found: tokens.len(),
            })?;

    if let Some(&value) = values.iter().find(|&&v| v < 0) {
        return Err(PipelineError::Range { value });
    }
    Ok(SalesRow::new(values))
}

/// Prompts on `output` and reads lines from `input` until a line parses as a `SalesRow`.
///
/// Invalid lines are reported and the prompt repeats. The accepted line is echoed back. The only
/// errors returned are I/O failures and `input` ending before a valid line arrives.
pub fn read_sales<R, W>(input: &mut R, output: &mut W) -> Result<SalesRow>
where
    R: BufRead + ?Sized,
    W: Write + ?Sized,
{
    loop {
        writeln!(output, "Please enter sales data from the last market.")?;
        writeln!(
            output,
            "Data should be {ROW_WIDTH} numbers, separated by commas."
        )?;
        writeln!(output, "Example: 10,20,30,40,50,60\n")?;
        write!(output, "Enter your data here: ")?;
        output.flush()?;

        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .context("Unable to read sales data")?;
        if read == 0 {
            bail!("Input ended before valid sales data was entered, nothing was written");
        }
        let raw = line.trim_end_matches(['\r', '\n']);
        writeln!(output)?;

        match parse(raw) {
            Ok(sales) => {
                debug!("Accepted sales data {sales}");
                writeln!(output, "Data provided: {raw}")?;
                writeln!(output, "Data is valid!")?;
                return Ok(sales);
            }
            Err(e) => {
                warn!("Rejected sales data '{raw}': {e}");
                writeln!(output, "Invalid data: {e}, please try again.\n")?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_six_values() {
        let sales = parse("10,20,30,40,50,60").unwrap();
        assert_eq!(sales, SalesRow::new([10, 20, 30, 40, 50, 60]));
    }

    #[test]
    fn test_parse_ignores_whitespace() {
        let sales = parse(" 1, 2 ,3,4 ,5,  6 ").unwrap();
        assert_eq!(sales, SalesRow::new([1, 2, 3, 4, 5, 6]));
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(
            parse("10,20,30"),
            Err(PipelineError::Count {
                expected: 6,
                found: 3
            })
        );
        assert_eq!(
            parse("1,2,3,4,5,6,7"),
            Err(PipelineError::Count {
                expected: 6,
                found: 7
            })
        );
    }

    #[test]
    fn test_parse_format_wins_over_count() {
        assert_eq!(
            parse("10,abc"),
            Err(PipelineError::Format {
                token: "abc".to_string()
            })
        );
        // Partial numbers are not accepted
        assert!(matches!(
            parse("10,20,30,40,50,6o"),
            Err(PipelineError::Format { .. })
        ));
        assert!(matches!(
            parse("1.5,2,3,4,5,6"),
            Err(PipelineError::Format { .. })
        ));
    }

    #[test]
    fn test_parse_empty_string() {
        assert_eq!(
            parse(""),
            Err(PipelineError::Format {
                token: String::new()
            })
        );
        assert!(matches!(
            parse("1,2,,4,5,6"),
            Err(PipelineError::Format { .. })
        ));
    }

    #[test]
    fn test_parse_negative() {
        assert_eq!(
            parse("10,20,-3,40,50,60"),
            Err(PipelineError::Range { value: -3 })
        );
        assert!(parse("0,0,0,0,0,0").is_ok());
    }

    #[test]
    fn test_read_sales_first_try() {
        let mut input = Cursor::new("10,20,30,40,50,60\n");
        let mut output = Vec::new();
        let sales = read_sales(&mut input, &mut output).unwrap();
        assert_eq!(sales, SalesRow::new([10, 20, 30, 40, 50, 60]));

        let shown = String::from_utf8(output).unwrap();
        assert_eq!(shown.matches("Enter your data here:").count(), 1);
        assert!(shown.contains("Data provided: 10,20,30,40,50,60"));
        assert!(shown.contains("Data is valid!"));
    }

    #[test]
    fn test_read_sales_retries_until_valid() {
        let mut input = Cursor::new("10,20,30\nten,20,30,40,50,60\n1,2,3,4,5,-6\r\n1,2,3,4,5,6\n");
        let mut output = Vec::new();
        let sales = read_sales(&mut input, &mut output).unwrap();
        assert_eq!(sales, SalesRow::new([1, 2, 3, 4, 5, 6]));

        let shown = String::from_utf8(output).unwrap();
        assert_eq!(shown.matches("Enter your data here:").count(), 4);
        assert!(shown.contains("Invalid data: exactly 6 values required, you provided 3"));
        assert!(shown.contains("Invalid data: 'ten' is not a whole number"));
        assert!(shown.contains("Invalid data: -6 is negative"));
    }

    #[test]
    fn test_read_sales_input_ends() {
        let mut input = Cursor::new("1,2\n");
        let mut output = Vec::new();
        let e = read_sales(&mut input, &mut output).unwrap_err();
        assert!(e.to_string().contains("Input ended"));
    }
}
