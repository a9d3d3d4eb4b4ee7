use crate::commands::Out;
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory, its subdirectories and:
/// - Creates an initial `config.json` file using `sheet_url` along with default settings
/// - Moves `secret_file` into its default location in the data dir.
///
/// # Arguments
/// - `sandwiches_home` - The directory that will be the root of data directory, e.g.
///   `$HOME/sandwiches`
/// - `secret_file` - The downloaded OAuth 2.0 client credentials JSON needed to start the Google
///   OAuth workflow.
/// - `sheet_url` - The URL of the Google Sheet holding the sales, surplus and stock worksheets.
///   e.g. https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX
pub async fn init(sandwiches_home: &Path, secret_file: &Path, sheet_url: &str) -> Result<Out<()>> {
    let config = Config::create(sandwiches_home, secret_file, sheet_url)
        .await
        .context("Unable to create the data directory and configs")?;
    Ok(format!(
        "Created {}, next run 'sandwiches auth' to connect to your Google Sheet",
        config.root().display()
    )
    .into())
}
