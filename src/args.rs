//! These structs provide the CLI interface for the sandwiches CLI.

use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// sandwiches: records sandwich sales from each market in a Google Sheet and suggests how many of
/// each sandwich to make for the next one.
///
/// The sheet has three worksheets: sales, surplus and stock. Each submission of sales figures
/// appends a row to all three: the sales themselves, the surplus left over from what was made,
/// and a restock suggestion based on the average of the last five markets plus ten percent.
///
/// You will need to set up Google Sheets API OAuth credentials for this. Run `sandwiches init`
/// and then `sandwiches auth` once before submitting.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and initialize the configuration files.
    ///
    /// This is the first command to run. Decide where data should live and pass it as
    /// --sandwiches-home (default $HOME/sandwiches), get the URL of your Google Sheet, and download
    /// your OAuth client credentials from the Google Cloud Console.
    Init(InitArgs),
    /// Authenticate with Google Sheets via OAuth.
    Auth(AuthArgs),
    /// Submit the sales figures from the last market and get restock suggestions.
    Submit(SubmitArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where configuration and credentials are held. Defaults to ~/sandwiches
    #[arg(long, env = "SANDWICHES_HOME", default_value_t = default_sandwiches_home())]
    sandwiches_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, sandwiches_home: PathBuf) -> Self {
        Self {
            log_level,
            sandwiches_home: sandwiches_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn sandwiches_home(&self) -> &DisplayPath {
        &self.sandwiches_home
    }
}

/// (Not shown): Args for the `sandwiches init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The URL of your Google Sheet. It looks like this:
    /// https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX
    #[arg(long)]
    sheet_url: String,

    /// The path to your downloaded OAuth client credentials. This file will be moved to the
    /// secrets directory inside the data directory.
    #[arg(long)]
    client_secret: PathBuf,
}

impl InitArgs {
    pub fn new(sheet_url: impl Into<String>, client_secret: impl Into<PathBuf>) -> Self {
        Self {
            sheet_url: sheet_url.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn sheet_url(&self) -> &str {
        &self.sheet_url
    }

    pub fn client_secret(&self) -> &Path {
        &self.client_secret
    }
}

/// (Not shown): Args for the `sandwiches auth` command.
#[derive(Debug, Parser, Clone)]
pub struct AuthArgs {
    /// Verify and refresh authentication.
    #[arg(long)]
    verify: bool,
}

impl AuthArgs {
    pub fn new(verify: bool) -> Self {
        Self { verify }
    }

    pub fn verify(&self) -> bool {
        self.verify
    }
}

/// (Not shown): Args for the `sandwiches submit` command.
#[derive(Debug, Parser, Clone)]
pub struct SubmitArgs {
    /// Six comma-separated sales figures, e.g. 10,20,30,40,50,60. When omitted you are prompted
    /// for them.
    #[arg(long)]
    data: Option<String>,
}

impl SubmitArgs {
    pub fn new(data: Option<String>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }
}

fn default_sandwiches_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("sandwiches"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --sandwiches-home or SANDWICHES_HOME instead of relying on the \
                default home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("sandwiches")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}
