use std::path::PathBuf;

use blobkeep_sdk::AssetKind;
use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "blobkeep",
    about = "Local asset store with settings persistence",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the configured data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Store one or more files
    Add(AddArgs),
    /// List stored assets of a kind
    List(ListArgs),
    /// Print an asset as a data URI, or write its bytes to a file
    Show(ShowArgs),
    /// Delete assets by id
    Rm(RmArgs),
    /// Read, change, export or import settings
    Settings(SettingsArgs),
    /// Manage the current background
    Background(BackgroundArgs),
    /// Delete assets older than a number of days
    Sweep(SweepArgs),
    /// Show per-kind counts and sizes
    Stats,
    /// Clear settings references to deleted assets
    Prune,
    /// Rewrite the store log without dead records
    Compact,
    /// Delete everything, settings included
    Clear(ClearArgs),
}

#[derive(Args)]
pub struct AddArgs {
    pub kind: AssetKind,
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
    /// MIME type to declare instead of guessing from the extension
    #[arg(long)]
    pub mime: Option<String>,
}

#[derive(Args)]
pub struct ListArgs {
    pub kind: AssetKind,
}

#[derive(Args)]
pub struct ShowArgs {
    pub kind: AssetKind,
    pub id: String,
    /// Write the raw bytes here instead of printing a data URI
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct RmArgs {
    pub kind: AssetKind,
    #[arg(required = true)]
    pub ids: Vec<String>,
}

#[derive(Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub action: SettingsAction,
}

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print all settings, or one field
    Get { field: Option<String> },
    /// Change one field
    Set { field: String, value: String },
    /// Write settings as JSON to stdout or a file
    Export {
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Replace settings with a JSON file
    Import { file: PathBuf },
}

#[derive(Args)]
pub struct BackgroundArgs {
    #[command(subcommand)]
    pub action: BackgroundAction,
}

#[derive(Subcommand)]
pub enum BackgroundAction {
    /// Store an image and make it the current background
    Set {
        path: PathBuf,
        #[arg(long)]
        mime: Option<String>,
    },
}

#[derive(Args)]
pub struct SweepArgs {
    /// Maximum age in days; defaults to the configured retention
    #[arg(long)]
    pub days: Option<u64>,
}

#[derive(Args)]
pub struct ClearArgs {
    /// Confirm the irreversible wipe
    #[arg(long)]
    pub yes: bool,
}
