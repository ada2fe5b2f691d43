//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "revfs", about = "Resolve review URIs to pinned file content")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a review URI and print the content to stdout.
    Cat(CatArgs),
    /// Build the review URI for a file pinned to a commit.
    Uri(UriArgs),
}

#[derive(Args, Debug)]
pub struct CatArgs {
    /// The review URI to resolve, as printed by `revfs uri`. May be
    /// omitted when --path, --commit and --root are given instead.
    pub uri: Option<String>,

    /// Path of the file, absolute or relative to the checkout root.
    /// Requires --commit and --root.
    #[arg(long, value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Commit the content is pinned to.
    #[arg(long)]
    pub commit: Option<String>,

    /// Root of the checkout that owns the file.
    #[arg(long, value_name = "PATH")]
    pub root: Option<PathBuf>,

    /// Review authority to place in the identifier built from components.
    #[arg(long, default_value = "local")]
    pub authority: String,

    /// Checkout root to consider. Repeatable; defaults to the rootPath
    /// carried in the identifier's query.
    #[arg(long = "repo", value_name = "PATH")]
    pub repos: Vec<PathBuf>,

    /// File whose contents serve as the fallback tier when a repository
    /// has nothing for the identifier.
    #[arg(long, value_name = "PATH")]
    pub fallback_file: Option<PathBuf>,

    /// Ceiling in milliseconds for the repository discovery wait.
    /// Overrides `repo_wait_ms` from the config file.
    #[arg(long, value_name = "MS")]
    pub wait_ms: Option<u64>,
}

#[derive(Args, Debug)]
pub struct UriArgs {
    /// Path of the file, absolute or relative to the checkout root.
    pub path: PathBuf,

    /// Commit the content is pinned to.
    #[arg(long)]
    pub commit: String,

    /// Root of the checkout that owns the file.
    #[arg(long, value_name = "PATH")]
    pub root: PathBuf,

    /// Review authority to place in the identifier.
    #[arg(long, default_value = "local")]
    pub authority: String,
}

/// Parses command-line arguments into the `Cli` structure.
pub fn parse_args() -> Cli {
    Cli::parse()
}
