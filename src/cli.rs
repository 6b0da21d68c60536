//! CLI argument definitions.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

/// Nixcraft Microsoft Authentication Helper
#[derive(Parser, Debug)]
#[command(name = "nixcraft-auth", version, about = "Nixcraft Microsoft Authentication Helper")]
pub struct Cli {
    /// Directory holding the token files
    #[arg(long, global = true, env = "NIXCRAFT_AUTH_DIR", value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Login with Microsoft account
    Login,
    /// Refresh authentication tokens
    Refresh,
    /// Show current authentication status
    Status,
    /// Remove saved authentication data
    Logout,
    /// Print the path to the access token file (for use in nixcraft config)
    TokenPath,
}
