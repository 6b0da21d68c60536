mod capture;
mod cli;
mod commands;
mod errors;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::Context;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let refreshing = matches!(cli.command, Commands::Refresh);

    let result = match Context::new(cli.data_dir) {
        Ok(ctx) => commands::execute(cli.command, &ctx).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        let message = match e.downcast_ref::<nc_auth::NcAuthError>() {
            Some(auth_err) if refreshing => errors::format_refresh_help(auth_err),
            Some(auth_err) => errors::format_error_help(auth_err),
            None => format!("{e:#}"),
        };
        eprintln!("Error: {message}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}
