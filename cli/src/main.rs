//! `seed-loader`: split a SQL seed script and upload it in batches.
//!
//! Settings come from flags, then environment variables, then a `.env` file
//! in the working directory. `plan` works offline; `apply` needs an endpoint
//! (`--endpoint` or `--project-ref`) and an access token.

mod args;
mod commands;
mod logging;

use std::process::ExitCode;

use clap::Parser;

use crate::args::{Cli, Command};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    let result = match &cli.command {
        Command::Plan(args) => commands::plan(&cli, args),
        Command::Apply(args) => commands::apply(&cli, args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
