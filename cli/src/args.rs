//! Command line arguments.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueHint};
use seed_loader::{DEFAULT_MAX_BATCH_SIZE, management_api_url};

#[derive(Debug, Parser)]
#[command(name = "seed-loader", version)]
#[command(about = "Split a SQL seed script and upload it in size-bounded batches")]
pub struct Cli {
    /// SQL script to load.
    #[arg(
        long,
        short = 'f',
        env = "SEED_FILE",
        default_value = "supabase/seed.sql",
        global = true,
        value_hint = ValueHint::FilePath
    )]
    pub file: PathBuf,

    /// Maximum size of one batch, in bytes. A single larger statement is
    /// still sent, alone.
    #[arg(long, env = "SEED_MAX_BATCH_SIZE", default_value_t = DEFAULT_MAX_BATCH_SIZE, global = true)]
    pub max_batch_size: usize,

    /// Log at debug level when RUST_LOG is not set.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Split and batch the script locally without sending anything.
    Plan(PlanArgs),
    /// Run the cleanup statements, then upload every batch in order.
    Apply(ApplyArgs),
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Print the first line of every statement.
    #[arg(long)]
    pub statements: bool,
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Full URL of the query endpoint. Takes precedence over --project-ref.
    #[arg(long, env = "SEED_QUERY_ENDPOINT", value_hint = ValueHint::Url)]
    pub endpoint: Option<String>,

    /// Supabase project reference, used to build the management API URL.
    #[arg(long, env = "SUPABASE_PROJECT_REF")]
    pub project_ref: Option<String>,

    /// Bearer token for the query endpoint.
    #[arg(long, env = "SUPABASE_ACCESS_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Per-request timeout, in seconds.
    #[arg(long, env = "SEED_TIMEOUT_SECS", default_value_t = 120)]
    pub timeout_secs: u64,

    /// Statement to run before seeding; repeatable, run in the given order.
    #[arg(long = "cleanup", value_name = "SQL")]
    pub cleanup: Vec<String>,

    /// File of statements to run before seeding, after any --cleanup.
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub cleanup_file: Option<PathBuf>,
}

impl ApplyArgs {
    /// The query endpoint URL, if one was configured.
    pub fn endpoint_url(&self) -> Option<String> {
        self.endpoint
            .clone()
            .or_else(|| self.project_ref.as_deref().map(management_api_url))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
