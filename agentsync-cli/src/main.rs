//! agentsync: fetch published agent artifacts into a workspace.
//!
//! # Usage
//!
//! ```text
//! agentsync fetch <value-stream> [--workspace <dir>] [--dry-run] [--no-audit]
//! agentsync list [--json]
//! agentsync diff <value-stream> [--workspace <dir>]
//!
//! source options (all commands):
//!   --repo <url> [--branch <b>] [--timeout <secs>] | --source-dir <dir>
//!   --manifest <name> --no-cleanup
//! ```

mod commands;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use commands::{diff::DiffArgs, fetch::FetchArgs, list::ListArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "agentsync",
    version,
    about = "Fetch manifest-declared agent artifacts for a value-stream",
    long_about = None,
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` wins when set.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy every artifact that applies to a value-stream into the workspace.
    Fetch(FetchArgs),

    /// List the value-streams named in the manifest.
    List(ListArgs),

    /// Show unified diffs of what fetch would change.
    Diff(DiffArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Fetch(args) => args.run(),
        Commands::List(args) => args.run(),
        Commands::Diff(args) => args.run(),
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
