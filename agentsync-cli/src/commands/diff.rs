//! `agentsync diff <value-stream>`: show unified diffs for what fetch would change.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use agentsync_sync::plan_diff;

use super::{
    fetch::{print_missing, print_selection},
    fetch_request, load_config, SourceArgs,
};

/// Arguments for `agentsync diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Value-stream to diff for.
    pub value_stream: String,

    /// Workspace root to compare against (default: current directory).
    #[arg(long, short = 'w', value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    #[command(flatten)]
    pub source: SourceArgs,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let config = load_config()?;
        let request = fetch_request(&self.value_stream, self.workspace, &self.source, &config)?;
        let materializer = self.source.materializer(&config);

        let report = plan_diff(materializer.as_ref(), &request)
            .with_context(|| format!("diff failed for value-stream '{}'", request.stream))?;

        print_selection(&report.selection, report.stream.as_str());
        print_missing(&report.selection.missing);

        if report.diffs.is_empty() {
            println!("No differences for '{}'.", report.stream);
            return Ok(());
        }

        for diff in report.diffs {
            print!("{}", diff.unified_diff);
            if !diff.unified_diff.ends_with('\n') {
                println!();
            }
        }

        Ok(())
    }
}
