//! `agentsync list`: value-streams named in the manifest.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use agentsync_sync::{list_streams, StreamListing};

use super::{load_config, SourceArgs};

/// Arguments for `agentsync list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Tabled)]
struct StreamRow {
    #[tabled(rename = "Value-stream")]
    stream: String,
    #[tabled(rename = "Applicable agents")]
    applicable: usize,
}

impl ListArgs {
    pub fn run(self) -> Result<()> {
        let config = load_config()?;
        let materializer = self.source.materializer(&config);
        let listing = list_streams(
            materializer.as_ref(),
            &self.source.manifest(&config),
            self.source.no_cleanup,
        )
        .context("failed to list value-streams")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&listing).context("failed to serialize listing")?
            );
            return Ok(());
        }

        print_table(&listing);
        Ok(())
    }
}

fn print_table(listing: &StreamListing) {
    println!(
        "Manifest {} | published {} | {} entries",
        listing.manifest.version, listing.manifest.published_at, listing.manifest.entry_count
    );
    if let Some(dir) = &listing.kept_source {
        println!("Source kept at {}", dir.display());
    }

    if listing.streams.is_empty() {
        println!("{}", "No value-streams named in the manifest.".yellow());
        return;
    }

    let rows: Vec<StreamRow> = listing
        .streams
        .iter()
        .map(|s| StreamRow {
            stream: s.stream.to_string(),
            applicable: s.applicable,
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
