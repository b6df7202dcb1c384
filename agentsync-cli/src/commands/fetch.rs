//! `agentsync fetch <value-stream>`: copy applicable artifacts into a workspace.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use agentsync_core::SkipReason;
use agentsync_sync::{fetch, FetchReport, FileStatus, Selection};

use super::{fetch_request, load_config, SourceArgs};

/// Arguments for `agentsync fetch`.
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Value-stream to fetch for (case-insensitive).
    pub value_stream: String,

    /// Workspace root to write into (default: current directory).
    #[arg(long, short = 'w', value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Classify everything but write nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Do not write temp/fetch-audit.json.
    #[arg(long)]
    pub no_audit: bool,

    #[command(flatten)]
    pub source: SourceArgs,
}

impl FetchArgs {
    pub fn run(self) -> Result<()> {
        let config = load_config()?;
        let mut request = fetch_request(&self.value_stream, self.workspace, &self.source, &config)?;
        request.dry_run = self.dry_run;
        request.audit &= !self.no_audit;
        tracing::debug!(?request, "fetch request");

        let materializer = self.source.materializer(&config);
        println!(
            "Fetching agents for value-stream '{}' from {}",
            request.stream.as_str().bold(),
            materializer.describe()
        );

        let report = fetch(materializer.as_ref(), &request)
            .with_context(|| format!("fetch failed for value-stream '{}'", request.stream))?;

        print_selection(&report.selection, report.stream.as_str());
        print_actions(&report);
        print_missing(&report.selection.missing);
        print_summary(&report);

        let stats = &report.sync.stats;
        let succeeded = stats.new + stats.updated + stats.unchanged + stats.modules_replaced;
        if stats.error > 0 && succeeded == 0 {
            bail!("every copy failed ({} errors)", stats.error);
        }
        Ok(())
    }
}

pub(crate) fn print_selection(selection: &Selection, stream: &str) {
    println!(
        "Manifest {} (published {}, {} entries)",
        selection.meta.version, selection.meta.published_at, selection.meta.entry_count
    );
    for warning in &selection.manifest_warnings {
        println!("  {} {warning}", "[WARNING]".yellow());
    }
    if selection.unknown_stream {
        println!(
            "  {} value-stream '{stream}' is not named in the manifest; only universal entries apply",
            "[WARNING]".yellow()
        );
    }
    println!(
        "Applying {} entries: {}",
        selection.applied.len(),
        selection.applied.join(", ")
    );
    for skipped in &selection.skipped {
        let why = match skipped.reason {
            SkipReason::Deprecated => "deprecated",
            SkipReason::NotApplicable => "not for this value-stream",
        };
        println!("  {} {} ({why})", "[SKIP]".bright_black(), skipped.name);
    }
    if let Some(dir) = &selection.kept_source {
        println!("Source kept at {}", dir.display());
    }
}

fn print_actions(report: &FetchReport) {
    let layout = &report.layout;
    let prefix = if report.sync.dry_run { "[dry-run] " } else { "" };

    for module in &report.sync.modules {
        let name = module
            .source_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match &module.error {
            None => {
                if module.replaced_existing {
                    println!(
                        "{prefix}  {} {name}/ (removed existing)",
                        "[REPLACE  ]".cyan()
                    );
                }
                println!(
                    "{prefix}  {} {name}/ -> {} ({} files)",
                    "[MODULE   ]".cyan(),
                    layout.display_path(&module.destination).display(),
                    module.files
                );
                if module.missing_marker {
                    println!(
                        "{prefix}  {} runner module {name}/ has no __init__.py",
                        "[WARNING  ]".yellow()
                    );
                }
            }
            Some(err) => println!("{prefix}  {} module {name}: {err}", "[ERROR    ]".red()),
        }
    }

    for file in &report.sync.files {
        let name = file
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let label = format!("[{:<9}]", file.status.to_string().to_uppercase());
        let label = match file.status {
            FileStatus::New => label.green(),
            FileStatus::Updated => label.yellow(),
            FileStatus::Unchanged => label.bright_black(),
            FileStatus::Error => label.red(),
        };
        match &file.detail {
            Some(detail) => println!("{prefix}  {label} {name}: {detail}"),
            None => println!(
                "{prefix}  {label} {name} -> {}",
                layout.display_path(&file.destination).display()
            ),
        }
    }

    for path in &report.sync.unrouted {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        println!("{prefix}  {} unknown file type: {name}", "[SKIP     ]".bright_black());
    }
}

pub(crate) fn print_missing(missing: &[String]) {
    if missing.is_empty() {
        return;
    }
    println!("{} ({}):", "Missing declarations".yellow().bold(), missing.len());
    for m in missing {
        println!("  - {m}");
    }
}

fn print_summary(report: &FetchReport) {
    let s = &report.sync.stats;
    let heading = if report.sync.dry_run { "Dry run" } else { "Done" };
    println!(
        "{}: {} new, {} updated, {} unchanged, {} errors, {} modules replaced",
        heading.bold(),
        s.new.to_string().green(),
        s.updated.to_string().yellow(),
        s.unchanged,
        if s.error > 0 { s.error.to_string().red() } else { s.error.to_string().normal() },
        s.modules_replaced
    );
    if let Some(path) = &report.audit_path {
        println!("Audit trail: {}", report.layout.display_path(path).display());
    }
}
