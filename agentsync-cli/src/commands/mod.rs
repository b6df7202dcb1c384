pub mod diff;
pub mod fetch;
pub mod list;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use agentsync_core::{config, Config, StreamName};
use agentsync_sync::{FetchRequest, GitMaterializer, LocalMaterializer, Materializer};

/// Where the artifacts come from. Flags override `~/.agentsync/config.yaml`.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Git URL of the source repository.
    #[arg(long, value_name = "URL")]
    pub repo: Option<String>,

    /// Branch or tag to clone.
    #[arg(long)]
    pub branch: Option<String>,

    /// Use an existing local checkout instead of cloning.
    #[arg(long, value_name = "DIR", conflicts_with_all = ["repo", "branch"])]
    pub source_dir: Option<PathBuf>,

    /// Manifest file name, relative to the source root.
    #[arg(long, value_name = "NAME")]
    pub manifest: Option<String>,

    /// Clone timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Keep the temporary clone for inspection.
    #[arg(long)]
    pub no_cleanup: bool,
}

impl SourceArgs {
    pub fn materializer(&self, config: &Config) -> Box<dyn Materializer> {
        match &self.source_dir {
            Some(dir) => Box::new(LocalMaterializer::new(dir)),
            None => Box::new(GitMaterializer::new(
                self.repo.clone().unwrap_or_else(|| config.source_repo.clone()),
                self.branch.clone().or_else(|| config.branch.clone()),
                Duration::from_secs(self.timeout.unwrap_or(config.clone_timeout_secs)),
            )),
        }
    }

    pub fn manifest(&self, config: &Config) -> String {
        self.manifest.clone().unwrap_or_else(|| config.manifest.clone())
    }
}

pub fn load_config() -> Result<Config> {
    config::load().context("failed to read ~/.agentsync/config.yaml")
}

/// Build a [`FetchRequest`] for `stream` against `workspace` (default: cwd).
/// Real run, audit as configured.
pub fn fetch_request(
    stream: &str,
    workspace: Option<PathBuf>,
    source: &SourceArgs,
    config: &Config,
) -> Result<FetchRequest> {
    let workspace = match workspace {
        Some(dir) => dir,
        None => std::env::current_dir().context("could not determine current directory")?,
    };
    Ok(FetchRequest {
        stream: StreamName::normalize(stream),
        workspace,
        manifest: source.manifest(config),
        layout: config.layout.clone(),
        dry_run: false,
        audit: config.audit,
        keep_source: source.no_cleanup,
    })
}
