//! Turning a source repository into a local directory.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::SyncError;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Produces a read-only snapshot of the source repository.
pub trait Materializer {
    /// Materialize the source, using `scratch` for any files it has to create.
    /// Returns the root of the snapshot.
    fn materialize(&self, scratch: &Path) -> Result<PathBuf, SyncError>;

    /// Human-readable origin, for status output.
    fn describe(&self) -> String;
}

// ---------------------------------------------------------------------------
// git
// ---------------------------------------------------------------------------

/// Shallow `git clone` bounded by a timeout.
#[derive(Debug, Clone)]
pub struct GitMaterializer {
    pub url: String,
    pub branch: Option<String>,
    pub timeout: Duration,
}

impl GitMaterializer {
    pub fn new(url: impl Into<String>, branch: Option<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            branch,
            timeout,
        }
    }

    fn command(&self, into: &Path) -> Command {
        let mut cmd = Command::new("git");
        cmd.args(["clone", "--depth", "1", "--quiet"]);
        if let Some(branch) = &self.branch {
            cmd.args(["--branch", branch]);
        }
        cmd.arg(&self.url)
            .arg(into)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd
    }
}

impl Materializer for GitMaterializer {
    fn materialize(&self, scratch: &Path) -> Result<PathBuf, SyncError> {
        let into = scratch.join("source");
        tracing::info!(url = %self.url, branch = ?self.branch, "cloning source repository");

        let mut child = self
            .command(&into)
            .spawn()
            .map_err(|e| SyncError::Materialize(format!("could not run git: {e}")))?;

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if started.elapsed() >= self.timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(SyncError::MaterializeTimeout {
                        secs: self.timeout.as_secs(),
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(SyncError::Materialize(format!("waiting for git: {e}"))),
            }
        };

        if !status.success() {
            let mut stderr = String::new();
            if let Some(mut pipe) = child.stderr.take() {
                let _ = pipe.read_to_string(&mut stderr);
            }
            return Err(SyncError::Materialize(format!(
                "git clone {} failed ({status}): {}",
                self.url,
                stderr.trim()
            )));
        }
        Ok(into)
    }

    fn describe(&self) -> String {
        match &self.branch {
            Some(b) => format!("{} ({b})", self.url),
            None => self.url.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// local
// ---------------------------------------------------------------------------

/// An existing directory used as-is.
#[derive(Debug, Clone)]
pub struct LocalMaterializer {
    pub root: PathBuf,
}

impl LocalMaterializer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Materializer for LocalMaterializer {
    fn materialize(&self, _scratch: &Path) -> Result<PathBuf, SyncError> {
        if !self.root.is_dir() {
            return Err(SyncError::Materialize(format!(
                "source directory {} does not exist",
                self.root.display()
            )));
        }
        Ok(self.root.clone())
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn local_requires_existing_directory() {
        let tmp = TempDir::new().unwrap();
        let ok = LocalMaterializer::new(tmp.path());
        assert_eq!(ok.materialize(tmp.path()).unwrap(), tmp.path());

        let missing = LocalMaterializer::new(tmp.path().join("nope"));
        assert!(matches!(
            missing.materialize(tmp.path()),
            Err(SyncError::Materialize(_))
        ));
    }

    #[test]
    fn git_command_is_shallow_and_branch_aware() {
        let git = GitMaterializer::new(
            "https://example.invalid/repo.git",
            Some("release".into()),
            Duration::from_secs(5),
        );
        let cmd = git.command(Path::new("/tmp/x/source"));
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec![
                "clone",
                "--depth",
                "1",
                "--quiet",
                "--branch",
                "release",
                "https://example.invalid/repo.git",
                "/tmp/x/source"
            ]
        );
        assert_eq!(git.describe(), "https://example.invalid/repo.git (release)");
    }
}
