//! The bits of git state a watcher compares between checks.

use crate::dispatch::CommandRunner;
use crate::models::ExecutionContext;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tracing::warn;

/// Prints HEAD contents, then index and reflog mtimes, one per line.
pub const SIGNALS_COMMAND: &str = r#"printf '%s\n' "$(cat .git/HEAD 2>/dev/null)" "$(stat -c %Y .git/index 2>/dev/null)" "$(stat -c %Y .git/logs/HEAD 2>/dev/null)""#;

/// Snapshot of HEAD and the modification stamps of the index and HEAD reflog.
///
/// Stamps are opaque: only compare snapshots read from the same source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoSignals {
    pub head: Option<String>,
    pub index_mtime: Option<u128>,
    pub reflog_mtime: Option<u128>,
}

impl RepoSignals {
    /// Read directly from the filesystem.
    pub fn read_local(project: &Path) -> Self {
        let git_dir = project.join(".git");
        Self {
            head: fs::read_to_string(git_dir.join("HEAD"))
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            index_mtime: mtime_nanos(&git_dir.join("index")),
            reflog_mtime: mtime_nanos(&git_dir.join("logs").join("HEAD")),
        }
    }

    /// Parse the output of [`SIGNALS_COMMAND`].
    pub fn parse(output: &str) -> Self {
        let mut lines = output.lines().map(str::trim);
        let head = lines.next().filter(|s| !s.is_empty()).map(str::to_string);
        let index_mtime = lines.next().and_then(|s| s.parse().ok());
        let reflog_mtime = lines.next().and_then(|s| s.parse().ok());
        Self {
            head,
            index_mtime,
            reflog_mtime,
        }
    }
}

fn mtime_nanos(path: &Path) -> Option<u128> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    Some(modified.duration_since(UNIX_EPOCH).ok()?.as_nanos())
}

/// Where a watcher reads signals from.
#[derive(Clone)]
pub enum SignalSource {
    Local(PathBuf),
    Runner {
        runner: Arc<dyn CommandRunner>,
        context: ExecutionContext,
        path: String,
        project_id: Option<String>,
    },
}

impl SignalSource {
    /// `None` when the read itself failed; the caller keeps its last snapshot.
    pub async fn read(&self) -> Option<RepoSignals> {
        match self {
            SignalSource::Local(project) => Some(RepoSignals::read_local(project)),
            SignalSource::Runner {
                runner,
                context,
                path,
                project_id,
            } => {
                match runner
                    .run_in(*context, SIGNALS_COMMAND, path, project_id.as_deref())
                    .await
                {
                    Ok(output) => Some(RepoSignals::parse(&output.stdout)),
                    Err(e) => {
                        warn!(path = %path, error = %e, "failed to read git state");
                        None
                    }
                }
            }
        }
    }
}
