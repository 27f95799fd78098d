//! OS file notification on a project's `.git` directory.

use super::signals::RepoSignals;
use super::ChangeSink;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tracing::debug;

/// Events for anything else under `.git` (object writes, `index.lock`, ...)
/// are ignored.
pub fn is_relevant_event_path(git_dir: &Path, event_path: &Path) -> bool {
    let Ok(relative) = event_path.strip_prefix(git_dir) else {
        return false;
    };
    relative == Path::new("HEAD")
        || relative == Path::new("index")
        || relative.starts_with("logs")
}

fn is_relevant(git_dirs: &[PathBuf], event: &Event) -> bool {
    event
        .paths
        .iter()
        .any(|p| git_dirs.iter().any(|dir| is_relevant_event_path(dir, p)))
}

/// Start watching `<project>/.git`. The returned watcher must be kept alive
/// for events to flow.
pub(super) fn start(
    project: &Path,
    project_path: String,
    baseline: RepoSignals,
    debounce: Duration,
    sink: Arc<dyn ChangeSink>,
) -> notify::Result<(RecommendedWatcher, JoinHandle<()>)> {
    let git_dir = project.join(".git");
    // Some backends report canonical paths (e.g. /private/var on macOS).
    let mut git_dirs = vec![git_dir.clone()];
    if let Ok(canonical) = std::fs::canonicalize(&git_dir) {
        if canonical != git_dir {
            git_dirs.push(canonical);
        }
    }

    let (tx, rx) = mpsc::unbounded_channel::<()>();
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                if is_relevant(&git_dirs, &event) {
                    let _ = tx.send(());
                }
            }
        },
        Config::default(),
    )?;
    watcher.watch(&git_dir, RecursiveMode::Recursive)?;

    let project = project.to_path_buf();
    let task = tokio::spawn(debounce_loop(
        rx,
        project,
        project_path,
        baseline,
        debounce,
        sink,
    ));
    Ok((watcher, task))
}

async fn debounce_loop(
    mut rx: mpsc::UnboundedReceiver<()>,
    project: PathBuf,
    project_path: String,
    mut last: RepoSignals,
    debounce: Duration,
    sink: Arc<dyn ChangeSink>,
) {
    while rx.recv().await.is_some() {
        // Wait for a quiet period.
        loop {
            match timeout(debounce, rx.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) => return,
                Err(_) => break,
            }
        }

        let current = RepoSignals::read_local(&project);
        if current != last {
            debug!(path = %project_path, "git state changed");
            sink.notify(&project_path);
            last = current;
        }
    }
}
