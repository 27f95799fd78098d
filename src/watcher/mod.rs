//! Per-project git change watcher.
//!
//! Local projects use native file notification on `.git`, WSL projects are
//! polled through the dispatcher, remote projects are not watched.

pub mod native;
mod poll;
pub mod signals;

pub use signals::{RepoSignals, SignalSource};

use crate::config::Config;
use crate::dispatch::CommandRunner;
use crate::models::ExecutionContext;
use notify::RecommendedWatcher;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Receives "project changed" notifications.
pub trait ChangeSink: Send + Sync {
    fn notify(&self, project_path: &str);
}

/// Forwards changed project paths into a tokio channel.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ChangeSink for ChannelSink {
    fn notify(&self, project_path: &str) {
        // Receiver gone means nobody is listening anymore.
        let _ = self.tx.send(project_path.to_string());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchMode {
    Native,
    Polling,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchOutcome {
    pub success: bool,
    pub mode: Option<WatchMode>,
    pub message: Option<String>,
}

impl WatchOutcome {
    fn started(mode: WatchMode) -> Self {
        Self {
            success: true,
            mode: Some(mode),
            message: None,
        }
    }

    pub fn unsupported(context: ExecutionContext) -> Self {
        Self {
            success: false,
            mode: None,
            message: Some(format!(
                "file watching is not supported for {context} projects"
            )),
        }
    }
}

/// A running watch. Dropping it stops the task and releases the OS watcher.
struct WatchHandle {
    mode: WatchMode,
    task: JoinHandle<()>,
    _native: Option<RecommendedWatcher>,
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct ProjectWatcher {
    runner: Arc<dyn CommandRunner>,
    sink: Arc<dyn ChangeSink>,
    poll_interval: Duration,
    debounce: Duration,
    states: Mutex<HashMap<String, WatchHandle>>,
}

impl ProjectWatcher {
    pub fn new(runner: Arc<dyn CommandRunner>, sink: Arc<dyn ChangeSink>) -> Self {
        Self {
            runner,
            sink,
            poll_interval: DEFAULT_POLL_INTERVAL,
            debounce: DEFAULT_DEBOUNCE,
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(
        runner: Arc<dyn CommandRunner>,
        sink: Arc<dyn ChangeSink>,
        config: &Config,
    ) -> Self {
        Self::new(runner, sink)
            .with_poll_interval(config.poll_interval())
            .with_debounce(config.debounce())
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    fn states(&self) -> MutexGuard<'_, HashMap<String, WatchHandle>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start watching a project. Watching an already watched path reports
    /// the running mode and starts nothing new.
    pub async fn watch(&self, path: &str, project_id: Option<&str>) -> WatchOutcome {
        let existing = self.states().get(path).map(|h| h.mode);
        if let Some(mode) = existing {
            return WatchOutcome::started(mode);
        }

        let context = self.runner.context(path, project_id);
        let (handle, message) = match context {
            ExecutionContext::SshRemote => {
                debug!(path, "not watching remote project");
                return WatchOutcome::unsupported(context);
            }
            ExecutionContext::Wsl => {
                let source = SignalSource::Runner {
                    runner: Arc::clone(&self.runner),
                    context,
                    path: path.to_string(),
                    project_id: project_id.map(str::to_string),
                };
                (self.start_polling(source, path).await, None)
            }
            ExecutionContext::LocalWindows | ExecutionContext::LocalUnix => {
                self.start_local(path)
            }
        };

        let mode = handle.mode;
        debug!(path, %context, ?mode, "watch started");
        // A concurrent watch for the same path may have won; keep the first.
        self.states().entry(path.to_string()).or_insert(handle);

        WatchOutcome {
            message,
            ..WatchOutcome::started(mode)
        }
    }

    fn start_local(&self, path: &str) -> (WatchHandle, Option<String>) {
        let project = Path::new(path);
        let baseline = RepoSignals::read_local(project);
        match native::start(
            project,
            path.to_string(),
            baseline.clone(),
            self.debounce,
            Arc::clone(&self.sink),
        ) {
            Ok((watcher, task)) => (
                WatchHandle {
                    mode: WatchMode::Native,
                    task,
                    _native: Some(watcher),
                },
                None,
            ),
            Err(e) => {
                warn!(path, error = %e, "native watch failed, falling back to polling");
                let source = SignalSource::Local(project.to_path_buf());
                let handle = self.spawn_poller(source, path, Some(baseline));
                (
                    handle,
                    Some(format!("native watch unavailable ({e}), polling instead")),
                )
            }
        }
    }

    async fn start_polling(&self, source: SignalSource, path: &str) -> WatchHandle {
        let baseline = source.read().await;
        self.spawn_poller(source, path, baseline)
    }

    fn spawn_poller(
        &self,
        source: SignalSource,
        path: &str,
        baseline: Option<RepoSignals>,
    ) -> WatchHandle {
        let task = poll::spawn(
            source,
            path.to_string(),
            baseline,
            self.poll_interval,
            Arc::clone(&self.sink),
        );
        WatchHandle {
            mode: WatchMode::Polling,
            task,
            _native: None,
        }
    }

    /// Stop watching a project. Unknown paths are ignored.
    pub fn unwatch(&self, path: &str) {
        if self.states().remove(path).is_some() {
            debug!(path, "watch stopped");
        }
    }

    pub fn shutdown(&self) {
        let handles: Vec<WatchHandle> = self.states().drain().map(|(_, h)| h).collect();
        debug!(count = handles.len(), "stopping all watches");
        drop(handles);
    }

    pub fn is_watching(&self, path: &str) -> bool {
        self.states().contains_key(path)
    }

    pub fn watched_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.states().keys().cloned().collect();
        paths.sort();
        paths
    }
}
