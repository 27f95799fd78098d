//! Runs shell commands for a project in whatever environment it lives in.

pub mod local;
pub mod not_found;
mod remote;

pub use local::ShellLocator;
pub use not_found::ShellFamily;
pub use remote::RemoteLink;

use crate::config::Config;
use crate::environment;
use crate::error::ExecError;
use crate::models::ExecutionContext;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Captured output of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` for remote runs and for normalized "not found" results.
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn stdout(text: &str) -> Self {
        Self {
            stdout: text.to_string(),
            ..Self::default()
        }
    }

    /// Both streams are blank.
    pub fn is_empty(&self) -> bool {
        self.stdout.trim().is_empty() && self.stderr.trim().is_empty()
    }

    /// stdout if it has content, otherwise stderr. Some tools print their
    /// version on stderr.
    pub fn text(&self) -> &str {
        if self.stdout.trim().is_empty() {
            &self.stderr
        } else {
            &self.stdout
        }
    }
}

/// Execution seam shared by the detector and the watcher.
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    /// Execution context for a project, recomputed on every call.
    fn context(&self, path: &str, project_id: Option<&str>) -> ExecutionContext;

    /// Run in an already classified context.
    async fn run_in(
        &self,
        context: ExecutionContext,
        command: &str,
        path: &str,
        project_id: Option<&str>,
    ) -> Result<CommandOutput, ExecError>;

    async fn run(
        &self,
        command: &str,
        path: &str,
        project_id: Option<&str>,
    ) -> Result<CommandOutput, ExecError> {
        let context = self.context(path, project_id);
        self.run_in(context, command, path, project_id).await
    }
}

/// The real [`CommandRunner`]: local shells, `wsl.exe`, or the remote link.
pub struct Dispatcher {
    remote: Option<Arc<dyn RemoteLink>>,
    timeout: Duration,
    login_shell: bool,
    shells: ShellLocator,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            remote: None,
            timeout: DEFAULT_TIMEOUT,
            login_shell: false,
            shells: ShellLocator::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new()
            .with_timeout(config.command_timeout())
            .with_login_shell(config.login_shell())
    }

    pub fn with_remote(mut self, remote: Arc<dyn RemoteLink>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_login_shell(mut self, login_shell: bool) -> Self {
        self.login_shell = login_shell;
        self
    }

    pub fn with_shell_locator(mut self, shells: ShellLocator) -> Self {
        self.shells = shells;
        self
    }

    async fn run_remote(
        &self,
        command: &str,
        path: &str,
        project_id: Option<&str>,
    ) -> Result<CommandOutput, ExecError> {
        let unavailable = || ExecError::RemoteUnavailable {
            project: project_id.unwrap_or(path).to_string(),
        };

        let (Some(link), Some(id)) = (self.remote.as_ref(), project_id) else {
            return Err(unavailable());
        };

        if !link.is_healthy(id).await {
            return Err(unavailable());
        }

        let stdout = match tokio::time::timeout(self.timeout, link.exec(id, command)).await {
            Ok(Ok(stdout)) => stdout,
            Ok(Err(e)) => return Err(ExecError::Remote(e.to_string())),
            Err(_) => {
                return Err(ExecError::Timeout {
                    command: command.to_string(),
                    timeout: self.timeout,
                })
            }
        };

        // The channel merges stderr into stdout and reports no exit code.
        if not_found::is_remote_not_found(command, &stdout) {
            debug!(command, "remote command not found, treating as empty result");
            return Ok(CommandOutput::default());
        }
        Ok(CommandOutput::stdout(&stdout))
    }

    fn unix_login_shell(&self) -> Option<String> {
        if !self.login_shell {
            return None;
        }
        std::env::var("SHELL").ok().filter(|s| !s.trim().is_empty())
    }
}

#[async_trait::async_trait]
impl CommandRunner for Dispatcher {
    fn context(&self, path: &str, project_id: Option<&str>) -> ExecutionContext {
        environment::classify(path, project_id, self.remote.as_deref())
    }

    async fn run_in(
        &self,
        context: ExecutionContext,
        command: &str,
        path: &str,
        project_id: Option<&str>,
    ) -> Result<CommandOutput, ExecError> {
        debug!(%context, command, path, "dispatching command");

        let invocation = match context {
            ExecutionContext::SshRemote => {
                return self.run_remote(command, path, project_id).await;
            }
            ExecutionContext::Wsl => local::wsl_invocation(command, path),
            ExecutionContext::LocalWindows => {
                local::windows_invocation(command, path, self.shells.posix_shell())
            }
            ExecutionContext::LocalUnix => {
                local::unix_invocation(command, path, self.unix_login_shell().as_deref())
            }
        };

        local::execute(&invocation, command, self.timeout).await
    }
}
