//! Test doubles shared by the unit tests.

use crate::dispatch::{CommandOutput, CommandRunner, RemoteLink};
use crate::error::ExecError;
use crate::models::ExecutionContext;
use crate::watcher::ChangeSink;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

/// In-memory remote link.
pub struct FakeRemote {
    projects: HashSet<String>,
    healthy: bool,
    fail_exec: bool,
    responses: HashMap<String, String>,
    commands: Mutex<Vec<String>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self {
            projects: HashSet::new(),
            healthy: true,
            fail_exec: false,
            responses: HashMap::new(),
            commands: Mutex::new(Vec::new()),
        }
    }

    pub fn with_project(mut self, id: &str) -> Self {
        self.projects.insert(id.to_string());
        self
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    pub fn failing_exec(mut self) -> Self {
        self.fail_exec = true;
        self
    }

    pub fn respond(mut self, command: &str, output: &str) -> Self {
        self.responses
            .insert(command.to_string(), output.to_string());
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RemoteLink for FakeRemote {
    fn is_remote(&self, project_id: &str) -> bool {
        self.projects.contains(project_id)
    }

    async fn is_healthy(&self, project_id: &str) -> bool {
        self.healthy && self.projects.contains(project_id)
    }

    async fn exec(&self, _project_id: &str, command: &str) -> anyhow::Result<String> {
        self.commands.lock().unwrap().push(command.to_string());
        if self.fail_exec {
            anyhow::bail!("channel closed");
        }
        Ok(self.responses.get(command).cloned().unwrap_or_default())
    }
}

#[derive(Clone)]
enum Reply {
    Output(CommandOutput),
    Timeout,
}

/// Runner with canned replies per command string. Unknown commands behave
/// like a missing program: an empty output.
pub struct ScriptedRunner {
    context: Mutex<ExecutionContext>,
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
    delay: Duration,
}

impl ScriptedRunner {
    pub fn new(context: ExecutionContext) -> Self {
        Self {
            context: Mutex::new(context),
            replies: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    pub fn stdout(self, command: &str, text: &str) -> Self {
        self.set_stdout(command, text);
        self
    }

    pub fn stderr(self, command: &str, text: &str) -> Self {
        self.replies.lock().unwrap().insert(
            command.to_string(),
            Reply::Output(CommandOutput {
                stdout: String::new(),
                stderr: text.to_string(),
                exit_code: Some(1),
            }),
        );
        self
    }

    pub fn timeout(self, command: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(command.to_string(), Reply::Timeout);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Simulate a topology change, e.g. a remote link coming up.
    pub fn set_context(&self, context: ExecutionContext) {
        *self.context.lock().unwrap() = context;
    }

    /// Change a reply while the runner is in use.
    pub fn set_stdout(&self, command: &str, text: &str) {
        self.replies.lock().unwrap().insert(
            command.to_string(),
            Reply::Output(CommandOutput {
                stdout: text.to_string(),
                stderr: String::new(),
                exit_code: Some(0),
            }),
        );
    }

    pub fn call_count(&self, command: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == command)
            .count()
    }
}

#[async_trait::async_trait]
impl CommandRunner for ScriptedRunner {
    fn context(&self, _path: &str, _project_id: Option<&str>) -> ExecutionContext {
        *self.context.lock().unwrap()
    }

    async fn run_in(
        &self,
        _context: ExecutionContext,
        command: &str,
        _path: &str,
        _project_id: Option<&str>,
    ) -> Result<CommandOutput, ExecError> {
        self.calls.lock().unwrap().push(command.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let reply = self.replies.lock().unwrap().get(command).cloned();
        match reply {
            Some(Reply::Output(output)) => Ok(output),
            Some(Reply::Timeout) => Err(ExecError::Timeout {
                command: command.to_string(),
                timeout: Duration::from_secs(10),
            }),
            None => Ok(CommandOutput::default()),
        }
    }
}

/// Records every notified project path.
#[derive(Default)]
pub struct CollectSink {
    paths: Mutex<Vec<String>>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

impl ChangeSink for CollectSink {
    fn notify(&self, project_path: &str) {
        self.paths.lock().unwrap().push(project_path.to_string());
    }
}
