use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a command for a given project runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionContext {
    LocalWindows,
    LocalUnix,
    /// Linux subsystem reached from a Windows host
    Wsl,
    /// Remote host behind a persistent multiplexed connection
    SshRemote,
}

impl ExecutionContext {
    pub const ALL: [ExecutionContext; 4] = [
        ExecutionContext::LocalWindows,
        ExecutionContext::LocalUnix,
        ExecutionContext::Wsl,
        ExecutionContext::SshRemote,
    ];

    /// Stable label used in cache keys and on the wire.
    pub fn label(&self) -> &'static str {
        match self {
            ExecutionContext::LocalWindows => "local-windows",
            ExecutionContext::LocalUnix => "local-unix",
            ExecutionContext::Wsl => "wsl",
            ExecutionContext::SshRemote => "ssh-remote",
        }
    }

    /// Context of the machine this process runs on.
    pub fn host() -> Self {
        if cfg!(windows) {
            ExecutionContext::LocalWindows
        } else {
            ExecutionContext::LocalUnix
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ExecutionContext::LocalWindows | ExecutionContext::LocalUnix
        )
    }

    /// Whether tool lookups should use `where`-style commands instead of POSIX ones.
    pub fn uses_windows_lookup(&self) -> bool {
        matches!(self, ExecutionContext::LocalWindows)
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ExecutionContext {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local-windows" => Ok(ExecutionContext::LocalWindows),
            "local-unix" => Ok(ExecutionContext::LocalUnix),
            "wsl" => Ok(ExecutionContext::Wsl),
            "ssh-remote" => Ok(ExecutionContext::SshRemote),
            other => anyhow::bail!("unknown execution context: {}", other),
        }
    }
}
