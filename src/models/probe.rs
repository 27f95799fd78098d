use serde::{Deserialize, Serialize};

/// Path discovery commands, one list per shell family.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathCommands {
    #[serde(default)]
    pub windows: Vec<String>,
    #[serde(default)]
    pub posix: Vec<String>,
}

/// Declarative description of how to find one developer tool.
///
/// Probes can also be declared in the config file:
///
/// ```toml
/// [[probes]]
/// id = "deno"
/// name = "Deno"
/// version_commands = ["deno --version"]
/// version_pattern = 'deno (\d+\.\d+\.\d+)'
///
/// [probes.path_commands]
/// windows = ["where deno"]
/// posix = ["command -v deno"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolProbe {
    pub id: String,
    pub name: String,
    pub version_commands: Vec<String>,
    #[serde(default)]
    pub path_commands: PathCommands,
    /// Regex applied to version output. Capture group 1 wins when present.
    #[serde(default = "default_version_pattern")]
    pub version_pattern: String,
}

pub(crate) fn default_version_pattern() -> String {
    r"(\d+\.\d+\.\d+)".to_string()
}

impl ToolProbe {
    /// Probe for a binary that answers `--version` and is found with `where` / `command -v`.
    pub fn simple(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            version_commands: vec![format!("{} --version", id)],
            path_commands: PathCommands {
                windows: vec![format!("where {}", id)],
                posix: vec![format!("command -v {}", id), format!("which {}", id)],
            },
            version_pattern: default_version_pattern(),
        }
    }

    pub fn with_version_commands(mut self, commands: &[&str]) -> Self {
        self.version_commands = commands.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_version_pattern(mut self, pattern: &str) -> Self {
        self.version_pattern = pattern.to_string();
        self
    }

    /// Path commands for the given lookup style.
    pub fn path_commands_for(&self, windows_lookup: bool) -> &[String] {
        if windows_lookup {
            &self.path_commands.windows
        } else {
            &self.path_commands.posix
        }
    }
}
