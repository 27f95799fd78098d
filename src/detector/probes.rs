//! Built-in probes for the tools the shell cares about.

use crate::models::{PathCommands, ToolProbe};

pub fn builtin_probes() -> Vec<ToolProbe> {
    vec![
        ToolProbe::simple("claude", "Claude Code"),
        ToolProbe::simple("codex", "Codex CLI"),
        ToolProbe::simple("gemini", "Gemini CLI"),
        ToolProbe::simple("opencode", "OpenCode"),
        ToolProbe::simple("git", "Git").with_version_pattern(r"git version (\d+\.\d+\.\d+)"),
        ToolProbe::simple("node", "Node.js").with_version_pattern(r"v?(\d+\.\d+\.\d+)"),
        ToolProbe::simple("npm", "npm"),
        python_probe(),
    ]
}

/// `python3` first, then `python`; some Windows installs only ship the latter.
fn python_probe() -> ToolProbe {
    ToolProbe {
        id: "python".to_string(),
        name: "Python".to_string(),
        version_commands: vec!["python3 --version".to_string(), "python --version".to_string()],
        path_commands: PathCommands {
            windows: vec!["where python".to_string(), "where python3".to_string()],
            posix: vec!["command -v python3".to_string(), "command -v python".to_string()],
        },
        version_pattern: r"Python (\d+\.\d+\.\d+)".to_string(),
    }
}
