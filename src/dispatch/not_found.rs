//! "Command not found" recognition.
//!
//! Shells report a missing executable in their own words, so this is an
//! allow-list of substrings per shell family. It is a heuristic and needs
//! new entries whenever a shell changes its wording.

use super::CommandOutput;

/// Which shell produced an output, for picking the right phrasing list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellFamily {
    /// sh, bash, zsh, dash, Git Bash, the WSL side and remote shells
    Posix,
    /// cmd.exe, including PowerShell scripts it ends up launching
    Cmd,
}

const POSIX_PHRASES: &[&str] = &["command not found", ": not found", "which: no "];

const CMD_PHRASES: &[&str] = &[
    "is not recognized as an internal or external command",
    "could not find files for the given pattern",
    "the system cannot find the path specified",
    "is not recognized as the name of a cmdlet",
    "commandnotfoundexception",
];

/// Remote output longer than this is real output, not a shell complaint.
const REMOTE_MAX_LEN: usize = 256;

impl ShellFamily {
    fn phrases(&self) -> &'static [&'static str] {
        match self {
            ShellFamily::Posix => POSIX_PHRASES,
            ShellFamily::Cmd => CMD_PHRASES,
        }
    }

    /// Exit code the shell uses for an unknown command.
    fn not_found_exit_code(&self) -> i32 {
        match self {
            ShellFamily::Posix => 127,
            ShellFamily::Cmd => 9009,
        }
    }
}

/// Check free-form error text against the family's phrases (case-insensitive).
pub fn mentions_not_found(family: ShellFamily, text: &str) -> bool {
    let lower = text.to_lowercase();
    family.phrases().iter().any(|phrase| lower.contains(phrase))
}

/// Whether a finished local command failed only because its program does not exist.
///
/// Successful exits are never treated as "not found". Besides the family's
/// dedicated exit code, only stderr is inspected, and only when stdout is
/// blank: a command that printed something keeps its output.
pub fn is_command_not_found(family: ShellFamily, output: &CommandOutput) -> bool {
    match output.exit_code {
        Some(0) => false,
        Some(code) if code == family.not_found_exit_code() => true,
        _ => output.stdout.trim().is_empty() && mentions_not_found(family, &output.stderr),
    }
}

/// Whether merged remote output is just the shell saying `command`'s program
/// is missing. The remote channel has no exit code, so this only matches a
/// short complaint that names the program.
pub fn is_remote_not_found(command: &str, output: &str) -> bool {
    let text = output.trim().to_lowercase();
    if text.is_empty() || text.len() > REMOTE_MAX_LEN || text.lines().count() > 2 {
        return false;
    }

    let Some(program) = command.split_whitespace().next() else {
        return false;
    };
    let program = program.to_lowercase();

    if program == "which" {
        return text.starts_with("which: no ");
    }

    [
        format!("{program}: command not found"),
        format!("command not found: {program}"),
        format!("{program}: not found"),
    ]
    .iter()
    .any(|phrase| text.contains(phrase.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(stdout: &str, stderr: &str, code: i32) -> CommandOutput {
        CommandOutput {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit_code: Some(code),
        }
    }

    #[test]
    fn test_posix_phrasings() {
        assert!(is_command_not_found(
            ShellFamily::Posix,
            &failed("", "bash: x: command not found", 1)
        ));
        assert!(is_command_not_found(
            ShellFamily::Posix,
            &failed("", "sh: 1: x: not found", 2)
        ));
        assert!(is_command_not_found(
            ShellFamily::Posix,
            &failed("", "zsh: command not found: x", 1)
        ));
        assert!(is_command_not_found(
            ShellFamily::Posix,
            &failed("", "which: no x in (/usr/bin:/bin)", 1)
        ));
    }

    #[test]
    fn test_posix_exit_127_without_text() {
        assert!(is_command_not_found(ShellFamily::Posix, &failed("", "", 127)));
    }

    #[test]
    fn test_missing_file_is_not_missing_command() {
        let out = failed(
            "",
            "ls: cannot access '/missing': No such file or directory",
            2,
        );
        assert!(!is_command_not_found(ShellFamily::Posix, &out));
    }

    #[test]
    fn test_stdout_content_is_kept() {
        let out = failed("tool 1.2.3\n", "helper: command not found", 1);
        assert!(!is_command_not_found(ShellFamily::Posix, &out));
    }

    #[test]
    fn test_cmd_phrasing() {
        let out = failed(
            "",
            "'x' is not recognized as an internal or external command,\r\noperable program or batch file.",
            1,
        );
        assert!(is_command_not_found(ShellFamily::Cmd, &out));
        assert!(!is_command_not_found(ShellFamily::Posix, &out));
    }

    #[test]
    fn test_where_miss() {
        let out = failed(
            "",
            "INFO: Could not find files for the given pattern(s).",
            1,
        );
        assert!(is_command_not_found(ShellFamily::Cmd, &out));
    }

    #[test]
    fn test_powershell_phrasing_under_cmd() {
        let out = failed(
            "",
            "x : The term 'x' is not recognized as the name of a cmdlet, function, script file",
            1,
        );
        assert!(is_command_not_found(ShellFamily::Cmd, &out));
    }

    #[test]
    fn test_success_is_never_not_found() {
        let out = CommandOutput {
            stdout: "pattern not found".to_string(),
            stderr: "x: command not found".to_string(),
            exit_code: Some(0),
        };
        assert!(!is_command_not_found(ShellFamily::Posix, &out));
    }

    #[test]
    fn test_ordinary_failure_is_kept() {
        let out = failed("", "error: unknown flag --version", 2);
        assert!(!is_command_not_found(ShellFamily::Posix, &out));
    }

    #[test]
    fn test_remote_complaints() {
        assert!(is_remote_not_found("x --version", "bash: x: command not found\n"));
        assert!(is_remote_not_found("x --version", "zsh: command not found: x"));
        assert!(is_remote_not_found("x --version", "sh: 1: x: not found"));
        assert!(is_remote_not_found("which x", "which: no x in (/usr/bin:/bin)"));
    }

    #[test]
    fn test_remote_output_mentioning_phrase_is_kept() {
        assert!(!is_remote_not_found(
            "git log --oneline -1",
            "abc123 fix: handle 'command not found' from npx\n"
        ));
        assert!(!is_remote_not_found(
            "cat notes.txt",
            "npx: command not found happens when node is missing"
        ));
        assert!(!is_remote_not_found("git status", ""));
    }

    #[test]
    fn test_remote_long_output_is_kept() {
        let log = "line\n".repeat(50) + "x: command not found";
        assert!(!is_remote_not_found("x", &log));
    }
}
