//! Shell invocations for local, Windows and WSL execution, and running them
//! under a timeout.

use super::not_found::{self, ShellFamily};
use super::CommandOutput;
use crate::environment::{to_mount_path, WslPath};
use crate::error::ExecError;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// A fully resolved program + args pair ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub family: ShellFamily,
}

/// Plain `sh -c`, or the user's login shell so profile PATH edits apply.
pub fn unix_invocation(command: &str, cwd: &str, login_shell: Option<&str>) -> ShellInvocation {
    let (program, args) = match login_shell {
        Some(shell) => (
            shell.to_string(),
            vec!["-l".to_string(), "-c".to_string(), command.to_string()],
        ),
        None => (
            "sh".to_string(),
            vec!["-c".to_string(), command.to_string()],
        ),
    };

    ShellInvocation {
        program,
        args,
        cwd: non_empty_dir(cwd),
        family: ShellFamily::Posix,
    }
}

/// Git Bash as a login shell when available, `cmd /C` otherwise.
pub fn windows_invocation(command: &str, cwd: &str, bash: Option<&Path>) -> ShellInvocation {
    match bash {
        Some(bash) => ShellInvocation {
            program: bash.display().to_string(),
            args: vec![
                "--login".to_string(),
                "-c".to_string(),
                command.to_string(),
            ],
            cwd: non_empty_dir(cwd),
            family: ShellFamily::Posix,
        },
        None => ShellInvocation {
            program: "cmd".to_string(),
            args: vec!["/D".to_string(), "/C".to_string(), command.to_string()],
            cwd: non_empty_dir(cwd),
            family: ShellFamily::Cmd,
        },
    }
}

/// `wsl.exe [-d <distro>] --cd <linux dir> -- bash -lc <command>`.
///
/// Share paths pick their distro; drive paths map to `/mnt/<drive>` in the
/// default distro.
pub fn wsl_invocation(command: &str, path: &str) -> ShellInvocation {
    let mut args = Vec::new();

    let linux_dir = match WslPath::parse(path) {
        Some(wsl) => {
            args.push("-d".to_string());
            args.push(wsl.distro);
            Some(wsl.linux_path)
        }
        None => to_mount_path(path),
    };

    if let Some(dir) = linux_dir {
        args.push("--cd".to_string());
        args.push(dir);
    }

    args.extend([
        "--".to_string(),
        "bash".to_string(),
        "-lc".to_string(),
        command.to_string(),
    ]);

    ShellInvocation {
        program: "wsl.exe".to_string(),
        args,
        cwd: None,
        family: ShellFamily::Posix,
    }
}

fn non_empty_dir(cwd: &str) -> Option<PathBuf> {
    let cwd = cwd.trim();
    if cwd.is_empty() {
        None
    } else {
        Some(PathBuf::from(cwd))
    }
}

/// Spawn the invocation and capture both streams.
///
/// Non-zero exits keep whatever they printed. A missing program (either the
/// launcher itself or the command inside the shell) yields an empty output.
pub async fn execute(
    invocation: &ShellInvocation,
    command: &str,
    timeout: Duration,
) -> Result<CommandOutput, ExecError> {
    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(cwd) = &invocation.cwd {
        if cwd.is_dir() {
            cmd.current_dir(cwd);
        } else {
            debug!(cwd = %cwd.display(), "working directory missing, using inherited cwd");
        }
    }

    #[cfg(windows)]
    {
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }

    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) if e.kind() == io::ErrorKind::NotFound => {
            debug!(program = %invocation.program, "launcher not found, treating as empty result");
            return Ok(CommandOutput::default());
        }
        Ok(Err(e)) => {
            return Err(ExecError::Spawn {
                program: invocation.program.clone(),
                source: e,
            })
        }
        Err(_) => {
            return Err(ExecError::Timeout {
                command: command.to_string(),
                timeout,
            })
        }
    };

    let output = CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code(),
    };

    if not_found::is_command_not_found(invocation.family, &output) {
        debug!(command, "command not found, treating as empty result");
        return Ok(CommandOutput::default());
    }

    Ok(output)
}

/// Finds a POSIX shell on Windows once per locator.
#[derive(Debug, Default)]
pub struct ShellLocator {
    posix: OnceLock<Option<PathBuf>>,
}

impl ShellLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locator whose answer is fixed up front.
    pub fn with_shell(shell: Option<PathBuf>) -> Self {
        let posix = OnceLock::new();
        let _ = posix.set(shell);
        Self { posix }
    }

    pub fn posix_shell(&self) -> Option<&Path> {
        self.posix.get_or_init(find_posix_shell).as_deref()
    }
}

fn find_posix_shell() -> Option<PathBuf> {
    let found = git_bash_candidates()
        .into_iter()
        .find(|p| p.is_file())
        .or_else(|| which::which("bash").ok().filter(|p| !is_wsl_launcher(p)));

    match &found {
        Some(path) => debug!(shell = %path.display(), "using POSIX login shell"),
        None => debug!("no POSIX shell found, falling back to cmd"),
    }
    found
}

fn git_bash_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    for var in ["ProgramFiles", "ProgramW6432", "ProgramFiles(x86)"] {
        if let Some(dir) = std::env::var_os(var) {
            candidates.push(PathBuf::from(dir).join("Git").join("bin").join("bash.exe"));
        }
    }
    if let Some(local) = dirs::data_local_dir() {
        candidates.push(
            local
                .join("Programs")
                .join("Git")
                .join("bin")
                .join("bash.exe"),
        );
    }
    candidates
}

/// `C:\Windows\System32\bash.exe` and the Store alias start WSL, not a local shell.
fn is_wsl_launcher(path: &Path) -> bool {
    let lower = path.display().to_string().to_lowercase();
    lower.contains("system32") || lower.contains("windowsapps")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_invocation_plain() {
        let inv = unix_invocation("git --version", "/srv/app", None);
        assert_eq!(inv.program, "sh");
        assert_eq!(inv.args, vec!["-c", "git --version"]);
        assert_eq!(inv.cwd, Some(PathBuf::from("/srv/app")));
    }

    #[test]
    fn test_unix_invocation_login_shell() {
        let inv = unix_invocation("node -v", "", Some("/bin/zsh"));
        assert_eq!(inv.program, "/bin/zsh");
        assert_eq!(inv.args, vec!["-l", "-c", "node -v"]);
        assert_eq!(inv.cwd, None);
    }

    #[test]
    fn test_windows_invocation_prefers_bash() {
        let bash = PathBuf::from(r"C:\Program Files\Git\bin\bash.exe");
        let inv = windows_invocation("claude --version", r"C:\code", Some(&bash));
        assert!(inv.program.ends_with("bash.exe"));
        assert_eq!(inv.args[0], "--login");
        assert_eq!(inv.family, ShellFamily::Posix);

        let inv = windows_invocation("claude --version", r"C:\code", None);
        assert_eq!(inv.program, "cmd");
        assert_eq!(inv.args, vec!["/D", "/C", "claude --version"]);
        assert_eq!(inv.family, ShellFamily::Cmd);
    }

    #[test]
    fn test_wsl_invocation_share_path() {
        let inv = wsl_invocation("git status", r"\\wsl$\Ubuntu\home\me\proj");
        assert_eq!(inv.program, "wsl.exe");
        assert_eq!(
            inv.args,
            vec![
                "-d",
                "Ubuntu",
                "--cd",
                "/home/me/proj",
                "--",
                "bash",
                "-lc",
                "git status"
            ]
        );
        assert_eq!(inv.cwd, None);
    }

    #[test]
    fn test_wsl_invocation_drive_path() {
        let inv = wsl_invocation("ls", r"C:\Users\me");
        assert_eq!(
            inv.args,
            vec!["--cd", "/mnt/c/Users/me", "--", "bash", "-lc", "ls"]
        );
    }

    #[test]
    fn test_is_wsl_launcher() {
        assert!(is_wsl_launcher(Path::new(r"C:\Windows\System32\bash.exe")));
        assert!(is_wsl_launcher(Path::new(
            r"C:\Users\me\AppData\Local\Microsoft\WindowsApps\bash.exe"
        )));
        assert!(!is_wsl_launcher(Path::new(r"C:\Program Files\Git\bin\bash.exe")));
    }

    #[test]
    fn test_locator_with_fixed_shell() {
        let locator = ShellLocator::with_shell(None);
        assert!(locator.posix_shell().is_none());
        let locator = ShellLocator::with_shell(Some(PathBuf::from("/bin/bash")));
        assert_eq!(locator.posix_shell(), Some(Path::new("/bin/bash")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_captures_stdout() {
        let inv = unix_invocation("echo hello", "", None);
        let out = execute(&inv, "echo hello", Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.exit_code, Some(0));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_keeps_output_of_failed_command() {
        let cmd = "echo 'tool 1.2.3' >&2; exit 3";
        let inv = unix_invocation(cmd, "", None);
        let out = execute(&inv, cmd, Duration::from_secs(10)).await.unwrap();
        assert_eq!(out.stderr.trim(), "tool 1.2.3");
        assert_eq!(out.exit_code, Some(3));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_keeps_partial_stdout_on_missing_file() {
        let cmd = "echo 'tool 1.2.3'; ls /definitely/missing/dir";
        let inv = unix_invocation(cmd, "", None);
        let out = execute(&inv, cmd, Duration::from_secs(10)).await.unwrap();
        assert_eq!(out.stdout.trim(), "tool 1.2.3");
        assert!(out.stderr.to_lowercase().contains("no such file or directory"));
        assert!(matches!(out.exit_code, Some(code) if code != 0));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_keeps_missing_file_error() {
        let cmd = "ls /definitely/missing/dir";
        let inv = unix_invocation(cmd, "", None);
        let out = execute(&inv, cmd, Duration::from_secs(10)).await.unwrap();
        assert!(out.stdout.is_empty());
        assert!(!out.stderr.is_empty());
        assert!(out.exit_code.is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_missing_command_is_empty() {
        let cmd = "definitely-not-a-real-tool-xyz --version";
        let inv = unix_invocation(cmd, "", None);
        let out = execute(&inv, cmd, Duration::from_secs(10)).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_execute_missing_launcher_is_empty() {
        let inv = ShellInvocation {
            program: "no-such-launcher-xyz".to_string(),
            args: vec![],
            cwd: None,
            family: ShellFamily::Posix,
        };
        let out = execute(&inv, "x", Duration::from_secs(10)).await.unwrap();
        assert!(out.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_timeout() {
        let inv = unix_invocation("sleep 5", "", None);
        let err = execute(&inv, "sleep 5", Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Timeout { .. }));
    }
}
