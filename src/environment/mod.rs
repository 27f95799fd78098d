//! Decides which execution context a project path belongs to.

mod wsl_path;

pub use wsl_path::{to_mount_path, WslPath};

use crate::dispatch::RemoteLink;
use crate::models::ExecutionContext;

/// Classify a project path.
///
/// Remote membership wins over path shape; a WSL share path wins over the
/// host OS. Never touches the filesystem and never fails: anything
/// unrecognized is the local host context.
pub fn classify(
    path: &str,
    project_id: Option<&str>,
    remote: Option<&dyn RemoteLink>,
) -> ExecutionContext {
    classify_on(ExecutionContext::host(), path, project_id, remote)
}

/// Same as [`classify`] with the host context made explicit.
pub fn classify_on(
    host: ExecutionContext,
    path: &str,
    project_id: Option<&str>,
    remote: Option<&dyn RemoteLink>,
) -> ExecutionContext {
    if let (Some(id), Some(link)) = (project_id, remote) {
        if link.is_remote(id) {
            return ExecutionContext::SshRemote;
        }
    }

    if WslPath::is_wsl_path(path) {
        return ExecutionContext::Wsl;
    }

    host
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRemote;

    #[test]
    fn test_remote_project_wins_over_path_shape() {
        let remote = FakeRemote::new().with_project("p1");
        let ctx = classify_on(
            ExecutionContext::LocalWindows,
            r"\\wsl$\Ubuntu\home\me\proj",
            Some("p1"),
            Some(&remote),
        );
        assert_eq!(ctx, ExecutionContext::SshRemote);
    }

    #[test]
    fn test_unknown_project_falls_through() {
        let remote = FakeRemote::new().with_project("p1");
        let ctx = classify_on(
            ExecutionContext::LocalUnix,
            "/home/me/proj",
            Some("other"),
            Some(&remote),
        );
        assert_eq!(ctx, ExecutionContext::LocalUnix);
    }

    #[test]
    fn test_project_id_without_link_is_local() {
        let ctx = classify_on(ExecutionContext::LocalUnix, "/srv/app", Some("p1"), None);
        assert_eq!(ctx, ExecutionContext::LocalUnix);
    }

    #[test]
    fn test_wsl_paths() {
        for path in [
            r"\\wsl$\Ubuntu\home\me",
            r"\\wsl.localhost\Debian\srv",
            "//wsl$/Ubuntu/home/me",
            r"\\WSL$\Ubuntu",
        ] {
            assert_eq!(
                classify_on(ExecutionContext::LocalWindows, path, None, None),
                ExecutionContext::Wsl,
                "{path}"
            );
        }
    }

    #[test]
    fn test_host_fallback() {
        assert_eq!(
            classify_on(ExecutionContext::LocalWindows, r"C:\code\app", None, None),
            ExecutionContext::LocalWindows
        );
        assert_eq!(
            classify_on(ExecutionContext::LocalUnix, "", None, None),
            ExecutionContext::LocalUnix
        );
    }
}
