pub mod identify;
pub mod probes;

pub use identify::{DetectOptions, Detector};
pub use probes::builtin_probes;

use crate::models::InstallMethod;

/// Path fragments left behind by language package managers.
const PACKAGE_MANAGER_FRAGMENTS: &[&str] = &[
    "/node_modules/",
    "/npm/",
    "/.npm-global/",
    "/.nvm/",
    "/pnpm/",
    "/.pnpm",
    "/.yarn/",
    "/.bun/",
    "/.volta/",
    "/fnm",
    "/.cargo/bin/",
    "/pipx/",
];

/// Self-updating installers that drop binaries under a per-user vendor directory.
const VENDOR_FRAGMENTS: &[&str] = &[
    "/.claude/local/",
    "/.claude/bin/",
    "/.codex/",
    "/.gemini/",
    "/.local/bin/",
    "/appdata/local/programs/",
];

/// System package managers, Homebrew and OS installers.
const OS_NATIVE_FRAGMENTS: &[&str] = &[
    "/opt/homebrew/",
    "/usr/local/cellar/",
    "/home/linuxbrew/",
    "/.linuxbrew/",
    "/usr/local/bin/",
    "/usr/bin/",
    "/bin/",
    "/snap/bin/",
    "/nix/store/",
    "/program files/",
    "/program files (x86)/",
];

/// Guess how a tool was installed from where it resolved.
///
/// Package-manager fragments are checked first so that a global npm install
/// under a Homebrew prefix still counts as a package-manager install.
pub fn infer_install_method(path: Option<&str>) -> InstallMethod {
    let Some(path) = path else {
        return InstallMethod::Unknown;
    };

    let normalized = format!("/{}", path.trim().replace('\\', "/").to_lowercase());

    if matches_any(&normalized, PACKAGE_MANAGER_FRAGMENTS) {
        InstallMethod::PackageManagerGlobal
    } else if matches_any(&normalized, VENDOR_FRAGMENTS) {
        InstallMethod::VendorSpecificPath
    } else if matches_any(&normalized, OS_NATIVE_FRAGMENTS) {
        InstallMethod::OsNativeInstaller
    } else {
        InstallMethod::Unknown
    }
}

fn matches_any(path: &str, fragments: &[&str]) -> bool {
    fragments.iter().any(|f| path.contains(f))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_manager_paths() {
        for path in [
            "/Users/me/.nvm/versions/node/v20.1.0/bin/claude",
            r"C:\Users\me\AppData\Roaming\npm\claude.cmd",
            "/opt/homebrew/lib/node_modules/@openai/codex/bin/codex.js",
            "/home/me/.bun/bin/gemini",
            "/home/me/.cargo/bin/rg",
        ] {
            assert_eq!(
                infer_install_method(Some(path)),
                InstallMethod::PackageManagerGlobal,
                "{path}"
            );
        }
    }

    #[test]
    fn test_vendor_paths() {
        assert_eq!(
            infer_install_method(Some("/home/me/.claude/local/claude")),
            InstallMethod::VendorSpecificPath
        );
        assert_eq!(
            infer_install_method(Some("/home/me/.local/bin/claude")),
            InstallMethod::VendorSpecificPath
        );
        assert_eq!(
            infer_install_method(Some(
                r"C:\Users\me\AppData\Local\Programs\Git\cmd\git.exe"
            )),
            InstallMethod::VendorSpecificPath
        );
    }

    #[test]
    fn test_os_native_paths() {
        for path in [
            "/opt/homebrew/bin/git",
            "/usr/bin/git",
            r"C:\Program Files\nodejs\node.exe",
            "/snap/bin/node",
        ] {
            assert_eq!(
                infer_install_method(Some(path)),
                InstallMethod::OsNativeInstaller,
                "{path}"
            );
        }
    }

    #[test]
    fn test_unknown() {
        assert_eq!(infer_install_method(None), InstallMethod::Unknown);
        assert_eq!(
            infer_install_method(Some("/srv/tools/x")),
            InstallMethod::Unknown
        );
    }
}
