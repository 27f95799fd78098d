//! WSL share paths as seen from Windows, and drive-letter translation.

const WSL_HOSTS: [&str; 2] = ["wsl$", "wsl.localhost"];

/// A `\\wsl$\<distro>\...` path split into its distro and Linux path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WslPath {
    pub distro: String,
    pub linux_path: String,
}

impl WslPath {
    /// Parse either slash style; the host part is case-insensitive.
    ///
    /// # Example
    /// ```
    /// use crossexec::environment::WslPath;
    /// let p = WslPath::parse(r"\\wsl$\Ubuntu\home\me").unwrap();
    /// assert_eq!(p.distro, "Ubuntu");
    /// assert_eq!(p.linux_path, "/home/me");
    /// ```
    pub fn parse(path: &str) -> Option<Self> {
        let normalized = path.trim().replace('\\', "/");
        let rest = normalized.strip_prefix("//")?;
        let (host, rest) = match rest.split_once('/') {
            Some((host, rest)) => (host, rest),
            None => (rest, ""),
        };

        if !WSL_HOSTS.iter().any(|h| host.eq_ignore_ascii_case(h)) {
            return None;
        }

        let (distro, tail) = match rest.split_once('/') {
            Some((distro, tail)) => (distro, tail),
            None => (rest, ""),
        };
        if distro.is_empty() {
            return None;
        }

        let tail = tail.trim_matches('/');
        let linux_path = if tail.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", tail)
        };

        Some(Self {
            distro: distro.to_string(),
            linux_path,
        })
    }

    pub fn is_wsl_path(path: &str) -> bool {
        Self::parse(path).is_some()
    }
}

/// Translate `C:\Users\me` into `/mnt/c/Users/me`.
pub fn to_mount_path(path: &str) -> Option<String> {
    let mut chars = path.chars();
    let drive = chars.next()?;
    if !drive.is_ascii_alphabetic() || chars.next()? != ':' {
        return None;
    }

    let rest = chars.as_str().replace('\\', "/");
    let rest = rest.trim_matches('/');
    let drive = drive.to_ascii_lowercase();
    if rest.is_empty() {
        Some(format!("/mnt/{}", drive))
    } else {
        Some(format!("/mnt/{}/{}", drive, rest))
    }
}
