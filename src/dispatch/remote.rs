use anyhow::Result;

/// The persistent remote connection owned by the host application.
///
/// Connect / disconnect / authentication happen elsewhere; this crate only
/// asks whether a project lives on a remote host, whether its link is up, and
/// runs commands over it.
#[async_trait::async_trait]
pub trait RemoteLink: Send + Sync {
    /// Whether the project is bound to a remote host, connected or not.
    fn is_remote(&self, project_id: &str) -> bool;

    /// Whether the project's connection is established and usable right now.
    async fn is_healthy(&self, project_id: &str) -> bool;

    /// Run a raw command string remotely. stdout and stderr arrive merged.
    async fn exec(&self, project_id: &str, command: &str) -> Result<String>;
}
