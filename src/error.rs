use std::time::Duration;

/// Reasons a command could not be run to completion.
///
/// A program exiting non-zero is not an error, and neither is a missing
/// program: both come back as a `CommandOutput`.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("remote connection unavailable for project {project}")]
    RemoteUnavailable { project: String },

    #[error("command timed out after {}s: {command}", .timeout.as_secs())]
    Timeout { command: String, timeout: Duration },

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("remote execution failed: {0}")]
    Remote(String),
}

/// Durable cache tier failures. Logged by the cache, never surfaced to callers.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Persist error: {0}")]
    Persist(#[from] tempfile::PersistError),
}
