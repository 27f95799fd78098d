use super::ExecutionContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a tool ended up on the machine, inferred from its resolved path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallMethod {
    PackageManagerGlobal,
    OsNativeInstaller,
    VendorSpecificPath,
    Unknown,
}

/// Outcome of probing a single tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub id: String,
    pub name: String,
    pub installed: bool,
    pub version: Option<String>,
    pub path: Option<String>,
    pub install_method: Option<InstallMethod>,
    pub error: Option<String>,
}

impl DetectionResult {
    pub fn not_installed(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            installed: false,
            version: None,
            path: None,
            install_method: None,
            error: None,
        }
    }
}

/// All probe results for one project, in probe order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionReport {
    pub results: Vec<DetectionResult>,
    pub success: bool,
    pub error: Option<String>,
    pub context: ExecutionContext,
    pub detected_at: DateTime<Utc>,
}

impl DetectionReport {
    pub fn failed(context: ExecutionContext, error: String) -> Self {
        Self {
            results: Vec::new(),
            success: false,
            error: Some(error),
            context,
            detected_at: Utc::now(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&DetectionResult> {
        self.results.iter().find(|r| r.id == id)
    }

    pub fn installed_count(&self) -> usize {
        self.results.iter().filter(|r| r.installed).count()
    }
}
