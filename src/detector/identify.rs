use super::{builtin_probes, infer_install_method};
use crate::dispatch::CommandRunner;
use crate::error::ExecError;
use crate::models::{DetectionReport, DetectionResult, ExecutionContext, ToolProbe};
use chrono::Utc;
use regex::Regex;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// What to detect and where.
#[derive(Debug, Clone, Default)]
pub struct DetectOptions {
    pub path: String,
    pub project_id: Option<String>,
    /// Probes added for this call only. Same id as a built-in replaces it.
    pub extra_probes: Vec<ToolProbe>,
}

impl DetectOptions {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..Self::default()
        }
    }

    pub fn with_project_id(mut self, project_id: Option<&str>) -> Self {
        self.project_id = project_id.map(str::to_string);
        self
    }

    pub fn with_probes(mut self, probes: Vec<ToolProbe>) -> Self {
        self.extra_probes = probes;
        self
    }
}

/// Developer tool detector
pub struct Detector {
    runner: Arc<dyn CommandRunner>,
    probes: Vec<ToolProbe>,
}

impl Detector {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            probes: builtin_probes(),
        }
    }

    /// Replace the default probe set
    pub fn with_probes(mut self, probes: Vec<ToolProbe>) -> Self {
        self.probes = probes;
        self
    }

    /// Add probes on top of the current set (config-declared probes)
    pub fn add_probes(mut self, probes: Vec<ToolProbe>) -> Self {
        self.probes = merge_probes(&self.probes, &probes);
        self
    }

    pub fn runner(&self) -> &Arc<dyn CommandRunner> {
        &self.runner
    }

    /// Run every probe concurrently and collect results in probe order.
    ///
    /// A failing probe only marks its own result; the report as a whole fails
    /// only if a probe task itself dies.
    pub async fn detect(&self, options: &DetectOptions) -> DetectionReport {
        let context = self
            .runner
            .context(&options.path, options.project_id.as_deref());
        let probes = merge_probes(&self.probes, &options.extra_probes);
        debug!(%context, path = %options.path, probes = probes.len(), "detecting tools");

        let mut tasks = JoinSet::new();
        for (index, probe) in probes.into_iter().enumerate() {
            let runner = Arc::clone(&self.runner);
            let path = options.path.clone();
            let project_id = options.project_id.clone();
            tasks.spawn(async move {
                let result =
                    detect_probe(runner.as_ref(), context, &probe, &path, project_id.as_deref())
                        .await;
                (index, result)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(indexed) => results.push(indexed),
                Err(e) => {
                    warn!(error = %e, "probe task failed");
                    tasks.abort_all();
                    return DetectionReport::failed(context, format!("probe task failed: {e}"));
                }
            }
        }
        results.sort_by_key(|(index, _)| *index);

        DetectionReport {
            results: results.into_iter().map(|(_, result)| result).collect(),
            success: true,
            error: None,
            context,
            detected_at: Utc::now(),
        }
    }
}

/// Later probes override earlier ones with the same id, keeping the first position.
fn merge_probes(base: &[ToolProbe], extra: &[ToolProbe]) -> Vec<ToolProbe> {
    let mut merged: Vec<ToolProbe> = base.to_vec();
    for probe in extra {
        match merged.iter_mut().find(|p| p.id == probe.id) {
            Some(existing) => *existing = probe.clone(),
            None => merged.push(probe.clone()),
        }
    }
    merged
}

async fn detect_probe(
    runner: &dyn CommandRunner,
    context: ExecutionContext,
    probe: &ToolProbe,
    path: &str,
    project_id: Option<&str>,
) -> DetectionResult {
    let mut result = DetectionResult::not_installed(&probe.id, &probe.name);
    let first_error = fill_probe(runner, context, probe, path, project_id, &mut result).await;

    if result.installed {
        result.install_method = Some(infer_install_method(result.path.as_deref()));
    } else if let Some(e) = first_error {
        debug!(probe = %probe.id, error = %e, "probe failed");
        result.error = Some(e.to_string());
    }
    result
}

/// Runs every step even after a failure; a hung `python3` must not hide
/// `python`. Returns the first error seen.
async fn fill_probe(
    runner: &dyn CommandRunner,
    context: ExecutionContext,
    probe: &ToolProbe,
    path: &str,
    project_id: Option<&str>,
    result: &mut DetectionResult,
) -> Option<ExecError> {
    let mut first_error = None;

    for command in &probe.version_commands {
        let output = match runner.run_in(context, command, path, project_id).await {
            Ok(output) => output,
            Err(e) => {
                debug!(probe = %probe.id, command = %command, error = %e, "version command failed");
                first_error.get_or_insert(e);
                continue;
            }
        };
        if output.is_empty() {
            continue;
        }
        result.installed = true;
        result.version = extract_version(&probe.version_pattern, output.text());
        break;
    }

    // Runs for found-by-version tools too, to backfill the path.
    for command in probe.path_commands_for(context.uses_windows_lookup()) {
        let output = match runner.run_in(context, command, path, project_id).await {
            Ok(output) => output,
            Err(e) => {
                debug!(probe = %probe.id, command = %command, error = %e, "path command failed");
                first_error.get_or_insert(e);
                continue;
            }
        };
        if let Some(line) = first_stdout_line(&output.stdout) {
            result.installed = true;
            result.path = Some(line.to_string());
            break;
        }
    }

    first_error
}

fn first_stdout_line(stdout: &str) -> Option<&str> {
    stdout.lines().map(str::trim).find(|line| !line.is_empty())
}

/// Pull a version out of tool output: capture group 1, else the whole match,
/// else the first non-empty line as printed.
pub fn extract_version(pattern: &str, text: &str) -> Option<String> {
    let first_line = first_stdout_line(text)?;

    let re = match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => {
            warn!(pattern, error = %e, "invalid version pattern");
            return Some(first_line.to_string());
        }
    };

    match re.captures(text) {
        Some(caps) => caps
            .get(1)
            .or_else(|| caps.get(0))
            .map(|m| m.as_str().to_string()),
        None => Some(first_line.to_string()),
    }
}
