use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossexec::cache::DetectionCache;
use crossexec::config::Config;
use crossexec::detector::Detector;
use crossexec::dispatch::{CommandRunner, Dispatcher};
use crossexec::logging;
use crossexec::watcher::{ChannelSink, ProjectWatcher};
use std::sync::Arc;
use tracing::warn;

#[derive(Parser)]
#[command(name = "crossexec")]
#[command(
    about = "Run commands, detect developer tools and watch git state across local, WSL and remote projects"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect installed developer tools for a project (JSON)
    Detect {
        path: String,
        #[arg(long)]
        project_id: Option<String>,
        /// Ignore cached results
        #[arg(long)]
        refresh: bool,
    },
    /// Run a shell command in the project's environment
    Run {
        path: String,
        command: String,
        #[arg(long)]
        project_id: Option<String>,
    },
    /// Print a line every time the project's git state changes
    Watch {
        path: String,
        #[arg(long)]
        project_id: Option<String>,
    },
    /// Inspect or clear the detection cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
    /// Print the execution context a project resolves to
    Context {
        path: String,
        #[arg(long)]
        project_id: Option<String>,
    },
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Show cache tier contents (JSON)
    Stats,
    /// Clear one project's entries, or everything
    Clear { path: Option<String> },
}

fn load_config() -> Config {
    Config::load().unwrap_or_else(|e| {
        warn!(error = %format!("{e:#}"), "ignoring invalid config, using defaults");
        Config::default()
    })
}

fn build_cache(config: &Config, runner: Arc<dyn CommandRunner>) -> DetectionCache {
    let detector = Detector::new(runner).add_probes(config.probes.clone());
    DetectionCache::from_config(detector, config)
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    let config = load_config();
    let runner: Arc<dyn CommandRunner> = Arc::new(Dispatcher::from_config(&config));

    match cli.command {
        Commands::Detect {
            path,
            project_id,
            refresh,
        } => {
            let cache = build_cache(&config, runner);
            let report = cache
                .get_or_detect(&path, project_id.as_deref(), refresh)
                .await;
            println!("{}", serde_json::to_string_pretty(report.as_ref())?);
            eprintln!(
                "{} of {} tools installed ({})",
                report.installed_count(),
                report.results.len(),
                report.context
            );
        }
        Commands::Run {
            path,
            command,
            project_id,
        } => {
            let output = runner
                .run(&command, &path, project_id.as_deref())
                .await
                .with_context(|| format!("Failed to run `{command}` in {path}"))?;
            print!("{}", output.stdout);
            eprint!("{}", output.stderr);
            if let Some(code) = output.exit_code.filter(|c| *c != 0) {
                std::process::exit(code);
            }
        }
        Commands::Watch { path, project_id } => {
            let (sink, mut rx) = ChannelSink::new();
            let watcher = ProjectWatcher::from_config(runner, Arc::new(sink), &config);
            let outcome = watcher.watch(&path, project_id.as_deref()).await;
            if !outcome.success {
                anyhow::bail!(
                    "{}",
                    outcome
                        .message
                        .unwrap_or_else(|| format!("cannot watch {path}"))
                );
            }
            if let Some(message) = &outcome.message {
                eprintln!("{message}");
            }
            eprintln!("Watching {path}. Press Ctrl+C to stop.");

            loop {
                tokio::select! {
                    changed = rx.recv() => match changed {
                        Some(changed) => println!("changed: {changed}"),
                        None => break,
                    },
                    signal = tokio::signal::ctrl_c() => {
                        signal.context("Failed to listen for Ctrl+C")?;
                        break;
                    }
                }
            }
            watcher.shutdown();
        }
        Commands::Cache { command } => {
            let cache = build_cache(&config, runner);
            match command {
                CacheCommands::Stats => {
                    println!("{}", serde_json::to_string_pretty(&cache.stats())?);
                }
                CacheCommands::Clear { path } => {
                    cache.clear(path.as_deref());
                    match path {
                        Some(path) => println!("Cleared cached detections for {path}"),
                        None => println!("Cleared all cached detections"),
                    }
                }
            }
        }
        Commands::Context { path, project_id } => {
            println!("{}", runner.context(&path, project_id.as_deref()));
        }
    }

    Ok(())
}
