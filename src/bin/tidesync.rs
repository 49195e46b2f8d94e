//! CLI binary for tidesync.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tidesync::{DataSource, SyncApp, SyncConfig, TaskEvent};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;

/// Keep locally cached marine data in sync with its remote sources.
#[derive(Parser)]
#[command(name = "tidesync", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Refresh the station catalog of every source.
    Catalogs,

    /// Refresh time series for the given stations.
    Stations {
        /// Data source: tides, currents or buoys.
        #[arg(short, long)]
        source: DataSource,

        /// Station ids.
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Refresh every preferred station listed in the config.
    Preferred,

    /// Show recorded cooldowns.
    Cooldowns,

    /// Clear cooldown records so the next refresh runs immediately.
    Reset {
        /// Clear only this task key.
        #[arg(long)]
        key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Diagnostics go to stderr; stdout carries command output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tidesync=info,tidesync_fetch=info")),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(tidesync::sync_dirs::config_file);
    let config = SyncConfig::load_or_default(&config_path)?;

    let app = tidesync::start(&config)?;
    // Shut down even when the command fails.
    let result = run_command(&app, &config, &config_path, cli.command).await;
    app.shutdown().await?;
    result
}

async fn run_command(
    app: &SyncApp,
    config: &SyncConfig,
    config_path: &Path,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Catalogs => {
            let events = app.scheduler.follow()?;
            app.orchestrator.refresh_all_catalogs()?;
            follow(app, events).await
        }
        Command::Stations { source, ids } => {
            let events = app.scheduler.follow()?;
            app.orchestrator.refresh_stations(source, ids)?;
            follow(app, events).await
        }
        Command::Preferred => {
            if config.preferred.is_empty() {
                println!("No preferred stations in {}", config_path.display());
            }
            let events = app.scheduler.follow()?;
            app.orchestrator.refresh_preferred(&config.preferred)?;
            follow(app, events).await
        }
        Command::Cooldowns => show_cooldowns(app),
        Command::Reset { key } => reset(app, key.as_deref()),
    }
}

/// Print lifecycle events as they arrive until the scheduler is idle. Fails
/// if any task failed.
async fn follow(app: &SyncApp, events: UnboundedReceiver<TaskEvent>) -> anyhow::Result<()> {
    let summary = app
        .scheduler
        .follow_until_idle(events, |event| match event {
            TaskEvent::Started { key } => println!("started    {key}"),
            TaskEvent::Completed {
                key,
                output,
                elapsed,
            } => println!("completed  {key}: {output} ({} ms)", elapsed.as_millis()),
            TaskEvent::Failed {
                key,
                error,
                elapsed,
            } => println!("failed     {key}: {error} ({} ms)", elapsed.as_millis()),
        })
        .await?;

    if summary.failed > 0 {
        anyhow::bail!("{} refresh task(s) failed", summary.failed);
    }
    Ok(())
}

fn show_cooldowns(app: &SyncApp) -> anyhow::Result<()> {
    let entries = app.cooldowns.entries()?;
    if entries.is_empty() {
        println!("No cooldowns recorded.");
    }
    for (key, at) in entries {
        println!("{key:<32} {}", at.to_rfc3339());
    }
    Ok(())
}

fn reset(app: &SyncApp, key: Option<&str>) -> anyhow::Result<()> {
    match key {
        Some(key) => {
            if app.cooldowns.clear(key)? {
                println!("Cleared {key}");
            } else {
                println!("No cooldown recorded for {key}");
            }
        }
        None => {
            app.cooldowns.clear_all()?;
            println!("Cleared all cooldowns");
        }
    }
    Ok(())
}
