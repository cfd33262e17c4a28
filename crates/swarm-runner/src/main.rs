//! Swarm Runner CLI.
//!
//! Commands:
//! - run: Run the configured swarm until Ctrl-C or a time limit
//! - preview: Drive one agent offline and print its plans as JSON lines
//! - zones: Print the zone table

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use swarm_runner::monitor::format_duration;
use swarm_runner::preview::preview_agent;
use swarm_runner::settings::SwarmSettings;
use swarm_runner::swarm::{run_swarm, RunOptions};

/// Generate a timestamped output path from the given path.
/// e.g., "summary.json" -> "summary-20260108-010530.json"
fn timestamped_path(path: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d-%H%M%S");
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("summary");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("json");
    let parent = path.parent().unwrap_or(Path::new("."));
    parent.join(format!("{}-{}.{}", stem, timestamp, ext))
}

#[derive(Parser)]
#[command(name = "swarm-runner")]
#[command(version)]
#[command(about = "Autonomous painting agents on a shared canvas")]
struct Cli {
    /// Canvas API base URL (overrides the settings file)
    #[arg(long = "api-url", env = "CANVAS_API_URL")]
    api_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the swarm
    Run {
        /// Settings file (.toml or .json)
        #[arg(long)]
        config: PathBuf,

        /// Log placements instead of submitting them
        #[arg(long)]
        dry_run: bool,

        /// Stop after this many seconds (default: run until Ctrl-C)
        #[arg(long)]
        duration_secs: Option<u64>,

        /// Random seed for reproducible agent behaviour
        #[arg(long)]
        seed: Option<u64>,

        /// Write the run summary to this JSON file (timestamped)
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Preview one agent's plans without touching the canvas
    Preview {
        /// Settings file (.toml or .json)
        #[arg(long)]
        config: PathBuf,

        /// Agent id to preview
        #[arg(long)]
        agent: String,

        /// Number of ticks to simulate
        #[arg(long, default_value = "20")]
        ticks: usize,

        /// Random seed
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Print the zone table
    Zones {
        /// Settings file (.toml or .json)
        #[arg(long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    match cli.command {
        Commands::Run {
            config,
            dry_run,
            duration_secs,
            seed,
            summary,
        } => {
            let mut settings = SwarmSettings::load(&config)?;
            if let Some(url) = cli.api_url {
                settings.api.base_url = url;
            }
            info!(
                config = %config.display(),
                api = %settings.api.base_url,
                zones = settings.zones.len(),
                agents = settings.agents.len(),
                "Loaded settings"
            );

            let options = RunOptions {
                dry_run,
                duration: duration_secs.map(Duration::from_secs),
                seed,
            };
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "Failed to listen for Ctrl-C; waiting forever");
                    std::future::pending::<()>().await;
                }
            };
            let result = run_swarm(settings, options, shutdown).await?;

            println!("\n=== Swarm Run Complete ===");
            println!("Run: {}", result.run_id);
            println!("Duration: {}", format_duration(result.duration_ms()));
            println!("Accepted: {}", result.total_accepted);
            println!("Skipped: {}", result.total_skipped);
            println!("Errors: {}", result.total_errors);
            println!("\nPer agent:");
            println!(
                "  {:<24} {:>8} {:>8} {:>8}",
                "Agent", "Placed", "Skipped", "Errors"
            );
            for (name, stats) in &result.stats.agents {
                println!(
                    "  {:<24} {:>8} {:>8} {:>8}",
                    name, stats.accepted, stats.skipped, stats.errors
                );
            }

            if let Some(path) = summary {
                let output_path = timestamped_path(&path);
                result.save(&output_path)?;
                println!("\nSummary saved to: {}", output_path.display());
            }
        }

        Commands::Preview {
            config,
            agent,
            ticks,
            seed,
        } => {
            let settings = SwarmSettings::load(&config)?;
            let agent_config = settings
                .agent(&agent)
                .cloned()
                .with_context(|| format!("No agent '{}' in {}", agent, config.display()))?;
            let zones = settings.zone_manager()?;

            let steps = preview_agent(agent_config, zones, settings.activity.clone(), ticks, seed)?;
            for step in &steps {
                println!("{}", serde_json::to_string(step)?);
            }
        }

        Commands::Zones { config } => {
            let settings = SwarmSettings::load(&config)?;
            println!(
                "{:>6}  {:<20} {:>11} {:>11} {:>9}",
                "Id", "Name", "X", "Y", "Size"
            );
            for zone in settings.zone_manager()?.zones() {
                println!(
                    "{:>6}  {:<20} {:>5}..{:<4} {:>5}..{:<4} {:>4}x{:<4}",
                    zone.id.0,
                    zone.name,
                    zone.x_start,
                    zone.x_end,
                    zone.y_start,
                    zone.y_end,
                    zone.width(),
                    zone.height()
                );
            }
        }
    }

    Ok(())
}
