//! Play area simulation CLI.
//!
//! Commands:
//! - run: Run a single simulation and print the winner
//! - batch: Run several seeded simulations and save the results as JSON

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use playarea_kernel::SimulationConfig;
use playarea_sim::results::{format_duration, BatchResults, RunResult};
use playarea_sim::runner::{RunnerConfig, SimulationRunner, DEFAULT_PLAYERS};

/// Generate a timestamped output path from the given path.
/// e.g., "results.json" -> "results-20260108-010530.json"
fn timestamped_path(path: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d-%H%M%S");
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("results");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("json");
    let parent = path.parent().unwrap_or(Path::new("."));
    parent.join(format!("{}-{}.{}", stem, timestamp, ext))
}

#[derive(Parser)]
#[command(name = "playarea-sim")]
#[command(version)]
#[command(about = "Concurrent grid play area simulation")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Simulation parameters shared by every command. Flags override values
/// loaded from `--config`.
#[derive(Args)]
struct SimArgs {
    /// JSON configuration file
    #[arg(long, env = "PLAYAREA_CONFIG")]
    config: Option<PathBuf>,

    /// Number of players
    #[arg(long)]
    players: Option<usize>,

    /// Grid side length
    #[arg(long)]
    grid_size: Option<usize>,

    /// Request queue capacity
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Delay between a verdict and the player's next move
    #[arg(long)]
    move_delay_ms: Option<u64>,

    /// Delay between an eviction and the return request
    #[arg(long)]
    reinstatement_delay_ms: Option<u64>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Prefix for generated player names
    #[arg(long, default_value = "Jhon")]
    name_prefix: String,
}

impl SimArgs {
    fn into_runner_config(self) -> Result<RunnerConfig> {
        let mut simulation = match &self.config {
            Some(path) => SimulationConfig::load(path)?,
            None => SimulationConfig::default(),
        };
        if let Some(grid_size) = self.grid_size {
            simulation.grid_size = grid_size;
        }
        if let Some(queue_capacity) = self.queue_capacity {
            simulation.queue_capacity = queue_capacity;
        }
        if let Some(delay) = self.move_delay_ms {
            simulation.move_delay_ms = delay;
        }
        if let Some(delay) = self.reinstatement_delay_ms {
            simulation.reinstatement_delay_ms = delay;
        }
        if self.seed.is_some() {
            simulation.seed = self.seed;
        }
        simulation.validate()?;

        Ok(RunnerConfig {
            simulation,
            players: self.players.unwrap_or(DEFAULT_PLAYERS),
            name_prefix: self.name_prefix,
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single simulation
    Run {
        #[command(flatten)]
        sim: SimArgs,

        /// Also save the run as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Run a batch of simulations
    Batch {
        #[command(flatten)]
        sim: SimArgs,

        /// Number of trials
        #[arg(long, default_value = "5")]
        trials: usize,

        /// Output file for results
        #[arg(long, default_value = "results.json")]
        output: PathBuf,
    },
}

fn print_run(result: &RunResult) {
    let outcome = &result.outcome;
    let stats = &outcome.stats;

    println!("\n=== Simulation Result ===");
    println!("Winner: {} ({})", outcome.winner.name, outcome.winner.id);
    println!("Players: {}", result.config.players);
    println!(
        "Grid: {}x{}",
        result.config.grid_size, result.config.grid_size
    );
    println!("Seed: {}", result.config.seed);
    println!("Elapsed: {}", format_duration(result.elapsed_ms));

    println!("\nRequests:");
    println!("  Processed: {}", stats.processed);
    println!("  Accepted: {}", stats.accepted);
    println!("  Rejected: {}", stats.rejected);
    println!("  Ignored: {}", stats.ignored);
    println!("  Drained at shutdown: {}", stats.drained);

    println!("\nReferee:");
    println!("  Fouls: {}", stats.fouls);
    println!("  Evictions: {}", stats.evictions);
    println!("  Permanent removals: {}", stats.permanent_removals);
    println!("  Reinstatements: {}", stats.reinstatements);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    match cli.command {
        Commands::Run { sim, output } => {
            let runner = SimulationRunner::new(sim.into_runner_config()?);
            let result = runner.run(0).await?;
            print_run(&result);

            if let Some(output) = output {
                let mut results = BatchResults::new();
                results.add(result);
                results.compute_summary();
                let output_path = timestamped_path(&output);
                results.save(&output_path)?;
                println!("\nResults saved to: {}", output_path.display());
            }
        }

        Commands::Batch {
            sim,
            trials,
            output,
        } => {
            let runner = SimulationRunner::new(sim.into_runner_config()?);
            info!(
                trials,
                players = runner.config().players,
                grid_size = runner.config().simulation.grid_size,
                "Starting batch"
            );

            let mut results = BatchResults::new();
            for trial in 0..trials {
                let result = runner.run(trial).await?;
                info!(
                    progress = format!("{}/{}", trial + 1, trials),
                    winner = %result.outcome.winner.name,
                    "Completed trial"
                );
                results.add(result);
            }

            results.compute_summary();
            let output_path = timestamped_path(&output);
            results.save(&output_path)?;

            println!("\n=== Batch Complete ===");
            println!("Results saved to: {}", output_path.display());
            if let Some(summary) = &results.summary {
                println!("\nSummary:");
                println!("  Trials: {}", summary.trials);
                println!(
                    "  Avg processed: {:.1} ± {:.1}",
                    summary.avg_processed, summary.avg_processed_se
                );
                println!(
                    "  Processed range: {}..={}",
                    summary.min_processed, summary.max_processed
                );
                println!("  Avg evictions: {:.1}", summary.avg_evictions);
                println!("  Avg reinstatements: {:.1}", summary.avg_reinstatements);
                println!("  Wins:");
                for (name, wins) in &summary.wins {
                    println!("    {}: {}", name, wins);
                }
            }
        }
    }

    Ok(())
}
