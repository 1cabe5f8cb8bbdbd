//! Simulation runner: the bootstrap collaborator for the kernel.
//!
//! Orchestrates one run:
//! 1. Derive the run's seed and player names
//! 2. Build and spawn the simulation (coordinator + player tasks)
//! 3. Wait for the winner
//! 4. Wrap the outcome with timing metadata

use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use playarea_kernel::{SimulationBuilder, SimulationConfig};

use crate::results::{RunConfig, RunResult};

/// Players in a run when nothing else is configured.
pub const DEFAULT_PLAYERS: usize = 10;

/// Configuration for the simulation runner.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Kernel configuration shared by every run
    pub simulation: SimulationConfig,
    /// Number of players registered at startup
    pub players: usize,
    /// Player names are `{prefix}{index}`
    pub name_prefix: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            players: DEFAULT_PLAYERS,
            name_prefix: "player".to_string(),
        }
    }
}

impl RunnerConfig {
    pub fn player_names(&self) -> Vec<String> {
        (0..self.players)
            .map(|i| format!("{}{}", self.name_prefix, i))
            .collect()
    }

    /// Seed for a given trial. A configured seed is offset by the trial
    /// number so batch runs differ but stay reproducible.
    pub fn trial_seed(&self, trial: usize) -> Option<u64> {
        self.simulation
            .seed
            .map(|seed| seed.wrapping_add(trial as u64))
    }
}

pub struct SimulationRunner {
    config: RunnerConfig,
}

impl SimulationRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run a single simulation to completion.
    pub async fn run(&self, trial: usize) -> Result<RunResult> {
        if self.config.players == 0 {
            anyhow::bail!("at least one player is required");
        }

        let simulation_config = SimulationConfig {
            seed: self.config.trial_seed(trial),
            ..self.config.simulation.clone()
        };
        let started_at = Utc::now();
        let clock = Instant::now();

        let simulation = SimulationBuilder::new(simulation_config.clone())
            .add_players(self.config.player_names())
            .spawn()
            .context("failed to start simulation")?;
        let seed = simulation.seed();

        let outcome = simulation.wait().await.context("simulation failed")?;
        let elapsed_ms = clock.elapsed().as_millis() as u64;

        info!(
            trial,
            seed,
            winner = %outcome.winner.name,
            processed = outcome.stats.processed,
            elapsed_ms,
            "Completed run"
        );

        Ok(RunResult {
            config: RunConfig {
                trial,
                players: self.config.players,
                grid_size: simulation_config.grid_size,
                queue_capacity: simulation_config.queue_capacity,
                move_delay_ms: simulation_config.move_delay_ms,
                reinstatement_delay_ms: simulation_config.reinstatement_delay_ms,
                seed,
            },
            started_at,
            ended_at: Utc::now(),
            elapsed_ms,
            outcome,
        })
    }
}
