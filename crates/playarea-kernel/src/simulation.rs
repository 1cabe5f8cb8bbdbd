//! Bootstrap wiring: build the coordinator, register players, start timers.
//!
//! ## Usage
//!
//! ```ignore
//! use playarea_kernel::{SimulationBuilder, SimulationConfig};
//!
//! let simulation = SimulationBuilder::new(SimulationConfig::default())
//!     .add_players((0..10).map(|i| format!("Jhon{i}")))
//!     .spawn()?;
//!
//! let outcome = simulation.wait().await?;
//! println!("{} won!", outcome.winner.name);
//! ```

use tokio::task::{JoinHandle, JoinSet};
use tracing::{info, warn};

use crate::agent::{AgentTiming, PlayerAgent};
use crate::config::SimulationConfig;
use crate::coordinator::{Coordinator, SimulationOutcome};
use crate::error::{KernelError, Result};
use crate::referee::Referee;

/// Builder for a full simulation: one coordinator task plus one timer task
/// per player.
pub struct SimulationBuilder {
    config: SimulationConfig,
    names: Vec<String>,
}

impl SimulationBuilder {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            names: Vec::new(),
        }
    }

    pub fn add_player(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    pub fn add_players<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names.extend(names.into_iter().map(Into::into));
        self
    }

    /// Register every player, start their timers, signal `ready`, and start
    /// the processing loop. Must be called inside a tokio runtime.
    pub fn spawn(self) -> Result<Simulation> {
        self.config.validate()?;
        // A full grid rejects every move, so no foul could ever end the run.
        if self.names.len() >= self.config.cell_count() {
            return Err(KernelError::InvalidConfig(
                "players must leave at least one grid cell empty",
            ));
        }

        // One seed drives the coordinator and every agent, so seeded runs
        // replay the same draws for the same request order.
        let seed = self.config.seed.unwrap_or_else(rand::random);
        let config = SimulationConfig {
            seed: Some(seed),
            ..self.config
        };
        info!(
            seed,
            players = self.names.len(),
            grid_size = config.grid_size,
            "Starting simulation"
        );

        let timing = AgentTiming::from(&config);
        let (mut coordinator, handle) = Coordinator::new(config, Referee::new())?;

        let mut agents = JoinSet::new();
        for name in self.names {
            let (id, notices) = coordinator.register_player(name)?;
            let agent_seed = seed.wrapping_add(u64::from(id.0) + 1);
            let agent = PlayerAgent::new(id, notices, handle.clone(), timing, agent_seed);
            agents.spawn(agent.run());
        }
        drop(handle);

        coordinator.ready();
        info!("Activating playing area");
        let coordinator = tokio::spawn(coordinator.run());

        Ok(Simulation {
            coordinator,
            agents,
            seed,
        })
    }
}

/// A running simulation.
pub struct Simulation {
    coordinator: JoinHandle<Result<SimulationOutcome>>,
    agents: JoinSet<Result<()>>,
    seed: u64,
}

impl Simulation {
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Wait for the winner, then for every player task to stop.
    pub async fn wait(mut self) -> Result<SimulationOutcome> {
        let outcome = self.coordinator.await??;

        while let Some(joined) = self.agents.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(error = %err, "Player task ended with an error"),
                Err(err) => warn!(error = %err, "Player task panicked or was cancelled"),
            }
        }
        Ok(outcome)
    }
}
