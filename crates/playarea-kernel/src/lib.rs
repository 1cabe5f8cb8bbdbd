//! Play area kernel: players on a square grid, one coordinator, one referee.
//!
//! Players propose single-step moves on their own timers. A single
//! coordinator task applies them in arrival order, asking the referee whether
//! each move is legal and whether it is fouled. Players that foul too often
//! are evicted and may later return; the run ends when one player is left.

pub mod agent;
pub mod config;
pub mod coordinator;
pub mod direction;
pub mod error;
pub mod grid;
pub mod messages;
pub mod play_area;
pub mod player;
pub mod referee;
pub mod simulation;

pub use agent::{AgentTiming, PlayerAgent};
pub use config::{EvictionPolicy, SimulationConfig};
pub use coordinator::{Coordinator, CoordinatorHandle, CoordinatorStats, SimulationOutcome};
pub use direction::Direction;
pub use error::KernelError;
pub use grid::{Boundary, Cell, Grid, Position};
pub use messages::{MoveRequest, Notice, Request};
pub use play_area::PlayArea;
pub use player::{choose_direction, Eviction, Player, PlayerId, PlayerStatus, PlayerSummary};
pub use referee::Referee;
pub use simulation::{Simulation, SimulationBuilder};
