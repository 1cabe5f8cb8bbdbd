//! Player state machine: foul counting, eviction, and reinstatement.
//!
//! ```text
//! Dormant ──register──▶ Active ──foul──▶ Flagged ──foul──▶ Evicted
//!                         ▲                                  │
//!                         └────────reinstate─────────────────┤
//!                                                            ▼
//!                                               PermanentlyRemoved
//! ```
//!
//! The coordinator owns every `Player` and is the only caller of the
//! mutating methods. Each player's timer task only ever sees positions
//! reported back to it through notices.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::EvictionPolicy;
use crate::direction::Direction;
use crate::error::{KernelError, Result};
use crate::grid::Position;

/// Stable player identity, assigned in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    /// Constructed but never placed on the grid
    Dormant,
    Active,
    /// Fouled at least once since the last reinstatement
    Flagged,
    /// Off the grid, waiting for the reinstatement timer
    Evicted,
    /// Off the grid for good
    PermanentlyRemoved,
}

/// What an eviction means for the player's future.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eviction {
    /// The player may ask to return after the reinstatement delay.
    Suspended,
    Permanent,
}

#[derive(Debug, Clone)]
pub struct Player {
    id: PlayerId,
    name: String,
    position: Option<Position>,
    flag_count: u32,
    eviction_count: u32,
    status: PlayerStatus,
    policy: EvictionPolicy,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, policy: EvictionPolicy) -> Self {
        Self {
            id,
            name: name.into(),
            position: None,
            flag_count: 0,
            eviction_count: 0,
            status: PlayerStatus::Dormant,
            policy,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    pub fn flag_count(&self) -> u32 {
        self.flag_count
    }

    pub fn eviction_count(&self) -> u32 {
        self.eviction_count
    }

    pub fn status(&self) -> PlayerStatus {
        self.status
    }

    pub fn is_on_grid(&self) -> bool {
        matches!(self.status, PlayerStatus::Active | PlayerStatus::Flagged)
    }

    /// Record a fouled move. Returns the foul count since the last
    /// reinstatement.
    pub fn flag(&mut self) -> u32 {
        self.flag_count += 1;
        if self.status == PlayerStatus::Active {
            self.status = PlayerStatus::Flagged;
        }
        self.flag_count
    }

    /// True once enough fouls have piled up to evict the player.
    pub fn is_to_be_removed(&self) -> bool {
        self.flag_count >= self.policy.flag_threshold
    }

    pub fn is_permanently_disallowed(&self) -> bool {
        self.eviction_count >= self.policy.permanent_threshold
    }

    /// Take the player off the grid and count the eviction.
    pub fn evict(&mut self) -> Eviction {
        self.eviction_count += 1;
        self.position = None;
        if self.is_permanently_disallowed() {
            self.status = PlayerStatus::PermanentlyRemoved;
            Eviction::Permanent
        } else {
            self.status = PlayerStatus::Evicted;
            Eviction::Suspended
        }
    }

    /// Put the player on the grid for the first time.
    pub(crate) fn place(&mut self, position: Position) {
        self.position = Some(position);
        self.status = PlayerStatus::Active;
    }

    /// Bring an evicted player back. The foul count resets; the eviction
    /// count is kept so a second eviction is permanent.
    pub(crate) fn reinstate(&mut self, position: Position) {
        self.flag_count = 0;
        self.place(position);
    }

    pub(crate) fn relocate(&mut self, position: Position) {
        self.position = Some(position);
    }

    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            id: self.id,
            name: self.name.clone(),
            status: self.status,
            position: self.position,
            flag_count: self.flag_count,
            eviction_count: self.eviction_count,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Serializable snapshot of a player at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub status: PlayerStatus,
    pub position: Option<Position>,
    pub flag_count: u32,
    pub eviction_count: u32,
}

/// Pick a direction uniformly among those that stay on a `grid_size` grid.
///
/// Draws from all four directions and redraws whenever the step would leave
/// the grid, so corners exclude two directions and edges one. Gives up with
/// [`KernelError::DirectionExhausted`] after `max_attempts` draws.
pub fn choose_direction<R: Rng + ?Sized>(
    rng: &mut R,
    position: Position,
    grid_size: usize,
    max_attempts: u32,
) -> Result<Direction> {
    for _ in 0..max_attempts {
        let direction = Direction::ALL[rng.random_range(0..Direction::ALL.len())];
        if position.step(direction, grid_size).is_some() {
            return Ok(direction);
        }
    }
    Err(KernelError::DirectionExhausted {
        attempts: max_attempts,
    })
}
