//! PlayArea: the grid, every player, and the registered set.
//!
//! Only the coordinator's processing loop holds a `&mut PlayArea`, which
//! keeps cell occupancy and player positions consistent without locks. The
//! registered set is shared with [`CoordinatorHandle`](crate::CoordinatorHandle)
//! so submitters can drop requests from players that are off the grid, but
//! it is written here and nowhere else.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashSet;
use rand::Rng;
use tracing::{debug, info};

use crate::config::EvictionPolicy;
use crate::direction::Direction;
use crate::error::{KernelError, Result};
use crate::grid::{Grid, Position};
use crate::player::{Player, PlayerId};

pub type Registry = Arc<DashSet<PlayerId>>;

pub struct PlayArea {
    grid: Grid,
    players: BTreeMap<PlayerId, Player>,
    registered: Registry,
    policy: EvictionPolicy,
    next_id: u32,
}

impl PlayArea {
    pub fn new(grid_size: usize, policy: EvictionPolicy) -> Self {
        info!(grid_size, "Initializing the grid");
        Self {
            grid: Grid::new(grid_size),
            players: BTreeMap::new(),
            registered: Arc::new(DashSet::new()),
            policy,
            next_id: 0,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn registry(&self) -> Registry {
        Arc::clone(&self.registered)
    }

    pub fn player(&self, id: PlayerId) -> Result<&Player> {
        self.players.get(&id).ok_or(KernelError::UnknownPlayer(id))
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player> {
        self.players.get_mut(&id).ok_or(KernelError::UnknownPlayer(id))
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn is_registered(&self, id: PlayerId) -> bool {
        self.registered.contains(&id)
    }

    pub fn registered_count(&self) -> usize {
        self.registered.len()
    }

    /// The single registered player, if exactly one remains.
    pub fn sole_registered(&self) -> Option<PlayerId> {
        if self.registered.len() != 1 {
            return None;
        }
        self.registered.iter().next().map(|id| *id)
    }

    /// Create a new dormant player. It is not on the grid until registered.
    pub fn add_player(&mut self, name: impl Into<String>) -> PlayerId {
        let id = PlayerId(self.next_id);
        self.next_id += 1;
        self.players.insert(id, Player::new(id, name, self.policy));
        id
    }

    /// Forget a player that never made it onto the grid.
    pub(crate) fn discard_player(&mut self, id: PlayerId) {
        if !self.is_registered(id) {
            self.players.remove(&id);
        }
    }

    /// Place a player on a uniformly random empty cell.
    ///
    /// Samples (row, column) pairs until an empty cell turns up. Occupancy is
    /// expected to be sparse, so this usually succeeds on the first few
    /// draws; after `max_attempts` misses it fails instead of spinning.
    pub fn register_player<R: Rng + ?Sized>(
        &mut self,
        id: PlayerId,
        rng: &mut R,
        max_attempts: u32,
    ) -> Result<Position> {
        self.player(id)?;
        let size = self.grid.size();
        for _ in 0..max_attempts {
            let position = Position::new(rng.random_range(0..size), rng.random_range(0..size));
            if self.grid.cell(position).is_some_and(|cell| cell.is_empty()) {
                self.register_player_at(id, position)?;
                return Ok(position);
            }
        }
        Err(KernelError::PlacementExhausted {
            attempts: max_attempts,
        })
    }

    /// Place a player on a specific empty cell.
    pub fn register_player_at(&mut self, id: PlayerId, position: Position) -> Result<()> {
        match self.grid.cell(position) {
            None => return Err(KernelError::IllegalPlacement("position is outside the grid")),
            Some(cell) if cell.is_occupied() => {
                return Err(KernelError::IllegalPlacement("position is already occupied"))
            }
            Some(_) => {}
        }

        let player = self.players.get_mut(&id).ok_or(KernelError::UnknownPlayer(id))?;
        if player.is_on_grid() {
            return Err(KernelError::IllegalPlacement("player is already on the grid"));
        }
        if player.eviction_count() > 0 {
            player.reinstate(position);
        } else {
            player.place(position);
        }
        self.grid.place(position, id);
        self.registered.insert(id);
        info!(player = %player, cell = %position, "Registering the player");
        Ok(())
    }

    /// Drop the player from the registered set and clear its cell.
    ///
    /// The player's own position is left alone; deciding whether the player
    /// is dormant belongs to the referee.
    pub fn evict_player(&mut self, id: PlayerId) -> Result<()> {
        let position = self.player(id)?.position();
        self.registered.remove(&id);
        if let Some(position) = position {
            self.grid.vacate(position);
        }
        debug!(player = %id, "Evicted player from the grid");
        Ok(())
    }

    /// Apply a move that the referee already allowed. Returns the new
    /// position.
    pub fn move_player(&mut self, id: PlayerId, direction: Direction) -> Result<Position> {
        let from = self
            .player(id)?
            .position()
            .ok_or(KernelError::IllegalMove("player is not on the grid"))?;
        let to = from
            .step(direction, self.grid.size())
            .ok_or(KernelError::IllegalMove("move leaves the grid"))?;

        self.grid.vacate(from);
        self.grid.place(to, id);
        self.player_mut(id)?.relocate(to);
        Ok(to)
    }
}
