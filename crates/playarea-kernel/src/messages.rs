//! Messages exchanged between players and the coordinator.
//!
//! Players push [`Request`]s into the coordinator's bounded queue; the
//! coordinator answers each player on its own channel with a [`Notice`].

use crate::direction::Direction;
use crate::grid::Position;
use crate::player::PlayerId;

/// A proposed single-step move. Queued by value and consumed exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRequest {
    pub player: PlayerId,
    pub direction: Direction,
}

/// Everything that travels through the request queue.
///
/// Reinstatement goes through the queue too, so every grid mutation happens
/// inside the coordinator's processing loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Move(MoveRequest),
    /// Sent by a player's reinstatement timer after an eviction
    ReturnToPlay(PlayerId),
}

impl Request {
    pub fn player(&self) -> PlayerId {
        match self {
            Request::Move(request) => request.player,
            Request::ReturnToPlay(player) => *player,
        }
    }
}

/// Outcome notification sent from the coordinator to one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// Start proposing moves from `at`.
    Ready { at: Position },
    /// The move was applied; the player now stands at `at`.
    MoveAccepted { at: Position },
    /// The target was off-grid or occupied; the player stays at `at`.
    MoveRejected { at: Position, direction: Direction },
    /// The player was taken off the grid.
    Evicted { permanent: bool },
    /// The player is back on the grid at `at`.
    Reinstated { at: Position },
    /// The simulation is over; stop every timer.
    Cleanup,
}
