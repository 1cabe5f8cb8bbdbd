//! Error taxonomy for the play area kernel.
//!
//! Rejected and fouled moves are not errors; they are ordinary verdicts and
//! show up as [`Notice`](crate::messages::Notice) values. The variants here
//! cover conditions the coordinator cannot recover from on its own.

use thiserror::Error;

use crate::player::PlayerId;

#[derive(Debug, Error)]
pub enum KernelError {
    /// The request queue is gone: the coordinator has shut down or its
    /// receiver was dropped. Fatal to whoever observes it.
    #[error("request queue is closed")]
    QueueClosed,
    #[error("no empty cell found after {attempts} placement attempts")]
    PlacementExhausted { attempts: u32 },
    #[error("no on-grid direction drawn after {attempts} attempts")]
    DirectionExhausted { attempts: u32 },
    #[error("no players are registered")]
    NoPlayers,
    #[error("unknown player: {0}")]
    UnknownPlayer(PlayerId),
    #[error("illegal placement: {0}")]
    IllegalPlacement(&'static str),
    #[error("illegal move: {0}")]
    IllegalMove(&'static str),
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("simulation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T, E = KernelError> = std::result::Result<T, E>;
