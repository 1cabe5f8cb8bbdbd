//! PlayerAgent: the timer task that drives one player's proposals.
//!
//! Each player runs as a single lightweight tokio task. The task keeps at
//! most one timer armed and at most one request outstanding:
//!
//! - after any verdict it arms the move timer, and when that fires it picks a
//!   direction and submits exactly one move;
//! - after a suspending eviction it arms the one-shot reinstatement timer,
//!   and when that fires it asks to return to play;
//! - `Cleanup`, a permanent eviction, or a closed channel ends the task.

use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace};

use crate::config::SimulationConfig;
use crate::coordinator::CoordinatorHandle;
use crate::error::{KernelError, Result};
use crate::grid::Position;
use crate::messages::Notice;
use crate::player::{choose_direction, PlayerId};

/// Timing and sampling parameters shared by every agent in a run.
#[derive(Debug, Clone, Copy)]
pub struct AgentTiming {
    pub move_delay: Duration,
    pub reinstatement_delay: Duration,
    pub grid_size: usize,
    pub max_direction_attempts: u32,
}

impl From<&SimulationConfig> for AgentTiming {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            move_delay: config.move_delay(),
            reinstatement_delay: config.reinstatement_delay(),
            grid_size: config.grid_size,
            max_direction_attempts: config.max_direction_attempts,
        }
    }
}

/// What an armed timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    Move(Position),
    ReturnToPlay,
}

pub struct PlayerAgent {
    id: PlayerId,
    notices: mpsc::UnboundedReceiver<Notice>,
    coordinator: CoordinatorHandle,
    timing: AgentTiming,
    rng: ChaCha8Rng,
}

impl PlayerAgent {
    pub fn new(
        id: PlayerId,
        notices: mpsc::UnboundedReceiver<Notice>,
        coordinator: CoordinatorHandle,
        timing: AgentTiming,
        seed: u64,
    ) -> Self {
        Self {
            id,
            notices,
            coordinator,
            timing,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Spawn the agent on the current tokio runtime.
    pub fn spawn(self) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run())
    }

    /// Run until the coordinator tells the player to stop.
    pub async fn run(mut self) -> Result<()> {
        let mut armed: Option<(Instant, Timer)> = None;

        loop {
            let notice = match armed {
                None => self.notices.recv().await,
                Some((deadline, timer)) => {
                    tokio::select! {
                        biased;
                        notice = self.notices.recv() => notice,
                        () = sleep_until(deadline) => {
                            armed = None;
                            if !self.fire(timer).await? {
                                break;
                            }
                            continue;
                        }
                    }
                }
            };

            let Some(notice) = notice else {
                trace!(player = %self.id, "Notice channel closed");
                break;
            };

            match notice {
                Notice::Ready { at }
                | Notice::MoveAccepted { at }
                | Notice::MoveRejected { at, .. }
                | Notice::Reinstated { at } => {
                    armed = Some((Instant::now() + self.timing.move_delay, Timer::Move(at)));
                }
                Notice::Evicted { permanent: false } => {
                    debug!(player = %self.id, "Waiting to request reinstatement");
                    armed = Some((
                        Instant::now() + self.timing.reinstatement_delay,
                        Timer::ReturnToPlay,
                    ));
                }
                Notice::Evicted { permanent: true } | Notice::Cleanup => {
                    debug!(player = %self.id, ?notice, "Stopping timers");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Returns false when the coordinator is gone and the task should end.
    async fn fire(&mut self, timer: Timer) -> Result<bool> {
        let submitted = match timer {
            Timer::Move(at) => {
                let direction = choose_direction(
                    &mut self.rng,
                    at,
                    self.timing.grid_size,
                    self.timing.max_direction_attempts,
                )?;
                trace!(player = %self.id, cell = %at, direction = %direction, "Move timer fired");
                self.coordinator.submit_move(self.id, direction).await
            }
            Timer::ReturnToPlay => {
                trace!(player = %self.id, "Reinstatement timer fired");
                self.coordinator.request_return_to_play(self.id).await
            }
        };

        match submitted {
            Ok(()) => Ok(true),
            Err(KernelError::QueueClosed) => {
                debug!(player = %self.id, "Coordinator has shut down");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }
}
