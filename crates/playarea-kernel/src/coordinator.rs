//! Coordinator: the single consumer of move requests.
//!
//! ```text
//! PlayerAgent ─submit_move──▶ [bounded FIFO] ──▶ Coordinator::step
//!                                                 ├─ Referee::move_is_allowed
//!                                                 ├─ Referee::move_is_fouled → Player::flag
//!                                                 ├─ PlayArea::move_player
//!                                                 ├─ Referee::flag_player (threshold)
//!                                                 └─ Notice ──▶ PlayerAgent
//! ```
//!
//! Requests are applied strictly in arrival order. All grid and player
//! mutation happens inside `step`, so nothing else needs a lock.

use std::collections::HashMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::config::SimulationConfig;
use crate::direction::Direction;
use crate::error::{KernelError, Result};
use crate::grid::Position;
use crate::messages::{MoveRequest, Notice, Request};
use crate::play_area::{PlayArea, Registry};
use crate::player::{Eviction, PlayerId, PlayerSummary};
use crate::referee::Referee;

/// Counters accumulated by the processing loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorStats {
    /// Requests taken off the queue
    pub processed: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub fouls: u64,
    pub evictions: u64,
    pub permanent_removals: u64,
    pub reinstatements: u64,
    /// Requests from players that were no longer registered when dequeued
    pub ignored: u64,
    /// Requests still queued when the simulation ended
    pub drained: u64,
}

/// Final result of a simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub winner: PlayerSummary,
    pub stats: CoordinatorStats,
    pub players: Vec<PlayerSummary>,
}

/// Submitting side of the request queue. Cheap to clone; one per player.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    requests: mpsc::Sender<Request>,
    registered: Registry,
}

impl CoordinatorHandle {
    pub(crate) fn new(requests: mpsc::Sender<Request>, registered: Registry) -> Self {
        Self {
            requests,
            registered,
        }
    }

    /// Queue a move for `player`.
    ///
    /// Waits for capacity when the queue is full; waiting callers are served
    /// in the order they arrived. Moves from unregistered players are dropped
    /// without a reply.
    pub async fn submit_move(&self, player: PlayerId, direction: Direction) -> Result<()> {
        if !self.registered.contains(&player) {
            trace!(player = %player, direction = %direction, "Dropping move from unregistered player");
            return Ok(());
        }
        self.requests
            .send(Request::Move(MoveRequest { player, direction }))
            .await
            .map_err(|_| KernelError::QueueClosed)
    }

    /// Ask the referee, through the queue, to put an evicted player back.
    pub async fn request_return_to_play(&self, player: PlayerId) -> Result<()> {
        self.requests
            .send(Request::ReturnToPlay(player))
            .await
            .map_err(|_| KernelError::QueueClosed)
    }

    pub fn is_registered(&self, player: PlayerId) -> bool {
        self.registered.contains(&player)
    }
}

pub struct Coordinator {
    config: SimulationConfig,
    area: PlayArea,
    referee: Referee,
    requests: mpsc::Receiver<Request>,
    notices: HashMap<PlayerId, mpsc::UnboundedSender<Notice>>,
    rng: ChaCha8Rng,
    stats: CoordinatorStats,
}

impl Coordinator {
    /// Build a coordinator and the handle players submit through.
    pub fn new(config: SimulationConfig, referee: Referee) -> Result<(Self, CoordinatorHandle)> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(rand::random);
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let area = PlayArea::new(config.grid_size, config.eviction);
        let handle = CoordinatorHandle::new(tx, area.registry());

        let coordinator = Self {
            config,
            area,
            referee,
            requests: rx,
            notices: HashMap::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            stats: CoordinatorStats::default(),
        };
        Ok((coordinator, handle))
    }

    pub fn area(&self) -> &PlayArea {
        &self.area
    }

    pub fn stats(&self) -> &CoordinatorStats {
        &self.stats
    }

    /// Register a new player on a random empty cell. Returns its id and the
    /// receiver its timer task listens on.
    pub fn register_player(
        &mut self,
        name: impl Into<String>,
    ) -> Result<(PlayerId, mpsc::UnboundedReceiver<Notice>)> {
        let id = self.area.add_player(name);
        let max_attempts = self.config.max_placement_attempts;
        if let Err(err) = self.area.register_player(id, &mut self.rng, max_attempts) {
            self.area.discard_player(id);
            return Err(err);
        }
        Ok((id, self.attach(id)))
    }

    /// Register a new player on a chosen empty cell.
    pub fn register_player_at(
        &mut self,
        name: impl Into<String>,
        position: Position,
    ) -> Result<(PlayerId, mpsc::UnboundedReceiver<Notice>)> {
        let id = self.area.add_player(name);
        if let Err(err) = self.area.register_player_at(id, position) {
            self.area.discard_player(id);
            return Err(err);
        }
        Ok((id, self.attach(id)))
    }

    /// Remove a player from the registered set and clear its cell.
    pub fn evict_player(&mut self, id: PlayerId) -> Result<()> {
        self.area.evict_player(id)
    }

    /// Tell every registered player to start proposing moves.
    pub fn ready(&self) {
        info!("Initializing players");
        for player in self.area.players().filter(|p| self.area.is_registered(p.id())) {
            if let Some(at) = player.position() {
                self.notify(player.id(), Notice::Ready { at });
            }
        }
    }

    /// Process requests until one registered player remains.
    pub async fn run(mut self) -> Result<SimulationOutcome> {
        info!(players = self.area.registered_count(), "Handling requests");
        if self.area.registered_count() <= 1 {
            return self.finish();
        }
        loop {
            if let Some(outcome) = self.step().await? {
                return Ok(outcome);
            }
        }
    }

    /// Take one request off the queue and apply it. Returns the outcome when
    /// this request left a single registered player.
    pub async fn step(&mut self) -> Result<Option<SimulationOutcome>> {
        let request = self.requests.recv().await.ok_or(KernelError::QueueClosed)?;
        self.stats.processed += 1;

        match request {
            Request::Move(request) => self.handle_move(request)?,
            Request::ReturnToPlay(player) => self.handle_return_to_play(player)?,
        }

        debug!(registered = self.area.registered_count(), "Players in the system");
        if self.area.registered_count() <= 1 {
            return self.finish().map(Some);
        }
        Ok(None)
    }

    fn handle_move(&mut self, request: MoveRequest) -> Result<()> {
        let MoveRequest { player: id, direction } = request;
        if !self.area.is_registered(id) {
            self.stats.ignored += 1;
            debug!(player = %id, direction = %direction, "Ignoring move from unregistered player");
            return Ok(());
        }

        let player = self.area.player(id)?;
        debug!(player = %player, direction = %direction, "Move request");
        let grid = self.area.grid();

        if !self.referee.move_is_allowed(grid, player, direction) {
            self.stats.rejected += 1;
            if let Some(at) = player.position() {
                debug!(player = %id, direction = %direction, "Move rejected");
                self.notify(id, Notice::MoveRejected { at, direction });
            }
            return Ok(());
        }

        let fouled = self.referee.move_is_fouled(grid, player, direction);
        let mut remove = false;
        if fouled {
            self.stats.fouls += 1;
            let player = self.area.player_mut(id)?;
            let fouls = player.flag();
            remove = player.is_to_be_removed();
            info!(player = %id, fouls, "Move is fouled");
        }

        let at = self.area.move_player(id, direction)?;
        self.stats.accepted += 1;

        if remove {
            let eviction = self.referee.flag_player(&mut self.area, id)?;
            self.stats.evictions += 1;
            let permanent = eviction == Eviction::Permanent;
            if permanent {
                self.stats.permanent_removals += 1;
            }
            self.notify(id, Notice::Evicted { permanent });
        } else {
            self.notify(id, Notice::MoveAccepted { at });
        }
        Ok(())
    }

    fn handle_return_to_play(&mut self, id: PlayerId) -> Result<()> {
        let max_attempts = self.config.max_placement_attempts;
        match self
            .referee
            .request_return_to_play(&mut self.area, id, &mut self.rng, max_attempts)?
        {
            Some(at) => {
                self.stats.reinstatements += 1;
                self.notify(id, Notice::Reinstated { at });
            }
            None => self.notify(id, Notice::Cleanup),
        }
        Ok(())
    }

    /// Drain the queue, stop every player, and report the winner.
    fn finish(&mut self) -> Result<SimulationOutcome> {
        let winner = self.area.sole_registered().ok_or(KernelError::NoPlayers)?;

        self.requests.close();
        while let Ok(request) = self.requests.try_recv() {
            self.stats.drained += 1;
            trace!(player = %request.player(), "Drained pending request");
        }
        if self.stats.drained > 0 {
            warn!(drained = self.stats.drained, "Discarded pending requests at shutdown");
        }

        for id in self.notices.keys() {
            self.notify(*id, Notice::Cleanup);
        }

        let winner = self.area.player(winner)?.summary();
        info!(winner = %winner.name, processed = self.stats.processed, "{} won!", winner.name);
        Ok(SimulationOutcome {
            winner,
            stats: self.stats.clone(),
            players: self.area.players().map(|p| p.summary()).collect(),
        })
    }

    fn attach(&mut self, id: PlayerId) -> mpsc::UnboundedReceiver<Notice> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.notices.insert(id, tx);
        rx
    }

    fn notify(&self, id: PlayerId, notice: Notice) {
        let delivered = self
            .notices
            .get(&id)
            .is_some_and(|tx| tx.send(notice).is_ok());
        if !delivered {
            trace!(player = %id, ?notice, "Player is no longer listening");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PlayerStatus;

    fn config(grid_size: usize) -> SimulationConfig {
        SimulationConfig {
            grid_size,
            queue_capacity: 8,
            seed: Some(7),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_unregistered_submission_is_not_queued() {
        let (mut coordinator, handle) = Coordinator::new(config(4), Referee::new()).unwrap();
        let (a, _rx_a) = coordinator.register_player_at("a", Position::new(0, 0)).unwrap();
        let (_b, _rx_b) = coordinator.register_player_at("b", Position::new(3, 3)).unwrap();

        coordinator.evict_player(a).unwrap();
        assert!(!handle.is_registered(a));
        handle.submit_move(a, Direction::Right).await.unwrap();
        assert!(coordinator.requests.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_rejected_move_notifies_player() {
        let (mut coordinator, handle) = Coordinator::new(config(4), Referee::new()).unwrap();
        let (a, mut rx_a) = coordinator.register_player_at("a", Position::new(0, 0)).unwrap();
        let (_b, _rx_b) = coordinator.register_player_at("b", Position::new(0, 1)).unwrap();

        handle.submit_move(a, Direction::Right).await.unwrap();
        assert_eq!(coordinator.step().await.unwrap(), None);
        assert_eq!(
            rx_a.try_recv().unwrap(),
            Notice::MoveRejected {
                at: Position::new(0, 0),
                direction: Direction::Right
            }
        );
        assert_eq!(coordinator.stats().rejected, 1);
    }

    #[tokio::test]
    async fn test_move_after_eviction_is_ignored_at_dequeue() {
        let (mut coordinator, handle) = Coordinator::new(config(4), Referee::new()).unwrap();
        let (a, _rx_a) = coordinator.register_player_at("a", Position::new(0, 0)).unwrap();
        let (_b, _rx_b) = coordinator.register_player_at("b", Position::new(2, 2)).unwrap();
        let (_c, _rx_c) = coordinator.register_player_at("c", Position::new(3, 3)).unwrap();

        handle.submit_move(a, Direction::Right).await.unwrap();
        coordinator.evict_player(a).unwrap();
        assert_eq!(coordinator.step().await.unwrap(), None);
        assert_eq!(coordinator.stats().ignored, 1);
        assert!(coordinator.area().grid().cell(Position::new(0, 1)).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_registration_leaves_no_player_behind() {
        let config = SimulationConfig {
            max_placement_attempts: 50,
            ..config(2)
        };
        let (mut coordinator, _handle) = Coordinator::new(config, Referee::new()).unwrap();
        let (a, _rx_a) = coordinator.register_player_at("a", Position::new(0, 0)).unwrap();

        assert!(matches!(
            coordinator.register_player_at("b", Position::new(0, 0)),
            Err(KernelError::IllegalPlacement(_))
        ));
        assert!(coordinator.register_player_at("b", Position::new(2, 0)).is_err());

        let mut receivers = Vec::new();
        for name in ["c", "d", "e"] {
            receivers.push(coordinator.register_player(name).unwrap());
        }
        assert!(matches!(
            coordinator.register_player("overflow"),
            Err(KernelError::PlacementExhausted { attempts: 50 })
        ));

        let names: Vec<_> = coordinator.area().players().map(|p| p.name().to_string()).collect();
        assert_eq!(names, vec!["a", "c", "d", "e"]);
        assert!(coordinator
            .area()
            .players()
            .all(|p| p.status() != PlayerStatus::Dormant));
        assert_eq!(coordinator.notices.len(), 4);
        assert!(coordinator.notices.contains_key(&a));
    }

    #[tokio::test]
    async fn test_single_player_wins_immediately() {
        let (mut coordinator, _handle) = Coordinator::new(config(4), Referee::new()).unwrap();
        let (_a, mut rx_a) = coordinator.register_player("solo").unwrap();

        let outcome = coordinator.run().await.unwrap();
        assert_eq!(outcome.winner.name, "solo");
        assert_eq!(outcome.stats.processed, 0);
        assert_eq!(rx_a.try_recv().unwrap(), Notice::Cleanup);
    }

    #[tokio::test]
    async fn test_empty_play_area_has_no_winner() {
        let (coordinator, _handle) = Coordinator::new(config(4), Referee::new()).unwrap();
        assert!(matches!(coordinator.run().await, Err(KernelError::NoPlayers)));
    }

    #[tokio::test]
    async fn test_closed_queue_is_fatal() {
        let (mut coordinator, handle) = Coordinator::new(config(4), Referee::new()).unwrap();
        let (_a, _rx_a) = coordinator.register_player("a").unwrap();
        let (_b, _rx_b) = coordinator.register_player("b").unwrap();
        drop(handle);
        assert!(matches!(coordinator.run().await, Err(KernelError::QueueClosed)));
    }

    #[tokio::test]
    async fn test_ready_notifies_registered_players() {
        let (mut coordinator, _handle) = Coordinator::new(config(4), Referee::new()).unwrap();
        let (_a, mut rx_a) = coordinator.register_player_at("a", Position::new(1, 2)).unwrap();
        coordinator.ready();
        assert_eq!(rx_a.try_recv().unwrap(), Notice::Ready { at: Position::new(1, 2) });
    }
}
