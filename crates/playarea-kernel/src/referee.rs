//! Referee: the legality and foul rules.
//!
//! The decision functions are pure reads of the grid. The two orchestration
//! calls (`flag_player`, `request_return_to_play`) mutate state, but only
//! through the `&mut PlayArea` lent to them by the coordinator's loop.

use rand::Rng;
use tracing::info;

use crate::direction::Direction;
use crate::error::Result;
use crate::grid::{Cell, Grid, Position};
use crate::play_area::PlayArea;
use crate::player::{Eviction, Player, PlayerId, PlayerStatus};

#[derive(Debug, Clone, Copy, Default)]
pub struct Referee;

impl Referee {
    pub fn new() -> Self {
        Self
    }

    /// True iff the target cell exists and nobody stands on it.
    pub fn move_is_allowed(&self, grid: &Grid, player: &Player, direction: Direction) -> bool {
        player
            .position()
            .and_then(|from| grid.neighbor(from, direction))
            .is_some_and(Cell::is_empty)
    }

    /// True iff the target cell is off the grid, or every neighbour of the
    /// target is occupied or off the grid.
    ///
    /// The mover still stands on its source cell while this is evaluated, so
    /// the source always counts as occupied.
    pub fn move_is_fouled(&self, grid: &Grid, player: &Player, direction: Direction) -> bool {
        match player.position().and_then(|from| grid.neighbor(from, direction)) {
            None => true,
            Some(target) => self.is_surrounded(grid, target.position()),
        }
    }

    /// Every neighbour slot of `position` is occupied or missing.
    pub fn is_surrounded(&self, grid: &Grid, position: Position) -> bool {
        grid.neighbors(position)
            .all(|(_, cell)| cell.is_none_or(Cell::is_occupied))
    }

    /// Evict a player that crossed the foul threshold.
    pub fn flag_player(&self, area: &mut PlayArea, id: PlayerId) -> Result<Eviction> {
        area.evict_player(id)?;
        let player = area.player_mut(id)?;
        let eviction = player.evict();
        info!(
            player = %player,
            evictions = player.eviction_count(),
            permanent = eviction == Eviction::Permanent,
            "Player evicted"
        );
        Ok(eviction)
    }

    /// Handle a reinstatement request. Returns the new position, or `None`
    /// when the player may not come back.
    pub fn request_return_to_play<R: Rng + ?Sized>(
        &self,
        area: &mut PlayArea,
        id: PlayerId,
        rng: &mut R,
        max_attempts: u32,
    ) -> Result<Option<Position>> {
        let player = area.player(id)?;
        if player.is_permanently_disallowed() || player.status() != PlayerStatus::Evicted {
            info!(player = %player, status = ?player.status(), "Return to play denied");
            return Ok(None);
        }
        let position = area.register_player(id, rng, max_attempts)?;
        info!(player = %id, cell = %position, "Player reinstated");
        Ok(Some(position))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::config::EvictionPolicy;

    fn area_with(size: usize, positions: &[(usize, usize)]) -> (PlayArea, Vec<PlayerId>) {
        let mut area = PlayArea::new(size, EvictionPolicy::default());
        let ids = positions
            .iter()
            .enumerate()
            .map(|(i, (row, column))| {
                let id = area.add_player(format!("Jhon{i}"));
                area.register_player_at(id, Position::new(*row, *column)).unwrap();
                id
            })
            .collect();
        (area, ids)
    }

    #[test]
    fn test_move_is_allowed_only_onto_empty_cells() {
        let (area, ids) = area_with(4, &[(0, 0), (0, 1)]);
        let referee = Referee::new();
        let mover = area.player(ids[0]).unwrap();

        assert!(!referee.move_is_allowed(area.grid(), mover, Direction::Right));
        assert!(!referee.move_is_allowed(area.grid(), mover, Direction::Left));
        assert!(!referee.move_is_allowed(area.grid(), mover, Direction::Top));
        assert!(referee.move_is_allowed(area.grid(), mover, Direction::Bottom));
    }

    #[test]
    fn test_off_grid_move_is_fouled() {
        let (area, ids) = area_with(4, &[(0, 0)]);
        let referee = Referee::new();
        let mover = area.player(ids[0]).unwrap();
        assert!(referee.move_is_fouled(area.grid(), mover, Direction::Left));
        assert!(referee.move_is_fouled(area.grid(), mover, Direction::Top));
    }

    #[test]
    fn test_congested_destination_is_fouled() {
        // Target (0,0): left/top off-grid, right is the mover, bottom occupied.
        let (area, ids) = area_with(4, &[(0, 1), (1, 0)]);
        let referee = Referee::new();
        let mover = area.player(ids[0]).unwrap();
        assert!(referee.move_is_allowed(area.grid(), mover, Direction::Left));
        assert!(referee.move_is_fouled(area.grid(), mover, Direction::Left));

        // Target (1,1) still has empty neighbours.
        assert!(!referee.move_is_fouled(area.grid(), mover, Direction::Bottom));
    }

    #[test]
    fn test_interior_destination_needs_four_occupied_neighbours() {
        let (area, ids) = area_with(5, &[(2, 1), (1, 2), (2, 3), (3, 2)]);
        let referee = Referee::new();
        assert!(referee.is_surrounded(area.grid(), Position::new(2, 2)));

        let mover = area.player(ids[0]).unwrap();
        assert!(referee.move_is_fouled(area.grid(), mover, Direction::Right));
        assert!(!referee.move_is_fouled(area.grid(), mover, Direction::Left));
    }

    #[test]
    fn test_flag_then_return_to_play() {
        let (mut area, ids) = area_with(4, &[(0, 0), (3, 3)]);
        let referee = Referee::new();
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        assert_eq!(referee.flag_player(&mut area, ids[0]).unwrap(), Eviction::Suspended);
        assert!(!area.is_registered(ids[0]));
        assert!(area.grid().cell(Position::new(0, 0)).unwrap().is_empty());
        assert_eq!(area.player(ids[0]).unwrap().status(), PlayerStatus::Evicted);

        let position = referee
            .request_return_to_play(&mut area, ids[0], &mut rng, 1000)
            .unwrap()
            .unwrap();
        assert!(area.is_registered(ids[0]));
        assert_eq!(area.grid().cell(position).unwrap().occupant(), Some(ids[0]));
        assert_eq!(area.player(ids[0]).unwrap().eviction_count(), 1);
        assert_eq!(area.player(ids[0]).unwrap().flag_count(), 0);
    }

    #[test]
    fn test_second_eviction_denies_return() {
        let (mut area, ids) = area_with(4, &[(0, 0), (3, 3)]);
        let referee = Referee::new();
        let mut rng = ChaCha8Rng::seed_from_u64(12);

        referee.flag_player(&mut area, ids[0]).unwrap();
        referee
            .request_return_to_play(&mut area, ids[0], &mut rng, 1000)
            .unwrap();
        assert_eq!(referee.flag_player(&mut area, ids[0]).unwrap(), Eviction::Permanent);

        let returned = referee
            .request_return_to_play(&mut area, ids[0], &mut rng, 1000)
            .unwrap();
        assert_eq!(returned, None);
        assert!(!area.is_registered(ids[0]));
        assert_eq!(
            area.player(ids[0]).unwrap().status(),
            PlayerStatus::PermanentlyRemoved
        );
    }

    #[test]
    fn test_active_player_cannot_request_return() {
        let (mut area, ids) = area_with(4, &[(1, 1)]);
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let returned = Referee::new()
            .request_return_to_play(&mut area, ids[0], &mut rng, 1000)
            .unwrap();
        assert_eq!(returned, None);
        assert_eq!(area.player(ids[0]).unwrap().position(), Some(Position::new(1, 1)));
    }
}
