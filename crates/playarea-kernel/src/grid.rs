//! Grid and cell types: the fixed square matrix players move across.
//!
//! Cells never store links to their neighbours. Adjacency and boundary
//! classification are computed from coordinates against the grid size, so an
//! out-of-range lookup is an ordinary `None` rather than an error.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::direction::Direction;
use crate::player::PlayerId;

/// Zero-indexed (row, column) coordinate of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub column: usize,
}

impl Position {
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }

    /// The position one step away in `direction`, or `None` when that step
    /// leaves a grid of `size` × `size` cells.
    pub fn step(self, direction: Direction, size: usize) -> Option<Position> {
        let (dr, dc) = direction.offset();
        let row = self.row.checked_add_signed(dr)?;
        let column = self.column.checked_add_signed(dc)?;
        (row < size && column < size).then_some(Position { row, column })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// Where a cell sits relative to the grid border.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Touches two sides; two directions lead off the grid.
    Corner,
    /// Touches exactly one side, named by the direction that leads off it.
    Edge(Direction),
    Interior,
}

/// A single grid location holding at most one player.
#[derive(Debug, Clone)]
pub struct Cell {
    position: Position,
    occupant: Option<PlayerId>,
}

impl Cell {
    fn new(position: Position) -> Self {
        Self {
            position,
            occupant: None,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn row(&self) -> usize {
        self.position.row
    }

    pub fn column(&self) -> usize {
        self.position.column
    }

    pub fn occupant(&self) -> Option<PlayerId> {
        self.occupant
    }

    pub fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.occupant.is_none()
    }
}

/// Fixed `size` × `size` matrix of cells.
///
/// The set of cells is immutable after construction; only occupancy changes,
/// and only through the crate-private `place`/`vacate` used by the play area.
#[derive(Debug, Clone)]
pub struct Grid {
    size: usize,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(size: usize) -> Self {
        let cells = (0..size)
            .flat_map(|row| (0..size).map(move |column| Cell::new(Position::new(row, column))))
            .collect();
        Self { size, cells }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Look up a cell by signed coordinates. Anything outside `[0, size)`
    /// yields `None`.
    pub fn cell_at(&self, row: isize, column: isize) -> Option<&Cell> {
        let row = usize::try_from(row).ok()?;
        let column = usize::try_from(column).ok()?;
        self.cell(Position::new(row, column))
    }

    pub fn cell(&self, position: Position) -> Option<&Cell> {
        self.index(position).map(|idx| &self.cells[idx])
    }

    /// The adjacent cell in `direction`, or `None` at the border.
    pub fn neighbor(&self, position: Position, direction: Direction) -> Option<&Cell> {
        position
            .step(direction, self.size)
            .and_then(|target| self.cell(target))
    }

    /// All four neighbour slots of `position`, missing ones included.
    pub fn neighbors(&self, position: Position) -> impl Iterator<Item = (Direction, Option<&Cell>)> {
        Direction::ALL
            .into_iter()
            .map(move |direction| (direction, self.neighbor(position, direction)))
    }

    pub fn is_corner(&self, position: Position) -> bool {
        matches!(self.boundary(position), Boundary::Corner)
    }

    /// True when `position` lies on the border that `side` walks off of.
    pub fn is_edge(&self, position: Position, side: Direction) -> bool {
        self.contains(position) && position.step(side, self.size).is_none()
    }

    pub fn boundary(&self, position: Position) -> Boundary {
        let mut sides = Direction::ALL
            .into_iter()
            .filter(|side| self.is_edge(position, *side));
        match (sides.next(), sides.next()) {
            (None, _) => Boundary::Interior,
            (Some(side), None) => Boundary::Edge(side),
            (Some(_), Some(_)) => Boundary::Corner,
        }
    }

    pub fn contains(&self, position: Position) -> bool {
        position.row < self.size && position.column < self.size
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_occupied()).count()
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    pub(crate) fn place(&mut self, position: Position, player: PlayerId) -> bool {
        match self.index(position) {
            Some(idx) => {
                self.cells[idx].occupant = Some(player);
                true
            }
            None => false,
        }
    }

    pub(crate) fn vacate(&mut self, position: Position) -> Option<PlayerId> {
        let idx = self.index(position)?;
        self.cells[idx].occupant.take()
    }

    fn index(&self, position: Position) -> Option<usize> {
        self.contains(position)
            .then(|| position.row * self.size + position.column)
    }
}
