//! Dense hexagonal lattice storage addressed by axial coordinates.

use std::time::Duration;

use hex_outbreak_core::{AxialCoord, BotTier, CellState, RingCount};

/// Storage record for a single lattice site.
///
/// Timers are simulation-clock instants. `fallen_tier` remembers which tier
/// occupied the cell before it became infected so the eventual death can be
/// attributed correctly.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Cell {
    pub(crate) state: CellState,
    pub(crate) masked_since: Option<Duration>,
    pub(crate) immune_until: Option<Duration>,
    pub(crate) fallen_tier: Option<BotTier>,
}

impl Cell {
    pub(crate) fn is_masked(&self) -> bool {
        self.masked_since.is_some()
    }

    pub(crate) fn is_immune(&self, clock: Duration) -> bool {
        self.immune_until.map_or(false, |until| clock < until)
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            state: CellState::Empty,
            masked_since: None,
            immune_until: None,
            fallen_tier: None,
        }
    }
}

/// Dense storage for every cell inside the hexagonal bound.
///
/// Cells live in a single `Vec` ordered column by column; a per-column offset
/// table turns an axial coordinate into its slot arithmetically, so lookups
/// never hash and out-of-range coordinates simply answer `None`.
#[derive(Clone, Debug)]
pub(crate) struct HexGrid {
    rings: RingCount,
    column_starts: Vec<usize>,
    coords: Vec<AxialCoord>,
    cells: Vec<Cell>,
}

impl HexGrid {
    pub(crate) fn new(rings: RingCount) -> Self {
        let mut grid = Self {
            rings,
            column_starts: Vec::new(),
            coords: Vec::new(),
            cells: Vec::new(),
        };
        grid.rebuild(rings);
        grid
    }

    fn rebuild(&mut self, rings: RingCount) {
        self.rings = rings;
        let span = i32::from(rings.get());
        let capacity = rings.cell_capacity() as usize;

        self.column_starts.clear();
        self.coords.clear();
        self.coords.reserve(capacity);
        let mut start = 0usize;
        for q in -span..=span {
            self.column_starts.push(start);
            let r_low = (-span).max(-q - span);
            let r_high = span.min(-q + span);
            for r in r_low..=r_high {
                self.coords.push(AxialCoord::new(q, r));
            }
            start += (r_high - r_low + 1) as usize;
        }

        self.cells.clear();
        self.cells.resize(capacity, Cell::default());
    }

    /// Grows the grid to the provided ring count, carrying every existing
    /// cell (state and timers) forward. Requests at or below the current
    /// ring count are rejected.
    pub(crate) fn grow(&mut self, rings: RingCount) -> bool {
        if rings <= self.rings {
            return false;
        }

        let old_coords = std::mem::take(&mut self.coords);
        let old_cells = std::mem::take(&mut self.cells);
        self.rebuild(rings);
        for (coord, cell) in old_coords.iter().zip(old_cells.iter()) {
            if let Some(slot) = self.index(*coord) {
                self.cells[slot] = *cell;
            }
        }
        true
    }

    pub(crate) fn index(&self, coord: AxialCoord) -> Option<usize> {
        if coord.ring_distance() > u32::from(self.rings.get()) {
            return None;
        }
        let span = i32::from(self.rings.get());
        let column = (coord.q() + span) as usize;
        let r_low = (-span).max(-coord.q() - span);
        let offset = (coord.r() - r_low) as usize;
        Some(self.column_starts[column] + offset)
    }

    pub(crate) fn state(&self, coord: AxialCoord) -> Option<CellState> {
        self.index(coord).map(|slot| self.cells[slot].state)
    }

    pub(crate) fn rings(&self) -> RingCount {
        self.rings
    }

    pub(crate) fn coords(&self) -> &[AxialCoord] {
        &self.coords
    }

    pub(crate) fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }
}

#[cfg(test)]
mod tests {
    use super::{Cell, HexGrid};
    use hex_outbreak_core::{AxialCoord, BotTier, CellState, RingCount};
    use std::time::Duration;

    #[test]
    fn capacity_matches_ring_formula() {
        for rings in [0u8, 1, 2, 5, 64] {
            let rings = RingCount::new(rings);
            let grid = HexGrid::new(rings);
            assert_eq!(grid.cells().len(), rings.cell_capacity() as usize);
            assert_eq!(grid.coords().len(), grid.cells().len());
        }
    }

    #[test]
    fn every_coordinate_round_trips_through_its_slot() {
        let grid = HexGrid::new(RingCount::new(3));
        for (slot, coord) in grid.coords().iter().enumerate() {
            assert!(coord.ring_distance() <= 3);
            assert_eq!(grid.index(*coord), Some(slot));
        }
    }

    #[test]
    fn adjacency_is_symmetric_inside_the_grid() {
        let grid = HexGrid::new(RingCount::new(3));
        for coord in grid.coords() {
            for neighbor in coord.neighbors() {
                if grid.index(neighbor).is_some() {
                    assert!(neighbor.neighbors().contains(coord));
                }
            }
        }
    }

    #[test]
    fn out_of_range_coordinates_answer_none() {
        let grid = HexGrid::new(RingCount::new(2));
        assert_eq!(grid.index(AxialCoord::new(3, 0)), None);
        assert_eq!(grid.index(AxialCoord::new(-2, -1)), None);
        assert_eq!(grid.state(AxialCoord::new(0, 3)), None);
    }

    #[test]
    fn growth_preserves_states_and_timers() {
        let mut grid = HexGrid::new(RingCount::new(1));
        let occupied = AxialCoord::new(1, 0);
        let slot = grid.index(occupied).expect("coord in range");
        grid.cells_mut()[slot] = Cell {
            state: CellState::Occupied(BotTier::ALL[2]),
            masked_since: Some(Duration::from_secs(3)),
            immune_until: None,
            fallen_tier: None,
        };

        assert!(grid.grow(RingCount::new(4)));

        assert_eq!(grid.rings(), RingCount::new(4));
        assert_eq!(grid.cells().len(), RingCount::new(4).cell_capacity() as usize);
        let carried = grid.index(occupied).map(|slot| grid.cells()[slot]);
        let carried = carried.expect("coord still in range");
        assert_eq!(carried.state, CellState::Occupied(BotTier::ALL[2]));
        assert_eq!(carried.masked_since, Some(Duration::from_secs(3)));
        let empty_cells = grid
            .cells()
            .iter()
            .filter(|cell| cell.state == CellState::Empty)
            .count();
        assert_eq!(empty_cells, grid.cells().len() - 1);
    }

    #[test]
    fn growth_rejects_shrink_and_equal_requests() {
        let mut grid = HexGrid::new(RingCount::new(3));
        assert!(!grid.grow(RingCount::new(3)));
        assert!(!grid.grow(RingCount::new(1)));
        assert_eq!(grid.rings(), RingCount::new(3));
    }
}
