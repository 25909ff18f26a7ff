//! Cell occupancy for the airfield.

use serde::{Deserialize, Serialize};

use crate::buildings::{BuildingKind, Footprint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub row: u32,
    pub col: u32,
}

impl Cell {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// Why a footprint cannot be placed. Carries the first offending cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FootprintConflict {
    OutOfBounds(Cell),
    Occupied(Cell),
}

#[derive(Debug, Clone)]
pub struct Grid {
    rows: u32,
    cols: u32,
    cells: Vec<Option<BuildingKind>>,
}

impl Grid {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self {
            rows,
            cols,
            cells: vec![None; rows as usize * cols as usize],
        }
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.row < self.rows && cell.col < self.cols
    }

    /// Building tag at `cell`, `None` when empty or outside the grid.
    pub fn get(&self, cell: Cell) -> Option<BuildingKind> {
        self.index(cell).and_then(|index| self.cells[index])
    }

    pub fn check_footprint(&self, origin: Cell, footprint: Footprint) -> Result<(), FootprintConflict> {
        for cell in footprint.cells(origin) {
            match self.index(cell) {
                None => return Err(FootprintConflict::OutOfBounds(cell)),
                Some(index) if self.cells[index].is_some() => {
                    return Err(FootprintConflict::Occupied(cell))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Tags every cell of the footprint. Callers must run `check_footprint` first.
    pub(crate) fn fill(&mut self, origin: Cell, footprint: Footprint, kind: BuildingKind) {
        for cell in footprint.cells(origin) {
            if let Some(index) = self.index(cell) {
                self.cells[index] = Some(kind);
            }
        }
    }

    pub fn occupied_cells(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        if self.in_bounds(cell) {
            Some(cell.row as usize * self.cols as usize + cell.col as usize)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_report_first_bad_cell() {
        let mut grid = Grid::new(4, 4);
        grid.fill(Cell::new(1, 1), Footprint::square(2), BuildingKind::Cargo);

        assert_eq!(
            grid.check_footprint(Cell::new(0, 0), Footprint::square(2)),
            Err(FootprintConflict::Occupied(Cell::new(1, 1)))
        );
        assert_eq!(
            grid.check_footprint(Cell::new(3, 0), Footprint::square(2)),
            Err(FootprintConflict::OutOfBounds(Cell::new(4, 0)))
        );
        assert!(grid
            .check_footprint(Cell::new(3, 0), Footprint { width: 1, height: 1 })
            .is_ok());
    }

    #[test]
    fn lookups_outside_the_grid_are_empty() {
        let grid = Grid::new(2, 3);
        assert!(grid.get(Cell::new(5, 5)).is_none());
        assert!(!grid.in_bounds(Cell::new(2, 0)));
        assert!(grid.in_bounds(Cell::new(1, 2)));
        assert_eq!(grid.occupied_cells(), 0);
    }
}
