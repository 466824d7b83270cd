use serde::{Deserialize, Serialize};

use crate::level::LoadError;

/// Static terrain. Crates are entity state (see `EntityRegistry`), never terrain.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    Wall,
    Destination,
}

/// A cell address, row-major and 0-indexed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub row: usize,
    pub col: usize,
}

impl Point {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("point ({row}, {col}) is outside the board")]
    OutOfBounds { row: usize, col: usize },
}

/// Immutable terrain grid. The only write path is construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Board {
    rows: usize,
    cols: usize,
    cells: Box<[Cell]>,
}

impl Board {
    /// Builds a board from row-major cells. Both dimensions must be positive and
    /// `cells.len()` must equal `rows * cols`.
    pub fn new(rows: usize, cols: usize, cells: Vec<Cell>) -> Result<Self, LoadError> {
        if rows == 0 || cols == 0 {
            return Err(LoadError::MalformedDimensions(format!("{rows}x{cols} board has no cells")));
        }
        let area = rows
            .checked_mul(cols)
            .ok_or_else(|| LoadError::MalformedDimensions(format!("{rows}x{cols} board is too large")))?;
        if cells.len() != area {
            return Err(LoadError::MalformedDimensions(format!(
                "{rows}x{cols} board given {} cells",
                cells.len()
            )));
        }
        Ok(Self { rows, cols, cells: cells.into_boxed_slice() })
    }

    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        p.row < self.rows && p.col < self.cols
    }

    pub fn cell_at(&self, p: Point) -> Result<Cell, BoardError> {
        if !self.contains(p) {
            return Err(BoardError::OutOfBounds { row: p.row, col: p.col });
        }
        Ok(self.cell(p))
    }

    /// Unchecked lookup for points already known to be on the board.
    #[inline]
    pub(crate) fn cell(&self, p: Point) -> Cell {
        self.cells[p.row * self.cols + p.col]
    }

    #[inline]
    pub fn is_wall(&self, p: Point) -> bool {
        matches!(self.cell_at(p), Ok(Cell::Wall))
    }

    /// Nearest on-board point to a possibly off-board signed coordinate.
    pub fn clamp(&self, row: isize, col: isize) -> Point {
        let clamp_axis = |v: isize, len: usize| -> usize { v.clamp(0, len as isize - 1) as usize };
        Point { row: clamp_axis(row, self.rows), col: clamp_axis(col, self.cols) }
    }

    /// Every point in row-major order.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| Point { row, col }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(rows: usize, cols: usize) -> Board {
        let mut cells = vec![Cell::Empty; rows * cols];
        for row in 0..rows {
            for col in 0..cols {
                if row == 0 || col == 0 || row == rows - 1 || col == cols - 1 {
                    cells[row * cols + col] = Cell::Wall;
                }
            }
        }
        Board::new(rows, cols, cells).unwrap()
    }

    #[test]
    fn rejects_degenerate_dimensions() {
        assert!(matches!(Board::new(0, 3, vec![]), Err(LoadError::MalformedDimensions(_))));
        assert!(matches!(Board::new(2, 2, vec![Cell::Empty; 3]), Err(LoadError::MalformedDimensions(_))));
        assert!(matches!(Board::new(usize::MAX, 2, vec![]), Err(LoadError::MalformedDimensions(_))));
    }

    #[test]
    fn cell_at_reports_out_of_bounds() {
        let b = ring(3, 4);
        assert_eq!(b.dimensions(), (3, 4));
        assert_eq!(b.cell_at(Point::new(1, 1)), Ok(Cell::Empty));
        assert_eq!(b.cell_at(Point::new(0, 2)), Ok(Cell::Wall));
        assert_eq!(b.cell_at(Point::new(3, 0)), Err(BoardError::OutOfBounds { row: 3, col: 0 }));
        assert_eq!(b.cell_at(Point::new(0, 4)), Err(BoardError::OutOfBounds { row: 0, col: 4 }));
    }

    #[test]
    fn clamp_pins_to_nearest_edge() {
        let b = ring(3, 4);
        assert_eq!(b.clamp(-1, 2), Point::new(0, 2));
        assert_eq!(b.clamp(1, 9), Point::new(1, 3));
        assert_eq!(b.clamp(5, -5), Point::new(2, 0));
        assert_eq!(b.clamp(1, 1), Point::new(1, 1));
    }
}
