use serde::{Deserialize, Serialize};

/// Raster cell address as `(row, col)`.
pub type Cell = (usize, usize);

/// A fixed-size 2D raster stored row-major.
///
/// Indexed by `(row, col)` within `[0, rows) × [0, cols)`. Every per-cell field
/// of the simulation (elevation, net cost, accumulated cost, backlinks, ground
/// potential, path counts) is a `Grid` of the same shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid<T> {
    pub rows: usize,
    pub cols: usize,
    /// Row-major cell values, `rows * cols` long.
    pub data: Vec<T>,
}

impl<T: Copy> Grid<T> {
    /// Create a new grid filled with the given value.
    pub fn new(rows: usize, cols: usize, fill: T) -> Self {
        Self {
            rows,
            cols,
            data: vec![fill; rows * cols],
        }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: T) {
        self.data[row * self.cols + col] = val;
    }

    #[inline]
    pub fn at(&self, cell: Cell) -> T {
        self.get(cell.0, cell.1)
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn same_shape<U>(&self, other: &Grid<U>) -> bool {
        self.rows == other.rows && self.cols == other.cols
    }

    /// True if the cell lies inside the grid.
    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        cell.0 < self.rows && cell.1 < self.cols
    }

    /// Offset `cell` by `(dr, dc)`; None if the result leaves the grid.
    #[inline]
    pub fn offset(&self, cell: Cell, dr: isize, dc: isize) -> Option<Cell> {
        let r = cell.0.checked_add_signed(dr)?;
        let c = cell.1.checked_add_signed(dc)?;
        self.contains((r, c)).then_some((r, c))
    }

    /// Apply `f` to every cell, producing a grid of the same shape.
    pub fn map<U, F: FnMut(T) -> U>(&self, f: F) -> Grid<U> {
        Grid {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().copied().map(f).collect(),
        }
    }
}

impl Grid<f64> {
    pub fn min_value(&self) -> f64 {
        self.data.iter().cloned().fold(f64::INFINITY, f64::min)
    }

    pub fn max_value(&self) -> f64 {
        self.data.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    }
}
