// src/scalar_field.rs

use crate::grid::Grid;

/// Scalar samples on an N-dimensional grid, one per cell.
///
/// With the default `T = f64` this is the level-set function φ the evolution
/// engine works on; other element types appear at the persisted-volume boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField<T = f64> {
    pub grid: Grid,
    pub data: Vec<T>,
}

impl<T: Copy + Default> ScalarField<T> {
    /// Create a new field on the given grid, filled with `T::default()`.
    pub fn new(grid: Grid) -> Self {
        let n = grid.n_cells();
        Self {
            grid,
            data: vec![T::default(); n],
        }
    }
}

impl<T: Copy> ScalarField<T> {
    /// Field with every cell set to `value`.
    pub fn filled(grid: Grid, value: T) -> Self {
        let n = grid.n_cells();
        Self {
            grid,
            data: vec![value; n],
        }
    }

    /// Wrap an existing row-major sample vector.
    ///
    /// Panics if `data.len()` differs from the grid's cell count.
    pub fn from_vec(grid: Grid, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            grid.n_cells(),
            "sample count must match grid cell count"
        );
        Self { grid, data }
    }

    /// Build a field by evaluating `f` at every N-d index.
    pub fn from_fn<F>(grid: Grid, mut f: F) -> Self
    where
        F: FnMut(&[usize]) -> T,
    {
        let n = grid.n_cells();
        let mut index = vec![0usize; grid.ndim()];
        let mut data = Vec::with_capacity(n);
        for flat in 0..n {
            grid.unravel(flat, &mut index);
            data.push(f(&index));
        }
        Self { grid, data }
    }

    #[inline]
    pub fn get(&self, index: &[usize]) -> T {
        self.data[self.grid.idx(index)]
    }

    #[inline]
    pub fn set(&mut self, index: &[usize], value: T) {
        let idx = self.grid.idx(index);
        self.data[idx] = value;
    }

    /// True if both fields share extent and spacing.
    pub fn same_grid<U>(&self, other: &ScalarField<U>) -> bool {
        self.grid == other.grid
    }
}

impl ScalarField<f64> {
    /// Largest |a - b| over all cells. Fields must share a grid.
    pub fn max_abs_diff(&self, other: &ScalarField<f64>) -> f64 {
        debug_assert!(self.same_grid(other));
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}
