// src/normal_field.rs

use crate::grid::Grid;
use crate::parallel::chunked_pass;
use crate::scalar_field::ScalarField;
use crate::vecn::normalize_in_place;

/// Gradient magnitude below which a cell carries no normal.
pub const GRADIENT_EPS: f64 = 1e-12;

/// Surface normals on a grid: `ndim` components per cell plus a band flag.
///
/// Cells inside the band hold a unit vector; cells outside hold zeros.
/// Lives for one outer iteration of the evolution.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalField {
    pub grid: Grid,
    pub data: Vec<f64>,
    pub band: Vec<bool>,
}

/// Central difference of φ along `axis` at `cell`, using clamped neighbours.
#[inline]
pub(crate) fn central_diff(phi: &ScalarField, cell: usize, axis: usize) -> f64 {
    let g = &phi.grid;
    let p = phi.data[g.neighbor_clamped(cell, axis, 1)];
    let m = phi.data[g.neighbor_clamped(cell, axis, -1)];
    (p - m) / (2.0 * g.spacing()[axis])
}

impl NormalField {
    /// All-zero field with an empty band.
    pub fn zeros(grid: Grid) -> Self {
        let n = grid.n_cells();
        let d = grid.ndim();
        Self {
            grid,
            data: vec![0.0; n * d],
            band: vec![false; n],
        }
    }

    /// Raw normal estimate ∇φ/|∇φ| from central differences.
    ///
    /// Cells with |∇φ| ≤ `GRADIENT_EPS` fall outside the band.
    pub fn from_level_set(phi: &ScalarField, parallel: bool) -> Self {
        let grid = phi.grid.clone();
        let d = grid.ndim();
        let mut data = vec![0.0; grid.n_cells() * d];

        chunked_pass(&mut data, d, parallel, |first, out| {
            for (k, n) in out.chunks_mut(d).enumerate() {
                let cell = first + k;
                for (a, c) in n.iter_mut().enumerate() {
                    *c = central_diff(phi, cell, a);
                }
                let g2: f64 = n.iter().map(|c| c * c).sum();
                if g2.sqrt() <= GRADIENT_EPS {
                    n.iter_mut().for_each(|c| *c = 0.0);
                } else {
                    normalize_in_place(n);
                }
            }
        });

        let band = data
            .chunks(d)
            .map(|n| n.iter().any(|&c| c != 0.0))
            .collect();

        Self { grid, data, band }
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.grid.ndim()
    }

    /// Normal vector stored at `cell`.
    #[inline]
    pub fn normal(&self, cell: usize) -> &[f64] {
        let d = self.ndim();
        &self.data[cell * d..(cell + 1) * d]
    }

    #[inline]
    pub fn in_band(&self, cell: usize) -> bool {
        self.band[cell]
    }

    /// Number of cells carrying a normal.
    pub fn band_cells(&self) -> usize {
        self.band.iter().filter(|&&b| b).count()
    }

    /// Component `a` of the neighbour `offset` cells away along `axis`.
    /// An out-of-band neighbour reads as the centre cell (zero flux across the band edge).
    #[inline]
    fn component_or_center(&self, cell: usize, axis: usize, offset: isize, a: usize) -> f64 {
        let nb = self.grid.neighbor_clamped(cell, axis, offset);
        let src = if self.band[nb] { nb } else { cell };
        self.data[src * self.ndim() + a]
    }

    /// Divergence of the normal field at `cell` (curvature of the implied surface).
    /// Zero outside the band.
    pub fn divergence_at(&self, cell: usize) -> f64 {
        if !self.band[cell] {
            return 0.0;
        }
        let h = self.grid.spacing();
        (0..self.ndim())
            .map(|a| {
                let p = self.component_or_center(cell, a, 1, a);
                let m = self.component_or_center(cell, a, -1, a);
                (p - m) / (2.0 * h[a])
            })
            .sum()
    }

    /// Divergence at every cell.
    pub fn curvature(&self, parallel: bool) -> ScalarField {
        let mut out = ScalarField::new(self.grid.clone());
        chunked_pass(&mut out.data, 1, parallel, |first, chunk| {
            for (k, v) in chunk.iter_mut().enumerate() {
                *v = self.divergence_at(first + k);
            }
        });
        out
    }
}
