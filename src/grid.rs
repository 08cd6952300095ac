// src/grid.rs

/// N-dimensional finite-difference grid.
///
/// Cells are stored row-major with axis 0 fastest:
/// `idx = i0 + n0 * (i1 + n1 * (i2 + ...))`.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    size: Vec<usize>,
    spacing: Vec<f64>,
    strides: Vec<usize>,
}

impl Grid {
    /// Create a grid with the given extent and spacing.
    ///
    /// Any axis whose spacing is exactly zero gets spacing 1.
    /// Panics if `size` and `spacing` differ in length.
    pub fn new(size: &[usize], spacing: &[f64]) -> Self {
        assert_eq!(
            size.len(),
            spacing.len(),
            "grid size and spacing must have the same dimension"
        );
        let spacing = spacing
            .iter()
            .map(|&h| if h == 0.0 { 1.0 } else { h })
            .collect();
        let mut strides = Vec::with_capacity(size.len());
        let mut s = 1usize;
        for &n in size {
            strides.push(s);
            s = s.saturating_mul(n);
        }
        Self {
            size: size.to_vec(),
            spacing,
            strides,
        }
    }

    /// Grid with unit spacing along every axis.
    pub fn unit(size: &[usize]) -> Self {
        Self::new(size, &vec![1.0; size.len()])
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.size.len()
    }

    #[inline]
    pub fn size(&self) -> &[usize] {
        &self.size
    }

    #[inline]
    pub fn spacing(&self) -> &[f64] {
        &self.spacing
    }

    /// Total number of cells.
    pub fn n_cells(&self) -> usize {
        self.size.iter().product()
    }

    /// First axis with zero extent, if any.
    pub fn first_empty_axis(&self) -> Option<usize> {
        if self.size.is_empty() {
            return Some(0);
        }
        self.size.iter().position(|&n| n == 0)
    }

    /// Length of one row (cells along axis 0).
    #[inline]
    pub fn row_len(&self) -> usize {
        self.size.first().copied().unwrap_or(0)
    }

    /// Convert an N-d index to a flat index into a 1D array.
    #[inline]
    pub fn idx(&self, index: &[usize]) -> usize {
        debug_assert_eq!(index.len(), self.ndim());
        index
            .iter()
            .zip(self.strides.iter().zip(self.size.iter()))
            .map(|(&i, (&s, &n))| {
                debug_assert!(i < n);
                i * s
            })
            .sum()
    }

    /// Convert a flat index back to an N-d index.
    pub fn unravel(&self, mut flat: usize, out: &mut [usize]) {
        for (a, &n) in self.size.iter().enumerate() {
            out[a] = flat % n;
            flat /= n;
        }
    }

    /// Coordinate of `flat` along `axis`.
    #[inline]
    pub fn coord(&self, flat: usize, axis: usize) -> usize {
        (flat / self.strides[axis]) % self.size[axis]
    }

    /// Flat index of the neighbour `offset` cells away along `axis`,
    /// clamped to the grid (replicate boundary).
    #[inline]
    pub fn neighbor_clamped(&self, flat: usize, axis: usize, offset: isize) -> usize {
        let c = self.coord(flat, axis) as isize;
        let last = self.size[axis] as isize - 1;
        let target = (c + offset).clamp(0, last.max(0));
        (flat as isize + (target - c) * self.strides[axis] as isize) as usize
    }

    /// Σ_a 1/h_a², used by the explicit time-step bounds.
    pub fn inv_spacing_sq_sum(&self) -> f64 {
        self.spacing.iter().map(|h| 1.0 / (h * h)).sum()
    }

    /// Smallest spacing over all axes.
    pub fn min_spacing(&self) -> f64 {
        self.spacing.iter().copied().fold(f64::INFINITY, f64::min)
    }
}
