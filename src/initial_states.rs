// src/initial_states.rs
//
// Level-set seed generators.
//
// Conventions:
// - Inside the shape φ < 0, outside φ > 0.
// - Indices are cell indices; physical positions are index * spacing.

use crate::grid::Grid;
use crate::scalar_field::ScalarField;

/// Value inside a binary step seed.
pub const INSIDE: f64 = -1.0;
/// Value outside a binary step seed.
pub const OUTSIDE: f64 = 1.0;

/// Binary step: `INSIDE` on the box `lo..=hi` (per axis, inclusive), `OUTSIDE` elsewhere.
pub fn box_step(grid: Grid, lo: &[usize], hi: &[usize]) -> ScalarField {
    assert_eq!(lo.len(), grid.ndim());
    assert_eq!(hi.len(), grid.ndim());
    ScalarField::from_fn(grid, |ix| {
        let inside = ix
            .iter()
            .zip(lo.iter().zip(hi.iter()))
            .all(|(&i, (&l, &h))| i >= l && i <= h);
        if inside {
            INSIDE
        } else {
            OUTSIDE
        }
    })
}

/// Square step centred in an `n`^dim grid, covering the middle half
/// (`n/4 ..= 3n/4`). For n = 128 this is the 65-cell block 32..=96.
pub fn centered_square_step(n: usize, dim: usize) -> ScalarField {
    let grid = Grid::unit(&vec![n; dim]);
    let lo = vec![n / 4; dim];
    let hi = vec![3 * n / 4; dim];
    box_step(grid, &lo, &hi)
}

/// Signed distance to a sphere (disk in 2D) in physical units.
pub fn sphere_distance(grid: Grid, center: &[f64], radius: f64) -> ScalarField {
    assert_eq!(center.len(), grid.ndim());
    let h = grid.spacing().to_vec();
    ScalarField::from_fn(grid, |ix| {
        let r2: f64 = ix
            .iter()
            .zip(center.iter().zip(h.iter()))
            .map(|(&i, (&c, &dh))| {
                let d = i as f64 * dh - c;
                d * d
            })
            .sum();
        r2.sqrt() - radius
    })
}

/// Add deterministic pseudo-random noise of amplitude `amp` (xorshift).
pub fn add_noise(phi: &mut ScalarField, amp: f64, seed: u64) {
    let mut rng = XorShift64::new(seed);
    for v in &mut phi.data {
        *v += amp * (rng.next_f64() * 2.0 - 1.0);
    }
}

struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed },
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn next_f64(&mut self) -> f64 {
        // 53 random bits -> [0, 1)
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}
