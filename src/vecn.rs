// src/vecn.rs
//
// Slice-vector helpers for per-cell normals of arbitrary dimension.

/// Dot product of two equal-length vectors.
#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Euclidean norm.
#[inline]
pub fn norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

/// Squared distance |a - b|².
#[inline]
pub fn dist2(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

/// Normalise in place. A zero vector stays zero.
#[inline]
pub fn normalize_in_place(v: &mut [f64]) {
    let n2 = dot(v, v);
    if n2 == 0.0 {
        return;
    }
    let inv = 1.0 / n2.sqrt();
    for c in v.iter_mut() {
        *c *= inv;
    }
}
