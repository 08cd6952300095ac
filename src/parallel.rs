// src/parallel.rs
//
// Chunked per-cell passes shared by both PDE stages.
//
// Each pass writes into a fresh output buffer while reading only the previous
// buffer, so chunks are independent. Per-chunk partial results are collected
// into a Vec indexed by chunk and folded in chunk order by the caller, which
// keeps reductions bit-identical between the serial and the Rayon path.

use rayon::prelude::*;

/// Cells handled by one chunk.
pub const CHUNK_CELLS: usize = 2048;

/// Environment switch that turns on Rayon for every pass.
pub const PAR_ENV: &str = "ANISO_LS_PAR";

/// Whether passes should run on the Rayon pool.
pub fn parallel_enabled(requested: bool) -> bool {
    requested || std::env::var(PAR_ENV).is_ok()
}

/// Run `f(first_cell, out_chunk)` over `out`, split into chunks of
/// `CHUNK_CELLS * comps` elements (`comps` values per cell).
///
/// Returns the per-chunk results in chunk order.
pub fn chunked_pass<T, R, F>(out: &mut [T], comps: usize, parallel: bool, f: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(usize, &mut [T]) -> R + Sync,
{
    let comps = comps.max(1);
    let chunk = CHUNK_CELLS * comps;
    if out.is_empty() {
        return Vec::new();
    }
    if parallel {
        out.par_chunks_mut(chunk)
            .enumerate()
            .map(|(k, c)| f(k * CHUNK_CELLS, c))
            .collect()
    } else {
        out.chunks_mut(chunk)
            .enumerate()
            .map(|(k, c)| f(k * CHUNK_CELLS, c))
            .collect()
    }
}
