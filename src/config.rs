use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

use crate::grid::Grid;
use crate::params::EvolutionParams;

/// Description of one driver run, written next to its outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub geometry: GeometryConfig,
    pub seed: SeedConfig,
    pub evolution: EvolutionParams,
    pub numerics: NumericsConfig,
    pub run: RunInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryConfig {
    pub size: Vec<usize>,
    pub spacing: Vec<f64>,
}

impl GeometryConfig {
    pub fn from_grid(grid: &Grid) -> Self {
        Self {
            size: grid.size().to_vec(),
            spacing: grid.spacing().to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    /// "square" or "disk"
    pub shape: String,
    pub noise: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericsConfig {
    /// Normal diffusion step (fixed per grid).
    pub normal_dt: f64,
    /// Propagation steps actually taken, one per outer iteration.
    pub propagation_dt: Vec<f64>,
    /// Inner iterations actually taken, one per outer iteration.
    pub normal_iterations: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub binary: String,
    pub run_id: String,

    // Optional provenance (can be filled later)
    pub git_commit: Option<String>,
    pub timestamp_utc: Option<String>,
}

impl RunConfig {
    pub fn write_to_dir(&self, out_dir: &Path) -> std::io::Result<()> {
        let path = out_dir.join("config.json");
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}
