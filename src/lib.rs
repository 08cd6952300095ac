// src/lib.rs

pub mod config;
pub mod error;
pub mod evolution;
pub mod grid;
pub mod initial_states;
pub mod meta;
pub mod normal_diffusion;
pub mod normal_field;
pub mod parallel;
pub mod params;
pub mod propagation;
pub mod scalar_field;
pub mod vecn;

pub use error::{BridgeError, BridgeWarning, EvolutionError};
pub use evolution::{EvolutionReport, LevelSetEvolution};
pub use grid::Grid;
pub use params::{EvolutionParams, NormalProcessType};
pub use scalar_field::ScalarField;
