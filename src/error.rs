// src/error.rs

use thiserror::Error;

/// Failures of the evolution engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvolutionError {
    /// A configuration value lies outside its domain.
    #[error("invalid parameter {name}: {value}")]
    InvalidParameter {
        /// Parameter name as exposed on the configuration surface
        name: &'static str,
        /// Offending value, rendered for display
        value: String,
    },

    /// The input field has zero extent along some axis.
    #[error("input field is empty along axis {axis}")]
    EmptyInput {
        /// First axis found with zero extent
        axis: usize,
    },

    /// Two fields that must share a grid do not.
    #[error("grid mismatch: expected extent {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
}

/// Fatal failures of a single persisted-volume conversion.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// The persisted object is not the volume sub type the converter expects.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: String,
        found: String,
    },

    /// Pixel payload length disagrees with the declared extent.
    #[error("payload length {found} does not match extent product {expected}")]
    PayloadLength { expected: usize, found: usize },

    /// Declared extent has more cells than the address space can hold.
    #[error("extent {dim_size:?} overflows the cell count")]
    ExtentOverflow { dim_size: Vec<usize> },

    /// Declared dimension count disagrees with the extent/spacing vectors.
    #[error("dimension count {expected} does not match header vectors of length {found}")]
    DimensionMismatch { expected: usize, found: usize },
}

/// Recoverable conditions surfaced alongside a successful conversion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeWarning {
    /// Separate-file storage was requested for an unnamed field; data was embedded instead.
    #[error("image name must be set when writing images in a separate file; data stored locally")]
    MissingName,
}
