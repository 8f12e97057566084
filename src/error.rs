//! Error types for skeleton evaluation and fitting.

use thiserror::Error;

/// Errors raised by the kinematic model, the energy terms and the fitter.
#[derive(Debug, Error)]
pub enum KinematicsError {
    /// Target matrix does not match the evaluator output.
    #[error("target matrix is {rows}x{cols}, expected 20x3 or 21x3")]
    ShapeMismatch {
        /// Rows of the offending matrix.
        rows: usize,
        /// Columns of the offending matrix.
        cols: usize,
    },

    /// Rotation axis index outside {X, Y, Z}.
    #[error("invalid rotation axis index {0}, expected 0 (X), 1 (Y) or 2 (Z)")]
    InvalidAxis(usize),

    /// Angle vector has the wrong number of entries.
    #[error("angle vector needs {expected} parameters (or 23 without root translation), got {provided}")]
    ParameterCount {
        /// Number of parameters the model uses.
        expected: usize,
        /// Number of parameters supplied.
        provided: usize,
    },

    /// Joint label text could not be parsed.
    #[error("invalid joint label: {0}")]
    InvalidLabel(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// I/O failure while reading labels or configuration.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for kinematics operations.
pub type KinematicsResult<T> = Result<T, KinematicsError>;
