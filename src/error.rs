//! Error types for the pose-graph-init library
//!
//! This module provides the main error and result types used throughout the library.
//! All errors use the `thiserror` crate for automatic trait implementations.
//!
//! Numerical softness (non-convergence of the iterative refiner) is deliberately
//! not an error: it is reported through the result of the corresponding stage.

use crate::graph::Key;
use thiserror::Error;

/// Main result type used throughout the pose-graph-init library
pub type InitResult<T> = Result<T, InitError>;

/// Main error type for the pose-graph-init library
#[derive(Debug, Clone, Error)]
pub enum InitError {
    /// The input graph contains a factor the initializer cannot reduce
    /// (neither a between-pose nor a prior-pose constraint)
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Invalid input parameters (missing guess entries, reserved keys, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Keys with no path to the anchor in the rotation graph; their
    /// orientations cannot be estimated
    #[error("Keys disconnected from the anchor: {keys:?}")]
    Disconnected { keys: Vec<Key> },

    /// Linear algebra related errors (assembly or factorization failures)
    #[error("Linear algebra error: {0}")]
    LinearAlgebra(String),
}
