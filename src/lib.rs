//! Factor-graph container and rotation-averaging initialization for 3D pose
//! graphs. See the [`init`] module for the initialization pipeline.

pub mod error;
pub mod factors;
pub mod graph;
pub mod init;
pub mod linalg;
pub mod logger;
pub mod manifold;

pub use error::{InitError, InitResult};
pub use logger::{init_logger, init_logger_with_level};
