//! Pose-graph initialization via rotation averaging
//!
//! Produces a good initial estimate of unknown 3D poses from a graph of
//! noisy relative-pose measurements, used as a warm start before nonlinear
//! refinement:
//!
//! 1. [`build_rotation_graph`] reduces the pose graph to rotation-only
//!    constraints plus a synthetic anchor fixed at identity;
//! 2. [`compute_orientations_chordal`] (closed-form linear relaxation) or
//!    [`compute_orientations_gradient`] (iterative manifold descent)
//!    estimates a global orientation per key;
//! 3. [`compute_poses`] recovers translations from the original
//!    measurements, now linear with the rotations fixed.
//!
//! Every invocation is independent: no state is held across calls.

use std::collections::BTreeMap;

use crate::error::InitResult;
use crate::graph::{FactorGraph, Key};
use crate::manifold::SE3;

pub mod adjacency;
pub mod chordal;
pub mod gradient;
pub mod rotation_graph;
pub mod translation;

pub use adjacency::{build_adjacency, RotationAdjacency, RotationEdge};
pub use chordal::compute_orientations_chordal;
pub use gradient::{
    compute_orientations_gradient, gradient_tron, GradientDescentConfig, GradientDescentResult,
};
pub use rotation_graph::build_rotation_graph;
pub use translation::compute_poses;

/// Reserved key of the synthetic anchor node fixing the global orientation.
/// User graphs must not use this key.
pub const ANCHOR_KEY: Key = Key::MAX;

/// Initialize a pose graph from scratch.
///
/// Runs the chordal relaxation for orientations, then recovers translations.
/// The input graph may contain only between-pose and prior-pose factors; at
/// least one prior is required to anchor the estimate.
pub fn initialize(graph: &FactorGraph) -> InitResult<BTreeMap<Key, SE3>> {
    let rotation_graph = build_rotation_graph(graph)?;
    let orientations = compute_orientations_chordal(&rotation_graph)?;
    compute_poses(graph, &orientations)
}

/// Initialize a pose graph starting from a caller-supplied guess.
///
/// Refines the guess orientations with manifold gradient descent, then
/// recovers translations. A guess already consistent with every measurement
/// is a fixed point of the refinement and is reproduced unchanged (up to
/// numerical tolerance).
///
/// Non-convergence of the refinement is soft: the best available estimate
/// is still assembled into poses and a warning is logged. Callers that need
/// the convergence flag and iteration count should run
/// [`compute_orientations_gradient`] directly and pass its rotations to
/// [`compute_poses`].
pub fn initialize_with_guess(
    graph: &FactorGraph,
    guess: &BTreeMap<Key, SE3>,
    config: &GradientDescentConfig,
) -> InitResult<BTreeMap<Key, SE3>> {
    let rotation_graph = build_rotation_graph(graph)?;
    let refined = compute_orientations_gradient(&rotation_graph, guess, config)?;
    compute_poses(graph, &refined.rotations)
}
