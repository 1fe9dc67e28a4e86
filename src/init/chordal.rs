//! Chordal rotation relaxation
//!
//! Closed-form orientation estimate: every unknown rotation is relaxed to a
//! free 3×3 matrix (9 scalar unknowns per node), each edge contributes a
//! linear residual block enforcing `M_j ≈ M_i·R_ij`, and the anchor block is
//! fixed to identity, eliminating the global rotation ambiguity. The
//! weighted least-squares solution is then projected back onto SO(3) per
//! node, as a separate second stage.
//!
//! Exact in the noiseless, fully consistent case up to projection rounding;
//! under measurement noise it returns the best least-squares fit instead of
//! failing. The result depends only on edge order and weights.

use std::collections::{BTreeMap, HashMap};

use nalgebra::Matrix3;
use tracing::debug;

use crate::error::{InitError, InitResult};
use crate::graph::{FactorGraph, Key};
use crate::init::adjacency::build_adjacency;
use crate::init::ANCHOR_KEY;
use crate::linalg::WeightedLeastSquares;
use crate::manifold::{nearest_rotation, SO3};

/// Estimate global orientations from a rotation-only graph.
///
/// Fails with [`InitError::Disconnected`] when any key has no path to the
/// anchor (including the no-prior case where the anchor is absent
/// entirely); no partial estimate is returned. An empty graph has nothing
/// to estimate and yields an empty map.
pub fn compute_orientations_chordal(
    rotation_graph: &FactorGraph,
) -> InitResult<BTreeMap<Key, SO3>> {
    let adjacency = build_adjacency(rotation_graph)?;

    let disconnected = adjacency.disconnected_from(ANCHOR_KEY);
    if !disconnected.is_empty() {
        return Err(InitError::Disconnected { keys: disconnected });
    }

    // Column layout: unknown keys ascending, 9 unknowns each (row-major
    // entries of the relaxed rotation matrix). The anchor is eliminated.
    let unknown_keys: Vec<Key> = adjacency.keys().filter(|&key| key != ANCHOR_KEY).collect();
    if unknown_keys.is_empty() {
        return Ok(BTreeMap::new());
    }
    let column_of: HashMap<Key, usize> = unknown_keys
        .iter()
        .enumerate()
        .map(|(node, &key)| (key, 9 * node))
        .collect();

    let mut problem = WeightedLeastSquares::new(9 * unknown_keys.len());

    for index in 0..rotation_graph.size() {
        let Some(edge) = adjacency.edge(index) else {
            continue;
        };
        let measured = edge.rotation.rotation_matrix();
        let [key_i, key_j] = edge.keys;

        if key_i == ANCHOR_KEY {
            // M_j = I·R_ij: the unknown equals the measurement directly
            let col_j = column_of[&key_j];
            for r in 0..3 {
                for c in 0..3 {
                    problem.add_row(&[(col_j + 3 * r + c, 1.0)], measured[(r, c)], edge.weight);
                }
            }
        } else if key_j == ANCHOR_KEY {
            // M_i·R_ij = I
            let col_i = column_of[&key_i];
            for r in 0..3 {
                for c in 0..3 {
                    let entries: Vec<(usize, f64)> = (0..3)
                        .map(|m| (col_i + 3 * r + m, measured[(m, c)]))
                        .collect();
                    let rhs = if r == c { 1.0 } else { 0.0 };
                    problem.add_row(&entries, rhs, edge.weight);
                }
            }
        } else {
            // M_j − M_i·R_ij = 0
            let col_i = column_of[&key_i];
            let col_j = column_of[&key_j];
            for r in 0..3 {
                for c in 0..3 {
                    let mut entries = vec![(col_j + 3 * r + c, 1.0)];
                    entries.extend((0..3).map(|m| (col_i + 3 * r + m, -measured[(m, c)])));
                    problem.add_row(&entries, 0.0, edge.weight);
                }
            }
        }
    }

    debug!(
        nodes = unknown_keys.len(),
        edges = adjacency.num_edges(),
        rows = problem.nrows(),
        "solving chordal relaxation"
    );
    let solution = problem.solve()?;

    // Second stage: project each relaxed 3×3 block back onto the manifold
    let mut orientations = BTreeMap::new();
    for (node, &key) in unknown_keys.iter().enumerate() {
        let offset = 9 * node;
        let block = Matrix3::from_fn(|r, c| solution[offset + 3 * r + c]);
        orientations.insert(key, nearest_rotation(&block)?);
    }
    Ok(orientations)
}
