//! Translation recovery
//!
//! With orientations fixed, translations satisfy linear constraints: a
//! between-pose measurement `(R_ij, t_ij)` on edge (i, j) pins
//! `t_j − t_i = R_i·t_ij` in the world frame, and a prior pins its key's
//! translation directly. One sparse weighted least-squares solve recovers
//! all translations, which are then composed with the orientations into
//! full pose estimates.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use nalgebra::Vector3;
use tracing::debug;

use crate::error::{InitError, InitResult};
use crate::factors::{BetweenFactorSE3, PriorFactorSE3};
use crate::graph::{FactorGraph, Key};
use crate::linalg::WeightedLeastSquares;
use crate::manifold::{SE3, SO3};

/// Recover full poses from estimated orientations and the original
/// pose-graph measurements.
///
/// `orientations` must contain every key of the graph. Keys with no path to
/// a prior-anchored key cannot be positioned and are rejected with
/// [`InitError::Disconnected`]; the factor-type policy matches the
/// extractor (between-pose and prior-pose only).
pub fn compute_poses(
    graph: &FactorGraph,
    orientations: &BTreeMap<Key, SO3>,
) -> InitResult<BTreeMap<Key, SE3>> {
    let keys: Vec<Key> = graph.keys().into_iter().collect();
    if keys.is_empty() {
        return Ok(BTreeMap::new());
    }
    for key in &keys {
        if !orientations.contains_key(key) {
            return Err(InitError::InvalidInput(format!(
                "no orientation estimate for key {key}"
            )));
        }
    }
    let column_of: HashMap<Key, usize> = keys
        .iter()
        .enumerate()
        .map(|(node, &key)| (key, 3 * node))
        .collect();

    let mut problem = WeightedLeastSquares::new(3 * keys.len());
    let mut anchored: Vec<Key> = Vec::new();
    let mut neighbors: BTreeMap<Key, Vec<Key>> = BTreeMap::new();

    for (slot, factor) in graph.iter() {
        let any = factor.as_any();
        if let Some(between) = any.downcast_ref::<BetweenFactorSE3>() {
            let (key_i, key_j) = (between.key1(), between.key2());
            // t_j − t_i = R_i·t_ij with the estimated world orientation of i
            let world_offset = orientations[&key_i].rotate(between.measured.translation());
            let (col_i, col_j) = (column_of[&key_i], column_of[&key_j]);
            for r in 0..3 {
                problem.add_row(
                    &[(col_j + r, 1.0), (col_i + r, -1.0)],
                    world_offset[r],
                    between.noise.precision(),
                );
            }
            neighbors.entry(key_i).or_default().push(key_j);
            neighbors.entry(key_j).or_default().push(key_i);
        } else if let Some(prior) = any.downcast_ref::<PriorFactorSE3>() {
            let col = column_of[&prior.key()];
            let target = prior.prior.translation();
            for r in 0..3 {
                problem.add_row(&[(col + r, 1.0)], target[r], prior.noise.precision());
            }
            anchored.push(prior.key());
        } else {
            return Err(InitError::MalformedInput(format!(
                "factor {slot} is neither a between-pose nor a prior-pose constraint"
            )));
        }
    }

    // Translations are only determined for keys connected to a prior
    let disconnected = keys_without_anchor_path(&keys, &anchored, &neighbors);
    if !disconnected.is_empty() {
        return Err(InitError::Disconnected { keys: disconnected });
    }

    debug!(nodes = keys.len(), rows = problem.nrows(), "solving translation system");
    let solution = problem.solve()?;

    let mut poses = BTreeMap::new();
    for (node, &key) in keys.iter().enumerate() {
        let offset = 3 * node;
        let translation = Vector3::new(
            solution[offset],
            solution[offset + 1],
            solution[offset + 2],
        );
        poses.insert(key, SE3::new(orientations[&key], translation));
    }
    Ok(poses)
}

fn keys_without_anchor_path(
    keys: &[Key],
    anchored: &[Key],
    neighbors: &BTreeMap<Key, Vec<Key>>,
) -> Vec<Key> {
    let mut reached: BTreeSet<Key> = anchored.iter().copied().collect();
    let mut queue: VecDeque<Key> = anchored.iter().copied().collect();
    while let Some(current) = queue.pop_front() {
        if let Some(adjacent) = neighbors.get(&current) {
            for &neighbor in adjacent {
                if reached.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
    }
    keys.iter()
        .copied()
        .filter(|key| !reached.contains(key))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::IsotropicNoise;
    use std::f64::consts::FRAC_PI_2;

    fn noise() -> IsotropicNoise {
        IsotropicNoise::from_sigma(0.1)
    }

    #[test]
    fn test_two_node_translation_recovery() {
        // Pose 0 at origin, pose 1 translated and rotated; measurement is
        // expressed in the frame of pose 0.
        let rotation0 = SO3::from_axis_angle(&Vector3::z(), FRAC_PI_2);
        let pose0 = SE3::new(rotation0, Vector3::new(1.0, 0.0, 0.0));
        let pose1 = SE3::new(SO3::identity(), Vector3::new(1.0, 2.0, 0.0));

        let mut graph = FactorGraph::new();
        graph.add(PriorFactorSE3::new(0, pose0, noise()));
        graph.add(BetweenFactorSE3::new(0, 1, pose0.between(&pose1), noise()));

        let mut orientations = BTreeMap::new();
        orientations.insert(0, rotation0);
        orientations.insert(1, SO3::identity());

        let poses = compute_poses(&graph, &orientations).unwrap();
        assert!(poses[&0].approx_equals(&pose0, 1e-9));
        assert!(poses[&1].approx_equals(&pose1, 1e-9));
    }

    #[test]
    fn test_missing_orientation_is_invalid_input() {
        let mut graph = FactorGraph::new();
        graph.add(PriorFactorSE3::new(0, SE3::identity(), noise()));
        let orientations = BTreeMap::new();
        assert!(matches!(
            compute_poses(&graph, &orientations),
            Err(InitError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_component_without_prior_is_disconnected() {
        let mut graph = FactorGraph::new();
        graph.add(PriorFactorSE3::new(0, SE3::identity(), noise()));
        graph.add(BetweenFactorSE3::new(0, 1, SE3::identity(), noise()));
        graph.add(BetweenFactorSE3::new(2, 3, SE3::identity(), noise()));

        let mut orientations = BTreeMap::new();
        for key in 0..4 {
            orientations.insert(key, SO3::identity());
        }
        match compute_poses(&graph, &orientations) {
            Err(InitError::Disconnected { keys }) => assert_eq!(keys, vec![2, 3]),
            other => panic!("expected Disconnected, got {other:?}"),
        }
    }
}
