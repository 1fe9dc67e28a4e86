//! Gradient-based rotation refinement
//!
//! Iterative orientation refinement on the rotation manifold, following the
//! Riemannian consensus scheme of Tron & Vidal: the descent operates on the
//! inverse rotations, each node accumulates a tangent-space contribution
//! from every incident edge through a reshaped cost gradient, and the
//! per-node update is retracted back onto the manifold via the exponential
//! map. The anchor node is held fixed at identity to prevent global
//! rotation drift.
//!
//! Exhausting the iteration budget is a soft condition: the best available
//! estimate is returned together with a convergence flag and a warning.

use std::collections::BTreeMap;

use nalgebra::Vector3;
use tracing::{debug, warn};

use crate::error::{InitError, InitResult};
use crate::graph::{FactorGraph, Key};
use crate::init::adjacency::build_adjacency;
use crate::init::ANCHOR_KEY;
use crate::manifold::{SE3, SO3};

/// Parameters of the gradient descent.
#[derive(Clone, Debug)]
pub struct GradientDescentConfig {
    /// Iteration budget; exhaustion is reported, not raised.
    pub max_iterations: usize,
    /// Convergence threshold on the largest per-node gradient norm.
    pub tolerance: f64,
    /// Minimum number of iterations before convergence is checked.
    pub min_iterations: usize,
    /// Shape parameter of the reshaped cost (`b` in `gradient_tron`).
    pub b: f64,
}

impl Default for GradientDescentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-5,
            min_iterations: 20,
            b: 1.0,
        }
    }
}

impl GradientDescentConfig {
    /// Set the iteration budget.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the convergence tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Outcome of the gradient refinement.
#[derive(Clone, Debug)]
pub struct GradientDescentResult {
    /// Refined orientation per key (anchor excluded).
    pub rotations: BTreeMap<Key, SO3>,
    /// Whether the gradient norm fell below tolerance within the budget.
    pub converged: bool,
    /// Iterations actually performed.
    pub iterations: usize,
}

/// Single-edge tangent contribution of the reshaped consensus cost.
///
/// Given the two current rotation estimates and scalar parameters `a` (edge
/// precision coefficient) and `b` (shape/normalization), returns the
/// gradient direction in so(3): `a·b·θ·exp(−b·θ)` along the unit geodesic
/// direction from `r1` to `r2`, where `θ` is the residual angle.
///
/// A zero residual yields the exact zero vector. A non-finite logarithm
/// (residuals at half a turn can be ill-conditioned) is retried after a
/// small fixed perturbation of `r1`.
pub fn gradient_tron(r1: &SO3, r2: &SO3, a: f64, b: f64) -> Vector3<f64> {
    let mut log_rot = r1.between(r2).logmap();
    let mut theta = log_rot.norm();
    if !theta.is_finite() {
        let perturbed = r1.compose(&SO3::expmap(&Vector3::new(0.01, 0.01, 0.01)));
        log_rot = perturbed.between(r2).logmap();
        theta = log_rot.norm();
    }

    if theta.is_finite() && theta > 1e-5 {
        a * b * theta * (-b * theta).exp() * (log_rot / theta)
    } else {
        Vector3::zeros()
    }
}

/// Refine orientations by manifold gradient descent, starting from the
/// given pose guess.
///
/// The guess must contain every key of the rotation graph (except the
/// anchor); keys with no path to the anchor are rejected up front with
/// [`InitError::Disconnected`].
pub fn compute_orientations_gradient(
    rotation_graph: &FactorGraph,
    guess: &BTreeMap<Key, SE3>,
    config: &GradientDescentConfig,
) -> InitResult<GradientDescentResult> {
    let adjacency = build_adjacency(rotation_graph)?;

    let disconnected = adjacency.disconnected_from(ANCHOR_KEY);
    if !disconnected.is_empty() {
        return Err(InitError::Disconnected { keys: disconnected });
    }

    // The descent runs on the inverse rotations (Tron & Vidal), with the
    // anchor pinned at identity.
    let mut inverse_rot: BTreeMap<Key, SO3> = BTreeMap::new();
    inverse_rot.insert(ANCHOR_KEY, SO3::identity());
    for key in adjacency.keys().filter(|&key| key != ANCHOR_KEY) {
        let pose = guess.get(&key).ok_or_else(|| {
            InitError::InvalidInput(format!("initial guess is missing key {key}"))
        })?;
        inverse_rot.insert(key, pose.rotation().inverse());
    }

    // The largest eigenvalue of the weighted graph Laplacian is bounded by
    // 2·max_degree·max_weight, so the step must stay below
    // 1/(max_degree·b·max_weight) for the update to remain a contraction.
    let mu_max = adjacency.max_degree() as f64 * config.b * adjacency.max_weight();
    let step_size = 1.0 / mu_max;

    let mut converged = false;
    let mut iterations = 0;
    for iteration in 0..config.max_iterations {
        let mut max_grad: f64 = 0.0;
        let mut step: BTreeMap<Key, Vector3<f64>> = BTreeMap::new();

        for (&key, r_i) in &inverse_rot {
            if key == ANCHOR_KEY {
                continue;
            }
            let mut grad_key = Vector3::zeros();
            for &edge_index in adjacency.incident_edges(key) {
                let Some(edge) = adjacency.edge(edge_index) else {
                    continue;
                };
                if key == edge.keys[0] {
                    let r_j = inverse_rot[&edge.keys[1]];
                    grad_key += gradient_tron(r_i, &edge.rotation.compose(&r_j), edge.weight, config.b);
                } else {
                    let r_j = inverse_rot[&edge.keys[0]];
                    grad_key += gradient_tron(r_i, &edge.rotation.between(&r_j), edge.weight, config.b);
                }
            }
            max_grad = max_grad.max(grad_key.norm());
            step.insert(key, step_size * grad_key);
        }

        for (key, delta) in step {
            if let Some(rotation) = inverse_rot.get_mut(&key) {
                *rotation = rotation.compose(&SO3::expmap(&delta));
            }
        }

        iterations = iteration + 1;
        if iterations >= config.min_iterations && max_grad < config.tolerance {
            converged = true;
            debug!(iterations, max_grad, "gradient refinement converged");
            break;
        }
    }

    if !converged {
        warn!(
            iterations,
            "gradient refinement exhausted its iteration budget without converging"
        );
    }

    let rotations = inverse_rot
        .into_iter()
        .filter(|&(key, _)| key != ANCHOR_KEY)
        .map(|(key, rotation)| (key, rotation.inverse()))
        .collect();

    Ok(GradientDescentResult {
        rotations,
        converged,
        iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::BetweenFactorSO3;
    use std::f64::consts::FRAC_PI_2;

    const TOLERANCE: f64 = 1e-6;

    #[test]
    fn test_gradient_tron_zero_at_zero_residual() {
        let rotation = SO3::from_axis_angle(&Vector3::new(1.0, 2.0, -1.0), 0.8);
        for &(a, b) in &[(1.0, 1.0), (6.0, 1.0), (0.5, 2.0)] {
            let gradient = gradient_tron(&rotation, &rotation, a, b);
            assert!(gradient.norm() < TOLERANCE, "nonzero gradient for a={a}, b={b}");
        }
    }

    #[test]
    fn test_gradient_tron_quarter_turn_value() {
        let r1 = SO3::identity();
        let r2 = SO3::from_axis_angle(&Vector3::z(), FRAC_PI_2);
        let a = 6.010534238540223;
        let b = 1.0;

        let gradient = gradient_tron(&r1, &r2, a, b);
        let expected = Vector3::new(0.0, 0.0, 1.962658662803917);
        assert!((gradient - expected).norm() < TOLERANCE);
    }

    #[test]
    fn test_consistent_guess_is_fixed_point() {
        // anchor -> 0 identity, 0 -> 1 quarter turn, consistent guess
        let r1 = SO3::from_axis_angle(&Vector3::z(), FRAC_PI_2);
        let mut graph = FactorGraph::new();
        graph.add(BetweenFactorSO3::new(ANCHOR_KEY, 0, SO3::identity(), 100.0));
        graph.add(BetweenFactorSO3::new(0, 1, r1, 100.0));

        let mut guess = BTreeMap::new();
        guess.insert(0, SE3::new(SO3::identity(), Vector3::zeros()));
        guess.insert(1, SE3::new(r1, Vector3::zeros()));

        let result =
            compute_orientations_gradient(&graph, &guess, &GradientDescentConfig::default())
                .unwrap();
        assert!(result.converged);
        assert!(result.rotations[&0].approx_equals(&SO3::identity(), TOLERANCE));
        assert!(result.rotations[&1].approx_equals(&r1, TOLERANCE));
    }

    #[test]
    fn test_identity_guess_recovers_chain() {
        // Three-node chain of quarter turns about z; the guess carries no
        // orientation information at all
        let r1 = SO3::from_axis_angle(&Vector3::z(), FRAC_PI_2);
        let mut graph = FactorGraph::new();
        graph.add(BetweenFactorSO3::new(ANCHOR_KEY, 0, SO3::identity(), 100.0));
        graph.add(BetweenFactorSO3::new(0, 1, r1, 100.0));
        graph.add(BetweenFactorSO3::new(1, 2, r1, 100.0));

        let mut guess = BTreeMap::new();
        for key in 0..3 {
            guess.insert(key, SE3::identity());
        }

        let result =
            compute_orientations_gradient(&graph, &guess, &GradientDescentConfig::default())
                .unwrap();
        assert!(result.converged);
        assert!(result.rotations[&0].approx_equals(&SO3::identity(), 1e-4));
        assert!(result.rotations[&1].approx_equals(&r1, 1e-4));
        assert!(result.rotations[&2].approx_equals(&r1.compose(&r1), 1e-4));
    }

    #[test]
    fn test_budget_exhaustion_is_soft() {
        let mut graph = FactorGraph::new();
        graph.add(BetweenFactorSO3::new(ANCHOR_KEY, 0, SO3::identity(), 100.0));
        let mut guess = BTreeMap::new();
        guess.insert(
            0,
            SE3::new(SO3::from_axis_angle(&Vector3::z(), 0.3), Vector3::zeros()),
        );

        let config = GradientDescentConfig::default().with_max_iterations(1);
        let result = compute_orientations_gradient(&graph, &guess, &config).unwrap();
        assert!(!result.converged);
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn test_missing_guess_key_is_invalid_input() {
        let mut graph = FactorGraph::new();
        graph.add(BetweenFactorSO3::new(ANCHOR_KEY, 0, SO3::identity(), 1.0));
        let guess = BTreeMap::new();
        assert!(matches!(
            compute_orientations_gradient(&graph, &guess, &GradientDescentConfig::default()),
            Err(InitError::InvalidInput(_))
        ));
    }
}
