//! Pose-graph factor types
//!
//! Concrete factors for 3D pose graphs: relative-pose constraints between
//! two poses, unary pose priors, and the rotation-only between constraint
//! the initializer derives from them. All three implement the container's
//! [`Factor`] trait; measurements are immutable after construction.

use crate::graph::{Factor, Key, KeyFormatter};
use crate::manifold::{SE3, SO3};
use std::any::Any;

/// Isotropic noise model: a single standard deviation shared by every
/// measurement dimension.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IsotropicNoise {
    sigma: f64,
}

impl IsotropicNoise {
    /// Create a model from a standard deviation.
    pub fn from_sigma(sigma: f64) -> Self {
        Self { sigma }
    }

    /// The standard deviation.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Scalar precision 1/σ², used as the least-squares weight.
    pub fn precision(&self) -> f64 {
        1.0 / (self.sigma * self.sigma)
    }
}

/// Relative-pose constraint between two poses.
///
/// The measurement is the pose of the second key expressed in the frame of
/// the first: `measured = T_i⁻¹ ∘ T_j`.
#[derive(Clone, Debug)]
pub struct BetweenFactorSE3 {
    keys: [Key; 2],
    pub measured: SE3,
    pub noise: IsotropicNoise,
}

impl BetweenFactorSE3 {
    pub fn new(key1: Key, key2: Key, measured: SE3, noise: IsotropicNoise) -> Self {
        Self {
            keys: [key1, key2],
            measured,
            noise,
        }
    }

    pub fn key1(&self) -> Key {
        self.keys[0]
    }

    pub fn key2(&self) -> Key {
        self.keys[1]
    }
}

impl Factor for BetweenFactorSE3 {
    fn keys(&self) -> &[Key] {
        &self.keys
    }

    fn approx_equals(&self, other: &dyn Factor, tolerance: f64) -> bool {
        match other.as_any().downcast_ref::<BetweenFactorSE3>() {
            Some(other) => {
                self.keys == other.keys
                    && self.measured.approx_equals(&other.measured, tolerance)
                    && (self.noise.sigma() - other.noise.sigma()).abs() <= tolerance
            }
            None => false,
        }
    }

    fn describe(&self, key_formatter: &KeyFormatter) -> String {
        format!(
            "BetweenFactorSE3({} -> {}): {}, sigma: {}",
            key_formatter(self.keys[0]),
            key_formatter(self.keys[1]),
            self.measured,
            self.noise.sigma()
        )
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Unary prior anchoring one pose to a fixed value.
#[derive(Clone, Debug)]
pub struct PriorFactorSE3 {
    keys: [Key; 1],
    pub prior: SE3,
    pub noise: IsotropicNoise,
}

impl PriorFactorSE3 {
    pub fn new(key: Key, prior: SE3, noise: IsotropicNoise) -> Self {
        Self {
            keys: [key],
            prior,
            noise,
        }
    }

    pub fn key(&self) -> Key {
        self.keys[0]
    }
}

impl Factor for PriorFactorSE3 {
    fn keys(&self) -> &[Key] {
        &self.keys
    }

    fn approx_equals(&self, other: &dyn Factor, tolerance: f64) -> bool {
        match other.as_any().downcast_ref::<PriorFactorSE3>() {
            Some(other) => {
                self.keys == other.keys
                    && self.prior.approx_equals(&other.prior, tolerance)
                    && (self.noise.sigma() - other.noise.sigma()).abs() <= tolerance
            }
            None => false,
        }
    }

    fn describe(&self, key_formatter: &KeyFormatter) -> String {
        format!(
            "PriorFactorSE3({}): {}, sigma: {}",
            key_formatter(self.keys[0]),
            self.prior,
            self.noise.sigma()
        )
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Rotation-only between constraint, the edge type of the rotation graph.
///
/// Carries the rotation component of an original relative-pose measurement
/// plus the scalar weight derived from its noise model.
#[derive(Clone, Debug)]
pub struct BetweenFactorSO3 {
    keys: [Key; 2],
    pub measured: SO3,
    pub weight: f64,
}

impl BetweenFactorSO3 {
    pub fn new(key1: Key, key2: Key, measured: SO3, weight: f64) -> Self {
        Self {
            keys: [key1, key2],
            measured,
            weight,
        }
    }

    pub fn key1(&self) -> Key {
        self.keys[0]
    }

    pub fn key2(&self) -> Key {
        self.keys[1]
    }
}

impl Factor for BetweenFactorSO3 {
    fn keys(&self) -> &[Key] {
        &self.keys
    }

    fn approx_equals(&self, other: &dyn Factor, tolerance: f64) -> bool {
        match other.as_any().downcast_ref::<BetweenFactorSO3>() {
            Some(other) => {
                self.keys == other.keys
                    && self.measured.approx_equals(&other.measured, tolerance)
                    && (self.weight - other.weight).abs() <= tolerance
            }
            None => false,
        }
    }

    fn describe(&self, key_formatter: &KeyFormatter) -> String {
        format!(
            "BetweenFactorSO3({} -> {}): {}, weight: {}",
            key_formatter(self.keys[0]),
            key_formatter(self.keys[1]),
            self.measured,
            self.weight
        )
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
