//! SE(3) - Special Euclidean Group in 3D
//!
//! Rigid body transformations, stored as a rotation (SO(3)) plus a 3D
//! translation. Only the group operations the initializer needs are
//! implemented; tangent-space machinery lives on the rotation side.

use crate::manifold::SO3;
use nalgebra::Vector3;
use std::fmt;

/// SE(3) group element representing rigid body transformations in 3D.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SE3 {
    rotation: SO3,
    translation: Vector3<f64>,
}

impl fmt::Display for SE3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SE3(t: [{:.4}, {:.4}, {:.4}], {})",
            self.translation.x, self.translation.y, self.translation.z, self.rotation
        )
    }
}

impl SE3 {
    /// Identity transformation.
    pub fn identity() -> Self {
        SE3 {
            rotation: SO3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Create a new SE(3) element from a rotation and a translation.
    pub fn new(rotation: SO3, translation: Vector3<f64>) -> Self {
        SE3 {
            rotation,
            translation,
        }
    }

    /// Get the rotation component.
    pub fn rotation(&self) -> &SO3 {
        &self.rotation
    }

    /// Get the translation component.
    pub fn translation(&self) -> &Vector3<f64> {
        &self.translation
    }

    /// Group composition: `self ∘ other`.
    pub fn compose(&self, other: &SE3) -> SE3 {
        SE3 {
            rotation: self.rotation.compose(&other.rotation),
            translation: self.translation + self.rotation.rotate(&other.translation),
        }
    }

    /// Group inverse: (R, t)⁻¹ = (R⁻¹, -R⁻¹·t).
    pub fn inverse(&self) -> SE3 {
        let inverse_rotation = self.rotation.inverse();
        SE3 {
            rotation: inverse_rotation,
            translation: -inverse_rotation.rotate(&self.translation),
        }
    }

    /// Relative transformation: `self⁻¹ ∘ other`.
    pub fn between(&self, other: &SE3) -> SE3 {
        self.inverse().compose(other)
    }

    /// Transform a point: R·p + t.
    pub fn transform_point(&self, point: &Vector3<f64>) -> Vector3<f64> {
        self.rotation.rotate(point) + self.translation
    }

    /// Approximate equality with the given tolerance, component-wise on the
    /// rotation matrix and the translation vector.
    pub fn approx_equals(&self, other: &SE3, tolerance: f64) -> bool {
        self.rotation.approx_equals(&other.rotation, tolerance)
            && (self.translation - other.translation)
                .iter()
                .all(|entry| entry.abs() <= tolerance)
    }
}
