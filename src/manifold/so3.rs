//! SO(3) - Special Orthogonal Group in 3D
//!
//! This module implements the Special Orthogonal group SO(3), which represents
//! rotations in 3D space.
//!
//! SO(3) elements are represented using nalgebra's UnitQuaternion internally.
//! Tangent elements are axis-angle vectors in R³, where the direction gives
//! the axis of rotation and the magnitude gives the angle.

use crate::error::{InitError, InitResult};
use nalgebra::{Matrix3, Rotation3, Unit, UnitQuaternion, Vector3};
use std::fmt;

/// SO(3) group element representing rotations in 3D.
///
/// Internally represented using nalgebra's UnitQuaternion<f64>.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SO3 {
    quaternion: UnitQuaternion<f64>,
}

impl fmt::Display for SO3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let q = self.quaternion.quaternion();
        write!(
            f,
            "SO3(quaternion: [w: {:.4}, x: {:.4}, y: {:.4}, z: {:.4}])",
            q.w, q.i, q.j, q.k
        )
    }
}

impl SO3 {
    /// Identity rotation.
    pub fn identity() -> Self {
        SO3 {
            quaternion: UnitQuaternion::identity(),
        }
    }

    /// Create a new SO(3) element from a unit quaternion.
    pub fn new(quaternion: UnitQuaternion<f64>) -> Self {
        SO3 { quaternion }
    }

    /// Create SO(3) from axis-angle representation.
    pub fn from_axis_angle(axis: &Vector3<f64>, angle: f64) -> Self {
        let unit_axis = Unit::new_normalize(*axis);
        SO3 {
            quaternion: UnitQuaternion::from_axis_angle(&unit_axis, angle),
        }
    }

    /// Exponential map: axis-angle vector in so(3) to group element.
    pub fn expmap(omega: &Vector3<f64>) -> Self {
        SO3 {
            quaternion: UnitQuaternion::from_scaled_axis(*omega),
        }
    }

    /// Logarithmic map: group element to axis-angle vector in so(3).
    pub fn logmap(&self) -> Vector3<f64> {
        self.quaternion.scaled_axis()
    }

    /// Create SO(3) from an orthonormal rotation matrix.
    ///
    /// The input must already lie on the manifold; use [`nearest_rotation`]
    /// to project a general 3×3 matrix first.
    pub fn from_rotation_matrix(matrix: &Matrix3<f64>) -> Self {
        let rotation = Rotation3::from_matrix_unchecked(*matrix);
        SO3 {
            quaternion: UnitQuaternion::from_rotation_matrix(&rotation),
        }
    }

    /// Get the quaternion representation.
    pub fn quaternion(&self) -> UnitQuaternion<f64> {
        self.quaternion
    }

    /// Get the rotation matrix (3x3).
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        self.quaternion.to_rotation_matrix().into_inner()
    }

    /// Group composition: `self ∘ other`.
    pub fn compose(&self, other: &SO3) -> SO3 {
        SO3 {
            quaternion: self.quaternion * other.quaternion,
        }
    }

    /// Group inverse. For rotations R⁻¹ = Rᵀ, for quaternions q⁻¹ = q*.
    pub fn inverse(&self) -> SO3 {
        SO3 {
            quaternion: self.quaternion.inverse(),
        }
    }

    /// Relative rotation: `self⁻¹ ∘ other`.
    pub fn between(&self, other: &SO3) -> SO3 {
        self.inverse().compose(other)
    }

    /// Rotate a vector: R·v.
    pub fn rotate(&self, vector: &Vector3<f64>) -> Vector3<f64> {
        self.quaternion * vector
    }

    /// Rotation angle in [0, π].
    pub fn angle(&self) -> f64 {
        self.quaternion.angle()
    }

    /// Approximate equality with the given tolerance.
    ///
    /// Compares rotation matrices element-wise, so representations whose
    /// angles differ by full turns compare equal without explicit
    /// normalization.
    pub fn approx_equals(&self, other: &SO3, tolerance: f64) -> bool {
        let diff = self.rotation_matrix() - other.rotation_matrix();
        diff.iter().all(|entry| entry.abs() <= tolerance)
    }
}

/// Project a general 3×3 matrix onto SO(3).
///
/// Nearest-orthogonal projection in the Frobenius sense via SVD
/// (`R = U·diag(1, 1, det(U·Vᵀ))·Vᵀ`), the second stage of the chordal
/// relaxation.
pub fn nearest_rotation(matrix: &Matrix3<f64>) -> InitResult<SO3> {
    let svd = matrix
        .try_svd(true, true, f64::EPSILON, 0)
        .ok_or_else(|| InitError::LinearAlgebra("SVD did not converge".to_string()))?;
    let u = svd
        .u
        .ok_or_else(|| InitError::LinearAlgebra("SVD did not produce U".to_string()))?;
    let v_t = svd
        .v_t
        .ok_or_else(|| InitError::LinearAlgebra("SVD did not produce Vᵀ".to_string()))?;

    let mut rotation = u * v_t;
    if rotation.determinant() < 0.0 {
        let mut flip = Matrix3::identity();
        flip[(2, 2)] = -1.0;
        rotation = u * flip * v_t;
    }
    Ok(SO3::from_rotation_matrix(&rotation))
}
