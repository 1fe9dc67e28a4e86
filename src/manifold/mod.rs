//! Manifold representations for 3D pose estimation.
//!
//! This module provides the two Lie groups the initializer works on:
//! - **SO(3)**: Special Orthogonal group (3D rotations)
//! - **SE(3)**: Special Euclidean group (rigid body transformations)
//!
//! SO(3) elements are represented using nalgebra's `UnitQuaternion` internally;
//! tangent elements are axis-angle vectors in R³, where the direction gives the
//! axis of rotation and the magnitude gives the angle. SE(3) is stored as a
//! rotation plus a translation vector.
//!
//! The chordal relaxation additionally needs a projection from a general 3×3
//! matrix back onto the rotation manifold; see [`so3::nearest_rotation`].

pub mod se3;
pub mod so3;

pub use se3::SE3;
pub use so3::{nearest_rotation, SO3};
