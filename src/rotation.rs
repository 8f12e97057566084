//! Elementary rotations about the coordinate axes.
//!
//! All rotations are right-handed. Angles whose magnitude is at most
//! [`ANGLE_EPSILON`] are treated as exactly zero: the point comes back
//! untouched and the rotation contributes no gradient.

use crate::{KinematicsError, KinematicsResult};
use nalgebra::{Matrix3, Vector3};

/// Threshold below which an angle is treated as the identity rotation.
pub const ANGLE_EPSILON: f64 = 1e-6;

/// A coordinate axis to rotate about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// The three axes in application order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Unit vector along this axis.
    pub fn unit(self) -> Vector3<f64> {
        match self {
            Axis::X => Vector3::x(),
            Axis::Y => Vector3::y(),
            Axis::Z => Vector3::z(),
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl TryFrom<usize> for Axis {
    type Error = KinematicsError;

    fn try_from(index: usize) -> KinematicsResult<Self> {
        match index {
            0 => Ok(Axis::X),
            1 => Ok(Axis::Y),
            2 => Ok(Axis::Z),
            other => Err(KinematicsError::InvalidAxis(other)),
        }
    }
}

/// Whether `angle` is large enough to produce a rotation.
#[inline]
pub fn is_active(angle: f64) -> bool {
    angle.abs() > ANGLE_EPSILON
}

/// Rotates `point` about `axis` by `angle` radians.
pub fn rotate(axis: Axis, point: &Vector3<f64>, angle: f64) -> Vector3<f64> {
    if !is_active(angle) {
        return *point;
    }
    let (sin, cos) = angle.sin_cos();
    let (x, y, z) = (point.x, point.y, point.z);
    match axis {
        Axis::X => Vector3::new(x, cos * y - sin * z, sin * y + cos * z),
        Axis::Y => Vector3::new(cos * x + sin * z, y, -sin * x + cos * z),
        Axis::Z => Vector3::new(cos * x - sin * y, sin * x + cos * y, z),
    }
}

/// Matrix form of [`rotate`], built by rotating the basis vectors.
pub fn rotation_matrix(axis: Axis, angle: f64) -> Matrix3<f64> {
    if !is_active(angle) {
        return Matrix3::identity();
    }
    Matrix3::from_columns(&[
        rotate(axis, &Vector3::x(), angle),
        rotate(axis, &Vector3::y(), angle),
        rotate(axis, &Vector3::z(), angle),
    ])
}

/// Composed rotation about X, then Y, then Z.
///
/// Besides the matrix `Rz * Ry * Rx` this keeps, for each of the three
/// angles, its rotation axis expressed in the output frame. The partial
/// derivative of `R * q` with respect to angle `i` is `axes[i] × (R * q)`.
/// Axes of angles inside the epsilon band are zero.
#[derive(Debug, Clone, Copy)]
pub struct EulerXyz {
    pub matrix: Matrix3<f64>,
    pub axes: [Vector3<f64>; 3],
}

impl EulerXyz {
    pub fn new(angles: [f64; 3]) -> Self {
        let rx = rotation_matrix(Axis::X, angles[0]);
        let ry = rotation_matrix(Axis::Y, angles[1]);
        let rz = rotation_matrix(Axis::Z, angles[2]);

        let axis_or_zero = |angle: f64, axis: Vector3<f64>| {
            if is_active(angle) {
                axis
            } else {
                Vector3::zeros()
            }
        };

        Self {
            matrix: rz * ry * rx,
            axes: [
                axis_or_zero(angles[0], rz * ry * Vector3::x()),
                axis_or_zero(angles[1], rz * Vector3::y()),
                axis_or_zero(angles[2], Vector3::z()),
            ],
        }
    }

    /// Applies the rotation to `point`.
    pub fn apply(&self, point: &Vector3<f64>) -> Vector3<f64> {
        self.matrix * point
    }
}
