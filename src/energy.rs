//! Energy terms minimised by the fitter.
//!
//! - [`PositionEnergy`]: L1 distance between the evaluated joints and a target
//!   matrix (20x3, or 21x3 with the root as the first row).
//! - [`LimitEnergy`]: soft box penalty keeping the 23 rotation angles inside
//!   `[0, 2π]`.
//! - [`TotalEnergy`]: the sum of both.
//!
//! Every term provides its value and a (sub)gradient with respect to the
//! whole [`AngleVector`]. Absolute values use `sign(0) = 0`.

use crate::angles::{AngleVector, ParamVector, ANGLE_COUNT, TRANSLATION_RANGE};
use crate::pose::{evaluate, evaluate_with_jacobian, pull_back, JointCoordinates};
use crate::skeleton::{HandSkeleton, HAND_JOINT_COUNT};
use crate::{KinematicsError, KinematicsResult};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

/// Scalar objective over the angle vector.
pub trait Energy {
    fn value(
        &self,
        theta: &AngleVector,
        target: &DMatrix<f64>,
        skeleton: &HandSkeleton,
    ) -> KinematicsResult<f64>;

    /// Value together with its gradient.
    fn value_and_gradient(
        &self,
        theta: &AngleVector,
        target: &DMatrix<f64>,
        skeleton: &HandSkeleton,
    ) -> KinematicsResult<(f64, ParamVector)>;
}

/// Returns whether `target` carries the root row, or a shape error.
pub fn target_has_root(target: &DMatrix<f64>) -> KinematicsResult<bool> {
    match target.shape() {
        (rows, 3) if rows == HAND_JOINT_COUNT => Ok(false),
        (rows, 3) if rows == HAND_JOINT_COUNT + 1 => Ok(true),
        (rows, cols) => Err(KinematicsError::ShapeMismatch { rows, cols }),
    }
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Sum of absolute coordinate differences to the target.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionEnergy;

impl Energy for PositionEnergy {
    fn value(
        &self,
        theta: &AngleVector,
        target: &DMatrix<f64>,
        skeleton: &HandSkeleton,
    ) -> KinematicsResult<f64> {
        let has_root = target_has_root(target)?;
        let predicted = evaluate(theta, skeleton).to_matrix(has_root);
        Ok((predicted - target).abs().sum())
    }

    fn value_and_gradient(
        &self,
        theta: &AngleVector,
        target: &DMatrix<f64>,
        skeleton: &HandSkeleton,
    ) -> KinematicsResult<(f64, ParamVector)> {
        let has_root = target_has_root(target)?;
        let offset = usize::from(has_root);
        let (pose, jacobian) = evaluate_with_jacobian(theta, skeleton);

        let mut loss = 0.0;
        let mut signs = JointCoordinates::zeros();
        for (i, joint) in pose.joints.iter().enumerate() {
            for axis in 0..3 {
                let residual = joint[axis] - target[(i + offset, axis)];
                loss += residual.abs();
                signs[3 * i + axis] = sign(residual);
            }
        }
        let mut gradient = pull_back(&jacobian, &signs);

        if has_root {
            for axis in 0..3 {
                let residual = pose.root[axis] - target[(0, axis)];
                loss += residual.abs();
                gradient[TRANSLATION_RANGE.start + axis] += sign(residual);
            }
        }

        Ok((loss, gradient))
    }
}

/// Soft box constraint on the rotation angles.
///
/// An angle outside `[lower, upper]` costs `|angle - upper|`; angles inside
/// cost nothing. The translation entries are never penalised.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimitEnergy {
    pub lower: f64,
    pub upper: f64,
}

impl Default for LimitEnergy {
    fn default() -> Self {
        Self {
            lower: 0.0,
            upper: TAU,
        }
    }
}

impl LimitEnergy {
    /// Penalty of a single angle.
    pub fn penalty(&self, angle: f64) -> f64 {
        if (self.lower..=self.upper).contains(&angle) {
            0.0
        } else {
            (angle - self.upper).abs()
        }
    }

    fn total(&self, theta: &AngleVector) -> f64 {
        theta.angles().iter().map(|&a| self.penalty(a)).sum()
    }

    fn gradient(&self, theta: &AngleVector) -> ParamVector {
        let mut gradient = ParamVector::zeros();
        for (i, &angle) in theta.angles().iter().enumerate() {
            if !(self.lower..=self.upper).contains(&angle) {
                gradient[i] = sign(angle - self.upper);
            }
        }
        gradient
    }
}

impl Energy for LimitEnergy {
    fn value(
        &self,
        theta: &AngleVector,
        _target: &DMatrix<f64>,
        _skeleton: &HandSkeleton,
    ) -> KinematicsResult<f64> {
        Ok(self.total(theta))
    }

    fn value_and_gradient(
        &self,
        theta: &AngleVector,
        _target: &DMatrix<f64>,
        _skeleton: &HandSkeleton,
    ) -> KinematicsResult<(f64, ParamVector)> {
        Ok((self.total(theta), self.gradient(theta)))
    }
}

/// Position term plus limit term.
#[derive(Debug, Clone, Copy, Default)]
pub struct TotalEnergy {
    pub position: PositionEnergy,
    pub limit: LimitEnergy,
}

impl Energy for TotalEnergy {
    fn value(
        &self,
        theta: &AngleVector,
        target: &DMatrix<f64>,
        skeleton: &HandSkeleton,
    ) -> KinematicsResult<f64> {
        Ok(self.position.value(theta, target, skeleton)? + self.limit.total(theta))
    }

    fn value_and_gradient(
        &self,
        theta: &AngleVector,
        target: &DMatrix<f64>,
        skeleton: &HandSkeleton,
    ) -> KinematicsResult<(f64, ParamVector)> {
        let (position, mut gradient) = self.position.value_and_gradient(theta, target, skeleton)?;
        gradient += self.limit.gradient(theta);
        Ok((position + self.limit.total(theta), gradient))
    }
}

/// Named energy selection for configuration files and the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyKind {
    Position,
    Limit,
    #[default]
    Total,
}

impl EnergyKind {
    fn energy(self) -> &'static dyn Energy {
        static POSITION: PositionEnergy = PositionEnergy;
        static LIMIT: LimitEnergy = LimitEnergy {
            lower: 0.0,
            upper: TAU,
        };
        static TOTAL: TotalEnergy = TotalEnergy {
            position: PositionEnergy,
            limit: LimitEnergy {
                lower: 0.0,
                upper: TAU,
            },
        };
        match self {
            EnergyKind::Position => &POSITION,
            EnergyKind::Limit => &LIMIT,
            EnergyKind::Total => &TOTAL,
        }
    }
}

impl Energy for EnergyKind {
    fn value(
        &self,
        theta: &AngleVector,
        target: &DMatrix<f64>,
        skeleton: &HandSkeleton,
    ) -> KinematicsResult<f64> {
        self.energy().value(theta, target, skeleton)
    }

    fn value_and_gradient(
        &self,
        theta: &AngleVector,
        target: &DMatrix<f64>,
        skeleton: &HandSkeleton,
    ) -> KinematicsResult<(f64, ParamVector)> {
        self.energy().value_and_gradient(theta, target, skeleton)
    }
}

impl fmt::Display for EnergyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EnergyKind::Position => "position",
            EnergyKind::Limit => "limit",
            EnergyKind::Total => "total",
        };
        f.write_str(name)
    }
}

impl FromStr for EnergyKind {
    type Err = KinematicsError;

    fn from_str(s: &str) -> KinematicsResult<Self> {
        match s {
            "position" => Ok(EnergyKind::Position),
            "limit" => Ok(EnergyKind::Limit),
            "total" => Ok(EnergyKind::Total),
            other => Err(KinematicsError::InvalidParameter(format!(
                "unknown energy '{other}', expected position, limit or total"
            ))),
        }
    }
}
