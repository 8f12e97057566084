//! Whole-hand evaluation: angle vector to joint positions.

use crate::angles::{finger_joint_index, AngleVector, ParamVector, PARAM_COUNT, TRANSLATION_RANGE};
use crate::chain::build_finger;
use crate::skeleton::{Finger, HandSkeleton, HAND_JOINT_COUNT, JOINTS_PER_FINGER};
use nalgebra::{DMatrix, SMatrix, SVector, Vector3};

/// Coordinates of the 20 finger joints, flattened row by row.
pub const COORD_COUNT: usize = 3 * HAND_JOINT_COUNT;

/// Flattened joint coordinates (`x0, y0, z0, x1, ...`).
pub type JointCoordinates = SVector<f64, COORD_COUNT>;

/// Derivative of every finger joint coordinate with respect to every
/// parameter. Row `3 * joint + axis`, column = parameter index.
pub type PoseJacobian = SMatrix<f64, COORD_COUNT, PARAM_COUNT>;

/// Joint positions of one evaluated hand, in millimetres.
///
/// Joints are ordered thumb, index, middle, ring, little; each finger base
/// to tip.
#[derive(Debug, Clone, PartialEq)]
pub struct HandPose {
    pub root: Vector3<f64>,
    pub joints: [Vector3<f64>; HAND_JOINT_COUNT],
}

impl HandPose {
    pub fn joint(&self, finger: Finger, joint: usize) -> Vector3<f64> {
        self.joints[finger.index() * JOINTS_PER_FINGER + joint]
    }

    pub fn finger(&self, finger: Finger) -> &[Vector3<f64>] {
        let start = finger.index() * JOINTS_PER_FINGER;
        &self.joints[start..start + JOINTS_PER_FINGER]
    }

    /// `20x3` matrix, or `21x3` with the root as the first row.
    pub fn to_matrix(&self, include_root: bool) -> DMatrix<f64> {
        let offset = usize::from(include_root);
        let mut matrix = DMatrix::zeros(HAND_JOINT_COUNT + offset, 3);
        if include_root {
            matrix.row_mut(0).copy_from(&self.root.transpose());
        }
        for (i, joint) in self.joints.iter().enumerate() {
            matrix.row_mut(i + offset).copy_from(&joint.transpose());
        }
        matrix
    }

    pub fn coordinates(&self) -> JointCoordinates {
        JointCoordinates::from_iterator(self.joints.iter().flat_map(|j| j.iter().copied()))
    }

    /// Line segments for drawing: root to each finger base, then joint to
    /// joint along every finger.
    pub fn bone_segments(&self) -> Vec<(Finger, Vector3<f64>, Vector3<f64>)> {
        let mut segments = Vec::with_capacity(HAND_JOINT_COUNT);
        for finger in Finger::ALL {
            let chain = self.finger(finger);
            segments.push((finger, self.root, chain[0]));
            for pair in chain.windows(2) {
                segments.push((finger, pair[0], pair[1]));
            }
        }
        segments
    }
}

/// Evaluates the hand model for `theta`. Pure and deterministic.
pub fn evaluate(theta: &AngleVector, skeleton: &HandSkeleton) -> HandPose {
    let mut joints = [Vector3::zeros(); HAND_JOINT_COUNT];
    for finger in Finger::ALL {
        let chain = build_finger(finger, theta, skeleton);
        let start = finger.index() * JOINTS_PER_FINGER;
        joints[start..start + JOINTS_PER_FINGER].copy_from_slice(&chain.joints);
    }
    HandPose {
        root: theta.root_translation(),
        joints,
    }
}

/// Evaluates the hand model together with its Jacobian.
///
/// The root position equals the translation part of `theta`; its Jacobian is
/// the identity on the translation columns and is not stored.
pub fn evaluate_with_jacobian(
    theta: &AngleVector,
    skeleton: &HandSkeleton,
) -> (HandPose, Box<PoseJacobian>) {
    let mut joints = [Vector3::zeros(); HAND_JOINT_COUNT];
    let mut jacobian = Box::new(PoseJacobian::zeros());

    for finger in Finger::ALL {
        let chain = build_finger(finger, theta, skeleton);
        for j in 0..JOINTS_PER_FINGER {
            let joint_index = finger.index() * JOINTS_PER_FINGER + j;
            joints[joint_index] = chain.joints[j];

            for axis in 0..3 {
                let row = 3 * joint_index + axis;
                for (k, partial) in chain.joint_partials[j].iter().enumerate().take(j + 1) {
                    jacobian[(row, finger_joint_index(finger, k))] = partial[axis];
                }
                for (i, partial) in chain.wrist_partials[j].iter().enumerate() {
                    jacobian[(row, i)] = partial[axis];
                }
                jacobian[(row, TRANSLATION_RANGE.start + axis)] = 1.0;
            }
        }
    }

    let pose = HandPose {
        root: theta.root_translation(),
        joints,
    };
    (pose, jacobian)
}

/// The resting pose: every angle and the translation at zero.
pub fn canonical_pose(skeleton: &HandSkeleton) -> HandPose {
    evaluate(&AngleVector::zeros(), skeleton)
}

/// Chains `d energy / d coordinates` back onto the parameters.
pub fn pull_back(jacobian: &PoseJacobian, coordinate_gradient: &JointCoordinates) -> ParamVector {
    jacobian.tr_mul(coordinate_gradient)
}
