//! Forward kinematics of a single finger.
//!
//! Each bone starts as `(length, 0, 0)`. Joint `j` rotates its own bone and
//! every bone distal to it, so the bone vector of joint `j` in the finger base
//! frame is `R_0 R_1 .. R_j (L_j, 0, 0)` and joint positions are the running
//! sums of those vectors. The finger is then splayed by its canonical angles,
//! turned by the wrist rotation and shifted by the root translation.
//!
//! Alongside positions the builder returns partial derivatives. For a
//! revolute joint with axis `w` pivoting at `p_pivot`, a distal point `p`
//! moves as `w × (p - p_pivot)`; the wrist rotations follow the same rule
//! about the root.

use crate::angles::AngleVector;
use crate::rotation::{is_active, rotation_matrix, EulerXyz};
use crate::skeleton::{Finger, HandSkeleton, FINGER_JOINT_AXES, JOINTS_PER_FINGER};
use nalgebra::{Matrix3, Vector3};

/// Positions and partial derivatives of one finger, base to tip.
#[derive(Debug, Clone)]
pub struct FingerChain {
    /// World positions in millimetres.
    pub joints: [Vector3<f64>; JOINTS_PER_FINGER],
    /// `joint_partials[j][k]`: derivative of joint `j` with respect to this
    /// finger's angle `k`. Zero whenever `k > j`.
    pub joint_partials: [[Vector3<f64>; JOINTS_PER_FINGER]; JOINTS_PER_FINGER],
    /// `wrist_partials[j][i]`: derivative of joint `j` with respect to wrist
    /// angle `i`.
    pub wrist_partials: [[Vector3<f64>; 3]; JOINTS_PER_FINGER],
}

/// Builds the chain of `finger` for the pose `theta`.
pub fn build_finger(finger: Finger, theta: &AngleVector, skeleton: &HandSkeleton) -> FingerChain {
    let lengths = skeleton.bone_lengths().finger(finger);
    let angles = theta.finger_angles(finger);

    // Joint positions and rotation axes in the finger base frame.
    let mut frame = Matrix3::identity();
    let mut axes = [Vector3::zeros(); JOINTS_PER_FINGER];
    let mut local = [Vector3::zeros(); JOINTS_PER_FINGER];
    let mut tip = Vector3::zeros();
    for (j, axis) in FINGER_JOINT_AXES.iter().enumerate() {
        if is_active(angles[j]) {
            axes[j] = frame * axis.unit();
        }
        frame *= rotation_matrix(*axis, angles[j]);
        tip += frame * Vector3::new(lengths[j], 0.0, 0.0);
        local[j] = tip;
    }

    let splay = EulerXyz::new(skeleton.canonical_angles().finger(finger));
    let wrist = EulerXyz::new(theta.wrist_rotation());
    let to_world = wrist.matrix * splay.matrix;
    let translation = theta.root_translation();

    let mut chain = FingerChain {
        joints: [Vector3::zeros(); JOINTS_PER_FINGER],
        joint_partials: [[Vector3::zeros(); JOINTS_PER_FINGER]; JOINTS_PER_FINGER],
        wrist_partials: [[Vector3::zeros(); 3]; JOINTS_PER_FINGER],
    };

    for j in 0..JOINTS_PER_FINGER {
        let from_root = to_world * local[j];
        chain.joints[j] = from_root + translation;

        for k in 0..=j {
            let pivot = if k == 0 { Vector3::zeros() } else { local[k - 1] };
            chain.joint_partials[j][k] = to_world * axes[k].cross(&(local[j] - pivot));
        }
        for (i, axis) in wrist.axes.iter().enumerate() {
            chain.wrist_partials[j][i] = axis.cross(&from_root);
        }
    }

    chain
}
