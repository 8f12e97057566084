//! Fixed hand skeleton tables: bone lengths and canonical finger splay.
//!
//! The canonical hand has the wrist at the origin, the middle finger along
//! the positive X axis and the palm facing positive Y. Every bone starts as
//! the vector `(length, 0, 0)` before any rotation is applied.

use crate::rotation::Axis;
use crate::{KinematicsError, KinematicsResult};
use serde::{Deserialize, Serialize};

/// Number of fingers in the model.
pub const FINGER_COUNT: usize = 5;
/// Joints (and bones) per finger, base to tip.
pub const JOINTS_PER_FINGER: usize = 4;
/// Hand joints excluding the wrist root.
pub const HAND_JOINT_COUNT: usize = FINGER_COUNT * JOINTS_PER_FINGER;

/// Rotation axis of each finger joint, base to tip.
///
/// The base joint splays the whole ray about Z; together with the flexion of
/// the next joint it forms the two-axis knuckle.
pub const FINGER_JOINT_AXES: [Axis; JOINTS_PER_FINGER] = [Axis::Z, Axis::Y, Axis::Y, Axis::Y];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Little,
}

impl Finger {
    /// Fingers in output order.
    pub const ALL: [Finger; FINGER_COUNT] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Little,
    ];

    pub const fn index(self) -> usize {
        match self {
            Finger::Thumb => 0,
            Finger::Index => 1,
            Finger::Middle => 2,
            Finger::Ring => 3,
            Finger::Little => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Finger::Thumb => "thumb",
            Finger::Index => "index",
            Finger::Middle => "middle",
            Finger::Ring => "ring",
            Finger::Little => "little",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handedness {
    #[default]
    Right,
    Left,
}

/// Bone lengths in millimetres, indexed by finger then bone (base to tip).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoneLengths(pub [[f64; JOINTS_PER_FINGER]; FINGER_COUNT]);

impl Default for BoneLengths {
    fn default() -> Self {
        Self([
            [52.0, 43.0, 35.0, 32.0], // thumb
            [86.0, 42.0, 34.0, 29.0], // index
            [78.0, 48.0, 34.0, 28.0], // middle
            [77.0, 50.0, 32.0, 29.0], // ring
            [77.0, 29.0, 21.0, 23.0], // little
        ])
    }
}

impl BoneLengths {
    pub fn finger(&self, finger: Finger) -> &[f64; JOINTS_PER_FINGER] {
        &self.0[finger.index()]
    }

    /// Length of the whole finger chain.
    pub fn chain_length(&self, finger: Finger) -> f64 {
        self.finger(finger).iter().sum()
    }
}

/// Resting splay of each finger as X, Y, Z angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanonicalAngles(pub [[f64; 3]; FINGER_COUNT]);

impl CanonicalAngles {
    pub fn for_hand(handedness: Handedness) -> Self {
        match handedness {
            Handedness::Right => Self([
                [0.0, 0.2, 0.785],  // thumb
                [0.0, 0.0, 0.3925], // index
                [0.0, 0.0, 0.0],    // middle
                [0.0, 0.0, 5.8875], // ring
                [0.0, 0.0, 5.495],  // little
            ]),
            // TODO: derive a mirrored splay table once left-hand labels are available.
            Handedness::Left => Self([[0.0; 3]; FINGER_COUNT]),
        }
    }

    pub fn finger(&self, finger: Finger) -> [f64; 3] {
        self.0[finger.index()]
    }
}

impl Default for CanonicalAngles {
    fn default() -> Self {
        Self::for_hand(Handedness::Right)
    }
}

/// Immutable skeleton description passed to every evaluation and fit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HandSkeleton {
    bone_lengths: BoneLengths,
    canonical_angles: CanonicalAngles,
}

impl HandSkeleton {
    /// Builds a skeleton, rejecting non-positive or non-finite bone lengths
    /// and non-finite splay angles.
    pub fn new(
        bone_lengths: BoneLengths,
        canonical_angles: CanonicalAngles,
    ) -> KinematicsResult<Self> {
        let skeleton = Self {
            bone_lengths,
            canonical_angles,
        };
        skeleton.validate()?;
        Ok(skeleton)
    }

    /// Checks the tables of a skeleton obtained without [`HandSkeleton::new`],
    /// e.g. through deserialization.
    pub fn validate(&self) -> KinematicsResult<()> {
        for finger in Finger::ALL {
            for (bone, &length) in self.bone_lengths.finger(finger).iter().enumerate() {
                if !length.is_finite() || length <= 0.0 {
                    return Err(KinematicsError::InvalidParameter(format!(
                        "{} bone {bone} has length {length}, expected a positive value",
                        finger.name()
                    )));
                }
            }
            if self.canonical_angles.finger(finger).iter().any(|a| !a.is_finite()) {
                return Err(KinematicsError::InvalidParameter(format!(
                    "{} canonical angles must be finite",
                    finger.name()
                )));
            }
        }
        Ok(())
    }

    /// Reference bone lengths with the splay table for `handedness`.
    pub fn for_hand(handedness: Handedness) -> Self {
        Self {
            bone_lengths: BoneLengths::default(),
            canonical_angles: CanonicalAngles::for_hand(handedness),
        }
    }

    pub fn bone_lengths(&self) -> &BoneLengths {
        &self.bone_lengths
    }

    pub fn canonical_angles(&self) -> &CanonicalAngles {
        &self.canonical_angles
    }
}
