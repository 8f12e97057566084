//! The parameter vector driving the hand model.
//!
//! Layout (26 entries):
//!
//! | range      | meaning                                             |
//! |------------|-----------------------------------------------------|
//! | `0..3`     | wrist rotation about X, Y, Z (radians)              |
//! | `3..23`    | finger joint angles, finger `f` joint `j` at `3 + 4f + j` |
//! | `23..26`   | root translation (millimetres)                      |

use crate::skeleton::{Finger, HAND_JOINT_COUNT, JOINTS_PER_FINGER};
use crate::{KinematicsError, KinematicsResult};
use nalgebra::{SVector, Vector3};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Rotation angles: wrist plus every finger joint.
pub const ANGLE_COUNT: usize = 3 + HAND_JOINT_COUNT;
/// Angles followed by the root translation.
pub const PARAM_COUNT: usize = ANGLE_COUNT + 3;

pub const WRIST_RANGE: Range<usize> = 0..3;
pub const FINGER_RANGE: Range<usize> = 3..ANGLE_COUNT;
pub const TRANSLATION_RANGE: Range<usize> = ANGLE_COUNT..PARAM_COUNT;

/// Dense vector over all model parameters; also used for gradients.
pub type ParamVector = SVector<f64, PARAM_COUNT>;

/// Index of a finger joint angle inside the parameter vector.
#[inline]
pub const fn finger_joint_index(finger: Finger, joint: usize) -> usize {
    FINGER_RANGE.start + finger.index() * JOINTS_PER_FINGER + joint
}

/// Wrist rotation, finger joint angles and root translation of one hand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<f64>", try_from = "Vec<f64>")]
pub struct AngleVector(ParamVector);

impl Default for AngleVector {
    fn default() -> Self {
        Self::zeros()
    }
}

impl AngleVector {
    pub fn zeros() -> Self {
        Self(ParamVector::zeros())
    }

    /// Every angle set to `angle`, root translation at the origin.
    pub fn uniform(angle: f64) -> Self {
        let mut theta = Self::zeros();
        for i in 0..ANGLE_COUNT {
            theta.0[i] = angle;
        }
        theta
    }

    pub fn from_vector(params: ParamVector) -> Self {
        Self(params)
    }

    /// Accepts the full 26-entry layout, or the 23 angles alone in which case
    /// the root translation is zero.
    pub fn from_slice(values: &[f64]) -> KinematicsResult<Self> {
        match values.len() {
            PARAM_COUNT | ANGLE_COUNT => {
                let mut theta = Self::zeros();
                theta.0.as_mut_slice()[..values.len()].copy_from_slice(values);
                Ok(theta)
            }
            provided => Err(KinematicsError::ParameterCount {
                expected: PARAM_COUNT,
                provided,
            }),
        }
    }

    pub fn as_vector(&self) -> &ParamVector {
        &self.0
    }

    pub fn as_slice(&self) -> &[f64] {
        self.0.as_slice()
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        self.0.as_mut_slice()
    }

    pub fn wrist_rotation(&self) -> [f64; 3] {
        [self.0[0], self.0[1], self.0[2]]
    }

    pub fn set_wrist_rotation(&mut self, angles: [f64; 3]) {
        for (i, angle) in angles.into_iter().enumerate() {
            self.0[WRIST_RANGE.start + i] = angle;
        }
    }

    pub fn finger_angles(&self, finger: Finger) -> [f64; JOINTS_PER_FINGER] {
        let start = finger_joint_index(finger, 0);
        [
            self.0[start],
            self.0[start + 1],
            self.0[start + 2],
            self.0[start + 3],
        ]
    }

    pub fn set_finger_angle(&mut self, finger: Finger, joint: usize, angle: f64) {
        self.0[finger_joint_index(finger, joint)] = angle;
    }

    /// The 23 rotation angles (wrist first).
    pub fn angles(&self) -> &[f64] {
        &self.0.as_slice()[..ANGLE_COUNT]
    }

    pub fn root_translation(&self) -> Vector3<f64> {
        Vector3::new(self.0[23], self.0[24], self.0[25])
    }

    pub fn set_root_translation(&mut self, translation: Vector3<f64>) {
        self.0[TRANSLATION_RANGE.start] = translation.x;
        self.0[TRANSLATION_RANGE.start + 1] = translation.y;
        self.0[TRANSLATION_RANGE.start + 2] = translation.z;
    }

    /// One gradient descent step: `theta -= learning_rate * gradient`.
    pub fn descend(&mut self, gradient: &ParamVector, learning_rate: f64) {
        self.0 -= gradient * learning_rate;
    }
}

impl From<AngleVector> for Vec<f64> {
    fn from(theta: AngleVector) -> Self {
        theta.0.as_slice().to_vec()
    }
}

impl TryFrom<Vec<f64>> for AngleVector {
    type Error = KinematicsError;

    fn try_from(values: Vec<f64>) -> KinematicsResult<Self> {
        Self::from_slice(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_constants() {
        assert_eq!(ANGLE_COUNT, 23);
        assert_eq!(PARAM_COUNT, 26);
        assert_eq!(finger_joint_index(Finger::Thumb, 0), 3);
        assert_eq!(finger_joint_index(Finger::Little, 3), 22);
    }

    #[test]
    fn test_accessors() {
        let values: Vec<f64> = (0..PARAM_COUNT).map(|i| i as f64).collect();
        let theta = AngleVector::from_slice(&values).unwrap();

        assert_eq!(theta.wrist_rotation(), [0.0, 1.0, 2.0]);
        assert_eq!(theta.finger_angles(Finger::Index), [7.0, 8.0, 9.0, 10.0]);
        assert_eq!(theta.root_translation(), Vector3::new(23.0, 24.0, 25.0));
        assert_eq!(theta.angles().len(), ANGLE_COUNT);
    }

    #[test]
    fn test_angle_only_layout_pads_translation() {
        let theta = AngleVector::from_slice(&[0.001; ANGLE_COUNT]).unwrap();
        assert_eq!(theta, AngleVector::uniform(0.001));
        assert_eq!(theta.root_translation(), Vector3::zeros());
    }

    #[test]
    fn test_wrong_length_rejected() {
        let err = AngleVector::from_slice(&[0.0; 20]).unwrap_err();
        assert!(matches!(
            err,
            KinematicsError::ParameterCount {
                expected: 26,
                provided: 20
            }
        ));
    }

    #[test]
    fn test_setters() {
        let mut theta = AngleVector::zeros();
        theta.set_wrist_rotation([0.1, 0.2, 0.3]);
        theta.set_finger_angle(Finger::Ring, 2, 0.7);
        theta.set_root_translation(Vector3::new(1.0, 2.0, 3.0));

        assert_eq!(theta.wrist_rotation(), [0.1, 0.2, 0.3]);
        assert_eq!(theta.finger_angles(Finger::Ring)[2], 0.7);
        assert_eq!(theta.as_slice()[finger_joint_index(Finger::Ring, 2)], 0.7);
        assert_eq!(theta.root_translation(), Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_descend() {
        let mut theta = AngleVector::uniform(1.0);
        let gradient = ParamVector::from_element(2.0);
        theta.descend(&gradient, 0.25);
        assert_eq!(theta.as_slice()[0], 0.5);
        assert_eq!(theta.as_slice()[25], -0.5);
    }

    #[test]
    fn test_serde_as_flat_list() {
        let theta = AngleVector::uniform(0.5);
        let json = serde_json::to_string(&theta).unwrap();
        let back: AngleVector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, theta);
        assert!(serde_json::from_str::<AngleVector>("[1.0, 2.0]").is_err());
    }
}
