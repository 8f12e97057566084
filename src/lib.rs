//! Forward-kinematics hand skeleton and joint-angle fitter.
//!
//! A hand is described by 26 parameters: three wrist rotations, twenty finger
//! joint angles and a root translation. Evaluating the model yields the 3D
//! positions of the twenty finger joints; the fitter recovers the parameters
//! from observed joint positions by gradient descent on an L1 position energy
//! plus a soft joint-limit penalty.
//!
//! - [`evaluate`] / [`evaluate_with_jacobian`] - angle vector to joint positions
//! - [`PositionEnergy`], [`LimitEnergy`], [`TotalEnergy`] - objectives with analytic gradients
//! - [`fit`] / [`Fitter`] - fixed-iteration gradient descent with a loss trace
//! - [`labels`] - joint position labels from the synthetic hands dataset
//! - [`data::FitExporter`] - CSV, JSON and HTML output of a fit
//!
//! # Quick Start
//!
//! ```
//! use hand_fitter::{fit, AngleVector, FitParams, HandSkeleton, TotalEnergy};
//! use hand_fitter::reference::example_target_matrix2;
//!
//! let skeleton = HandSkeleton::default();
//! let target = example_target_matrix2();
//! let params = FitParams::new()
//!     .with_max_iterations(200)
//!     .with_learning_rate(1e-5);
//!
//! let outcome = fit(
//!     &TotalEnergy::default(),
//!     &target,
//!     &skeleton,
//!     &AngleVector::uniform(0.001),
//!     &params,
//! )
//! .unwrap();
//!
//! println!("final loss: {:?}", outcome.final_loss());
//! ```

// Library code propagates errors; tests may unwrap.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

pub mod angles;
pub mod chain;
pub mod config;
pub mod data;
pub mod energy;
mod error;
pub mod fitter;
pub mod labels;
pub mod pose;
pub mod reference;
pub mod rotation;
pub mod skeleton;

pub use angles::{AngleVector, ParamVector, ANGLE_COUNT, PARAM_COUNT};
pub use config::AppConfig;
pub use energy::{Energy, EnergyKind, LimitEnergy, PositionEnergy, TotalEnergy};
pub use error::{KinematicsError, KinematicsResult};
pub use fitter::{fit, FitOutcome, FitParams, FitState, Fitter, LossSample};
pub use pose::{canonical_pose, evaluate, evaluate_with_jacobian, HandPose};
pub use rotation::{rotate, Axis};
pub use skeleton::{Finger, HandSkeleton, Handedness};
