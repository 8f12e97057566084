//! Gradient descent over the angle vector.
//!
//! The fitter runs for exactly `max_iterations` steps of
//! `theta -= learning_rate * gradient`; there is no tolerance-based stop.
//! After every step whose index is a multiple of `log_interval` the loss is
//! recomputed and recorded.

use crate::angles::AngleVector;
use crate::energy::{target_has_root, Energy};
use crate::skeleton::HandSkeleton;
use crate::{KinematicsError, KinematicsResult};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Parameters for a fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitParams {
    /// Number of descent steps (default: 1000).
    pub max_iterations: usize,
    /// Step size (default: 0.01).
    pub learning_rate: f64,
    /// Record the loss every this many steps (default: 10).
    pub log_interval: usize,
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            learning_rate: 0.01,
            log_interval: 10,
        }
    }
}

impl FitParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    #[must_use]
    pub const fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    #[must_use]
    pub const fn with_log_interval(mut self, log_interval: usize) -> Self {
        self.log_interval = log_interval;
        self
    }

    /// # Errors
    ///
    /// Returns [`KinematicsError::InvalidParameter`] for a zero log interval or
    /// a learning rate that is not a positive finite number.
    pub fn validate(&self) -> KinematicsResult<()> {
        if self.log_interval == 0 {
            return Err(KinematicsError::InvalidParameter(
                "log_interval must be at least 1".to_string(),
            ));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(KinematicsError::InvalidParameter(format!(
                "learning_rate must be positive and finite, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// One recorded loss value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossSample {
    pub iteration: usize,
    pub loss: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitState {
    Running,
    Done,
}

/// Final angle vector and loss trace of a fit.
#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub theta: AngleVector,
    pub losses: Vec<LossSample>,
    /// Steps actually taken.
    pub iterations: usize,
    /// Whether the run stopped early on a cancellation request.
    pub cancelled: bool,
}

impl FitOutcome {
    /// Last recorded loss, if any.
    pub fn final_loss(&self) -> Option<f64> {
        self.losses.last().map(|s| s.loss)
    }
}

/// Step-wise gradient descent over one angle vector.
///
/// Each fitter owns its angle vector and loss trace; independent fits can
/// run on separate threads.
pub struct Fitter<'a, E: Energy + ?Sized> {
    energy: &'a E,
    target: &'a DMatrix<f64>,
    skeleton: &'a HandSkeleton,
    params: FitParams,
    theta: AngleVector,
    losses: Vec<LossSample>,
    iteration: usize,
    state: FitState,
}

impl<'a, E: Energy + ?Sized> Fitter<'a, E> {
    /// # Errors
    ///
    /// Fails on invalid parameters or a target that is not 20x3 / 21x3.
    pub fn new(
        energy: &'a E,
        target: &'a DMatrix<f64>,
        skeleton: &'a HandSkeleton,
        initial: AngleVector,
        params: FitParams,
    ) -> KinematicsResult<Self> {
        params.validate()?;
        target_has_root(target)?;

        let state = if params.max_iterations == 0 {
            FitState::Done
        } else {
            FitState::Running
        };

        Ok(Self {
            energy,
            target,
            skeleton,
            theta: initial,
            losses: Vec::with_capacity(params.max_iterations.div_ceil(params.log_interval)),
            params,
            iteration: 0,
            state,
        })
    }

    pub fn state(&self) -> FitState {
        self.state
    }

    pub fn theta(&self) -> &AngleVector {
        &self.theta
    }

    pub fn losses(&self) -> &[LossSample] {
        &self.losses
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Current energy of the angle vector.
    ///
    /// # Errors
    ///
    /// Propagates errors from the energy function.
    pub fn loss(&self) -> KinematicsResult<f64> {
        self.energy.value(&self.theta, self.target, self.skeleton)
    }

    /// Performs one descent step. Returns the loss sample when this step is
    /// a logging step; does nothing once the fitter is done.
    ///
    /// # Errors
    ///
    /// Propagates errors from the energy function.
    pub fn step(&mut self) -> KinematicsResult<Option<LossSample>> {
        if self.state == FitState::Done {
            return Ok(None);
        }

        let (_, gradient) =
            self.energy
                .value_and_gradient(&self.theta, self.target, self.skeleton)?;
        self.theta.descend(&gradient, self.params.learning_rate);

        let iteration = self.iteration;
        self.iteration += 1;
        if self.iteration >= self.params.max_iterations {
            self.state = FitState::Done;
        }

        if iteration % self.params.log_interval != 0 {
            return Ok(None);
        }
        let sample = LossSample {
            iteration,
            loss: self.loss()?,
        };
        debug!(iteration, loss = sample.loss, "fit progress");
        self.losses.push(sample);
        Ok(Some(sample))
    }

    /// Runs to completion.
    ///
    /// # Errors
    ///
    /// Propagates errors from the energy function.
    pub fn run(self) -> KinematicsResult<FitOutcome> {
        self.run_with(None, |_, _| {})
    }

    /// Runs to completion or until `cancel` is set, calling `on_log` with
    /// every recorded sample and the angle vector at that point.
    ///
    /// # Errors
    ///
    /// Propagates errors from the energy function.
    pub fn run_with<F>(mut self, cancel: Option<&AtomicBool>, mut on_log: F) -> KinematicsResult<FitOutcome>
    where
        F: FnMut(&LossSample, &AngleVector),
    {
        info!(
            max_iterations = self.params.max_iterations,
            learning_rate = self.params.learning_rate,
            "starting fit"
        );

        let mut cancelled = false;
        while self.state == FitState::Running {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                warn!(iteration = self.iteration, "fit cancelled");
                cancelled = true;
                break;
            }
            if let Some(sample) = self.step()? {
                on_log(&sample, &self.theta);
            }
        }

        let outcome = FitOutcome {
            theta: self.theta,
            iterations: self.iteration,
            losses: self.losses,
            cancelled,
        };
        info!(
            iterations = outcome.iterations,
            final_loss = ?outcome.final_loss(),
            "fit finished"
        );
        Ok(outcome)
    }
}

/// Fits `initial` to `target` by minimising `energy`.
///
/// # Errors
///
/// Fails on invalid parameters, a malformed target, or an error raised by the
/// energy function. Nothing is retried.
pub fn fit<E: Energy + ?Sized>(
    energy: &E,
    target: &DMatrix<f64>,
    skeleton: &HandSkeleton,
    initial: &AngleVector,
    params: &FitParams,
) -> KinematicsResult<FitOutcome> {
    Fitter::new(energy, target, skeleton, *initial, params.clone())?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::{PositionEnergy, TotalEnergy};
    use crate::pose::evaluate;
    use crate::reference::example_target_matrix2;
    use nalgebra::Vector3;

    #[test]
    fn test_zero_iterations_returns_initial() {
        let skeleton = HandSkeleton::default();
        let target = example_target_matrix2();
        let initial = AngleVector::uniform(0.001);
        let params = FitParams::new().with_max_iterations(0);

        let outcome = fit(&TotalEnergy::default(), &target, &skeleton, &initial, &params).unwrap();
        assert_eq!(outcome.theta, initial);
        assert!(outcome.losses.is_empty());
        assert_eq!(outcome.iterations, 0);
        assert!(!outcome.cancelled);
        assert_eq!(outcome.final_loss(), None);
    }

    #[test]
    fn test_log_cadence() {
        let skeleton = HandSkeleton::default();
        let target = example_target_matrix2();
        let params = FitParams::new()
            .with_max_iterations(25)
            .with_learning_rate(1e-5)
            .with_log_interval(10);

        let outcome = fit(&PositionEnergy, &target, &skeleton, &AngleVector::uniform(0.001), &params).unwrap();
        let logged: Vec<usize> = outcome.losses.iter().map(|s| s.iteration).collect();
        assert_eq!(logged, vec![0, 10, 20]);
        assert_eq!(outcome.iterations, 25);
        assert!(outcome.losses.iter().all(|s| s.loss.is_finite()));
    }

    #[test]
    fn test_state_machine() {
        let skeleton = HandSkeleton::default();
        let target = example_target_matrix2();
        let energy = TotalEnergy::default();
        let params = FitParams::new().with_max_iterations(2).with_log_interval(1);
        let mut fitter =
            Fitter::new(&energy, &target, &skeleton, AngleVector::uniform(0.1), params).unwrap();

        assert_eq!(fitter.state(), FitState::Running);
        assert!(fitter.step().unwrap().is_some());
        assert_eq!(fitter.state(), FitState::Running);
        assert!(fitter.step().unwrap().is_some());
        assert_eq!(fitter.state(), FitState::Done);

        let theta = *fitter.theta();
        assert!(fitter.step().unwrap().is_none());
        assert_eq!(*fitter.theta(), theta);
        assert_eq!(fitter.losses().len(), 2);
        assert_eq!(fitter.iteration(), 2);
    }

    #[test]
    fn test_invalid_params() {
        let skeleton = HandSkeleton::default();
        let target = example_target_matrix2();
        let initial = AngleVector::zeros();

        let zero_interval = FitParams::new().with_log_interval(0);
        assert!(matches!(
            fit(&PositionEnergy, &target, &skeleton, &initial, &zero_interval),
            Err(KinematicsError::InvalidParameter(_))
        ));

        let bad_rate = FitParams::new().with_learning_rate(f64::NAN);
        assert!(fit(&PositionEnergy, &target, &skeleton, &initial, &bad_rate).is_err());
    }

    #[test]
    fn test_shape_mismatch_fails_before_running() {
        let skeleton = HandSkeleton::default();
        let target = DMatrix::zeros(21, 2);
        let params = FitParams::new().with_max_iterations(0);
        let err = fit(&PositionEnergy, &target, &skeleton, &AngleVector::zeros(), &params).unwrap_err();
        assert!(matches!(err, KinematicsError::ShapeMismatch { rows: 21, cols: 2 }));
    }

    #[test]
    fn test_moves_toward_shifted_pose() {
        let skeleton = HandSkeleton::default();
        let mut truth = AngleVector::uniform(0.3);
        truth.set_root_translation(Vector3::new(4.0, -3.0, 2.0));
        let target = evaluate(&truth, &skeleton).to_matrix(true);

        let initial = AngleVector::uniform(0.3);
        let params = FitParams::new()
            .with_max_iterations(500)
            .with_learning_rate(1e-6)
            .with_log_interval(50);
        let outcome = fit(&PositionEnergy, &target, &skeleton, &initial, &params).unwrap();

        let start = PositionEnergy.value(&initial, &target, &skeleton).unwrap();
        let end = outcome.final_loss().unwrap();
        assert!(end < start, "loss went from {start} to {end}");
    }

    #[test]
    fn test_cancel_stops_early() {
        let skeleton = HandSkeleton::default();
        let target = example_target_matrix2();
        let energy = TotalEnergy::default();
        let cancel = AtomicBool::new(false);
        let params = FitParams::new()
            .with_max_iterations(1000)
            .with_learning_rate(1e-5)
            .with_log_interval(5);

        let fitter =
            Fitter::new(&energy, &target, &skeleton, AngleVector::uniform(0.001), params).unwrap();
        let outcome = fitter
            .run_with(Some(&cancel), |sample, _| {
                if sample.iteration >= 20 {
                    cancel.store(true, Ordering::Relaxed);
                }
            })
            .unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.iterations, 21);
        assert_eq!(outcome.losses.last().unwrap().iteration, 20);
    }
}
