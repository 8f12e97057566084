//! Regression tests for the public fitting API.
//!
//! - Model: evaluation through the crate root re-exports
//! - Energy: objective values and shape handling
//! - Fitting: the reference scenario and independent concurrent fits
//! - I/O: labels in, configuration round trip, exported results out

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use hand_fitter::reference::{example_target_matrix, example_target_matrix2};
use hand_fitter::{
    canonical_pose, evaluate, fit, AngleVector, Energy, FitParams, HandSkeleton, KinematicsError,
    LimitEnergy, PositionEnergy, TotalEnergy,
};

mod model {
    use super::*;
    use hand_fitter::{rotate, Axis, Finger};
    use nalgebra::Vector3;

    #[test]
    fn zero_angle_leaves_point_untouched() {
        let point = Vector3::new(12.5, -3.0, 7.25);
        for axis in Axis::ALL {
            assert_eq!(rotate(axis, &point, 0.0), point);
            assert_eq!(rotate(axis, &point, 5e-7), point);
        }
    }

    #[test]
    fn canonical_pose_spans_bone_lengths() {
        let skeleton = HandSkeleton::default();
        let pose = canonical_pose(&skeleton);
        for finger in Finger::ALL {
            let tip = pose.joint(finger, 3);
            let expected = skeleton.bone_lengths().chain_length(finger);
            assert!((tip.norm() - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn evaluation_output_shape() {
        let pose = evaluate(&AngleVector::uniform(0.001), &HandSkeleton::default());
        assert_eq!(pose.to_matrix(false).shape(), (20, 3));
        assert_eq!(pose.to_matrix(true).shape(), (21, 3));
        assert_eq!(pose.bone_segments().len(), 20);
    }
}

mod energy {
    use super::*;
    use nalgebra::DMatrix;

    #[test]
    fn reference_targets_are_valid() {
        let skeleton = HandSkeleton::default();
        let theta = AngleVector::uniform(0.001);
        for target in [example_target_matrix(), example_target_matrix2()] {
            let loss = TotalEnergy::default().value(&theta, &target, &skeleton).unwrap();
            assert!(loss.is_finite());
            assert!(loss > 0.0);
        }
    }

    #[test]
    fn limit_term_vanishes_for_small_positive_angles() {
        let theta = AngleVector::uniform(0.001);
        let value = LimitEnergy::default()
            .value(&theta, &example_target_matrix2(), &HandSkeleton::default())
            .unwrap();
        assert_eq!(value, 0.0);
    }

    #[test]
    fn wrong_shape_is_reported() {
        let err = PositionEnergy
            .value(&AngleVector::zeros(), &DMatrix::zeros(20, 4), &HandSkeleton::default())
            .unwrap_err();
        assert!(matches!(err, KinematicsError::ShapeMismatch { rows: 20, cols: 4 }));
        assert!(err.to_string().contains("20x4"));
    }
}

mod fitting {
    use super::*;
    use std::thread;

    #[test]
    fn reference_fit_improves_loss() {
        let skeleton = HandSkeleton::default();
        let target = example_target_matrix2();
        let initial = AngleVector::uniform(0.001);
        let energy = TotalEnergy::default();
        let params = FitParams::new()
            .with_max_iterations(10_000)
            .with_learning_rate(1e-5)
            .with_log_interval(10);

        let initial_loss = energy.value(&initial, &target, &skeleton).unwrap();
        let outcome = fit(&energy, &target, &skeleton, &initial, &params).unwrap();

        assert_eq!(outcome.iterations, 10_000);
        assert_eq!(outcome.losses.len(), 1_000);
        assert!(!outcome.cancelled);

        let final_loss = outcome.final_loss().unwrap();
        assert!(
            final_loss < initial_loss,
            "final loss {final_loss} is not below initial loss {initial_loss}"
        );
        let end_loss = energy.value(&outcome.theta, &target, &skeleton).unwrap();
        assert!(end_loss < initial_loss);
    }

    #[test]
    fn zero_iteration_fit_is_identity() {
        let initial = AngleVector::uniform(0.001);
        let outcome = fit(
            &TotalEnergy::default(),
            &example_target_matrix2(),
            &HandSkeleton::default(),
            &initial,
            &FitParams::new().with_max_iterations(0),
        )
        .unwrap();
        assert_eq!(outcome.theta, initial);
        assert!(outcome.losses.is_empty());
    }

    #[test]
    fn concurrent_fits_are_independent() {
        let params = FitParams::new()
            .with_max_iterations(200)
            .with_learning_rate(1e-5)
            .with_log_interval(20);
        let run = |target: nalgebra::DMatrix<f64>, params: FitParams| {
            fit(
                &TotalEnergy::default(),
                &target,
                &HandSkeleton::default(),
                &AngleVector::uniform(0.001),
                &params,
            )
            .unwrap()
        };

        let sequential = run(example_target_matrix(), params.clone());
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let params = params.clone();
                thread::spawn(move || run(example_target_matrix(), params))
            })
            .collect();

        for handle in handles {
            let outcome = handle.join().unwrap();
            assert_eq!(outcome.theta, sequential.theta);
            assert_eq!(outcome.losses, sequential.losses);
        }
    }
}

mod io {
    use super::*;
    use hand_fitter::data::FitExporter;
    use hand_fitter::labels::{read_label_file, target_from_label, LABEL_JOINT_COUNT};
    use hand_fitter::AppConfig;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn label_to_fit_to_export() {
        let dir = TempDir::new().unwrap();
        let skeleton = HandSkeleton::default();

        // Label written in absolute coordinates around a displaced root.
        let mut truth = AngleVector::uniform(0.2);
        truth.set_root_translation(nalgebra::Vector3::new(100.0, -50.0, 400.0));
        let joints = evaluate(&truth, &skeleton).to_matrix(true);
        let line = joints
            .row_iter()
            .map(|row| format!("{},{},{}", row[0], row[1], row[2]))
            .collect::<Vec<_>>()
            .join(",");
        let label_path = dir.path().join("0001_joint_pos.txt");
        writeln!(std::fs::File::create(&label_path).unwrap(), "{line}").unwrap();

        let label = read_label_file(&label_path, LABEL_JOINT_COUNT).unwrap();
        let target = target_from_label(&label).unwrap();
        assert_eq!(target.shape(), (20, 3));

        // Relative to the root the label matches the untranslated pose.
        let mut untranslated = truth;
        untranslated.set_root_translation(nalgebra::Vector3::zeros());
        let loss = PositionEnergy.value(&untranslated, &target, &skeleton).unwrap();
        assert!(loss < 1e-6);

        let params = FitParams::new().with_max_iterations(20).with_learning_rate(1e-5);
        let outcome = fit(&TotalEnergy::default(), &target, &skeleton, &untranslated, &params).unwrap();
        let pose = evaluate(&outcome.theta, &skeleton);

        let exporter = FitExporter::new(dir.path(), Some("label_fit".to_string()));
        let session = exporter.export_all(&outcome, &pose, &target).unwrap();
        for file in ["loss_trace.csv", "joint_positions.csv", "theta.json", "report.html"] {
            assert!(session.join(file).exists(), "{file} missing");
        }
    }

    #[test]
    fn config_round_trip_drives_fit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let mut config = AppConfig::default();
        config.fit = FitParams::new().with_max_iterations(5).with_log_interval(2);
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        let outcome = fit(
            &loaded.energy,
            &example_target_matrix2(),
            &loaded.skeleton,
            &AngleVector::uniform(loaded.initial_angle),
            &loaded.fit,
        )
        .unwrap();
        let logged: Vec<usize> = outcome.losses.iter().map(|s| s.iteration).collect();
        assert_eq!(logged, vec![0, 2, 4]);
    }
}
