// src/data.rs
use crate::angles::AngleVector;
use crate::energy::target_has_root;
use crate::fitter::{FitOutcome, LossSample};
use crate::pose::HandPose;
use crate::skeleton::{Finger, JOINTS_PER_FINGER};
use anyhow::Result;
use chrono::Local;
use csv::Writer;
use nalgebra::{DMatrix, Vector3};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Serialize)]
struct JointRecord {
    finger: &'static str,
    joint: usize,
    predicted_x: f64,
    predicted_y: f64,
    predicted_z: f64,
    target_x: f64,
    target_y: f64,
    target_z: f64,
    error: f64,
}

#[derive(Debug, Serialize)]
struct ThetaRecord {
    wrist_rotation: [f64; 3],
    fingers: Vec<FingerAngles>,
    root_translation: [f64; 3],
    params: Vec<f64>,
}

#[derive(Debug, Serialize)]
struct FingerAngles {
    finger: &'static str,
    angles: [f64; JOINTS_PER_FINGER],
}

/// Distance between fitted and target finger joints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointErrorStats {
    pub mean: f64,
    pub max: f64,
}

impl JointErrorStats {
    pub fn compute(pose: &HandPose, target: &DMatrix<f64>) -> Result<Self> {
        let errors = joint_errors(pose, target)?;
        let max = errors.iter().copied().fold(0.0, f64::max);
        let mean = errors.iter().sum::<f64>() / errors.len() as f64;
        Ok(Self { mean, max })
    }
}

fn target_joint(target: &DMatrix<f64>, offset: usize, index: usize) -> Vector3<f64> {
    let row = index + offset;
    Vector3::new(target[(row, 0)], target[(row, 1)], target[(row, 2)])
}

fn joint_errors(pose: &HandPose, target: &DMatrix<f64>) -> Result<Vec<f64>> {
    let offset = usize::from(target_has_root(target)?);
    Ok(pose
        .joints
        .iter()
        .enumerate()
        .map(|(i, joint)| (joint - target_joint(target, offset, i)).norm())
        .collect())
}

/// Writes the results of one fit into `<output_dir>/<session_name>/`.
pub struct FitExporter {
    output_dir: PathBuf,
    session_name: String,
}

impl FitExporter {
    pub fn new(output_dir: impl AsRef<Path>, session_name: Option<String>) -> Self {
        let session_name = session_name.unwrap_or_else(|| {
            format!("fit_{}", Local::now().format("%Y%m%d_%H%M%S"))
        });

        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session_name,
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn session_dir(&self) -> PathBuf {
        self.output_dir.join(&self.session_name)
    }

    fn create_file(&self, name: &str) -> Result<(PathBuf, File)> {
        let dir = self.session_dir();
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(name);
        let file = File::create(&path)?;
        Ok((path, file))
    }

    /// Loss trace as `iteration,loss` rows.
    pub fn export_losses(&self, losses: &[LossSample]) -> Result<PathBuf> {
        let (path, file) = self.create_file("loss_trace.csv")?;
        let mut writer = Writer::from_writer(file);
        for sample in losses {
            writer.serialize(sample)?;
        }
        writer.flush()?;
        Ok(path)
    }

    /// Fitted and target position of every finger joint.
    pub fn export_pose(&self, pose: &HandPose, target: &DMatrix<f64>) -> Result<PathBuf> {
        let offset = usize::from(target_has_root(target)?);
        let (path, file) = self.create_file("joint_positions.csv")?;
        let mut writer = Writer::from_writer(file);

        for finger in Finger::ALL {
            for (joint, predicted) in pose.finger(finger).iter().enumerate() {
                let expected =
                    target_joint(target, offset, finger.index() * JOINTS_PER_FINGER + joint);
                writer.serialize(JointRecord {
                    finger: finger.name(),
                    joint,
                    predicted_x: predicted.x,
                    predicted_y: predicted.y,
                    predicted_z: predicted.z,
                    target_x: expected.x,
                    target_y: expected.y,
                    target_z: expected.z,
                    error: (predicted - expected).norm(),
                })?;
            }
        }

        writer.flush()?;
        Ok(path)
    }

    pub fn export_theta(&self, theta: &AngleVector) -> Result<PathBuf> {
        let translation = theta.root_translation();
        let record = ThetaRecord {
            wrist_rotation: theta.wrist_rotation(),
            fingers: Finger::ALL
                .iter()
                .map(|&finger| FingerAngles {
                    finger: finger.name(),
                    angles: theta.finger_angles(finger),
                })
                .collect(),
            root_translation: [translation.x, translation.y, translation.z],
            params: theta.as_slice().to_vec(),
        };

        let (path, file) = self.create_file("theta.json")?;
        serde_json::to_writer_pretty(file, &record)?;
        Ok(path)
    }

    pub fn generate_report(
        &self,
        outcome: &FitOutcome,
        pose: &HandPose,
        target: &DMatrix<f64>,
    ) -> Result<PathBuf> {
        let stats = JointErrorStats::compute(pose, target)?;
        let html_content = self.create_html_report(outcome, &stats);
        let (path, mut file) = self.create_file("report.html")?;
        file.write_all(html_content.as_bytes())?;
        Ok(path)
    }

    /// Writes every artifact and returns the session directory.
    pub fn export_all(
        &self,
        outcome: &FitOutcome,
        pose: &HandPose,
        target: &DMatrix<f64>,
    ) -> Result<PathBuf> {
        self.export_losses(&outcome.losses)?;
        self.export_pose(pose, target)?;
        self.export_theta(&outcome.theta)?;
        self.generate_report(outcome, pose, target)?;

        let dir = self.session_dir();
        info!(path = %dir.display(), "exported fit");
        Ok(dir)
    }

    fn create_html_report(&self, outcome: &FitOutcome, stats: &JointErrorStats) -> String {
        let first_loss = outcome
            .losses
            .first()
            .map_or_else(|| "n/a".to_string(), |s| format!("{:.3}", s.loss));
        let final_loss = outcome
            .final_loss()
            .map_or_else(|| "n/a".to_string(), |loss| format!("{loss:.3}"));
        let status = if outcome.cancelled { "Cancelled" } else { "Completed" };

        let rows: String = outcome
            .losses
            .iter()
            .map(|s| format!("<tr><td>{}</td><td>{:.4}</td></tr>", s.iteration, s.loss))
            .collect();

        format!(r#"
<!DOCTYPE html>
<html>
<head>
    <title>Hand Fit Report - {}</title>
    <style>
        body {{ font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; margin: 40px; background: #f5f5f5; }}
        h1 {{ color: #333; }}
        .stats {{ background: white; padding: 20px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }}
        .stat-item {{ margin: 10px 0; }}
        .stat-label {{ font-weight: bold; color: #666; }}
        .stat-value {{ color: #4682EA; font-size: 1.2em; }}
        table {{ border-collapse: collapse; margin-top: 20px; }}
        td, th {{ padding: 4px 12px; border-bottom: 1px solid #ddd; text-align: right; }}
    </style>
</head>
<body>
    <h1>Hand Skeleton Fit Report</h1>
    <div class="stats">
        <h2>Session: {}</h2>
        <div class="stat-item">
            <span class="stat-label">Status:</span>
            <span class="stat-value">{}</span>
        </div>
        <div class="stat-item">
            <span class="stat-label">Iterations:</span>
            <span class="stat-value">{}</span>
        </div>
        <div class="stat-item">
            <span class="stat-label">First Logged Loss:</span>
            <span class="stat-value">{}</span>
        </div>
        <div class="stat-item">
            <span class="stat-label">Final Loss:</span>
            <span class="stat-value">{}</span>
        </div>
        <div class="stat-item">
            <span class="stat-label">Mean Joint Error:</span>
            <span class="stat-value">{:.2} mm</span>
        </div>
        <div class="stat-item">
            <span class="stat-label">Max Joint Error:</span>
            <span class="stat-value">{:.2} mm</span>
        </div>
        <table>
            <tr><th>Iteration</th><th>Loss</th></tr>
            {}
        </table>
    </div>
</body>
</html>
        "#,
            self.session_name,
            self.session_name,
            status,
            outcome.iterations,
            first_loss,
            final_loss,
            stats.mean,
            stats.max,
            rows
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::evaluate;
    use crate::skeleton::HandSkeleton;
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    fn sample_outcome() -> FitOutcome {
        FitOutcome {
            theta: AngleVector::uniform(0.2),
            losses: vec![
                LossSample { iteration: 0, loss: 120.5 },
                LossSample { iteration: 10, loss: 80.25 },
            ],
            iterations: 15,
            cancelled: false,
        }
    }

    #[test]
    fn test_session_layout() {
        let dir = TempDir::new().unwrap();
        let exporter = FitExporter::new(dir.path(), Some("demo".to_string()));
        assert_eq!(exporter.session_name(), "demo");
        assert_eq!(exporter.session_dir(), dir.path().join("demo"));

        let generated = FitExporter::new(dir.path(), None);
        assert!(generated.session_name().starts_with("fit_"));
    }

    #[test]
    fn test_export_all() {
        let dir = TempDir::new().unwrap();
        let skeleton = HandSkeleton::default();
        let outcome = sample_outcome();
        let pose = evaluate(&outcome.theta, &skeleton);
        let mut target = pose.to_matrix(true);
        target[(1, 0)] += 3.0;

        let exporter = FitExporter::new(dir.path(), Some("run".to_string()));
        let session = exporter.export_all(&outcome, &pose, &target).unwrap();

        let losses = std::fs::read_to_string(session.join("loss_trace.csv")).unwrap();
        let lines: Vec<&str> = losses.lines().collect();
        assert_eq!(lines, vec!["iteration,loss", "0,120.5", "10,80.25"]);

        let mut reader = csv::Reader::from_path(session.join("joint_positions.csv")).unwrap();
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 20);
        assert_eq!(&records[0][0], "thumb");
        let error: f64 = records[0][8].parse().unwrap();
        assert_relative_eq!(error, 3.0, epsilon = 1e-9);

        let theta: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(session.join("theta.json")).unwrap())
                .unwrap();
        assert_eq!(theta["params"].as_array().unwrap().len(), 26);
        assert_eq!(theta["fingers"][1]["finger"], "index");

        let report = std::fs::read_to_string(session.join("report.html")).unwrap();
        assert!(report.contains("Session: run"));
        assert!(report.contains("80.250"));
    }

    #[test]
    fn test_error_stats() {
        let skeleton = HandSkeleton::default();
        let pose = evaluate(&AngleVector::zeros(), &skeleton);
        let mut target = pose.to_matrix(false);
        target[(0, 2)] += 4.0;

        let stats = JointErrorStats::compute(&pose, &target).unwrap();
        assert_relative_eq!(stats.max, 4.0, epsilon = 1e-12);
        assert_relative_eq!(stats.mean, 0.2, epsilon = 1e-12);

        assert!(JointErrorStats::compute(&pose, &DMatrix::zeros(5, 3)).is_err());
    }
}
