//! Joint position labels as shipped with the synthetic hands dataset.
//!
//! A label file holds one line of comma-separated coordinates, `x, y, z` per
//! joint, root first. Only the first line is read.

use crate::skeleton::HAND_JOINT_COUNT;
use crate::{KinematicsError, KinematicsResult};
use nalgebra::DMatrix;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// Joints in a label line: the root plus the 20 finger joints.
pub const LABEL_JOINT_COUNT: usize = HAND_JOINT_COUNT + 1;

/// Parses one label line into a `num_joints x 3` matrix.
pub fn parse_label_line(line: &str, num_joints: usize) -> KinematicsResult<DMatrix<f64>> {
    let values = line
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| KinematicsError::InvalidLabel(format!("'{token}' is not a number")))
        })
        .collect::<KinematicsResult<Vec<f64>>>()?;

    if values.len() != num_joints * 3 {
        return Err(KinematicsError::InvalidLabel(format!(
            "expected {} values for {num_joints} joints, found {}",
            num_joints * 3,
            values.len()
        )));
    }

    Ok(DMatrix::from_row_slice(num_joints, 3, &values))
}

/// Reads the first line of a label file.
pub fn read_label_file(path: impl AsRef<Path>, num_joints: usize) -> KinematicsResult<DMatrix<f64>> {
    let path = path.as_ref();
    let mut line = String::new();
    BufReader::new(File::open(path)?).read_line(&mut line)?;
    debug!(path = %path.display(), "read joint label");
    parse_label_line(&line, num_joints)
}

/// Expresses every joint relative to the first row; the root becomes zero.
pub fn relative_to_root(joints: &DMatrix<f64>) -> DMatrix<f64> {
    if joints.nrows() == 0 {
        return joints.clone();
    }
    let root = joints.row(0).into_owned();
    let mut relative = joints.clone();
    for mut row in relative.row_iter_mut() {
        row -= &root;
    }
    relative
}

/// Removes the root row.
pub fn drop_root(joints: &DMatrix<f64>) -> DMatrix<f64> {
    if joints.nrows() == 0 {
        return joints.clone();
    }
    joints.clone().remove_row(0)
}

/// Turns a 21-joint label into a fitting target: relative to the root and
/// without the root row, so the result is 20x3.
pub fn target_from_label(joints: &DMatrix<f64>) -> KinematicsResult<DMatrix<f64>> {
    if joints.shape() != (LABEL_JOINT_COUNT, 3) {
        return Err(KinematicsError::ShapeMismatch {
            rows: joints.nrows(),
            cols: joints.ncols(),
        });
    }
    Ok(drop_root(&relative_to_root(joints)))
}
