//! Example 20x3 target matrices (millimetres, no root row) recorded from the
//! synthetic hands dataset. Useful for smoke tests and demos.

use nalgebra::DMatrix;

const EXAMPLE_TARGET_1: [[f64; 3]; 20] = [
    [3.81632347e+01, 1.14704266e+01, -3.37704353e+01],
    [6.10587921e+01, 2.33903408e+01, -6.82850800e+01],
    [8.05751648e+01, 4.75567703e+01, -8.45160522e+01],
    [9.82698898e+01, 7.10361176e+01, -9.79136353e+01],
    [8.31332245e+01, 1.65777664e+01, -1.59413128e+01],
    [1.18601105e+02, 3.94201927e+01, -2.28066750e+01],
    [1.35169754e+02, 6.50885391e+01, -3.82870293e+01],
    [1.42985275e+02, 8.90216675e+01, -5.33211937e+01],
    [7.25996475e+01, 2.82628822e+01, 5.69833565e+00],
    [1.12488670e+02, 5.47043686e+01, -1.17148340e+00],
    [1.34326385e+02, 7.71675949e+01, -1.57214651e+01],
    [1.37153976e+02, 9.35943451e+01, -3.92123222e+01],
    [6.31909981e+01, 3.92918282e+01, 2.07988148e+01],
    [9.71118088e+01, 7.10300827e+01, 1.67733021e-02],
    [1.13407402e+02, 9.21796188e+01, -1.90750809e+01],
    [1.07807945e+02, 1.04189819e+02, -4.57797546e+01],
    [5.04926300e+01, 4.86349411e+01, 3.22667580e+01],
    [6.29547806e+01, 7.22900848e+01, 1.90970001e+01],
    [7.12234039e+01, 8.81342850e+01, 7.43657589e+00],
    [8.01767883e+01, 1.06043503e+02, -4.03247738e+00],
];

const EXAMPLE_TARGET_2: [[f64; 3]; 20] = [
    [28.34034538269043, -20.943307876586914, 3.6773264408111572],
    [56.796321868896484, -33.193267822265625, 3.1326169967651367],
    [77.83787536621094, -49.648651123046875, 8.064435005187988],
    [92.7770767211914, -69.77127075195312, 12.059499740600586],
    [35.77924346923828, -65.538330078125, -19.885385513305664],
    [44.29819107055664, -93.25546264648438, -23.226430892944336],
    [46.753971099853516, -114.85948181152344, -17.873868942260742],
    [52.39909744262695, -130.5230712890625, -8.741547584533691],
    [16.363204956054688, -69.00721740722656, -12.813824653625488],
    [22.628355026245117, -110.04674530029297, -22.0496826171875],
    [32.091888427734375, -133.3424072265625, -19.088516235351562],
    [39.751853942871094, -147.41351318359375, -7.428798198699951],
    [3.7158586978912354, -72.5374526977539, -7.045773506164551],
    [10.957385063171387, -110.35797882080078, -6.14526891708374],
    [14.709113121032715, -133.33056640625, -0.15571321547031403],
    [25.421911239624023, -137.51380920410156, 12.537755966186523],
    [-9.418401718139648, -71.76628112792969, 2.5787229537963867],
    [-6.334733009338379, -94.2793197631836, 17.664888381958008],
    [-4.511924743652344, -107.78968048095703, 30.895553588867188],
    [1.16363525390625, -124.62622833251953, 39.50660705566406],
];

fn to_matrix(rows: &[[f64; 3]; 20]) -> DMatrix<f64> {
    DMatrix::from_fn(rows.len(), 3, |r, c| rows[r][c])
}

/// Hand with fingers reaching along +X and +Y.
pub fn example_target_matrix() -> DMatrix<f64> {
    to_matrix(&EXAMPLE_TARGET_1)
}

/// Hand pointing along -Y; the default target of the fitting demo.
pub fn example_target_matrix2() -> DMatrix<f64> {
    to_matrix(&EXAMPLE_TARGET_2)
}

/// Looks up an example target by its 1-based number.
pub fn example_target(number: u8) -> Option<DMatrix<f64>> {
    match number {
        1 => Some(example_target_matrix()),
        2 => Some(example_target_matrix2()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes() {
        assert_eq!(example_target_matrix().shape(), (20, 3));
        assert_eq!(example_target_matrix2().shape(), (20, 3));
        assert!(example_target(3).is_none());
    }

    #[test]
    fn test_row_order() {
        let target = example_target_matrix2();
        assert_eq!(target[(0, 0)], 28.34034538269043);
        assert_eq!(target[(19, 2)], 39.50660705566406);
    }
}
