//! Newtonian kinematic models.

use crate::common::error::{FilterError, Result};
use crate::common::linalg::{block_diag, order_by_derivative};
use crate::kalman::KalmanFilter;
use nalgebra::DMatrix;

/// State transition of a single dimension with `order` derivatives,
/// built from the Taylor series: `F[i][j] = dt^(j-i) / (j-i)!`.
pub fn kinematic_state_transition(order: usize, dt: f64) -> DMatrix<f64> {
    let n = order + 1;
    let mut F = DMatrix::zeros(n, n);
    for i in 0..n {
        let mut term = 1.0;
        for j in i..n {
            if j > i {
                term *= dt / (j - i) as f64;
            }
            F[(i, j)] = term;
        }
    }
    F
}

/// Kalman filter for `dim` independent dimensions, each modelled with
/// `order` derivatives (0 = constant position, 1 = constant velocity,
/// 2 = constant acceleration). Measurement `i` observes the position of
/// dimension `i`, so `dim_z` may not exceed `dim`.
///
/// With `order_by_dim` the state is `[x x' y y']`, otherwise
/// `[x y x' y']`. `P`, `Q` and `R` are left at identity.
pub fn kinematic_kf(
    dim: usize,
    order: usize,
    dt: f64,
    dim_z: usize,
    order_by_dim: bool,
) -> Result<KalmanFilter> {
    if dim < 1 {
        return Err(FilterError::invalid("dim", dim, "must be 1 or more"));
    }
    if dim_z < 1 || dim_z > dim {
        return Err(FilterError::invalid("dim_z", dim_z, "must be between 1 and dim"));
    }
    if dt.is_nan() || dt <= 0.0 {
        return Err(FilterError::invalid("dt", dt, "must be positive"));
    }

    let block = order + 1;
    let mut kf = KalmanFilter::new(dim * block, dim_z, 0)?;

    let F = kinematic_state_transition(order, dt);
    kf.F = if order_by_dim {
        block_diag(&F, dim)
    } else {
        order_by_derivative(&F, dim)
    };

    for i in 0..dim_z {
        let column = if order_by_dim { i * block } else { i };
        kf.H[(i, column)] = 1.0;
    }

    tracing::debug!(dim, order, dim_z, "kinematic filter built");
    Ok(kf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_state_transition_taylor_terms() {
        let F = kinematic_state_transition(2, 0.5);
        let expected = DMatrix::from_row_slice(
            3,
            3,
            &[1.0, 0.5, 0.125, 0.0, 1.0, 0.5, 0.0, 0.0, 1.0],
        );
        assert_relative_eq!(F, expected);
        assert_eq!(kinematic_state_transition(0, 1.0), DMatrix::identity(1, 1));
    }

    #[test]
    fn test_kinematic_kf_layouts() {
        let kf = kinematic_kf(2, 1, 1.0, 2, true).unwrap();
        assert_eq!(kf.dim_x, 4);
        assert_eq!(kf.F[(0, 1)], 1.0);
        assert_eq!(kf.F[(2, 3)], 1.0);
        assert_eq!(kf.H[(0, 0)], 1.0);
        assert_eq!(kf.H[(1, 2)], 1.0);
        assert_eq!(kf.H.sum(), 2.0);

        let kf = kinematic_kf(2, 1, 1.0, 2, false).unwrap();
        assert_eq!(kf.F[(0, 2)], 1.0);
        assert_eq!(kf.F[(1, 3)], 1.0);
        assert_eq!(kf.H[(1, 1)], 1.0);
        assert!(kf.test_matrix_dimensions().is_ok());
    }

    #[test]
    fn test_kinematic_kf_rejects_bad_arguments() {
        assert!(kinematic_kf(1, 1, 1.0, 2, true).is_err());
        assert!(kinematic_kf(1, 1, 0.0, 1, true).is_err());
        assert!(kinematic_kf(0, 1, 1.0, 1, true).is_err());
    }
}
