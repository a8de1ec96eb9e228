use crate::common::error::{FilterError, Result};
use crate::common::linalg::check_shape;
use nalgebra::{DMatrix, DVector};

/// Difference of two states or measurements, `a - b`. Replace it for
/// quantities such as angles that need wrapping.
pub type ResidualFn = dyn Fn(&DVector<f64>, &DVector<f64>) -> DVector<f64>;

/// Weighted mean of a set of sigma points.
pub type MeanFn = dyn Fn(&[DVector<f64>], &DVector<f64>) -> DVector<f64>;

/// Mean and covariance of a set of weighted sigma points, with
/// `noise_cov` added to the covariance.
pub fn unscented_transform(
    sigmas: &[DVector<f64>],
    Wm: &DVector<f64>,
    Wc: &DVector<f64>,
    noise_cov: Option<&DMatrix<f64>>,
    mean_fn: Option<&MeanFn>,
    residual_fn: Option<&ResidualFn>,
) -> Result<(DVector<f64>, DMatrix<f64>)> {
    let first = sigmas
        .first()
        .ok_or_else(|| FilterError::empty("unscented_transform sigmas"))?;
    if Wm.len() != sigmas.len() || Wc.len() != sigmas.len() {
        return Err(FilterError::dimension(
            "unscented_transform weights",
            sigmas.len(),
            format!("Wm={}, Wc={}", Wm.len(), Wc.len()),
        ));
    }
    let n = first.len();

    let x = match mean_fn {
        Some(f) => f(sigmas, Wm),
        None => sigmas
            .iter()
            .zip(Wm.iter())
            .fold(DVector::zeros(n), |acc, (s, w)| acc + s * *w),
    };

    let mut P = DMatrix::zeros(n, n);
    for (s, w) in sigmas.iter().zip(Wc.iter()) {
        let y = match residual_fn {
            Some(f) => f(s, &x),
            None => s - &x,
        };
        P += &y * y.transpose() * *w;
    }

    if let Some(noise) = noise_cov {
        check_shape(noise, n, n, "unscented_transform noise_cov")?;
        P += noise;
    }

    Ok((x, P))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kalman::sigma_points::{MerweScaledSigmaPoints, SigmaPoints};
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_function_is_exact() {
        let points = MerweScaledSigmaPoints::new(2, 0.3, 2.0, 1.0).unwrap();
        let x = DVector::from_vec(vec![1.0, 2.0]);
        let P = DMatrix::from_row_slice(2, 2, &[2.0, 0.3, 0.3, 1.0]);
        let A = DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.0, 1.0]);

        let sigmas: Vec<_> = points
            .sigma_points(&x, &P)
            .unwrap()
            .iter()
            .map(|s| &A * s)
            .collect();
        let (mean, cov) =
            unscented_transform(&sigmas, points.wm(), points.wc(), None, None, None).unwrap();

        assert_relative_eq!(mean, &A * &x, epsilon = 1e-10);
        assert_relative_eq!(cov, &A * &P * A.transpose(), epsilon = 1e-9);
    }

    #[test]
    fn test_noise_added() {
        let sigmas = vec![DVector::from_element(1, 1.0)];
        let w = DVector::from_element(1, 1.0);
        let noise = DMatrix::from_element(1, 1, 3.0);
        let (_, cov) = unscented_transform(&sigmas, &w, &w, Some(&noise), None, None).unwrap();
        assert_relative_eq!(cov[(0, 0)], 3.0);
    }

    #[test]
    fn test_empty_sigmas() {
        let w = DVector::zeros(0);
        assert!(unscented_transform(&[], &w, &w, None, None, None).is_err());
    }
}
