use crate::common::error::{FilterError, Result};
use crate::common::linalg::{check_shape, inverse, shape_of};
use nalgebra::{DMatrix, DVector};
use std::f64::consts::PI;

fn check_same_len(x: &DVector<f64>, mean: &DVector<f64>, context: &str) -> Result<()> {
    if x.len() != mean.len() {
        return Err(FilterError::dimension(context, mean.len(), x.len()));
    }
    Ok(())
}

/// Mahalanobis distance of `x` from a distribution with `mean` and
/// covariance `cov`.
pub fn mahalanobis(x: &DVector<f64>, mean: &DVector<f64>, cov: &DMatrix<f64>) -> Result<f64> {
    check_same_len(x, mean, "mahalanobis vectors")?;
    check_shape(cov, x.len(), x.len(), "mahalanobis covariance")?;

    let y = x - mean;
    let dist = (y.transpose() * inverse(cov, "mahalanobis covariance")? * &y)[(0, 0)];
    Ok(dist.sqrt())
}

/// Scalar Mahalanobis distance, `|x - mean| / sqrt(var)`.
pub fn mahalanobis_1d(x: f64, mean: f64, var: f64) -> Result<f64> {
    if var == 0.0 {
        return Err(FilterError::singular("mahalanobis variance is zero"));
    }
    Ok(((x - mean).powi(2) / var).sqrt())
}

/// Density of N(mu, cov) at `x`. The covariance must be positive
/// definite.
pub fn multivariate_gaussian(x: &DVector<f64>, mu: &DVector<f64>, cov: &DMatrix<f64>) -> Result<f64> {
    check_same_len(x, mu, "multivariate_gaussian vectors")?;
    check_shape(cov, mu.len(), mu.len(), "multivariate_gaussian covariance")?;

    let chol = nalgebra::Cholesky::new(cov.clone())
        .ok_or_else(|| FilterError::not_positive_definite("multivariate_gaussian covariance"))?;

    let n = mu.len() as f64;
    let log_det: f64 = 2.0 * chol.l().diagonal().iter().map(|d| d.ln()).sum::<f64>();
    let err = x - mu;
    let numerator = chol.solve(&err).dot(&err);

    Ok((-0.5 * (n * (2.0 * PI).ln() + log_det + numerator)).exp())
}

/// Scalar [`multivariate_gaussian`]; `var` must be positive.
pub fn multivariate_gaussian_1d(x: f64, mu: f64, var: f64) -> Result<f64> {
    if var.is_nan() || var <= 0.0 {
        return Err(FilterError::invalid("var", var, "covariance must be > 0"));
    }
    Ok(crate::stats::gaussian(x, mu, var))
}

/// Product of two multivariate Gaussians, returned as `(mean, cov)`.
pub fn multivariate_multiply(
    mean1: &DVector<f64>,
    cov1: &DMatrix<f64>,
    mean2: &DVector<f64>,
    cov2: &DMatrix<f64>,
) -> Result<(DVector<f64>, DMatrix<f64>)> {
    check_same_len(mean1, mean2, "multivariate_multiply means")?;
    let n = mean1.len();
    check_shape(cov1, n, n, "multivariate_multiply cov1")?;
    check_shape(cov2, n, n, "multivariate_multiply cov2")?;

    let sum_inv = inverse(&(cov1 + cov2), "multivariate_multiply cov1 + cov2")?;
    let cov = cov1 * &sum_inv * cov2;
    let mean = cov2 * &sum_inv * mean1 + cov1 * &sum_inv * mean2;
    Ok((mean, cov))
}

/// Log of the N(mean, cov) density at `x`.
///
/// The covariance is decomposed into its eigenvalues; eigenvalues below a
/// relative tolerance are treated as zero. With `allow_singular` those
/// directions are dropped (pseudo-determinant and pseudo-inverse),
/// otherwise a singular covariance is an error.
pub fn logpdf(
    x: &DVector<f64>,
    mean: &DVector<f64>,
    cov: &DMatrix<f64>,
    allow_singular: bool,
) -> Result<f64> {
    check_same_len(x, mean, "logpdf vectors")?;
    check_shape(cov, mean.len(), mean.len(), "logpdf covariance")?;

    let eigen = cov.clone().symmetric_eigen();
    let max_abs = eigen.eigenvalues.iter().fold(0.0_f64, |m, s| m.max(s.abs()));
    let eps = 1e6 * f64::EPSILON * max_abs;

    if eigen.eigenvalues.iter().any(|&s| s < -eps) {
        return Err(FilterError::not_positive_definite("logpdf covariance"));
    }

    let dev = x - mean;
    let mut rank = 0usize;
    let mut log_pdet = 0.0;
    let mut maha = 0.0;
    for (i, &s) in eigen.eigenvalues.iter().enumerate() {
        if s > eps {
            rank += 1;
            log_pdet += s.ln();
            let proj = eigen.eigenvectors.column(i).dot(&dev);
            maha += proj * proj / s;
        } else if !allow_singular {
            return Err(FilterError::singular("logpdf covariance"));
        }
    }

    Ok(-0.5 * (rank as f64 * (2.0 * PI).ln() + log_pdet + maha))
}

/// Scalar [`logpdf`].
pub fn logpdf_1d(x: f64, mean: f64, var: f64) -> Result<f64> {
    logpdf(
        &DVector::from_element(1, x),
        &DVector::from_element(1, mean),
        &DMatrix::from_element(1, 1, var),
        false,
    )
}

/// Log-likelihood of measurement `z` given state `x`, covariance `P`,
/// measurement function `H` and measurement noise `R`.
pub fn log_likelihood(
    z: &DVector<f64>,
    x: &DVector<f64>,
    P: &DMatrix<f64>,
    H: &DMatrix<f64>,
    R: &DMatrix<f64>,
) -> Result<f64> {
    if H.ncols() != x.len() {
        return Err(FilterError::dimension("log_likelihood H columns", x.len(), H.ncols()));
    }
    let S = H * P * H.transpose() + R;
    logpdf(z, &(H * x), &S, true)
}

/// Likelihood of measurement `z`; see [`log_likelihood`]. Never returns
/// exactly zero so it can safely divide.
pub fn likelihood(
    z: &DVector<f64>,
    x: &DVector<f64>,
    P: &DMatrix<f64>,
    H: &DMatrix<f64>,
    R: &DMatrix<f64>,
) -> Result<f64> {
    let l = log_likelihood(z, x, P, H, R)?.exp();
    Ok(if l == 0.0 { f64::MIN_POSITIVE } else { l })
}

/// Orientation (radians), width and height of the covariance ellipse of
/// a 2x2 covariance at `deviations` standard deviations.
pub fn covariance_ellipse(P: &DMatrix<f64>, deviations: f64) -> Result<(f64, f64, f64)> {
    if P.nrows() < 2 || P.ncols() < 2 {
        return Err(FilterError::dimension("covariance_ellipse", "2x2", shape_of(P)));
    }
    let p = P.view((0, 0), (2, 2)).into_owned();
    let eigen = p.symmetric_eigen();

    let (major, minor) = if eigen.eigenvalues[0] >= eigen.eigenvalues[1] {
        (0, 1)
    } else {
        (1, 0)
    };
    let v = eigen.eigenvectors.column(major);
    let orientation = v[1].atan2(v[0]);
    let width = deviations * eigen.eigenvalues[major].max(0.0).sqrt();
    let height = deviations * eigen.eigenvalues[minor].max(0.0).sqrt();

    Ok((orientation, width, height))
}

/// Normalized estimation error squared for each step: `e^T P^-1 e` with
/// `e = x - est_x`.
pub fn nees(
    xs: &[DVector<f64>],
    est_xs: &[DVector<f64>],
    ps: &[DMatrix<f64>],
) -> Result<Vec<f64>> {
    if xs.len() != est_xs.len() || xs.len() != ps.len() {
        return Err(FilterError::dimension(
            "nees sequence lengths",
            xs.len(),
            format!("{} estimates, {} covariances", est_xs.len(), ps.len()),
        ));
    }

    xs.iter()
        .zip(est_xs)
        .zip(ps)
        .map(|((x, est), p)| {
            check_same_len(est, x, "nees state")?;
            let e = x - est;
            Ok((e.transpose() * inverse(p, "nees covariance")? * &e)[(0, 0)])
        })
        .collect()
}
