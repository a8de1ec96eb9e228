//! Sigma point selection for the unscented transform.

use crate::common::error::{FilterError, Result};
use crate::common::linalg::{check_len, check_shape, cholesky_lower};
use nalgebra::{DMatrix, DVector};

/// Chooses a set of weighted points whose mean and covariance match a
/// Gaussian `(x, P)`.
pub trait SigmaPoints {
    /// Dimension of the state the points are generated for.
    fn n(&self) -> usize;

    fn num_sigmas(&self) -> usize;

    fn sigma_points(&self, x: &DVector<f64>, P: &DMatrix<f64>) -> Result<Vec<DVector<f64>>>;

    /// Weights for the mean.
    fn wm(&self) -> &DVector<f64>;

    /// Weights for the covariance.
    fn wc(&self) -> &DVector<f64>;
}

fn check_inputs(n: usize, x: &DVector<f64>, P: &DMatrix<f64>) -> Result<()> {
    check_len(x, n, "sigma_points x")?;
    check_shape(P, n, n, "sigma_points P")
}

fn symmetric_points(x: &DVector<f64>, L: &DMatrix<f64>) -> Vec<DVector<f64>> {
    let n = x.len();
    let mut sigmas = Vec::with_capacity(2 * n + 1);
    sigmas.push(x.clone());
    for k in 0..n {
        sigmas.push(x + L.column(k));
    }
    for k in 0..n {
        sigmas.push(x - L.column(k));
    }
    sigmas
}

/// Van der Merwe's scaled sigma points: `2n + 1` points parameterised by
/// `alpha` (spread), `beta` (prior knowledge of the distribution, 2 is
/// optimal for Gaussians) and `kappa` (secondary scaling, often `3 - n`).
#[derive(Debug, Clone)]
pub struct MerweScaledSigmaPoints {
    pub n: usize,
    pub alpha: f64,
    pub beta: f64,
    pub kappa: f64,
    Wm: DVector<f64>,
    Wc: DVector<f64>,
}

impl MerweScaledSigmaPoints {
    pub fn new(n: usize, alpha: f64, beta: f64, kappa: f64) -> Result<Self> {
        if n == 0 {
            return Err(FilterError::invalid("n", n, "must be 1 or more"));
        }
        let lambda = alpha * alpha * (n as f64 + kappa) - n as f64;
        if n as f64 + lambda <= 0.0 {
            return Err(FilterError::invalid(
                "alpha/kappa",
                format!("alpha={}, kappa={}", alpha, kappa),
                "n + lambda must be positive",
            ));
        }

        let c = 0.5 / (n as f64 + lambda);
        let mut Wm = DVector::from_element(2 * n + 1, c);
        let mut Wc = DVector::from_element(2 * n + 1, c);
        Wm[0] = lambda / (n as f64 + lambda);
        Wc[0] = lambda / (n as f64 + lambda) + (1.0 - alpha * alpha + beta);

        Ok(Self {
            n,
            alpha,
            beta,
            kappa,
            Wm,
            Wc,
        })
    }

    fn lambda(&self) -> f64 {
        self.alpha * self.alpha * (self.n as f64 + self.kappa) - self.n as f64
    }
}

impl SigmaPoints for MerweScaledSigmaPoints {
    fn n(&self) -> usize {
        self.n
    }

    fn num_sigmas(&self) -> usize {
        2 * self.n + 1
    }

    fn sigma_points(&self, x: &DVector<f64>, P: &DMatrix<f64>) -> Result<Vec<DVector<f64>>> {
        check_inputs(self.n, x, P)?;
        let scaled = P * (self.lambda() + self.n as f64);
        let L = cholesky_lower(&scaled, "merwe sigma points P")?;
        Ok(symmetric_points(x, &L))
    }

    fn wm(&self) -> &DVector<f64> {
        &self.Wm
    }

    fn wc(&self) -> &DVector<f64> {
        &self.Wc
    }
}

/// Julier's original sigma points: `2n + 1` points, `kappa` controls the
/// spread.
#[derive(Debug, Clone)]
pub struct JulierSigmaPoints {
    pub n: usize,
    pub kappa: f64,
    W: DVector<f64>,
}

impl JulierSigmaPoints {
    pub fn new(n: usize, kappa: f64) -> Result<Self> {
        if n == 0 {
            return Err(FilterError::invalid("n", n, "must be 1 or more"));
        }
        if n as f64 + kappa <= 0.0 {
            return Err(FilterError::invalid("kappa", kappa, "n + kappa must be positive"));
        }
        let mut W = DVector::from_element(2 * n + 1, 0.5 / (n as f64 + kappa));
        W[0] = kappa / (n as f64 + kappa);
        Ok(Self { n, kappa, W })
    }
}

impl SigmaPoints for JulierSigmaPoints {
    fn n(&self) -> usize {
        self.n
    }

    fn num_sigmas(&self) -> usize {
        2 * self.n + 1
    }

    fn sigma_points(&self, x: &DVector<f64>, P: &DMatrix<f64>) -> Result<Vec<DVector<f64>>> {
        check_inputs(self.n, x, P)?;
        let L = cholesky_lower(&(P * (self.n as f64 + self.kappa)), "julier sigma points P")?;
        Ok(symmetric_points(x, &L))
    }

    fn wm(&self) -> &DVector<f64> {
        &self.W
    }

    fn wc(&self) -> &DVector<f64> {
        &self.W
    }
}

/// Simplex sigma points: the minimal `n + 1` points with equal weights.
#[derive(Debug, Clone)]
pub struct SimplexSigmaPoints {
    pub n: usize,
    pub alpha: f64,
    W: DVector<f64>,
    unit: DMatrix<f64>,
}

impl SimplexSigmaPoints {
    pub fn new(n: usize, alpha: f64) -> Result<Self> {
        if n == 0 {
            return Err(FilterError::invalid("n", n, "must be 1 or more"));
        }

        let lambda = n as f64 / (n as f64 + 1.0);
        let mut istar = DMatrix::from_row_slice(
            1,
            2,
            &[-1.0 / (2.0 * lambda).sqrt(), 1.0 / (2.0 * lambda).sqrt()],
        );
        for d in 2..=n {
            let df = d as f64;
            let denom = (lambda * df * (df + 1.0)).sqrt();
            let mut grown = DMatrix::zeros(d, d + 1);
            grown.view_mut((0, 0), (d - 1, d)).copy_from(&istar);
            for j in 0..d {
                grown[(d - 1, j)] = 1.0 / denom;
            }
            grown[(d - 1, d)] = -df / denom;
            istar = grown;
        }

        Ok(Self {
            n,
            alpha,
            W: DVector::from_element(n + 1, 1.0 / (n as f64 + 1.0)),
            unit: istar * (n as f64).sqrt(),
        })
    }
}

impl SigmaPoints for SimplexSigmaPoints {
    fn n(&self) -> usize {
        self.n
    }

    fn num_sigmas(&self) -> usize {
        self.n + 1
    }

    fn sigma_points(&self, x: &DVector<f64>, P: &DMatrix<f64>) -> Result<Vec<DVector<f64>>> {
        check_inputs(self.n, x, P)?;
        let L = cholesky_lower(P, "simplex sigma points P")?;
        let scaled = L * &self.unit;
        Ok(scaled.column_iter().map(|c| x + c).collect())
    }

    fn wm(&self) -> &DVector<f64> {
        &self.W
    }

    fn wc(&self) -> &DVector<f64> {
        &self.W
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reconstruct<S: SigmaPoints>(points: &S, x: &DVector<f64>, P: &DMatrix<f64>) {
        let sigmas = points.sigma_points(x, P).unwrap();
        assert_eq!(sigmas.len(), points.num_sigmas());

        let mut mean = DVector::zeros(x.len());
        for (s, w) in sigmas.iter().zip(points.wm().iter()) {
            mean += s * *w;
        }
        assert_relative_eq!(mean, x.clone(), epsilon = 1e-10);

        let mut cov = DMatrix::zeros(x.len(), x.len());
        for (s, w) in sigmas.iter().zip(points.wc().iter()) {
            let d = s - &mean;
            cov += &d * d.transpose() * *w;
        }
        assert_relative_eq!(cov, P.clone(), epsilon = 1e-9);
    }

    fn sample_state() -> (DVector<f64>, DMatrix<f64>) {
        let x = DVector::from_vec(vec![1.0, -2.0, 0.5]);
        let P = DMatrix::from_row_slice(3, 3, &[4.0, 0.5, 0.1, 0.5, 2.0, 0.0, 0.1, 0.0, 1.0]);
        (x, P)
    }

    #[test]
    fn test_merwe_weights_sum_to_one() {
        let p = MerweScaledSigmaPoints::new(4, 0.1, 2.0, -1.0).unwrap();
        assert_relative_eq!(p.wm().sum(), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_julier_reconstructs_moments() {
        let (x, P) = sample_state();
        reconstruct(&JulierSigmaPoints::new(3, 0.0).unwrap(), &x, &P);
    }

    #[test]
    fn test_simplex_reconstructs_moments() {
        let (x, P) = sample_state();
        let p = SimplexSigmaPoints::new(3, 1.0).unwrap();
        assert_relative_eq!(p.wm().sum(), 1.0, epsilon = 1e-12);
        reconstruct(&p, &x, &P);
    }

    #[test]
    fn test_merwe_mean_reconstruction() {
        let (x, P) = sample_state();
        let p = MerweScaledSigmaPoints::new(3, 1.0, 0.0, 0.0).unwrap();
        // beta = 0, alpha = 1 makes Wc equal Wm
        reconstruct(&p, &x, &P);
    }

    #[test]
    fn test_rejects_wrong_dimension() {
        let p = JulierSigmaPoints::new(2, 1.0).unwrap();
        let x = DVector::zeros(3);
        assert!(p.sigma_points(&x, &DMatrix::identity(3, 3)).is_err());
    }
}
