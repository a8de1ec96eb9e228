use crate::common::error::{FilterError, Result};
use crate::common::linalg::{check_len, check_shape, inverse};
use crate::kalman::ukf::{MeasurementFn, TransitionFn};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Draws one sample from `N(mean, cov)` using the symmetric square root
/// of `cov`, so semi-definite covariances are accepted.
fn sample_gaussian<R: Rng + ?Sized>(
    mean: &DVector<f64>,
    root: &DMatrix<f64>,
    rng: &mut R,
) -> DVector<f64> {
    let n = mean.len();
    let w = DVector::from_fn(n, |_, _| rng.sample::<f64, _>(StandardNormal));
    mean + root * w
}

fn covariance_root(cov: &DMatrix<f64>, context: &str) -> Result<DMatrix<f64>> {
    let eigen = cov.clone().symmetric_eigen();
    let max_abs = eigen.eigenvalues.iter().fold(0.0_f64, |m, s| m.max(s.abs()));
    if eigen.eigenvalues.iter().any(|&s| s < -1e-9 * max_abs.max(1.0)) {
        return Err(FilterError::not_positive_definite(context));
    }
    let roots = eigen.eigenvalues.map(|s| s.max(0.0).sqrt());
    Ok(&eigen.eigenvectors * DMatrix::from_diagonal(&roots))
}

/// Ensemble Kalman filter.
///
/// The state distribution is represented by `N` members drawn from
/// `N(x, P)`. Predict moves every member through `fx` and adds process
/// noise; update shifts every member towards a perturbed copy of the
/// measurement.
pub struct EnsembleKalmanFilter {
    pub dim_x: usize,
    pub dim_z: usize,
    pub dt: f64,
    pub N: usize,

    pub x: DVector<f64>,
    pub P: DMatrix<f64>,
    pub Q: DMatrix<f64>,
    pub R: DMatrix<f64>,

    pub z: Option<DVector<f64>>,
    pub K: DMatrix<f64>,
    pub S: DMatrix<f64>,
    pub SI: DMatrix<f64>,

    pub x_prior: DVector<f64>,
    pub P_prior: DMatrix<f64>,
    pub x_post: DVector<f64>,
    pub P_post: DMatrix<f64>,

    pub sigmas: Vec<DVector<f64>>,

    fx: Box<TransitionFn>,
    hx: Box<MeasurementFn>,
    rng: StdRng,
}

fn mean_of(points: &[DVector<f64>], dim: usize) -> DVector<f64> {
    points.iter().fold(DVector::zeros(dim), |acc, p| acc + p) / points.len() as f64
}

impl EnsembleKalmanFilter {
    pub fn new<F, H>(
        x: DVector<f64>,
        P: DMatrix<f64>,
        dim_z: usize,
        dt: f64,
        N: usize,
        hx: H,
        fx: F,
    ) -> Result<Self>
    where
        F: Fn(&DVector<f64>, f64) -> DVector<f64> + 'static,
        H: Fn(&DVector<f64>) -> DVector<f64> + 'static,
    {
        let dim_x = x.len();
        if dim_x < 1 || dim_z < 1 {
            return Err(FilterError::invalid(
                "dim_x/dim_z",
                format!("{}/{}", dim_x, dim_z),
                "must be 1 or more",
            ));
        }
        if N < 2 {
            return Err(FilterError::invalid("N", N, "ensemble needs at least 2 members"));
        }

        let mut filter = Self {
            dim_x,
            dim_z,
            dt,
            N,
            x: x.clone(),
            P: P.clone(),
            Q: DMatrix::identity(dim_x, dim_x),
            R: DMatrix::identity(dim_z, dim_z),
            z: None,
            K: DMatrix::zeros(dim_x, dim_z),
            S: DMatrix::zeros(dim_z, dim_z),
            SI: DMatrix::zeros(dim_z, dim_z),
            x_prior: x.clone(),
            P_prior: P.clone(),
            x_post: x.clone(),
            P_post: P.clone(),
            sigmas: Vec::new(),
            fx: Box::new(fx),
            hx: Box::new(hx),
            rng: StdRng::from_entropy(),
        };
        filter.initialize(x, P)?;
        Ok(filter)
    }

    /// Reseeds the generator and redraws the ensemble from the current
    /// `x` and `P`, making runs reproducible.
    pub fn with_seed(mut self, seed: u64) -> Result<Self> {
        self.rng = StdRng::seed_from_u64(seed);
        let (x, P) = (self.x.clone(), self.P.clone());
        self.initialize(x, P)?;
        Ok(self)
    }

    /// Draws a fresh ensemble from `N(x, P)`.
    pub fn initialize(&mut self, x: DVector<f64>, P: DMatrix<f64>) -> Result<()> {
        check_len(&x, self.dim_x, "ensemble x")?;
        check_shape(&P, self.dim_x, self.dim_x, "ensemble P")?;

        let root = covariance_root(&P, "ensemble P")?;
        self.sigmas = (0..self.N)
            .map(|_| sample_gaussian(&x, &root, &mut self.rng))
            .collect();
        self.x = x;
        self.P = P;
        self.x_prior = self.x.clone();
        self.P_prior = self.P.clone();
        self.x_post = self.x.clone();
        self.P_post = self.P.clone();
        Ok(())
    }

    fn sample_covariance(
        &self,
        a: &[DVector<f64>],
        ma: &DVector<f64>,
        b: &[DVector<f64>],
        mb: &DVector<f64>,
    ) -> DMatrix<f64> {
        let mut C = DMatrix::zeros(ma.len(), mb.len());
        for (sa, sb) in a.iter().zip(b) {
            C += (sa - ma) * (sb - mb).transpose();
        }
        C / (self.N as f64 - 1.0)
    }

    pub fn predict(&mut self) -> Result<()> {
        let root = covariance_root(&self.Q, "ensemble Q")?;
        let zero = DVector::zeros(self.dim_x);
        for i in 0..self.N {
            let moved = (self.fx)(&self.sigmas[i], self.dt);
            check_len(&moved, self.dim_x, "ensemble fx output")?;
            self.sigmas[i] = moved + sample_gaussian(&zero, &root, &mut self.rng);
        }

        self.x = mean_of(&self.sigmas, self.dim_x);
        self.P = self.sample_covariance(&self.sigmas, &self.x, &self.sigmas, &self.x);

        self.x_prior = self.x.clone();
        self.P_prior = self.P.clone();
        Ok(())
    }

    pub fn update(&mut self, z: &DVector<f64>) -> Result<()> {
        self.update_with(z, None)
    }

    pub fn update_with(&mut self, z: &DVector<f64>, R: Option<&DMatrix<f64>>) -> Result<()> {
        check_len(z, self.dim_z, "ensemble update z")?;
        let R = R.unwrap_or(&self.R).clone();
        check_shape(&R, self.dim_z, self.dim_z, "ensemble update R")?;

        let sigmas_h: Vec<DVector<f64>> = self.sigmas.iter().map(|s| (self.hx)(s)).collect();
        let z_mean = mean_of(&sigmas_h, self.dim_z);

        let P_zz = self.sample_covariance(&sigmas_h, &z_mean, &sigmas_h, &z_mean) + &R;
        let P_xz = self.sample_covariance(&self.sigmas, &self.x, &sigmas_h, &z_mean);

        self.S = P_zz;
        self.SI = inverse(&self.S, "ensemble system uncertainty S")?;
        self.K = P_xz * &self.SI;

        let root = covariance_root(&R, "ensemble R")?;
        let zero = DVector::zeros(self.dim_z);
        for (sigma, h) in self.sigmas.iter_mut().zip(&sigmas_h) {
            let perturbed = z + sample_gaussian(&zero, &root, &mut self.rng);
            *sigma += &self.K * (perturbed - h);
        }

        self.x = mean_of(&self.sigmas, self.dim_x);
        self.P = &self.P - &self.K * &self.S * self.K.transpose();

        self.z = Some(z.clone());
        self.x_post = self.x.clone();
        self.P_post = self.P.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn constant_velocity(seed: u64) -> EnsembleKalmanFilter {
        let x = DVector::from_vec(vec![0.0, 1.0]);
        let P = DMatrix::identity(2, 2) * 4.0;
        let mut f = EnsembleKalmanFilter::new(
            x,
            P,
            1,
            1.0,
            200,
            |x: &DVector<f64>| DVector::from_element(1, x[0]),
            |x: &DVector<f64>, dt: f64| DVector::from_vec(vec![x[0] + dt * x[1], x[1]]),
        )
        .unwrap()
        .with_seed(seed)
        .unwrap();
        f.Q *= 0.001;
        f.R *= 0.5;
        f
    }

    #[test]
    fn test_tracks_constant_velocity() {
        let mut f = constant_velocity(7);
        for i in 1..40 {
            f.predict().unwrap();
            f.update(&DVector::from_element(1, i as f64)).unwrap();
        }
        assert_relative_eq!(f.x[0], 39.0, epsilon = 0.5);
        assert_relative_eq!(f.x[1], 1.0, epsilon = 0.2);
    }

    #[test]
    fn test_seed_is_reproducible() {
        let a = constant_velocity(3);
        let b = constant_velocity(3);
        assert_eq!(a.sigmas, b.sigmas);
        assert_eq!(a.sigmas.len(), 200);
    }

    #[test]
    fn test_needs_two_members() {
        let r = EnsembleKalmanFilter::new(
            DVector::zeros(1),
            DMatrix::identity(1, 1),
            1,
            1.0,
            1,
            |x: &DVector<f64>| x.clone(),
            |x: &DVector<f64>, _dt: f64| x.clone(),
        );
        assert!(r.is_err());
    }
}
