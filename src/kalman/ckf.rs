use crate::common::error::{FilterError, Result};
use crate::common::linalg::{check_len, check_shape, cholesky_lower, inverse};
use crate::kalman::ukf::{MeasurementFn, TransitionFn};
use crate::kalman::unscented_transform::ResidualFn;
use crate::stats;
use nalgebra::{DMatrix, DVector};

/// The `2n` spherical-radial cubature points of `N(x, P)`: `x ± sqrt(n) L_k`
/// where `L_k` are the columns of the lower Cholesky factor of `P`.
pub fn spherical_radial_sigmas(x: &DVector<f64>, P: &DMatrix<f64>) -> Result<Vec<DVector<f64>>> {
    let n = x.len();
    if n == 0 {
        return Err(FilterError::empty("spherical_radial_sigmas x"));
    }
    check_shape(P, n, n, "spherical_radial_sigmas P")?;

    let U = cholesky_lower(P, "spherical_radial_sigmas P")? * (n as f64).sqrt();
    let mut sigmas = Vec::with_capacity(2 * n);
    for k in 0..n {
        sigmas.push(x + U.column(k));
    }
    for k in 0..n {
        sigmas.push(x - U.column(k));
    }
    Ok(sigmas)
}

/// Equally weighted mean and covariance of cubature points, plus `Q`.
pub fn ckf_transform(Xs: &[DVector<f64>], Q: &DMatrix<f64>) -> Result<(DVector<f64>, DMatrix<f64>)> {
    let first = Xs.first().ok_or_else(|| FilterError::empty("ckf_transform points"))?;
    let n = first.len();
    check_shape(Q, n, n, "ckf_transform Q")?;

    let m = Xs.len() as f64;
    let x = Xs.iter().fold(DVector::zeros(n), |acc, s| acc + s) / m;
    let mut P = Q.clone();
    for s in Xs {
        let d = s - &x;
        P += &d * d.transpose() / m;
    }
    Ok((x, P))
}

/// Cubature Kalman filter: a derivative free filter using `2n` equally
/// weighted points.
pub struct CubatureKalmanFilter {
    pub dim_x: usize,
    pub dim_z: usize,
    pub dt: f64,

    pub x: DVector<f64>,
    pub P: DMatrix<f64>,
    pub Q: DMatrix<f64>,
    pub R: DMatrix<f64>,

    pub z: Option<DVector<f64>>,
    pub K: DMatrix<f64>,
    pub y: DVector<f64>,
    pub S: DMatrix<f64>,
    pub SI: DMatrix<f64>,

    pub x_prior: DVector<f64>,
    pub P_prior: DMatrix<f64>,
    pub x_post: DVector<f64>,
    pub P_post: DMatrix<f64>,

    fx: Box<TransitionFn>,
    hx: Box<MeasurementFn>,
    residual_x: Option<Box<ResidualFn>>,
    residual_z: Option<Box<ResidualFn>>,
}

impl CubatureKalmanFilter {
    pub fn new<F, H>(dim_x: usize, dim_z: usize, dt: f64, hx: H, fx: F) -> Result<Self>
    where
        F: Fn(&DVector<f64>, f64) -> DVector<f64> + 'static,
        H: Fn(&DVector<f64>) -> DVector<f64> + 'static,
    {
        if dim_x < 1 || dim_z < 1 {
            return Err(FilterError::invalid(
                "dim_x/dim_z",
                format!("{}/{}", dim_x, dim_z),
                "must be 1 or more",
            ));
        }
        Ok(Self {
            dim_x,
            dim_z,
            dt,
            x: DVector::zeros(dim_x),
            P: DMatrix::identity(dim_x, dim_x),
            Q: DMatrix::identity(dim_x, dim_x),
            R: DMatrix::identity(dim_z, dim_z),
            z: None,
            K: DMatrix::zeros(dim_x, dim_z),
            y: DVector::zeros(dim_z),
            S: DMatrix::zeros(dim_z, dim_z),
            SI: DMatrix::zeros(dim_z, dim_z),
            x_prior: DVector::zeros(dim_x),
            P_prior: DMatrix::identity(dim_x, dim_x),
            x_post: DVector::zeros(dim_x),
            P_post: DMatrix::identity(dim_x, dim_x),
            fx: Box::new(fx),
            hx: Box::new(hx),
            residual_x: None,
            residual_z: None,
        })
    }

    pub fn with_residual_x<G>(mut self, f: G) -> Self
    where
        G: Fn(&DVector<f64>, &DVector<f64>) -> DVector<f64> + 'static,
    {
        self.residual_x = Some(Box::new(f));
        self
    }

    pub fn with_residual_z<G>(mut self, f: G) -> Self
    where
        G: Fn(&DVector<f64>, &DVector<f64>) -> DVector<f64> + 'static,
    {
        self.residual_z = Some(Box::new(f));
        self
    }

    pub fn predict(&mut self) -> Result<()> {
        self.predict_dt(self.dt)
    }

    pub fn predict_dt(&mut self, dt: f64) -> Result<()> {
        let sigmas = spherical_radial_sigmas(&self.x, &self.P)?;
        let sigmas_f: Vec<DVector<f64>> = sigmas.iter().map(|s| (self.fx)(s, dt)).collect();

        let (x, P) = ckf_transform(&sigmas_f, &self.Q)?;
        self.x = x;
        self.P = P;

        self.x_prior = self.x.clone();
        self.P_prior = self.P.clone();
        Ok(())
    }

    pub fn update(&mut self, z: &DVector<f64>) -> Result<()> {
        self.update_with(z, None)
    }

    pub fn update_with(&mut self, z: &DVector<f64>, R: Option<&DMatrix<f64>>) -> Result<()> {
        check_len(z, self.dim_z, "ckf update z")?;
        let R = R.unwrap_or(&self.R).clone();

        // cubature points of the prior
        let sigmas_f = spherical_radial_sigmas(&self.x, &self.P)?;
        let sigmas_h: Vec<DVector<f64>> = sigmas_f.iter().map(|s| (self.hx)(s)).collect();

        let (zp, S) = ckf_transform(&sigmas_h, &R)?;
        self.S = S;
        self.SI = inverse(&self.S, "ckf system uncertainty S")?;

        let m = sigmas_f.len() as f64;
        let mut Pxz = DMatrix::zeros(self.dim_x, self.dim_z);
        for (sf, sh) in sigmas_f.iter().zip(&sigmas_h) {
            let dx = match &self.residual_x {
                Some(f) => f(sf, &self.x),
                None => sf - &self.x,
            };
            let dz = match &self.residual_z {
                Some(f) => f(sh, &zp),
                None => sh - &zp,
            };
            Pxz += dx * dz.transpose() / m;
        }

        self.K = Pxz * &self.SI;
        self.y = match &self.residual_z {
            Some(f) => f(z, &zp),
            None => z - &zp,
        };
        self.x = &self.x + &self.K * &self.y;
        self.P = &self.P - &self.K * &self.S * self.K.transpose();

        self.z = Some(z.clone());
        self.x_post = self.x.clone();
        self.P_post = self.P.clone();
        Ok(())
    }

    pub fn update_missing(&mut self) {
        self.z = None;
        self.y = DVector::zeros(self.dim_z);
        self.x_post = self.x.clone();
        self.P_post = self.P.clone();
    }

    pub fn log_likelihood(&self) -> Result<f64> {
        let zero = DVector::zeros(self.y.len());
        stats::logpdf(&self.y, &zero, &self.S, true)
    }

    pub fn mahalanobis(&self) -> f64 {
        (self.y.transpose() * &self.SI * &self.y)[(0, 0)].max(0.0).sqrt()
    }
}
