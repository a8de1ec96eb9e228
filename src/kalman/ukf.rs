use crate::common::error::{FilterError, Result};
use crate::common::linalg::{check_len, check_shape, inverse};
use crate::kalman::sigma_points::SigmaPoints;
use crate::kalman::unscented_transform::{unscented_transform, MeanFn, ResidualFn};
use crate::stats;
use nalgebra::{DMatrix, DVector};

/// State transition `fx(x, dt)`.
pub type TransitionFn = dyn Fn(&DVector<f64>, f64) -> DVector<f64>;

/// Measurement function `hx(x)`.
pub type MeasurementFn = dyn Fn(&DVector<f64>) -> DVector<f64>;

/// Unscented Kalman filter.
///
/// The nonlinear process `fx` and measurement `hx` functions are given
/// at construction. Sigma points come from any [`SigmaPoints`]
/// implementation.
pub struct UnscentedKalmanFilter<S: SigmaPoints> {
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

    pub sigmas_f: Vec<DVector<f64>>,
    pub sigmas_h: Vec<DVector<f64>>,

    points: S,
    fx: Box<TransitionFn>,
    hx: Box<MeasurementFn>,
    x_mean: Option<Box<MeanFn>>,
    z_mean: Option<Box<MeanFn>>,
    residual_x: Option<Box<ResidualFn>>,
    residual_z: Option<Box<ResidualFn>>,
}

#[derive(Debug, Clone)]
pub struct UkfRtsOutput {
    pub x: Vec<DVector<f64>>,
    pub P: Vec<DMatrix<f64>>,
    pub K: Vec<DMatrix<f64>>,
}

impl<S: SigmaPoints> UnscentedKalmanFilter<S> {
    pub fn new<F, H>(dim_x: usize, dim_z: usize, dt: f64, hx: H, fx: F, points: S) -> Result<Self>
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
        if points.n() != dim_x {
            return Err(FilterError::dimension("sigma points n", dim_x, points.n()));
        }

        let num_sigmas = points.num_sigmas();
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
            sigmas_f: vec![DVector::zeros(dim_x); num_sigmas],
            sigmas_h: vec![DVector::zeros(dim_z); num_sigmas],
            points,
            fx: Box::new(fx),
            hx: Box::new(hx),
            x_mean: None,
            z_mean: None,
            residual_x: None,
            residual_z: None,
        })
    }

    /// Custom state residual, e.g. to normalise angles.
    pub fn with_residual_x<G>(mut self, f: G) -> Self
    where
        G: Fn(&DVector<f64>, &DVector<f64>) -> DVector<f64> + 'static,
    {
        self.residual_x = Some(Box::new(f));
        self
    }

    /// Custom measurement residual.
    pub fn with_residual_z<G>(mut self, f: G) -> Self
    where
        G: Fn(&DVector<f64>, &DVector<f64>) -> DVector<f64> + 'static,
    {
        self.residual_z = Some(Box::new(f));
        self
    }

    /// Custom weighted mean of state sigma points.
    pub fn with_x_mean<G>(mut self, f: G) -> Self
    where
        G: Fn(&[DVector<f64>], &DVector<f64>) -> DVector<f64> + 'static,
    {
        self.x_mean = Some(Box::new(f));
        self
    }

    /// Custom weighted mean of measurement sigma points.
    pub fn with_z_mean<G>(mut self, f: G) -> Self
    where
        G: Fn(&[DVector<f64>], &DVector<f64>) -> DVector<f64> + 'static,
    {
        self.z_mean = Some(Box::new(f));
        self
    }

    pub fn points(&self) -> &S {
        &self.points
    }

    fn res_x(&self, a: &DVector<f64>, b: &DVector<f64>) -> DVector<f64> {
        match &self.residual_x {
            Some(f) => f(a, b),
            None => a - b,
        }
    }

    fn res_z(&self, a: &DVector<f64>, b: &DVector<f64>) -> DVector<f64> {
        match &self.residual_z {
            Some(f) => f(a, b),
            None => a - b,
        }
    }

    /// Passes sigma points of the current estimate through `fx`.
    pub fn compute_process_sigmas(&mut self, dt: f64) -> Result<()> {
        let sigmas = self.points.sigma_points(&self.x, &self.P)?;
        self.sigmas_f = sigmas.iter().map(|s| (self.fx)(s, dt)).collect();
        Ok(())
    }

    /// Predict with the filter's own `dt`.
    pub fn predict(&mut self) -> Result<()> {
        self.predict_dt(self.dt)
    }

    pub fn predict_dt(&mut self, dt: f64) -> Result<()> {
        self.compute_process_sigmas(dt)?;

        let (x, P) = unscented_transform(
            &self.sigmas_f,
            self.points.wm(),
            self.points.wc(),
            Some(&self.Q),
            self.x_mean.as_deref(),
            self.residual_x.as_deref(),
        )?;
        self.x = x;
        self.P = P;

        // regenerate so the points reflect the new covariance
        self.sigmas_f = self.points.sigma_points(&self.x, &self.P)?;

        self.x_prior = self.x.clone();
        self.P_prior = self.P.clone();
        Ok(())
    }

    pub fn update(&mut self, z: &DVector<f64>) -> Result<()> {
        self.update_with(z, None)
    }

    /// Update with an optional one-off measurement noise `R`.
    pub fn update_with(&mut self, z: &DVector<f64>, R: Option<&DMatrix<f64>>) -> Result<()> {
        check_len(z, self.dim_z, "ukf update z")?;
        let R = R.unwrap_or(&self.R).clone();
        check_shape(&R, self.dim_z, self.dim_z, "ukf update R")?;

        self.sigmas_h = self.sigmas_f.iter().map(|s| (self.hx)(s)).collect();

        let (zp, S) = unscented_transform(
            &self.sigmas_h,
            self.points.wm(),
            self.points.wc(),
            Some(&R),
            self.z_mean.as_deref(),
            self.residual_z.as_deref(),
        )?;
        self.S = S;
        self.SI = inverse(&self.S, "ukf system uncertainty S")?;

        let Pxz = self.cross_variance(&self.x, &zp, &self.sigmas_f, &self.sigmas_h);
        self.K = Pxz * &self.SI;
        self.y = self.res_z(z, &zp);

        self.x = &self.x + &self.K * &self.y;
        self.P = &self.P - &self.K * &self.S * self.K.transpose();

        self.z = Some(z.clone());
        self.x_post = self.x.clone();
        self.P_post = self.P.clone();
        Ok(())
    }

    /// Records a missing measurement.
    pub fn update_missing(&mut self) {
        self.z = None;
        self.y = DVector::zeros(self.dim_z);
        self.x_post = self.x.clone();
        self.P_post = self.P.clone();
    }

    /// Cross covariance between the state and measurement sigma points.
    pub fn cross_variance(
        &self,
        x: &DVector<f64>,
        z: &DVector<f64>,
        sigmas_f: &[DVector<f64>],
        sigmas_h: &[DVector<f64>],
    ) -> DMatrix<f64> {
        let mut Pxz = DMatrix::zeros(x.len(), z.len());
        for ((sf, sh), w) in sigmas_f.iter().zip(sigmas_h).zip(self.points.wc().iter()) {
            let dx = self.res_x(sf, x);
            let dz = self.res_z(sh, z);
            Pxz += dx * dz.transpose() * *w;
        }
        Pxz
    }

    pub fn log_likelihood(&self) -> Result<f64> {
        let zero = DVector::zeros(self.y.len());
        stats::logpdf(&self.y, &zero, &self.S, true)
    }

    pub fn mahalanobis(&self) -> f64 {
        (self.y.transpose() * &self.SI * &self.y)[(0, 0)].max(0.0).sqrt()
    }

    /// Predict/update over every measurement, returning posterior means
    /// and covariances.
    pub fn batch_filter(
        &mut self,
        zs: &[Option<DVector<f64>>],
        dts: Option<&[f64]>,
    ) -> Result<(Vec<DVector<f64>>, Vec<DMatrix<f64>>)> {
        if let Some(dts) = dts {
            if dts.len() != zs.len() {
                return Err(FilterError::dimension("ukf batch_filter dts", zs.len(), dts.len()));
            }
        }

        let mut means = Vec::with_capacity(zs.len());
        let mut covariances = Vec::with_capacity(zs.len());
        for (i, z) in zs.iter().enumerate() {
            let dt = dts.map_or(self.dt, |d| d[i]);
            self.predict_dt(dt)?;
            match z {
                Some(z) => self.update(z)?,
                None => self.update_missing(),
            }
            means.push(self.x.clone());
            covariances.push(self.P.clone());
        }
        Ok((means, covariances))
    }

    /// Unscented Rauch-Tung-Striebel smoother.
    pub fn rts_smoother(
        &self,
        Xs: &[DVector<f64>],
        Ps: &[DMatrix<f64>],
        Qs: Option<&[DMatrix<f64>]>,
        dts: Option<&[f64]>,
    ) -> Result<UkfRtsOutput> {
        let n = Xs.len();
        if Ps.len() != n {
            return Err(FilterError::dimension("ukf rts_smoother Ps", n, Ps.len()));
        }
        if let Some(q) = Qs {
            if q.len() != n {
                return Err(FilterError::dimension("ukf rts_smoother Qs", n, q.len()));
            }
        }
        if let Some(d) = dts {
            if d.len() != n {
                return Err(FilterError::dimension("ukf rts_smoother dts", n, d.len()));
            }
        }

        let mut xs = Xs.to_vec();
        let mut ps = Ps.to_vec();
        let mut Ks = vec![DMatrix::zeros(self.dim_x, self.dim_x); n];
        if n < 2 {
            return Ok(UkfRtsOutput { x: xs, P: ps, K: Ks });
        }

        for k in (0..n - 1).rev() {
            let dt = dts.map_or(self.dt, |d| d[k]);
            let Q = Qs.map_or(&self.Q, |q| &q[k]);

            let sigmas = self.points.sigma_points(&xs[k], &ps[k])?;
            let sigmas_f: Vec<DVector<f64>> = sigmas.iter().map(|s| (self.fx)(s, dt)).collect();

            let (xb, Pb) = unscented_transform(
                &sigmas_f,
                self.points.wm(),
                self.points.wc(),
                Some(Q),
                self.x_mean.as_deref(),
                self.residual_x.as_deref(),
            )?;

            let mut Pxb = DMatrix::zeros(self.dim_x, self.dim_x);
            for ((s, sf), w) in sigmas.iter().zip(&sigmas_f).zip(self.points.wc().iter()) {
                let y = self.res_x(sf, &xb);
                let z = self.res_x(s, &Xs[k]);
                Pxb += z * y.transpose() * *w;
            }

            let K = Pxb * inverse(&Pb, "ukf rts_smoother Pb")?;
            let dx = &K * self.res_x(&xs[k + 1], &xb);
            xs[k] += dx;
            let dP = &K * (&ps[k + 1] - &Pb) * K.transpose();
            ps[k] += dP;
            Ks[k] = K;
        }

        Ok(UkfRtsOutput { x: xs, P: ps, K: Ks })
    }
}
