use crate::common::error::{FilterError, Result};
use crate::common::helpers::Snapshot;
use crate::common::linalg::{check_len, check_shape, inverse};
use crate::kalman::kalman_filter::KalmanSnapshot;
use crate::stats;
use nalgebra::{DMatrix, DVector};

/// Extended Kalman filter.
///
/// The measurement function and its Jacobian are passed to each update
/// rather than stored, so they may capture per-step context such as a
/// landmark position.
#[derive(Debug, Clone)]
pub struct ExtendedKalmanFilter {
    pub dim_x: usize,
    pub dim_z: usize,
    pub dim_u: usize,

    pub x: DVector<f64>,
    pub P: DMatrix<f64>,
    pub B: DMatrix<f64>,
    pub F: DMatrix<f64>,
    pub R: DMatrix<f64>,
    pub Q: DMatrix<f64>,

    pub z: Option<DVector<f64>>,
    pub K: DMatrix<f64>,
    pub y: DVector<f64>,
    pub S: DMatrix<f64>,
    pub SI: DMatrix<f64>,

    pub x_prior: DVector<f64>,
    pub P_prior: DMatrix<f64>,
    pub x_post: DVector<f64>,
    pub P_post: DMatrix<f64>,
}

impl ExtendedKalmanFilter {
    pub fn new(dim_x: usize, dim_z: usize, dim_u: usize) -> Result<Self> {
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
            dim_u,
            x: DVector::zeros(dim_x),
            P: DMatrix::identity(dim_x, dim_x),
            B: DMatrix::zeros(dim_x, dim_u),
            F: DMatrix::identity(dim_x, dim_x),
            R: DMatrix::identity(dim_z, dim_z),
            Q: DMatrix::identity(dim_x, dim_x),
            z: None,
            K: DMatrix::zeros(dim_x, dim_z),
            y: DVector::zeros(dim_z),
            S: DMatrix::zeros(dim_z, dim_z),
            SI: DMatrix::zeros(dim_z, dim_z),
            x_prior: DVector::zeros(dim_x),
            P_prior: DMatrix::identity(dim_x, dim_x),
            x_post: DVector::zeros(dim_x),
            P_post: DMatrix::identity(dim_x, dim_x),
        })
    }

    /// Default state propagation, `x = Fx + Bu`.
    pub fn predict_x(&mut self, u: Option<&DVector<f64>>) -> Result<()> {
        let mut x = &self.F * &self.x;
        if let Some(u) = u.filter(|_| self.dim_u > 0) {
            check_shape(&self.B, self.dim_x, u.len(), "ekf predict B")?;
            x += &self.B * u;
        }
        self.x = x;
        Ok(())
    }

    fn propagate_covariance(&mut self) {
        self.P = &self.F * &self.P * self.F.transpose() + &self.Q;
        self.x_prior = self.x.clone();
        self.P_prior = self.P.clone();
    }

    pub fn predict(&mut self, u: Option<&DVector<f64>>) -> Result<()> {
        self.predict_x(u)?;
        self.propagate_covariance();
        Ok(())
    }

    /// Predict with a nonlinear state transition `fx`. `F` must hold
    /// the Jacobian of `fx` at the current state.
    pub fn predict_nonlinear<FX>(&mut self, fx: FX) -> Result<()>
    where
        FX: Fn(&DVector<f64>) -> DVector<f64>,
    {
        let x = fx(&self.x);
        check_len(&x, self.dim_x, "ekf fx output")?;
        self.x = x;
        self.propagate_covariance();
        Ok(())
    }

    pub fn update<HJ, HX>(
        &mut self,
        z: &DVector<f64>,
        h_jacobian: HJ,
        hx: HX,
        R: Option<&DMatrix<f64>>,
    ) -> Result<()>
    where
        HJ: Fn(&DVector<f64>) -> DMatrix<f64>,
        HX: Fn(&DVector<f64>) -> DVector<f64>,
    {
        self.update_with_residual(z, h_jacobian, hx, R, |a, b| a - b)
    }

    /// Update with a custom residual, e.g. to wrap bearing angles.
    pub fn update_with_residual<HJ, HX, RES>(
        &mut self,
        z: &DVector<f64>,
        h_jacobian: HJ,
        hx: HX,
        R: Option<&DMatrix<f64>>,
        residual: RES,
    ) -> Result<()>
    where
        HJ: Fn(&DVector<f64>) -> DMatrix<f64>,
        HX: Fn(&DVector<f64>) -> DVector<f64>,
        RES: Fn(&DVector<f64>, &DVector<f64>) -> DVector<f64>,
    {
        check_len(z, self.dim_z, "ekf update z")?;
        let H = h_jacobian(&self.x);
        let R = R.unwrap_or(&self.R).clone();
        self.apply_update(z, &H, &R, &hx, &residual)
    }

    fn apply_update<HX, RES>(
        &mut self,
        z: &DVector<f64>,
        H: &DMatrix<f64>,
        R: &DMatrix<f64>,
        hx: &HX,
        residual: &RES,
    ) -> Result<()>
    where
        HX: Fn(&DVector<f64>) -> DVector<f64>,
        RES: Fn(&DVector<f64>, &DVector<f64>) -> DVector<f64>,
    {
        check_shape(H, self.dim_z, self.dim_x, "ekf jacobian H")?;
        check_shape(R, self.dim_z, self.dim_z, "ekf update R")?;

        let PHT = &self.P * H.transpose();
        self.S = H * &PHT + R;
        self.SI = inverse(&self.S, "ekf system uncertainty S")?;
        self.K = PHT * &self.SI;

        let hx = hx(&self.x);
        check_len(&hx, self.dim_z, "ekf hx output")?;
        self.y = residual(z, &hx);
        self.x += &self.K * &self.y;

        let I_KH = DMatrix::identity(self.dim_x, self.dim_x) - &self.K * H;
        self.P = &I_KH * &self.P * I_KH.transpose() + &self.K * R * self.K.transpose();

        tracing::debug!(mahalanobis = self.mahalanobis(), "ekf update");

        self.z = Some(z.clone());
        self.x_post = self.x.clone();
        self.P_post = self.P.clone();
        Ok(())
    }

    /// One predict/update cycle with the Jacobian evaluated at the state
    /// before the predict.
    pub fn predict_update<HJ, HX>(
        &mut self,
        z: &DVector<f64>,
        h_jacobian: HJ,
        hx: HX,
        u: Option<&DVector<f64>>,
    ) -> Result<()>
    where
        HJ: Fn(&DVector<f64>) -> DMatrix<f64>,
        HX: Fn(&DVector<f64>) -> DVector<f64>,
    {
        check_len(z, self.dim_z, "ekf predict_update z")?;
        let H = h_jacobian(&self.x);
        self.predict(u)?;
        let R = self.R.clone();
        self.apply_update(z, &H, &R, &hx, &|a: &DVector<f64>, b: &DVector<f64>| a - b)
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

impl Snapshot for ExtendedKalmanFilter {
    type Record = KalmanSnapshot;

    fn snapshot(&self) -> KalmanSnapshot {
        KalmanSnapshot {
            x: self.x.clone(),
            P: self.P.clone(),
            x_prior: self.x_prior.clone(),
            P_prior: self.P_prior.clone(),
            y: self.y.clone(),
            S: self.S.clone(),
            K: self.K.clone(),
            z: self.z.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kalman::kalman_filter::KalmanFilter;
    use approx::assert_relative_eq;

    fn range_jacobian(x: &DVector<f64>) -> DMatrix<f64> {
        let r = (x[0] * x[0] + x[1] * x[1]).sqrt();
        DMatrix::from_row_slice(1, 2, &[x[0] / r, x[1] / r])
    }

    fn range(x: &DVector<f64>) -> DVector<f64> {
        DVector::from_element(1, (x[0] * x[0] + x[1] * x[1]).sqrt())
    }

    #[test]
    fn test_linear_ekf_matches_kalman_filter() {
        let F = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 0.0, 1.0]);
        let H = DMatrix::from_row_slice(1, 2, &[1.0, 0.0]);

        let mut ekf = ExtendedKalmanFilter::new(2, 1, 0).unwrap();
        ekf.F = F.clone();
        ekf.P *= 50.0;

        let mut kf = KalmanFilter::new(2, 1, 0).unwrap();
        kf.F = F;
        kf.H = H.clone();
        kf.P *= 50.0;

        for i in 0..10 {
            let z = DVector::from_element(1, i as f64);
            ekf.predict(None).unwrap();
            let Hc = H.clone();
            ekf.update(&z, move |_| Hc.clone(), |x| DVector::from_element(1, x[0]), None)
                .unwrap();
            kf.predict(None).unwrap();
            kf.update(&z).unwrap();
        }
        assert_relative_eq!(ekf.x, kf.x, epsilon = 1e-10);
        assert_relative_eq!(ekf.P, kf.P, epsilon = 1e-10);
    }

    #[test]
    fn test_range_measurement_pulls_estimate() {
        let mut ekf = ExtendedKalmanFilter::new(2, 1, 0).unwrap();
        ekf.x = DVector::from_vec(vec![3.0, 4.0]);
        ekf.R *= 0.01;
        ekf.Q *= 0.0;
        for _ in 0..20 {
            ekf.predict(None).unwrap();
            ekf.update(&DVector::from_element(1, 10.0), range_jacobian, range, None)
                .unwrap();
        }
        assert_relative_eq!(range(&ekf.x)[0], 10.0, epsilon = 1e-2);
    }

    #[test]
    fn test_predict_update_and_wrong_jacobian_shape() {
        let mut ekf = ExtendedKalmanFilter::new(2, 1, 0).unwrap();
        ekf.x = DVector::from_vec(vec![1.0, 1.0]);
        ekf.predict_update(&DVector::from_element(1, 2.0), range_jacobian, range, None)
            .unwrap();
        assert!(ekf.z.is_some());

        let bad = ekf.update(
            &DVector::from_element(1, 2.0),
            |_| DMatrix::zeros(2, 2),
            range,
            None,
        );
        assert!(bad.is_err());
    }
}
