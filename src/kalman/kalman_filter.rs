use crate::common::error::{FilterError, Result};
use crate::common::helpers::Snapshot;
use crate::common::linalg::{check_len, check_shape, inverse, shape_of};
use crate::stats;
use nalgebra::{DMatrix, DVector};

/// Linear Kalman filter.
///
/// All matrices are public and may be assigned directly after
/// construction; [`KalmanFilter::test_matrix_dimensions`] checks that they
/// are consistent. `x_prior`/`P_prior` hold the result of the last
/// predict, `x_post`/`P_post` the result of the last update.
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    pub dim_x: usize,
    pub dim_z: usize,
    pub dim_u: usize,

    pub x: DVector<f64>,
    pub P: DMatrix<f64>,
    pub Q: DMatrix<f64>,
    pub B: DMatrix<f64>,
    pub F: DMatrix<f64>,
    pub H: DMatrix<f64>,
    pub R: DMatrix<f64>,
    /// Process/measurement cross correlation, used by `update_correlated`.
    pub M: DMatrix<f64>,

    pub z: Option<DVector<f64>>,
    pub K: DMatrix<f64>,
    pub y: DVector<f64>,
    pub S: DMatrix<f64>,
    pub SI: DMatrix<f64>,

    pub x_prior: DVector<f64>,
    pub P_prior: DMatrix<f64>,
    pub x_post: DVector<f64>,
    pub P_post: DMatrix<f64>,

    alpha_sq: f64,
}

/// Per-step overrides for [`KalmanFilter::batch_filter`]. Every slice that
/// is present must have one entry per measurement.
#[derive(Debug, Clone, Default)]
pub struct BatchInputs<'a> {
    pub us: Option<&'a [DVector<f64>]>,
    pub Fs: Option<&'a [DMatrix<f64>]>,
    pub Qs: Option<&'a [DMatrix<f64>]>,
    pub Hs: Option<&'a [DMatrix<f64>]>,
    pub Rs: Option<&'a [DMatrix<f64>]>,
    pub Bs: Option<&'a [DMatrix<f64>]>,
    /// Run update before predict on each step.
    pub update_first: bool,
}

#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub means: Vec<DVector<f64>>,
    pub covariances: Vec<DMatrix<f64>>,
    pub means_prior: Vec<DVector<f64>>,
    pub covariances_prior: Vec<DMatrix<f64>>,
}

#[derive(Debug, Clone)]
pub struct RtsOutput {
    pub x: Vec<DVector<f64>>,
    pub P: Vec<DMatrix<f64>>,
    pub K: Vec<DMatrix<f64>>,
    pub Pp: Vec<DMatrix<f64>>,
}

/// Everything an update produces, see [`update`].
#[derive(Debug, Clone)]
pub struct UpdateResult {
    pub x: DVector<f64>,
    pub P: DMatrix<f64>,
    pub y: DVector<f64>,
    pub K: DMatrix<f64>,
    pub S: DMatrix<f64>,
    pub SI: DMatrix<f64>,
}

#[derive(Debug, Clone)]
pub struct KalmanSnapshot {
    pub x: DVector<f64>,
    pub P: DMatrix<f64>,
    pub x_prior: DVector<f64>,
    pub P_prior: DMatrix<f64>,
    pub y: DVector<f64>,
    pub S: DMatrix<f64>,
    pub K: DMatrix<f64>,
    pub z: Option<DVector<f64>>,
}

fn slice_entry<'a, T>(s: Option<&'a [T]>, i: usize) -> Option<&'a T> {
    s.map(|s| &s[i])
}

fn check_batch_len<T>(s: Option<&[T]>, n: usize, name: &str) -> Result<()> {
    match s {
        Some(s) if s.len() != n => Err(FilterError::dimension(name, n, s.len())),
        _ => Ok(()),
    }
}

/// Kalman predict step on explicit arrays, returning `(x, P)`.
///
/// `alpha` is the fading memory factor; use 1.0 for a standard filter.
pub fn predict(
    x: &DVector<f64>,
    P: &DMatrix<f64>,
    F: &DMatrix<f64>,
    Q: &DMatrix<f64>,
    u: Option<&DVector<f64>>,
    B: Option<&DMatrix<f64>>,
    alpha: f64,
) -> Result<(DVector<f64>, DMatrix<f64>)> {
    let n = x.len();
    check_shape(F, n, n, "predict F")?;
    check_shape(P, n, n, "predict P")?;
    check_shape(Q, n, n, "predict Q")?;

    let mut x = F * x;
    if let (Some(u), Some(B)) = (u, B) {
        check_shape(B, n, u.len(), "predict B")?;
        x += B * u;
    }
    let P = F * P * F.transpose() * (alpha * alpha) + Q;
    Ok((x, P))
}

/// Kalman update step on explicit arrays using the Joseph form of the
/// covariance update.
pub fn update(
    x: &DVector<f64>,
    P: &DMatrix<f64>,
    z: &DVector<f64>,
    R: &DMatrix<f64>,
    H: &DMatrix<f64>,
) -> Result<UpdateResult> {
    let n = x.len();
    let m = z.len();
    check_shape(H, m, n, "update H")?;
    check_shape(R, m, m, "update R")?;
    check_shape(P, n, n, "update P")?;

    let y = z - H * x;
    let PHT = P * H.transpose();
    let S = H * &PHT + R;
    let SI = inverse(&S, "system uncertainty S").map_err(|e| {
        tracing::warn!("Innovation covariance is singular: {}", shape_of(&S));
        e
    })?;
    let K = &PHT * &SI;

    let x = x + &K * &y;
    let I_KH = DMatrix::identity(n, n) - &K * H;
    let P = &I_KH * P * I_KH.transpose() + &K * R * K.transpose();

    Ok(UpdateResult { x, P, y, K, S, SI })
}

impl KalmanFilter {
    /// Creates a filter with `dim_x` state variables, `dim_z` measurement
    /// inputs and `dim_u` control inputs. `P`, `Q`, `F` and `R` start as
    /// identity, `H`, `B` and `x` as zero.
    pub fn new(dim_x: usize, dim_z: usize, dim_u: usize) -> Result<Self> {
        if dim_x < 1 {
            return Err(FilterError::invalid("dim_x", dim_x, "must be 1 or more"));
        }
        if dim_z < 1 {
            return Err(FilterError::invalid("dim_z", dim_z, "must be 1 or more"));
        }

        Ok(Self {
            dim_x,
            dim_z,
            dim_u,
            x: DVector::zeros(dim_x),
            P: DMatrix::identity(dim_x, dim_x),
            Q: DMatrix::identity(dim_x, dim_x),
            B: DMatrix::zeros(dim_x, dim_u),
            F: DMatrix::identity(dim_x, dim_x),
            H: DMatrix::zeros(dim_z, dim_x),
            R: DMatrix::identity(dim_z, dim_z),
            M: DMatrix::zeros(dim_x, dim_z),
            z: None,
            K: DMatrix::zeros(dim_x, dim_z),
            y: DVector::zeros(dim_z),
            S: DMatrix::zeros(dim_z, dim_z),
            SI: DMatrix::zeros(dim_z, dim_z),
            x_prior: DVector::zeros(dim_x),
            P_prior: DMatrix::identity(dim_x, dim_x),
            x_post: DVector::zeros(dim_x),
            P_post: DMatrix::identity(dim_x, dim_x),
            alpha_sq: 1.0,
        })
    }

    /// Fading memory factor. Values above 1 weight recent measurements
    /// more heavily.
    pub fn alpha(&self) -> f64 {
        self.alpha_sq.sqrt()
    }

    pub fn set_alpha(&mut self, alpha: f64) -> Result<()> {
        if alpha.is_nan() || alpha < 1.0 {
            return Err(FilterError::invalid("alpha", alpha, "must be 1 or greater"));
        }
        self.alpha_sq = alpha * alpha;
        Ok(())
    }

    pub fn predict(&mut self, u: Option<&DVector<f64>>) -> Result<()> {
        self.predict_with(u, None, None, None)
    }

    /// Predict using optional one-off `B`, `F`, `Q` instead of the
    /// filter's own.
    pub fn predict_with(
        &mut self,
        u: Option<&DVector<f64>>,
        B: Option<&DMatrix<f64>>,
        F: Option<&DMatrix<f64>>,
        Q: Option<&DMatrix<f64>>,
    ) -> Result<()> {
        let B = B.unwrap_or(&self.B);
        let F = F.unwrap_or(&self.F);
        let Q = Q.unwrap_or(&self.Q);
        let u = u.filter(|_| B.ncols() > 0);

        let (x, P) = predict(&self.x, &self.P, F, Q, u, Some(B), self.alpha_sq.sqrt())?;
        self.x = x;
        self.P = P;

        self.x_prior = self.x.clone();
        self.P_prior = self.P.clone();
        Ok(())
    }

    pub fn update(&mut self, z: &DVector<f64>) -> Result<()> {
        self.update_with(z, None, None)
    }

    /// Update using optional one-off `R` and `H`.
    pub fn update_with(
        &mut self,
        z: &DVector<f64>,
        R: Option<&DMatrix<f64>>,
        H: Option<&DMatrix<f64>>,
    ) -> Result<()> {
        let R = R.unwrap_or(&self.R);
        let H = H.unwrap_or(&self.H);

        let result = update(&self.x, &self.P, z, R, H)?;
        self.x = result.x;
        self.P = result.P;
        self.y = result.y;
        self.K = result.K;
        self.S = result.S;
        self.SI = result.SI;

        tracing::debug!(mahalanobis = self.mahalanobis(), "kalman update");

        self.z = Some(z.clone());
        self.x_post = self.x.clone();
        self.P_post = self.P.clone();
        Ok(())
    }

    /// Records a missing measurement: the posterior equals the prior and
    /// the residual is cleared.
    pub fn update_missing(&mut self) {
        self.z = None;
        self.y = DVector::zeros(self.dim_z);
        self.x_post = self.x.clone();
        self.P_post = self.P.clone();
    }

    /// Update with a precomputed steady state gain `K`; `P` is untouched.
    pub fn update_steadystate(&mut self, z: &DVector<f64>) -> Result<()> {
        check_len(z, self.dim_z, "update_steadystate z")?;
        check_shape(&self.K, self.dim_x, self.dim_z, "update_steadystate K")?;

        self.y = z - &self.H * &self.x;
        self.x += &self.K * &self.y;

        self.z = Some(z.clone());
        self.x_post = self.x.clone();
        self.P_post = self.P.clone();
        Ok(())
    }

    /// Predict the state only; for use with [`Self::update_steadystate`].
    pub fn predict_steadystate(&mut self, u: Option<&DVector<f64>>) -> Result<()> {
        let mut x = &self.F * &self.x;
        if let Some(u) = u.filter(|_| self.dim_u > 0) {
            check_shape(&self.B, self.dim_x, u.len(), "predict_steadystate B")?;
            x += &self.B * u;
        }
        self.x = x;
        self.x_prior = self.x.clone();
        self.P_prior = self.P.clone();
        Ok(())
    }

    /// Update for process noise correlated with measurement noise through
    /// the cross covariance `M`.
    pub fn update_correlated(&mut self, z: &DVector<f64>) -> Result<()> {
        check_len(z, self.dim_z, "update_correlated z")?;
        check_shape(&self.M, self.dim_x, self.dim_z, "update_correlated M")?;

        let H = &self.H;
        self.y = z - H * &self.x;
        let PHT = &self.P * H.transpose();
        self.S = H * &PHT + H * &self.M + self.M.transpose() * H.transpose() + &self.R;
        self.SI = inverse(&self.S, "system uncertainty S")?;
        self.K = (PHT + &self.M) * &self.SI;

        self.x += &self.K * &self.y;
        self.P = &self.P - &self.K * (H * &self.P + self.M.transpose());

        self.z = Some(z.clone());
        self.x_post = self.x.clone();
        self.P_post = self.P.clone();
        Ok(())
    }

    /// Predict, then update, over every measurement. `None` measurements
    /// skip the update.
    pub fn batch_filter(
        &mut self,
        zs: &[Option<DVector<f64>>],
        inputs: &BatchInputs<'_>,
    ) -> Result<BatchOutput> {
        let n = zs.len();
        check_batch_len(inputs.us, n, "batch_filter us")?;
        check_batch_len(inputs.Fs, n, "batch_filter Fs")?;
        check_batch_len(inputs.Qs, n, "batch_filter Qs")?;
        check_batch_len(inputs.Hs, n, "batch_filter Hs")?;
        check_batch_len(inputs.Rs, n, "batch_filter Rs")?;
        check_batch_len(inputs.Bs, n, "batch_filter Bs")?;

        let mut out = BatchOutput {
            means: Vec::with_capacity(n),
            covariances: Vec::with_capacity(n),
            means_prior: Vec::with_capacity(n),
            covariances_prior: Vec::with_capacity(n),
        };

        for (i, z) in zs.iter().enumerate() {
            let u = slice_entry(inputs.us, i);
            let F = slice_entry(inputs.Fs, i);
            let Q = slice_entry(inputs.Qs, i);
            let H = slice_entry(inputs.Hs, i);
            let R = slice_entry(inputs.Rs, i);
            let B = slice_entry(inputs.Bs, i);

            if inputs.update_first {
                self.step_update(z.as_ref(), R, H)?;
                out.means.push(self.x.clone());
                out.covariances.push(self.P.clone());

                self.predict_with(u, B, F, Q)?;
                out.means_prior.push(self.x.clone());
                out.covariances_prior.push(self.P.clone());
            } else {
                self.predict_with(u, B, F, Q)?;
                out.means_prior.push(self.x.clone());
                out.covariances_prior.push(self.P.clone());

                self.step_update(z.as_ref(), R, H)?;
                out.means.push(self.x.clone());
                out.covariances.push(self.P.clone());
            }
        }

        Ok(out)
    }

    fn step_update(
        &mut self,
        z: Option<&DVector<f64>>,
        R: Option<&DMatrix<f64>>,
        H: Option<&DMatrix<f64>>,
    ) -> Result<()> {
        match z {
            Some(z) => self.update_with(z, R, H),
            None => {
                self.update_missing();
                Ok(())
            }
        }
    }

    /// Rauch-Tung-Striebel smoother over the output of a batch run.
    /// `Fs`/`Qs` default to the filter's own `F`/`Q` at every step.
    pub fn rts_smoother(
        &self,
        Xs: &[DVector<f64>],
        Ps: &[DMatrix<f64>],
        Fs: Option<&[DMatrix<f64>]>,
        Qs: Option<&[DMatrix<f64>]>,
    ) -> Result<RtsOutput> {
        let n = Xs.len();
        if Ps.len() != n {
            return Err(FilterError::dimension("rts_smoother Ps", n, Ps.len()));
        }
        check_batch_len(Fs, n, "rts_smoother Fs")?;
        check_batch_len(Qs, n, "rts_smoother Qs")?;

        let dim_x = self.dim_x;
        let mut x = Xs.to_vec();
        let mut P = Ps.to_vec();
        let mut Pp = Ps.to_vec();
        let mut K = vec![DMatrix::zeros(dim_x, dim_x); n];

        if n < 2 {
            return Ok(RtsOutput { x, P, K, Pp });
        }

        for k in (0..n - 1).rev() {
            let F = slice_entry(Fs, k + 1).unwrap_or(&self.F);
            let Q = slice_entry(Qs, k + 1).unwrap_or(&self.Q);

            Pp[k] = F * &P[k] * F.transpose() + Q;
            K[k] = &P[k] * F.transpose() * inverse(&Pp[k], "rts_smoother predicted P")?;
            let dx = &K[k] * (&x[k + 1] - F * &x[k]);
            x[k] += dx;
            let dP = &K[k] * (&P[k + 1] - &Pp[k]) * K[k].transpose();
            P[k] += dP;
        }

        Ok(RtsOutput { x, P, K, Pp })
    }

    /// The `(x, P)` a predict would produce, without changing the filter.
    pub fn get_prediction(&self, u: Option<&DVector<f64>>) -> Result<(DVector<f64>, DMatrix<f64>)> {
        let u = u.filter(|_| self.dim_u > 0);
        predict(&self.x, &self.P, &self.F, &self.Q, u, Some(&self.B), self.alpha())
    }

    /// The `(x, P)` an update would produce, without changing the filter.
    pub fn get_update(&self, z: &DVector<f64>) -> Result<(DVector<f64>, DMatrix<f64>)> {
        let result = update(&self.x, &self.P, z, &self.R, &self.H)?;
        Ok((result.x, result.P))
    }

    /// Residual between `z` and the prior expressed in measurement space.
    pub fn residual_of(&self, z: &DVector<f64>) -> Result<DVector<f64>> {
        check_len(z, self.dim_z, "residual_of z")?;
        Ok(z - &self.H * &self.x_prior)
    }

    /// Converts a state vector into measurement space.
    pub fn measurement_of_state(&self, x: &DVector<f64>) -> Result<DVector<f64>> {
        check_len(x, self.dim_x, "measurement_of_state x")?;
        Ok(&self.H * x)
    }

    /// Log-likelihood of the last measurement.
    pub fn log_likelihood(&self) -> Result<f64> {
        let zero = DVector::zeros(self.y.len());
        stats::logpdf(&self.y, &zero, &self.S, true)
    }

    /// Likelihood of the last measurement, floored at the smallest
    /// positive float.
    pub fn likelihood(&self) -> Result<f64> {
        let l = self.log_likelihood()?.exp();
        Ok(if l == 0.0 { f64::MIN_POSITIVE } else { l })
    }

    /// Mahalanobis distance of the last residual.
    pub fn mahalanobis(&self) -> f64 {
        (self.y.transpose() * &self.SI * &self.y)[(0, 0)].max(0.0).sqrt()
    }

    /// Log-likelihood of a measurement `z` against the current state.
    pub fn log_likelihood_of(&self, z: &DVector<f64>) -> Result<f64> {
        stats::log_likelihood(z, &self.x, &self.P, &self.H, &self.R)
    }

    /// Checks that every matrix has the shape implied by `dim_x`, `dim_z`
    /// and `dim_u`.
    pub fn test_matrix_dimensions(&self) -> Result<()> {
        let (n, m, k) = (self.dim_x, self.dim_z, self.dim_u);
        check_len(&self.x, n, "x")?;
        check_shape(&self.P, n, n, "P")?;
        check_shape(&self.Q, n, n, "Q")?;
        check_shape(&self.F, n, n, "F")?;
        check_shape(&self.B, n, k, "B")?;
        check_shape(&self.H, m, n, "H")?;
        check_shape(&self.R, m, m, "R")?;
        check_shape(&self.M, n, m, "M")?;
        Ok(())
    }
}

impl Snapshot for KalmanFilter {
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
    use crate::common::helpers::Saver;
    use approx::assert_relative_eq;

    fn constant_velocity() -> KalmanFilter {
        let mut kf = KalmanFilter::new(2, 1, 0).unwrap();
        kf.F = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 0.0, 1.0]);
        kf.H = DMatrix::from_row_slice(1, 2, &[1.0, 0.0]);
        kf.P *= 100.0;
        kf.R *= 5.0;
        kf.Q *= 0.001;
        kf
    }

    fn z(v: f64) -> DVector<f64> {
        DVector::from_element(1, v)
    }

    #[test]
    fn test_rejects_zero_dims() {
        assert!(KalmanFilter::new(0, 1, 0).is_err());
        assert!(KalmanFilter::new(1, 0, 0).is_err());
    }

    #[test]
    fn test_noiseless_track_converges() {
        let mut kf = constant_velocity();
        for i in 0..100 {
            kf.predict(None).unwrap();
            kf.update(&z(i as f64 * 2.0)).unwrap();
        }
        assert_relative_eq!(kf.x[1], 2.0, epsilon = 1e-2);
        assert_relative_eq!(kf.x[0], 198.0, epsilon = 1e-1);
    }

    #[test]
    fn test_prior_and_posterior_recorded() {
        let mut kf = constant_velocity();
        kf.predict(None).unwrap();
        let prior = kf.x_prior.clone();
        kf.update(&z(3.0)).unwrap();
        assert_eq!(prior, kf.x_prior);
        assert_eq!(kf.x, kf.x_post);
        assert_relative_eq!(kf.y[0], 3.0);
        assert_relative_eq!(kf.residual_of(&z(3.0)).unwrap()[0], 3.0);
    }

    #[test]
    fn test_missing_measurement_keeps_prior() {
        let mut kf = constant_velocity();
        kf.predict(None).unwrap();
        kf.update(&z(3.0)).unwrap();
        kf.predict(None).unwrap();
        let (x_prior, P_prior) = (kf.x.clone(), kf.P.clone());
        kf.update_missing();
        assert_eq!(kf.x, x_prior);
        assert_eq!(kf.P, P_prior);
        assert_eq!(kf.x_post, kf.x_prior);
        assert_eq!(kf.P_post, kf.P_prior);
        assert_eq!(kf.y, DVector::zeros(kf.dim_z));
        assert!(kf.z.is_none());
    }

    #[test]
    fn test_alpha_fades_memory() {
        let mut kf = constant_velocity();
        assert!(kf.set_alpha(0.5).is_err());
        kf.set_alpha(1.1).unwrap();
        assert_relative_eq!(kf.alpha(), 1.1);

        let mut plain = constant_velocity();
        kf.predict(None).unwrap();
        plain.predict(None).unwrap();
        assert!(kf.P[(0, 0)] > plain.P[(0, 0)]);
    }

    #[test]
    fn test_get_prediction_does_not_mutate() {
        let mut kf = constant_velocity();
        kf.x = DVector::from_vec(vec![1.0, 2.0]);
        let (x, _) = kf.get_prediction(None).unwrap();
        assert_relative_eq!(x[0], 3.0);
        assert_relative_eq!(kf.x[0], 1.0);

        let (x, p) = kf.get_update(&z(10.0)).unwrap();
        assert!(x[0] > 1.0);
        assert!(p[(0, 0)] < kf.P[(0, 0)]);
    }

    #[test]
    fn test_dimension_checks() {
        let mut kf = constant_velocity();
        assert!(kf.update(&DVector::zeros(2)).is_err());
        kf.H = DMatrix::zeros(2, 2);
        assert!(kf.test_matrix_dimensions().is_err());
    }

    #[test]
    fn test_steadystate_uses_fixed_gain() {
        let mut kf = constant_velocity();
        kf.K = DMatrix::from_row_slice(2, 1, &[0.5, 0.1]);
        kf.predict_steadystate(None).unwrap();
        kf.update_steadystate(&z(4.0)).unwrap();
        assert_relative_eq!(kf.x[0], 2.0);
        assert_relative_eq!(kf.x[1], 0.4);
    }

    #[test]
    fn test_correlated_update_with_zero_m_matches_standard() {
        let mut a = constant_velocity();
        let mut b = constant_velocity();
        a.predict(None).unwrap();
        b.predict(None).unwrap();
        a.update(&z(1.5)).unwrap();
        b.update_correlated(&z(1.5)).unwrap();
        assert_relative_eq!(a.x, b.x, epsilon = 1e-10);
        assert_relative_eq!(a.P, b.P, epsilon = 1e-8);
    }

    #[test]
    fn test_saver_records_each_step() {
        let mut kf = constant_velocity();
        let mut saver = Saver::new();
        for i in 0..5 {
            kf.predict(None).unwrap();
            kf.update(&z(i as f64)).unwrap();
            saver.save(&kf);
        }
        assert_eq!(saver.len(), 5);
        let positions = saver.map_field(|s| s.x[0]);
        assert_eq!(positions.len(), 5);
        assert_eq!(saver.last().unwrap().z.as_ref().unwrap()[0], 4.0);
    }

    #[test]
    fn test_log_likelihood_and_mahalanobis() {
        let mut kf = constant_velocity();
        kf.predict(None).unwrap();
        kf.update(&z(0.0)).unwrap();
        assert_relative_eq!(kf.mahalanobis(), 0.0);
        let ll = kf.log_likelihood().unwrap();
        let expected = stats::logpdf_1d(0.0, 0.0, kf.S[(0, 0)]).unwrap();
        assert_relative_eq!(ll, expected, epsilon = 1e-12);
        assert!(kf.likelihood().unwrap() > 0.0);
    }

    #[test]
    fn test_control_input() {
        let mut kf = KalmanFilter::new(1, 1, 1).unwrap();
        kf.B = DMatrix::from_element(1, 1, 2.0);
        kf.predict(Some(&DVector::from_element(1, 1.5))).unwrap();
        assert_relative_eq!(kf.x[0], 3.0);
    }
}
