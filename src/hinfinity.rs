//! H-infinity filter: minimises the worst case estimation error rather
//! than the mean squared error, trading optimality for robustness to
//! unknown noise statistics.

use crate::common::error::{FilterError, Result};
use crate::common::linalg::{check_len, check_shape, inverse, symmetrize};
use nalgebra::{DMatrix, DVector};

/// H-infinity filter.
///
/// `gamma` bounds the performance; larger values approach the Kalman
/// filter's optimism. `Q` weights the estimation error, `W` is the
/// process noise and `V` the measurement noise.
#[derive(Debug, Clone)]
pub struct HInfinityFilter {
    pub dim_x: usize,
    pub dim_z: usize,
    pub dim_u: usize,
    pub gamma: f64,

    pub x: DVector<f64>,
    pub P: DMatrix<f64>,
    pub F: DMatrix<f64>,
    pub H: DMatrix<f64>,
    pub B: DMatrix<f64>,
    pub Q: DMatrix<f64>,
    pub W: DMatrix<f64>,

    pub K: DMatrix<f64>,
    pub y: DVector<f64>,
    pub z: Option<DVector<f64>>,

    V: DMatrix<f64>,
    V_inv: DMatrix<f64>,
}

impl HInfinityFilter {
    pub fn new(dim_x: usize, dim_z: usize, dim_u: usize, gamma: f64) -> Result<Self> {
        if dim_x < 1 || dim_z < 1 {
            return Err(FilterError::invalid(
                "dim_x/dim_z",
                format!("{}/{}", dim_x, dim_z),
                "must be 1 or more",
            ));
        }
        if !gamma.is_finite() {
            return Err(FilterError::invalid("gamma", gamma, "must be finite"));
        }
        Ok(Self {
            dim_x,
            dim_z,
            dim_u,
            gamma,
            x: DVector::zeros(dim_x),
            P: DMatrix::identity(dim_x, dim_x),
            F: DMatrix::identity(dim_x, dim_x),
            H: DMatrix::zeros(dim_z, dim_x),
            B: DMatrix::zeros(dim_x, dim_u),
            Q: DMatrix::identity(dim_x, dim_x),
            W: DMatrix::zeros(dim_x, dim_x),
            K: DMatrix::zeros(dim_x, dim_z),
            y: DVector::zeros(dim_z),
            z: None,
            V: DMatrix::zeros(dim_z, dim_z),
            V_inv: DMatrix::zeros(dim_z, dim_z),
        })
    }

    pub fn V(&self) -> &DMatrix<f64> {
        &self.V
    }

    /// Sets the measurement noise, caching its inverse.
    pub fn set_V(&mut self, V: DMatrix<f64>) -> Result<()> {
        check_shape(&V, self.dim_z, self.dim_z, "hinfinity V")?;
        self.V_inv = inverse(&V, "hinfinity V")?;
        self.V = V;
        Ok(())
    }

    pub fn predict(&mut self, u: Option<&DVector<f64>>) -> Result<()> {
        self.x = self.get_prediction(u)?;
        Ok(())
    }

    pub fn update(&mut self, z: &DVector<f64>) -> Result<()> {
        check_len(z, self.dim_z, "hinfinity update z")?;
        check_shape(&self.H, self.dim_z, self.dim_x, "hinfinity H")?;

        let I = DMatrix::<f64>::identity(self.dim_x, self.dim_x);
        let HTVI = self.H.transpose() * &self.V_inv;
        let L = inverse(
            &(I - &self.Q * &self.P * self.gamma + &HTVI * &self.H * &self.P),
            "hinfinity L",
        )
        .map_err(|e| {
            tracing::warn!(gamma = self.gamma, "H-infinity gain is undefined, gamma may be too large");
            e
        })?;

        let PL = &self.P * L;
        self.K = &PL * &HTVI;

        self.y = z - &self.H * &self.x;
        self.x += &self.K * &self.y;

        // P is propagated to the next step here; predict only moves x
        self.P = symmetrize(&(&self.F * &PL * self.F.transpose() + &self.W));
        self.z = Some(z.clone());
        Ok(())
    }

    /// Runs predict/update (or update/predict) over every measurement,
    /// returning the states and covariances after each step.
    pub fn batch_filter(
        &mut self,
        zs: &[DVector<f64>],
        us: Option<&[DVector<f64>]>,
        update_first: bool,
    ) -> Result<(Vec<DVector<f64>>, Vec<DMatrix<f64>>)> {
        if let Some(us) = us {
            if us.len() != zs.len() {
                return Err(FilterError::dimension("hinfinity batch us", zs.len(), us.len()));
            }
        }

        let mut means = Vec::with_capacity(zs.len());
        let mut covariances = Vec::with_capacity(zs.len());
        for (i, z) in zs.iter().enumerate() {
            let u = us.map(|us| &us[i]);
            if update_first {
                self.update(z)?;
                means.push(self.x.clone());
                covariances.push(self.P.clone());
                self.predict(u)?;
            } else {
                self.predict(u)?;
                self.update(z)?;
                means.push(self.x.clone());
                covariances.push(self.P.clone());
            }
        }
        Ok((means, covariances))
    }

    /// The state a predict would produce, without changing the filter.
    pub fn get_prediction(&self, u: Option<&DVector<f64>>) -> Result<DVector<f64>> {
        let mut x = &self.F * &self.x;
        if let Some(u) = u.filter(|_| self.dim_u > 0) {
            check_shape(&self.B, self.dim_x, u.len(), "hinfinity B")?;
            x += &self.B * u;
        }
        Ok(x)
    }

    pub fn residual_of(&self, z: &DVector<f64>) -> Result<DVector<f64>> {
        check_len(z, self.dim_z, "hinfinity residual_of z")?;
        Ok(z - &self.H * &self.x)
    }

    pub fn measurement_of_state(&self, x: &DVector<f64>) -> Result<DVector<f64>> {
        check_len(x, self.dim_x, "hinfinity measurement_of_state x")?;
        Ok(&self.H * x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tracker(gamma: f64) -> HInfinityFilter {
        let mut f = HInfinityFilter::new(2, 1, 0, gamma).unwrap();
        f.F = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 0.0, 1.0]);
        f.H = DMatrix::from_row_slice(1, 2, &[1.0, 0.0]);
        f.P *= 0.01;
        f.W = DMatrix::from_row_slice(2, 2, &[0.0003, 0.005, 0.005, 0.1]) * 0.001;
        f.set_V(DMatrix::from_element(1, 1, 0.01)).unwrap();
        f
    }

    #[test]
    fn test_tracks_constant_velocity() {
        let mut f = tracker(0.0);
        for i in 0..100 {
            f.update(&DVector::from_element(1, i as f64)).unwrap();
            f.predict(None).unwrap();
        }
        assert_relative_eq!(f.x[0], 100.0, epsilon = 0.1);
        assert_relative_eq!(f.x[1], 1.0, epsilon = 0.01);
    }

    #[test]
    fn test_covariance_stays_symmetric() {
        let mut f = tracker(0.01);
        let zs: Vec<_> = (0..20).map(|i| DVector::from_element(1, i as f64)).collect();
        let (means, ps) = f.batch_filter(&zs, None, true).unwrap();
        assert_eq!(means.len(), 20);
        for p in ps {
            assert_relative_eq!(p.clone(), p.transpose());
        }
    }

    #[test]
    fn test_singular_v_rejected() {
        let mut f = HInfinityFilter::new(2, 1, 0, 0.0).unwrap();
        assert!(f.set_V(DMatrix::zeros(1, 1)).is_err());
    }
}
