use crate::common::error::Result;
use crate::kalman::imm::{check_bank, combine, normalized};
use crate::kalman::kalman_filter::KalmanFilter;
use nalgebra::{DMatrix, DVector};

/// Multiple model adaptive estimator.
///
/// A bank of independent Kalman filters; the probability of each is
/// multiplied by the likelihood it assigns to every measurement. Unlike
/// [`crate::kalman::IMMEstimator`] the filters never exchange state.
#[derive(Debug, Clone)]
pub struct MMAEFilterBank {
    pub filters: Vec<KalmanFilter>,
    pub p: DVector<f64>,
    pub dim_x: usize,

    pub x: DVector<f64>,
    pub P: DMatrix<f64>,
}

impl MMAEFilterBank {
    pub fn new(filters: Vec<KalmanFilter>, p: DVector<f64>) -> Result<Self> {
        check_bank(&filters, &p)?;
        let p = normalized(p, "mmae p")?;
        let (x, P) = combine(&filters, &p);
        Ok(Self {
            dim_x: filters[0].dim_x,
            filters,
            p,
            x,
            P,
        })
    }

    pub fn predict(&mut self, u: Option<&DVector<f64>>) -> Result<()> {
        for f in self.filters.iter_mut() {
            f.predict(u)?;
        }
        Ok(())
    }

    /// Updates every filter and reweights them by the likelihood of `z`.
    /// `R`/`H` override each filter's own for this step.
    pub fn update(
        &mut self,
        z: &DVector<f64>,
        R: Option<&DMatrix<f64>>,
        H: Option<&DMatrix<f64>>,
    ) -> Result<()> {
        let mut p = self.p.clone();
        for (i, f) in self.filters.iter_mut().enumerate() {
            f.update_with(z, R, H)?;
            p[i] *= f.likelihood()?;
        }
        self.p = normalized(p, "mmae p")?;

        let (x, P) = combine(&self.filters, &self.p);
        self.x = x;
        self.P = P;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn filter(velocity_model: bool) -> KalmanFilter {
        let mut kf = KalmanFilter::new(2, 1, 0).unwrap();
        let dt = if velocity_model { 1.0 } else { 0.0 };
        kf.F = DMatrix::from_row_slice(2, 2, &[1.0, dt, 0.0, 1.0]);
        kf.H = DMatrix::from_row_slice(1, 2, &[1.0, 0.0]);
        kf.Q *= 0.01;
        kf.x = DVector::from_vec(vec![0.0, 2.0]);
        kf
    }

    #[test]
    fn test_probability_concentrates_on_matching_model() {
        let mut bank = MMAEFilterBank::new(
            vec![filter(true), filter(false)],
            DVector::from_vec(vec![0.5, 0.5]),
        )
        .unwrap();

        for i in 1..20 {
            bank.predict(None).unwrap();
            bank.update(&DVector::from_element(1, 2.0 * i as f64), None, None)
                .unwrap();
        }
        assert_relative_eq!(bank.p.sum(), 1.0, epsilon = 1e-12);
        assert!(bank.p[0] > 0.99);
        assert_relative_eq!(bank.x[0], 38.0, epsilon = 0.1);
    }

    #[test]
    fn test_combined_covariance_includes_spread() {
        let mut a = filter(true);
        let mut b = filter(true);
        a.x[0] = -1.0;
        b.x[0] = 1.0;
        let bank = MMAEFilterBank::new(vec![a, b], DVector::from_vec(vec![1.0, 1.0])).unwrap();
        assert_relative_eq!(bank.x[0], 0.0);
        // identity P plus the spread of the two means
        assert_relative_eq!(bank.P[(0, 0)], 2.0);
    }
}
