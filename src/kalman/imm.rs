use crate::common::error::{FilterError, Result};
use crate::common::linalg::{check_len, check_shape};
use crate::kalman::kalman_filter::KalmanFilter;
use nalgebra::{DMatrix, DVector};

/// Interacting multiple model estimator.
///
/// Runs a bank of Kalman filters, one per motion model, and blends them
/// according to the mode probabilities `mu`. `M[i][j]` is the probability
/// of switching from mode `i` to mode `j`.
#[derive(Debug, Clone)]
pub struct IMMEstimator {
    pub filters: Vec<KalmanFilter>,
    pub mu: DVector<f64>,
    pub M: DMatrix<f64>,

    pub x: DVector<f64>,
    pub P: DMatrix<f64>,
    pub x_prior: DVector<f64>,
    pub P_prior: DMatrix<f64>,
    pub x_post: DVector<f64>,
    pub P_post: DMatrix<f64>,

    /// Likelihood of the last measurement under each filter.
    pub likelihood: DVector<f64>,
    /// Mixing probabilities, `omega[(i, j)]` is the probability of being
    /// in mode `i` given that mode `j` is now in effect.
    pub omega: DMatrix<f64>,
    /// Total probability of each mode after the transition.
    pub cbar: DVector<f64>,
}

/// Probability weighted mean and covariance of a set of filters.
pub(crate) fn combine(
    filters: &[KalmanFilter],
    weights: &DVector<f64>,
) -> (DVector<f64>, DMatrix<f64>) {
    let n = filters[0].dim_x;
    let x = filters
        .iter()
        .zip(weights.iter())
        .fold(DVector::zeros(n), |acc, (f, w)| acc + &f.x * *w);

    let mut P = DMatrix::zeros(n, n);
    for (f, w) in filters.iter().zip(weights.iter()) {
        let y = &f.x - &x;
        P += (&y * y.transpose() + &f.P) * *w;
    }
    (x, P)
}

pub(crate) fn check_bank(filters: &[KalmanFilter], probabilities: &DVector<f64>) -> Result<()> {
    let first = filters.first().ok_or_else(|| FilterError::empty("filter bank"))?;
    for f in filters {
        if f.dim_x != first.dim_x {
            return Err(FilterError::dimension("filter bank dim_x", first.dim_x, f.dim_x));
        }
    }
    check_len(probabilities, filters.len(), "filter bank probabilities")?;
    if probabilities.iter().any(|&p| p.is_nan() || p < 0.0) {
        return Err(FilterError::invalid(
            "probabilities",
            format!("{:?}", probabilities.as_slice()),
            "must be non-negative",
        ));
    }
    Ok(())
}

pub(crate) fn normalized(p: DVector<f64>, context: &str) -> Result<DVector<f64>> {
    let total = p.sum();
    if !total.is_finite() || total <= 0.0 {
        return Err(FilterError::invalid(context, total, "must sum to a positive value"));
    }
    Ok(p / total)
}

impl IMMEstimator {
    pub fn new(filters: Vec<KalmanFilter>, mu: DVector<f64>, M: DMatrix<f64>) -> Result<Self> {
        check_bank(&filters, &mu)?;
        let n = filters.len();
        check_shape(&M, n, n, "imm transition M")?;
        let mu = normalized(mu, "imm mu")?;

        let (x, P) = combine(&filters, &mu);
        let mut imm = Self {
            mu,
            M,
            x_prior: x.clone(),
            P_prior: P.clone(),
            x_post: x.clone(),
            P_post: P.clone(),
            x,
            P,
            likelihood: DVector::zeros(n),
            omega: DMatrix::zeros(n, n),
            cbar: DVector::zeros(n),
            filters,
        };
        imm.compute_mixing_probabilities()?;
        Ok(imm)
    }

    fn compute_mixing_probabilities(&mut self) -> Result<()> {
        self.cbar = (self.mu.transpose() * &self.M).transpose();
        let n = self.filters.len();
        for j in 0..n {
            if self.cbar[j] <= 0.0 {
                return Err(FilterError::invalid(
                    "imm mode probability",
                    self.cbar[j],
                    "every mode must remain reachable",
                ));
            }
            for i in 0..n {
                self.omega[(i, j)] = self.M[(i, j)] * self.mu[i] / self.cbar[j];
            }
        }
        Ok(())
    }

    /// Mixes the filter states, then predicts each filter.
    pub fn predict(&mut self, u: Option<&DVector<f64>>) -> Result<()> {
        let mixed: Vec<(DVector<f64>, DMatrix<f64>)> = (0..self.filters.len())
            .map(|j| combine(&self.filters, &self.omega.column(j).into_owned()))
            .collect();

        for (f, (x, P)) in self.filters.iter_mut().zip(mixed) {
            f.x = x;
            f.P = P;
            f.predict(u)?;
        }

        let (x, P) = combine(&self.filters, &self.mu);
        self.x = x;
        self.P = P;
        self.x_prior = self.x.clone();
        self.P_prior = self.P.clone();
        Ok(())
    }

    /// Updates every filter with `z` and reweights the modes by how well
    /// each explains it.
    pub fn update(&mut self, z: &DVector<f64>) -> Result<()> {
        for (i, f) in self.filters.iter_mut().enumerate() {
            f.update(z)?;
            self.likelihood[i] = f.likelihood()?;
        }

        self.mu = normalized(self.cbar.component_mul(&self.likelihood), "imm mu")?;
        self.compute_mixing_probabilities()?;

        let (x, P) = combine(&self.filters, &self.mu);
        self.x = x;
        self.P = P;
        self.x_post = self.x.clone();
        self.P_post = self.P.clone();

        tracing::debug!(mu = ?self.mu.as_slice(), "imm update");
        Ok(())
    }
}
