//! Recursive least squares polynomial fit.

use crate::common::error::{FilterError, Result};
use nalgebra::DVector;

/// Expanding memory least squares filter.
///
/// Fits a polynomial of `order` 0, 1 or 2 to evenly spaced measurements
/// recursively; after `n` measurements the estimate equals the batch
/// least squares fit of all of them.
#[derive(Debug, Clone, PartialEq)]
pub struct LeastSquaresFilter {
    pub dt: f64,
    pub sigma: f64,
    /// Number of measurements processed.
    pub n: usize,
    /// `[x, dx, ddx]` truncated to `order + 1`.
    pub x: DVector<f64>,
    pub K: DVector<f64>,
    pub y: f64,
    order: usize,
}

impl LeastSquaresFilter {
    /// `noise_sigma` is the measurement standard deviation, used only by
    /// [`LeastSquaresFilter::errors`].
    pub fn new(dt: f64, order: usize, noise_sigma: f64) -> Result<Self> {
        if order > 2 {
            return Err(FilterError::invalid("order", order, "must be 0, 1 or 2"));
        }
        if dt.is_nan() || dt <= 0.0 {
            return Err(FilterError::invalid("dt", dt, "must be positive"));
        }
        if noise_sigma.is_nan() || noise_sigma < 0.0 {
            return Err(FilterError::invalid("noise_sigma", noise_sigma, "must not be negative"));
        }
        Ok(Self {
            dt,
            sigma: noise_sigma,
            n: 0,
            x: DVector::zeros(order + 1),
            K: DVector::zeros(order + 1),
            y: 0.0,
            order,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Forgets every measurement.
    pub fn reset(&mut self) {
        self.n = 0;
        self.x = DVector::zeros(self.order + 1);
        self.K = DVector::zeros(self.order + 1);
        self.y = 0.0;
    }

    pub fn update(&mut self, z: f64) -> &DVector<f64> {
        self.n += 1;
        let n = self.n as f64;
        let dt = self.dt;
        let dt2 = dt * dt;

        match self.order {
            0 => {
                self.K[0] = 1.0 / n;
                self.y = z - self.x[0];
                self.x[0] += self.K[0] * self.y;
            }
            1 => {
                self.K[0] = 2.0 * (2.0 * n - 1.0) / (n * (n + 1.0));
                self.K[1] = 6.0 / (n * (n + 1.0) * dt);
                self.y = z - self.x[0] - dt * self.x[1];
                self.x[0] += self.K[0] * self.y + dt * self.x[1];
                self.x[1] += self.K[1] * self.y;
            }
            _ => {
                let den = n * (n + 1.0) * (n + 2.0);
                self.K[0] = 3.0 * (3.0 * n * n - 3.0 * n + 2.0) / den;
                self.K[1] = 18.0 * (2.0 * n - 1.0) / (den * dt);
                self.K[2] = 60.0 / (den * dt2);
                self.y = z - self.x[0] - dt * self.x[1] - 0.5 * dt2 * self.x[2];
                self.x[0] += self.K[0] * self.y + self.x[1] * dt + 0.5 * dt2 * self.x[2];
                self.x[1] += self.K[1] * self.y + self.x[2] * dt;
                self.x[2] += self.K[2] * self.y;
            }
        }
        &self.x
    }

    /// Theoretical `(error, std)` of each estimated derivative given the
    /// measurement noise.
    ///
    /// A standard deviation that needs more measurements than have been
    /// seen is infinite. `error` stays zero until every entry is defined.
    pub fn errors(&self) -> (DVector<f64>, DVector<f64>) {
        let k = self.order + 1;
        let mut std = DVector::from_element(k, f64::INFINITY);
        if self.n == 0 {
            return (DVector::zeros(k), std);
        }

        let n = self.n as f64;
        let sigma = self.sigma;
        let dt = self.dt;
        let dt2 = dt * dt;

        match self.order {
            0 => std[0] = sigma / n.sqrt(),
            1 => {
                std[0] = sigma * (2.0 * (2.0 * n - 1.0) / (n * (n + 1.0))).sqrt();
                if self.n > 1 {
                    std[1] = sigma / dt * (12.0 / (n * (n * n - 1.0))).sqrt();
                }
            }
            _ => {
                std[0] = sigma
                    * (3.0 * (3.0 * n * n - 3.0 * n + 2.0) / (n * (n + 1.0) * (n + 2.0))).sqrt();
                if self.n > 2 {
                    let den = n * (n * n - 1.0) * (n * n - 4.0);
                    std[1] = sigma / dt * (12.0 * (16.0 * n * n - 30.0 * n + 11.0) / den).sqrt();
                    std[2] = sigma / dt2 * (720.0 / den).sqrt();
                }
            }
        }

        let error = if self.n > self.order {
            std.clone()
        } else {
            DVector::zeros(k)
        };
        (error, std)
    }
}
