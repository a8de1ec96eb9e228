//! Scalar measurement runners for each configurable filter kind.

use crate::app::config::FilterConfig;
use crate::app::error::{AppError, Result};
use filterpy::common::{kinematic_kf, q_discrete_white_noise};
use filterpy::gh::{GHFilter, GHKFilter};
use filterpy::hinfinity::HInfinityFilter;
use filterpy::kalman::KalmanFilter;
use filterpy::leastsq::LeastSquaresFilter;
use filterpy::memory::FadingMemoryFilter;
use nalgebra::{DMatrix, DVector};

/// Output of one filter step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub x: f64,
    pub dx: Option<f64>,
    pub variance: Option<f64>,
    pub residual: Option<f64>,
}

pub enum FilterRunner {
    Kalman(KalmanFilter),
    Gh(GHFilter),
    Ghk(GHKFilter),
    FadingMemory(FadingMemoryFilter),
    LeastSquares(LeastSquaresFilter),
    Hinfinity(HInfinityFilter),
}

impl FilterRunner {
    /// Builds the configured filter with its position initialised to the
    /// first measurement `z0` and every derivative at zero.
    pub fn build(config: &FilterConfig, z0: f64, dt: f64) -> Result<Self> {
        let runner = match *config {
            FilterConfig::Kalman { order, r, q, p0 } => {
                let mut kf = kinematic_kf(1, order, dt, 1, true)?;
                kf.x[0] = z0;
                kf.P *= p0;
                kf.R = DMatrix::from_element(1, 1, r);
                kf.Q = if order == 0 {
                    DMatrix::from_element(1, 1, q)
                } else {
                    q_discrete_white_noise(order + 1, dt, q, 1, true)?
                };
                FilterRunner::Kalman(kf)
            }
            FilterConfig::Gh { g, h } => FilterRunner::Gh(GHFilter::new(z0, 0.0, dt, g, h)?),
            FilterConfig::Ghk { g, h, k } => {
                FilterRunner::Ghk(GHKFilter::new(z0, 0.0, 0.0, dt, g, h, k)?)
            }
            FilterConfig::FadingMemory { order, beta } => {
                FilterRunner::FadingMemory(FadingMemoryFilter::new(&[z0], dt, order, beta)?)
            }
            FilterConfig::LeastSquares { order, noise_sigma } => {
                FilterRunner::LeastSquares(LeastSquaresFilter::new(dt, order, noise_sigma)?)
            }
            FilterConfig::Hinfinity { gamma, q, r } => {
                let mut hf = HInfinityFilter::new(2, 1, 0, gamma)?;
                hf.x[0] = z0;
                hf.F = DMatrix::from_row_slice(2, 2, &[1.0, dt, 0.0, 1.0]);
                hf.H = DMatrix::from_row_slice(1, 2, &[1.0, 0.0]);
                hf.W = q_discrete_white_noise(2, dt, q, 1, true)?;
                hf.set_V(DMatrix::from_element(1, 1, r))?;
                FilterRunner::Hinfinity(hf)
            }
        };
        tracing::debug!(kind = config.kind(), z0, dt, "filter built");
        Ok(runner)
    }

    /// Advances one time step. A missing measurement coasts the
    /// filter on its motion model where the filter has one.
    pub fn step(&mut self, z: Option<f64>) -> Result<Estimate> {
        match self {
            FilterRunner::Kalman(kf) => {
                kf.predict(None)?;
                match z {
                    Some(z) => kf.update(&DVector::from_element(1, z))?,
                    None => kf.update_missing(),
                }
                Ok(Estimate {
                    x: kf.x[0],
                    dx: (kf.dim_x > 1).then(|| kf.x[1]),
                    variance: Some(kf.P[(0, 0)]),
                    residual: z.map(|_| kf.y[0]),
                })
            }
            FilterRunner::Gh(f) => {
                match z {
                    Some(z) => {
                        f.update(z);
                    }
                    None => f.x += f.dx * f.dt,
                }
                Ok(Estimate {
                    x: f.x,
                    dx: Some(f.dx),
                    variance: None,
                    residual: z.map(|_| f.y),
                })
            }
            FilterRunner::Ghk(f) => {
                match z {
                    Some(z) => {
                        f.update(z);
                    }
                    None => {
                        f.x += f.dx * f.dt + 0.5 * f.ddx * f.dt * f.dt;
                        f.dx += f.ddx * f.dt;
                    }
                }
                Ok(Estimate {
                    x: f.x,
                    dx: Some(f.dx),
                    variance: None,
                    residual: z.map(|_| f.y),
                })
            }
            FilterRunner::FadingMemory(f) => {
                let z = z.ok_or_else(|| {
                    AppError::processing("fading_memory filter cannot skip a missing measurement")
                })?;
                let x = f.update(z);
                Ok(Estimate {
                    x: x[0],
                    dx: (x.len() > 1).then(|| x[1]),
                    variance: None,
                    residual: Some(f.y),
                })
            }
            FilterRunner::LeastSquares(f) => {
                let z = z.ok_or_else(|| {
                    AppError::processing("least_squares filter cannot skip a missing measurement")
                })?;
                f.update(z);
                let (_, std) = f.errors();
                Ok(Estimate {
                    x: f.x[0],
                    dx: (f.x.len() > 1).then(|| f.x[1]),
                    variance: Some(std[0] * std[0]),
                    residual: Some(f.y),
                })
            }
            FilterRunner::Hinfinity(f) => {
                let residual = match z {
                    Some(z) => {
                        f.update(&DVector::from_element(1, z))?;
                        Some(f.y[0])
                    }
                    None => None,
                };
                let estimate = Estimate {
                    x: f.x[0],
                    dx: Some(f.x[1]),
                    variance: Some(f.P[(0, 0)]),
                    residual,
                };
                f.predict(None)?;
                Ok(estimate)
            }
        }
    }
}
