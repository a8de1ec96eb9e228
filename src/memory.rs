//! Fading memory polynomial filter.

use crate::common::error::{FilterError, Result};
use nalgebra::DVector;

/// Critically damped fading memory filter of `order` 0, 1 or 2.
///
/// Older measurements are discounted geometrically by `beta`, which must
/// lie strictly between 0 and 1. `P` holds the variance reduction factor
/// of each estimated derivative and `e` the steady state lag error.
#[derive(Debug, Clone, PartialEq)]
pub struct FadingMemoryFilter {
    pub x: DVector<f64>,
    pub dt: f64,
    pub beta: f64,
    pub P: DVector<f64>,
    pub e: DVector<f64>,
    /// Residual of the last update.
    pub y: f64,
    order: usize,
}

impl FadingMemoryFilter {
    /// `x0` is either the initial value alone or the full `order + 1`
    /// state.
    pub fn new(x0: &[f64], dt: f64, order: usize, beta: f64) -> Result<Self> {
        if order > 2 {
            return Err(FilterError::invalid("order", order, "must be 0, 1 or 2"));
        }
        if dt.is_nan() || dt <= 0.0 {
            return Err(FilterError::invalid("dt", dt, "must be positive"));
        }
        if beta.is_nan() || beta <= 0.0 || beta >= 1.0 {
            return Err(FilterError::invalid("beta", beta, "must be in (0, 1)"));
        }

        let mut x = DVector::zeros(order + 1);
        match x0.len() {
            1 => x[0] = x0[0],
            n if n == order + 1 => x.copy_from_slice(x0),
            n => return Err(FilterError::dimension("FadingMemoryFilter x0", order + 1, n)),
        }

        let b = beta;
        let (P, e) = match order {
            0 => (
                vec![(1.0 - b) / (1.0 + b)],
                vec![dt * b / (1.0 - b)],
            ),
            1 => {
                let p11 = (1.0 - b) * (1.0 + 4.0 * b + 5.0 * b * b) / (1.0 + b).powi(3);
                let p22 = 2.0 * (1.0 - b).powi(3) / (1.0 + b).powi(3);
                let e = 2.0 * dt * dt * (b / (1.0 - b)).powi(2);
                let de = dt * (1.0 + 3.0 * b) / (1.0 - b);
                (vec![p11, p22], vec![e, de])
            }
            _ => {
                let p11 = (1.0 - b)
                    * ((1.0 + 6.0 * b + 16.0 * b * b + 24.0 * b.powi(3) + 19.0 * b.powi(4))
                        / (1.0 + b).powi(5));
                let p22 = (1.0 - b).powi(3)
                    * ((13.0 + 50.0 * b + 49.0 * b * b) / (2.0 * (1.0 + b).powi(5) * dt * dt));
                let p33 = 6.0 * (1.0 - b).powi(5) / ((1.0 + b).powi(5) * dt.powi(4));
                let e = 6.0 * dt.powi(3) * (b / (1.0 - b)).powi(3);
                let de = dt * dt * (2.0 + 5.0 * b + 11.0 * b * b) / (1.0 - b).powi(2);
                let dde = 6.0 * dt * (1.0 + 2.0 * b) / (1.0 - b);
                (vec![p11, p22, p33], vec![e, de, dde])
            }
        };

        Ok(Self {
            x,
            dt,
            beta,
            P: DVector::from_vec(P),
            e: DVector::from_vec(e),
            y: 0.0,
            order,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn update(&mut self, z: f64) -> &DVector<f64> {
        let b = self.beta;
        let dt = self.dt;
        match self.order {
            0 => {
                self.y = z - self.x[0];
                self.x[0] += (1.0 - b) * self.y;
            }
            1 => {
                let g = 1.0 - b * b;
                let h = (1.0 - b).powi(2);
                let (x, dx) = (self.x[0], self.x[1]);
                let dxdt = dx * dt;
                self.y = z - (x + dxdt);
                self.x[0] = x + dxdt + g * self.y;
                self.x[1] = dx + h / dt * self.y;
            }
            _ => {
                let g = 1.0 - b.powi(3);
                let h = 1.5 * (1.0 + b) * (1.0 - b).powi(2);
                let k = 0.5 * (1.0 - b).powi(3);
                let (x, dx, ddx) = (self.x[0], self.x[1], self.x[2]);
                let dxdt = dx * dt;
                let t2 = dt * dt;
                self.y = z - (x + dxdt + 0.5 * ddx * t2);
                self.x[0] = x + dxdt + 0.5 * ddx * t2 + g * self.y;
                self.x[1] = dx + ddx * dt + h * self.y / dt;
                self.x[2] = ddx + 2.0 * k * self.y / t2;
            }
        }
        &self.x
    }
}
