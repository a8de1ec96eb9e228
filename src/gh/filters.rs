use crate::common::error::{FilterError, Result};
use serde::Serialize;

fn check_dt(dt: f64) -> Result<()> {
    if dt.is_nan() || dt <= 0.0 {
        return Err(FilterError::invalid("dt", dt, "must be positive"));
    }
    Ok(())
}

/// Estimates produced by [`GHFilter::batch_filter`]. Index 0 holds the
/// initial state, index `i + 1` the estimate after measurement `i`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GhEstimates {
    pub x: Vec<f64>,
    pub dx: Vec<f64>,
    /// Predicted position before each measurement, when requested.
    pub predictions: Option<Vec<f64>>,
}

/// g-h (alpha-beta) filter tracking a value and its rate of change.
#[derive(Debug, Clone, PartialEq)]
pub struct GHFilter {
    pub x: f64,
    pub dx: f64,
    pub dt: f64,
    pub g: f64,
    pub h: f64,

    pub x_prediction: f64,
    pub dx_prediction: f64,
    /// Residual of the last update.
    pub y: f64,
    pub z: Option<f64>,
}

impl GHFilter {
    pub fn new(x: f64, dx: f64, dt: f64, g: f64, h: f64) -> Result<Self> {
        check_dt(dt)?;
        Ok(Self {
            x,
            dx,
            dt,
            g,
            h,
            x_prediction: x,
            dx_prediction: dx,
            y: 0.0,
            z: None,
        })
    }

    /// Predicts forward one `dt` and corrects with `z`, returning the new
    /// `(x, dx)`.
    pub fn update(&mut self, z: f64) -> (f64, f64) {
        self.update_with(z, self.g, self.h)
    }

    /// Update with one-off `g` and `h`.
    pub fn update_with(&mut self, z: f64, g: f64, h: f64) -> (f64, f64) {
        self.dx_prediction = self.dx;
        self.x_prediction = self.x + self.dx * self.dt;

        self.y = z - self.x_prediction;
        self.dx = self.dx_prediction + h * self.y / self.dt;
        self.x = self.x_prediction + g * self.y;
        self.z = Some(z);

        (self.x, self.dx)
    }

    /// Filters `data` starting from the current state without modifying
    /// the filter.
    pub fn batch_filter(&self, data: &[f64], save_predictions: bool) -> GhEstimates {
        let mut scratch = self.clone();
        let mut out = GhEstimates {
            x: Vec::with_capacity(data.len() + 1),
            dx: Vec::with_capacity(data.len() + 1),
            predictions: save_predictions.then(|| Vec::with_capacity(data.len())),
        };
        out.x.push(self.x);
        out.dx.push(self.dx);

        for &z in data {
            let (x, dx) = scratch.update(z);
            out.x.push(x);
            out.dx.push(dx);
            if let Some(p) = out.predictions.as_mut() {
                p.push(scratch.x_prediction);
            }
        }
        out
    }

    /// Variance reduction factor of the prediction step.
    pub fn vrf_prediction(&self) -> f64 {
        let (g, h) = (self.g, self.h);
        (2.0 * g * g + 2.0 * h + g * h) / (g * (4.0 - 2.0 * g - h))
    }

    /// Variance reduction factors of the position and velocity estimates.
    pub fn vrf(&self) -> (f64, f64) {
        let (g, h) = (self.g, self.h);
        let den = g * (4.0 - 2.0 * g - h);
        let vx = (2.0 * g * g + 2.0 * h - 3.0 * g * h) / den;
        let vdx = 2.0 * h * h / (self.dt * self.dt * den);
        (vx, vdx)
    }
}

/// Estimates produced by [`GHKFilter::batch_filter`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GhkEstimates {
    pub x: Vec<f64>,
    pub dx: Vec<f64>,
    pub ddx: Vec<f64>,
    pub predictions: Option<Vec<f64>>,
}

/// g-h-k (alpha-beta-gamma) filter, also tracking the second derivative.
#[derive(Debug, Clone, PartialEq)]
pub struct GHKFilter {
    pub x: f64,
    pub dx: f64,
    pub ddx: f64,
    pub dt: f64,
    pub g: f64,
    pub h: f64,
    pub k: f64,

    pub x_prediction: f64,
    pub dx_prediction: f64,
    pub ddx_prediction: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl GHKFilter {
    pub fn new(x: f64, dx: f64, ddx: f64, dt: f64, g: f64, h: f64, k: f64) -> Result<Self> {
        check_dt(dt)?;
        Ok(Self {
            x,
            dx,
            ddx,
            dt,
            g,
            h,
            k,
            x_prediction: x,
            dx_prediction: dx,
            ddx_prediction: ddx,
            y: 0.0,
            z: None,
        })
    }

    pub fn update(&mut self, z: f64) -> (f64, f64, f64) {
        self.update_with(z, self.g, self.h, self.k)
    }

    pub fn update_with(&mut self, z: f64, g: f64, h: f64, k: f64) -> (f64, f64, f64) {
        let dt = self.dt;
        let dt_sqr = dt * dt;

        self.ddx_prediction = self.ddx;
        self.dx_prediction = self.dx + self.ddx * dt;
        self.x_prediction = self.x + self.dx * dt + 0.5 * self.ddx * dt_sqr;

        self.y = z - self.x_prediction;
        self.ddx = self.ddx_prediction + 2.0 * k * self.y / dt_sqr;
        self.dx = self.dx_prediction + h * self.y / dt;
        self.x = self.x_prediction + g * self.y;
        self.z = Some(z);

        (self.x, self.dx, self.ddx)
    }

    pub fn batch_filter(&self, data: &[f64], save_predictions: bool) -> GhkEstimates {
        let mut scratch = self.clone();
        let n = data.len() + 1;
        let mut out = GhkEstimates {
            x: Vec::with_capacity(n),
            dx: Vec::with_capacity(n),
            ddx: Vec::with_capacity(n),
            predictions: save_predictions.then(|| Vec::with_capacity(data.len())),
        };
        out.x.push(self.x);
        out.dx.push(self.dx);
        out.ddx.push(self.ddx);

        for &z in data {
            let (x, dx, ddx) = scratch.update(z);
            out.x.push(x);
            out.dx.push(dx);
            out.ddx.push(ddx);
            if let Some(p) = out.predictions.as_mut() {
                p.push(scratch.x_prediction);
            }
        }
        out
    }

    pub fn vrf_prediction(&self) -> f64 {
        let (g, h, k) = (self.g, self.h, self.k);
        let gh2 = 2.0 * g + h;
        (g * k * (gh2 - 4.0) + h * (g * gh2 + 2.0 * h))
            / (2.0 * k - g * (h + k) * (gh2 - 4.0))
    }

    /// Variance reduction factors of `x`, `dx` and `ddx`.
    pub fn vrf(&self) -> (f64, f64, f64) {
        let (g, h, k) = (self.g, self.h, self.k);
        let hg4 = 4.0 - 2.0 * g - h;
        let ghk = g * h + g * k - 2.0 * k;

        let vx = (2.0 * h * (2.0 * g * g + 2.0 * h - 3.0 * g * h) - 2.0 * g * k * hg4)
            / (2.0 * k - g * (h + k) * hg4);
        let vdx = (2.0 * h.powi(3) - 4.0 * h * h * k + 4.0 * k * k * (2.0 - g)) / (2.0 * hg4 * ghk);
        let vddx = 8.0 * h * k * k / (self.dt.powi(4) * hg4 * ghk);
        (vx, vdx, vddx)
    }

    /// Steady state lag error for a constant third derivative `dddx`.
    pub fn bias_error(&self, dddx: f64) -> f64 {
        -self.dt.powi(3) * dddx / (2.0 * self.k)
    }
}

/// g-h filter of selectable order: 0 tracks a constant, 1 adds a rate,
/// 2 adds an acceleration.
#[derive(Debug, Clone, PartialEq)]
pub struct GHFilterOrder {
    /// `[x, dx, ddx]` truncated to `order + 1` entries.
    pub x: Vec<f64>,
    pub dt: f64,
    pub order: usize,
    pub g: f64,
    pub h: f64,
    pub k: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl GHFilterOrder {
    /// `x0` may hold just the initial value or the full
    /// `order + 1` state.
    pub fn new(x0: &[f64], dt: f64, order: usize, g: f64, h: f64, k: f64) -> Result<Self> {
        check_dt(dt)?;
        if order > 2 {
            return Err(FilterError::invalid("order", order, "must be 0, 1 or 2"));
        }
        let mut x = vec![0.0; order + 1];
        match x0.len() {
            1 => x[0] = x0[0],
            n if n == order + 1 => x.copy_from_slice(x0),
            n => return Err(FilterError::dimension("GHFilterOrder x0", order + 1, n)),
        }

        Ok(Self {
            x,
            dt,
            order,
            g,
            h,
            k,
            y: 0.0,
            z: None,
        })
    }

    pub fn update(&mut self, z: f64) -> &[f64] {
        self.update_with(z, self.g, self.h, self.k)
    }

    pub fn update_with(&mut self, z: f64, g: f64, h: f64, k: f64) -> &[f64] {
        let dt = self.dt;
        match self.order {
            0 => {
                self.y = z - self.x[0];
                self.x[0] += g * self.y;
            }
            1 => {
                let (x, dx) = (self.x[0], self.x[1]);
                let dxdt = dx * dt;
                self.y = z - (x + dxdt);
                self.x[0] = x + dxdt + g * self.y;
                self.x[1] = dx + h * self.y / dt;
            }
            _ => {
                let (x, dx, ddx) = (self.x[0], self.x[1], self.x[2]);
                let dxdt = dx * dt;
                let ddx2 = ddx * dt * dt;
                self.y = z - (x + dxdt + 0.5 * ddx2);
                self.x[0] = x + dxdt + 0.5 * ddx2 + g * self.y;
                self.x[1] = dx + ddx * dt + h * self.y / dt;
                self.x[2] = ddx + 2.0 * k * self.y / (dt * dt);
            }
        }
        self.z = Some(z);
        &self.x
    }
}
