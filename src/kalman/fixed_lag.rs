use crate::common::error::{FilterError, Result};
use crate::common::linalg::{check_len, check_shape, inverse};
use nalgebra::{DMatrix, DVector};
use std::collections::VecDeque;

/// Fixed-lag Kalman smoother.
///
/// Runs a linear Kalman filter and, on every measurement, revises the
/// estimates of the last `N` steps. The cross covariance between each
/// lagged estimate and the current prior is tracked exactly, so with a
/// lag covering the whole series the result equals the fixed-interval
/// (RTS) smoother.
#[derive(Debug, Clone)]
pub struct FixedLagSmoother {
    pub dim_x: usize,
    pub dim_z: usize,
    pub N: usize,

    pub x: DVector<f64>,
    pub P: DMatrix<f64>,
    pub Q: DMatrix<f64>,
    pub F: DMatrix<f64>,
    pub H: DMatrix<f64>,
    pub R: DMatrix<f64>,
    pub B: DMatrix<f64>,

    pub K: DMatrix<f64>,
    pub y: DVector<f64>,

    /// Smoothed estimates, one per processed measurement. Entries older
    /// than `N` steps are final.
    pub x_smooth: Vec<DVector<f64>>,
    pub count: usize,

    /// Cov(e of estimate at lag i+1, e of next prior) for the window.
    lag_cross: VecDeque<DMatrix<f64>>,
}

impl FixedLagSmoother {
    pub fn new(dim_x: usize, dim_z: usize, N: usize) -> Result<Self> {
        if dim_x < 1 || dim_z < 1 {
            return Err(FilterError::invalid(
                "dim_x/dim_z",
                format!("{}/{}", dim_x, dim_z),
                "must be 1 or more",
            ));
        }
        if N < 1 {
            return Err(FilterError::invalid("N", N, "lag must be 1 or more"));
        }
        Ok(Self {
            dim_x,
            dim_z,
            N,
            x: DVector::zeros(dim_x),
            P: DMatrix::identity(dim_x, dim_x),
            Q: DMatrix::identity(dim_x, dim_x),
            F: DMatrix::identity(dim_x, dim_x),
            H: DMatrix::zeros(dim_z, dim_x),
            R: DMatrix::identity(dim_z, dim_z),
            B: DMatrix::zeros(dim_x, 0),
            K: DMatrix::zeros(dim_x, dim_z),
            y: DVector::zeros(dim_z),
            x_smooth: Vec::new(),
            count: 0,
            lag_cross: VecDeque::new(),
        })
    }

    /// Filters `z` and smooths the estimates inside the lag window.
    pub fn smooth(&mut self, z: &DVector<f64>, u: Option<&DVector<f64>>) -> Result<()> {
        check_len(z, self.dim_z, "fixed lag z")?;
        check_shape(&self.H, self.dim_z, self.dim_x, "fixed lag H")?;
        let I = DMatrix::identity(self.dim_x, self.dim_x);

        // predict
        let mut x_pre = &self.F * &self.x;
        if let Some(u) = u {
            check_shape(&self.B, self.dim_x, u.len(), "fixed lag B")?;
            x_pre += &self.B * u;
        }
        let P_pre = &self.F * &self.P * self.F.transpose() + &self.Q;

        // update
        self.y = z - &self.H * &x_pre;
        let S = &self.H * &P_pre * self.H.transpose() + &self.R;
        let SI = inverse(&S, "fixed lag system uncertainty S")?;
        let HTSI = self.H.transpose() * &SI;
        self.K = &P_pre * &HTSI;

        self.x = &x_pre + &self.K * &self.y;
        let I_KH = &I - &self.K * &self.H;
        self.P = &I_KH * &P_pre * I_KH.transpose() + &self.K * &self.R * self.K.transpose();

        self.x_smooth.push(self.x.clone());
        let k = self.x_smooth.len() - 1;

        // revise the lagged estimates with the new innovation
        for (i, cross) in self.lag_cross.iter().enumerate() {
            let gain = cross * &HTSI;
            self.x_smooth[k - 1 - i] += gain * &self.y;
        }

        // lag 0 is the prior itself
        self.lag_cross.push_front(P_pre);
        let Phi_T = (&self.F * &I_KH).transpose();
        for cross in self.lag_cross.iter_mut() {
            *cross = &*cross * &Phi_T;
        }
        self.lag_cross.truncate(self.N - 1);

        self.count += 1;
        Ok(())
    }

    /// Runs the smoother over a whole series, returning the filtered and
    /// the smoothed estimates.
    pub fn smooth_batch(
        &mut self,
        zs: &[DVector<f64>],
        us: Option<&[DVector<f64>]>,
    ) -> Result<(Vec<DVector<f64>>, Vec<DVector<f64>>)> {
        if let Some(us) = us {
            if us.len() != zs.len() {
                return Err(FilterError::dimension("fixed lag us", zs.len(), us.len()));
            }
        }

        let start = self.x_smooth.len();
        let mut filtered = Vec::with_capacity(zs.len());
        for (i, z) in zs.iter().enumerate() {
            self.smooth(z, us.map(|u| &u[i]))?;
            filtered.push(self.x.clone());
        }
        Ok((filtered, self.x_smooth[start..].to_vec()))
    }
}
