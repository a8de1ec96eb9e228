use crate::common::error::{FilterError, Result};
use crate::common::linalg::{check_len, check_shape, inverse};
use nalgebra::{DMatrix, DVector};

/// Kalman filter in information form.
///
/// The filter carries the information matrix `P_inv` instead of the
/// covariance. Starting from `P_inv = 0` expresses total ignorance of
/// the initial state; while the information matrix is singular `x` holds
/// the information vector `P_inv * x` and is converted back to a state
/// estimate on the first predict after it becomes invertible.
#[derive(Debug, Clone)]
pub struct InformationFilter {
    pub dim_x: usize,
    pub dim_z: usize,
    pub dim_u: usize,

    pub x: DVector<f64>,
    pub P_inv: DMatrix<f64>,
    pub Q: DMatrix<f64>,
    pub B: DMatrix<f64>,
    pub H: DMatrix<f64>,

    pub z: Option<DVector<f64>>,
    pub K: DMatrix<f64>,
    pub y: DVector<f64>,
    pub S: DMatrix<f64>,

    pub x_prior: DVector<f64>,
    pub P_inv_prior: DMatrix<f64>,
    pub x_post: DVector<f64>,
    pub P_inv_post: DMatrix<f64>,

    F: DMatrix<f64>,
    F_inv: DMatrix<f64>,
    R_inv: DMatrix<f64>,
    no_information: bool,
}

impl InformationFilter {
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
            P_inv: DMatrix::identity(dim_x, dim_x),
            Q: DMatrix::identity(dim_x, dim_x),
            B: DMatrix::zeros(dim_x, dim_u),
            H: DMatrix::zeros(dim_z, dim_x),
            z: None,
            K: DMatrix::zeros(dim_x, dim_z),
            y: DVector::zeros(dim_z),
            S: DMatrix::zeros(dim_x, dim_x),
            x_prior: DVector::zeros(dim_x),
            P_inv_prior: DMatrix::identity(dim_x, dim_x),
            x_post: DVector::zeros(dim_x),
            P_inv_post: DMatrix::identity(dim_x, dim_x),
            F: DMatrix::identity(dim_x, dim_x),
            F_inv: DMatrix::identity(dim_x, dim_x),
            R_inv: DMatrix::identity(dim_z, dim_z),
            no_information: false,
        })
    }

    pub fn F(&self) -> &DMatrix<f64> {
        &self.F
    }

    /// Sets the state transition; it must be invertible.
    pub fn set_F(&mut self, F: DMatrix<f64>) -> Result<()> {
        check_shape(&F, self.dim_x, self.dim_x, "information F")?;
        self.F_inv = inverse(&F, "information F")?;
        self.F = F;
        Ok(())
    }

    pub fn R_inv(&self) -> &DMatrix<f64> {
        &self.R_inv
    }

    pub fn set_R_inv(&mut self, R_inv: DMatrix<f64>) -> Result<()> {
        check_shape(&R_inv, self.dim_z, self.dim_z, "information R_inv")?;
        self.R_inv = R_inv;
        Ok(())
    }

    /// Convenience for setting the measurement noise as a covariance.
    pub fn set_R(&mut self, R: &DMatrix<f64>) -> Result<()> {
        check_shape(R, self.dim_z, self.dim_z, "information R")?;
        self.R_inv = inverse(R, "information R")?;
        Ok(())
    }

    /// True while `x` holds an information vector rather than a state.
    pub fn has_no_information(&self) -> bool {
        self.no_information
    }

    /// Marks the state as completely unknown: `P_inv` and `x` are zeroed.
    pub fn reset_information(&mut self) {
        self.P_inv = DMatrix::zeros(self.dim_x, self.dim_x);
        self.x = DVector::zeros(self.dim_x);
        self.no_information = true;
    }

    pub fn update(&mut self, z: &DVector<f64>) -> Result<()> {
        self.update_with(z, None)
    }

    pub fn update_with(&mut self, z: &DVector<f64>, R_inv: Option<&DMatrix<f64>>) -> Result<()> {
        check_len(z, self.dim_z, "information update z")?;
        let R_inv = R_inv.unwrap_or(&self.R_inv);
        check_shape(R_inv, self.dim_z, self.dim_z, "information update R_inv")?;
        check_shape(&self.H, self.dim_z, self.dim_x, "information update H")?;

        let HTRI = self.H.transpose() * R_inv;
        if self.no_information {
            self.x += &HTRI * z;
            self.P_inv += &HTRI * &self.H;
        } else {
            self.y = z - &self.H * &self.x;
            self.S = &self.P_inv + &HTRI * &self.H;
            self.K = inverse(&self.S, "information update S")? * &HTRI;
            self.x += &self.K * &self.y;
            self.P_inv = self.S.clone();
        }

        self.z = Some(z.clone());
        self.x_post = self.x.clone();
        self.P_inv_post = self.P_inv.clone();
        Ok(())
    }

    pub fn update_missing(&mut self) {
        self.z = None;
        self.y = DVector::zeros(self.dim_z);
        self.x_post = self.x.clone();
        self.P_inv_post = self.P_inv.clone();
    }

    pub fn predict(&mut self, u: Option<&DVector<f64>>) -> Result<()> {
        let A = self.F_inv.transpose() * &self.P_inv * &self.F_inv;

        match A.clone().try_inverse() {
            Some(AI) => {
                if self.no_information {
                    self.x = inverse(&self.P_inv, "information P_inv")? * &self.x;
                    self.no_information = false;
                    tracing::debug!("information filter now has full information");
                }
                let mut x = &self.F * &self.x;
                if let Some(u) = u.filter(|_| self.dim_u > 0) {
                    check_shape(&self.B, self.dim_x, u.len(), "information predict B")?;
                    x += &self.B * u;
                }
                self.x = x;
                self.P_inv = inverse(&(AI + &self.Q), "information predicted covariance")?;
            }
            None => {
                // still propagating the information vector
                let Q_inv = inverse(&self.Q, "information Q")?;
                let C = &A * inverse(&(&A + Q_inv), "information A + Q_inv")?;
                let I_C = DMatrix::identity(self.dim_x, self.dim_x) - C;
                self.x = &I_C * self.F_inv.transpose() * &self.x;
                self.P_inv = &I_C * A;
                self.no_information = true;
            }
        }

        self.x_prior = self.x.clone();
        self.P_inv_prior = self.P_inv.clone();
        Ok(())
    }

    /// Predict/update over every measurement, returning the posterior
    /// states and information matrices.
    pub fn batch_filter(
        &mut self,
        zs: &[Option<DVector<f64>>],
        Rs: Option<&[DMatrix<f64>]>,
    ) -> Result<(Vec<DVector<f64>>, Vec<DMatrix<f64>>)> {
        if let Some(rs) = Rs {
            if rs.len() != zs.len() {
                return Err(FilterError::dimension("information batch_filter Rs", zs.len(), rs.len()));
            }
        }

        let mut means = Vec::with_capacity(zs.len());
        let mut infos = Vec::with_capacity(zs.len());
        for (i, z) in zs.iter().enumerate() {
            self.predict(None)?;
            match z {
                Some(z) => {
                    let R_inv = Rs.map(|r| &r[i]);
                    self.update_with(z, R_inv)?;
                }
                None => self.update_missing(),
            }
            means.push(self.x.clone());
            infos.push(self.P_inv.clone());
        }
        Ok((means, infos))
    }
}
