use crate::common::error::{FilterError, Result};
use crate::common::linalg::{check_len, check_shape, cholesky_lower, inverse};
use nalgebra::{DMatrix, DVector};

/// Kalman filter propagating square roots of the covariances.
///
/// `P`, `Q` and `R` are stored as lower triangular factors with
/// `P = P1_2 * P1_2^T`; predict and update are carried out with QR
/// decompositions, which keeps `P` symmetric positive semi-definite.
#[derive(Debug, Clone)]
pub struct SquareRootKalmanFilter {
    pub dim_x: usize,
    pub dim_z: usize,
    pub dim_u: usize,

    pub x: DVector<f64>,
    pub F: DMatrix<f64>,
    pub H: DMatrix<f64>,
    pub B: DMatrix<f64>,

    pub z: Option<DVector<f64>>,
    pub K: DMatrix<f64>,
    pub y: DVector<f64>,
    /// Square root of the innovation covariance.
    pub S1_2: DMatrix<f64>,

    pub x_prior: DVector<f64>,
    pub x_post: DVector<f64>,

    P1_2: DMatrix<f64>,
    Q1_2: DMatrix<f64>,
    R1_2: DMatrix<f64>,
}

impl SquareRootKalmanFilter {
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
            F: DMatrix::identity(dim_x, dim_x),
            H: DMatrix::zeros(dim_z, dim_x),
            B: DMatrix::zeros(dim_x, dim_u),
            z: None,
            K: DMatrix::zeros(dim_x, dim_z),
            y: DVector::zeros(dim_z),
            S1_2: DMatrix::zeros(dim_z, dim_z),
            x_prior: DVector::zeros(dim_x),
            x_post: DVector::zeros(dim_x),
            P1_2: DMatrix::identity(dim_x, dim_x),
            Q1_2: DMatrix::identity(dim_x, dim_x),
            R1_2: DMatrix::identity(dim_z, dim_z),
        })
    }

    pub fn P(&self) -> DMatrix<f64> {
        &self.P1_2 * self.P1_2.transpose()
    }

    pub fn P1_2(&self) -> &DMatrix<f64> {
        &self.P1_2
    }

    pub fn set_P(&mut self, P: &DMatrix<f64>) -> Result<()> {
        check_shape(P, self.dim_x, self.dim_x, "square root P")?;
        self.P1_2 = cholesky_lower(P, "square root P")?;
        Ok(())
    }

    pub fn Q(&self) -> DMatrix<f64> {
        &self.Q1_2 * self.Q1_2.transpose()
    }

    pub fn set_Q(&mut self, Q: &DMatrix<f64>) -> Result<()> {
        check_shape(Q, self.dim_x, self.dim_x, "square root Q")?;
        self.Q1_2 = cholesky_lower(Q, "square root Q")?;
        Ok(())
    }

    pub fn R(&self) -> DMatrix<f64> {
        &self.R1_2 * self.R1_2.transpose()
    }

    pub fn set_R(&mut self, R: &DMatrix<f64>) -> Result<()> {
        check_shape(R, self.dim_z, self.dim_z, "square root R")?;
        self.R1_2 = cholesky_lower(R, "square root R")?;
        Ok(())
    }

    pub fn predict(&mut self, u: Option<&DVector<f64>>) -> Result<()> {
        let n = self.dim_x;
        let mut x = &self.F * &self.x;
        if let Some(u) = u.filter(|_| self.dim_u > 0) {
            check_shape(&self.B, n, u.len(), "square root predict B")?;
            x += &self.B * u;
        }
        self.x = x;

        // [F P1_2, Q1_2]^T = Q R  =>  P = R^T R
        let mut M = DMatrix::zeros(n, 2 * n);
        M.view_mut((0, 0), (n, n)).copy_from(&(&self.F * &self.P1_2));
        M.view_mut((0, n), (n, n)).copy_from(&self.Q1_2);
        let R = M.transpose().qr().r();
        self.P1_2 = R.view((0, 0), (n, n)).transpose();

        self.x_prior = self.x.clone();
        Ok(())
    }

    pub fn update(&mut self, z: &DVector<f64>) -> Result<()> {
        self.update_with(z, None)
    }

    /// Update with an optional one-off square root of `R`.
    pub fn update_with(&mut self, z: &DVector<f64>, R1_2: Option<&DMatrix<f64>>) -> Result<()> {
        check_len(z, self.dim_z, "square root update z")?;
        let (n, m) = (self.dim_x, self.dim_z);
        let R1_2 = R1_2.unwrap_or(&self.R1_2);
        check_shape(R1_2, m, m, "square root update R1_2")?;
        check_shape(&self.H, m, n, "square root update H")?;

        let mut M = DMatrix::zeros(m + n, m + n);
        M.view_mut((0, 0), (m, m)).copy_from(&R1_2.transpose());
        M.view_mut((m, 0), (n, m)).copy_from(&(&self.H * &self.P1_2).transpose());
        M.view_mut((m, m), (n, n)).copy_from(&self.P1_2.transpose());
        let S = M.qr().r();

        let N = S.view((0, 0), (m, m)).transpose();
        let K_bar = S.view((0, m), (m, n)).transpose();
        self.K = &K_bar * inverse(&N, "square root innovation")?;
        self.S1_2 = N;

        self.y = z - &self.H * &self.x;
        self.x += &self.K * &self.y;
        self.P1_2 = S.view((m, m), (n, n)).transpose();

        self.z = Some(z.clone());
        self.x_post = self.x.clone();
        Ok(())
    }

    pub fn update_missing(&mut self) {
        self.z = None;
        self.y = DVector::zeros(self.dim_z);
        self.x_post = self.x.clone();
    }

    pub fn residual_of(&self, z: &DVector<f64>) -> Result<DVector<f64>> {
        check_len(z, self.dim_z, "square root residual_of z")?;
        Ok(z - &self.H * &self.x)
    }

    pub fn measurement_of_state(&self, x: &DVector<f64>) -> Result<DVector<f64>> {
        check_len(x, self.dim_x, "square root measurement_of_state x")?;
        Ok(&self.H * x)
    }
}
