//! Process noise and state transition discretisation.

use crate::common::error::{FilterError, Result};
use crate::common::linalg::{block_diag, check_shape, inverse, order_by_derivative};
use nalgebra::DMatrix;

fn check_noise_dim(dim: usize, block_size: usize) -> Result<()> {
    if !(2..=4).contains(&dim) {
        return Err(FilterError::invalid("dim", dim, "must be 2, 3 or 4"));
    }
    if block_size == 0 {
        return Err(FilterError::invalid("block_size", block_size, "must be at least 1"));
    }
    Ok(())
}

fn arrange(q: DMatrix<f64>, block_size: usize, order_by_dim: bool) -> DMatrix<f64> {
    if order_by_dim {
        block_diag(&q, block_size)
    } else {
        order_by_derivative(&q, block_size)
    }
}

/// Discrete white noise process covariance for a piecewise constant
/// highest derivative.
///
/// `dim` is the number of derivatives per dimension (2 for `[x x']`,
/// 3 for `[x x' x'']`, 4 adds jerk). With `block_size > 1` the block is
/// repeated per spatial dimension; `order_by_dim` selects `[x x' y y']`
/// ordering, otherwise `[x y x' y']`.
pub fn q_discrete_white_noise(
    dim: usize,
    dt: f64,
    var: f64,
    block_size: usize,
    order_by_dim: bool,
) -> Result<DMatrix<f64>> {
    check_noise_dim(dim, block_size)?;

    let q = match dim {
        2 => DMatrix::from_row_slice(
            2,
            2,
            &[
                0.25 * dt.powi(4), 0.5 * dt.powi(3),
                0.5 * dt.powi(3), dt.powi(2),
            ],
        ),
        3 => DMatrix::from_row_slice(
            3,
            3,
            &[
                0.25 * dt.powi(4), 0.5 * dt.powi(3), 0.5 * dt.powi(2),
                0.5 * dt.powi(3), dt.powi(2), dt,
                0.5 * dt.powi(2), dt, 1.0,
            ],
        ),
        _ => DMatrix::from_row_slice(
            4,
            4,
            &[
                dt.powi(6) / 36.0, dt.powi(5) / 12.0, dt.powi(4) / 6.0, dt.powi(3) / 6.0,
                dt.powi(5) / 12.0, dt.powi(4) / 4.0, dt.powi(3) / 2.0, dt.powi(2) / 2.0,
                dt.powi(4) / 6.0, dt.powi(3) / 2.0, dt.powi(2), dt,
                dt.powi(3) / 6.0, dt.powi(2) / 2.0, dt, 1.0,
            ],
        ),
    };

    Ok(arrange(q, block_size, order_by_dim) * var)
}

/// Continuous white noise process covariance integrated over `dt`.
pub fn q_continuous_white_noise(
    dim: usize,
    dt: f64,
    spectral_density: f64,
    block_size: usize,
    order_by_dim: bool,
) -> Result<DMatrix<f64>> {
    check_noise_dim(dim, block_size)?;

    let q = match dim {
        2 => DMatrix::from_row_slice(
            2,
            2,
            &[
                dt.powi(3) / 3.0, dt.powi(2) / 2.0,
                dt.powi(2) / 2.0, dt,
            ],
        ),
        3 => DMatrix::from_row_slice(
            3,
            3,
            &[
                dt.powi(5) / 20.0, dt.powi(4) / 8.0, dt.powi(3) / 6.0,
                dt.powi(4) / 8.0, dt.powi(3) / 3.0, dt.powi(2) / 2.0,
                dt.powi(3) / 6.0, dt.powi(2) / 2.0, dt,
            ],
        ),
        _ => DMatrix::from_row_slice(
            4,
            4,
            &[
                dt.powi(7) / 252.0, dt.powi(6) / 72.0, dt.powi(5) / 30.0, dt.powi(4) / 24.0,
                dt.powi(6) / 72.0, dt.powi(5) / 20.0, dt.powi(4) / 8.0, dt.powi(3) / 6.0,
                dt.powi(5) / 30.0, dt.powi(4) / 8.0, dt.powi(3) / 3.0, dt.powi(2) / 2.0,
                dt.powi(4) / 24.0, dt.powi(3) / 6.0, dt.powi(2) / 2.0, dt,
            ],
        ),
    };

    Ok(arrange(q, block_size, order_by_dim) * spectral_density)
}

/// Van Loan's method for the discrete transition `Phi` and process noise
/// `Q` of `x' = Fx + Gu`.
pub fn van_loan_discretization(
    F: &DMatrix<f64>,
    G: &DMatrix<f64>,
    dt: f64,
) -> Result<(DMatrix<f64>, DMatrix<f64>)> {
    let n = F.nrows();
    check_shape(F, n, n, "van_loan_discretization F")?;
    if G.nrows() != n {
        return Err(FilterError::dimension(
            "van_loan_discretization G rows",
            n,
            G.nrows(),
        ));
    }

    let mut A = DMatrix::zeros(2 * n, 2 * n);
    A.view_mut((0, 0), (n, n)).copy_from(&(-F * dt));
    A.view_mut((0, n), (n, n)).copy_from(&(G * G.transpose() * dt));
    A.view_mut((n, n), (n, n)).copy_from(&(F.transpose() * dt));

    let B = A.exp();
    let sigma = B.view((n, n), (n, n)).transpose();
    let Q = &sigma * B.view((0, n), (n, n));
    Ok((sigma, Q))
}

/// Matrix fraction discretisation of `x' = Fx + Lw` where `w` has
/// spectral density `Q`. `L` defaults to identity and `Q` to zero.
pub fn linear_ode_discretation(
    F: &DMatrix<f64>,
    L: Option<&DMatrix<f64>>,
    Q: Option<&DMatrix<f64>>,
    dt: f64,
) -> Result<(DMatrix<f64>, DMatrix<f64>)> {
    let n = F.nrows();
    check_shape(F, n, n, "linear_ode_discretation F")?;

    let L = L.cloned().unwrap_or_else(|| DMatrix::identity(n, n));
    let Q = Q.cloned().unwrap_or_else(|| DMatrix::zeros(L.ncols(), L.ncols()));

    let A = (F * dt).exp();

    let mut phi = DMatrix::zeros(2 * n, 2 * n);
    phi.view_mut((0, 0), (n, n)).copy_from(F);
    phi.view_mut((0, n), (n, n)).copy_from(&(&L * &Q * L.transpose()));
    phi.view_mut((n, n), (n, n)).copy_from(&(-F.transpose()));

    let mut zo = DMatrix::zeros(2 * n, n);
    zo.view_mut((n, 0), (n, n)).fill_with_identity();

    let cd = (phi * dt).exp() * zo;
    let C = cd.view((0, 0), (n, n)).into_owned();
    let D = cd.view((n, 0), (n, n)).into_owned();
    let q = C * inverse(&D, "linear_ode_discretation D")?;

    Ok((A, q))
}
