use crate::common::error::{FilterError, Result};
use nalgebra::{DMatrix, DVector};

pub fn inverse(m: &DMatrix<f64>, context: &str) -> Result<DMatrix<f64>> {
    if !m.is_square() {
        return Err(FilterError::dimension(
            context,
            "square matrix",
            shape_of(m),
        ));
    }
    m.clone()
        .try_inverse()
        .ok_or_else(|| FilterError::singular(context))
}

/// Lower triangular Cholesky factor `L` with `L L^T = m`.
pub fn cholesky_lower(m: &DMatrix<f64>, context: &str) -> Result<DMatrix<f64>> {
    if !m.is_square() {
        return Err(FilterError::dimension(
            context,
            "square matrix",
            shape_of(m),
        ));
    }
    nalgebra::Cholesky::new(m.clone())
        .map(|c| c.l())
        .ok_or_else(|| FilterError::not_positive_definite(context))
}

pub fn symmetrize(m: &DMatrix<f64>) -> DMatrix<f64> {
    (m + m.transpose()) * 0.5
}

pub fn shape_of(m: &DMatrix<f64>) -> String {
    format!("{}x{}", m.nrows(), m.ncols())
}

pub fn check_shape(m: &DMatrix<f64>, rows: usize, cols: usize, context: &str) -> Result<()> {
    if m.nrows() != rows || m.ncols() != cols {
        return Err(FilterError::dimension(
            context,
            format!("{}x{}", rows, cols),
            shape_of(m),
        ));
    }
    Ok(())
}

pub fn check_len(v: &DVector<f64>, len: usize, context: &str) -> Result<()> {
    if v.len() != len {
        return Err(FilterError::dimension(context, len, v.len()));
    }
    Ok(())
}

/// Block diagonal matrix with `count` copies of `block`.
pub fn block_diag(block: &DMatrix<f64>, count: usize) -> DMatrix<f64> {
    let (r, c) = block.shape();
    let mut out = DMatrix::zeros(r * count, c * count);
    for i in 0..count {
        out.view_mut((i * r, i * c), (r, c)).copy_from(block);
    }
    out
}

/// Reorders a per-dimension block matrix so that states are grouped by
/// derivative (`[x y x' y']`) rather than by dimension (`[x x' y y']`).
pub fn order_by_derivative(block: &DMatrix<f64>, block_size: usize) -> DMatrix<f64> {
    let dim = block.nrows();
    let n = dim * block_size;
    let mut out = DMatrix::zeros(n, n);
    for i in 0..dim {
        for j in 0..dim {
            let v = block[(i, j)];
            for k in 0..block_size {
                out[(i * block_size + k, j * block_size + k)] = v;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_singular() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        assert!(matches!(
            inverse(&m, "test"),
            Err(FilterError::SingularMatrix { .. })
        ));
    }

    #[test]
    fn test_block_diag_and_reorder() {
        let b = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let d = block_diag(&b, 2);
        assert_eq!(d[(2, 3)], 2.0);
        assert_eq!(d[(0, 2)], 0.0);

        let o = order_by_derivative(&b, 2);
        // [x y x' y'] ordering: x-x' coupling sits two columns over
        assert_eq!(o[(0, 2)], 2.0);
        assert_eq!(o[(1, 3)], 2.0);
        assert_eq!(o[(0, 1)], 0.0);
    }
}
