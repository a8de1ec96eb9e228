use crate::common::error::{FilterError, Result};
use nalgebra::{DMatrix, DVector};
use std::ops::{Add, Mul};

/// A filter that can report its current state for recording.
pub trait Snapshot {
    type Record: Clone;

    fn snapshot(&self) -> Self::Record;
}

/// Collects one snapshot per call to [`Saver::save`], typically once per
/// predict/update cycle.
#[derive(Debug, Clone)]
pub struct Saver<R> {
    records: Vec<R>,
}

impl<R: Clone> Saver<R> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn save<F: Snapshot<Record = R>>(&mut self, filter: &F) {
        self.records.push(filter.snapshot());
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&R> {
        self.records.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.records.iter()
    }

    /// Extracts one field from every record, e.g. `saver.map_field(|s| s.x[0])`.
    pub fn map_field<T, G: Fn(&R) -> T>(&self, field: G) -> Vec<T> {
        self.records.iter().map(field).collect()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn into_vec(self) -> Vec<R> {
        self.records
    }
}

impl<R: Clone> Default for Saver<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// One fourth-order Runge-Kutta step of `dy/dx = f(y, x)`.
pub fn runge_kutta4<T, F>(y: &T, x: f64, dx: f64, f: F) -> T
where
    T: Clone + Add<Output = T> + Mul<f64, Output = T>,
    F: Fn(&T, f64) -> T,
{
    let k1 = f(y, x) * dx;
    let k2 = f(&(y.clone() + k1.clone() * 0.5), x + 0.5 * dx) * dx;
    let k3 = f(&(y.clone() + k2.clone() * 0.5), x + 0.5 * dx) * dx;
    let k4 = f(&(y.clone() + k3.clone()), x + dx) * dx;

    y.clone() + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (1.0 / 6.0)
}

/// Sum of the outer products of corresponding rows of `a` and `b`.
pub fn outer_product_sum(a: &DMatrix<f64>, b: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    if a.nrows() != b.nrows() {
        return Err(FilterError::dimension(
            "outer_product_sum rows",
            a.nrows(),
            b.nrows(),
        ));
    }
    Ok(a.transpose() * b)
}

/// Inverse of a diagonal matrix without a general inversion.
pub fn inv_diagonal(S: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    if !S.is_square() {
        return Err(FilterError::dimension(
            "inv_diagonal",
            "square matrix",
            format!("{}x{}", S.nrows(), S.ncols()),
        ));
    }
    let mut out = DMatrix::zeros(S.nrows(), S.ncols());
    for i in 0..S.nrows() {
        let d = S[(i, i)];
        if d == 0.0 {
            return Err(FilterError::singular("inv_diagonal zero on diagonal"));
        }
        out[(i, i)] = 1.0 / d;
    }
    Ok(out)
}

/// Shapes a measurement into a column vector of length `dim_z`. Values are
/// never broadcast, so the slice length must equal `dim_z`.
pub fn reshape_z(z: &[f64], dim_z: usize) -> Result<DVector<f64>> {
    if z.len() != dim_z {
        return Err(FilterError::dimension("measurement", dim_z, z.len()));
    }
    Ok(DVector::from_column_slice(z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_runge_kutta4_exponential() {
        // dy/dx = y, y(0) = 1
        let mut y = 1.0_f64;
        let dx = 0.01;
        let mut x = 0.0;
        for _ in 0..100 {
            y = runge_kutta4(&y, x, dx, |y, _| *y);
            x += dx;
        }
        assert_relative_eq!(y, 1.0_f64.exp(), epsilon = 1e-9);
    }

    #[test]
    fn test_runge_kutta4_vector() {
        // harmonic oscillator keeps its energy
        let y0 = DVector::from_vec(vec![1.0, 0.0]);
        let mut y = y0.clone();
        for i in 0..1000 {
            y = runge_kutta4(&y, i as f64 * 0.001, 0.001, |s, _| {
                DVector::from_vec(vec![s[1], -s[0]])
            });
        }
        assert_relative_eq!(y.norm(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(y[0], 1.0_f64.cos(), epsilon = 1e-9);
    }

    #[test]
    fn test_outer_product_sum() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let s = outer_product_sum(&a, &a).unwrap();
        let expected = DMatrix::from_row_slice(2, 2, &[10.0, 14.0, 14.0, 20.0]);
        assert_relative_eq!(s, expected);
    }

    #[test]
    fn test_inv_diagonal() {
        let s = DMatrix::from_diagonal(&DVector::from_vec(vec![2.0, 4.0]));
        let inv = inv_diagonal(&s).unwrap();
        assert_relative_eq!(inv[(1, 1)], 0.25);

        let z = DMatrix::from_diagonal(&DVector::from_vec(vec![2.0, 0.0]));
        assert!(inv_diagonal(&z).is_err());
    }

    #[test]
    fn test_reshape_z() {
        assert_eq!(reshape_z(&[1.0, 2.0], 2).unwrap().len(), 2);
        assert!(reshape_z(&[1.0], 2).is_err());
        assert!(reshape_z(&[], 1).is_err());
        assert_eq!(reshape_z(&[3.5], 1).unwrap()[0], 3.5);
    }
}
