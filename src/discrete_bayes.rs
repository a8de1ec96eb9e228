//! Discrete Bayes (histogram) filter over a one dimensional grid.

use crate::common::error::{FilterError, Result};
use serde::{Deserialize, Serialize};

/// How [`predict`] treats cells beyond the edges of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// The grid is circular; moving off one end enters the other.
    #[default]
    Wrap,
    /// Cells beyond the edge hold a constant value.
    Constant,
}

/// Scales `pdf` so that it sums to one.
pub fn normalize(pdf: &[f64]) -> Result<Vec<f64>> {
    if pdf.is_empty() {
        return Err(FilterError::empty("normalize pdf"));
    }
    let total: f64 = pdf.iter().sum();
    if total == 0.0 || !total.is_finite() {
        return Err(FilterError::invalid("pdf sum", total, "must be finite and non-zero"));
    }
    Ok(pdf.iter().map(|p| p / total).collect())
}

/// Posterior of `prior` after a measurement with the given `likelihood`
/// of each cell.
pub fn update(likelihood: &[f64], prior: &[f64]) -> Result<Vec<f64>> {
    if likelihood.len() != prior.len() {
        return Err(FilterError::dimension(
            "discrete_bayes update likelihood",
            prior.len(),
            likelihood.len(),
        ));
    }
    let posterior: Vec<f64> = prior.iter().zip(likelihood).map(|(p, l)| p * l).collect();
    normalize(&posterior)
}

/// Moves `pdf` by `offset` cells and blurs it with the movement
/// uncertainty `kernel`, whose centre is element `kernel.len() / 2`.
/// `cval` fills cells beyond the edge in [`Mode::Constant`].
pub fn predict(
    pdf: &[f64],
    offset: isize,
    kernel: &[f64],
    mode: Mode,
    cval: f64,
) -> Result<Vec<f64>> {
    if pdf.is_empty() {
        return Err(FilterError::empty("discrete_bayes predict pdf"));
    }
    if kernel.is_empty() {
        return Err(FilterError::empty("discrete_bayes predict kernel"));
    }

    let n = pdf.len() as isize;
    let shifted: Vec<f64> = (0..n)
        .map(|i| cell(pdf, i - offset, mode, cval))
        .collect();

    let centre = (kernel.len() / 2) as isize;
    let prior: Vec<f64> = (0..n)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .map(|(m, k)| k * cell(&shifted, i + centre - m as isize, mode, cval))
                .sum::<f64>()
        })
        .collect();
    Ok(prior)
}

fn cell(values: &[f64], i: isize, mode: Mode, cval: f64) -> f64 {
    let n = values.len() as isize;
    match mode {
        Mode::Wrap => values[i.rem_euclid(n) as usize],
        Mode::Constant if (0..n).contains(&i) => values[i as usize],
        Mode::Constant => cval,
    }
}
