use crate::common::error::{FilterError, Result};
use crate::stats::special::std_normal_cdf;
use rand::Rng;
use rand_distr::{Distribution, Gamma, Normal};
use std::f64::consts::PI;

fn check_variance(var: f64) -> Result<()> {
    if var.is_nan() || var <= 0.0 {
        return Err(FilterError::invalid("var", var, "variance must be > 0"));
    }
    Ok(())
}

/// Normal density with the given mean and variance evaluated at `x`.
pub fn gaussian(x: f64, mean: f64, var: f64) -> f64 {
    (2.0 * PI * var).powf(-0.5) * (-0.5 * (x - mean).powi(2) / var).exp()
}

/// Normal density evaluated over `xs`. With `normed` the result is scaled
/// to sum to one, which turns a sampled density into a discrete
/// distribution.
pub fn gaussian_pdf(xs: &[f64], mean: f64, var: f64, normed: bool) -> Vec<f64> {
    let pdf: Vec<f64> = xs.iter().map(|&x| gaussian(x, mean, var)).collect();
    if !normed {
        return pdf;
    }
    let total: f64 = pdf.iter().sum();
    if total == 0.0 {
        return pdf;
    }
    pdf.into_iter().map(|p| p / total).collect()
}

/// Product of two univariate Gaussians, returned as `(mean, var)`.
pub fn mul(mean1: f64, var1: f64, mean2: f64, var2: f64) -> (f64, f64) {
    let mean = (var1 * mean2 + var2 * mean1) / (var1 + var2);
    let var = 1.0 / (1.0 / var1 + 1.0 / var2);
    (mean, var)
}

/// Product of two univariate Gaussians including the scale factor that
/// the product of two densities carries: `(mean, var, scale)`.
pub fn mul_pdf(mean1: f64, var1: f64, mean2: f64, var2: f64) -> (f64, f64, f64) {
    let (mean, var) = mul(mean1, var1, mean2, var2);
    let sum_var = var1 + var2;
    let scale = (2.0 * PI * sum_var).powf(-0.5) * (-(mean1 - mean2).powi(2) / (2.0 * sum_var)).exp();
    (mean, var, scale)
}

/// Sum of two independent Gaussians: `(mean1 + mean2, var1 + var2)`.
pub fn add(mean1: f64, var1: f64, mean2: f64, var2: f64) -> (f64, f64) {
    (mean1 + mean2, var1 + var2)
}

/// Probability mass of N(mean, var) between the two ends of `x_range`.
/// The ends may be given in either order.
pub fn norm_cdf(x_range: (f64, f64), mean: f64, var: f64) -> Result<f64> {
    check_variance(var)?;
    norm_cdf_std(x_range, mean, var.sqrt())
}

/// [`norm_cdf`] parameterised by standard deviation.
pub fn norm_cdf_std(x_range: (f64, f64), mean: f64, std: f64) -> Result<f64> {
    if std.is_nan() || std <= 0.0 {
        return Err(FilterError::invalid("std", std, "standard deviation must be > 0"));
    }
    let a = std_normal_cdf((x_range.0 - mean) / std);
    let b = std_normal_cdf((x_range.1 - mean) / std);
    Ok((a - b).abs())
}

/// Draws from a Student's t distribution with `df` degrees of freedom,
/// shifted by `mu` and scaled by `std`.
pub fn rand_student_t<R: Rng + ?Sized>(df: f64, mu: f64, std: f64, rng: &mut R) -> Result<f64> {
    if df.is_nan() || df <= 0.0 {
        return Err(FilterError::invalid("df", df, "degrees of freedom must be > 0"));
    }
    let normal = Normal::new(0.0, std)
        .map_err(|e| FilterError::invalid("std", std, &e.to_string()))?;
    let gamma = Gamma::new(0.5 * df, 2.0)
        .map_err(|e| FilterError::invalid("df", df, &e.to_string()))?;

    let x = normal.sample(rng);
    let y = 2.0 * gamma.sample(rng);
    Ok(x / (y / df).sqrt() + mu)
}
