//! Particle resampling.
//!
//! Every resampler takes particle weights and returns `N` indices into
//! the particle set, drawn so that particle `i` is selected about
//! `N * w[i]` times.

use crate::common::error::{FilterError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Validates the weights and returns them normalised to sum to one.
fn normalized_weights(weights: &[f64]) -> Result<Vec<f64>> {
    if weights.is_empty() {
        return Err(FilterError::empty("resample weights"));
    }
    if let Some(w) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
        return Err(FilterError::invalid("weight", w, "must be finite and non-negative"));
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(FilterError::invalid("weights", total, "must have a positive sum"));
    }
    Ok(weights.iter().map(|w| w / total).collect())
}

fn cumulative_sum(weights: &[f64]) -> Vec<f64> {
    let mut acc = 0.0;
    let mut cumsum: Vec<f64> = weights
        .iter()
        .map(|w| {
            acc += w;
            acc
        })
        .collect();
    // guard against round-off leaving the total just below one
    if let Some(last) = cumsum.last_mut() {
        *last = 1.0;
    }
    cumsum
}

/// Index of the first cumulative weight at or above `v`.
fn search_sorted(cumsum: &[f64], v: f64) -> usize {
    cumsum.partition_point(|&c| c < v).min(cumsum.len() - 1)
}

/// Walks the sorted `positions` through the cumulative weights.
fn resample_positions(cumsum: &[f64], positions: &[f64]) -> Vec<usize> {
    let mut indexes = Vec::with_capacity(positions.len());
    let mut j = 0;
    for &p in positions {
        while j < cumsum.len() - 1 && p >= cumsum[j] {
            j += 1;
        }
        indexes.push(j);
    }
    indexes
}

/// Takes `floor(N * w)` copies of each particle deterministically, then
/// fills the remainder by multinomial sampling on the fractional parts.
pub fn residual_resample<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Result<Vec<usize>> {
    let weights = normalized_weights(weights)?;
    let n = weights.len();

    let mut indexes = Vec::with_capacity(n);
    let mut residual = Vec::with_capacity(n);
    for (i, w) in weights.iter().enumerate() {
        let scaled = n as f64 * w;
        let copies = scaled.floor() as usize;
        indexes.extend(std::iter::repeat(i).take(copies));
        residual.push(scaled - copies as f64);
    }
    indexes.truncate(n);

    let remaining = n - indexes.len();
    if remaining > 0 {
        let total: f64 = residual.iter().sum();
        let residual: Vec<f64> = residual.iter().map(|r| r / total).collect();
        let cumsum = cumulative_sum(&residual);
        for _ in 0..remaining {
            indexes.push(search_sorted(&cumsum, rng.gen::<f64>()));
        }
    }
    Ok(indexes)
}

/// One random position inside each of `N` equal strata of `[0, 1)`.
pub fn stratified_resample<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Result<Vec<usize>> {
    let weights = normalized_weights(weights)?;
    let n = weights.len();
    let positions: Vec<f64> = (0..n)
        .map(|i| (rng.gen::<f64>() + i as f64) / n as f64)
        .collect();
    Ok(resample_positions(&cumulative_sum(&weights), &positions))
}

/// Like [`stratified_resample`] but with one random offset shared by
/// every stratum.
pub fn systematic_resample<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Result<Vec<usize>> {
    let weights = normalized_weights(weights)?;
    let n = weights.len();
    let offset = rng.gen::<f64>();
    let positions: Vec<f64> = (0..n).map(|i| (offset + i as f64) / n as f64).collect();
    Ok(resample_positions(&cumulative_sum(&weights), &positions))
}

/// `N` independent draws with probability proportional to weight.
pub fn multinomial_resample<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Result<Vec<usize>> {
    let weights = normalized_weights(weights)?;
    let cumsum = cumulative_sum(&weights);
    Ok((0..weights.len())
        .map(|_| search_sorted(&cumsum, rng.gen::<f64>()))
        .collect())
}

/// Effective number of particles, `1 / sum(w^2)` of the normalised
/// weights.
pub fn neff(weights: &[f64]) -> Result<f64> {
    let weights = normalized_weights(weights)?;
    Ok(1.0 / weights.iter().map(|w| w * w).sum::<f64>())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleMethod {
    Residual,
    Stratified,
    Systematic,
    Multinomial,
}

impl ResampleMethod {
    pub fn resample<R: Rng + ?Sized>(&self, weights: &[f64], rng: &mut R) -> Result<Vec<usize>> {
        match self {
            ResampleMethod::Residual => residual_resample(weights, rng),
            ResampleMethod::Stratified => stratified_resample(weights, rng),
            ResampleMethod::Systematic => systematic_resample(weights, rng),
            ResampleMethod::Multinomial => multinomial_resample(weights, rng),
        }
    }
}

impl fmt::Display for ResampleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResampleMethod::Residual => "residual",
            ResampleMethod::Stratified => "stratified",
            ResampleMethod::Systematic => "systematic",
            ResampleMethod::Multinomial => "multinomial",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ResampleMethod {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "residual" => Ok(ResampleMethod::Residual),
            "stratified" => Ok(ResampleMethod::Stratified),
            "systematic" => Ok(ResampleMethod::Systematic),
            "multinomial" => Ok(ResampleMethod::Multinomial),
            _ => Err(FilterError::invalid("resample method", s, "unknown method")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_residual_takes_integer_copies() {
        let mut rng = StdRng::seed_from_u64(1);
        let idx = residual_resample(&[0.5, 0.25, 0.25, 0.0], &mut rng).unwrap();
        assert_eq!(idx, vec![0, 0, 1, 2]);
    }

    #[test]
    fn test_residual_fills_remainder() {
        let mut rng = StdRng::seed_from_u64(2);
        let idx = residual_resample(&[0.3, 0.3, 0.4], &mut rng).unwrap();
        assert_eq!(idx.len(), 3);
        assert!(idx.iter().all(|&i| i < 3));
    }

    #[test]
    fn test_systematic_is_sorted_and_proportional() {
        let mut rng = StdRng::seed_from_u64(3);
        let weights = [0.1, 0.2, 0.3, 0.4];
        let idx = systematic_resample(&weights, &mut rng).unwrap();
        assert!(idx.windows(2).all(|w| w[0] <= w[1]));

        let mut rng = StdRng::seed_from_u64(4);
        let big: Vec<f64> = (0..1000).map(|i| if i < 500 { 3.0 } else { 1.0 }).collect();
        let idx = systematic_resample(&big, &mut rng).unwrap();
        let first_half = idx.iter().filter(|&&i| i < 500).count();
        assert!((first_half as i64 - 750).abs() <= 1);
    }

    #[test]
    fn test_unnormalised_weights_accepted() {
        let mut rng = StdRng::seed_from_u64(5);
        let idx = stratified_resample(&[2.0, 2.0], &mut rng).unwrap();
        assert_eq!(idx, vec![0, 1]);
    }

    #[test]
    fn test_rejects_bad_weights() {
        let mut rng = StdRng::seed_from_u64(6);
        assert!(multinomial_resample(&[], &mut rng).is_err());
        assert!(multinomial_resample(&[0.5, -0.5], &mut rng).is_err());
        assert!(multinomial_resample(&[0.0, 0.0], &mut rng).is_err());
    }

    #[test]
    fn test_method_dispatch_and_parse() {
        let mut rng = StdRng::seed_from_u64(7);
        let m: ResampleMethod = "Systematic".parse().unwrap();
        assert_eq!(m, ResampleMethod::Systematic);
        assert_eq!(m.to_string(), "systematic");
        assert_eq!(m.resample(&[1.0], &mut rng).unwrap(), vec![0]);
        assert!("bogus".parse::<ResampleMethod>().is_err());
    }

    #[test]
    fn test_neff() {
        assert!((neff(&[0.25; 4]).unwrap() - 4.0).abs() < 1e-12);
        assert!((neff(&[1.0, 0.0]).unwrap() - 1.0).abs() < 1e-12);
    }
}
