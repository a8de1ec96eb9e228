//! Standard choices of the g, h and k gains.

use crate::common::error::{FilterError, Result};

/// Gains of a g-h or g-h-k filter. `k` is `None` for a g-h filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GhkParameters {
    pub g: f64,
    pub h: f64,
    pub k: Option<f64>,
}

/// Optimal `(g, h, k)` for white noise (Polge and Bhagavan) given `g`.
pub fn optimal_noise_smoothing(g: f64) -> (f64, f64, f64) {
    let h = ((2.0 * g.powi(3) - 4.0 * g * g)
        + (4.0 * g.powi(6) - 64.0 * g.powi(5) + 64.0 * g.powi(4)).sqrt())
        / (8.0 * (1.0 - g));
    let k = (h * (2.0 - g) - g * g) / g;
    (g, h, k)
}

/// `(g, h)` that make the g-h filter an expanding memory least squares
/// fit at step `n`.
pub fn least_squares_parameters(n: usize) -> (f64, f64) {
    let n = n as f64;
    let den = (n + 2.0) * (n + 1.0);
    let g = 2.0 * (2.0 * n + 1.0) / den;
    let h = 6.0 / den;
    (g, h)
}

/// Critically damped gains for a discounting factor `theta` in `[0, 1]`.
/// `order` 2 gives a g-h filter, 3 a g-h-k filter.
pub fn critical_damping_parameters(theta: f64, order: usize) -> Result<GhkParameters> {
    if !(0.0..=1.0).contains(&theta) {
        return Err(FilterError::invalid("theta", theta, "must be between 0 and 1"));
    }
    match order {
        2 => Ok(GhkParameters {
            g: 1.0 - theta * theta,
            h: (1.0 - theta).powi(2),
            k: None,
        }),
        3 => Ok(GhkParameters {
            g: 1.0 - theta.powi(3),
            h: 1.5 * (1.0 - theta * theta) * (1.0 - theta),
            k: Some(0.5 * (1.0 - theta).powi(3)),
        }),
        _ => Err(FilterError::invalid("order", order, "must be 2 or 3")),
    }
}

/// Benedict-Bordner `(g, h)` minimising transient error for a given `g`.
/// `critical` selects the critically damped variant.
pub fn benedict_bornder_constants(g: f64, critical: bool) -> (f64, f64) {
    let g_sqr = g * g;
    if critical {
        (g, 0.8 * (2.0 - g_sqr - 2.0 * (1.0 - g_sqr).sqrt()) / g_sqr)
    } else {
        (g, g_sqr / (2.0 - g))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_least_squares_parameters() {
        assert_eq!(least_squares_parameters(0), (1.0, 3.0));
        let (g, h) = least_squares_parameters(4);
        assert_relative_eq!(g, 18.0 / 30.0);
        assert_relative_eq!(h, 6.0 / 30.0);
    }

    #[test]
    fn test_critical_damping() {
        let p = critical_damping_parameters(0.5, 2).unwrap();
        assert_relative_eq!(p.g, 0.75);
        assert_relative_eq!(p.h, 0.25);
        assert!(p.k.is_none());

        let p = critical_damping_parameters(0.5, 3).unwrap();
        assert_relative_eq!(p.g, 0.875);
        assert_relative_eq!(p.h, 0.5625);
        assert_relative_eq!(p.k.unwrap(), 0.0625);

        assert!(critical_damping_parameters(1.5, 2).is_err());
        assert!(critical_damping_parameters(0.5, 4).is_err());
    }

    #[test]
    fn test_benedict_bornder() {
        let (g, h) = benedict_bornder_constants(0.5, false);
        assert_eq!(g, 0.5);
        assert_relative_eq!(h, 0.25 / 1.5);
        let (_, hc) = benedict_bornder_constants(0.5, true);
        assert!(hc > 0.0);
    }

    #[test]
    fn test_optimal_noise_smoothing_is_finite() {
        let (g, h, k) = optimal_noise_smoothing(0.5);
        assert_eq!(g, 0.5);
        assert!(h.is_finite() && h > 0.0);
        assert!(k.is_finite());
    }
}
