use std::f64::consts::FRAC_1_SQRT_2;

pub use libm::{erf, erfc};

/// Cumulative distribution of the standard normal.
pub fn std_normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x * FRAC_1_SQRT_2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_erf_known_values() {
        assert_eq!(erf(0.0), 0.0);
        assert_relative_eq!(erf(0.5), 0.520_499_877_813_046_5, epsilon = 1e-14);
        assert_relative_eq!(erf(1.0), 0.842_700_792_949_714_9, epsilon = 1e-14);
        assert_relative_eq!(erf(-1.0), -0.842_700_792_949_714_9, epsilon = 1e-14);
    }

    #[test]
    fn test_erfc_relative_precision() {
        // erfc(2.4) is where 1 - erf(x) loses digits
        assert_relative_eq!(erfc(2.4), 6.885_138_966_450_789e-4, max_relative = 1e-13);
        assert_relative_eq!(erfc(3.0), 2.209_049_699_858_544e-5, max_relative = 1e-13);
        assert_relative_eq!(erfc(5.0), 1.537_459_794_428_035e-12, max_relative = 1e-13);
        assert_relative_eq!(erfc(-1.0), 1.842_700_792_949_715, epsilon = 1e-14);
    }

    #[test]
    fn test_std_normal_cdf() {
        assert_relative_eq!(std_normal_cdf(0.0), 0.5, epsilon = 1e-15);
        assert_relative_eq!(std_normal_cdf(1.959_963_984_540_054), 0.975, epsilon = 1e-12);
        assert!(std_normal_cdf(f64::NAN).is_nan());
    }
}
