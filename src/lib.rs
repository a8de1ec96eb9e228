//! Kalman and Bayesian filters.
//!
//! Recursive estimators (Kalman, extended/unscented/cubature Kalman,
//! H-infinity, g-h, least squares, fading memory, discrete Bayes) together
//! with the statistics and resampling routines they lean on.

// Matrix names follow the usual estimation notation (P, Q, R, H, F).
#![allow(non_snake_case)]

pub mod common;
pub mod discrete_bayes;
pub mod gh;
pub mod hinfinity;
pub mod kalman;
pub mod leastsq;
pub mod memory;
pub mod monte_carlo;
pub mod stats;

/// Release revision of the library.
pub const VERSION: &str = "1.4.5";

/// Public sub-modules, in declaration order.
pub const MODULES: [&str; 9] = [
    "common",
    "discrete_bayes",
    "gh",
    "hinfinity",
    "kalman",
    "leastsq",
    "memory",
    "monte_carlo",
    "stats",
];

/// Returns true when `name` is one of the public sub-modules.
pub fn has_module(name: &str) -> bool {
    MODULES.contains(&name)
}
