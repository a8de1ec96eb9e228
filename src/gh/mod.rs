//! g-h and g-h-k fixed gain filters and their standard gain choices.

pub mod filters;
pub mod parameters;

pub use filters::{GHFilter, GHFilterOrder, GHKFilter, GhEstimates, GhkEstimates};
pub use parameters::{
    benedict_bornder_constants, critical_damping_parameters, least_squares_parameters,
    optimal_noise_smoothing, GhkParameters,
};
