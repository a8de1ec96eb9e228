//! Kalman filters: the linear filter and its nonlinear, information,
//! square root, ensemble and multiple model variants, plus a fixed-lag
//! smoother.

pub mod ckf;
pub mod ekf;
pub mod ensemble;
pub mod fixed_lag;
pub mod imm;
pub mod information;
pub mod kalman_filter;
pub mod mmae;
pub mod sigma_points;
pub mod square_root;
pub mod ukf;
pub mod unscented_transform;

pub use ckf::{ckf_transform, spherical_radial_sigmas, CubatureKalmanFilter};
pub use ekf::ExtendedKalmanFilter;
pub use ensemble::EnsembleKalmanFilter;
pub use fixed_lag::FixedLagSmoother;
pub use imm::IMMEstimator;
pub use information::InformationFilter;
pub use kalman_filter::{
    predict, update, BatchInputs, BatchOutput, KalmanFilter, KalmanSnapshot, RtsOutput,
    UpdateResult,
};
pub use mmae::MMAEFilterBank;
pub use sigma_points::{JulierSigmaPoints, MerweScaledSigmaPoints, SigmaPoints, SimplexSigmaPoints};
pub use square_root::SquareRootKalmanFilter;
pub use ukf::{MeasurementFn, TransitionFn, UkfRtsOutput, UnscentedKalmanFilter};
pub use unscented_transform::{unscented_transform, MeanFn, ResidualFn};
