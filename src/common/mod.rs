//! Shared building blocks: errors, linear algebra helpers, process
//! noise, kinematic models and filter state recording.

pub mod discretization;
pub mod error;
pub mod helpers;
pub mod kinematic;
pub mod linalg;

pub use discretization::{
    linear_ode_discretation, q_continuous_white_noise, q_discrete_white_noise,
    van_loan_discretization,
};
pub use error::{FilterError, Result};
pub use helpers::{inv_diagonal, outer_product_sum, reshape_z, runge_kutta4, Saver, Snapshot};
pub use kinematic::{kinematic_kf, kinematic_state_transition};
pub use linalg::{block_diag, order_by_derivative};
