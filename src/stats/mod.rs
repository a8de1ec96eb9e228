//! Gaussian statistics used throughout the filters: densities, products
//! of Gaussians, Mahalanobis distance, covariance ellipses.

pub mod multivariate;
pub mod special;
pub mod univariate;

pub use multivariate::{
    covariance_ellipse, likelihood, log_likelihood, logpdf, logpdf_1d, mahalanobis,
    mahalanobis_1d, multivariate_gaussian, multivariate_gaussian_1d, multivariate_multiply,
    nees,
};
pub use special::{erf, erfc, std_normal_cdf};
pub use univariate::{
    add, gaussian, gaussian_pdf, mul, mul_pdf, norm_cdf, norm_cdf_std, rand_student_t,
};
