#![allow(non_snake_case)]

use approx::assert_relative_eq;
use filterpy::common::{kinematic_kf, q_discrete_white_noise, Saver};
use filterpy::kalman::{
    BatchInputs, CubatureKalmanFilter, ExtendedKalmanFilter, JulierSigmaPoints, KalmanFilter,
    KalmanSnapshot, MerweScaledSigmaPoints, SquareRootKalmanFilter, UnscentedKalmanFilter,
};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

const DT: f64 = 1.0;

/// Noisy position measurements of a target moving at 1 unit per step,
/// along with the true positions.
fn noisy_track(n: usize, std: f64, seed: u64) -> (Vec<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let truth: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let zs = truth
        .iter()
        .map(|t| t + std * rng.sample::<f64, _>(StandardNormal))
        .collect();
    (truth, zs)
}

fn cv_filter(r: f64) -> KalmanFilter {
    let mut kf = kinematic_kf(1, 1, DT, 1, true).unwrap();
    kf.P *= 500.0;
    kf.R *= r;
    kf.Q = q_discrete_white_noise(2, DT, 0.001, 1, true).unwrap();
    kf
}

fn z(v: f64) -> DVector<f64> {
    DVector::from_element(1, v)
}

#[test]
fn test_constant_velocity_track_converges() {
    let (truth, zs) = noisy_track(150, 1.0, 1);
    let mut kf = cv_filter(1.0);
    let mut saver = Saver::<KalmanSnapshot>::new();
    for &m in &zs {
        kf.predict(None).unwrap();
        kf.update(&z(m)).unwrap();
        saver.save(&kf);
    }

    assert_eq!(saver.len(), 150);
    assert_relative_eq!(kf.x[1], 1.0, epsilon = 0.35);
    assert_relative_eq!(kf.x[0], truth[149], epsilon = 2.0);

    // position variance settles well below the measurement variance
    let variances = saver.map_field(|s| s.P[(0, 0)]);
    assert!(variances[149] < 1.0);
    assert!(variances[149] < variances[0]);
}

#[test]
fn test_rts_smoothing_reduces_error() {
    let (truth, zs) = noisy_track(200, 3.0, 2);
    let mut kf = cv_filter(9.0);
    let measurements: Vec<Option<DVector<f64>>> = zs.iter().map(|&m| Some(z(m))).collect();
    let out = kf.batch_filter(&measurements, &BatchInputs::default()).unwrap();
    let smoothed = kf.rts_smoother(&out.means, &out.covariances, None, None).unwrap();

    let sq_err = |xs: &[DVector<f64>]| -> f64 {
        xs.iter().zip(&truth).skip(10).map(|(x, t)| (x[0] - t).powi(2)).sum()
    };
    let filtered_err = sq_err(&out.means[..]);
    let smoothed_err = sq_err(&smoothed.x[..]);
    assert!(
        smoothed_err < filtered_err,
        "smoothed {} vs filtered {}",
        smoothed_err,
        filtered_err
    );

    for (p, ps) in out.covariances.iter().zip(&smoothed.P) {
        assert!(ps[(0, 0)] <= p[(0, 0)] + 1e-9);
    }
}

#[test]
fn test_batch_filter_skips_missing_measurements() {
    let mut kf = cv_filter(1.0);
    let zs: Vec<Option<DVector<f64>>> = (0..20)
        .map(|i| if i % 4 == 3 { None } else { Some(z(i as f64)) })
        .collect();
    let out = kf.batch_filter(&zs, &BatchInputs::default()).unwrap();
    assert_eq!(out.means.len(), 20);
    for i in (3..20).step_by(4) {
        assert_eq!(out.means[i], out.means_prior[i]);
        assert_eq!(out.covariances[i], out.covariances_prior[i]);
    }
}

#[test]
fn test_linear_variants_agree_with_kalman_filter() {
    let (_, zs) = noisy_track(40, 2.0, 3);
    let mut kf = cv_filter(4.0);

    let mut ukf = UnscentedKalmanFilter::new(
        2,
        1,
        DT,
        |x: &DVector<f64>| DVector::from_element(1, x[0]),
        |x: &DVector<f64>, dt: f64| DVector::from_vec(vec![x[0] + dt * x[1], x[1]]),
        MerweScaledSigmaPoints::new(2, 0.3, 2.0, 1.0).unwrap(),
    )
    .unwrap();
    ukf.P = kf.P.clone();
    ukf.Q = kf.Q.clone();
    ukf.R = kf.R.clone();

    let mut ckf = CubatureKalmanFilter::new(
        2,
        1,
        DT,
        |x: &DVector<f64>| DVector::from_element(1, x[0]),
        |x: &DVector<f64>, dt: f64| DVector::from_vec(vec![x[0] + dt * x[1], x[1]]),
    )
    .unwrap();
    ckf.P = kf.P.clone();
    ckf.Q = kf.Q.clone();
    ckf.R = kf.R.clone();

    let mut sr = SquareRootKalmanFilter::new(2, 1, 0).unwrap();
    sr.F = kf.F.clone();
    sr.H = kf.H.clone();
    sr.set_P(&kf.P).unwrap();
    sr.set_Q(&kf.Q).unwrap();
    sr.set_R(&kf.R).unwrap();

    let H = kf.H.clone();
    let mut ekf = ExtendedKalmanFilter::new(2, 1, 0).unwrap();
    ekf.F = kf.F.clone();
    ekf.P = kf.P.clone();
    ekf.Q = kf.Q.clone();
    ekf.R = kf.R.clone();

    for &m in &zs {
        let zm = z(m);
        kf.predict(None).unwrap();
        kf.update(&zm).unwrap();

        ukf.predict().unwrap();
        ukf.update(&zm).unwrap();
        ckf.predict().unwrap();
        ckf.update(&zm).unwrap();
        sr.predict(None).unwrap();
        sr.update(&zm).unwrap();
        ekf.predict(None).unwrap();
        ekf.update(&zm, |_| H.clone(), |x| &H * x, None).unwrap();

        assert_relative_eq!(ukf.x, kf.x, epsilon = 1e-6);
        assert_relative_eq!(ckf.x, kf.x, epsilon = 1e-6);
        assert_relative_eq!(sr.x, kf.x, epsilon = 1e-6);
        assert_relative_eq!(ekf.x, kf.x, epsilon = 1e-6);
    }
    assert_relative_eq!(ukf.P, kf.P, epsilon = 1e-6);
    assert_relative_eq!(sr.P(), kf.P, epsilon = 1e-6);
}

// Range and bearing of a target moving at (5, -3) per step, seen from the
// origin.
fn radar_truth(k: usize) -> (f64, f64) {
    (1000.0 + 5.0 * k as f64, 500.0 - 3.0 * k as f64)
}

fn radar_measurement(x: &DVector<f64>) -> DVector<f64> {
    DVector::from_vec(vec![x[0].hypot(x[2]), x[2].atan2(x[0])])
}

fn radar_jacobian(x: &DVector<f64>) -> DMatrix<f64> {
    let (px, py) = (x[0], x[2]);
    let r2 = px * px + py * py;
    let r = r2.sqrt();
    DMatrix::from_row_slice(2, 4, &[px / r, 0.0, py / r, 0.0, -py / r2, 0.0, px / r2, 0.0])
}

fn cv_2d(x: &DVector<f64>, dt: f64) -> DVector<f64> {
    DVector::from_vec(vec![x[0] + dt * x[1], x[1], x[2] + dt * x[3], x[3]])
}

fn radar_setup() -> (DVector<f64>, DMatrix<f64>, DMatrix<f64>, DMatrix<f64>) {
    let x0 = DVector::from_vec(vec![980.0, 0.0, 520.0, 0.0]);
    let P0 = DMatrix::from_diagonal(&DVector::from_vec(vec![400.0, 25.0, 400.0, 25.0]));
    let Q = q_discrete_white_noise(2, DT, 0.01, 2, true).unwrap();
    let R = DMatrix::from_diagonal(&DVector::from_vec(vec![1.0, 1e-6]));
    (x0, P0, Q, R)
}

fn assert_on_radar_track(x: &DVector<f64>) {
    let (tx, ty) = radar_truth(100);
    assert_relative_eq!(x[0], tx, epsilon = 1.0);
    assert_relative_eq!(x[2], ty, epsilon = 1.0);
    assert_relative_eq!(x[1], 5.0, epsilon = 0.1);
    assert_relative_eq!(x[3], -3.0, epsilon = 0.1);
}

#[test]
fn test_nonlinear_filters_track_range_bearing_target() {
    let (x0, P0, Q, R) = radar_setup();

    let mut ekf = ExtendedKalmanFilter::new(4, 2, 0).unwrap();
    ekf.F = DMatrix::from_row_slice(
        4,
        4,
        &[
            1.0, DT, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, DT, //
            0.0, 0.0, 0.0, 1.0,
        ],
    );
    ekf.x = x0.clone();
    ekf.P = P0.clone();
    ekf.Q = Q.clone();
    ekf.R = R.clone();

    let mut ukf = UnscentedKalmanFilter::new(
        4,
        2,
        DT,
        radar_measurement,
        cv_2d,
        JulierSigmaPoints::new(4, 0.0).unwrap(),
    )
    .unwrap();
    ukf.x = x0.clone();
    ukf.P = P0.clone();
    ukf.Q = Q.clone();
    ukf.R = R.clone();

    let mut ckf = CubatureKalmanFilter::new(4, 2, DT, radar_measurement, cv_2d).unwrap();
    ckf.x = x0;
    ckf.P = P0;
    ckf.Q = Q;
    ckf.R = R;

    for k in 1..=100 {
        let (tx, ty) = radar_truth(k);
        let zk = DVector::from_vec(vec![tx.hypot(ty), ty.atan2(tx)]);

        ekf.predict(None).unwrap();
        ekf.update(&zk, radar_jacobian, radar_measurement, None).unwrap();
        ukf.predict().unwrap();
        ukf.update(&zk).unwrap();
        ckf.predict().unwrap();
        ckf.update(&zk).unwrap();
    }

    assert_on_radar_track(&ekf.x);
    assert_on_radar_track(&ukf.x);
    assert_on_radar_track(&ckf.x);
}

#[test]
fn test_likelihood_prefers_consistent_measurements() {
    let mut kf = cv_filter(1.0);
    for i in 0..30 {
        kf.predict(None).unwrap();
        kf.update(&z(i as f64)).unwrap();
    }
    kf.predict(None).unwrap();
    let near = kf.log_likelihood_of(&z(30.0)).unwrap();
    let far = kf.log_likelihood_of(&z(45.0)).unwrap();
    assert!(near > far);
}
