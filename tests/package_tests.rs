use filterpy::{has_module, MODULES, VERSION};

#[test]
fn test_version_identifier() {
    assert_eq!(VERSION, "1.4.5");
}

#[test]
fn test_public_modules() {
    assert_eq!(
        MODULES,
        [
            "common",
            "discrete_bayes",
            "gh",
            "hinfinity",
            "kalman",
            "leastsq",
            "memory",
            "monte_carlo",
            "stats"
        ]
    );
    for name in MODULES {
        assert!(has_module(name));
    }
}

#[test]
fn test_unknown_modules_not_found() {
    for name in ["particles", "utils", "app", "filterpy", "common.error", " kalman"] {
        assert!(!has_module(name), "{}", name);
    }
}

#[test]
fn test_modules_resolve() {
    // one item from each namespace
    let _ = filterpy::common::q_discrete_white_noise;
    let _ = filterpy::discrete_bayes::normalize;
    let _ = filterpy::gh::least_squares_parameters;
    let _ = filterpy::hinfinity::HInfinityFilter::new;
    let _ = filterpy::kalman::KalmanFilter::new;
    let _ = filterpy::leastsq::LeastSquaresFilter::new;
    let _ = filterpy::memory::FadingMemoryFilter::new;
    let _ = filterpy::monte_carlo::neff;
    let _ = filterpy::stats::gaussian;
}
