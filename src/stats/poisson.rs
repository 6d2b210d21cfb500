//! Poisson extremum helpers for the per-position error model.
//!
//! Per-position error counts are modeled as independent Poisson(μ)
//! variables over `l` positions; the maximum then has CDF `F(x)^l`.

use statrs::distribution::{DiscreteCDF, Poisson};

/// `P(Poisson(mu) <= x)`; 0 for negative `x`, 1 when the rate is 0.
pub fn poisson_cdf(x: i64, mu: f64) -> f64 {
    if x < 0 {
        return 0.0;
    }
    if mu <= 0.0 {
        return 1.0;
    }
    // mu > 0 is the only constructor requirement
    let dist = Poisson::new(mu).expect("positive Poisson rate");
    dist.cdf(x as u64)
}

/// Smallest `k` with `P(Poisson(mu) <= k) >= q`, as a float so the `q >= 1`
/// boundary can map to infinity like the extremum quantile expects.
pub fn poisson_quantile(q: f64, mu: f64) -> f64 {
    if q >= 1.0 {
        return f64::INFINITY;
    }
    if q <= 0.0 || mu <= 0.0 {
        return 0.0;
    }
    let dist = Poisson::new(mu).expect("positive Poisson rate");
    dist.inverse_cdf(q) as f64
}

/// CDF of the maximum of `l` independent Poisson(mu) draws.
pub fn max_cdf(x: i64, mu: f64, l: u64) -> f64 {
    poisson_cdf(x, mu).powf(l as f64)
}

/// Quantile of the maximum of `l` independent Poisson(mu) draws.
pub fn max_quantile(q: f64, mu: f64, l: u64) -> f64 {
    poisson_quantile(q.powf(1.0 / l as f64), mu)
}
