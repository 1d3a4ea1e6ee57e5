// crates/driftline-drift/src/ks.rs
//
// Two-sample Kolmogorov-Smirnov test.
//
// Statistic: D = sup |F_ref(x) - F_cur(x)| over the pooled sample.
// p-value:   exact Smirnov distribution (lattice-path recursion) for small
//            samples, asymptotic Kolmogorov distribution otherwise. With tied
//            values the exact path is conservative rather than exact.

use driftline_core::{DriftlineError, Result, TestOutcome, TwoSampleTest};

/// Below this `m * n` the exact distribution is used.
pub const EXACT_PRODUCT_LIMIT: usize = 10_000;

/// Two-sided two-sample Kolmogorov-Smirnov test.
#[derive(Debug, Clone, Copy, Default)]
pub struct KolmogorovSmirnov;

impl KolmogorovSmirnov {
    pub fn new() -> Self {
        Self
    }
}

impl TwoSampleTest for KolmogorovSmirnov {
    fn name(&self) -> &'static str {
        "kolmogorov-smirnov"
    }

    fn compare(&self, reference: &[f64], current: &[f64]) -> Result<TestOutcome> {
        check_sample("reference", reference)?;
        check_sample("current", current)?;

        let statistic = ks_statistic(reference, current);
        let (m, n) = (reference.len(), current.len());
        let p_value = if m.saturating_mul(n) < EXACT_PRODUCT_LIMIT {
            exact_p_value(statistic, m, n)
        } else {
            let lambda = ((m * n) as f64 / (m + n) as f64).sqrt() * statistic;
            kolmogorov_survival(lambda)
        };
        Ok(TestOutcome { statistic, p_value })
    }
}

fn check_sample(which: &str, sample: &[f64]) -> Result<()> {
    if sample.is_empty() {
        return Err(DriftlineError::Schema(format!("{} sample is empty", which)));
    }
    if sample.iter().any(|v| !v.is_finite()) {
        return Err(DriftlineError::Schema(format!(
            "{} sample contains non-finite values",
            which
        )));
    }
    Ok(())
}

/// Maximum distance between the two empirical CDFs.
pub fn ks_statistic(a: &[f64], b: &[f64]) -> f64 {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);

    let (n, m) = (a.len() as f64, b.len() as f64);
    let (mut i, mut j) = (0usize, 0usize);
    let mut d: f64 = 0.0;
    while i < a.len() && j < b.len() {
        let x = a[i].min(b[j]);
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        d = d.max((i as f64 / n - j as f64 / m).abs());
    }
    d
}

/// P(D >= d) under H0 for sample sizes `m` and `n`.
///
/// Counts monotone lattice paths from (0,0) to (m,n) that stay strictly
/// inside the band |i/m - j/n| <= d, normalized on the fly.
fn exact_p_value(d: f64, m: usize, n: usize) -> f64 {
    let (m, n) = if m > n { (n, m) } else { (m, n) };
    let (md, nd) = (m as f64, n as f64);
    let q = (0.5 + (d * md * nd - 1e-7).floor()) / (md * nd);

    let mut u: Vec<f64> = (0..=n)
        .map(|j| if j as f64 / nd > q { 0.0 } else { 1.0 })
        .collect();
    for i in 1..=m {
        let w = i as f64 / (i + n) as f64;
        let x = i as f64 / md;
        u[0] = if x > q { 0.0 } else { w * u[0] };
        for j in 1..=n {
            u[j] = if (x - j as f64 / nd).abs() > q {
                0.0
            } else {
                w * u[j] + u[j - 1]
            };
        }
    }
    (1.0 - u[n]).clamp(0.0, 1.0)
}

/// Survival function of the Kolmogorov distribution, Q(lambda) = 1 - K(lambda).
fn kolmogorov_survival(lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }
    if lambda < 1.0 {
        // Jacobi theta form; converges fast for small lambda.
        let pi2 = std::f64::consts::PI * std::f64::consts::PI;
        let s: f64 = (1..=5)
            .map(|k| {
                let odd = (2 * k - 1) as f64;
                (-odd * odd * pi2 / (8.0 * lambda * lambda)).exp()
            })
            .sum();
        let cdf = (2.0 * std::f64::consts::PI).sqrt() / lambda * s;
        return (1.0 - cdf).clamp(0.0, 1.0);
    }

    let mut total = 0.0;
    let mut sign = 1.0;
    for k in 1..=100 {
        let kf = k as f64;
        let term = (-2.0 * kf * kf * lambda * lambda).exp();
        total += sign * term;
        if term < 1e-16 {
            break;
        }
        sign = -sign;
    }
    (2.0 * total).clamp(0.0, 1.0)
}
