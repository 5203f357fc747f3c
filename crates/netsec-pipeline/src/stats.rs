use crate::error::{ErrorKind, PipelineError, Result};

/// Outcome of a two-sample Kolmogorov-Smirnov test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KsResult {
    /// Largest absolute gap between the two empirical CDFs.
    pub statistic: f64,
    pub p_value: f64,
}

/// Two-sample Kolmogorov-Smirnov test.
///
/// Missing values (`NaN`) are dropped from both samples first. The p-value is
/// the asymptotic Kolmogorov distribution with Stephens' small-sample
/// correction:
///
/// λ = (√nₑ + 0.12 + 0.11/√nₑ) · D, nₑ = n₁n₂/(n₁+n₂)
///
/// Adapted from: Numerical Recipes in C, 2nd ed., §14.3 (`kstwo`, `probks`).
///
/// # Arguments
///
/// * `base` - Reference sample (e.g. the train split of a column).
/// * `current` - Sample compared against the reference.
///
/// # Returns
///
/// The statistic and p-value, or a `DriftComputation` error when either
/// sample has no observed values.
pub fn ks_2samp(base: &[f64], current: &[f64]) -> Result<KsResult> {
    let mut a: Vec<f64> = base.iter().copied().filter(|v| !v.is_nan()).collect();
    let mut b: Vec<f64> = current.iter().copied().filter(|v| !v.is_nan()).collect();
    if a.is_empty() || b.is_empty() {
        return Err(PipelineError::new(
            ErrorKind::DriftComputation,
            format!(
                "KS test needs observed values on both sides (got {} and {})",
                a.len(),
                b.len()
            ),
        ));
    }
    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);

    let statistic = ks_statistic(&a, &b);
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let en = (n1 * n2 / (n1 + n2)).sqrt();
    let p_value = kolmogorov_q((en + 0.12 + 0.11 / en) * statistic);
    Ok(KsResult { statistic, p_value })
}

/// D statistic over two sorted samples. Ties are consumed together on both
/// sides before the CDFs are compared.
fn ks_statistic(a: &[f64], b: &[f64]) -> f64 {
    let (n1, n2) = (a.len() as f64, b.len() as f64);
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
        d = d.max((i as f64 / n1 - j as f64 / n2).abs());
    }
    d
}

/// Kolmogorov survival function Q(λ) = 2 Σ (-1)^(j-1) exp(-2 j² λ²).
fn kolmogorov_q(lambda: f64) -> f64 {
    const EPS1: f64 = 1e-3;
    const EPS2: f64 = 1e-8;

    let a2 = -2.0 * lambda * lambda;
    let mut fac = 2.0;
    let mut sum = 0.0;
    let mut prev_term: f64 = 0.0;
    for j in 1..=100 {
        let jf = j as f64;
        let term = fac * (a2 * jf * jf).exp();
        sum += term;
        if term.abs() <= EPS1 * prev_term || term.abs() <= EPS2 * sum {
            return sum.clamp(0.0, 1.0);
        }
        fac = -fac;
        prev_term = term.abs();
    }
    // series did not converge: λ is close to zero, the samples agree
    1.0
}
