//! Descriptive statistics shared by the synthesis stages.

use ndarray::ArrayView1;

/// Arithmetic mean, 0.0 for empty input
pub fn mean(values: ArrayView1<'_, f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sum() / values.len() as f64
}

/// Population standard deviation (n denominator)
pub fn std_population(values: ArrayView1<'_, f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Sample standard deviation (n - 1 denominator)
pub fn std_sample(values: ArrayView1<'_, f64>) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Pearson correlation coefficient.
///
/// `None` when either side has zero variance, lengths differ, or fewer than
/// two observations exist.
pub fn pearson(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }

    let mean_a = mean(a);
    let mean_b = mean(b);

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;

    for (&x, &y) in a.iter().zip(b.iter()) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = (var_a * var_b).sqrt();
    if !denom.is_finite() || denom < 1e-12 {
        return None;
    }

    Some((cov / denom).clamp(-1.0, 1.0))
}

/// Number of distinct values (exact float equality)
pub fn distinct_count(values: ArrayView1<'_, f64>) -> usize {
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted.dedup();
    sorted.len()
}

/// Observed (min, max) of the finite values, `None` when there are none
pub fn min_max(values: ArrayView1<'_, f64>) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Round to two decimal digits
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_mean_and_std() {
        let v = array![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(v.view()) - 5.0).abs() < 1e-12);
        assert!((std_population(v.view()) - 2.0).abs() < 1e-12);
        assert!((std_sample(v.view()) - 2.138089935).abs() < 1e-9);
    }

    #[test]
    fn test_pearson_perfect_and_inverse() {
        let x = array![1.0, 2.0, 3.0];
        let y = array![2.0, 4.0, 6.0];
        let z = array![3.0, 2.0, 1.0];
        assert!((pearson(x.view(), y.view()).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(x.view(), z.view()).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_undefined_for_constant_column() {
        let x = array![1.0, 2.0, 3.0];
        let c = array![5.0, 5.0, 5.0];
        assert!(pearson(x.view(), c.view()).is_none());
        assert!(pearson(x.view(), array![1.0].view()).is_none());
    }

    #[test]
    fn test_distinct_and_range() {
        let v = array![3.0, 1.0, 3.0, 2.0];
        assert_eq!(distinct_count(v.view()), 3);
        assert_eq!(min_max(v.view()), Some((1.0, 3.0)));
        assert_eq!(round2(0.8666), 0.87);
        assert_eq!(round2(-0.346), -0.35);
    }

    #[test]
    fn test_range_ignores_non_finite() {
        let v = array![f64::NAN, 2.0, f64::INFINITY, -1.0, f64::NEG_INFINITY];
        assert_eq!(min_max(v.view()), Some((-1.0, 2.0)));
        assert_eq!(min_max(array![f64::NAN, f64::INFINITY].view()), None);
    }
}
