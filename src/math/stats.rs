//! Descriptive statistics and regression error metrics.

/// Arithmetic mean; `NaN` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (ddof = 0).
pub fn variance(values: &[f64]) -> f64 {
    let m = mean(values);
    if !m.is_finite() {
        return f64::NAN;
    }
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation (ddof = 0).
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Mean squared error between aligned slices.
pub fn mse(actual: &[f64], predicted: &[f64]) -> f64 {
    debug_assert_eq!(actual.len(), predicted.len());
    if actual.is_empty() {
        return f64::NAN;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p) * (a - p))
        .sum::<f64>()
        / actual.len() as f64
}

pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    mse(actual, predicted).sqrt()
}

pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    debug_assert_eq!(actual.len(), predicted.len());
    if actual.is_empty() {
        return f64::NAN;
    }
    actual.iter().zip(predicted).map(|(a, p)| (a - p).abs()).sum::<f64>() / actual.len() as f64
}

/// Coefficient of determination `1 - SSres / SStot`.
///
/// Returns `NaN` when the actual values are all identical: R² is undefined there,
/// and reporting 0 would read as "no better than the mean".
pub fn r_squared(actual: &[f64], predicted: &[f64]) -> f64 {
    debug_assert_eq!(actual.len(), predicted.len());
    let Some(&first) = actual.first() else {
        return f64::NAN;
    };
    if actual.iter().all(|&a| a == first) {
        return f64::NAN;
    }

    let m = mean(actual);
    let ss_tot: f64 = actual.iter().map(|a| (a - m) * (a - m)).sum();
    let ss_res: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p) * (a - p)).sum();
    1.0 - ss_res / ss_tot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn population_std_of_known_series() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&v) - 5.0).abs() < 1e-12);
        assert!((std_dev(&v) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn metrics_on_perfect_fit() {
        let a = [1.0, 2.0, 3.0];
        assert_eq!(rmse(&a, &a), 0.0);
        assert_eq!(mae(&a, &a), 0.0);
        assert!((r_squared(&a, &a) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn metrics_on_known_residuals() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let p = [2.0, 2.0, 3.0, 2.0];
        // residuals: -1, 0, 0, 2
        assert!((mae(&a, &p) - 0.75).abs() < 1e-12);
        assert!((rmse(&a, &p) - (5.0f64 / 4.0).sqrt()).abs() < 1e-12);
        // SStot = 5, SSres = 5
        assert!(r_squared(&a, &p).abs() < 1e-12);
    }

    #[test]
    fn r_squared_undefined_for_constant_actuals() {
        let a = [3.3, 3.3, 3.3];
        let p = [3.0, 3.5, 3.2];
        assert!(r_squared(&a, &p).is_nan());
    }

    #[test]
    fn r_squared_never_exceeds_one() {
        let a = [1.0, 5.0, 2.0, 8.0];
        for p in [[0.0, 0.0, 0.0, 0.0], [1.1, 4.9, 2.0, 8.2], [8.0, 2.0, 5.0, 1.0]] {
            assert!(r_squared(&a, &p) <= 1.0);
        }
    }
}
