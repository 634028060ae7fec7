//! Descriptive statistics used by the extractors and aggregators
//!
//! Reductions skip `NaN` samples (a frame with lost tracking, or an event whose
//! variance is undefined) and return `NaN` when nothing is left to reduce.
//! Variances and standard deviations are sample statistics (n - 1 denominator).

/// Mean of the non-NaN values
pub fn mean(values: &[f64]) -> f64 {
    let (sum, n) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        return f64::NAN;
    }
    sum / n as f64
}

/// Sample variance of the non-NaN values; NaN with fewer than two samples
pub fn sample_variance(values: &[f64]) -> f64 {
    let present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if present.len() < 2 {
        return f64::NAN;
    }
    let mu = mean(&present);
    let ss: f64 = present.iter().map(|x| (x - mu).powi(2)).sum();
    ss / (present.len() - 1) as f64
}

/// Sample standard deviation of the non-NaN values
pub fn sample_std(values: &[f64]) -> f64 {
    sample_variance(values).sqrt()
}

/// Smallest non-NaN value
pub fn min(values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f64::NAN, f64::min)
}

/// Largest non-NaN value
pub fn max(values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f64::NAN, f64::max)
}

/// Slope of a degree-1 least-squares fit of `values` against `0..n`.
///
/// NaN for fewer than two points or when any sample is NaN.
pub fn linear_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 || values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(values);

    let (sxy, sxx) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(sxy, sxx), (i, y)| {
            let dx = i as f64 - x_mean;
            (sxy + dx * (y - y_mean), sxx + dx * dx)
        });
    sxy / sxx
}

/// Standard scores against the whole slice's mean and sample std.
///
/// NaN inputs stay NaN; zero or undefined spread yields NaN everywhere.
pub fn z_scores(values: &[f64]) -> Vec<f64> {
    let mu = mean(values);
    let sigma = sample_std(values);
    values
        .iter()
        .map(|v| {
            if sigma > 0.0 {
                (v - mu) / sigma
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// `numerator / denominator`, NaN when the denominator is zero
pub fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return f64::NAN;
    }
    numerator as f64 / denominator as f64
}
