//! Core statistical operations
//!
//! The scalar reductions skip missing (non-finite) values and report `None`
//! when nothing valid remains, so that "no data" never turns into zero.

/// Mean of the finite values.
pub fn nan_mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((0.0_f64, 0_usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Trapezoidal integral of `values` sampled at `coords`.
///
/// A column with any missing level is itself missing, as is one with fewer
/// than two levels.
pub fn trapezoid(coords: &[f64], values: &[f64]) -> Option<f64> {
    if coords.len() < 2 || coords.len() != values.len() {
        return None;
    }
    if coords.iter().chain(values).any(|v| !v.is_finite()) {
        return None;
    }

    let integral = coords
        .windows(2)
        .zip(values.windows(2))
        .map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) / 2.0)
        .sum();
    Some(integral)
}
