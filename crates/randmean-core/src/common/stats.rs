//! Descriptive statistics over integer samples.
//!
//! All functions are pure and run in a single pass (two for the deviation)
//! without allocating. The standard deviation is the *population* deviation,
//! normalized by `n` rather than `n - 1`.

use crate::{Error, Result};

/// Exact sum of the sample.
///
/// Accumulates in `i128` so that no realistic sample can overflow.
pub fn sum(values: &[i64]) -> i128 {
    values.iter().map(|&value| i128::from(value)).sum()
}

/// Arithmetic mean of the sample.
///
/// # Errors
///
/// Returns [`Error::EmptySample`] if `values` is empty.
pub fn mean(values: &[i64]) -> Result<f64> {
    if values.is_empty() {
        return Err(Error::EmptySample);
    }
    Ok(sum(values) as f64 / values.len() as f64)
}

/// Population standard deviation: `sqrt((1/n) * sum((x_i - mean)^2))`.
///
/// # Errors
///
/// Returns [`Error::EmptySample`] if `values` is empty.
pub fn standard_deviation(values: &[i64]) -> Result<f64> {
    let mean = mean(values)?;
    let squared_deviations: f64 = values
        .iter()
        .map(|&value| {
            let deviation = value as f64 - mean;
            deviation * deviation
        })
        .sum();
    Ok((squared_deviations / values.len() as f64).sqrt())
}
