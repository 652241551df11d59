//! Numeric helpers for error-surface statistics.

/// Computes the mean and population standard deviation of `values`.
///
/// Uses two passes in `f64` so a flat surface yields an exact zero deviation.
/// Returns `(NaN, NaN)` for an empty slice.
pub(crate) fn mean_std(values: &[f32]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let count = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / count;
    let var = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / count;
    (mean, var.sqrt())
}

/// Returns the index of the first minimum, skipping NaN entries.
pub(crate) fn argmin(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &value) in values.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, current)) if value >= current => {}
            _ => best = Some((idx, value)),
        }
    }
    best.map(|(idx, _)| idx)
}
