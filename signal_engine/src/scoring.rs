/// Precision of every currency and energy figure the engine emits.
pub const MONEY_PRECISION: f64 = 0.1;

/// Round to the nearest multiple of `precision`, halves away from zero.
///
/// `round_to(12345.67, 0.1) == 12345.7`, `round_to(-0.25, 0.1) == -0.3`
pub fn round_to(value: f64, precision: f64) -> f64 {
    if precision <= 0.0 || !value.is_finite() {
        return value;
    }
    let factor = 1.0 / precision;
    (value * factor).round() / factor
}

pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Signed deviation of `value` from `reference` in whole percent.
pub fn deviation_pct(value: f64, reference: f64) -> i64 {
    if reference == 0.0 {
        return 0;
    }
    ((value / reference - 1.0) * 100.0).round() as i64
}
