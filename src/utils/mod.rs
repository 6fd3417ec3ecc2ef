/// Round to the nearest integer and clamp into `[min, max]`.
pub fn round_clamp(value: f64, min: i32, max: i32) -> i32 {
    if value.is_nan() {
        return min;
    }
    (value.round() as i32).clamp(min, max)
}

/// Arithmetic mean, or `default` when there is nothing to average.
pub fn mean_or<I>(values: I, default: f64) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        default
    } else {
        sum / count as f64
    }
}

/// Win percentage over played matches (0.0 when nothing was played).
pub fn calculate_win_percentage(wins: u32, matches: u32) -> f64 {
    if matches == 0 {
        return 0.0;
    }
    (wins as f64) / (matches as f64) * 100.0
}

/// Signed rating change for display, e.g. "+3", "-2", "0".
pub fn format_rating_delta(before: i32, after: i32) -> String {
    let delta = after - before;
    if delta > 0 {
        format!("+{}", delta)
    } else {
        delta.to_string()
    }
}
