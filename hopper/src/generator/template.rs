use chrono::{DateTime, Utc};

/// Normalized flare response at `t`: zero outside `[start, end]`, a linear
/// rise to 1.0 at `peak` and an exponential decay afterwards.
pub fn flash_profile(t: DateTime<Utc>, start: DateTime<Utc>, peak: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    if t < start || t > end {
        return 0.0;
    }
    let since_start = (t - start).num_milliseconds() as f64;
    let rise = (peak - start).num_milliseconds() as f64;
    if t <= peak {
        return if rise > 0.0 { since_start / rise } else { 1.0 };
    }
    let fall = (end - peak).num_milliseconds() as f64;
    let since_peak = (t - peak).num_milliseconds() as f64;
    // Decays to ~5% by the end of the event.
    (-3.0 * since_peak / fall).exp()
}
