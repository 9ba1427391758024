//! Growth and status rules shared by every ranking in a snapshot.

use sportrend_core::TrendStatus;

/// Below this many mentions a trend is still emerging.
pub const EMERGING_MAX_COUNT: u64 = 50;
/// Above this growth (percent) a trend is emerging regardless of volume.
pub const EMERGING_MIN_GROWTH: f64 = 20.0;
/// Below this many mentions a non-emerging trend is peaking.
pub const PEAKING_MAX_COUNT: u64 = 200;

/// Percent change against the previous equal-length window.
///
/// `(current - previous) / (previous + 1) * 100`; the `+ 1` keeps a brand-new
/// entity finite.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn growth_rate(current: u64, previous: u64) -> f64 {
    (current as f64 - previous as f64) / (previous as f64 + 1.0) * 100.0
}

/// Never returns [`TrendStatus::Ended`]; only retention ends a trend.
#[must_use]
pub fn classify(count: u64, growth_rate: f64) -> TrendStatus {
    if count < EMERGING_MAX_COUNT || growth_rate > EMERGING_MIN_GROWTH {
        TrendStatus::Emerging
    } else if count < PEAKING_MAX_COUNT {
        TrendStatus::Peaking
    } else {
        TrendStatus::Declining
    }
}
