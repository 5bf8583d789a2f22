// Day-over-day trend model
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increase,
    Decrease,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Trend {
    pub magnitude_percent: u32,
    pub direction: TrendDirection,
}

impl Trend {
    pub fn new(magnitude_percent: u32, direction: TrendDirection) -> Self {
        Self {
            magnitude_percent,
            direction,
        }
    }

    /// Neutral trend shown before data arrives or when a view fails.
    pub fn unchanged() -> Self {
        Self::new(0, TrendDirection::Unchanged)
    }
}

impl Default for Trend {
    fn default() -> Self {
        Self::unchanged()
    }
}

/// Percentage change of `current` against `previous`.
///
/// A zero baseline reports a full 100% increase instead of dividing by zero.
pub fn compute_trend(current: f64, previous: f64) -> Trend {
    if previous == 0.0 {
        return Trend::new(100, TrendDirection::Increase);
    }

    let diff = (current - previous) / previous * 100.0;
    let magnitude = diff.abs().round() as u32;

    let direction = if current > previous {
        TrendDirection::Increase
    } else if current < previous {
        TrendDirection::Decrease
    } else {
        TrendDirection::Unchanged
    };

    Trend::new(magnitude, direction)
}
