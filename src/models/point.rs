use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observed metering interval from the Oma Helen API.
///
/// Produced by the fetch adapter, consumed by the statistics builder.
/// Sequences handed to the builder are sorted ascending by `start`.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalPoint {
    /// Interval boundary, normalized to UTC.
    pub start: DateTime<Utc>,
    /// Metered consumption for the interval, always non-negative.
    pub consumption_kwh: f64,
    /// Spot price in cents/kWh; `None` when the source has no price for the interval.
    pub spot_price_c_per_kwh: Option<f64>,
}

/// One entry of a cumulative statistic series.
///
/// `sum` is the running total up to and including this interval, relative to
/// the series' all-time origin. A new batch continues from the last committed
/// sum; it is never reset mid-series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticPoint {
    pub start: DateTime<Utc>,
    pub value: f64,
    pub sum: f64,
}

/// Final observations of a statistics build, returned even for empty input.
#[derive(Debug, Clone, PartialEq)]
pub struct LastValues {
    pub last_interval_start: Option<DateTime<Utc>>,
    pub last_spot_price_eur_per_kwh: Option<f64>,
    pub last_sum_kwh: f64,
    pub last_sum_cost: f64,
}
