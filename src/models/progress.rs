use chrono::{DateTime, NaiveDate, Utc};

/// Resume state of one delivery site's pipeline.
///
/// Owned by the sync pipeline: it is read at the start of a cycle and
/// committed back only after the statistics write has succeeded. Nothing else
/// mutates these fields.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProgressState {
    /// Last date (inclusive) whose data has been committed downstream.
    pub last_fetched_date: Option<NaiveDate>,
    /// Whether the one-time historical backfill has completed.
    pub initial_backfill_done: bool,
    /// Running consumption sum to resume from, in kWh.
    pub last_sum_kwh: f64,
    /// Running cost sum to resume from, in EUR.
    pub last_sum_cost: f64,
}

/// Transient summary of one sync cycle, for display only.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleSummary {
    pub last_imported_date: Option<NaiveDate>,
    pub last_interval_start: Option<DateTime<Utc>>,
    pub last_spot_price_eur_per_kwh: Option<f64>,
}

impl CycleSummary {
    /// Summary for a cycle that had nothing to do.
    pub fn unchanged(last_fetched_date: Option<NaiveDate>) -> Self {
        Self {
            last_imported_date: last_fetched_date,
            last_interval_start: None,
            last_spot_price_eur_per_kwh: None,
        }
    }
}
