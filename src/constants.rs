//! Project-wide constants.

/// Source tag used to derive statistic ids (`oma_helen:<site>:consumption`).
pub const STATS_SOURCE: &str = "oma_helen";

/// Base URL of the Oma Helen API.
pub const API_BASE_URL: &str = "https://api.omahelen.fi/v2";

/// Resolution requested from the measurement endpoint.
///
/// Readings arrive as quarter-hour intervals; daily or hourly resolutions
/// exist on the API but the import pipeline always works at this granularity.
pub const MEASUREMENT_RESOLUTION: &str = "quarter_hour";

/// Days of history fetched on the initial backfill when not configured.
pub const DEFAULT_BACKFILL_DAYS: u32 = 7;

/// Currency unit of the cost statistic series.
pub const CURRENCY: &str = "EUR";

/// Seconds between sync cycles in watch mode.
///
/// The source publishes daily-resolution batches, so anything more eager
/// than a few hours only re-plans empty windows.
pub const WATCH_INTERVAL_SECS: u64 = 6 * 60 * 60;

/// HTTP request timeout for the Oma Helen API.
pub const HTTP_TIMEOUT_SECS: u64 = 60;
