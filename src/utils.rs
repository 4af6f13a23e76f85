use chrono::{Local, NaiveDate};
use std::path::PathBuf;

/// Get the configuration file path from environment variable or use default
pub fn get_config_path() -> PathBuf {
    std::env::var("HELENSYNC_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("helensync.json"))
}

/// Get the statistics store directory from environment variable or use default
pub fn get_statistics_dir() -> PathBuf {
    std::env::var("HELENSYNC_STATISTICS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("statistics"))
}

/// Today's date in the account's local calendar.
///
/// Window planning is anchored here rather than at UTC so that "yesterday"
/// matches the day boundary the metering account reports against.
pub fn today_local() -> NaiveDate {
    Local::now().date_naive()
}
