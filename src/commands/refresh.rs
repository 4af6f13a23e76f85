use crate::error::Error;
use crate::models::ConfigStore;
use crate::services::{CsvStatisticsStore, SyncPipeline};
use crate::utils::{get_config_path, get_statistics_dir};
use chrono::NaiveDate;
use std::sync::Arc;

pub fn run(start_date: String, end_date: String) {
    // Validated before any configuration or network access.
    let (start, end) = match parse_range(&start_date, &end_date) {
        Ok(range) => range,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    match run_refresh(start, end) {
        Ok(failed) if failed == 0 => {
            println!("\n✅ Range {} to {} re-imported on all sites", start, end);
        }
        Ok(failed) => {
            eprintln!("\n❌ {} site(s) failed to refresh", failed);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Parse and validate an operator-supplied inclusive date range.
fn parse_range(start_date: &str, end_date: &str) -> Result<(NaiveDate, NaiveDate), Error> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d")
        .map_err(|_| Error::Validation(format!("invalid start date '{}'", start_date)))?;
    let end = NaiveDate::parse_from_str(end_date, "%Y-%m-%d")
        .map_err(|_| Error::Validation(format!("invalid end date '{}'", end_date)))?;
    if end < start {
        return Err(Error::Validation(format!(
            "end date {} is before start date {}",
            end, start
        )));
    }
    Ok((start, end))
}

fn run_refresh(start: NaiveDate, end: NaiveDate) -> Result<usize, Error> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Config(format!("Failed to create runtime: {}", e)))?;

    runtime.block_on(async {
        let store = Arc::new(ConfigStore::open(get_config_path())?);
        let site_ids = store.site_ids().await;

        if site_ids.is_empty() {
            println!("⚠️  No delivery sites configured. Run 'helensync login' first.");
            return Ok(0);
        }

        let mut failed = 0;
        for site_id in site_ids {
            println!("🔄 Refreshing {} to {} on delivery site {}...", start, end, site_id);
            let pipeline = SyncPipeline::new(
                store.clone(),
                site_id.clone(),
                CsvStatisticsStore::new(get_statistics_dir()),
            );

            match pipeline.refresh_range(start, end).await {
                Ok(_) => println!("   ✅ Range re-imported"),
                Err(e) => {
                    eprintln!("   ❌ Refresh failed: {}", e);
                    failed += 1;
                }
            }
        }

        Ok(failed)
    })
}
