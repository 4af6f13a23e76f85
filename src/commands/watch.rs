use crate::error::Error;
use crate::models::ConfigStore;
use crate::services::{CsvStatisticsStore, SyncPipeline};
use crate::utils::{get_config_path, get_statistics_dir};
use crate::worker;
use std::sync::Arc;
use std::time::Duration;

pub fn run(interval_secs: u64) {
    println!("🚀 Starting helensync watch (cycle every {}s)", interval_secs);

    match run_watch(interval_secs) {
        Ok(()) => println!("\n👋 Shutting down"),
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_watch(interval_secs: u64) -> Result<(), Error> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Config(format!("Failed to create runtime: {}", e)))?;

    runtime.block_on(async {
        let store = Arc::new(ConfigStore::open(get_config_path())?);
        let site_ids = store.site_ids().await;

        if site_ids.is_empty() {
            println!("⚠️  No delivery sites configured. Run 'helensync login' first.");
            return Ok(());
        }

        // One worker per site; sites run independently of each other while
        // each worker keeps its own cycles strictly sequential.
        for site_id in site_ids {
            println!("⚙️  Spawning sync worker for delivery site {}...", site_id);
            let pipeline = SyncPipeline::new(
                store.clone(),
                site_id,
                CsvStatisticsStore::new(get_statistics_dir()),
            );
            tokio::spawn(worker::run_sync_worker(
                pipeline,
                Duration::from_secs(interval_secs),
            ));
        }

        tokio::signal::ctrl_c()
            .await
            .map_err(|e| Error::Io(e.to_string()))?;
        Ok(())
    })
}
