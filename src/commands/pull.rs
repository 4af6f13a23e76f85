use crate::error::Error;
use crate::models::ConfigStore;
use crate::services::{CsvStatisticsStore, SyncPipeline};
use crate::utils::{get_config_path, get_statistics_dir};
use std::sync::Arc;

pub fn run() {
    match run_pull() {
        Ok(failed) if failed == 0 => {
            println!("\n✅ All sites imported successfully");
        }
        Ok(failed) => {
            eprintln!("\n❌ {} site(s) failed to import", failed);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_pull() -> Result<usize, Error> {
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
            println!("🔄 Importing delivery site {}...", site_id);
            let pipeline = SyncPipeline::new(
                store.clone(),
                site_id.clone(),
                CsvStatisticsStore::new(get_statistics_dir()),
            );

            match pipeline.run_cycle(false, None).await {
                Ok(summary) => match summary.last_imported_date {
                    Some(date) => {
                        println!("   ✅ Imported through {}", date);
                        if let Some(price) = summary.last_spot_price_eur_per_kwh {
                            println!("   💶 Last spot price: {:.4} EUR/kWh", price);
                        }
                    }
                    None => println!("   ✅ Already up to date"),
                },
                Err(e) if e.needs_reauth() => {
                    eprintln!("   ❌ Access token rejected: {}", e);
                    eprintln!("      Run 'helensync reauth' to log in again.");
                    failed += 1;
                }
                Err(e) => {
                    eprintln!("   ❌ Import failed: {}", e);
                    failed += 1;
                }
            }
        }

        Ok(failed)
    })
}
