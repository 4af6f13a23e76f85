use crate::models::AppConfig;
use crate::services::statistics::{build_consumption_statistic_id, build_cost_statistic_id};
use crate::services::CsvStatisticsStore;
use crate::utils::{get_config_path, get_statistics_dir};

pub fn run() {
    println!("📊 helensync status\n");

    match show_status() {
        Ok(()) => {}
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn show_status() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load(&get_config_path())?;

    if config.sites.is_empty() {
        println!("⚠️  No delivery sites configured. Run 'helensync login' first.");
        return Ok(());
    }

    let store = CsvStatisticsStore::new(get_statistics_dir());

    for site in &config.sites {
        println!("🔹 Delivery site {}", site.delivery_site_id);
        println!("   Backfill:      {} days ({})",
            site.backfill_days,
            if site.initial_backfill_done { "done" } else { "pending" }
        );
        println!("   Cost tracking: {}", if site.enable_cost { "enabled" } else { "disabled" });
        match site.last_fetched_date {
            Some(date) => println!("   Last fetched:  {}", date),
            None => println!("   Last fetched:  never"),
        }

        let consumption_id = build_consumption_statistic_id(&site.delivery_site_id);
        match store.series_summary(&consumption_id)? {
            Some(summary) => println!(
                "   Consumption:   {:>6} intervals, {:.3} kWh total (through {})",
                summary.record_count, summary.last_sum, summary.last_start
            ),
            None => println!("   Consumption:   no data imported yet"),
        }

        if site.enable_cost {
            let cost_id = build_cost_statistic_id(&site.delivery_site_id);
            match store.series_summary(&cost_id)? {
                Some(summary) => println!(
                    "   Cost:          {:>6} intervals, {:.2} EUR total",
                    summary.record_count, summary.last_sum
                ),
                None => println!("   Cost:          no data imported yet"),
            }
        }
        println!();
    }

    println!("💡 Statistics stored in {}", get_statistics_dir().display());
    Ok(())
}
