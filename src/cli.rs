use clap::{Parser, Subcommand};

use crate::commands;
use crate::constants::{DEFAULT_BACKFILL_DAYS, WATCH_INTERVAL_SECS};

#[derive(Parser)]
#[command(name = "helensync")]
#[command(about = "Oma Helen consumption and spot price importer", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and configure a delivery site
    Login {
        #[arg(short, long)]
        username: String,
        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
        /// Delivery site id (auto-selected or prompted when omitted)
        #[arg(long)]
        site: Option<String>,
        /// Days of history fetched on the initial backfill
        #[arg(long, default_value_t = DEFAULT_BACKFILL_DAYS)]
        backfill_days: u32,
        /// Also build a cost series from spot prices
        #[arg(long)]
        enable_cost: bool,
    },
    /// Replace the stored access token for a configured site
    Reauth {
        #[arg(short, long)]
        username: String,
        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
        /// Delivery site id (required when several are configured)
        #[arg(long)]
        site: Option<String>,
    },
    /// Run one sync cycle for every configured site
    Pull,
    /// Force re-import of a date range on every configured site
    Refresh {
        /// Start date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        start_date: String,
        /// End date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        end_date: String,
    },
    /// Show configured sites and import progress
    Status,
    /// Run periodic sync workers until interrupted
    Watch {
        /// Seconds between sync cycles
        #[arg(long, default_value_t = WATCH_INTERVAL_SECS)]
        interval_secs: u64,
    },
}

pub fn run() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Login {
            username,
            password,
            site,
            backfill_days,
            enable_cost,
        } => {
            commands::login::run(username, password, site, backfill_days, enable_cost);
        }
        Commands::Reauth {
            username,
            password,
            site,
        } => {
            commands::reauth::run(username, password, site);
        }
        Commands::Pull => {
            commands::pull::run();
        }
        Commands::Refresh {
            start_date,
            end_date,
        } => {
            commands::refresh::run(start_date, end_date);
        }
        Commands::Status => {
            commands::status::run();
        }
        Commands::Watch { interval_secs } => {
            commands::watch::run(interval_secs);
        }
    }
}
