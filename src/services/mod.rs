pub mod fetch;
pub mod helen_api;
pub mod planner;
pub mod sink;
pub mod statistics;
pub mod sync;

pub use helen_api::{HelenApiClient, LoginResult, MeasurementSource, SessionAuth};
pub use planner::{plan_window, FetchWindow};
pub use sink::{CsvStatisticsStore, StatisticsSink};
pub use statistics::{build_statistics, StatisticsMeta};
pub use sync::SyncPipeline;
