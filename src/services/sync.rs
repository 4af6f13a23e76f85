use crate::error::Result;
use crate::models::{ConfigStore, CycleSummary, ProgressState, SiteConfig};
use crate::services::fetch;
use crate::services::helen_api::{HelenApiClient, MeasurementSource, SessionAuth};
use crate::services::planner::{plan_window, FetchWindow};
use crate::services::sink::StatisticsSink;
use crate::services::statistics::{build_statistics, consumption_metadata, cost_metadata};
use crate::utils::today_local;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fetch-and-aggregate pipeline for one delivery site.
///
/// A cycle either runs to completion, committing progress after the
/// statistics write, or fails leaving the persisted progress state
/// untouched so the next cycle retries the same window.
pub struct SyncPipeline<S: StatisticsSink> {
    store: Arc<ConfigStore>,
    site_id: String,
    sink: S,
}

impl<S: StatisticsSink> SyncPipeline<S> {
    pub fn new(store: Arc<ConfigStore>, site_id: String, sink: S) -> Self {
        Self {
            store,
            site_id,
            sink,
        }
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    /// Run one sync cycle.
    ///
    /// With `explicit_range` the operator picked the window; otherwise it is
    /// planned from the persisted progress state. An empty planned window
    /// returns immediately without building a client.
    pub async fn run_cycle(
        &self,
        force_overwrite: bool,
        explicit_range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<CycleSummary> {
        let site = self.store.site(&self.site_id).await?;

        let window = match explicit_range {
            Some((start, end)) => Some(FetchWindow { start, end }),
            None => plan_window(
                site.initial_backfill_done,
                site.backfill_days,
                site.last_fetched_date,
                today_local(),
            ),
        };

        let Some(window) = window else {
            debug!(site_id = %self.site_id, "Already caught up, nothing to fetch");
            return Ok(CycleSummary::unchanged(site.last_fetched_date));
        };

        let mut client =
            HelenApiClient::connect(SessionAuth::Token(site.access_token.clone())).await?;
        client.select_delivery_site(&site.delivery_site_id).await?;

        self.execute_window(&client, &site, window, force_overwrite)
            .await
    }

    /// Operator-triggered re-import of an already-fetched range.
    pub async fn refresh_range(&self, start: NaiveDate, end: NaiveDate) -> Result<CycleSummary> {
        self.run_cycle(true, Some((start, end))).await
    }

    async fn execute_window<M: MeasurementSource + Sync>(
        &self,
        client: &M,
        site: &SiteConfig,
        window: FetchWindow,
        force_overwrite: bool,
    ) -> Result<CycleSummary> {
        let points = fetch::fetch_points(client, window.start, window.end).await?;

        if points.is_empty() {
            // Short gaps in source data are expected; advance past the window
            // so it is not re-planned every cycle, but leave the sums alone.
            warn!(
                site_id = %self.site_id,
                start = %window.start,
                end = %window.end,
                "No measurement points returned for window"
            );
            let progress = ProgressState {
                last_fetched_date: Some(window.end),
                initial_backfill_done: true,
                last_sum_kwh: site.last_sum_kwh,
                last_sum_cost: site.last_sum_cost,
            };
            self.store.commit_progress(&self.site_id, progress).await?;
            return Ok(CycleSummary {
                last_imported_date: Some(window.end),
                last_interval_start: None,
                last_spot_price_eur_per_kwh: None,
            });
        }

        let (consumption, cost, last_values) = build_statistics(
            &points,
            site.last_sum_kwh,
            site.last_sum_cost,
            site.enable_cost,
        );

        self.sink
            .write(
                &consumption_metadata(&site.delivery_site_id),
                &consumption,
                force_overwrite,
            )
            .await?;
        if let Some(cost_points) = &cost {
            self.sink
                .write(
                    &cost_metadata(&site.delivery_site_id),
                    cost_points,
                    force_overwrite,
                )
                .await?;
        }

        // Progress advances only past this point: a failed write above has
        // left the stored state exactly as it was, so the next cycle
        // recomputes the same window instead of skipping it.
        let progress = ProgressState {
            last_fetched_date: Some(window.end),
            initial_backfill_done: true,
            last_sum_kwh: last_values.last_sum_kwh,
            last_sum_cost: last_values.last_sum_cost,
        };
        self.store.commit_progress(&self.site_id, progress).await?;

        info!(
            site_id = %self.site_id,
            start = %window.start,
            end = %window.end,
            points = points.len(),
            sum_kwh = last_values.last_sum_kwh,
            "Sync cycle completed"
        );

        Ok(CycleSummary {
            last_imported_date: Some(window.end),
            last_interval_start: last_values.last_interval_start,
            last_spot_price_eur_per_kwh: last_values.last_spot_price_eur_per_kwh,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{AppConfig, StatisticPoint};
    use crate::services::helen_api::{MeasurementResponse, SeriesEntry};
    use crate::services::statistics::StatisticsMeta;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::Mutex;

    struct FakeSource {
        series: Vec<SeriesEntry>,
    }

    #[async_trait]
    impl MeasurementSource for FakeSource {
        async fn measurements_with_spot_prices(
            &self,
            _start: NaiveDate,
            _end: NaiveDate,
            _resolution: &str,
        ) -> Result<MeasurementResponse> {
            Ok(MeasurementResponse {
                series: self.series.clone(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        writes: Mutex<Vec<(StatisticsMeta, Vec<StatisticPoint>, bool)>>,
    }

    #[async_trait]
    impl StatisticsSink for RecordingSink {
        async fn write(
            &self,
            meta: &StatisticsMeta,
            points: &[StatisticPoint],
            force_overwrite: bool,
        ) -> Result<()> {
            self.writes
                .lock()
                .unwrap()
                .push((meta.clone(), points.to_vec(), force_overwrite));
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl StatisticsSink for FailingSink {
        async fn write(
            &self,
            _meta: &StatisticsMeta,
            _points: &[StatisticPoint],
            _force_overwrite: bool,
        ) -> Result<()> {
            Err(AppError::Write("sink unavailable".to_string()))
        }
    }

    fn entry(start: &str, kwh: f64, spot_vat: Option<f64>) -> SeriesEntry {
        SeriesEntry {
            start: start.to_string(),
            electricity: Some(kwh),
            electricity_spot_prices: None,
            electricity_spot_prices_vat: spot_vat,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn store_with_site(
        dir: &tempfile::TempDir,
        mutate: impl FnOnce(&mut SiteConfig),
    ) -> Arc<ConfigStore> {
        let path = dir.path().join("helensync.json");
        let mut site = SiteConfig::new("token".to_string(), "100200".to_string(), 7, true);
        mutate(&mut site);
        let mut config = AppConfig::default();
        config.sites.push(site);
        config.save(&path).unwrap();
        Arc::new(ConfigStore::open(path).unwrap())
    }

    fn window(start: NaiveDate, end: NaiveDate) -> FetchWindow {
        FetchWindow { start, end }
    }

    #[tokio::test]
    async fn test_successful_cycle_writes_then_commits() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_site(&dir, |s| {
            s.last_sum_kwh = 100.0;
            s.last_sum_cost = 20.0;
        })
        .await;

        let pipeline = SyncPipeline::new(store.clone(), "100200".to_string(), RecordingSink::default());
        let source = FakeSource {
            series: vec![entry("2024-01-01T00:00:00Z", 2.5, Some(8.0))],
        };
        let site = store.site("100200").await.unwrap();

        let summary = pipeline
            .execute_window(&source, &site, window(date(2024, 1, 1), date(2024, 1, 1)), false)
            .await
            .unwrap();

        assert_eq!(summary.last_imported_date, Some(date(2024, 1, 1)));
        assert!((summary.last_spot_price_eur_per_kwh.unwrap() - 0.08).abs() < 1e-9);

        let writes = pipeline.sink.writes.lock().unwrap();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].0.statistic_id, "oma_helen:100200:consumption");
        assert!((writes[0].1[0].sum - 102.5).abs() < 1e-9);
        assert_eq!(writes[1].0.statistic_id, "oma_helen:100200:cost");
        assert!((writes[1].1[0].sum - 20.2).abs() < 1e-9);
        assert!(!writes[0].2);
        drop(writes);

        let committed = store.site("100200").await.unwrap();
        assert_eq!(committed.last_fetched_date, Some(date(2024, 1, 1)));
        assert!(committed.initial_backfill_done);
        assert!((committed.last_sum_kwh - 102.5).abs() < 1e-9);
        assert!((committed.last_sum_cost - 20.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_progress_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_site(&dir, |s| {
            s.last_fetched_date = Some(date(2024, 1, 31));
            s.initial_backfill_done = true;
            s.last_sum_kwh = 55.5;
            s.last_sum_cost = 7.7;
        })
        .await;

        let before = store.site("100200").await.unwrap().progress();
        let pipeline = SyncPipeline::new(store.clone(), "100200".to_string(), FailingSink);
        let source = FakeSource {
            series: vec![entry("2024-02-01T00:00:00Z", 1.0, None)],
        };
        let site = store.site("100200").await.unwrap();

        let err = pipeline
            .execute_window(&source, &site, window(date(2024, 2, 1), date(2024, 2, 1)), false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Write(_)));

        let after = store.site("100200").await.unwrap().progress();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_empty_fetch_advances_date_without_touching_sums() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_site(&dir, |s| {
            s.last_fetched_date = Some(date(2024, 1, 31));
            s.initial_backfill_done = true;
            s.last_sum_kwh = 55.5;
            s.last_sum_cost = 7.7;
        })
        .await;

        let pipeline = SyncPipeline::new(store.clone(), "100200".to_string(), RecordingSink::default());
        let source = FakeSource { series: vec![] };
        let site = store.site("100200").await.unwrap();

        let summary = pipeline
            .execute_window(&source, &site, window(date(2024, 2, 1), date(2024, 2, 3)), false)
            .await
            .unwrap();

        assert_eq!(summary.last_imported_date, Some(date(2024, 2, 3)));
        assert_eq!(summary.last_interval_start, None);
        assert!(pipeline.sink.writes.lock().unwrap().is_empty());

        let committed = store.site("100200").await.unwrap();
        assert_eq!(committed.last_fetched_date, Some(date(2024, 2, 3)));
        assert_eq!(committed.last_sum_kwh, 55.5);
        assert_eq!(committed.last_sum_cost, 7.7);
    }

    #[tokio::test]
    async fn test_caught_up_cycle_returns_unchanged_summary() {
        let dir = tempfile::tempdir().unwrap();
        let yesterday = today_local() - Duration::days(1);
        let store = store_with_site(&dir, |s| {
            s.last_fetched_date = Some(yesterday);
            s.initial_backfill_done = true;
        })
        .await;

        let pipeline = SyncPipeline::new(store, "100200".to_string(), RecordingSink::default());
        let summary = pipeline.run_cycle(false, None).await.unwrap();

        assert_eq!(summary, CycleSummary::unchanged(Some(yesterday)));
        assert!(pipeline.sink.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cost_disabled_writes_single_series() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_site(&dir, |s| s.enable_cost = false).await;

        let pipeline = SyncPipeline::new(store.clone(), "100200".to_string(), RecordingSink::default());
        let source = FakeSource {
            series: vec![entry("2024-01-01T00:00:00Z", 1.0, Some(5.0))],
        };
        let site = store.site("100200").await.unwrap();

        pipeline
            .execute_window(&source, &site, window(date(2024, 1, 1), date(2024, 1, 1)), true)
            .await
            .unwrap();

        let writes = pipeline.sink.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0.statistic_id, "oma_helen:100200:consumption");
        assert!(writes[0].2);
    }
}
