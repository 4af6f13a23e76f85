use crate::error::{AppError, Result};
use crate::models::StatisticPoint;
use crate::services::statistics::StatisticsMeta;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Sink for cumulative statistic series.
///
/// Implementations must deduplicate by timestamp: rows already present win
/// unless `force_overwrite` is set, in which case incoming rows replace
/// same-timestamp rows. Both modes keep a repeated write of the same window
/// safe.
#[async_trait]
pub trait StatisticsSink: Send + Sync {
    async fn write(
        &self,
        meta: &StatisticsMeta,
        points: &[StatisticPoint],
        force_overwrite: bool,
    ) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SeriesIndexEntry {
    name: String,
    unit: String,
}

/// Summary of one stored series, for status reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSummary {
    pub record_count: usize,
    pub last_start: DateTime<Utc>,
    pub last_sum: f64,
}

/// File-backed statistics store: one CSV per series plus a metadata index.
///
/// Each series lives in `<sanitized id>.csv` with `start,value,sum` rows
/// sorted by timestamp; `series.json` maps statistic ids to display name and
/// unit.
pub struct CsvStatisticsStore {
    dir: PathBuf,
}

const INDEX_FILE: &str = "series.json";

impl CsvStatisticsStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn series_path(&self, statistic_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.csv", statistic_id.replace(':', "_")))
    }

    fn load_series(path: &Path) -> Result<BTreeMap<DateTime<Utc>, (f64, f64)>> {
        let mut rows = BTreeMap::new();
        if !path.exists() {
            return Ok(rows);
        }

        let mut reader = csv::Reader::from_path(path)?;
        for record in reader.records() {
            let record = record?;
            let start = record
                .get(0)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc))
                .ok_or_else(|| {
                    AppError::Parse(format!("invalid start timestamp in {}", path.display()))
                })?;
            let value: f64 = record
                .get(1)
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| AppError::Parse(format!("invalid value in {}", path.display())))?;
            let sum: f64 = record
                .get(2)
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| AppError::Parse(format!("invalid sum in {}", path.display())))?;
            rows.insert(start, (value, sum));
        }
        Ok(rows)
    }

    fn save_series(path: &Path, rows: &BTreeMap<DateTime<Utc>, (f64, f64)>) -> Result<()> {
        let tmp = path.with_extension("csv.tmp");
        let mut writer = csv::Writer::from_path(&tmp)?;
        writer.write_record(["start", "value", "sum"])?;
        for (start, (value, sum)) in rows {
            writer.write_record([
                start.to_rfc3339(),
                value.to_string(),
                sum.to_string(),
            ])?;
        }
        writer.flush().map_err(AppError::from)?;
        drop(writer);
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn update_index(&self, meta: &StatisticsMeta) -> Result<()> {
        let path = self.dir.join(INDEX_FILE);
        let mut index: BTreeMap<String, SeriesIndexEntry> = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            BTreeMap::new()
        };
        index.insert(
            meta.statistic_id.clone(),
            SeriesIndexEntry {
                name: meta.name.clone(),
                unit: meta.unit.clone(),
            },
        );
        fs::write(&path, serde_json::to_string_pretty(&index)?)?;
        Ok(())
    }

    fn write_inner(
        &self,
        meta: &StatisticsMeta,
        points: &[StatisticPoint],
        force_overwrite: bool,
    ) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let path = self.series_path(&meta.statistic_id);
        let mut rows = Self::load_series(&path)?;
        let existing = rows.len();

        for point in points {
            if force_overwrite {
                rows.insert(point.start, (point.value, point.sum));
            } else {
                rows.entry(point.start).or_insert((point.value, point.sum));
            }
        }

        Self::save_series(&path, &rows)?;
        self.update_index(meta)?;

        debug!(
            statistic_id = %meta.statistic_id,
            incoming = points.len(),
            existing,
            total = rows.len(),
            force_overwrite,
            "Wrote statistic series"
        );
        Ok(())
    }

    /// Record count and last cumulative value of a stored series, if any.
    pub fn series_summary(&self, statistic_id: &str) -> Result<Option<SeriesSummary>> {
        let rows = Self::load_series(&self.series_path(statistic_id))?;
        Ok(rows.iter().next_back().map(|(start, (_, sum))| SeriesSummary {
            record_count: rows.len(),
            last_start: *start,
            last_sum: *sum,
        }))
    }
}

#[async_trait]
impl StatisticsSink for CsvStatisticsStore {
    async fn write(
        &self,
        meta: &StatisticsMeta,
        points: &[StatisticPoint],
        force_overwrite: bool,
    ) -> Result<()> {
        self.write_inner(meta, points, force_overwrite)
            .map_err(|e| AppError::Write(format!("{}: {}", meta.statistic_id, e)))
    }
}
