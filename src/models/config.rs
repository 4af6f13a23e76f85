use crate::constants::DEFAULT_BACKFILL_DAYS;
use crate::error::{AppError, Result};
use crate::models::ProgressState;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

fn default_backfill_days() -> u32 {
    DEFAULT_BACKFILL_DAYS
}

/// Persisted configuration and resume state of one delivery site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub access_token: String,
    pub delivery_site_id: String,

    #[serde(default = "default_backfill_days")]
    pub backfill_days: u32,

    /// Whether to build the cost series next to the consumption series.
    #[serde(default)]
    pub enable_cost: bool,

    #[serde(default)]
    pub last_fetched_date: Option<NaiveDate>,

    #[serde(default)]
    pub initial_backfill_done: bool,

    #[serde(default)]
    pub last_sum_kwh: f64,

    #[serde(default)]
    pub last_sum_cost: f64,
}

impl SiteConfig {
    pub fn new(
        access_token: String,
        delivery_site_id: String,
        backfill_days: u32,
        enable_cost: bool,
    ) -> Self {
        Self {
            access_token,
            delivery_site_id,
            backfill_days,
            enable_cost,
            last_fetched_date: None,
            initial_backfill_done: false,
            last_sum_kwh: 0.0,
            last_sum_cost: 0.0,
        }
    }

    /// Resume-state projection handed to the sync pipeline.
    pub fn progress(&self) -> ProgressState {
        ProgressState {
            last_fetched_date: self.last_fetched_date,
            initial_backfill_done: self.initial_backfill_done,
            last_sum_kwh: self.last_sum_kwh,
            last_sum_cost: self.last_sum_cost,
        }
    }

    pub fn apply_progress(&mut self, progress: ProgressState) {
        self.last_fetched_date = progress.last_fetched_date;
        self.initial_backfill_done = progress.initial_backfill_done;
        self.last_sum_kwh = progress.last_sum_kwh;
        self.last_sum_cost = progress.last_sum_cost;
    }
}

/// Root of the configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub sites: Vec<SiteConfig>,
}

impl AppConfig {
    /// Load configuration from a JSON file; a missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| AppError::Config(format!("invalid config file {}: {}", path.display(), e)))
    }

    /// Save configuration atomically (write to a temp file, then rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(format!("cannot serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn site(&self, site_id: &str) -> Option<&SiteConfig> {
        self.sites.iter().find(|s| s.delivery_site_id == site_id)
    }

    pub fn site_mut(&mut self, site_id: &str) -> Option<&mut SiteConfig> {
        self.sites.iter_mut().find(|s| s.delivery_site_id == site_id)
    }
}

/// Shared handle on the configuration file.
///
/// Site pipelines run concurrently in watch mode; the mutex serializes their
/// progress commits so the file is never written from two tasks at once.
pub struct ConfigStore {
    path: PathBuf,
    inner: Mutex<AppConfig>,
}

impl ConfigStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        let config = AppConfig::load(&path)?;
        Ok(Self {
            path,
            inner: Mutex::new(config),
        })
    }

    pub async fn site_ids(&self) -> Vec<String> {
        let config = self.inner.lock().await;
        config
            .sites
            .iter()
            .map(|s| s.delivery_site_id.clone())
            .collect()
    }

    pub async fn site(&self, site_id: &str) -> Result<SiteConfig> {
        let config = self.inner.lock().await;
        config
            .site(site_id)
            .cloned()
            .ok_or_else(|| AppError::Config(format!("delivery site {} is not configured", site_id)))
    }

    /// Add a new site entry. Refuses duplicates; `reauth` replaces tokens.
    pub async fn add_site(&self, site: SiteConfig) -> Result<()> {
        let mut config = self.inner.lock().await;
        if config.site(&site.delivery_site_id).is_some() {
            return Err(AppError::Config(format!(
                "delivery site {} is already configured",
                site.delivery_site_id
            )));
        }
        config.sites.push(site);
        config.save(&self.path)
    }

    /// Replace only the stored access token, keeping progress state intact.
    pub async fn replace_token(&self, site_id: &str, access_token: String) -> Result<()> {
        let mut config = self.inner.lock().await;
        let site = config
            .site_mut(site_id)
            .ok_or_else(|| AppError::Config(format!("delivery site {} is not configured", site_id)))?;
        site.access_token = access_token;
        config.save(&self.path)
    }

    /// Commit new resume state for a site.
    ///
    /// This is the only mutation path for progress fields and is called
    /// strictly after the statistics write has been confirmed.
    pub async fn commit_progress(&self, site_id: &str, progress: ProgressState) -> Result<()> {
        let mut config = self.inner.lock().await;
        let site = config
            .site_mut(site_id)
            .ok_or_else(|| AppError::Config(format!("delivery site {} is not configured", site_id)))?;
        site.apply_progress(progress);
        config.save(&self.path)?;
        debug!(
            site_id,
            last_fetched_date = ?progress.last_fetched_date,
            "Committed progress state"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_site() -> SiteConfig {
        SiteConfig::new("token-1".to_string(), "100200".to_string(), 14, true)
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("helensync.json")).unwrap();
        assert!(config.sites.is_empty());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("helensync.json");

        let mut config = AppConfig::default();
        let mut site = sample_site();
        site.last_fetched_date = NaiveDate::from_ymd_opt(2024, 2, 3);
        site.initial_backfill_done = true;
        site.last_sum_kwh = 123.5;
        config.sites.push(site);
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.sites.len(), 1);
        let site = loaded.site("100200").unwrap();
        assert_eq!(site.backfill_days, 14);
        assert!(site.enable_cost);
        assert_eq!(site.last_fetched_date, NaiveDate::from_ymd_opt(2024, 2, 3));
        assert!(site.initial_backfill_done);
        assert_eq!(site.last_sum_kwh, 123.5);
        assert_eq!(site.last_sum_cost, 0.0);
    }

    #[test]
    fn test_optional_fields_default() {
        let json = r#"{"sites":[{"access_token":"t","delivery_site_id":"1"}]}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        let site = config.site("1").unwrap();
        assert_eq!(site.backfill_days, DEFAULT_BACKFILL_DAYS);
        assert!(!site.enable_cost);
        assert!(site.last_fetched_date.is_none());
        assert!(!site.initial_backfill_done);
        assert_eq!(site.last_sum_kwh, 0.0);
    }

    #[tokio::test]
    async fn test_commit_progress_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("helensync.json");

        let mut config = AppConfig::default();
        config.sites.push(sample_site());
        config.save(&path).unwrap();

        let store = ConfigStore::open(path.clone()).unwrap();
        let progress = ProgressState {
            last_fetched_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            initial_backfill_done: true,
            last_sum_kwh: 42.0,
            last_sum_cost: 8.4,
        };
        store.commit_progress("100200", progress).await.unwrap();

        let reloaded = AppConfig::load(&path).unwrap();
        assert_eq!(reloaded.site("100200").unwrap().progress(), progress);
    }

    #[tokio::test]
    async fn test_replace_token_keeps_progress() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("helensync.json");

        let mut site = sample_site();
        site.initial_backfill_done = true;
        site.last_sum_kwh = 10.0;
        let mut config = AppConfig::default();
        config.sites.push(site);
        config.save(&path).unwrap();

        let store = ConfigStore::open(path.clone()).unwrap();
        store
            .replace_token("100200", "token-2".to_string())
            .await
            .unwrap();

        let reloaded = AppConfig::load(&path).unwrap();
        let site = reloaded.site("100200").unwrap();
        assert_eq!(site.access_token, "token-2");
        assert!(site.initial_backfill_done);
        assert_eq!(site.last_sum_kwh, 10.0);
    }

    #[tokio::test]
    async fn test_add_site_rejects_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::open(dir.path().join("helensync.json")).unwrap();
        store.add_site(sample_site()).await.unwrap();
        let err = store.add_site(sample_site()).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
