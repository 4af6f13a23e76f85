use crate::constants::{API_BASE_URL, HTTP_TIMEOUT_SECS};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Result of a fresh credential login.
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub access_token: String,
    pub delivery_site_ids: Vec<String>,
}

/// How an API session is established.
///
/// Either a fresh credential login or resumption with a previously issued
/// token; there is no third path that pokes a token into client internals.
#[derive(Debug, Clone)]
pub enum SessionAuth {
    Credentials { username: String, password: String },
    Token(String),
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct DeliverySitesResponse {
    #[serde(default)]
    delivery_site_ids: Vec<String>,
}

/// One raw interval record from the measurements endpoint.
///
/// `null`/absent fields mean "no data for this interval", not zero. Two
/// spot-price variants may be present: with and without VAT.
#[derive(Debug, Clone, Deserialize)]
pub struct SeriesEntry {
    pub start: String,
    #[serde(default)]
    pub electricity: Option<f64>,
    #[serde(default)]
    pub electricity_spot_prices: Option<f64>,
    #[serde(default)]
    pub electricity_spot_prices_vat: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeasurementResponse {
    #[serde(default)]
    pub series: Vec<SeriesEntry>,
}

/// Source of raw interval readings for a date range.
#[async_trait]
pub trait MeasurementSource {
    async fn measurements_with_spot_prices(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        resolution: &str,
    ) -> Result<MeasurementResponse>;
}

/// Client for the Oma Helen API.
pub struct HelenApiClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    delivery_site_id: Option<String>,
}

impl HelenApiClient {
    /// Build an authenticated client.
    ///
    /// `SessionAuth::Token` resumes with a stored token without contacting
    /// the login endpoint; the token is only exercised (and rejected) on the
    /// first authenticated call.
    pub async fn connect(auth: SessionAuth) -> Result<Self> {
        let client = build_http_client()?;
        let access_token = match auth {
            SessionAuth::Token(token) => token,
            SessionAuth::Credentials { username, password } => {
                login_request(&client, API_BASE_URL, &username, &password).await?
            }
        };

        Ok(Self {
            client,
            base_url: API_BASE_URL.to_string(),
            access_token,
            delivery_site_id: None,
        })
    }

    /// Log in with credentials and list the account's delivery sites.
    pub async fn login(username: &str, password: &str) -> Result<LoginResult> {
        let api = Self::connect(SessionAuth::Credentials {
            username: username.to_string(),
            password: password.to_string(),
        })
        .await?;
        let delivery_site_ids = api.delivery_site_ids().await?;
        info!(sites = delivery_site_ids.len(), "Login succeeded");

        Ok(LoginResult {
            access_token: api.access_token,
            delivery_site_ids,
        })
    }

    /// List the delivery site ids available to this account.
    pub async fn delivery_site_ids(&self) -> Result<Vec<String>> {
        let url = format!("{}/delivery-sites", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| AppError::Fetch(format!("delivery site request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AppError::Auth(format!(
                "access token rejected by delivery site endpoint ({})",
                status
            )));
        }
        if !status.is_success() {
            return Err(AppError::Fetch(format!(
                "delivery site endpoint returned {}",
                status
            )));
        }

        let parsed: DeliverySitesResponse = response
            .json()
            .await
            .map_err(|e| AppError::Fetch(format!("invalid delivery site response: {}", e)))?;
        Ok(parsed.delivery_site_ids)
    }

    /// Select the delivery site all further measurement calls are scoped to.
    ///
    /// The id is validated against the account's site list; an id that no
    /// longer resolves is a distinct `Site` error so the operator knows the
    /// configuration, not the network, is at fault.
    pub async fn select_delivery_site(&mut self, site_id: &str) -> Result<()> {
        let available = self.delivery_site_ids().await?;
        if !available.iter().any(|s| s == site_id) {
            return Err(AppError::Site(format!(
                "delivery site {} is not available on this account",
                site_id
            )));
        }
        self.delivery_site_id = Some(site_id.to_string());
        Ok(())
    }

    /// Fetch raw interval readings with spot prices for an inclusive date range.
    pub async fn get_measurements_with_spot_prices(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        resolution: &str,
    ) -> Result<MeasurementResponse> {
        let site_id = self
            .delivery_site_id
            .as_deref()
            .ok_or_else(|| AppError::Site("no delivery site selected".to_string()))?;

        let url = format!("{}/measurements/electricity-spot", self.base_url);
        debug!(%start, %end, resolution, site_id, "Requesting measurements");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("delivery_site_id", site_id),
                ("begin", &start.to_string()),
                ("end", &end.to_string()),
                ("resolution", resolution),
            ])
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| AppError::Fetch(format!("measurement request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AppError::Auth(format!(
                "access token rejected by measurement endpoint ({})",
                status
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Fetch(format!(
                "measurement endpoint returned {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Fetch(format!("invalid measurement response: {}", e)))
    }
}

#[async_trait]
impl MeasurementSource for HelenApiClient {
    async fn measurements_with_spot_prices(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        resolution: &str,
    ) -> Result<MeasurementResponse> {
        self.get_measurements_with_spot_prices(start, end, resolution)
            .await
    }
}

fn build_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .map_err(|e| AppError::Fetch(format!("failed to create HTTP client: {}", e)))
}

async fn login_request(
    client: &reqwest::Client,
    base_url: &str,
    username: &str,
    password: &str,
) -> Result<String> {
    let url = format!("{}/login", base_url);
    let response = client
        .post(&url)
        .json(&serde_json::json!({
            "username": username,
            "password": password,
        }))
        .send()
        .await
        .map_err(|e| AppError::Fetch(format!("login request failed: {}", e)))?;

    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(AppError::Auth("invalid username or password".to_string()));
    }
    if !status.is_success() {
        return Err(AppError::Fetch(format!("login endpoint returned {}", status)));
    }

    let parsed: LoginResponse = response
        .json()
        .await
        .map_err(|e| AppError::Fetch(format!("invalid login response: {}", e)))?;
    Ok(parsed.access_token)
}
