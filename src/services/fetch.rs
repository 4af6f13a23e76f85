use crate::constants::MEASUREMENT_RESOLUTION;
use crate::error::{AppError, Result};
use crate::models::IntervalPoint;
use crate::services::helen_api::{MeasurementResponse, MeasurementSource};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

/// Parse one raw interval timestamp into UTC.
///
/// RFC 3339 offsets (including a trailing `Z`) are converted to UTC;
/// timezone-naive timestamps are taken as already UTC.
fn parse_interval_start(raw: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| AppError::Fetch(format!("invalid interval start '{}': {}", trimmed, e)))
}

/// Normalize a raw measurement response into interval points.
///
/// Entries without a consumption reading are dropped (no data, not zero).
/// Consumption signs follow the source's export convention, so the absolute
/// value is taken. The VAT-inclusive spot price is preferred over the
/// VAT-exclusive one when both exist. Output is sorted ascending by start.
pub fn points_from_response(response: &MeasurementResponse) -> Result<Vec<IntervalPoint>> {
    let mut points = Vec::with_capacity(response.series.len());

    for entry in &response.series {
        let Some(consumption) = entry.electricity else {
            continue;
        };
        let spot_price_c_per_kwh = entry
            .electricity_spot_prices_vat
            .or(entry.electricity_spot_prices);

        points.push(IntervalPoint {
            start: parse_interval_start(&entry.start)?,
            consumption_kwh: consumption.abs(),
            spot_price_c_per_kwh,
        });
    }

    points.sort_by_key(|p| p.start);
    Ok(points)
}

/// Fetch and normalize interval points for an inclusive date range.
pub async fn fetch_points<M: MeasurementSource + Sync>(
    client: &M,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<IntervalPoint>> {
    let response = client
        .measurements_with_spot_prices(start, end, MEASUREMENT_RESOLUTION)
        .await?;
    let points = points_from_response(&response)?;
    debug!(%start, %end, raw = response.series.len(), points = points.len(), "Fetched interval points");
    Ok(points)
}
