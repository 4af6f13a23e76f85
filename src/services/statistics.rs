use crate::constants::{CURRENCY, STATS_SOURCE};
use crate::models::{IntervalPoint, LastValues, StatisticPoint};
use tracing::debug;

/// Metadata of one statistic series in the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatisticsMeta {
    pub statistic_id: String,
    pub unit: String,
    pub name: String,
}

pub fn build_consumption_statistic_id(delivery_site_id: &str) -> String {
    format!("{}:{}:consumption", STATS_SOURCE, delivery_site_id)
}

pub fn build_cost_statistic_id(delivery_site_id: &str) -> String {
    format!("{}:{}:cost", STATS_SOURCE, delivery_site_id)
}

pub fn consumption_metadata(delivery_site_id: &str) -> StatisticsMeta {
    StatisticsMeta {
        statistic_id: build_consumption_statistic_id(delivery_site_id),
        unit: "kWh".to_string(),
        name: "Oma Helen consumption".to_string(),
    }
}

pub fn cost_metadata(delivery_site_id: &str) -> StatisticsMeta {
    StatisticsMeta {
        statistic_id: build_cost_statistic_id(delivery_site_id),
        unit: CURRENCY.to_string(),
        name: "Oma Helen cost".to_string(),
    }
}

fn spot_to_eur_per_kwh(spot_price_c_per_kwh: Option<f64>) -> Option<f64> {
    spot_price_c_per_kwh.map(|c| c / 100.0)
}

/// Turn ordered interval points into cumulative statistic series.
///
/// Pure function: the prior running sums come in as parameters and the new
/// ones go out in `LastValues`, which is what makes a cycle resumable and
/// repeatable. Points lacking a spot price still feed the consumption series
/// but are skipped in the cost series, whose sum they leave untouched. The
/// cost series is `Some` exactly when `include_cost` is set, even if empty.
pub fn build_statistics(
    points: &[IntervalPoint],
    last_sum_kwh: f64,
    last_sum_cost: f64,
    include_cost: bool,
) -> (Vec<StatisticPoint>, Option<Vec<StatisticPoint>>, LastValues) {
    let mut consumption = Vec::with_capacity(points.len());
    let mut cost: Option<Vec<StatisticPoint>> = include_cost.then(Vec::new);

    let mut sum_kwh = last_sum_kwh;
    let mut sum_cost = last_sum_cost;
    let mut last_price_eur_per_kwh = None;
    let mut last_interval_start = None;

    for point in points {
        sum_kwh += point.consumption_kwh;
        consumption.push(StatisticPoint {
            start: point.start,
            value: point.consumption_kwh,
            sum: sum_kwh,
        });

        let price = spot_to_eur_per_kwh(point.spot_price_c_per_kwh);
        if price.is_some() {
            last_price_eur_per_kwh = price;
        }

        if let (Some(series), Some(price)) = (cost.as_mut(), price) {
            let value = point.consumption_kwh * price;
            sum_cost += value;
            series.push(StatisticPoint {
                start: point.start,
                value,
                sum: sum_cost,
            });
        }

        last_interval_start = Some(point.start);
    }

    debug!(
        points = points.len(),
        cost_points = cost.as_ref().map(|c| c.len()),
        "Built statistic series"
    );

    (
        consumption,
        cost,
        LastValues {
            last_interval_start,
            last_spot_price_eur_per_kwh: last_price_eur_per_kwh,
            last_sum_kwh: sum_kwh,
            last_sum_cost: sum_cost,
        },
    )
}
