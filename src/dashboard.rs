//! Dashboard aggregations - the same metric across many districts, months or
//! regions, fanned out over single-source fetches and merged by join key.
//!
//! An axis whose fetch fails contributes zero data; none of these views
//! fail because of an individual axis.

use crate::codes::{lawd_code, OVERVIEW_REGIONS, RATIO_TREND_REGIONS};
use crate::error::{ApiError, ApiResult};
use crate::jeonse_ratio;
use crate::sources::stats::{fetch_price_indices, PriceIndexRecord};
use crate::sources::trade::{fetch_trades, DealMonth, TradeKind};
use crate::state::AppState;
use crate::upstream::fanout::{fan_out, Concurrency};
use crate::upstream::utils::{dotted_month, mean_rounded, pct_change, round_to};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

/// Comma separated district list, or `default` when empty.
/// Every name is validated before anything is fetched.
pub fn parse_districts(raw: &str, default: &[&str]) -> ApiResult<Vec<String>> {
    let districts: Vec<String> = if raw.trim().is_empty() {
        default.iter().map(|d| d.to_string()).collect()
    } else {
        raw.split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .collect()
    };

    if let Some(unknown) = districts.iter().find(|d| lawd_code(d).is_none()) {
        return Err(ApiError::InvalidDistrict(unknown.clone()));
    }
    Ok(districts)
}

// =============================================================================
// Listing: districts x {apartment, officetel, row house}
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingSummary {
    pub district: String,
    pub apt_count: usize,
    pub apt_avg_price: i64,
    pub officetel_count: usize,
    pub officetel_avg_price: i64,
    pub house_count: usize,
    pub house_avg_price: i64,
    pub total_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingMeta {
    pub year: String,
    pub month: String,
    pub total_count: usize,
    pub apt_count: usize,
    pub officetel_count: usize,
    pub house_count: usize,
}

/// Merge per-axis trade prices into one summary per district, in `districts` order
pub fn merge_listing(
    districts: &[String],
    settled: Vec<((String, TradeKind), Option<Vec<i64>>)>,
) -> Vec<ListingSummary> {
    let prices: HashMap<(String, TradeKind), Vec<i64>> = settled
        .into_iter()
        .map(|(axis, outcome)| (axis, outcome.unwrap_or_default()))
        .collect();

    districts
        .iter()
        .map(|district| {
            let of = |kind: TradeKind| {
                prices
                    .get(&(district.clone(), kind))
                    .map(Vec::as_slice)
                    .unwrap_or_default()
            };
            let apt = of(TradeKind::Apartment);
            let officetel = of(TradeKind::Officetel);
            let house = of(TradeKind::House);

            ListingSummary {
                district: district.clone(),
                apt_count: apt.len(),
                apt_avg_price: mean_rounded(apt),
                officetel_count: officetel.len(),
                officetel_avg_price: mean_rounded(officetel),
                house_count: house.len(),
                house_avg_price: mean_rounded(house),
                total_count: apt.len() + officetel.len() + house.len(),
            }
        })
        .collect()
}

pub fn listing_meta(summaries: &[ListingSummary], year: &str, month: &str) -> ListingMeta {
    let apt_count = summaries.iter().map(|s| s.apt_count).sum();
    let officetel_count = summaries.iter().map(|s| s.officetel_count).sum();
    let house_count = summaries.iter().map(|s| s.house_count).sum();

    ListingMeta {
        year: year.to_string(),
        month: month.to_string(),
        total_count: apt_count + officetel_count + house_count,
        apt_count,
        officetel_count,
        house_count,
    }
}

pub async fn market_listing(
    state: &AppState,
    key: &str,
    districts: &[String],
    year: &str,
    month: &str,
) -> ApiResult<(Vec<ListingSummary>, ListingMeta)> {
    let month = format!("{:0>2}", month);
    let axes: Vec<(String, TradeKind)> = districts
        .iter()
        .flat_map(|d| TradeKind::ALL.map(|kind| (d.clone(), kind)))
        .collect();

    info!(
        "Listing summary for {} districts, {}-{} ({} calls)",
        districts.len(),
        year,
        month,
        axes.len()
    );

    let settled = fan_out(axes, state.batching(), |(district, kind)| {
        let month = month.as_str();
        async move {
            let deal = DealMonth::new(&district, year, month)?;
            let trades = fetch_trades(state, key, kind, &deal).await?;
            Ok::<_, ApiError>(trades.iter().map(|t| t.price).collect::<Vec<i64>>())
        }
    })
    .await;

    let summaries = merge_listing(districts, settled);
    let meta = listing_meta(&summaries, year, &month);
    Ok((summaries, meta))
}

// =============================================================================
// Volume: districts x first six months
// =============================================================================

const VOLUME_MONTHS: [&str; 6] = ["01", "02", "03", "04", "05", "06"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthVolume {
    /// `YYYY.MM`
    pub month: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeRecord {
    pub region: String,
    pub volumes: Vec<MonthVolume>,
    pub total_count: i64,
    pub avg_count: i64,
    /// Second quarter against first quarter, percent, one decimal
    pub trend: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMeta {
    pub year: String,
    pub total_volume: i64,
    pub avg_volume: i64,
}

pub fn volume_record(region: &str, year: &str, counts: &[i64]) -> VolumeRecord {
    let volumes = counts
        .iter()
        .zip(VOLUME_MONTHS)
        .map(|(count, month)| MonthVolume {
            month: dotted_month(&format!("{}{}", year, month)),
            count: *count,
        })
        .collect();

    let total_count: i64 = counts.iter().sum();
    let first: i64 = counts.iter().take(3).sum();
    let second: i64 = counts.iter().skip(3).take(3).sum();

    VolumeRecord {
        region: region.to_string(),
        volumes,
        total_count,
        avg_count: mean_rounded(counts),
        trend: round_to(pct_change(first as f64, second as f64), 1),
    }
}

pub fn merge_volume(
    districts: &[String],
    year: &str,
    settled: Vec<((String, &'static str), Option<usize>)>,
) -> (Vec<VolumeRecord>, VolumeMeta) {
    let counts: HashMap<(String, &str), i64> = settled
        .into_iter()
        .map(|(axis, count)| (axis, count.unwrap_or(0) as i64))
        .collect();

    let records: Vec<VolumeRecord> = districts
        .iter()
        .map(|district| {
            let monthly: Vec<i64> = VOLUME_MONTHS
                .iter()
                .map(|m| counts.get(&(district.clone(), *m)).copied().unwrap_or(0))
                .collect();
            volume_record(district, year, &monthly)
        })
        .collect();

    let totals: Vec<i64> = records.iter().map(|r| r.total_count).collect();
    let meta = VolumeMeta {
        year: year.to_string(),
        total_volume: totals.iter().sum(),
        avg_volume: mean_rounded(&totals),
    };
    (records, meta)
}

pub async fn market_volume(
    state: &AppState,
    key: &str,
    districts: &[String],
    year: &str,
) -> ApiResult<(Vec<VolumeRecord>, VolumeMeta)> {
    let axes: Vec<(String, &'static str)> = districts
        .iter()
        .flat_map(|d| VOLUME_MONTHS.map(|month| (d.clone(), month)))
        .collect();

    info!(
        "Trade volume for {} districts, {} H1 ({} calls)",
        districts.len(),
        year,
        axes.len()
    );

    let settled = fan_out(axes, state.batching(), |(district, month)| async move {
        let deal = DealMonth::new(&district, year, month)?;
        let trades = fetch_trades(state, key, TradeKind::Apartment, &deal).await?;
        Ok::<_, ApiError>(trades.len())
    })
    .await;

    Ok(merge_volume(districts, year, settled))
}

// =============================================================================
// Price overview: latest R-ONE indices for every province
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketPrice {
    pub region: String,
    pub sale_index: f64,
    pub sale_change: f64,
    pub jeonse_index: f64,
    pub jeonse_change: f64,
    /// Jeonse index over sale index, percent
    pub jeonse_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearMeta {
    pub year: String,
}

/// Latest month of a region's series, rounded for display; all zeros without data
pub fn latest_price(region: &str, series: &[PriceIndexRecord]) -> MarketPrice {
    match series.last() {
        Some(latest) => MarketPrice {
            region: region.to_string(),
            sale_index: round_to(latest.sale_index, 1),
            sale_change: round_to(latest.sale_change, 2),
            jeonse_index: round_to(latest.jeonse_index, 1),
            jeonse_change: round_to(latest.jeonse_change, 2),
            jeonse_ratio: round_to(jeonse_ratio(latest.sale_index, latest.jeonse_index), 1),
        },
        None => MarketPrice {
            region: region.to_string(),
            sale_index: 0.0,
            sale_change: 0.0,
            jeonse_index: 0.0,
            jeonse_change: 0.0,
            jeonse_ratio: 0.0,
        },
    }
}

/// Index series of every region at once
async fn region_series(
    state: &AppState,
    key: &str,
    regions: Vec<String>,
    year: &str,
) -> Vec<(String, Vec<PriceIndexRecord>)> {
    fan_out(regions, Concurrency::Unbounded, |region| async move {
        fetch_price_indices(state, key, &region, year)
            .await
            .map(|(records, _)| records)
    })
    .await
    .into_iter()
    .map(|(region, series)| (region, series.unwrap_or_default()))
    .collect()
}

pub async fn market_price(
    state: &AppState,
    key: &str,
    year: &str,
) -> ApiResult<(Vec<MarketPrice>, YearMeta)> {
    let regions = OVERVIEW_REGIONS.iter().map(|r| r.to_string()).collect();

    let prices = region_series(state, key, regions, year)
        .await
        .iter()
        .map(|(region, series)| latest_price(region, series))
        .collect();

    Ok((prices, YearMeta { year: year.to_string() }))
}

// =============================================================================
// Jeonse ratio trend
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// 70% and above risks deposits exceeding the sale value
    pub fn of(ratio: f64) -> Self {
        if ratio >= 70.0 {
            RiskLevel::High
        } else if ratio >= 60.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatioPoint {
    /// `YYYY.MM`
    pub month: String,
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatioTrend {
    pub region: String,
    pub ratios: Vec<RatioPoint>,
    pub current_ratio: f64,
    /// Latest ratio minus the first ratio of the year
    pub change: f64,
    pub risk_level: RiskLevel,
}

pub fn ratio_trend(region: &str, series: &[PriceIndexRecord]) -> RatioTrend {
    let ratios: Vec<RatioPoint> = series
        .iter()
        .map(|record| RatioPoint {
            month: dotted_month(&record.date),
            ratio: jeonse_ratio(record.sale_index, record.jeonse_index),
        })
        .collect();

    let current = ratios.last().map(|p| p.ratio).unwrap_or(0.0);
    let first = ratios.first().map(|p| p.ratio).unwrap_or(0.0);

    RatioTrend {
        region: region.to_string(),
        ratios,
        current_ratio: round_to(current, 1),
        change: round_to(current - first, 1),
        risk_level: RiskLevel::of(current),
    }
}

pub async fn trend_ratio(
    state: &AppState,
    key: &str,
    year: &str,
) -> ApiResult<(Vec<RatioTrend>, YearMeta)> {
    let regions = RATIO_TREND_REGIONS.iter().map(|r| r.to_string()).collect();

    let trends = region_series(state, key, regions, year)
        .await
        .iter()
        .map(|(region, series)| ratio_trend(region, series))
        .collect();

    Ok((trends, YearMeta { year: year.to_string() }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str, sale: f64, jeonse: f64) -> PriceIndexRecord {
        PriceIndexRecord {
            date: date.into(),
            region: "서울".into(),
            sale_index: sale,
            jeonse_index: jeonse,
            sale_change: 0.123,
            jeonse_change: -0.456,
        }
    }

    #[test]
    fn test_parse_districts() {
        assert_eq!(
            parse_districts("", &["강남구", "서초구"]).unwrap(),
            vec!["강남구", "서초구"]
        );
        assert_eq!(
            parse_districts(" 마포구, 용산구 ,", &[]).unwrap(),
            vec!["마포구", "용산구"]
        );
        assert!(matches!(
            parse_districts("마포구,없는구", &[]),
            Err(ApiError::InvalidDistrict(d)) if d == "없는구"
        ));
    }

    #[test]
    fn test_merge_listing_zeroes_failed_axis() {
        let districts = vec!["강남구".to_string(), "서초구".to_string()];
        let settled = vec![
            (("강남구".to_string(), TradeKind::Apartment), Some(vec![100_000, 200_001])),
            (("강남구".to_string(), TradeKind::Officetel), None),
            (("강남구".to_string(), TradeKind::House), Some(vec![])),
            (("서초구".to_string(), TradeKind::Apartment), None),
            (("서초구".to_string(), TradeKind::Officetel), Some(vec![30_000])),
            (("서초구".to_string(), TradeKind::House), None),
        ];

        let summaries = merge_listing(&districts, settled);
        assert_eq!(summaries.len(), 2);

        let gangnam = &summaries[0];
        assert_eq!(gangnam.district, "강남구");
        assert_eq!(gangnam.apt_count, 2);
        assert_eq!(gangnam.apt_avg_price, 150_001);
        assert_eq!(gangnam.officetel_count, 0);
        assert_eq!(gangnam.officetel_avg_price, 0);
        assert_eq!(gangnam.total_count, 2);

        let seocho = &summaries[1];
        assert_eq!(seocho.apt_count, 0);
        assert_eq!(seocho.officetel_avg_price, 30_000);

        let meta = listing_meta(&summaries, "2024", "03");
        assert_eq!(meta.total_count, 3);
        assert_eq!(meta.officetel_count, 1);
    }

    #[test]
    fn test_volume_record() {
        let record = volume_record("강남구", "2024", &[10, 20, 30, 40, 50, 0]);
        assert_eq!(record.total_count, 150);
        assert_eq!(record.avg_count, 25);
        // (90 - 60) / 60
        assert_eq!(record.trend, 50.0);
        assert_eq!(record.volumes[0].month, "2024.01");
        assert_eq!(record.volumes[5].month, "2024.06");

        let flat = volume_record("서초구", "2024", &[0, 0, 0, 3, 0, 0]);
        assert_eq!(flat.trend, 0.0);
    }

    #[test]
    fn test_merge_volume_partial_failure() {
        let districts = vec!["송파구".to_string()];
        let settled = VOLUME_MONTHS
            .iter()
            .map(|m| {
                let count = if *m == "02" { None } else { Some(3) };
                (("송파구".to_string(), *m), count)
            })
            .collect();

        let (records, meta) = merge_volume(&districts, "2024", settled);
        assert_eq!(records[0].volumes.len(), 6);
        assert_eq!(records[0].volumes[1].count, 0);
        assert_eq!(records[0].total_count, 15);
        assert_eq!(meta.total_volume, 15);
        assert_eq!(meta.avg_volume, 15);
    }

    #[test]
    fn test_latest_price() {
        let series = vec![record("202401", 90.0, 60.0), record("202402", 95.04, 66.56)];
        let price = latest_price("서울", &series);

        assert_eq!(price.sale_index, 95.0);
        assert_eq!(price.jeonse_index, 66.6);
        assert_eq!(price.sale_change, 0.12);
        assert_eq!(price.jeonse_change, -0.46);
        assert_eq!(price.jeonse_ratio, 70.0);

        let empty = latest_price("제주", &[]);
        assert_eq!(empty.jeonse_ratio, 0.0);
        assert_eq!(empty.region, "제주");
    }

    #[test]
    fn test_ratio_trend() {
        let series = vec![
            record("202401", 100.0, 58.0),
            record("202402", 0.0, 50.0),
            record("202403", 100.0, 65.04),
        ];
        let trend = ratio_trend("경기", &series);

        assert_eq!(trend.ratios.len(), 3);
        assert_eq!(trend.ratios[0].month, "2024.01");
        assert_eq!(trend.ratios[1].ratio, 0.0);
        assert_eq!(trend.current_ratio, 65.0);
        assert_eq!(trend.change, 7.0);
        assert_eq!(trend.risk_level, RiskLevel::Medium);

        let empty = ratio_trend("대구", &[]);
        assert_eq!(empty.current_ratio, 0.0);
        assert_eq!(empty.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_risk_level_thresholds() {
        assert_eq!(RiskLevel::of(70.0), RiskLevel::High);
        assert_eq!(RiskLevel::of(69.99), RiskLevel::Medium);
        assert_eq!(RiskLevel::of(60.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::of(59.9), RiskLevel::Low);
        assert_eq!(
            serde_json::to_value(RiskLevel::High).unwrap(),
            serde_json::json!("high")
        );
    }
}
