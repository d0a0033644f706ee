//! Korea Real Estate Board (R-ONE) monthly apartment price indices

use crate::codes::is_rone_region;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::upstream::parse::{json_records, FieldSource};
use crate::upstream::request::UpstreamRequest;
use crate::upstream::utils::pct_change;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

const PATH: &str = "SttsApiTblData.do";

/// Statistics tables of the monthly regional apartment indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexTable {
    Sale,
    Jeonse,
}

impl IndexTable {
    pub fn statbl_id(&self) -> &'static str {
        match self {
            IndexTable::Sale => "A_2024_00178",
            IndexTable::Jeonse => "A_2024_00182",
        }
    }
}

/// One monthly index value for a region
#[derive(Debug, Clone, PartialEq)]
pub struct IndexPoint {
    /// `YYYYMM`
    pub period: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceIndexRecord {
    pub date: String,
    pub region: String,
    pub sale_index: f64,
    pub jeonse_index: f64,
    /// Month-over-month change in percent
    pub sale_change: f64,
    pub jeonse_change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceIndexMeta {
    pub region: String,
    pub year: String,
    pub count: usize,
}

pub fn validate_region(region: &str) -> ApiResult<()> {
    if is_rone_region(region) {
        Ok(())
    } else {
        Err(ApiError::InvalidRegion(region.to_string()))
    }
}

pub fn request(base: &str, key: &str, table: IndexTable, start: &str, end: &str) -> UpstreamRequest {
    UpstreamRequest::new(base, PATH)
        .param("KEY", key)
        .param("Type", "json")
        .param("STATBL_ID", table.statbl_id())
        .param("DTACYCLE_CD", "MM")
        .param("START_WRTTIME", start)
        .param("END_WRTTIME", end)
        .param("pIndex", "1")
        .param("pSize", "500")
}

/// Rows of `region` only; the tables mix every region in one response
pub fn normalize(json: &Value, region: &str) -> Vec<IndexPoint> {
    json_records(json, &["/SttsApiTblData/1/row"])
        .into_iter()
        .filter(|row| row.text(&["CLS_NM"]) == region)
        .map(|row| IndexPoint {
            period: row.text(&["WRTTIME_IDTFR_ID"]),
            value: row.float(&["DTA_VAL"]),
        })
        .collect()
}

/// Join sale and jeonse series by month, ascending, with month-over-month
/// changes. A month missing from one series reads 0 there.
pub fn merge_indices(sale: &[IndexPoint], jeonse: &[IndexPoint], region: &str) -> Vec<PriceIndexRecord> {
    let mut by_period: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    for point in sale {
        by_period.entry(&point.period).or_default().0 = point.value;
    }
    for point in jeonse {
        by_period.entry(&point.period).or_default().1 = point.value;
    }

    let mut prev_sale = 0.0;
    let mut prev_jeonse = 0.0;

    by_period
        .into_iter()
        .map(|(period, (sale_index, jeonse_index))| {
            let record = PriceIndexRecord {
                date: period.to_string(),
                region: region.to_string(),
                sale_index,
                jeonse_index,
                sale_change: pct_change(prev_sale, sale_index),
                jeonse_change: pct_change(prev_jeonse, jeonse_index),
            };
            prev_sale = sale_index;
            prev_jeonse = jeonse_index;
            record
        })
        .collect()
}

/// One index series of `region` between two `YYYYMM` bounds
pub async fn fetch_index(
    state: &AppState,
    key: &str,
    table: IndexTable,
    region: &str,
    start: &str,
    end: &str,
) -> ApiResult<Vec<IndexPoint>> {
    let url = request(&state.config.rone_base_url, key, table, start, end).build()?;
    let json = state.upstream.get_json(&url).await?;
    Ok(normalize(&json, region))
}

/// Sale and jeonse indices of one region for one calendar year
pub async fn fetch_price_indices(
    state: &AppState,
    key: &str,
    region: &str,
    year: &str,
) -> ApiResult<(Vec<PriceIndexRecord>, PriceIndexMeta)> {
    let start = format!("{}01", year);
    let end = format!("{}12", year);

    let (sale, jeonse) = futures::try_join!(
        fetch_index(state, key, IndexTable::Sale, region, &start, &end),
        fetch_index(state, key, IndexTable::Jeonse, region, &start, &end),
    )?;

    let records = merge_indices(&sale, &jeonse, region);
    let meta = PriceIndexMeta {
        region: region.to_string(),
        year: year.to_string(),
        count: records.len(),
    };
    Ok((records, meta))
}
