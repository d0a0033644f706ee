//! Nationwide land price change survey, micro data (odcloud)

use crate::clock::Clock;
use crate::error::ApiResult;
use crate::sources::{odcloud_page, odcloud_request, odcloud_rows, param, OdcloudPage, Paging};
use crate::state::AppState;
use crate::upstream::parse::FieldSource;
use crate::upstream::request::{CondOp, UpstreamRequest};
use serde::Serialize;
use serde_json::Value;

const PATH: &str = "LfrMasterSvc/v1/getLfrMicro";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LandPriceRecord {
    pub id: String,
    pub year_month: String,
    pub region_code: String,
    pub land_category: String,
    pub land_use: String,
    pub sample_no: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LandPriceMeta {
    #[serde(flatten)]
    pub page: OdcloudPage,
    pub year_month: String,
    /// "전체" when no region filter was given
    pub region_code: String,
}

/// Survey month: `yearMonth`, else `year` + current month, else current month
pub fn resolve_year_month(year_month: Option<String>, year: Option<String>, clock: &dyn Clock) -> String {
    match (param(year_month), param(year)) {
        (ym, _) if !ym.is_empty() => ym,
        (_, year) if !year.is_empty() => format!("{}{}", year, clock.current_month()),
        _ => clock.current_year_month(),
    }
}

pub fn request(state: &AppState, key: &str, year_month: &str, region_code: &str, paging: &Paging) -> UpstreamRequest {
    odcloud_request(state, key, PATH, paging)
        .cond("YM", CondOp::Eq, year_month)
        .cond("REG", CondOp::Eq, region_code)
}

pub fn normalize(json: &Value) -> Vec<LandPriceRecord> {
    odcloud_rows(json)
        .into_iter()
        .enumerate()
        .map(|(idx, item)| LandPriceRecord {
            id: format!("land-{}", idx),
            year_month: item.text(&["YM"]),
            region_code: item.text(&["REG"]),
            land_category: item.text(&["LAND_CATE"]),
            land_use: item.text(&["LAND_USE"]),
            sample_no: item.text(&["SMPL_NO"]),
        })
        .collect()
}

pub async fn fetch_land_prices(
    state: &AppState,
    key: &str,
    year_month: &str,
    region_code: &str,
    paging: &Paging,
) -> ApiResult<(Vec<LandPriceRecord>, LandPriceMeta)> {
    let url = request(state, key, year_month, region_code, paging).build()?;
    let json = state.upstream.get_json(&url).await?;

    let records = normalize(&json);
    let meta = LandPriceMeta {
        page: odcloud_page(&json, paging, records.len()),
        year_month: year_month.to_string(),
        region_code: if region_code.is_empty() {
            "전체".to_string()
        } else {
            region_code.to_string()
        },
    };
    Ok((records, meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::NaiveDate;
    use serde_json::json;

    fn clock() -> FixedClock {
        FixedClock(NaiveDate::from_ymd_opt(2024, 5, 20).unwrap())
    }

    #[test]
    fn test_resolve_year_month() {
        assert_eq!(resolve_year_month(Some("202312".into()), Some("2020".into()), &clock()), "202312");
        assert_eq!(resolve_year_month(None, Some("2022".into()), &clock()), "202205");
        assert_eq!(resolve_year_month(None, None, &clock()), "202405");
    }

    #[test]
    fn test_normalize() {
        let body = json!({
            "currentCount": 1, "totalCount": 1,
            "data": [ { "YM": "202401", "REG": "11680", "LAND_CATE": "대", "LAND_USE": "주거", "SMPL_NO": 7 } ]
        });

        let records = normalize(&body);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "land-0");
        assert_eq!(records[0].land_category, "대");
        assert_eq!(records[0].sample_no, "7");
    }
}
