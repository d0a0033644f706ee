//! Resident population and households per district (MOIS registration stats)

use crate::error::ApiResult;
use crate::state::AppState;
use crate::upstream::parse::{json_first, json_records, FieldSource};
use crate::upstream::request::UpstreamRequest;
use crate::upstream::UpstreamError;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

const PATH: &str = "1741000/admmPpltnHhStus/selectAdmmPpltnHhStus";

/// Whole of Seoul
pub const DEFAULT_ADMM_CD: &str = "1100000000";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationRecord {
    pub district: String,
    pub population: i64,
    pub households: i64,
    pub pop_per_household: f64,
    pub male_population: i64,
    pub female_population: i64,
    pub male_feml_rate: String,
    pub stats_month: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationMeta {
    pub stats_month: String,
    pub total_population: i64,
    pub total_households: i64,
}

pub fn request(base: &str, key: &str, admm_cd: &str, ym: &str) -> UpstreamRequest {
    UpstreamRequest::new(base, PATH)
        .param("serviceKey", key)
        .param("admmCd", admm_cd)
        .param("srchFrYm", ym)
        .param("srchToYm", ym)
        // district level, total registered population
        .param("lv", "2")
        .param("regSeCd", "1")
        .param("type", "JSON")
        .param("numOfRows", "100")
        .param("pageNo", "1")
}

/// Fail on a non-zero result code in whichever header shape the service used
pub fn check_result_code(json: &Value) -> Result<(), UpstreamError> {
    let Some(header) = json_first(json, &["/Response/head", "/header", "/response/header"]) else {
        return Ok(());
    };

    match header.text(&["resultCode"]).as_str() {
        "" | "0" | "00" => Ok(()),
        code => {
            let message = match header.text(&["resultMsg"]) {
                msg if msg.is_empty() => "API 오류".to_string(),
                msg => msg,
            };
            warn!("Population service returned result code {}: {}", code, message);
            Err(UpstreamError::Rejected(message))
        }
    }
}

/// District rows sorted by name; rows without a district name are dropped
pub fn normalize(json: &Value, ym: &str) -> Vec<PopulationRecord> {
    let mut records: Vec<PopulationRecord> =
        json_records(json, &["/Response/items/item", "/body/items/item", "/items"])
            .into_iter()
            .filter(|item| !item.text(&["sggNm"]).is_empty())
            .map(|item| {
                let stats_month = match item.text(&["statsYm"]) {
                    month if month.is_empty() => ym.to_string(),
                    month => month,
                };

                PopulationRecord {
                    district: item.text(&["sggNm"]),
                    population: item.int(&["totNmprCnt"]),
                    households: item.int(&["hhCnt"]),
                    pop_per_household: item.float(&["hhNmpr"]),
                    male_population: item.int(&["maleNmprCnt"]),
                    female_population: item.int(&["femlNmprCnt"]),
                    male_feml_rate: item.text(&["maleFemlRate"]),
                    stats_month,
                }
            })
            .collect();

    records.sort_by(|a, b| a.district.cmp(&b.district));
    records
}

pub fn summarize(records: &[PopulationRecord], ym: &str) -> PopulationMeta {
    PopulationMeta {
        stats_month: ym.to_string(),
        total_population: records.iter().map(|r| r.population).sum(),
        total_households: records.iter().map(|r| r.households).sum(),
    }
}

pub async fn fetch_population(
    state: &AppState,
    key: &str,
    admm_cd: &str,
    ym: &str,
) -> ApiResult<(Vec<PopulationRecord>, PopulationMeta)> {
    let url = request(&state.config.data_go_kr_base_url, key, admm_cd, ym).build()?;
    let json = state.upstream.get_json(&url).await?;
    check_result_code(&json)?;

    let records = normalize(&json, ym);
    let meta = summarize(&records, ym);
    Ok((records, meta))
}
