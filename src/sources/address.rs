//! Legal-dong lookup (MOIS standard region codes)

use crate::codes::lawd_code;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::upstream::parse::{json_records, FieldSource};
use crate::upstream::request::UpstreamRequest;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

const PATH: &str = "1741000/StanReginCd/getStanReginCdList";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DongEntry {
    pub name: String,
    /// Last five digits of the ten digit region code
    pub bjdong_cd: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DongMeta {
    pub sigungu_cd: &'static str,
    pub district: String,
}

pub fn request(base: &str, key: &str, district: &str) -> UpstreamRequest {
    UpstreamRequest::new(base, PATH)
        .param("serviceKey", key)
        .param("locatadd_nm", format!("서울특별시 {}", district))
        .param("type", "json")
        .param("pageNo", "1")
        .param("numOfRows", "100")
}

/// Dong-level rows only (the district row itself ends in `00000`),
/// deduplicated by code with the first occurrence kept
pub fn normalize(json: &Value) -> Vec<DongEntry> {
    let mut seen = HashSet::new();

    json_records(json, &["/StanReginCd/1/row"])
        .into_iter()
        .filter_map(|row| {
            let code = row.text(&["region_cd"]);
            if code.len() != 10 || !code.is_ascii() || &code[5..] == "00000" {
                return None;
            }

            let name = match row.text(&["locallow_nm"]) {
                name if !name.is_empty() => name,
                _ => row
                    .text(&["locatadd_nm"])
                    .split_whitespace()
                    .last()
                    .unwrap_or_default()
                    .to_string(),
            };

            Some(DongEntry {
                name,
                bjdong_cd: code[5..].to_string(),
            })
        })
        .filter(|dong| !dong.name.is_empty())
        .filter(|dong| seen.insert(dong.bjdong_cd.clone()))
        .collect()
}

pub async fn fetch_dongs(
    state: &AppState,
    key: &str,
    district: &str,
) -> ApiResult<(Vec<DongEntry>, DongMeta)> {
    let sigungu_cd =
        lawd_code(district).ok_or_else(|| ApiError::InvalidDistrict(district.to_string()))?;

    let url = request(&state.config.data_go_kr_base_url, key, district).build()?;
    let json = state.upstream.get_json(&url).await?;

    let meta = DongMeta {
        sigungu_cd,
        district: district.to_string(),
    };
    Ok((normalize(&json), meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(rows: Value) -> Value {
        json!({ "StanReginCd": [ { "head": [ { "totalCount": 3 } ] }, { "row": rows } ] })
    }

    #[test]
    fn test_keeps_dong_rows_only() {
        let body = payload(json!([
            { "region_cd": "1168000000", "locatadd_nm": "서울특별시 강남구", "locallow_nm": "" },
            { "region_cd": "1168010100", "locatadd_nm": "서울특별시 강남구 역삼동", "locallow_nm": "역삼동" },
            { "region_cd": "1168010300", "locatadd_nm": "서울특별시 강남구 개포동" },
            { "region_cd": "11680", "locallow_nm": "짧은코드" }
        ]));

        let dongs = normalize(&body);
        assert_eq!(
            dongs,
            vec![
                DongEntry { name: "역삼동".into(), bjdong_cd: "10100".into() },
                DongEntry { name: "개포동".into(), bjdong_cd: "10300".into() },
            ]
        );
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let body = payload(json!([
            { "region_cd": "1168010100", "locallow_nm": "역삼동" },
            { "region_cd": "1168010100", "locallow_nm": "역삼1동" }
        ]));

        let dongs = normalize(&body);
        assert_eq!(dongs.len(), 1);
        assert_eq!(dongs[0].name, "역삼동");
    }

    #[test]
    fn test_missing_rows_is_empty() {
        assert!(normalize(&json!({ "RESULT": { "resultCode": "INFO-200" } })).is_empty());
    }

    #[test]
    fn test_single_row_object() {
        let body = json!({ "StanReginCd": [ {}, { "row": { "region_cd": "1165010800", "locallow_nm": "서초동" } } ] });
        assert_eq!(normalize(&body)[0].bjdong_cd, "10800");
    }

    #[test]
    fn test_request_params() {
        let url = request("https://apis.data.go.kr", "k", "강남구").build().unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("locatadd_nm".into(), "서울특별시 강남구".into())));
        assert!(pairs.contains(&("type".into(), "json".into())));
    }
}
