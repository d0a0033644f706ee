//! Apartment complex identification info (odcloud)

use crate::error::ApiResult;
use crate::sources::{odcloud_page, odcloud_request, odcloud_rows, OdcloudPage, Paging};
use crate::state::AppState;
use crate::upstream::parse::FieldSource;
use crate::upstream::request::CondOp;
use serde::Serialize;
use serde_json::Value;

const PATH: &str = "AptIdInfoSvc/v1/getAptInfo";

/// Optional filters, each sent as an odcloud condition when non-empty
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComplexFilter {
    pub complex_pk: String,
    /// Partial address match
    pub address: String,
    /// Approval date bounds, `YYYYMMDD`
    pub approval_date_start: String,
    pub approval_date_end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexRecord {
    pub id: String,
    pub complex_pk: String,
    pub name: String,
    pub address: String,
    pub sido: String,
    pub sigungu: String,
    pub total_units: i64,
    pub total_buildings: i64,
    pub approval_date: String,
}

/// Complexes, largest first
pub fn normalize(json: &Value) -> Vec<ComplexRecord> {
    let mut complexes: Vec<ComplexRecord> = odcloud_rows(json)
        .into_iter()
        .enumerate()
        .map(|(idx, item)| ComplexRecord {
            id: format!("complex-{}", idx),
            complex_pk: item.text(&["COMPLEX_PK"]),
            name: item.text(&["COMPLEX_NM"]),
            address: item.text(&["ADRES"]),
            sido: item.text(&["SIDO_NM"]),
            sigungu: item.text(&["SIGUNGU_NM"]),
            total_units: item.int(&["TOT_HSHLD_CNT"]),
            total_buildings: item.int(&["TOT_DONG_CNT"]),
            approval_date: item.text(&["USEAPR_DT"]),
        })
        .collect();

    complexes.sort_by(|a, b| b.total_units.cmp(&a.total_units));
    complexes
}

pub async fn fetch_complexes(
    state: &AppState,
    key: &str,
    filter: &ComplexFilter,
    paging: &Paging,
) -> ApiResult<(Vec<ComplexRecord>, OdcloudPage)> {
    let url = odcloud_request(state, key, PATH, paging)
        .cond("COMPLEX_PK", CondOp::Eq, &filter.complex_pk)
        .cond("ADRES", CondOp::Like, &filter.address)
        .cond("USEAPR_DT", CondOp::Gte, &filter.approval_date_start)
        .cond("USEAPR_DT", CondOp::Lte, &filter.approval_date_end)
        .build()?;
    let json = state.upstream.get_json(&url).await?;

    let complexes = normalize(&json);
    let page = odcloud_page(&json, paging, complexes.len());
    Ok((complexes, page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sorted_by_units_descending() {
        let body = json!({ "data": [
            { "COMPLEX_PK": "A1", "COMPLEX_NM": "작은단지", "TOT_HSHLD_CNT": "120" },
            { "COMPLEX_PK": "A2", "COMPLEX_NM": "큰단지", "TOT_HSHLD_CNT": 3000, "TOT_DONG_CNT": "25" },
            { "COMPLEX_PK": "A3", "COMPLEX_NM": "미상" }
        ] });

        let complexes = normalize(&body);
        let names: Vec<&str> = complexes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["큰단지", "작은단지", "미상"]);
        assert_eq!(complexes[0].id, "complex-1");
        assert_eq!(complexes[0].total_buildings, 25);
        assert_eq!(complexes[2].total_units, 0);

        // Already ordered input stays put
        let mut again = complexes.clone();
        again.sort_by(|a, b| b.total_units.cmp(&a.total_units));
        assert_eq!(again, complexes);
    }
}
