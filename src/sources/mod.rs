//! Data sources - one module per upstream domain.
//!
//! Each source owns its request builder, a pure normalizer turning the raw
//! payload into typed records, and an async fetch function combining the two.

pub mod address;
pub mod building;
pub mod complex;
pub mod land;
pub mod population;
pub mod school;
pub mod stats;
pub mod subscription;
pub mod trade;

use crate::state::AppState;
use crate::upstream::parse::{json_records, FieldSource};
use crate::upstream::request::UpstreamRequest;
use crate::upstream::utils::parse_int;
use serde::Serialize;
use serde_json::Value;

/// Query value, or `default` when absent or empty
pub fn param_or(value: Option<String>, default: impl FnOnce() -> String) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => default(),
    }
}

/// Query value with absent mapped to ""
pub fn param(value: Option<String>) -> String {
    param_or(value, String::new)
}

/// Paging parameters of the odcloud family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paging {
    pub page: String,
    pub per_page: String,
}

impl Paging {
    pub fn resolve(page: Option<String>, per_page: Option<String>) -> Self {
        Paging {
            page: param_or(page, || "1".to_string()),
            per_page: param_or(per_page, || "100".to_string()),
        }
    }
}

/// Paging metadata echoed back by odcloud-backed endpoints
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OdcloudPage {
    pub total_count: i64,
    pub current_count: i64,
    pub page: i64,
    pub per_page: i64,
}

pub(crate) fn odcloud_request(state: &AppState, key: &str, path: &str, paging: &Paging) -> UpstreamRequest {
    UpstreamRequest::new(&state.config.odcloud_base_url, path)
        .param("serviceKey", key)
        .param("page", paging.page.as_str())
        .param("perPage", paging.per_page.as_str())
}

/// Rows of an odcloud response (`{ currentCount, data, matchCount, page, perPage, totalCount }`)
pub(crate) fn odcloud_rows(json: &Value) -> Vec<&Value> {
    json_records(json, &["/data"])
}

pub(crate) fn odcloud_page(json: &Value, paging: &Paging, row_count: usize) -> OdcloudPage {
    let current_count = match json.int(&["currentCount"]) {
        0 => row_count as i64,
        n => n,
    };

    OdcloudPage {
        total_count: json.int(&["totalCount"]),
        current_count,
        page: parse_int(&paging.page),
        per_page: parse_int(&paging.per_page),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_param_or_treats_empty_as_missing() {
        assert_eq!(param_or(Some("".into()), || "강남구".into()), "강남구");
        assert_eq!(param_or(None, || "x".into()), "x");
        assert_eq!(param_or(Some(" 서초구 ".into()), || "x".into()), "서초구");
    }

    #[test]
    fn test_paging_defaults() {
        let paging = Paging::resolve(None, Some("20".into()));
        assert_eq!(paging.page, "1");
        assert_eq!(paging.per_page, "20");
    }

    #[test]
    fn test_odcloud_page_falls_back_to_row_count() {
        let body = json!({ "totalCount": 42, "data": [{}, {}] });
        let paging = Paging::resolve(None, None);
        let page = odcloud_page(&body, &paging, 2);

        assert_eq!(page.total_count, 42);
        assert_eq!(page.current_count, 2);
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 100);
        assert_eq!(odcloud_rows(&body).len(), 2);
    }
}
