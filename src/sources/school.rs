//! School counts per Seoul district (NEIS school information)

use crate::error::ApiResult;
use crate::state::AppState;
use crate::upstream::parse::{json_first, json_records, FieldSource};
use crate::upstream::request::UpstreamRequest;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Seoul Metropolitan Office of Education
const SEOUL_OFFICE: &str = "B10";
const PAGE_SIZE: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchoolKind {
    Elementary,
    Middle,
    High,
}

impl SchoolKind {
    pub fn label(&self) -> &'static str {
        match self {
            SchoolKind::Elementary => "초등학교",
            SchoolKind::Middle => "중학교",
            SchoolKind::High => "고등학교",
        }
    }
}

/// Schools of one kind in one district
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistrictTally {
    pub count: i64,
    /// Non-general high schools as (name, type)
    pub special: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolRecord {
    pub district: String,
    pub elementary: i64,
    pub middle: i64,
    pub high: i64,
    pub special_high: Vec<String>,
    pub autonomous_high: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolMeta {
    pub total_schools: i64,
}

pub fn request(base: &str, key: &str, kind: SchoolKind, page: i64) -> UpstreamRequest {
    UpstreamRequest::new(base, "schoolInfo")
        .param("KEY", key)
        .param("Type", "json")
        .param("pIndex", page.to_string())
        .param("pSize", PAGE_SIZE.to_string())
        .param("ATPT_OFCDC_SC_CODE", SEOUL_OFFICE)
        .param("SCHUL_KND_SC_NM", kind.label())
}

/// District of a road-name address ("서울특별시 강남구 ..." -> "강남구")
fn district_of(address: &str) -> Option<&str> {
    address
        .split_whitespace()
        .nth(1)
        .filter(|gu| gu.ends_with('구'))
}

/// Add one page of rows to the running tallies; returns the advertised total
/// row count, or `None` when the body carries no school data
pub fn tally_page(json: &Value, kind: SchoolKind, tallies: &mut BTreeMap<String, DistrictTally>) -> Option<i64> {
    let total = json_first(json, &["/schoolInfo/0/head/0/list_total_count"])?;
    let total = total.as_i64().unwrap_or_default();

    for row in json_records(json, &["/schoolInfo/1/row"]) {
        let address = row.text(&["ORG_RDNMA"]);
        let Some(gu) = district_of(&address) else {
            continue;
        };

        let tally = tallies.entry(gu.to_string()).or_default();
        tally.count += 1;

        if kind == SchoolKind::High {
            let hs_type = row.text(&["HS_SC_NM"]);
            if !hs_type.is_empty() && hs_type != "일반고" {
                tally.special.push((row.text(&["SCHUL_NM"]), hs_type));
            }
        }
    }

    Some(total)
}

/// Merge the three kinds by district, alphabetical
pub fn merge_kinds(
    elementary: &BTreeMap<String, DistrictTally>,
    middle: &BTreeMap<String, DistrictTally>,
    high: &BTreeMap<String, DistrictTally>,
) -> (Vec<SchoolRecord>, SchoolMeta) {
    let districts: BTreeSet<&String> = elementary
        .keys()
        .chain(middle.keys())
        .chain(high.keys())
        .collect();

    let count = |tallies: &BTreeMap<String, DistrictTally>, gu: &str| {
        tallies.get(gu).map(|t| t.count).unwrap_or(0)
    };

    let records: Vec<SchoolRecord> = districts
        .into_iter()
        .map(|gu| {
            let special = high.get(gu).map(|t| t.special.as_slice()).unwrap_or_default();
            let names_of = |kind: &str| -> Vec<String> {
                special
                    .iter()
                    .filter(|(_, hs_type)| hs_type == kind)
                    .map(|(name, _)| name.clone())
                    .collect()
            };

            SchoolRecord {
                district: gu.clone(),
                elementary: count(elementary, gu.as_str()),
                middle: count(middle, gu.as_str()),
                high: count(high, gu.as_str()),
                special_high: names_of("특목고"),
                autonomous_high: names_of("자율고"),
            }
        })
        .collect();

    let total_schools = records.iter().map(|r| r.elementary + r.middle + r.high).sum();
    (records, SchoolMeta { total_schools })
}

/// Every page of one school kind
pub async fn fetch_kind(
    state: &AppState,
    key: &str,
    kind: SchoolKind,
) -> ApiResult<BTreeMap<String, DistrictTally>> {
    let mut tallies = BTreeMap::new();
    let mut page = 1;

    loop {
        let url = request(&state.config.neis_base_url, key, kind, page).build()?;
        let json = state.upstream.get_json(&url).await?;

        let Some(total) = tally_page(&json, kind, &mut tallies) else {
            break;
        };
        debug!("{} page {} of {} rows", kind.label(), page, total);

        if page * PAGE_SIZE >= total {
            break;
        }
        page += 1;
    }

    Ok(tallies)
}

/// All three kinds concurrently; any failing kind fails the whole lookup
pub async fn fetch_schools(state: &AppState, key: &str) -> ApiResult<(Vec<SchoolRecord>, SchoolMeta)> {
    let (elementary, middle, high) = futures::try_join!(
        fetch_kind(state, key, SchoolKind::Elementary),
        fetch_kind(state, key, SchoolKind::Middle),
        fetch_kind(state, key, SchoolKind::High),
    )?;

    Ok(merge_kinds(&elementary, &middle, &high))
}
