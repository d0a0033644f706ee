//! Housing subscription (청약) sources: savings accounts, competition rates,
//! opening announcements and announcement schedules

use crate::codes::{deposit_type, subscription_area};
use crate::error::ApiResult;
use crate::sources::{odcloud_page, odcloud_request, odcloud_rows, OdcloudPage, Paging};
use crate::state::AppState;
use crate::upstream::parse::{FieldSource, XmlElement};
use crate::upstream::request::{CondOp, UpstreamRequest};
use crate::upstream::utils::round_to;
use serde::Serialize;
use serde_json::Value;

const ACCOUNT_PATH: &str = "ApplyhomeBnkbStatSvc/v1/getBnkbAcnutAllStat";
const COMPETITION_PATH: &str = "ApplyhomeInfoCmpetRtSvc/v1/getAPTLttotPblancCmpet";
const OPENING_PATH: &str = "1613000/OpeningService/getOpeningInfo";
const SCHEDULE_PATH: &str = "ApplyhomeInfoDetailSvc/v1/getAPTLttotPblancDetail";

fn first_non_empty(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

// =============================================================================
// Savings accounts
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountFilter {
    /// `YYYYMM`
    pub year_month: String,
    /// 100, 400, 700 or 900
    pub area_code: String,
    /// 01..04
    pub deposit_item: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStats {
    pub date: String,
    pub region: String,
    pub deposit_type: String,
    pub total_accounts: i64,
    pub new_accounts: i64,
    pub canceled_accounts: i64,
    pub balance: i64,
}

/// Account statistics, most recent month first; codes are mapped to labels
/// and unknown codes pass through
pub fn normalize_accounts(json: &Value) -> Vec<AccountStats> {
    let mut stats: Vec<AccountStats> = odcloud_rows(json)
        .into_iter()
        .map(|item| {
            let area = item.text(&["SUBSCRPT_AREA_CODE"]);
            let deposit = item.text(&["DPST_ITEM"]);

            AccountStats {
                date: item.text(&["DELNG_OCCRRNC_YM"]),
                region: match subscription_area(&area) {
                    Some(label) => label.to_string(),
                    None => first_non_empty(area, "전국"),
                },
                deposit_type: deposit_type(&deposit)
                    .map(str::to_string)
                    .unwrap_or(deposit),
                total_accounts: item.int(&["ACNUT_CNT"]),
                new_accounts: item.int(&["SBSCRB_CNT"]),
                canceled_accounts: item.int(&["CNCL_CNT"]),
                balance: item.int(&["BLNC_AMT"]),
            }
        })
        .collect();

    stats.sort_by(|a, b| b.date.cmp(&a.date));
    stats
}

pub async fn fetch_accounts(
    state: &AppState,
    key: &str,
    filter: &AccountFilter,
    paging: &Paging,
) -> ApiResult<(Vec<AccountStats>, OdcloudPage)> {
    let url = odcloud_request(state, key, ACCOUNT_PATH, paging)
        .cond("DELNG_OCCRRNC_YM", CondOp::Eq, &filter.year_month)
        .cond("SUBSCRPT_AREA_CODE", CondOp::Eq, &filter.area_code)
        .cond("DPST_ITEM", CondOp::Eq, &filter.deposit_item)
        .build()?;
    let json = state.upstream.get_json(&url).await?;

    let stats = normalize_accounts(&json);
    let page = odcloud_page(&json, paging, stats.len());
    Ok((stats, page))
}

// =============================================================================
// Competition rates
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompetitionFilter {
    pub house_manage_no: String,
    pub pblanc_no: String,
    pub reside_secd: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitionRecord {
    pub id: String,
    pub name: String,
    pub region: String,
    pub supply_type: String,
    pub supply_count: i64,
    pub applicant_count: i64,
    /// Applicants per supplied unit, two decimals
    pub competition_rate: f64,
    pub announce_date: String,
    pub house_manage_no: String,
    pub pblanc_no: String,
}

/// Applicants per unit rounded to two decimals; 0 without applicants
pub fn competition_rate(applicants: i64, supply: i64) -> f64 {
    if applicants > 0 && supply > 0 {
        round_to(applicants as f64 / supply as f64, 2)
    } else {
        0.0
    }
}

/// Competition records, highest rate first
pub fn normalize_competition(json: &Value) -> Vec<CompetitionRecord> {
    let mut records: Vec<CompetitionRecord> = odcloud_rows(json)
        .into_iter()
        .enumerate()
        .map(|(idx, item)| {
            // Total supply, else general supply, else one unit
            let supply_count = match (item.int(&["TOT_SUPLY_HSHLDCO"]), item.int(&["SUPLY_HSHLDCO"])) {
                (total, _) if total != 0 => total,
                (_, general) if general != 0 => general,
                _ => 1,
            };
            let applicant_count = item.int(&["RCEPT_CNT"]);

            CompetitionRecord {
                id: format!("comp-{}", idx),
                name: item.text(&["HOUSE_NM", "BSNS_MBY_NM"]),
                region: item.text(&["SUBSCRPT_AREA_CODE_NM", "SIDO_NM"]),
                supply_type: first_non_empty(item.text(&["HOUSE_SECD_NM"]), "일반"),
                supply_count,
                applicant_count,
                competition_rate: competition_rate(applicant_count, supply_count),
                announce_date: item.text(&["RCRIT_PBLANC_DE"]),
                house_manage_no: item.text(&["HOUSE_MANAGE_NO"]),
                pblanc_no: item.text(&["PBLANC_NO"]),
            }
        })
        .collect();

    records.sort_by(|a, b| b.competition_rate.total_cmp(&a.competition_rate));
    records
}

pub async fn fetch_competition(
    state: &AppState,
    key: &str,
    filter: &CompetitionFilter,
    paging: &Paging,
) -> ApiResult<(Vec<CompetitionRecord>, OdcloudPage)> {
    let url = odcloud_request(state, key, COMPETITION_PATH, paging)
        .cond("HOUSE_MANAGE_NO", CondOp::Eq, &filter.house_manage_no)
        .cond("PBLANC_NO", CondOp::Eq, &filter.pblanc_no)
        .cond("RESIDE_SECD", CondOp::Eq, &filter.reside_secd)
        .build()?;
    let json = state.upstream.get_json(&url).await?;

    let records = normalize_competition(&json);
    let page = odcloud_page(&json, paging, records.len());
    Ok((records, page))
}

// =============================================================================
// Opening announcements (XML)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningRecord {
    pub id: String,
    pub name: String,
    pub region: String,
    pub address: String,
    pub house_type: String,
    pub total_units: i64,
    pub recruit_date: String,
    pub announce_date: String,
    pub contract_start: String,
    pub contract_end: String,
    /// 접수예정, 접수중 or 마감
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningMeta {
    /// "전체" when unfiltered
    pub region: String,
    pub house_type: String,
    pub count: usize,
}

/// Reception status on `today` (`YYYYMMDD`); dates may carry dashes
pub fn reception_status(today: &str, recruit_date: &str, announce_date: &str) -> &'static str {
    let recruit = recruit_date.replace('-', "");
    let announce = announce_date.replace('-', "");

    if today < recruit.as_str() {
        "접수예정"
    } else if today <= announce.as_str() {
        "접수중"
    } else {
        "마감"
    }
}

pub fn opening_request(base: &str, key: &str, region: &str, house_type: &str) -> UpstreamRequest {
    UpstreamRequest::new(base, OPENING_PATH)
        .param("serviceKey", key)
        .param("numOfRows", "100")
        .param("pageNo", "1")
        .param_if("sidoNm", region)
        .param("houseTy", house_type)
}

/// Named announcements, latest reception first
pub fn normalize_openings(doc: &XmlElement, today: &str) -> Vec<OpeningRecord> {
    let mut records: Vec<OpeningRecord> = doc
        .items()
        .into_iter()
        .filter(|item| !item.text(&["houseDtlSecdNm", "houseNm", "bsnsMbyNm"]).is_empty())
        .enumerate()
        .map(|(idx, item)| {
            let recruit_date = item.text(&["rceptBgnde", "rcritPblancDe"]);
            let announce_date = item.text(&["przwnerPresnatnDe", "winnerDe"]);

            OpeningRecord {
                id: format!("sub-{}", idx),
                name: item.text(&["houseDtlSecdNm", "houseNm", "bsnsMbyNm"]),
                region: item.text(&["sidoNm", "sido"]),
                address: item.text(&["hssplyAdres", "adres"]),
                house_type: item.text(&["houseTy", "houseSecd"]),
                total_units: item.int(&["totSuplyHshldco", "totHshldco"]),
                status: reception_status(today, &recruit_date, &announce_date).to_string(),
                recruit_date,
                announce_date,
                contract_start: item.text(&["cntrctCnclsBgnde", "contractBgn"]),
                contract_end: item.text(&["cntrctCnclsEndde", "contractEnd"]),
            }
        })
        .collect();

    records.sort_by(|a, b| b.recruit_date.cmp(&a.recruit_date));
    records
}

pub async fn fetch_openings(
    state: &AppState,
    key: &str,
    region: &str,
    house_type: &str,
) -> ApiResult<(Vec<OpeningRecord>, OpeningMeta)> {
    let url = opening_request(&state.config.data_go_kr_base_url, key, region, house_type).build()?;
    let doc = state.upstream.get_xml(&url).await?;

    let records = normalize_openings(&doc, &state.clock.compact_today());
    let meta = OpeningMeta {
        region: first_non_empty(region.to_string(), "전체"),
        house_type: house_type.to_string(),
        count: records.len(),
    };
    Ok((records, meta))
}

// =============================================================================
// Announcement schedules
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleFilter {
    /// Partial house name match
    pub house_name: String,
    pub area_code: String,
    /// Announcement date bounds, `YYYY-MM-DD`
    pub announce_date_start: String,
    pub announce_date_end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRecord {
    pub id: String,
    pub name: String,
    pub region: String,
    pub house_type: String,
    pub total_supply: i64,
    pub announcement_date: String,
    pub subscription_start_date: String,
    pub subscription_end_date: String,
    pub winner_announcement_date: String,
    pub contract_start_date: String,
    pub contract_end_date: String,
    pub house_manage_no: String,
    pub pblanc_no: String,
}

/// Schedules, latest announcement first
pub fn normalize_schedules(json: &Value) -> Vec<ScheduleRecord> {
    let mut records: Vec<ScheduleRecord> = odcloud_rows(json)
        .into_iter()
        .enumerate()
        .map(|(idx, item)| ScheduleRecord {
            id: format!("schedule-{}", idx),
            name: item.text(&["HOUSE_NM"]),
            region: item.text(&["SUBSCRPT_AREA_CODE_NM", "HSSPLY_ADRES"]),
            house_type: item.text(&["HOUSE_SECD_NM", "HOUSE_DTL_SECD_NM"]),
            total_supply: item.int(&["TOT_SUPLY_HSHLDCO"]),
            announcement_date: item.text(&["RCRIT_PBLANC_DE"]),
            subscription_start_date: item.text(&["RCEPT_BGNDE"]),
            subscription_end_date: item.text(&["RCEPT_ENDDE"]),
            winner_announcement_date: item.text(&["PRZWNER_PRESNATN_DE"]),
            contract_start_date: item.text(&["CNTRCT_CNCLS_BGNDE"]),
            contract_end_date: item.text(&["CNTRCT_CNCLS_ENDDE"]),
            house_manage_no: item.text(&["HOUSE_MANAGE_NO"]),
            pblanc_no: item.text(&["PBLANC_NO"]),
        })
        .collect();

    records.sort_by(|a, b| b.announcement_date.cmp(&a.announcement_date));
    records
}

pub async fn fetch_schedules(
    state: &AppState,
    key: &str,
    filter: &ScheduleFilter,
    paging: &Paging,
) -> ApiResult<(Vec<ScheduleRecord>, OdcloudPage)> {
    let url = odcloud_request(state, key, SCHEDULE_PATH, paging)
        .cond("HOUSE_NM", CondOp::Like, &filter.house_name)
        .cond("SUBSCRPT_AREA_CODE", CondOp::Eq, &filter.area_code)
        .cond("RCRIT_PBLANC_DE", CondOp::Gte, &filter.announce_date_start)
        .cond("RCRIT_PBLANC_DE", CondOp::Lte, &filter.announce_date_end)
        .build()?;
    let json = state.upstream.get_json(&url).await?;

    let records = normalize_schedules(&json);
    let page = odcloud_page(&json, paging, records.len());
    Ok((records, page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::parse::parse_xml;
    use serde_json::json;

    #[test]
    fn test_accounts_map_codes() {
        let body = json!({ "data": [
            { "DELNG_OCCRRNC_YM": "202401", "SUBSCRPT_AREA_CODE": "100", "DPST_ITEM": "04", "ACNUT_CNT": "1,200" },
            { "DELNG_OCCRRNC_YM": "202403", "SUBSCRPT_AREA_CODE": "555", "DPST_ITEM": "09" },
            { "DELNG_OCCRRNC_YM": "202402" }
        ] });

        let stats = normalize_accounts(&body);
        assert_eq!(stats[0].date, "202403");
        assert_eq!(stats[0].region, "555");
        assert_eq!(stats[0].deposit_type, "09");
        assert_eq!(stats[1].region, "전국");
        assert_eq!(stats[1].deposit_type, "");
        assert_eq!(stats[2].region, "수도권");
        assert_eq!(stats[2].deposit_type, "주택청약종합저축");
        assert_eq!(stats[2].total_accounts, 1200);
    }

    #[test]
    fn test_competition_rate() {
        assert_eq!(competition_rate(1000, 3), 333.33);
        assert_eq!(competition_rate(0, 10), 0.0);
        assert_eq!(competition_rate(5, 0), 0.0);
    }

    #[test]
    fn test_competition_sorted_and_supply_fallback() {
        let body = json!({ "data": [
            { "HOUSE_NM": "A", "TOT_SUPLY_HSHLDCO": "100", "RCEPT_CNT": "250" },
            { "BSNS_MBY_NM": "B시행", "SUPLY_HSHLDCO": "10", "RCEPT_CNT": "1,000", "HOUSE_SECD_NM": "민영" },
            { "HOUSE_NM": "C", "RCEPT_CNT": "7" }
        ] });

        let records = normalize_competition(&body);
        assert_eq!(records[0].name, "B시행");
        assert_eq!(records[0].competition_rate, 100.0);
        assert_eq!(records[0].supply_type, "민영");
        assert_eq!(records[1].name, "C");
        assert_eq!(records[1].supply_count, 1);
        assert_eq!(records[1].competition_rate, 7.0);
        assert_eq!(records[2].competition_rate, 2.5);
        assert_eq!(records[2].supply_type, "일반");
    }

    #[test]
    fn test_reception_status() {
        assert_eq!(reception_status("20240301", "2024-03-05", "2024-03-15"), "접수예정");
        assert_eq!(reception_status("20240305", "2024-03-05", "2024-03-15"), "접수중");
        assert_eq!(reception_status("20240315", "20240305", "20240315"), "접수중");
        assert_eq!(reception_status("20240316", "2024-03-05", "2024-03-15"), "마감");
    }

    #[test]
    fn test_normalize_openings() {
        let xml = r#"<response><body><items>
            <item><houseNm>래미안 원펜타스</houseNm><sidoNm>서울</sidoNm>
                  <rceptBgnde>2024-07-29</rceptBgnde><przwnerPresnatnDe>2024-08-08</przwnerPresnatnDe>
                  <totSuplyHshldco>292</totSuplyHshldco></item>
            <item><bsnsMbyNm>시행사</bsnsMbyNm><rceptBgnde>2024-09-01</rceptBgnde></item>
            <item><sidoNm>부산</sidoNm></item>
        </items></body></response>"#;

        let records = normalize_openings(&parse_xml(xml), "20240801");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "시행사");
        assert_eq!(records[0].status, "접수예정");
        assert_eq!(records[1].name, "래미안 원펜타스");
        assert_eq!(records[1].status, "접수중");
        assert_eq!(records[1].total_units, 292);
    }

    #[test]
    fn test_opening_request_skips_empty_region() {
        let url = opening_request("https://apis.data.go.kr", "k", "", "APT").build().unwrap();
        assert!(!url.query().unwrap().contains("sidoNm"));
        assert!(url.query().unwrap().contains("houseTy=APT"));
    }

    #[test]
    fn test_schedules_latest_first() {
        let body = json!({ "data": [
            { "HOUSE_NM": "가", "RCRIT_PBLANC_DE": "2024-01-10", "HSSPLY_ADRES": "서울 강남구" },
            { "HOUSE_NM": "나", "RCRIT_PBLANC_DE": "2024-02-01", "TOT_SUPLY_HSHLDCO": "500" }
        ] });

        let records = normalize_schedules(&body);
        assert_eq!(records[0].name, "나");
        assert_eq!(records[0].total_supply, 500);
        assert_eq!(records[1].region, "서울 강남구");
        assert_eq!(records[1].id, "schedule-0");
    }
}
