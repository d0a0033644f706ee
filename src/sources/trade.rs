//! Real-transaction (RTMS) sources - apartment sales and rents, officetels,
//! row houses and commercial buildings. All answer XML.

use crate::clock::Clock;
use crate::codes::{lawd_code, DEFAULT_DISTRICT};
use crate::error::{ApiError, ApiResult};
use crate::sources::param_or;
use crate::state::AppState;
use crate::upstream::parse::{FieldSource, XmlElement};
use crate::upstream::request::UpstreamRequest;
use crate::upstream::utils::format_deal_date;
use serde::Serialize;
use tracing::debug;

/// Candidate tag names per logical field, Korean first
mod fields {
    pub const DONG: &[&str] = &["법정동", "umdNm"];
    pub const JIBUN: &[&str] = &["지번", "jibun"];
    pub const AREA: &[&str] = &["전용면적", "excluUseAr"];
    pub const FLOOR: &[&str] = &["층", "floor"];
    pub const PRICE: &[&str] = &["거래금액", "dealAmount"];
    pub const YEAR: &[&str] = &["년", "dealYear"];
    pub const MONTH: &[&str] = &["월", "dealMonth"];
    pub const DAY: &[&str] = &["일", "dealDay"];
    pub const BUILT: &[&str] = &["건축년도", "buildYear"];
    pub const APT_NAME: &[&str] = &["아파트", "aptNm"];
    pub const DEPOSIT: &[&str] = &["보증금액", "deposit"];
    pub const MONTHLY_RENT: &[&str] = &["월세금액", "monthlyRent"];
    pub const BUILDING_USE: &[&str] = &["건물주용도", "buildingUse"];
    pub const BUILDING_AREA: &[&str] = &["건물면적", "bldgAr"];
    pub const LAND_AREA: &[&str] = &["대지면적", "platAr"];
}

const APT_RENT_PATH: &str = "1613000/RTMSDataSvcAptRent/getRTMSDataSvcAptRent";
const COMMERCIAL_PATH: &str = "1613000/RTMSDataSvcNrgTrade/getRTMSDataSvcNrgTrade";

/// Residential property types sharing the sale record shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeKind {
    Apartment,
    Officetel,
    House,
}

impl TradeKind {
    pub const ALL: [TradeKind; 3] = [TradeKind::Apartment, TradeKind::Officetel, TradeKind::House];

    fn path(&self) -> &'static str {
        match self {
            TradeKind::Apartment => "1613000/RTMSDataSvcAptTrade/getRTMSDataSvcAptTrade",
            TradeKind::Officetel => "1613000/RTMSDataSvcOffiTrade/getRTMSDataSvcOffiTrade",
            TradeKind::House => "1613000/RTMSDataSvcRHTrade/getRTMSDataSvcRHTrade",
        }
    }

    fn name_fields(&self) -> &'static [&'static str] {
        match self {
            TradeKind::Apartment => fields::APT_NAME,
            TradeKind::Officetel => &["단지", "offiNm"],
            TradeKind::House => &["연립다세대", "mhouseNm"],
        }
    }
}

/// District and deal month of one RTMS query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealMonth {
    pub district: String,
    pub lawd_cd: &'static str,
    pub year: String,
    pub month: String,
}

impl DealMonth {
    pub fn new(district: &str, year: &str, month: &str) -> ApiResult<Self> {
        let lawd_cd =
            lawd_code(district).ok_or_else(|| ApiError::InvalidDistrict(district.to_string()))?;

        Ok(DealMonth {
            district: district.to_string(),
            lawd_cd,
            year: year.to_string(),
            month: format!("{:0>2}", month),
        })
    }

    /// Fill in the defaults (강남구, current year and month) and validate the district
    pub fn resolve(
        district: Option<String>,
        year: Option<String>,
        month: Option<String>,
        clock: &dyn Clock,
    ) -> ApiResult<Self> {
        let district = param_or(district, || DEFAULT_DISTRICT.to_string());
        let year = param_or(year, || clock.current_year());
        let month = param_or(month, || clock.current_month());
        DealMonth::new(&district, &year, &month)
    }

    pub fn deal_ymd(&self) -> String {
        format!("{}{}", self.year, self.month)
    }

    pub fn request(&self, base: &str, path: &str, key: &str) -> UpstreamRequest {
        UpstreamRequest::new(base, path)
            .param("serviceKey", key)
            .param("LAWD_CD", self.lawd_cd)
            .param("DEAL_YMD", self.deal_ymd())
            .param("pageNo", "1")
            .param("numOfRows", "1000")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    pub id: String,
    pub name: String,
    pub district: String,
    pub dong: String,
    pub jibun: String,
    pub size: f64,
    pub floor: i64,
    pub price: i64,
    pub date: String,
    pub built: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RentRecord {
    pub id: String,
    pub name: String,
    pub district: String,
    pub dong: String,
    pub jibun: String,
    pub size: f64,
    pub floor: i64,
    pub deposit: i64,
    pub monthly_rent: i64,
    pub rent_type: String,
    pub date: String,
    pub built: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommercialTrade {
    pub id: String,
    pub name: String,
    pub district: String,
    pub dong: String,
    pub jibun: String,
    pub building_area: f64,
    pub land_area: f64,
    pub price: i64,
    pub date: String,
    pub built: i64,
}

fn deal_date(item: &XmlElement) -> String {
    format_deal_date(
        &item.text(fields::YEAR),
        &item.text(fields::MONTH),
        &item.text(fields::DAY),
    )
}

/// Sale items with a name and a price, most recent first
pub fn normalize_trades(doc: &XmlElement, kind: TradeKind, district: &str) -> Vec<TradeRecord> {
    let mut trades: Vec<TradeRecord> = doc
        .items()
        .into_iter()
        .filter(|item| {
            !item.text(kind.name_fields()).is_empty() && !item.text(fields::PRICE).is_empty()
        })
        .enumerate()
        .map(|(idx, item)| TradeRecord {
            id: format!("{}-{}", district, idx),
            name: item.text(kind.name_fields()),
            district: district.to_string(),
            dong: item.text(fields::DONG),
            jibun: item.text(fields::JIBUN),
            size: item.float(fields::AREA),
            floor: item.int(fields::FLOOR),
            price: item.int(fields::PRICE),
            date: deal_date(item),
            built: item.int(fields::BUILT),
        })
        .collect();

    sort_recent_first(&mut trades, |t| t.date.as_str());
    trades
}

/// Apartment lease items; no monthly rent means a jeonse (lump-sum deposit) lease
pub fn normalize_rents(doc: &XmlElement, district: &str) -> Vec<RentRecord> {
    let mut rents: Vec<RentRecord> = doc
        .items()
        .into_iter()
        .filter(|item| {
            !item.text(fields::APT_NAME).is_empty() && !item.text(fields::DEPOSIT).is_empty()
        })
        .enumerate()
        .map(|(idx, item)| {
            let monthly_rent = item.int(fields::MONTHLY_RENT);
            RentRecord {
                id: format!("{}-rent-{}", district, idx),
                name: item.text(fields::APT_NAME),
                district: district.to_string(),
                dong: item.text(fields::DONG),
                jibun: item.text(fields::JIBUN),
                size: item.float(fields::AREA),
                floor: item.int(fields::FLOOR),
                deposit: item.int(fields::DEPOSIT),
                monthly_rent,
                rent_type: if monthly_rent > 0 { "월세" } else { "전세" }.to_string(),
                date: deal_date(item),
                built: item.int(fields::BUILT),
            }
        })
        .collect();

    sort_recent_first(&mut rents, |r| r.date.as_str());
    rents
}

/// Commercial sales; the building use stands in for a name
pub fn normalize_commercial(doc: &XmlElement, district: &str) -> Vec<CommercialTrade> {
    let mut trades: Vec<CommercialTrade> = doc
        .items()
        .into_iter()
        .filter(|item| !item.text(fields::PRICE).is_empty())
        .enumerate()
        .map(|(idx, item)| {
            let name = item.text(fields::BUILDING_USE);
            CommercialTrade {
                id: format!("{}-{}", district, idx),
                name: if name.is_empty() { "-".to_string() } else { name },
                district: district.to_string(),
                dong: item.text(fields::DONG),
                jibun: item.text(fields::JIBUN),
                building_area: item.float(fields::BUILDING_AREA),
                land_area: item.float(fields::LAND_AREA),
                price: item.int(fields::PRICE),
                date: deal_date(item),
                built: item.int(fields::BUILT),
            }
        })
        .collect();

    sort_recent_first(&mut trades, |t| t.date.as_str());
    trades
}

fn sort_recent_first<T>(records: &mut [T], date: impl Fn(&T) -> &str) {
    records.sort_by(|a, b| date(b).cmp(date(a)));
}

pub async fn fetch_trades(
    state: &AppState,
    key: &str,
    kind: TradeKind,
    deal: &DealMonth,
) -> ApiResult<Vec<TradeRecord>> {
    let url = deal
        .request(&state.config.data_go_kr_base_url, kind.path(), key)
        .build()?;
    let doc = state.upstream.get_xml(&url).await?;

    let trades = normalize_trades(&doc, kind, &deal.district);
    debug!(
        "{:?} trades for {} {}: {}",
        kind,
        deal.district,
        deal.deal_ymd(),
        trades.len()
    );
    Ok(trades)
}

pub async fn fetch_rents(state: &AppState, key: &str, deal: &DealMonth) -> ApiResult<Vec<RentRecord>> {
    let url = deal
        .request(&state.config.data_go_kr_base_url, APT_RENT_PATH, key)
        .build()?;
    let doc = state.upstream.get_xml(&url).await?;
    Ok(normalize_rents(&doc, &deal.district))
}

pub async fn fetch_commercial(
    state: &AppState,
    key: &str,
    deal: &DealMonth,
) -> ApiResult<Vec<CommercialTrade>> {
    let url = deal
        .request(&state.config.data_go_kr_base_url, COMMERCIAL_PATH, key)
        .build()?;
    let doc = state.upstream.get_xml(&url).await?;
    Ok(normalize_commercial(&doc, &deal.district))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::codes::SEOUL_DISTRICTS;
    use crate::upstream::parse::parse_xml;
    use chrono::NaiveDate;

    const HOUSE_XML: &str = r#"<response><body><items>
        <item><mhouseNm>그린빌</mhouseNm><umdNm>역삼동</umdNm><jibun>12-3</jibun>
              <excluUseAr>59.82</excluUseAr><floor>3</floor><dealAmount>45,000</dealAmount>
              <dealYear>2024</dealYear><dealMonth>1</dealMonth><dealDay>5</dealDay><buildYear>2015</buildYear></item>
        <item><연립다세대>해피하임</연립다세대><법정동>논현동</법정동><거래금액>62,500</거래금액>
              <년>2024</년><월>1</월><일>21</일></item>
        <item><mhouseNm>가격없음</mhouseNm><dealYear>2024</dealYear></item>
        <item><dealAmount>10,000</dealAmount></item>
    </items></body></response>"#;

    #[test]
    fn test_normalize_house_trades() {
        let doc = parse_xml(HOUSE_XML);
        let trades = normalize_trades(&doc, TradeKind::House, "강남구");

        // Records without a name or price are dropped
        assert_eq!(trades.len(), 2);

        // Most recent first
        assert_eq!(trades[0].name, "해피하임");
        assert_eq!(trades[0].date, "2024-01-21");
        assert_eq!(trades[0].price, 62_500);
        assert_eq!(trades[0].size, 0.0);

        assert_eq!(trades[1].name, "그린빌");
        assert_eq!(trades[1].dong, "역삼동");
        assert_eq!(trades[1].floor, 3);
        assert_eq!(trades[1].price, 45_000);
        assert_eq!(trades[1].built, 2015);
        assert_eq!(trades[1].date, "2024-01-05");
        assert!((trades[1].size - 59.82).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_is_idempotent_on_order() {
        let doc = parse_xml(HOUSE_XML);
        let trades = normalize_trades(&doc, TradeKind::House, "강남구");

        let mut again = trades.clone();
        sort_recent_first(&mut again, |t| t.date.as_str());
        assert_eq!(again, trades);
    }

    #[test]
    fn test_records_share_key_set() {
        let doc = parse_xml(HOUSE_XML);
        let trades = normalize_trades(&doc, TradeKind::House, "강남구");

        let keys: Vec<Vec<String>> = trades
            .iter()
            .map(|t| {
                let value = serde_json::to_value(t).unwrap();
                value.as_object().unwrap().keys().cloned().collect()
            })
            .collect();
        assert!(keys.windows(2).all(|pair| pair[0] == pair[1]));
        assert!(keys[0].contains(&"price".to_string()));
    }

    #[test]
    fn test_kind_specific_names() {
        let xml = r#"<items><item><offiNm>오피스A</offiNm><aptNm>아파트B</aptNm><dealAmount>1</dealAmount></item></items>"#;
        let doc = parse_xml(xml);

        assert_eq!(normalize_trades(&doc, TradeKind::Officetel, "중구")[0].name, "오피스A");
        assert_eq!(normalize_trades(&doc, TradeKind::Apartment, "중구")[0].name, "아파트B");
        assert!(normalize_trades(&doc, TradeKind::House, "중구").is_empty());
    }

    #[test]
    fn test_normalize_rents() {
        let xml = r#"<items>
            <item><aptNm>래미안</aptNm><deposit>50,000</deposit><monthlyRent>0</monthlyRent>
                  <dealYear>2024</dealYear><dealMonth>2</dealMonth><dealDay>1</dealDay></item>
            <item><aptNm>자이</aptNm><deposit>5,000</deposit><monthlyRent>120</monthlyRent>
                  <dealYear>2024</dealYear><dealMonth>2</dealMonth><dealDay>9</dealDay></item>
        </items>"#;
        let rents = normalize_rents(&parse_xml(xml), "서초구");

        assert_eq!(rents.len(), 2);
        assert_eq!(rents[0].name, "자이");
        assert_eq!(rents[0].rent_type, "월세");
        assert_eq!(rents[0].monthly_rent, 120);
        assert_eq!(rents[1].rent_type, "전세");
        assert_eq!(rents[1].deposit, 50_000);
    }

    #[test]
    fn test_normalize_commercial_defaults_name() {
        let xml = r#"<items>
            <item><dealAmount>300,000</dealAmount><bldgAr>120.5</bldgAr><platAr>80</platAr>
                  <dealYear>2024</dealYear><dealMonth>3</dealMonth><dealDay>2</dealDay></item>
            <item><buildingUse>업무</buildingUse><dealAmount></dealAmount></item>
        </items>"#;
        let trades = normalize_commercial(&parse_xml(xml), "마포구");

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].name, "-");
        assert_eq!(trades[0].price, 300_000);
        assert!((trades[0].building_area - 120.5).abs() < 1e-9);
        assert_eq!(trades[0].land_area, 80.0);
    }

    #[test]
    fn test_deal_month_defaults_from_clock() {
        let clock = FixedClock(NaiveDate::from_ymd_opt(2024, 7, 3).unwrap());
        let deal = DealMonth::resolve(None, None, Some("".into()), &clock).unwrap();

        assert_eq!(deal.district, "강남구");
        assert_eq!(deal.lawd_cd, "11680");
        assert_eq!(deal.deal_ymd(), "202407");
    }

    #[test]
    fn test_deal_month_rejects_unknown_district() {
        let result = DealMonth::new("없는구", "2024", "01");
        assert!(matches!(result, Err(ApiError::InvalidDistrict(d)) if d == "없는구"));
    }

    #[test]
    fn test_request_carries_lawd_code_for_every_district() {
        for (district, code) in SEOUL_DISTRICTS {
            let deal = DealMonth::new(district, "2024", "1").unwrap();
            let url = deal
                .request("https://apis.data.go.kr", TradeKind::Apartment.path(), "k")
                .build()
                .unwrap();

            let lawd: Vec<_> = url
                .query_pairs()
                .filter(|(k, _)| k == "LAWD_CD")
                .map(|(_, v)| v.into_owned())
                .collect();
            assert_eq!(lawd, vec![code.to_string()]);
            assert!(url.query().unwrap().contains("DEAL_YMD=202401"));
        }
    }
}
