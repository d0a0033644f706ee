//! Building register (title section) and monthly building energy usage

use crate::error::{ApiError, ApiResult};
use crate::sources::param_or;
use crate::state::AppState;
use crate::upstream::fanout::fan_out;
use crate::upstream::parse::{FieldSource, XmlElement};
use crate::upstream::request::UpstreamRequest;
use crate::upstream::utils::parse_float;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

const REGISTER_PATH: &str = "1613000/BldRgstHubService/getBrTitleInfo";
const ELECTRICITY_PATH: &str = "1613000/BldEngyHubService/getBeElctyUsgInfo";
const GAS_PATH: &str = "1613000/BldEngyHubService/getBeGasUsgInfo";

/// A parcel: sigungu + legal-dong code, with optional main/sub lot numbers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parcel {
    pub sigungu_cd: String,
    pub bjdong_cd: String,
    pub bun: String,
    pub ji: String,
}

impl Parcel {
    pub fn resolve(
        sigungu_cd: Option<String>,
        bjdong_cd: Option<String>,
        bun: Option<String>,
        ji: Option<String>,
    ) -> ApiResult<Self> {
        let parcel = Parcel {
            sigungu_cd: param_or(sigungu_cd, String::new),
            bjdong_cd: param_or(bjdong_cd, String::new),
            bun: param_or(bun, String::new),
            ji: param_or(ji, String::new),
        };

        if parcel.sigungu_cd.is_empty() || parcel.bjdong_cd.is_empty() {
            return Err(ApiError::MissingParameters(
                "시군구코드와 법정동코드는 필수입니다.",
            ));
        }
        Ok(parcel)
    }

    fn request(&self, base: &str, path: &str, key: &str) -> UpstreamRequest {
        UpstreamRequest::new(base, path)
            .param("serviceKey", key)
            .param("sigunguCd", self.sigungu_cd.as_str())
            .param("bjdongCd", self.bjdong_cd.as_str())
            .param("bun", self.bun.as_str())
            .param("ji", self.ji.as_str())
    }
}

// =============================================================================
// Register
// =============================================================================

/// Register title record; values are passed through as the register prints them
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingRecord {
    pub id: String,
    pub name: String,
    pub main_purpose: String,
    pub structure: String,
    pub ground_floors: String,
    pub under_floors: String,
    pub total_area: String,
    pub building_area: String,
    pub land_area: String,
    pub approval_date: String,
    pub address: String,
}

pub fn normalize_register(doc: &XmlElement) -> Vec<BuildingRecord> {
    doc.items()
        .into_iter()
        .enumerate()
        .map(|(idx, item)| BuildingRecord {
            id: format!("building-{}", idx),
            name: item.text(&["건물명", "bldNm"]),
            main_purpose: item.text(&["주용도코드명", "mainPurpsCdNm"]),
            structure: item.text(&["구조코드명", "strctCdNm"]),
            ground_floors: item.text(&["지상층수", "grndFlrCnt"]),
            under_floors: item.text(&["지하층수", "ugrndFlrCnt"]),
            total_area: item.text(&["연면적", "totArea"]),
            building_area: item.text(&["건축면적", "archArea"]),
            land_area: item.text(&["대지면적", "platArea"]),
            approval_date: item.text(&["사용승인일", "useAprDay"]),
            address: item.text(&["대지위치", "platPlc"]),
        })
        .collect()
}

pub async fn fetch_register(
    state: &AppState,
    key: &str,
    parcel: &Parcel,
) -> ApiResult<Vec<BuildingRecord>> {
    let url = parcel
        .request(&state.config.data_go_kr_base_url, REGISTER_PATH, key)
        .param("platGbCd", "0")
        .param("numOfRows", "10")
        .param("pageNo", "1")
        .build()?;

    let doc = state.upstream.get_xml(&url).await?;
    Ok(normalize_register(&doc))
}

// =============================================================================
// Energy
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyKind {
    Electricity,
    Gas,
}

impl EnergyKind {
    fn path(&self) -> &'static str {
        match self {
            EnergyKind::Electricity => ELECTRICITY_PATH,
            EnergyKind::Gas => GAS_PATH,
        }
    }
}

/// Usage reading of one building for one kind and month
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyReading {
    pub kind: EnergyKind,
    pub year_month: String,
    pub usage: String,
    pub address: String,
}

/// First item of an energy response, if the month has data
pub fn normalize_reading(doc: &XmlElement, kind: EnergyKind, year_month: &str) -> Option<EnergyReading> {
    let item = doc.items().into_iter().next()?;

    Some(EnergyReading {
        kind,
        year_month: year_month.to_string(),
        usage: item.text(&["useQty"]),
        address: item.text(&["platPlc"]),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyRecord {
    pub id: String,
    pub address: String,
    pub use_year: String,
    pub use_month: String,
    pub elec_usage: String,
    pub gas_usage: String,
    pub heat_usage: String,
    /// Electricity + gas, two decimals
    pub total_energy: String,
}

#[derive(Debug, Default)]
struct MonthUsage {
    elec: Option<String>,
    gas: Option<String>,
    address: String,
}

/// Merge readings by month, ascending. A month appears once either kind has
/// data; the missing kind reads "0".
pub fn merge_energy(readings: Vec<EnergyReading>) -> Vec<EnergyRecord> {
    let mut by_month: BTreeMap<String, MonthUsage> = BTreeMap::new();

    for reading in readings {
        let entry = by_month.entry(reading.year_month).or_default();
        let usage = if reading.usage.is_empty() {
            "0".to_string()
        } else {
            reading.usage
        };

        match reading.kind {
            EnergyKind::Electricity => entry.elec = Some(usage),
            EnergyKind::Gas => entry.gas = Some(usage),
        }
        if !reading.address.is_empty() {
            entry.address = reading.address;
        }
    }

    by_month
        .into_iter()
        .enumerate()
        .map(|(idx, (ym, usage))| {
            let elec = usage.elec.unwrap_or_else(|| "0".to_string());
            let gas = usage.gas.unwrap_or_else(|| "0".to_string());
            let total = parse_float(&elec) + parse_float(&gas);

            EnergyRecord {
                id: format!("energy-{}", idx),
                address: usage.address,
                use_year: ym.get(..4).unwrap_or_default().to_string(),
                use_month: ym.get(4..6).unwrap_or_default().to_string(),
                elec_usage: elec,
                gas_usage: gas,
                heat_usage: "0".to_string(),
                total_energy: format!("{:.2}", total),
            }
        })
        .collect()
}

/// `YYYY01` through `YYYY12`
pub fn year_months(year: &str) -> Vec<String> {
    (1..=12).map(|m| format!("{}{:02}", year, m)).collect()
}

/// Electricity and gas for every month of `year`, fetched in batches.
/// A month whose call failed simply has no reading.
pub async fn fetch_energy(
    state: &AppState,
    key: &str,
    parcel: &Parcel,
    year: &str,
) -> Vec<EnergyRecord> {
    let axes: Vec<(EnergyKind, String)> = year_months(year)
        .into_iter()
        .flat_map(|ym| [(EnergyKind::Electricity, ym.clone()), (EnergyKind::Gas, ym)])
        .collect();

    let settled = fan_out(axes, state.batching(), |(kind, ym)| async move {
        let url = parcel
            .request(&state.config.data_go_kr_base_url, kind.path(), key)
            .param("useYm", ym.as_str())
            .param("numOfRows", "1")
            .param("pageNo", "1")
            .build()?;
        let doc = state.upstream.get_xml(&url).await?;
        Ok::<_, ApiError>(normalize_reading(&doc, kind, &ym))
    })
    .await;

    let readings: Vec<EnergyReading> = settled
        .into_iter()
        .filter_map(|(_, reading)| reading.flatten())
        .collect();

    info!(
        "Energy usage for {}-{} {}: {} readings",
        parcel.sigungu_cd,
        parcel.bjdong_cd,
        year,
        readings.len()
    );
    merge_energy(readings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::parse::parse_xml;

    fn reading(kind: EnergyKind, ym: &str, usage: &str, address: &str) -> EnergyReading {
        EnergyReading {
            kind,
            year_month: ym.into(),
            usage: usage.into(),
            address: address.into(),
        }
    }

    #[test]
    fn test_parcel_requires_codes() {
        let err = Parcel::resolve(Some("11680".into()), None, None, None).unwrap_err();
        assert!(matches!(err, ApiError::MissingParameters(_)));
        assert_eq!(err.message(), "시군구코드와 법정동코드는 필수입니다.");

        let parcel = Parcel::resolve(Some("11680".into()), Some("10300".into()), None, None).unwrap();
        assert_eq!(parcel.bun, "");
    }

    #[test]
    fn test_normalize_register() {
        let xml = r#"<response><body><items><item>
            <bldNm>테스트빌딩</bldNm><mainPurpsCdNm>업무시설</mainPurpsCdNm>
            <grndFlrCnt>12</grndFlrCnt><ugrndFlrCnt>3</ugrndFlrCnt>
            <totArea>15234.5</totArea><useAprDay>20050312</useAprDay>
            <platPlc>서울특별시 강남구 개포동 12</platPlc>
        </item></items></body></response>"#;

        let records = normalize_register(&parse_xml(xml));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "building-0");
        assert_eq!(records[0].name, "테스트빌딩");
        assert_eq!(records[0].ground_floors, "12");
        assert_eq!(records[0].structure, "");
        assert_eq!(records[0].approval_date, "20050312");
    }

    #[test]
    fn test_merge_electricity_and_gas() {
        let merged = merge_energy(vec![
            reading(EnergyKind::Gas, "202401", "300.456", ""),
            reading(EnergyKind::Electricity, "202401", "1200.5", "서울 강남구 개포동 12"),
        ]);

        assert_eq!(merged.len(), 1);
        let jan = &merged[0];
        assert_eq!(jan.use_year, "2024");
        assert_eq!(jan.use_month, "01");
        assert_eq!(jan.elec_usage, "1200.5");
        assert_eq!(jan.gas_usage, "300.456");
        assert_eq!(jan.heat_usage, "0");
        assert_eq!(jan.total_energy, "1500.96");
        assert_eq!(jan.address, "서울 강남구 개포동 12");
    }

    #[test]
    fn test_merge_orders_months_and_zeroes_missing_kind() {
        let merged = merge_energy(vec![
            reading(EnergyKind::Electricity, "202403", "10", ""),
            reading(EnergyKind::Gas, "202401", "", ""),
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].use_month, "01");
        assert_eq!(merged[0].elec_usage, "0");
        assert_eq!(merged[0].gas_usage, "0");
        assert_eq!(merged[0].total_energy, "0.00");
        assert_eq!(merged[1].id, "energy-1");
        assert_eq!(merged[1].gas_usage, "0");
        assert_eq!(merged[1].total_energy, "10.00");
    }

    #[test]
    fn test_normalize_reading_takes_first_item() {
        let xml = "<items><item><useQty>5</useQty></item><item><useQty>9</useQty></item></items>";
        let found = normalize_reading(&parse_xml(xml), EnergyKind::Gas, "202402").unwrap();
        assert_eq!(found.usage, "5");

        assert_eq!(normalize_reading(&parse_xml("<items/>"), EnergyKind::Gas, "202402"), None);
    }

    #[test]
    fn test_year_months() {
        let months = year_months("2023");
        assert_eq!(months.len(), 12);
        assert_eq!(months[0], "202301");
        assert_eq!(months[11], "202312");
    }
}
