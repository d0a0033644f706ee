//! Fixed lookup tables for administrative codes and region names

/// Seoul districts and their LAWD (legal-dong, 5 digit sigungu) codes
pub const SEOUL_DISTRICTS: [(&str, &str); 25] = [
    ("강남구", "11680"),
    ("강동구", "11740"),
    ("강북구", "11305"),
    ("강서구", "11500"),
    ("관악구", "11620"),
    ("광진구", "11215"),
    ("구로구", "11530"),
    ("금천구", "11545"),
    ("노원구", "11350"),
    ("도봉구", "11320"),
    ("동대문구", "11230"),
    ("동작구", "11590"),
    ("마포구", "11440"),
    ("서대문구", "11410"),
    ("서초구", "11650"),
    ("성동구", "11200"),
    ("성북구", "11290"),
    ("송파구", "11710"),
    ("양천구", "11470"),
    ("영등포구", "11560"),
    ("용산구", "11170"),
    ("은평구", "11380"),
    ("종로구", "11110"),
    ("중구", "11140"),
    ("중랑구", "11260"),
];

pub const DEFAULT_DISTRICT: &str = "강남구";

/// LAWD code for a Seoul district name
pub fn lawd_code(district: &str) -> Option<&'static str> {
    SEOUL_DISTRICTS
        .iter()
        .find(|(name, _)| *name == district)
        .map(|(_, code)| *code)
}

pub fn district_names() -> impl Iterator<Item = &'static str> {
    SEOUL_DISTRICTS.iter().map(|(name, _)| *name)
}

/// Region names (CLS_NM) published in the R-ONE price index tables
pub const RONE_REGIONS: [&str; 20] = [
    "전국", "수도권", "서울", "경기", "인천", "지방", "부산", "대구", "광주", "대전", "울산",
    "세종", "강원", "충북", "충남", "전북", "전남", "경북", "경남", "제주",
];

pub const DEFAULT_RONE_REGION: &str = "서울";

pub fn is_rone_region(region: &str) -> bool {
    RONE_REGIONS.contains(&region)
}

/// Provinces shown on the nationwide price overview
pub const OVERVIEW_REGIONS: [&str; 17] = [
    "서울", "경기", "인천", "부산", "대구", "광주", "대전", "울산", "세종", "강원", "충북",
    "충남", "전북", "전남", "경북", "경남", "제주",
];

/// Default regions of the jeonse ratio trend
pub const RATIO_TREND_REGIONS: [&str; 5] = ["서울", "경기", "인천", "부산", "대구"];

/// Default districts of the trade volume trend
pub const VOLUME_DISTRICTS: [&str; 5] = ["강남구", "서초구", "송파구", "마포구", "용산구"];

/// Subscription area code -> label
pub fn subscription_area(code: &str) -> Option<&'static str> {
    match code {
        "100" => Some("수도권"),
        "400" => Some("대전/충청"),
        "700" => Some("부산/영남"),
        "900" => Some("광주/호남"),
        _ => None,
    }
}

/// Subscription deposit item code -> label
pub fn deposit_type(code: &str) -> Option<&'static str> {
    match code {
        "01" => Some("청약저축"),
        "02" => Some("청약예금"),
        "03" => Some("청약부금"),
        "04" => Some("주택청약종합저축"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_district_maps_to_seoul_code() {
        for name in district_names() {
            let code = lawd_code(name).unwrap();
            assert_eq!(code.len(), 5);
            assert!(code.starts_with("11"), "{} -> {}", name, code);
        }
    }

    #[test]
    fn test_unknown_district() {
        assert_eq!(lawd_code("없는구"), None);
        assert_eq!(lawd_code(""), None);
        assert_eq!(lawd_code("강남"), None);
    }

    #[test]
    fn test_known_codes() {
        assert_eq!(lawd_code("강남구"), Some("11680"));
        assert_eq!(lawd_code("중구"), Some("11140"));
    }

    #[test]
    fn test_overview_regions_are_rone_regions() {
        for region in OVERVIEW_REGIONS.iter().chain(RATIO_TREND_REGIONS.iter()) {
            assert!(is_rone_region(region));
        }
        assert!(!is_rone_region("서울시"));
    }

    #[test]
    fn test_code_labels() {
        assert_eq!(subscription_area("700"), Some("부산/영남"));
        assert_eq!(subscription_area("999"), None);
        assert_eq!(deposit_type("04"), Some("주택청약종합저축"));
    }
}
