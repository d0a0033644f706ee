//! HTTP handlers - resolve query defaults, check the credential, validate,
//! then hand off to a source or a dashboard aggregation.
//!
//! The credential check always comes before input validation.

use crate::api::envelope::Envelope;
use crate::codes::{DEFAULT_RONE_REGION, VOLUME_DISTRICTS};
use crate::config::Credential;
use crate::dashboard;
use crate::error::ApiResult;
use crate::sources::address::fetch_dongs;
use crate::sources::building::{fetch_energy, fetch_register, Parcel};
use crate::sources::complex::{fetch_complexes, ComplexFilter};
use crate::sources::land::{fetch_land_prices, resolve_year_month};
use crate::sources::population::{fetch_population, DEFAULT_ADMM_CD};
use crate::sources::school::fetch_schools;
use crate::sources::stats::{fetch_price_indices, validate_region};
use crate::sources::subscription::{
    fetch_accounts, fetch_competition, fetch_openings, fetch_schedules, AccountFilter,
    CompetitionFilter, ScheduleFilter,
};
use crate::sources::trade::{fetch_commercial, fetch_rents, fetch_trades, DealMonth, TradeKind};
use crate::sources::{param, param_or, Paging};
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct ApiResponse {
    message: String,
    status: String,
}

pub async fn health_check() -> Json<ApiResponse> {
    Json(ApiResponse {
        message: "KR estate API is running!".to_string(),
        status: "ok".to_string(),
    })
}

// =============================================================================
// Trades
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct TradeQuery {
    district: Option<String>,
    year: Option<String>,
    month: Option<String>,
    /// `sale` (default) or `rent`, apartments only
    #[serde(rename = "type")]
    trade_type: Option<String>,
}

/// Query echo of the trade endpoints
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealMeta {
    district: String,
    year: String,
    month: String,
    count: usize,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    trade_type: Option<&'static str>,
}

impl DealMeta {
    fn new(deal: &DealMonth, count: usize) -> Self {
        DealMeta {
            district: deal.district.clone(),
            year: deal.year.clone(),
            month: deal.month.clone(),
            count,
            trade_type: None,
        }
    }
}

fn resolve_deal(state: &AppState, query: TradeQuery) -> ApiResult<DealMonth> {
    DealMonth::resolve(query.district, query.year, query.month, state.clock.as_ref())
}

pub async fn apartment_trades(
    State(state): State<AppState>,
    Query(query): Query<TradeQuery>,
) -> ApiResult<Response> {
    let key = state.require(Credential::DataGoKr)?;
    let rent = param(query.trade_type.clone()) == "rent";
    let deal = resolve_deal(&state, query)?;

    if rent {
        let rents = fetch_rents(&state, key, &deal).await?;
        let meta = DealMeta {
            trade_type: Some("rent"),
            ..DealMeta::new(&deal, rents.len())
        };
        Ok(Envelope::with_meta(rents, meta).into_response())
    } else {
        let trades = fetch_trades(&state, key, TradeKind::Apartment, &deal).await?;
        let meta = DealMeta {
            trade_type: Some("sale"),
            ..DealMeta::new(&deal, trades.len())
        };
        Ok(Envelope::with_meta(trades, meta).into_response())
    }
}

async fn residential_trades(state: AppState, query: TradeQuery, kind: TradeKind) -> ApiResult<Response> {
    let key = state.require(Credential::DataGoKr)?;
    let deal = resolve_deal(&state, query)?;

    let trades = fetch_trades(&state, key, kind, &deal).await?;
    let meta = DealMeta::new(&deal, trades.len());
    Ok(Envelope::with_meta(trades, meta).into_response())
}

pub async fn officetel_trades(
    State(state): State<AppState>,
    Query(query): Query<TradeQuery>,
) -> ApiResult<Response> {
    residential_trades(state, query, TradeKind::Officetel).await
}

pub async fn house_trades(
    State(state): State<AppState>,
    Query(query): Query<TradeQuery>,
) -> ApiResult<Response> {
    residential_trades(state, query, TradeKind::House).await
}

pub async fn commercial_trades(
    State(state): State<AppState>,
    Query(query): Query<TradeQuery>,
) -> ApiResult<Response> {
    let key = state.require(Credential::DataGoKr)?;
    let deal = resolve_deal(&state, query)?;

    let trades = fetch_commercial(&state, key, &deal).await?;
    let meta = DealMeta::new(&deal, trades.len());
    Ok(Envelope::with_meta(trades, meta).into_response())
}

// =============================================================================
// Address, building, area
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct DistrictQuery {
    district: Option<String>,
}

pub async fn dong_list(
    State(state): State<AppState>,
    Query(query): Query<DistrictQuery>,
) -> ApiResult<Response> {
    let key = state.require(Credential::DataGoKr)?;
    let district = param_or(query.district, || crate::codes::DEFAULT_DISTRICT.to_string());

    let (dongs, meta) = fetch_dongs(&state, key, &district).await?;
    Ok(Envelope::with_meta(dongs, meta).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParcelQuery {
    sigungu_cd: Option<String>,
    bjdong_cd: Option<String>,
    bun: Option<String>,
    ji: Option<String>,
    year: Option<String>,
}

pub async fn building_register(
    State(state): State<AppState>,
    Query(query): Query<ParcelQuery>,
) -> ApiResult<Response> {
    let key = state.require(Credential::DataGoKr)?;
    let parcel = Parcel::resolve(query.sigungu_cd, query.bjdong_cd, query.bun, query.ji)?;

    let records = fetch_register(&state, key, &parcel).await?;
    Ok(Envelope::new(records).into_response())
}

pub async fn building_energy(
    State(state): State<AppState>,
    Query(query): Query<ParcelQuery>,
) -> ApiResult<Response> {
    let key = state.require(Credential::DataGoKr)?;
    let year = param_or(query.year, || state.clock.current_year());
    let parcel = Parcel::resolve(query.sigungu_cd, query.bjdong_cd, query.bun, query.ji)?;

    let records = fetch_energy(&state, key, &parcel, &year).await;
    Ok(Envelope::new(records).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationQuery {
    ym: Option<String>,
    admm_cd: Option<String>,
}

pub async fn area_population(
    State(state): State<AppState>,
    Query(query): Query<PopulationQuery>,
) -> ApiResult<Response> {
    let key = state.require(Credential::DataGoKr)?;
    let ym = param_or(query.ym, || state.clock.previous_year_month());
    let admm_cd = param_or(query.admm_cd, || DEFAULT_ADMM_CD.to_string());

    let (records, meta) = fetch_population(&state, key, &admm_cd, &ym).await?;
    Ok(Envelope::with_meta(records, meta).into_response())
}

pub async fn area_school(State(state): State<AppState>) -> ApiResult<Response> {
    let key = state.require(Credential::Neis)?;

    let (records, meta) = fetch_schools(&state, key).await?;
    Ok(Envelope::with_meta(records, meta).into_response())
}

// =============================================================================
// Land, statistics, complexes
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandQuery {
    year_month: Option<String>,
    year: Option<String>,
    region_code: Option<String>,
    region: Option<String>,
    page: Option<String>,
    per_page: Option<String>,
}

pub async fn land_price_change(
    State(state): State<AppState>,
    Query(query): Query<LandQuery>,
) -> ApiResult<Response> {
    let key = state.require(Credential::DataGoKr)?;
    let year_month = resolve_year_month(query.year_month, query.year, state.clock.as_ref());
    let region_code = param_or(query.region_code, || param(query.region));
    let paging = Paging::resolve(query.page, query.per_page);

    let (records, meta) = fetch_land_prices(&state, key, &year_month, &region_code, &paging).await?;
    Ok(Envelope::with_meta(records, meta).into_response())
}

#[derive(Debug, Deserialize)]
pub struct RegionYearQuery {
    region: Option<String>,
    year: Option<String>,
}

pub async fn stats_price(
    State(state): State<AppState>,
    Query(query): Query<RegionYearQuery>,
) -> ApiResult<Response> {
    let key = state.require(Credential::Rone)?;
    let region = param_or(query.region, || DEFAULT_RONE_REGION.to_string());
    let year = param_or(query.year, || state.clock.current_year());
    validate_region(&region)?;

    let (records, meta) = fetch_price_indices(&state, key, &region, &year).await?;
    Ok(Envelope::with_meta(records, meta).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexQuery {
    complex_pk: Option<String>,
    address: Option<String>,
    approval_date_start: Option<String>,
    approval_date_end: Option<String>,
    page: Option<String>,
    per_page: Option<String>,
}

pub async fn complex_info(
    State(state): State<AppState>,
    Query(query): Query<ComplexQuery>,
) -> ApiResult<Response> {
    let key = state.require(Credential::DataGoKr)?;
    let filter = ComplexFilter {
        complex_pk: param(query.complex_pk),
        address: param(query.address),
        approval_date_start: param(query.approval_date_start),
        approval_date_end: param(query.approval_date_end),
    };
    let paging = Paging::resolve(query.page, query.per_page);

    let (records, page) = fetch_complexes(&state, key, &filter, &paging).await?;
    Ok(Envelope::with_meta(records, page).into_response())
}

// =============================================================================
// Subscription
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountQuery {
    year_month: Option<String>,
    area_code: Option<String>,
    deposit_item: Option<String>,
    page: Option<String>,
    per_page: Option<String>,
}

pub async fn subscription_account(
    State(state): State<AppState>,
    Query(query): Query<AccountQuery>,
) -> ApiResult<Response> {
    let key = state.require(Credential::DataGoKr)?;
    let filter = AccountFilter {
        year_month: param(query.year_month),
        area_code: param(query.area_code),
        deposit_item: param(query.deposit_item),
    };
    let paging = Paging::resolve(query.page, query.per_page);

    let (records, page) = fetch_accounts(&state, key, &filter, &paging).await?;
    Ok(Envelope::with_meta(records, page).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitionQuery {
    house_manage_no: Option<String>,
    pblanc_no: Option<String>,
    reside_secd: Option<String>,
    page: Option<String>,
    per_page: Option<String>,
}

pub async fn subscription_competition(
    State(state): State<AppState>,
    Query(query): Query<CompetitionQuery>,
) -> ApiResult<Response> {
    let key = state.require(Credential::DataGoKr)?;
    let filter = CompetitionFilter {
        house_manage_no: param(query.house_manage_no),
        pblanc_no: param(query.pblanc_no),
        reside_secd: param(query.reside_secd),
    };
    let paging = Paging::resolve(query.page, query.per_page);

    let (records, page) = fetch_competition(&state, key, &filter, &paging).await?;
    Ok(Envelope::with_meta(records, page).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningQuery {
    region: Option<String>,
    house_type: Option<String>,
}

pub async fn subscription_info(
    State(state): State<AppState>,
    Query(query): Query<OpeningQuery>,
) -> ApiResult<Response> {
    let key = state.require(Credential::DataGoKr)?;
    let region = param(query.region);
    let house_type = param_or(query.house_type, || "APT".to_string());

    let (records, meta) = fetch_openings(&state, key, &region, &house_type).await?;
    Ok(Envelope::with_meta(records, meta).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleQuery {
    house_name: Option<String>,
    area_code: Option<String>,
    announce_date_start: Option<String>,
    announce_date_end: Option<String>,
    page: Option<String>,
    per_page: Option<String>,
}

pub async fn subscription_schedule(
    State(state): State<AppState>,
    Query(query): Query<ScheduleQuery>,
) -> ApiResult<Response> {
    let key = state.require(Credential::DataGoKr)?;
    let filter = ScheduleFilter {
        house_name: param(query.house_name),
        area_code: param(query.area_code),
        announce_date_start: param(query.announce_date_start),
        announce_date_end: param(query.announce_date_end),
    };
    let paging = Paging::resolve(query.page, query.per_page);

    let (records, page) = fetch_schedules(&state, key, &filter, &paging).await?;
    Ok(Envelope::with_meta(records, page).into_response())
}

// =============================================================================
// Dashboard aggregations
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    /// Comma separated district names; all of Seoul when absent
    districts: Option<String>,
    year: Option<String>,
    month: Option<String>,
}

pub async fn market_listing(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> ApiResult<Response> {
    let key = state.require(Credential::DataGoKr)?;
    let all: Vec<&str> = crate::codes::district_names().collect();
    let districts = dashboard::parse_districts(&param(query.districts), &all)?;
    let year = param_or(query.year, || state.clock.current_year());
    let month = param_or(query.month, || state.clock.current_month());

    let (summaries, meta) = dashboard::market_listing(&state, key, &districts, &year, &month).await?;
    Ok(Envelope::with_meta(summaries, meta).into_response())
}

#[derive(Debug, Deserialize)]
pub struct VolumeQuery {
    districts: Option<String>,
    year: Option<String>,
}

pub async fn market_volume(
    State(state): State<AppState>,
    Query(query): Query<VolumeQuery>,
) -> ApiResult<Response> {
    let key = state.require(Credential::DataGoKr)?;
    let districts = dashboard::parse_districts(&param(query.districts), &VOLUME_DISTRICTS)?;
    let year = param_or(query.year, || state.clock.current_year());

    let (records, meta) = dashboard::market_volume(&state, key, &districts, &year).await?;
    Ok(Envelope::with_meta(records, meta).into_response())
}

#[derive(Debug, Deserialize)]
pub struct YearQuery {
    year: Option<String>,
}

pub async fn market_price(
    State(state): State<AppState>,
    Query(query): Query<YearQuery>,
) -> ApiResult<Response> {
    let key = state.require(Credential::Rone)?;
    let year = param_or(query.year, || state.clock.current_year());

    let (prices, meta) = dashboard::market_price(&state, key, &year).await?;
    Ok(Envelope::with_meta(prices, meta).into_response())
}

pub async fn trend_ratio(
    State(state): State<AppState>,
    Query(query): Query<YearQuery>,
) -> ApiResult<Response> {
    let key = state.require(Credential::Rone)?;
    let year = param_or(query.year, || state.clock.current_year());

    let (trends, meta) = dashboard::trend_ratio(&state, key, &year).await?;
    Ok(Envelope::with_meta(trends, meta).into_response())
}
