//! HTTP surface: route table, success envelope and handlers

pub mod envelope;
pub mod handlers;

use crate::state::AppState;
use axum::routing::get;
use axum::Router;
use handlers::*;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/api/health", get(health_check))
        // Real transactions
        .route("/api/trade/apartment", get(apartment_trades))
        .route("/api/trade/officetel", get(officetel_trades))
        .route("/api/trade/house", get(house_trades))
        .route("/api/trade/commercial", get(commercial_trades))
        // Address, building, area
        .route("/api/address/dong", get(dong_list))
        .route("/api/building/register", get(building_register))
        .route("/api/building/energy", get(building_energy))
        .route("/api/area/population", get(area_population))
        .route("/api/area/school", get(area_school))
        // Land, statistics, complexes
        .route("/api/land/price-change", get(land_price_change))
        .route("/api/stats/price", get(stats_price))
        .route("/api/complex/info", get(complex_info))
        // Subscription
        .route("/api/subscription/account", get(subscription_account))
        .route("/api/subscription/competition", get(subscription_competition))
        .route("/api/subscription/info", get(subscription_info))
        .route("/api/subscription/schedule", get(subscription_schedule))
        // Dashboard aggregations
        .route("/api/market/listing", get(market_listing))
        .route("/api/market/volume", get(market_volume))
        .route("/api/market/price", get(market_price))
        .route("/api/trend/ratio", get(trend_ratio))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
