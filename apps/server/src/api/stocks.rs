use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use tradedesk_market_data::{
    CombinedSnapshot, Exchange, ExchangeDashboard, HistoryPeriod, HistorySeries, QuoteView,
    SearchHit,
};

use super::required_param;
use crate::error::ApiResult;
use crate::main_lib::AppState;
use crate::models::{ApiResponse, ExchangeQuery, HistoryQuery, QuoteQuery, SearchQuery};

async fn get_quote(
    State(state): State<Arc<AppState>>,
    Query(query): Query<QuoteQuery>,
) -> ApiResult<Json<ApiResponse<QuoteView>>> {
    let symbol = required_param(query.symbol, "symbol")?;
    let exchange = Exchange::from_param(query.exchange.as_deref());
    let quote = state.market.quote(&symbol, exchange).await?;
    Ok(ApiResponse::ok(quote))
}

async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<ApiResponse<Vec<SearchHit>>>> {
    let q = required_param(query.q, "q")?;
    let exchange = Exchange::from_param(query.exchange.as_deref());
    let hits = state.market.search(&q, exchange).await?;
    Ok(ApiResponse::ok(hits))
}

async fn get_indices(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExchangeQuery>,
) -> Json<ApiResponse<ExchangeDashboard>> {
    let exchange = Exchange::from_param(query.exchange.as_deref());
    ApiResponse::ok(state.market.exchange_dashboard(exchange).await)
}

async fn get_market(State(state): State<Arc<AppState>>) -> Json<ApiResponse<CombinedSnapshot>> {
    ApiResponse::ok(state.market.combined_snapshot().await)
}

async fn get_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<ApiResponse<HistorySeries>>> {
    let symbol = required_param(query.symbol, "symbol")?;
    let period = HistoryPeriod::from_param(query.period.as_deref());
    let exchange = Exchange::from_param(query.exchange.as_deref());
    let series = state.market.history(&symbol, period, exchange).await?;
    Ok(ApiResponse::ok(series))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stocks/quote", get(get_quote))
        .route("/stocks/search", get(search))
        .route("/stocks/indices", get(get_indices))
        .route("/stocks/market", get(get_market))
        .route("/stocks/history", get(get_history))
}
