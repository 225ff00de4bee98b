use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use tradedesk_market_data::OptionChain;

use super::required_param;
use crate::error::ApiResult;
use crate::main_lib::AppState;
use crate::models::{ApiResponse, OptionChainQuery};

async fn get_option_chain(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OptionChainQuery>,
) -> ApiResult<Json<ApiResponse<OptionChain>>> {
    let symbol = required_param(query.symbol, "symbol")?;
    let chain = state
        .market
        .option_chain(&symbol, query.date.as_deref())
        .await?;
    Ok(ApiResponse::ok(chain))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/option-chain", get(get_option_chain))
}
