use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};

use super::required_param;
use crate::error::ApiResult;
use crate::main_lib::AppState;
use crate::models::{
    ApiResponse, OtpSendRequest, OtpSendResponse, OtpVerifyRequest, OtpVerifyResponse,
};

async fn send_otp(
    State(state): State<Arc<AppState>>,
    Json(body): Json<OtpSendRequest>,
) -> ApiResult<Json<ApiResponse<OtpSendResponse>>> {
    let phone = required_param(body.phone, "phone")?;
    let valid_for = state.otp.send_code(&phone).await?;
    Ok(ApiResponse::ok(OtpSendResponse {
        expires_in_secs: valid_for.as_secs(),
    }))
}

async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Json(body): Json<OtpVerifyRequest>,
) -> ApiResult<Json<ApiResponse<OtpVerifyResponse>>> {
    let phone = required_param(body.phone, "phone")?;
    let code = required_param(body.code, "code")?;
    state.otp.verify_code(&phone, &code).await?;
    Ok(ApiResponse::ok(OtpVerifyResponse { verified: true }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/otp/send", post(send_otp))
        .route("/otp/verify", post(verify_otp))
}
