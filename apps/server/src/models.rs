use axum::Json;
use serde::{Deserialize, Serialize};

/// Success envelope shared by every JSON route.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub symbol: Option<String>,
    pub exchange: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub exchange: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExchangeQuery {
    pub exchange: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub symbol: Option<String>,
    pub period: Option<String>,
    pub exchange: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OptionChainQuery {
    pub symbol: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OtpSendRequest {
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpSendResponse {
    pub expires_in_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct OtpVerifyRequest {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OtpVerifyResponse {
    pub verified: bool,
}
