#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use tradedesk_market_data::{MarketDataError, MarketDataService, Quote, QuoteSource};
use tradedesk_server::{api::app_router, build_state_with, config::Config};
use tradedesk_server::otp::{OtpError, OtpSender};

/// Upstream that is always unreachable.
pub struct DownSource;

#[async_trait]
impl QuoteSource for DownSource {
    fn id(&self) -> &'static str {
        "DOWN"
    }

    async fn get_quotes(&self, _symbols: &[String]) -> Result<Vec<Quote>, MarketDataError> {
        Err(MarketDataError::DnsFailure {
            provider: "DOWN".into(),
        })
    }
}

/// Upstream that answers from a fixed set of quotes.
pub struct FixedSource(pub Vec<Quote>);

#[async_trait]
impl QuoteSource for FixedSource {
    fn id(&self) -> &'static str {
        "FIXED"
    }

    async fn get_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, MarketDataError> {
        Ok(self
            .0
            .iter()
            .filter(|q| symbols.contains(&q.symbol))
            .cloned()
            .collect())
    }
}

/// Records every message instead of sending it.
#[derive(Default)]
pub struct CapturingSender {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl CapturingSender {
    /// The six-digit code from the latest message.
    pub fn last_code(&self) -> String {
        let sent = self.sent.lock().unwrap();
        let (_, message) = sent.last().expect("no OTP sent");
        message.chars().take_while(|c| c.is_ascii_digit()).collect()
    }
}

#[async_trait]
impl OtpSender for CapturingSender {
    async fn send(&self, phone: &str, message: &str) -> Result<(), OtpError> {
        self.sent
            .lock()
            .unwrap()
            .push((phone.to_string(), message.to_string()));
        Ok(())
    }
}

pub fn app_with(source: Arc<dyn QuoteSource>) -> (Router, Arc<CapturingSender>) {
    let sender = Arc::new(CapturingSender::default());
    let config = Config::default();
    let market = Arc::new(MarketDataService::new(source));
    let state = build_state_with(&config, market, sender.clone());
    (app_router(state, &config), sender)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let resp = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Decimal fields are serialized as JSON floats.
pub fn approx(value: &Value, expected: f64) -> bool {
    value
        .as_f64()
        .is_some_and(|actual| (actual - expected).abs() < 1e-6)
}
