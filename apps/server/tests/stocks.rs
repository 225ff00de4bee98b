mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use rust_decimal_macros::dec;
use tradedesk_market_data::Quote;

use common::{app_with, approx, get, DownSource, FixedSource};

#[tokio::test]
async fn quote_serves_live_data() {
    let source = FixedSource(vec![Quote::new(
        "RELIANCE.NS",
        "Reliance Industries Ltd",
        dec!(2950.10),
        dec!(30.05),
        dec!(1.03),
        "INR",
    )]);
    let (app, _) = app_with(Arc::new(source));

    let (status, body) = get(&app, "/api/stocks/quote?symbol=reliance").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["symbol"], "RELIANCE");
    assert_eq!(body["data"]["yahooSymbol"], "RELIANCE.NS");
    assert!(approx(&body["data"]["price"], 2950.1));
    assert_eq!(body["data"]["stale"], false);
}

#[tokio::test]
async fn quote_falls_back_to_catalog_when_upstream_down() {
    let (app, _) = app_with(Arc::new(DownSource));

    let (status, body) = get(&app, "/api/stocks/quote?symbol=TCS&exchange=NSE").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["symbol"], "TCS");
    assert!(approx(&body["data"]["price"], 3950.5));
    assert!(approx(&body["data"]["change"], 0.0));
    assert_eq!(body["data"]["stale"], true);
}

#[tokio::test]
async fn quote_errors() {
    let (app, _) = app_with(Arc::new(DownSource));

    let (status, body) = get(&app, "/api/stocks/quote?symbol=NOSUCHCO").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("NOSUCHCO"));

    let (status, body) = get(&app, "/api/stocks/quote").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "symbol is required");

    let (status, _) = get(&app, "/api/stocks/quote?symbol=%20%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_uses_catalog_when_upstream_down() {
    let (app, _) = app_with(Arc::new(DownSource));

    let (status, body) = get(&app, "/api/stocks/search?q=reliance&exchange=BSE").await;

    assert_eq!(status, StatusCode::OK);
    let hits = body["data"].as_array().unwrap();
    assert!(!hits.is_empty());
    assert_eq!(hits[0]["symbol"], "RELIANCE");
    assert_eq!(hits[0]["yahooSymbol"], "RELIANCE.BO");
    assert_eq!(hits[0]["fallback"], true);

    let (status, _) = get(&app, "/api/stocks/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn indices_fall_back_to_static_dashboard() {
    let (app, _) = app_with(Arc::new(DownSource));

    let (status, body) = get(&app, "/api/stocks/indices?exchange=BSE").await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["exchange"], "BSE");
    assert_eq!(data["stale"], true);
    assert_eq!(data["indices"][0]["yahooSymbol"], "^BSESN");
    assert!(approx(&data["indices"][0]["price"], 73876.82));

    let stats = &data["stats"];
    let total = stats["advances"].as_u64().unwrap()
        + stats["declines"].as_u64().unwrap()
        + stats["unchanged"].as_u64().unwrap();
    assert_eq!(total, 15);
}

#[tokio::test]
async fn market_snapshot_covers_both_exchanges() {
    let (app, _) = app_with(Arc::new(DownSource));

    let (status, body) = get(&app, "/api/stocks/market").await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["indices"].as_array().unwrap().len(), 2);
    assert!(data["stats"]["NSE"].is_object());
    assert!(data["stats"]["BSE"].is_object());
    assert!(data["gainers"].as_array().unwrap().len() <= 5);
    assert!(data["losers"].as_array().unwrap().len() <= 5);
}

#[tokio::test]
async fn history_is_synthetic_when_upstream_down() {
    let (app, _) = app_with(Arc::new(DownSource));

    let (status, body) = get(&app, "/api/stocks/history?symbol=INFY&period=1Y").await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["symbol"], "INFY");
    assert_eq!(data["period"], "1Y");
    assert_eq!(data["synthetic"], true);
    let points = data["points"].as_array().unwrap();
    assert!(!points.is_empty());
    assert!(approx(&points.last().unwrap()["price"], 1498.75));

    let (status, _) = get(&app, "/api/stocks/history?period=1M").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn option_chain_errors() {
    let (app, _) = app_with(Arc::new(DownSource));

    let (status, _) = get(&app, "/api/option-chain").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get(&app, "/api/option-chain?symbol=NIFTY&date=27-06-2024").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    // No option chain providers configured
    let (status, _) = get(&app, "/api/option-chain?symbol=NIFTY").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}
