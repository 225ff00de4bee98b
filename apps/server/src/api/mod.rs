mod health;
mod live;
mod options;
mod otp;
mod stocks;

use std::sync::Arc;

use axum::http::{header, HeaderValue};
use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::{ServeDir, ServeFile},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::main_lib::AppState;

/// Trimmed value of a required query or body field.
pub(crate) fn required_param(value: Option<String>, name: &str) -> ApiResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{} is required", name)))
}

/// Static marketing pages. Unknown paths get `index.html`.
pub fn static_files(static_dir: &str) -> ServeDir<ServeFile> {
    let static_dir = std::path::PathBuf::from(static_dir);
    let index_file = static_dir.join("index.html");
    ServeDir::new(static_dir).fallback(ServeFile::new(index_file))
}

pub fn app_router(state: Arc<AppState>, config: &Config) -> Router {
    let cors = if config.cors_allow.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins = config
            .cors_allow
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(origin) => Some(origin),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                    None
                }
            })
            .collect::<Vec<_>>();
        CorsLayer::new().allow_origin(origins)
    };

    // The live stream stays open indefinitely, so it is merged after the
    // timeout layer.
    let api = Router::new()
        .merge(health::router())
        .merge(stocks::router())
        .merge(options::router())
        .merge(otp::router())
        .layer(TimeoutLayer::new(config.request_timeout))
        .merge(live::router())
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ));

    Router::new()
        .nest("/api", api)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
