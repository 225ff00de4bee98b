use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use tradedesk_market_data::MarketDataService;

use crate::config::{Config, LogFormat};
use crate::live::SnapshotPublisher;
use crate::otp::{LogOtpSender, OtpSender, OtpService, OtpStore, WebhookOtpSender};
use crate::rate_limit::SlidingWindowLimiter;

pub struct AppState {
    pub market: Arc<MarketDataService>,
    pub publisher: Arc<SnapshotPublisher>,
    pub otp: Arc<OtpService>,
    pub live_heartbeat: Duration,
}

pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false))
            .init(),
        LogFormat::Text => registry.with(fmt::layer()).init(),
    }
}

/// State wired to the real upstreams and the configured OTP sender.
pub fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let market = Arc::new(MarketDataService::with_default_providers(
        config.search_cache_ttl,
    )?);

    let sender: Arc<dyn OtpSender> = match &config.sms_webhook_url {
        Some(url) => {
            tracing::info!("OTP messages go to the SMS webhook");
            Arc::new(WebhookOtpSender::new(url.clone())?)
        }
        None => {
            tracing::warn!("TD_SMS_WEBHOOK_URL not set, OTP codes are not delivered");
            Arc::new(LogOtpSender)
        }
    };

    Ok(build_state_with(config, market, sender))
}

/// State over caller-supplied market data and OTP sender.
pub fn build_state_with(
    config: &Config,
    market: Arc<MarketDataService>,
    sender: Arc<dyn OtpSender>,
) -> Arc<AppState> {
    let publisher = SnapshotPublisher::new(market.clone(), config.live_poll_interval);
    let otp = OtpService::new(
        OtpStore::new(config.otp_ttl),
        SlidingWindowLimiter::new(config.otp_max_sends, config.otp_window),
        sender,
    );

    Arc::new(AppState {
        market,
        publisher,
        otp: Arc::new(otp),
        live_heartbeat: config.live_heartbeat,
    })
}
