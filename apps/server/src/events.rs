use std::sync::Arc;
use std::time::Duration;

use axum::response::sse::Event as SseEvent;
use serde::Serialize;
use tradedesk_market_data::CombinedSnapshot;

/// Event names on the live market stream.
pub const LIVE_READY: &str = "ready";
pub const LIVE_SNAPSHOT: &str = "snapshot";

/// First frame of a live stream, telling the client the cadence to expect.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyPayload {
    pub poll_interval_ms: u64,
    pub heartbeat_ms: u64,
}

/// One frame on the live market stream.
#[derive(Clone, Debug)]
pub enum LiveEvent {
    Ready(ReadyPayload),
    Snapshot(Arc<CombinedSnapshot>),
}

impl LiveEvent {
    pub fn ready(poll_interval: Duration, heartbeat: Duration) -> Self {
        LiveEvent::Ready(ReadyPayload {
            poll_interval_ms: poll_interval.as_millis() as u64,
            heartbeat_ms: heartbeat.as_millis() as u64,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            LiveEvent::Ready(_) => LIVE_READY,
            LiveEvent::Snapshot(_) => LIVE_SNAPSHOT,
        }
    }

    /// Encode as an SSE frame. `None` when the payload fails to serialize.
    pub fn to_sse(&self) -> Option<SseEvent> {
        let event = SseEvent::default().event(self.name());
        let encoded = match self {
            LiveEvent::Ready(payload) => event.json_data(payload),
            LiveEvent::Snapshot(snapshot) => event.json_data(snapshot.as_ref()),
        };
        match encoded {
            Ok(ev) => Some(ev),
            Err(err) => {
                tracing::error!("Failed to serialize SSE payload for {}: {}", self.name(), err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_payload_is_camel_case_millis() {
        let event = LiveEvent::ready(Duration::from_secs(15), Duration::from_secs(20));
        assert_eq!(event.name(), "ready");
        let LiveEvent::Ready(payload) = event else {
            panic!("expected ready event");
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["pollIntervalMs"], 15_000);
        assert_eq!(json["heartbeatMs"], 20_000);
    }
}
