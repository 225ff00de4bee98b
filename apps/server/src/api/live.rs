use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    extract::State,
    response::sse::{Event as SseEvent, Sse},
    routing::get,
    Router,
};
use futures::{Stream, StreamExt};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;

use crate::events::LiveEvent;
use crate::main_lib::AppState;

/// Comment frames on a fixed period, independent of snapshot traffic.
fn heartbeats(period: Duration) -> impl Stream<Item = Result<SseEvent, Infallible>> {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    IntervalStream::new(ticker).map(|_| Ok(SseEvent::default().comment("heartbeat")))
}

/// `ready`, then one `snapshot` event per published snapshot, interleaved
/// with heartbeat comments. Closing the connection drops the stream and
/// with it the subscription.
async fn stream_live(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let ready = LiveEvent::ready(state.publisher.poll_interval(), state.live_heartbeat);
    let subscription = state.publisher.subscribe();
    tracing::debug!("Live stream opened for subscriber {}", subscription.id());

    let snapshots = subscription.into_stream().map(LiveEvent::Snapshot);
    let events = futures::stream::once(async move { ready })
        .chain(snapshots)
        .filter_map(|event| async move { event.to_sse().map(Ok) });

    Sse::new(futures::stream::select(events, heartbeats(state.live_heartbeat)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/stocks/live", get(stream_live))
}
