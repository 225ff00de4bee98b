//! Shared poller behind the live market stream.
//!
//! One background task polls the snapshot source while at least one client
//! is connected and fans each snapshot out to every subscriber. New
//! subscribers get the last snapshot immediately. The task is aborted when
//! the last subscriber leaves and restarted by the next one.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use futures::Stream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use tradedesk_market_data::{CombinedSnapshot, SnapshotSource};

/// Snapshots buffered per subscriber before new ones are dropped for it.
const SUBSCRIBER_BUFFER: usize = 4;

type SnapshotSender = mpsc::Sender<Arc<CombinedSnapshot>>;

#[derive(Default)]
struct PublisherState {
    subscribers: BTreeMap<u64, SnapshotSender>,
    last: Option<Arc<CombinedSnapshot>>,
    poller: Option<JoinHandle<()>>,
}

impl PublisherState {
    /// A handle whose task already ended does not count as polling.
    fn poller_running(&self) -> bool {
        self.poller.as_ref().is_some_and(|h| !h.is_finished())
    }
}

pub struct SnapshotPublisher {
    source: Arc<dyn SnapshotSource>,
    poll_interval: Duration,
    state: Mutex<PublisherState>,
    in_flight: AtomicBool,
    next_id: AtomicU64,
}

/// Clears the in-flight flag however the refresh ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SnapshotPublisher {
    pub fn new(source: Arc<dyn SnapshotSource>, poll_interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            source,
            poll_interval,
            state: Mutex::new(PublisherState::default()),
            in_flight: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn lock(&self) -> MutexGuard<'_, PublisherState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a subscriber, starting the poller if it is idle.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut state = self.lock();
        if let Some(last) = &state.last {
            let _ = tx.try_send(last.clone());
        }
        state.subscribers.insert(id, tx);

        if !state.poller_running() {
            info!("Starting live snapshot poller every {:?}", self.poll_interval);
            state.poller = Some(tokio::spawn(poll_loop(
                Arc::downgrade(self),
                self.poll_interval,
            )));
        }
        debug!("Live subscriber {} joined ({} total)", id, state.subscribers.len());
        drop(state);

        Subscription {
            id,
            receiver: rx,
            publisher: Arc::downgrade(self),
            closed: AtomicBool::new(false),
            received: false,
        }
    }

    fn unsubscribe(&self, id: u64) {
        let mut state = self.lock();
        if state.subscribers.remove(&id).is_some() {
            debug!("Live subscriber {} left ({} remaining)", id, state.subscribers.len());
        }
        if state.subscribers.is_empty() {
            stop_poller(&mut state);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    pub fn is_polling(&self) -> bool {
        self.lock().poller_running()
    }

    pub fn last_snapshot(&self) -> Option<Arc<CombinedSnapshot>> {
        self.lock().last.clone()
    }

    /// Fetch one snapshot and publish it. Returns `false` without fetching
    /// when another refresh is still running, or when the fetch fails.
    pub async fn refresh(&self) -> bool {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        let _guard = InFlight(&self.in_flight);

        match self.source.snapshot().await {
            Ok(snapshot) => {
                self.publish(Arc::new(snapshot));
                true
            }
            Err(e) => {
                warn!("Live snapshot refresh failed: {}", e);
                false
            }
        }
    }

    fn publish(&self, snapshot: Arc<CombinedSnapshot>) {
        let mut state = self.lock();
        state.last = Some(snapshot.clone());
        state
            .subscribers
            .retain(|id, tx| match tx.try_send(snapshot.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    debug!("Live subscriber {} is behind, skipping snapshot", id);
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("Live subscriber {} disconnected", id);
                    false
                }
            });
        if state.subscribers.is_empty() {
            stop_poller(&mut state);
        }
    }
}

fn stop_poller(state: &mut PublisherState) {
    if let Some(handle) = state.poller.take() {
        handle.abort();
        info!("Live snapshot poller stopped, no subscribers");
    }
}

async fn poll_loop(publisher: Weak<SnapshotPublisher>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let Some(publisher) = publisher.upgrade() else {
            break;
        };
        if publisher.in_flight.load(Ordering::Acquire) {
            debug!("Previous live refresh still running, skipping tick");
            continue;
        }
        tokio::spawn(async move {
            publisher.refresh().await;
        });
    }
}

/// Lifecycle of one live connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Registered, nothing delivered yet
    Connecting,
    /// At least one snapshot delivered
    Streaming,
    Closed,
}

/// One client's view of the publisher. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    receiver: mpsc::Receiver<Arc<CombinedSnapshot>>,
    publisher: Weak<SnapshotPublisher>,
    closed: AtomicBool,
    received: bool,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        if self.closed.load(Ordering::Acquire) {
            ConnectionState::Closed
        } else if self.received {
            ConnectionState::Streaming
        } else {
            ConnectionState::Connecting
        }
    }

    /// Next snapshot, or `None` once closed.
    pub async fn recv(&mut self) -> Option<Arc<CombinedSnapshot>> {
        if self.closed.load(Ordering::Acquire) {
            return None;
        }
        let snapshot = self.receiver.recv().await?;
        self.received = true;
        Some(snapshot)
    }

    /// Unsubscribe. Safe to call more than once.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(publisher) = self.publisher.upgrade() {
            publisher.unsubscribe(self.id);
        }
    }

    /// Snapshots as a stream that unsubscribes when dropped.
    pub fn into_stream(self) -> impl Stream<Item = Arc<CombinedSnapshot>> + Send {
        futures::stream::unfold(self, |mut sub| async move {
            let snapshot = sub.recv().await?;
            Some((snapshot, sub))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::AtomicUsize;
    use tradedesk_market_data::MarketDataError;

    /// Numbers each snapshot by call count through its timestamp.
    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
        fail_first: usize,
        delay: Duration,
    }

    impl CountingSource {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SnapshotSource for CountingSource {
        async fn snapshot(&self) -> Result<CombinedSnapshot, MarketDataError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if n <= self.fail_first {
                return Err(MarketDataError::Timeout {
                    provider: "TEST".into(),
                });
            }
            Ok(CombinedSnapshot {
                indices: vec![],
                gainers: vec![],
                losers: vec![],
                stats: BTreeMap::new(),
                timestamp: Utc.timestamp_opt(n as i64, 0).unwrap(),
            })
        }
    }

    fn seq(snapshot: &CombinedSnapshot) -> i64 {
        snapshot.timestamp.timestamp()
    }

    const POLL: Duration = Duration::from_secs(15);

    #[tokio::test(start_paused = true)]
    async fn test_first_poll_is_immediate_then_periodic() {
        let source = Arc::new(CountingSource::default());
        let publisher = SnapshotPublisher::new(source.clone(), POLL);

        let mut sub = publisher.subscribe();
        assert_eq!(sub.state(), ConnectionState::Connecting);

        let first = sub.recv().await.unwrap();
        assert_eq!(seq(&first), 1);
        assert_eq!(sub.state(), ConnectionState::Streaming);

        let second = sub.recv().await.unwrap();
        assert_eq!(seq(&second), 2);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_subscriber_gets_last_snapshot() {
        let source = Arc::new(CountingSource::default());
        let publisher = SnapshotPublisher::new(source.clone(), POLL);

        let mut early = publisher.subscribe();
        early.recv().await.unwrap();

        let mut late = publisher.subscribe();
        let cached = late.recv().await.unwrap();
        assert_eq!(seq(&cached), 1);
        assert_eq!(source.calls(), 1);
        assert_eq!(publisher.subscriber_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_stops_when_idle_and_restarts() {
        let source = Arc::new(CountingSource::default());
        let publisher = SnapshotPublisher::new(source.clone(), POLL);

        let mut sub = publisher.subscribe();
        sub.recv().await.unwrap();
        assert!(publisher.is_polling());

        drop(sub);
        assert!(!publisher.is_polling());
        assert_eq!(publisher.subscriber_count(), 0);

        tokio::time::sleep(POLL * 4).await;
        assert_eq!(source.calls(), 1);

        let mut sub = publisher.subscribe();
        assert_eq!(seq(&sub.recv().await.unwrap()), 1);
        assert_eq!(seq(&sub.recv().await.unwrap()), 2);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ended_poller_task_is_not_polling_and_restarts() {
        let source = Arc::new(CountingSource::default());
        let publisher = SnapshotPublisher::new(source.clone(), POLL);

        let ended = tokio::spawn(async {});
        while !ended.is_finished() {
            tokio::task::yield_now().await;
        }
        publisher.lock().poller = Some(ended);
        assert!(!publisher.is_polling());

        let mut sub = publisher.subscribe();
        assert!(publisher.is_polling());
        assert_eq!(seq(&sub.recv().await.unwrap()), 1);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_errors_do_not_stop_polling() {
        let source = Arc::new(CountingSource {
            fail_first: 2,
            ..Default::default()
        });
        let publisher = SnapshotPublisher::new(source.clone(), POLL);

        let mut sub = publisher.subscribe();
        let snapshot = sub.recv().await.unwrap();
        assert_eq!(seq(&snapshot), 3);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_are_skipped_while_refresh_in_flight() {
        let source = Arc::new(CountingSource {
            delay: Duration::from_secs(40),
            ..Default::default()
        });
        let publisher = SnapshotPublisher::new(source.clone(), POLL);

        let mut sub = publisher.subscribe();
        // Ticks at 15s and 30s land while the first fetch runs until 40s
        assert_eq!(seq(&sub.recv().await.unwrap()), 1);
        assert_eq!(source.calls(), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_subscriber_is_kept_and_skips_snapshots() {
        let source = Arc::new(CountingSource::default());
        let publisher = SnapshotPublisher::new(source.clone(), POLL);

        let mut slow = publisher.subscribe();
        tokio::time::sleep(POLL * 6 + Duration::from_secs(1)).await;
        assert_eq!(source.calls(), 7);
        assert_eq!(publisher.subscriber_count(), 1);

        for expected in 1..=SUBSCRIBER_BUFFER as i64 {
            assert_eq!(seq(&slow.recv().await.unwrap()), expected);
        }
        assert_eq!(seq(&publisher.last_snapshot().unwrap()), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_is_idempotent() {
        let source = Arc::new(CountingSource::default());
        let publisher = SnapshotPublisher::new(source, POLL);

        let mut first = publisher.subscribe();
        let _second = publisher.subscribe();
        assert_eq!(publisher.subscriber_count(), 2);

        first.close();
        first.close();
        assert_eq!(first.state(), ConnectionState::Closed);
        assert_eq!(publisher.subscriber_count(), 1);
        assert!(first.recv().await.is_none());

        drop(first);
        assert_eq!(publisher.subscriber_count(), 1);
        assert!(publisher.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_stream_unsubscribes() {
        use futures::StreamExt;

        let source = Arc::new(CountingSource::default());
        let publisher = SnapshotPublisher::new(source, POLL);

        let mut stream = Box::pin(publisher.subscribe().into_stream());
        assert_eq!(seq(&stream.next().await.unwrap()), 1);
        assert_eq!(publisher.subscriber_count(), 1);

        drop(stream);
        assert_eq!(publisher.subscriber_count(), 0);
        assert!(!publisher.is_polling());
    }
}
