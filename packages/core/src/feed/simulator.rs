//! Metrics feed simulator.
//!
//! Every subscription owns one tokio task driving its own repeating timer.
//! On each tick the task pulls a metrics snapshot and the flow stages from
//! the `DataSource` and hands them to the subscriber's callback.
//!
//! Delivery and cancellation go through a per-subscription gate (a mutex
//! around the "active" flag). A tick only invokes the callback while
//! holding the gate with the flag set; `unsubscribe` clears the flag under
//! the same gate before aborting the task. Once `unsubscribe` returns, no
//! further invocation can happen.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use chrono::Utc;
use futures::Stream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::error::AppError;
use crate::feed::types::FeedUpdate;
use crate::metrics::AppMetrics;
use crate::services::DataSource;

/// Default feed period.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(10);

/// Updates buffered for a stream consumer that is not reading. Further
/// updates are dropped until it catches up.
pub const STREAM_CAPACITY: usize = 16;

type Callback = Box<dyn Fn(&FeedUpdate) + Send + Sync>;

/// Lifecycle of a single subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Idle,
    Subscribed,
}

/// Periodic producer of `FeedUpdate`s.
pub struct MetricsFeed {
    source: Arc<dyn DataSource>,
    period: Duration,
    metrics: Option<Arc<AppMetrics>>,
    next_id: AtomicU64,
}

impl MetricsFeed {
    pub fn new(source: Arc<dyn DataSource>, period: Duration) -> Self {
        Self {
            source,
            period,
            metrics: None,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<AppMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Register `on_update` and start its timer. The first delivery happens
    /// one full period after subscribing.
    ///
    /// The callback runs on the subscription's task and must not call
    /// `unsubscribe` on its own handle.
    pub fn subscribe<F>(&self, on_update: F) -> Subscription
    where
        F: Fn(&FeedUpdate) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let gate = Arc::new(Mutex::new(true));

        let task = tokio::spawn(run_subscription(
            id,
            self.source.clone(),
            self.period,
            gate.clone(),
            Box::new(on_update),
            self.metrics.clone(),
        ));

        if let Some(metrics) = &self.metrics {
            metrics.active_subscriptions.inc();
        }
        tracing::info!(
            "Feed subscription {} started (period: {:?}, source: {})",
            id,
            self.period,
            self.source.source_name()
        );

        Subscription {
            id,
            gate,
            task,
            metrics: self.metrics.clone(),
        }
    }

    /// Subscribe and receive updates as a stream. Dropping the stream
    /// cancels the subscription.
    ///
    /// At most [`STREAM_CAPACITY`] updates wait for a slow reader; newer
    /// ones are skipped while the buffer is full.
    pub fn subscribe_stream(&self) -> FeedStream {
        let (tx, rx) = mpsc::channel(STREAM_CAPACITY);
        let subscription = self.subscribe(move |update| {
            match tx.try_send(update.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(skipped)) => {
                    tracing::debug!("Feed stream buffer full, skipping update {}", skipped.sequence);
                }
                // The stream is being dropped, which cancels this
                // subscription right after.
                Err(TrySendError::Closed(_)) => {}
            }
        });
        FeedStream { rx, subscription }
    }
}

/// Cancellation handle returned by [`MetricsFeed::subscribe`].
///
/// Dropping the handle unsubscribes.
pub struct Subscription {
    id: u64,
    gate: Arc<Mutex<bool>>,
    task: JoinHandle<()>,
    metrics: Option<Arc<AppMetrics>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> FeedState {
        if *self.gate.lock().unwrap_or_else(PoisonError::into_inner) {
            FeedState::Subscribed
        } else {
            FeedState::Idle
        }
    }

    /// Stop the timer. Idempotent; once this returns no callback runs again.
    pub fn unsubscribe(&self) {
        let mut active = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        if !*active {
            return;
        }
        *active = false;
        self.task.abort();

        if let Some(metrics) = &self.metrics {
            metrics.active_subscriptions.dec();
        }
        tracing::info!("Feed subscription {} stopped", self.id);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Stream of feed updates tied to a live subscription.
pub struct FeedStream {
    rx: mpsc::Receiver<FeedUpdate>,
    subscription: Subscription,
}

impl FeedStream {
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }
}

impl Stream for FeedStream {
    type Item = FeedUpdate;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

async fn run_subscription(
    id: u64,
    source: Arc<dyn DataSource>,
    period: Duration,
    gate: Arc<Mutex<bool>>,
    on_update: Callback,
    metrics: Option<Arc<AppMetrics>>,
) {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut sequence = 0u64;

    loop {
        interval.tick().await;

        let update = match next_update(source.as_ref(), sequence + 1).await {
            Ok(update) => update,
            Err(err) => {
                // Subscribers keep their last snapshot; nothing is delivered.
                tracing::warn!("Feed subscription {}: skipping tick: {}", id, err);
                if let Some(metrics) = &metrics {
                    metrics.feed_tick_errors_total.inc();
                }
                continue;
            }
        };

        let delivered = {
            let active = gate.lock().unwrap_or_else(PoisonError::into_inner);
            if *active {
                sequence = update.sequence;
                on_update(&update);
            }
            *active
        };
        if !delivered {
            break;
        }

        if let Some(metrics) = &metrics {
            metrics.feed_ticks_total.inc();
        }
        tracing::debug!("Feed subscription {} delivered update {}", id, sequence);
    }
}

/// Build one update from the source. Both reads must succeed.
async fn next_update(source: &dyn DataSource, sequence: u64) -> Result<FeedUpdate, AppError> {
    let (metrics, flow) =
        tokio::try_join!(source.get_dashboard_metrics(), source.get_material_flow())?;
    Ok(FeedUpdate {
        sequence,
        metrics,
        flow,
        produced_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use futures::{FutureExt, StreamExt};

    use crate::feed::types::{DashboardMetricsSnapshot, MaterialFlowStage};
    use crate::generator::GenerationPolicy;
    use crate::ledger::{MaterialFilter, MaterialRecord, MaterialStatus};
    use crate::services::types::{AnalyticsBundle, LedgerVerification, TimeRange};
    use crate::services::{MockDataSource, SourceResult};

    const PERIOD: Duration = Duration::from_secs(10);

    fn mock_source() -> Arc<dyn DataSource> {
        Arc::new(MockDataSource::seeded(GenerationPolicy::default(), 5, Some(7)).unwrap())
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&FeedUpdate) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, move |_: &FeedUpdate| {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    /// Source whose metrics endpoint is always unreachable.
    struct UnreachableSource;

    #[async_trait]
    impl DataSource for UnreachableSource {
        async fn list_materials(&self, _: &MaterialFilter) -> SourceResult<Vec<MaterialRecord>> {
            Err(AppError::Transport("backend unreachable".into()))
        }
        async fn get_material(&self, _: &str) -> SourceResult<MaterialRecord> {
            Err(AppError::Transport("backend unreachable".into()))
        }
        async fn update_material_status(
            &self,
            _: &str,
            _: MaterialStatus,
        ) -> SourceResult<MaterialRecord> {
            Err(AppError::Transport("backend unreachable".into()))
        }
        async fn get_dashboard_metrics(&self) -> SourceResult<DashboardMetricsSnapshot> {
            Err(AppError::Transport("backend unreachable".into()))
        }
        async fn get_material_flow(&self) -> SourceResult<Vec<MaterialFlowStage>> {
            Err(AppError::Transport("backend unreachable".into()))
        }
        async fn get_analytics_data(&self, _: TimeRange) -> SourceResult<AnalyticsBundle> {
            Err(AppError::Transport("backend unreachable".into()))
        }
        async fn generate_compliance_report(&self, _: &str) -> SourceResult<Vec<u8>> {
            Err(AppError::Transport("backend unreachable".into()))
        }
        async fn verify_on_ledger(&self, _: &str) -> SourceResult<LedgerVerification> {
            Err(AppError::Transport("backend unreachable".into()))
        }
        fn source_name(&self) -> &str {
            "Unreachable"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn delivers_once_per_period() {
        let feed = MetricsFeed::new(mock_source(), PERIOD);
        let (count, on_update) = counter();
        let sub = feed.subscribe(on_update);

        time::sleep(Duration::from_secs(35)).await;

        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(sub.state(), FeedState::Subscribed);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_first_tick_delivers_nothing() {
        let feed = MetricsFeed::new(mock_source(), PERIOD);
        let (count, on_update) = counter();
        let sub = feed.subscribe(on_update);
        sub.unsubscribe();

        time::sleep(Duration::from_secs(60)).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(sub.state(), FeedState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn unsubscribe_is_idempotent_and_stops_delivery() {
        let metrics = Arc::new(AppMetrics::new().unwrap());
        let feed = MetricsFeed::new(mock_source(), PERIOD).with_metrics(metrics.clone());
        let (count, on_update) = counter();
        let sub = feed.subscribe(on_update);

        time::sleep(Duration::from_secs(15)).await;
        sub.unsubscribe();
        sub.unsubscribe();
        time::sleep(Duration::from_secs(50)).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(metrics.active_subscriptions.get().abs() < f64::EPSILON);
        assert!((metrics.feed_ticks_total.get() - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn independent_subscriptions_do_not_share_cancellation() {
        let feed = MetricsFeed::new(mock_source(), PERIOD);
        let (count_a, on_a) = counter();
        let (count_b, on_b) = counter();
        let sub_a = feed.subscribe(on_a);
        let _sub_b = feed.subscribe(on_b);

        time::sleep(Duration::from_secs(25)).await;
        assert_eq!(count_a.load(Ordering::SeqCst), 2);
        assert_eq!(count_b.load(Ordering::SeqCst), 2);

        sub_a.unsubscribe();
        time::sleep(Duration::from_secs(20)).await;

        assert_eq!(count_a.load(Ordering::SeqCst), 2);
        assert_eq!(count_b.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_unsubscribes() {
        let feed = MetricsFeed::new(mock_source(), PERIOD);
        let (count, on_update) = counter();
        drop(feed.subscribe(on_update));

        time::sleep(Duration::from_secs(30)).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn sequence_numbers_increase_per_subscription() {
        let feed = MetricsFeed::new(mock_source(), PERIOD);
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let s = seen.clone();
        let _sub = feed.subscribe(move |update| s.lock().unwrap().push(update.sequence));

        time::sleep(Duration::from_secs(31)).await;

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn source_errors_skip_ticks_without_delivering() {
        let metrics = Arc::new(AppMetrics::new().unwrap());
        let feed = MetricsFeed::new(Arc::new(UnreachableSource), PERIOD).with_metrics(metrics.clone());
        let (count, on_update) = counter();
        let _sub = feed.subscribe(on_update);

        time::sleep(Duration::from_secs(25)).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!((metrics.feed_tick_errors_total.get() - 2.0).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn stream_yields_updates_and_cancels_on_drop() {
        let metrics = Arc::new(AppMetrics::new().unwrap());
        let feed = MetricsFeed::new(mock_source(), PERIOD).with_metrics(metrics.clone());
        let mut stream = feed.subscribe_stream();

        let first = stream.next().await.unwrap();
        let second = stream.next().await.unwrap();
        assert_eq!((first.sequence, second.sequence), (1, 2));
        assert_eq!(first.flow.len(), GenerationPolicy::default().flow_stages.len());

        drop(stream);
        assert!(metrics.active_subscriptions.get().abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn unread_stream_buffers_a_bounded_number_of_updates() {
        let feed = MetricsFeed::new(mock_source(), PERIOD);
        let mut stream = feed.subscribe_stream();

        time::sleep(PERIOD * (STREAM_CAPACITY as u32 * 3) + Duration::from_secs(1)).await;

        let mut buffered = Vec::new();
        while let Some(Some(update)) = stream.next().now_or_never() {
            buffered.push(update.sequence);
        }
        assert_eq!(buffered.len(), STREAM_CAPACITY);
        assert_eq!(buffered.first(), Some(&1));
        assert_eq!(stream.subscription().state(), FeedState::Subscribed);
    }

    #[tokio::test(start_paused = true)]
    async fn subscription_ids_are_unique() {
        let feed = MetricsFeed::new(mock_source(), PERIOD);
        let a = feed.subscribe(|_| {});
        let b = feed.subscribe_stream();
        assert_ne!(a.id(), b.subscription().id());
    }
}
