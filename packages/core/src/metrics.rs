//! Prometheus metrics registry for the traceability service.
//!
//! [`AppMetrics`] owns all registered metrics and the [`Registry`] they
//! belong to. Construct it once at startup, wrap in `Arc`, and pass it
//! to the metrics feed and the HTTP middleware.
//!
//! Exposed at `GET /metrics` in Prometheus text exposition format
//! (`text/plain; version=0.0.4`).

use prometheus::{
    Counter, CounterVec, Gauge, Histogram, HistogramOpts, Opts, Registry,
};

/// All application-level Prometheus metrics.
pub struct AppMetrics {
    /// Feed deliveries across all subscriptions.
    pub feed_ticks_total: Counter,
    /// Feed ticks skipped because the data source failed.
    pub feed_tick_errors_total: Counter,
    /// Subscriptions currently receiving the feed.
    pub active_subscriptions: Gauge,
    /// Records held by the material ledger.
    pub ledger_records: Gauge,
    /// HTTP request count, labelled by method, path, and status code.
    pub http_requests_total: CounterVec,
    /// HTTP request latency histogram in seconds.
    pub http_request_duration: Histogram,
    /// The registry that owns all of the above metrics.
    pub registry: Registry,
}

impl AppMetrics {
    /// Create and register all metrics. Returns an error if any metric
    /// name is invalid or duplicated.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let feed_ticks_total = Counter::with_opts(Opts::new(
            "traceability_sync_feed_ticks_total",
            "Metrics feed updates delivered to subscribers",
        ))?;

        let feed_tick_errors_total = Counter::with_opts(Opts::new(
            "traceability_sync_feed_tick_errors_total",
            "Metrics feed ticks skipped on data source errors",
        ))?;

        let active_subscriptions = Gauge::with_opts(Opts::new(
            "traceability_sync_active_subscriptions",
            "Currently active metrics feed subscriptions",
        ))?;

        let ledger_records = Gauge::with_opts(Opts::new(
            "traceability_sync_ledger_records",
            "Material records held in the ledger",
        ))?;

        let http_requests_total = CounterVec::new(
            Opts::new(
                "traceability_sync_http_requests_total",
                "HTTP requests by method, path, and status",
            ),
            &["method", "path", "status"],
        )?;

        let http_request_duration = Histogram::with_opts(
            HistogramOpts::new(
                "traceability_sync_http_request_duration_seconds",
                "HTTP request latency in seconds",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        )?;

        registry.register(Box::new(feed_ticks_total.clone()))?;
        registry.register(Box::new(feed_tick_errors_total.clone()))?;
        registry.register(Box::new(active_subscriptions.clone()))?;
        registry.register(Box::new(ledger_records.clone()))?;
        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration.clone()))?;

        Ok(Self {
            feed_ticks_total,
            feed_tick_errors_total,
            active_subscriptions,
            ledger_records,
            http_requests_total,
            http_request_duration,
            registry,
        })
    }

    /// Render all metrics as Prometheus text format (for the `/metrics` endpoint).
    pub fn render(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&metric_families, &mut buf)?;
        Ok(String::from_utf8(buf).unwrap_or_default())
    }
}
