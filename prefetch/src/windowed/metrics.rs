use commonware_runtime::Metrics as RuntimeMetrics;
use prometheus_client::metrics::{counter::Counter, gauge::Gauge};

/// Metrics for the [Engine](super::Engine).
#[derive(Default)]
pub struct Metrics {
    /// Number of fetches issued
    pub fetches: Counter,
    /// Number of fetches that failed
    pub failures: Counter,
    /// Number of responses dropped because the window moved
    pub stale: Counter,
    /// Number of positions evicted
    pub evictions: Counter,
    /// Number of drain events emitted
    pub drains: Counter,
    /// Current number of in-flight fetches
    pub pending: Gauge,
    /// Current number of materialized positions
    pub cached: Gauge,
}

impl Metrics {
    /// Create and return a new set of metrics, registered with the given context.
    pub fn init<E: RuntimeMetrics>(context: E) -> Self {
        let metrics = Metrics::default();
        context.register(
            "fetches",
            "Number of fetches issued",
            metrics.fetches.clone(),
        );
        context.register(
            "failures",
            "Number of fetches that failed",
            metrics.failures.clone(),
        );
        context.register(
            "stale",
            "Number of responses dropped because the window moved",
            metrics.stale.clone(),
        );
        context.register(
            "evictions",
            "Number of positions evicted",
            metrics.evictions.clone(),
        );
        context.register(
            "drains",
            "Number of drain events emitted",
            metrics.drains.clone(),
        );
        context.register(
            "pending",
            "Current number of in-flight fetches",
            metrics.pending.clone(),
        );
        context.register(
            "cached",
            "Current number of materialized positions",
            metrics.cached.clone(),
        );
        metrics
    }
}
