//! Sampler metrics

use gallery_cache::StoreMetrics;
use prometheus::{CounterVec, IntCounter, Opts, Registry};
use std::sync::OnceLock;

static METRICS: OnceLock<SamplerMetricsInner> = OnceLock::new();

struct SamplerMetricsInner {
    deliveries: CounterVec,
    draws: CounterVec,
    exhaustions: IntCounter,
}

impl SamplerMetricsInner {
    fn new() -> Self {
        Self {
            deliveries: CounterVec::new(
                Opts::new("gallery_deliveries_total", "Pictures delivered"),
                &["mode"],
            )
            .expect("valid metric definition"),
            draws: CounterVec::new(
                Opts::new(
                    "gallery_fallback_draws_total",
                    "Random id draws by outcome",
                ),
                &["outcome"],
            )
            .expect("valid metric definition"),
            exhaustions: IntCounter::new(
                "gallery_exhaustions_total",
                "Viewed sets reset because no unseen picture was found",
            )
            .expect("valid metric definition"),
        }
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.deliveries.clone()))?;
        registry.register(Box::new(self.draws.clone()))?;
        registry.register(Box::new(self.exhaustions.clone()))?;
        Ok(())
    }
}

fn get_metrics() -> &'static SamplerMetricsInner {
    METRICS.get_or_init(SamplerMetricsInner::new)
}

/// Register sampler and store metrics with a Prometheus registry
pub fn register_all(registry: &Registry) -> Result<(), prometheus::Error> {
    get_metrics().register(registry)?;
    StoreMetrics::register(registry)
}

#[derive(Clone, Default)]
pub struct SamplerMetrics;

impl SamplerMetrics {
    pub fn new() -> Self {
        Self
    }

    /// `mode` is one of explicit, tags, latest, draw
    pub fn record_delivery(&self, mode: &str) {
        get_metrics().deliveries.with_label_values(&[mode]).inc();
    }

    /// `outcome` is one of seen, missing, filtered, source_error, storage_error, delivered
    pub fn record_draw(&self, outcome: &str) {
        get_metrics().draws.with_label_values(&[outcome]).inc();
    }

    pub fn record_exhaustion(&self) {
        get_metrics().exhaustions.inc();
    }
}
