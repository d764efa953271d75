//! Viewed-set store metrics

use prometheus::{CounterVec, Opts, Registry};
use std::sync::OnceLock;

static METRICS: OnceLock<StoreMetricsInner> = OnceLock::new();

struct StoreMetricsInner {
    ops: CounterVec,
    claims: CounterVec,
    errors: CounterVec,
}

impl StoreMetricsInner {
    fn new() -> Self {
        Self {
            ops: CounterVec::new(
                Opts::new("gallery_viewed_ops_total", "Total viewed-set operations"),
                &["op"],
            )
            .expect("valid metric definition"),
            claims: CounterVec::new(
                Opts::new(
                    "gallery_viewed_claims_total",
                    "Add-if-absent outcomes on the viewed set",
                ),
                &["outcome"],
            )
            .expect("valid metric definition"),
            errors: CounterVec::new(
                Opts::new("gallery_viewed_errors_total", "Total viewed-set errors"),
                &["op", "error_type"],
            )
            .expect("valid metric definition"),
        }
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.ops.clone()))?;
        registry.register(Box::new(self.claims.clone()))?;
        registry.register(Box::new(self.errors.clone()))?;
        Ok(())
    }
}

fn get_metrics() -> &'static StoreMetricsInner {
    METRICS.get_or_init(StoreMetricsInner::new)
}

/// Store metrics wrapper
#[derive(Clone, Default)]
pub struct StoreMetrics;

impl StoreMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Register metrics with a Prometheus registry
    pub fn register(registry: &Registry) -> Result<(), prometheus::Error> {
        get_metrics().register(registry)
    }

    pub fn record_op(&self, op: &str) {
        get_metrics().ops.with_label_values(&[op]).inc();
    }

    pub fn record_claim(&self, inserted: bool) {
        let outcome = if inserted { "inserted" } else { "present" };
        get_metrics().claims.with_label_values(&[outcome]).inc();
    }

    pub fn record_error(&self, op: &str, error_type: &str) {
        get_metrics()
            .errors
            .with_label_values(&[op, error_type])
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_increment() {
        let metrics = StoreMetrics::new();
        let before = get_metrics().claims.with_label_values(&["inserted"]).get();
        metrics.record_claim(true);
        metrics.record_claim(false);
        let after = get_metrics().claims.with_label_values(&["inserted"]).get();
        assert!(after >= before + 1.0);
    }

    #[test]
    fn test_register_with_registry() {
        let registry = Registry::new();
        StoreMetrics::register(&registry).expect("register");
        StoreMetrics::new().record_op("add");
        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"gallery_viewed_ops_total".to_string()));
    }
}
