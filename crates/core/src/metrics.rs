//! Prometheus metrics for encoder runs.
//!
//! Collectors are process-wide statics; register them in a registry with
//! [`all_metrics`].

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts};

/// Finished runs by result.
pub static RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("encwatch_runs_total", "Total finished encoder runs"),
        &["result"], // "success", "error"
    )
    .unwrap()
});

/// Wall-clock run duration in seconds.
pub static RUN_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "encwatch_run_duration_seconds",
            "Wall-clock duration of encoder runs",
        )
        .buckets(vec![
            1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 600.0, 1800.0, 3600.0, 7200.0,
        ]),
    )
    .unwrap()
});

/// Progress events delivered to consumers.
pub static PROGRESS_EVENTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "encwatch_progress_events_total",
        "Total progress events emitted",
    )
    .unwrap()
});

/// Runs whose output duration fell outside the sanity band.
pub static SANITY_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "encwatch_sanity_failures_total",
        "Total runs failing the output duration sanity check",
    )
    .unwrap()
});

/// Encoder processes that could not be spawned.
pub static LAUNCH_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "encwatch_launch_failures_total",
        "Total encoder launch failures",
    )
    .unwrap()
});

/// Get all metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(RUNS_TOTAL.clone()),
        Box::new(RUN_DURATION.clone()),
        Box::new(PROGRESS_EVENTS.clone()),
        Box::new(SANITY_FAILURES.clone()),
        Box::new(LAUNCH_FAILURES.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    #[test]
    fn test_all_metrics_register() {
        let registry = Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }

        RUNS_TOTAL.with_label_values(&["success"]).inc();
        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"encwatch_runs_total".to_string()));
    }
}
