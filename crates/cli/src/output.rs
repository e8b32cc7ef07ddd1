//! Rendering of events and metrics on stdout.

use anyhow::Result;
use once_cell::sync::Lazy;
use prometheus::{Encoder, Registry, TextEncoder};

use encwatch_core::{metrics, ProgressEvent};

/// Registry holding the core monitor metrics.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for metric in metrics::all_metrics() {
        if let Err(e) = registry.register(metric) {
            tracing::warn!("Failed to register metric: {}", e);
        }
    }
    registry
});

/// Renders an event as a single JSON line.
///
/// The accumulated encoder output is left out unless `include_raw` is set,
/// since it grows with every event.
pub fn event_line(event: &ProgressEvent, include_raw: bool) -> Result<String> {
    let mut value = serde_json::to_value(event)?;
    if !include_raw {
        if let Some(fields) = value.as_object_mut() {
            fields.remove("raw_output_so_far");
        }
    }
    Ok(serde_json::to_string(&value)?)
}

/// Prometheus text exposition of the monitor metrics.
pub fn encode_metrics() -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
