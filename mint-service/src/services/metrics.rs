//! Prometheus exposition for the synthetic latency gauge.
//!
//! The registry lives in `AppState` rather than a global so every router
//! instance, including the ones built by tests, gets its own.

use prometheus::{Encoder, Gauge, Opts, Registry, TextEncoder};

pub const LATENCY_GAUGE_NAME: &str = "response_latency_seconds";

pub struct LatencyGauge {
    registry: Registry,
    gauge: Gauge,
}

impl LatencyGauge {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let gauge = Gauge::with_opts(Opts::new(LATENCY_GAUGE_NAME, "Demo latency"))?;
        registry.register(Box::new(gauge.clone()))?;
        Ok(Self { registry, gauge })
    }

    /// Set the gauge to a fresh random value in [0, 1) and render the
    /// registry in text format.
    pub fn sample(&self) -> Result<String, prometheus::Error> {
        self.gauge.set(rand::random::<f64>());

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}

/// Value of the first sample line for `name` in a text exposition.
pub fn sample_value(exposition: &str, name: &str) -> Option<f64> {
    exposition
        .lines()
        .filter(|line| !line.starts_with('#'))
        .find_map(|line| {
            let (metric, value) = line.split_once(' ')?;
            (metric == name).then(|| value.trim().parse().ok())?
        })
}
