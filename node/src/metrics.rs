//! # Prometheus Metrics
//!
//! Request and error counters plus a latency histogram, scraped at
//! `/metrics` on the metrics port. Everything lives in a dedicated
//! [`prometheus::Registry`].

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

use hmy_rosetta::ErrorKind;

/// Metric handles shared by every handler.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Requests served, by endpoint.
    pub requests_total: IntCounterVec,
    /// Failed requests, by error kind.
    pub errors_total: IntCounterVec,
    /// Handler latency in seconds, by endpoint.
    pub request_latency_seconds: HistogramVec,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("hmy_rosetta".into()), None)?;

        let requests_total = IntCounterVec::new(
            Opts::new("requests_total", "Rosetta API requests served"),
            &["endpoint"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let errors_total = IntCounterVec::new(
            Opts::new("errors_total", "Rosetta API requests that returned an error"),
            &["kind"],
        )?;
        registry.register(Box::new(errors_total.clone()))?;

        let request_latency_seconds = HistogramVec::new(
            HistogramOpts::new("request_latency_seconds", "Rosetta API handler latency in seconds")
                .buckets(vec![
                    0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
                ]),
            &["endpoint"],
        )?;
        registry.register(Box::new(request_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            errors_total,
            request_latency_seconds,
        })
    }

    pub fn record_error(&self, kind: ErrorKind) {
        self.errors_total.with_label_values(&[kind.label()]).inc();
    }

    /// Encodes all registered metrics in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

pub type SharedMetrics = Arc<NodeMetrics>;

/// Renders `/metrics`. Returns HTTP 500 if encoding fails.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
