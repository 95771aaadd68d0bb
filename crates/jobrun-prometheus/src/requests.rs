use std::time::Duration;

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

const LABELS: &[&str] = &["code", "handler", "method"];

/// Process-wide HTTP request instrumentation.
///
/// Cheap to clone; clones share the same registry and collectors.
#[derive(Clone)]
pub struct RequestMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration: HistogramVec,
}

impl RequestMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::with_registry(Registry::new())
    }

    /// Register the collectors on an existing registry.
    pub fn with_registry(registry: Registry) -> Result<Self, prometheus::Error> {
        let requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests."),
            LABELS,
        )?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds.",
            ),
            LABELS,
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration,
        })
    }

    /// Record one finished request.
    pub fn observe(&self, code: u16, handler: &str, method: &str, elapsed: Duration) {
        let code = code.to_string();
        let values = [code.as_str(), handler, method];
        self.requests_total.with_label_values(&values).inc();
        self.request_duration
            .with_label_values(&values)
            .observe(elapsed.as_secs_f64());
    }

    /// Requests counted so far for one label combination.
    pub fn requests(&self, code: u16, handler: &str, method: &str) -> u64 {
        let code = code.to_string();
        self.requests_total
            .with_label_values(&[code.as_str(), handler, method])
            .get()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Content type of [`encode`](Self::encode) output.
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }

    /// Encode all collectors in the text format.
    pub fn encode(&self) -> Result<Vec<u8>, prometheus::Error> {
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        Ok(buffer)
    }
}
