//! Prometheus registry for the basket API, served on `/metrics`.
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

pub struct ApiMetrics {
    registry: Registry,
    /// Basket requests by outcome (`success`, `error`, `rejected`)
    pub requests: IntCounterVec,
    /// Pipeline wall time in seconds, by outcome
    pub pipeline_duration: HistogramVec,
}

impl ApiMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("basket_requests_total", "Basket generation requests"),
            &["status"],
        )?;
        let pipeline_duration = HistogramVec::new(
            HistogramOpts::new("basket_pipeline_duration_seconds", "Pipeline run time")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]),
            &["status"],
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(pipeline_duration.clone()))?;

        Ok(Self {
            registry,
            requests,
            pipeline_duration,
        })
    }

    pub fn observe(&self, status: &str, seconds: f64) {
        self.requests.with_label_values(&[status]).inc();
        self.pipeline_duration.with_label_values(&[status]).observe(seconds);
    }

    pub fn reject(&self) {
        self.requests.with_label_values(&["rejected"]).inc();
    }

    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}
