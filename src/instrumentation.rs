//! Prometheus instrumentation of API requests.
//!
//! The collectors are created once per process. Each client built with
//! [`crate::ClientBuilder::instrumentation`] registers them into its registry;
//! registering into a registry that already holds them reuses the existing
//! collectors instead of failing.

use crate::{Error, Result};
use http::{Method, StatusCode};
use prometheus::core::Collector;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use std::sync::OnceLock;
use std::time::Duration;

const NAMESPACE: &str = "hcloud";
const SUBSYSTEM: &str = "api";

static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Request counter and latency histogram, labelled by operation path.
#[derive(Clone)]
pub(crate) struct Metrics {
    requests: IntCounterVec,
    duration: HistogramVec,
}

impl Metrics {
    fn new() -> Result<Self> {
        let requests = IntCounterVec::new(
            Opts::new("requests_total", "A counter for requests to the API.")
                .namespace(NAMESPACE)
                .subsystem(SUBSYSTEM),
            &["code", "method", "api_endpoint"],
        )
        .map_err(metrics_error)?;

        let duration = HistogramVec::new(
            HistogramOpts::new(
                "request_duration_seconds",
                "A histogram of request latencies.",
            )
            .namespace(NAMESPACE)
            .subsystem(SUBSYSTEM)
            .buckets(prometheus::DEFAULT_BUCKETS.to_vec()),
            &["method", "api_endpoint"],
        )
        .map_err(metrics_error)?;

        Ok(Self { requests, duration })
    }

    /// Registers the process-wide collectors into `registry`.
    pub(crate) fn register(registry: &Registry) -> Result<Self> {
        let metrics = match METRICS.get() {
            Some(metrics) => metrics.clone(),
            None => {
                let created = Metrics::new()?;
                METRICS.get_or_init(|| created).clone()
            }
        };

        let collectors: [Box<dyn Collector>; 2] = [
            Box::new(metrics.requests.clone()),
            Box::new(metrics.duration.clone()),
        ];
        for collector in collectors {
            match registry.register(collector) {
                Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
                Err(e) => return Err(metrics_error(e)),
            }
        }

        Ok(metrics)
    }

    pub(crate) fn observe(
        &self,
        method: &Method,
        status: StatusCode,
        operation_path: &str,
        latency: Duration,
    ) {
        self.requests
            .with_label_values(&[status.as_str(), method.as_str(), operation_path])
            .inc();
        self.duration
            .with_label_values(&[method.as_str(), operation_path])
            .observe(latency.as_secs_f64());
    }
}

fn metrics_error(e: prometheus::Error) -> Error {
    Error::ConfigurationError(format!("Failed to register metrics: {}", e))
}
