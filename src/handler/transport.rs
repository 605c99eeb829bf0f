use super::Handler;
use crate::instrumentation::Metrics;
use crate::{Request, Response, Result};
use async_trait::async_trait;
use std::time::Instant;

/// Performs the HTTP round trip and buffers the whole body.
pub(crate) struct TransportHandler {
    http_client: reqwest::Client,
    metrics: Option<Metrics>,
}

impl TransportHandler {
    pub(crate) fn new(http_client: reqwest::Client, metrics: Option<Metrics>) -> Self {
        Self {
            http_client,
            metrics,
        }
    }
}

#[async_trait]
impl Handler for TransportHandler {
    async fn handle(&self, req: Request) -> Result<Response> {
        let ctx = req.context().clone();
        let start = Instant::now();

        tracing::debug!(
            method = %req.method,
            url = %req.url,
            "Executing HTTP request"
        );

        let mut builder = self
            .http_client
            .request(req.method.clone(), req.url.clone())
            .headers(req.headers.clone());
        if let Some(body) = req.body.clone() {
            builder = builder.body(body);
        }

        let response = ctx.run(builder.send()).await??;
        let status = response.status();
        let headers = response.headers().clone();
        let body = ctx.run(response.bytes()).await??;
        let latency = start.elapsed();

        tracing::debug!(
            status = status.as_u16(),
            latency_ms = latency.as_millis(),
            "Received HTTP response"
        );

        if let Some(metrics) = &self.metrics {
            metrics.observe(&req.method, status, &req.operation_path, latency);
        }

        Ok(Response::new(status, headers, body))
    }
}
