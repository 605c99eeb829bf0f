//! The request handler chain.
//!
//! A request passes through a stack of [`Handler`]s on its way to the
//! network. Each handler owns its successor and may act before and after
//! calling it. The chain assembled by the client is, outermost first:
//!
//! | Handler | Responsibility |
//! |---------|----------------|
//! | parse | extract pagination from JSON bodies |
//! | retry | re-issue retriable failures with backoff |
//! | debug | dump redacted request/response pairs (optional) |
//! | error | turn 4xx/5xx responses into typed errors |
//! | rate limit | record `RateLimit-*` headers |
//! | transport | perform the HTTP round trip, cache the body |
//!
//! Rate limit extraction sits below error promotion so it also sees error
//! responses, and errors are promoted below the retry handler so retries can
//! classify them.

mod debug;
mod error;
mod parse;
mod rate_limit;
mod retry;
mod transport;

pub(crate) use debug::{DebugHandler, DebugWriter};
pub(crate) use error::ErrorHandler;
pub(crate) use parse::ParseHandler;
pub(crate) use rate_limit::RateLimitHandler;
pub(crate) use retry::RetryHandler;
pub(crate) use transport::TransportHandler;

use crate::instrumentation::Metrics;
use crate::retry::{Backoff, RetryPredicate};
use crate::{Request, Response, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// One link of the handler chain.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Processes `req`, usually by delegating to the next handler.
    async fn handle(&self, req: Request) -> Result<Response>;
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn handle(&self, req: Request) -> Result<Response> {
        (**self).handle(req).await
    }
}

/// Everything needed to assemble the default chain.
pub(crate) struct ChainConfig {
    pub http_client: reqwest::Client,
    pub metrics: Option<Metrics>,
    pub debug_writer: Option<DebugWriter>,
    pub backoff: Backoff,
    pub max_retries: usize,
    pub retry_predicate: Arc<dyn RetryPredicate>,
}

/// Builds the handler chain from the transport outwards.
pub(crate) fn assemble(config: ChainConfig) -> Box<dyn Handler> {
    let mut handler: Box<dyn Handler> =
        Box::new(TransportHandler::new(config.http_client, config.metrics));
    handler = Box::new(RateLimitHandler::new(handler));
    handler = Box::new(ErrorHandler::new(handler));
    if let Some(writer) = config.debug_writer {
        handler = Box::new(DebugHandler::new(handler, writer));
    }
    handler = Box::new(RetryHandler::new(
        handler,
        config.backoff,
        config.max_retries,
        config.retry_predicate,
    ));
    Box::new(ParseHandler::new(handler))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::{Context, Error};
    use bytes::Bytes;
    use http::{HeaderMap, HeaderValue, Method, StatusCode};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays scripted results and counts how often it was called.
    pub(crate) struct Scripted {
        results: Mutex<VecDeque<Result<Response>>>,
        calls: AtomicUsize,
        repeat_last: Option<fn() -> Result<Response>>,
    }

    impl Scripted {
        pub(crate) fn new(results: Vec<Result<Response>>) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(results.into()),
                calls: AtomicUsize::new(0),
                repeat_last: None,
            })
        }

        pub(crate) fn always(result: fn() -> Result<Response>) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(VecDeque::new()),
                calls: AtomicUsize::new(0),
                repeat_last: Some(result),
            })
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Handler for Scripted {
        async fn handle(&self, _req: Request) -> Result<Response> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.results.lock().unwrap().pop_front();
            match (next, self.repeat_last) {
                (Some(result), _) => result,
                (None, Some(make)) => make(),
                (None, None) => Err(Error::ConfigurationError(
                    "no scripted result left".to_string(),
                )),
            }
        }
    }

    pub(crate) fn response(status: u16, content_type: &'static str, body: &'static str) -> Response {
        let mut headers = HeaderMap::new();
        if !content_type.is_empty() {
            headers.insert("content-type", HeaderValue::from_static(content_type));
        }
        Response::new(
            StatusCode::from_u16(status).unwrap(),
            headers,
            Bytes::from_static(body.as_bytes()),
        )
    }

    pub(crate) fn request(ctx: &Context) -> Request {
        Request::new(
            ctx,
            Method::GET,
            url::Url::parse("https://api.example.com/v1/servers/1").unwrap(),
        )
    }
}
