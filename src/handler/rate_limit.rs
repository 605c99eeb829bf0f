use super::Handler;
use crate::rate_limit::RateLimit;
use crate::{Request, Response, Result};
use async_trait::async_trait;

/// Records the rate limit headers on every response, error responses included.
pub(crate) struct RateLimitHandler {
    next: Box<dyn Handler>,
}

impl RateLimitHandler {
    pub(crate) fn new(next: Box<dyn Handler>) -> Self {
        Self { next }
    }
}

#[async_trait]
impl Handler for RateLimitHandler {
    async fn handle(&self, req: Request) -> Result<Response> {
        let mut response = self.next.handle(req).await?;
        response.meta.ratelimit = RateLimit::from_headers(&response.headers);

        if response.meta.ratelimit.is_exhausted() {
            tracing::warn!(
                limit = response.meta.ratelimit.limit,
                reset = ?response.meta.ratelimit.reset,
                "Rate limit exhausted"
            );
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::testing::{request, response, Scripted};
    use crate::Context;
    use http::HeaderValue;
    use std::time::{Duration, UNIX_EPOCH};

    fn limited() -> Result<Response> {
        let mut resp = response(200, "application/json", "{}");
        resp.headers
            .insert("RateLimit-Limit", HeaderValue::from_static("1000"));
        resp.headers
            .insert("RateLimit-Remaining", HeaderValue::from_static("999"));
        resp.headers
            .insert("RateLimit-Reset", HeaderValue::from_static("1511954577"));
        Ok(resp)
    }

    #[tokio::test]
    async fn test_headers_are_recorded() {
        let handler = RateLimitHandler::new(Box::new(Scripted::always(limited)));
        let resp = handler
            .handle(request(&Context::background()))
            .await
            .unwrap();

        assert_eq!(resp.meta.ratelimit.limit, 1000);
        assert_eq!(resp.meta.ratelimit.remaining, 999);
        assert_eq!(
            resp.meta.ratelimit.reset,
            Some(UNIX_EPOCH + Duration::from_secs(1511954577))
        );
    }
}
