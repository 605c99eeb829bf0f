use super::Handler;
use crate::retry::{Backoff, RetryPredicate};
use crate::{Request, Response, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Re-issues the request while the predicate deems the failure retriable.
///
/// The first attempt does not count towards `max_retries`, so a failing
/// request is sent at most `max_retries + 1` times.
pub(crate) struct RetryHandler {
    next: Box<dyn Handler>,
    backoff: Backoff,
    max_retries: usize,
    predicate: Arc<dyn RetryPredicate>,
}

impl RetryHandler {
    pub(crate) fn new(
        next: Box<dyn Handler>,
        backoff: Backoff,
        max_retries: usize,
        predicate: Arc<dyn RetryPredicate>,
    ) -> Self {
        Self {
            next,
            backoff,
            max_retries,
            predicate,
        }
    }
}

#[async_trait]
impl Handler for RetryHandler {
    async fn handle(&self, req: Request) -> Result<Response> {
        let mut attempt = 0;

        loop {
            let err = match self.next.handle(req.clone()).await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            if !self.predicate.should_retry(&err, attempt) || attempt >= self.max_retries {
                return Err(err);
            }

            let delay = self.backoff.delay(attempt);
            tracing::info!(
                error = %err,
                attempt = attempt,
                delay_ms = delay.as_millis(),
                method = %req.method,
                path = %req.operation_path,
                "Retrying request after delay"
            );

            req.context().sleep(delay).await?;
            attempt += 1;
        }
    }
}
