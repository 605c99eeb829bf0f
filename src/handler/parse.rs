use super::Handler;
use crate::response::MetaEnvelope;
use crate::{Request, Response, Result};
use async_trait::async_trait;

/// Validates JSON bodies of successful responses and extracts `meta.pagination`.
///
/// Decoding into the caller's type happens in [`crate::Client::execute_json`]
/// from the same cached body.
pub(crate) struct ParseHandler {
    next: Box<dyn Handler>,
}

impl ParseHandler {
    pub(crate) fn new(next: Box<dyn Handler>) -> Self {
        Self { next }
    }
}

#[async_trait]
impl Handler for ParseHandler {
    async fn handle(&self, req: Request) -> Result<Response> {
        let mut response = self.next.handle(req).await?;

        if response.has_json_body() {
            let envelope: MetaEnvelope = response.json()?;
            response.meta.pagination = envelope
                .meta
                .and_then(|meta| meta.pagination)
                .map(Into::into);
        }
        Ok(response)
    }
}
