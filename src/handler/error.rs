use super::Handler;
use crate::error::{ApiError, ErrorEnvelope};
use crate::{Error, Request, Response, Result};
use async_trait::async_trait;

/// Promotes 4xx/5xx responses into errors.
pub(crate) struct ErrorHandler {
    next: Box<dyn Handler>,
}

impl ErrorHandler {
    pub(crate) fn new(next: Box<dyn Handler>) -> Self {
        Self { next }
    }
}

#[async_trait]
impl Handler for ErrorHandler {
    async fn handle(&self, req: Request) -> Result<Response> {
        let response = self.next.handle(req).await?;
        let status = response.status;

        if !(400..=599).contains(&status.as_u16()) {
            return Ok(response);
        }

        if status.is_client_error() {
            tracing::error!(
                status = status.as_u16(),
                response = %response.text(),
                "Client error (4xx)"
            );
        } else {
            tracing::warn!(
                status = status.as_u16(),
                response = %response.text(),
                "Server error (5xx)"
            );
        }

        Err(error_from_response(response))
    }
}

/// Decodes the API error envelope, falling back to a generic status error
/// when the body is not JSON or carries neither code nor message.
fn error_from_response(response: Response) -> Error {
    if !response.has_json_body() {
        return Error::Status {
            response: Box::new(response),
        };
    }

    match serde_json::from_slice::<ErrorEnvelope>(response.body()) {
        Ok(envelope) if !(envelope.error.code.is_empty() && envelope.error.message.is_empty()) => {
            Error::Api(ApiError::from_body(envelope.error).with_response(response))
        }
        _ => Error::Status {
            response: Box::new(response),
        },
    }
}
