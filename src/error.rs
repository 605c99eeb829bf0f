//! Error types for Hetzner Cloud API calls.
//!
//! [`Error`] is the single error type returned by the client. Typed API errors
//! decoded from the server's JSON error envelope are represented by
//! [`ApiError`] and can be matched by code with [`is_error`], which also looks
//! through wrapping errors.

use crate::action::ActionError;
use crate::Response;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The main error type for Hetzner Cloud API calls.
///
/// # Examples
///
/// ```no_run
/// use hcloud::{Client, Context, Error, ErrorCode};
/// use http::Method;
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder().token("secret").build()?;
/// let ctx = Context::background();
/// let req = client.new_request(&ctx, Method::GET, "/servers/42", None)?;
///
/// match client.execute(req).await {
///     Ok(response) => println!("status {}", response.status),
///     Err(err) if err.is_error(&ErrorCode::NotFound) => println!("no such server"),
///     Err(err) => return Err(err),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A transport-level error occurred (connection refused, DNS failure, timeout, ...).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a 4xx/5xx status but without a usable error envelope.
    #[error("hcloud: server responded with status code {}", .response.status.as_u16())]
    Status {
        /// The response that triggered the error.
        response: Box<Response>,
    },

    /// A typed error decoded from the API error envelope.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// An action finished with status `error`.
    #[error(transparent)]
    Action(#[from] ActionError),

    /// The action waiter tracked ids the API no longer returned.
    #[error("actions not found: [{}]", format_ids(.0))]
    ActionsNotFound(Vec<i64>),

    /// Failed to deserialize the response body into the expected type.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// Invalid client or request configuration.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Failed to serialize the request body.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// An invalid URL was built from the endpoint and path.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The request context was canceled.
    #[error("context canceled")]
    Canceled,

    /// The request context deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// An error produced outside the library, e.g. by an action update callback.
    #[error(transparent)]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wraps a foreign error, typically one returned from an update callback.
    pub fn custom(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Custom(err.into())
    }

    /// Returns `true` if this error should be retried by the default retry policy.
    ///
    /// Retriable are transport timeouts, responses with status 502 or 504, and
    /// API errors with code `conflict`, `rate_limit_exceeded` or `timeout`.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(err) => err.is_timeout(),
            Error::Status { response } => matches!(
                response.status,
                StatusCode::BAD_GATEWAY | StatusCode::GATEWAY_TIMEOUT
            ),
            Error::Api(err) => matches!(
                err.code,
                ErrorCode::Conflict | ErrorCode::RateLimitExceeded | ErrorCode::Timeout
            ),
            _ => false,
        }
    }

    /// Returns `true` for errors caused by context cancellation or an expired deadline.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Canceled | Error::DeadlineExceeded)
    }

    /// Returns `true` if this error, or any error it wraps, is an API error with `code`.
    pub fn is_error(&self, code: &ErrorCode) -> bool {
        is_error(self, code)
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Status { response } => Some(response.status),
            Error::Api(err) => err.response().map(|r| r.status),
            Error::DeserializationFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the response that triggered this error, if any.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Error::Status { response } => Some(response),
            Error::Api(err) => err.response(),
            _ => None,
        }
    }
}

/// Reports whether `err` or any error in its `source()` chain is an API error
/// carrying `code`.
///
/// # Examples
///
/// ```
/// use hcloud::{is_error, ApiError, Error, ErrorCode};
///
/// let err = Error::Api(ApiError::new(ErrorCode::Locked, "server is locked"));
/// assert!(is_error(&err, &ErrorCode::Locked));
/// assert!(!is_error(&err, &ErrorCode::NotFound));
/// ```
pub fn is_error(err: &(dyn std::error::Error + 'static), code: &ErrorCode) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if api_error_of(err).is_some_and(|api| api.code == *code) {
            return true;
        }
        current = err.source();
    }
    false
}

fn api_error_of<'a>(err: &'a (dyn std::error::Error + 'static)) -> Option<&'a ApiError> {
    if let Some(api) = err.downcast_ref::<ApiError>() {
        return Some(api);
    }
    match err.downcast_ref::<Error>()? {
        Error::Api(api) => Some(api),
        Error::Custom(inner) => api_error_of(inner.as_ref()),
        _ => None,
    }
}

fn format_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Machine-readable error codes returned by the API.
///
/// Codes this crate does not know are kept verbatim in [`ErrorCode::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    InvalidInput,
    JsonError,
    Locked,
    NotFound,
    RateLimitExceeded,
    ResourceLimitExceeded,
    ResourceUnavailable,
    ServiceError,
    ServerError,
    UniquenessError,
    Protected,
    Maintenance,
    Conflict,
    UnsupportedError,
    TokenReadonly,
    Unavailable,
    Timeout,
    DeprecatedApiEndpoint,
    UnknownError,
    ActionFailed,
    /// A code not covered by the variants above.
    Other(String),
}

impl ErrorCode {
    /// Returns the wire representation of the code.
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::Forbidden => "forbidden",
            ErrorCode::InvalidInput => "invalid_input",
            ErrorCode::JsonError => "json_error",
            ErrorCode::Locked => "locked",
            ErrorCode::NotFound => "not_found",
            ErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            ErrorCode::ResourceLimitExceeded => "resource_limit_exceeded",
            ErrorCode::ResourceUnavailable => "resource_unavailable",
            ErrorCode::ServiceError => "service_error",
            ErrorCode::ServerError => "server_error",
            ErrorCode::UniquenessError => "uniqueness_error",
            ErrorCode::Protected => "protected",
            ErrorCode::Maintenance => "maintenance",
            ErrorCode::Conflict => "conflict",
            ErrorCode::UnsupportedError => "unsupported_error",
            ErrorCode::TokenReadonly => "token_readonly",
            ErrorCode::Unavailable => "unavailable",
            ErrorCode::Timeout => "timeout",
            ErrorCode::DeprecatedApiEndpoint => "deprecated_api_endpoint",
            ErrorCode::UnknownError => "unknown_error",
            ErrorCode::ActionFailed => "action_failed",
            ErrorCode::Other(code) => code,
        }
    }
}

impl From<&str> for ErrorCode {
    fn from(code: &str) -> Self {
        match code {
            "unauthorized" => ErrorCode::Unauthorized,
            "forbidden" => ErrorCode::Forbidden,
            "invalid_input" => ErrorCode::InvalidInput,
            "json_error" => ErrorCode::JsonError,
            "locked" => ErrorCode::Locked,
            "not_found" => ErrorCode::NotFound,
            "rate_limit_exceeded" => ErrorCode::RateLimitExceeded,
            "resource_limit_exceeded" => ErrorCode::ResourceLimitExceeded,
            "resource_unavailable" => ErrorCode::ResourceUnavailable,
            "service_error" => ErrorCode::ServiceError,
            "server_error" => ErrorCode::ServerError,
            "uniqueness_error" => ErrorCode::UniquenessError,
            "protected" => ErrorCode::Protected,
            "maintenance" => ErrorCode::Maintenance,
            "conflict" => ErrorCode::Conflict,
            "unsupported_error" => ErrorCode::UnsupportedError,
            "token_readonly" => ErrorCode::TokenReadonly,
            "unavailable" => ErrorCode::Unavailable,
            "timeout" => ErrorCode::Timeout,
            "deprecated_api_endpoint" => ErrorCode::DeprecatedApiEndpoint,
            "unknown_error" => ErrorCode::UnknownError,
            "action_failed" => ErrorCode::ActionFailed,
            other => ErrorCode::Other(other.to_string()),
        }
    }
}

impl From<String> for ErrorCode {
    fn from(code: String) -> Self {
        ErrorCode::from(code.as_str())
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> Self {
        code.as_str().to_string()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured details attached to an [`ApiError`].
///
/// The shape of `details` depends on the error code.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorDetails {
    /// Details of an `invalid_input` error.
    InvalidInput(InvalidInputDetails),
    /// Details of a `deprecated_api_endpoint` error.
    DeprecatedApiEndpoint(DeprecatedApiEndpointDetails),
    /// Details of any other code, kept as raw JSON.
    Other(serde_json::Value),
}

/// Fields rejected by an `invalid_input` error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidInputDetails {
    pub fields: Vec<InvalidInputField>,
}

/// A single rejected field with its validation messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidInputField {
    pub name: String,
    pub messages: Vec<String>,
}

/// Announcement attached to a `deprecated_api_endpoint` error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeprecatedApiEndpointDetails {
    pub announcement: String,
}

/// The JSON error envelope: `{"error": {"code": ..., "message": ..., "details": ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

/// The inner object of an [`ErrorEnvelope`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// A typed error returned by the API.
///
/// Displayed as `<message> (<code>)`, or `<message> (<code>, <correlation id>)`
/// when the triggering response carried an `X-Correlation-Id` header.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// The machine-readable error code.
    pub code: ErrorCode,
    /// The human-readable message.
    pub message: String,
    /// Optional structured details.
    pub details: Option<ErrorDetails>,
    response: Option<Box<Response>>,
}

impl ApiError {
    /// Creates an error without details or response.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            response: None,
        }
    }

    /// Builds an error from the envelope's inner object, resolving `details` by code.
    pub fn from_body(body: ErrorBody) -> Self {
        let code = ErrorCode::from(body.code);
        let details = body.details.map(|raw| match code {
            ErrorCode::InvalidInput => serde_json::from_value(raw.clone())
                .map(ErrorDetails::InvalidInput)
                .unwrap_or(ErrorDetails::Other(raw)),
            ErrorCode::DeprecatedApiEndpoint => serde_json::from_value(raw.clone())
                .map(ErrorDetails::DeprecatedApiEndpoint)
                .unwrap_or(ErrorDetails::Other(raw)),
            _ => ErrorDetails::Other(raw),
        });

        Self {
            code,
            message: body.message,
            details,
            response: None,
        }
    }

    /// Attaches the response that triggered the error.
    pub fn with_response(mut self, response: Response) -> Self {
        self.response = Some(Box::new(response));
        self
    }

    /// Returns the response that triggered the error.
    pub fn response(&self) -> Option<&Response> {
        self.response.as_deref()
    }

    /// Returns the correlation id of the triggering response, if present.
    pub fn correlation_id(&self) -> Option<&str> {
        self.response()?.header("x-correlation-id")
    }

    /// Serializes the error back into the wire envelope.
    pub fn to_envelope(&self) -> ErrorEnvelope {
        let details = self.details.as_ref().map(|details| match details {
            ErrorDetails::InvalidInput(d) => {
                serde_json::to_value(d).unwrap_or(serde_json::Value::Null)
            }
            ErrorDetails::DeprecatedApiEndpoint(d) => {
                serde_json::to_value(d).unwrap_or(serde_json::Value::Null)
            }
            ErrorDetails::Other(raw) => raw.clone(),
        });

        ErrorEnvelope {
            error: ErrorBody {
                code: self.code.to_string(),
                message: self.message.clone(),
                details,
            },
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.correlation_id() {
            Some(id) if !id.is_empty() => write!(f, "{} ({}, {})", self.message, self.code, id),
            _ => write!(f, "{} ({})", self.message, self.code),
        }
    }
}

impl std::error::Error for ApiError {}

/// A specialized `Result` type for Hetzner Cloud API calls.
pub type Result<T> = std::result::Result<T, Error>;
