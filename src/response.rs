//! Response type that keeps the raw body next to the decoded metadata.
//!
//! The transport handler reads the body exactly once and caches it as
//! [`Bytes`]; every later consumer decodes from the cached copy, so the body
//! can be read any number of times.

use crate::rate_limit::RateLimit;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::Deserialize;

/// An HTTP response as seen by the handler chain.
///
/// # Examples
///
/// ```
/// use hcloud::Response;
/// use http::{HeaderMap, StatusCode};
///
/// let response = Response::new(StatusCode::OK, HeaderMap::new(), "{}".into());
///
/// // The body is cached, reading it twice yields the same bytes.
/// assert_eq!(response.body(), response.body());
/// assert_eq!(response.text(), "{}");
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// Metadata decoded by the handler chain.
    pub meta: Meta,

    body: Bytes,
}

impl Response {
    /// Creates a new `Response` with empty metadata.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            meta: Meta::default(),
            body,
        }
    }

    /// Returns the cached response body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body as text, replacing invalid UTF-8 sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Returns a header value by name, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Returns `true` if the response has a non-empty body with a JSON content type.
    pub fn has_json_body(&self) -> bool {
        !self.body.is_empty()
            && self
                .header("content-type")
                .is_some_and(|ct| ct.starts_with("application/json"))
    }

    /// Decodes the cached body into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DeserializationFailed`] with the raw body when
    /// decoding fails.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> crate::Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            tracing::error!(
                error = %e,
                raw_response = %self.text(),
                "Failed to deserialize response"
            );
            crate::Error::DeserializationFailed {
                raw_response: self.text(),
                serde_error: e.to_string(),
                status: self.status,
            }
        })
    }
}

/// Response-level metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Meta {
    /// Pagination info of list responses.
    pub pagination: Option<Pagination>,
    /// Rate limit info from the response headers.
    pub ratelimit: RateLimit,
}

/// Pagination info from the `meta.pagination` object of list responses.
///
/// A `next_page` of `0` marks the last page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub previous_page: Option<u32>,
    pub next_page: u32,
    pub last_page: u32,
    pub total_entries: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MetaEnvelope {
    #[serde(default)]
    pub meta: Option<MetaBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MetaBody {
    #[serde(default)]
    pub pagination: Option<PaginationBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PaginationBody {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    per_page: u32,
    #[serde(default)]
    previous_page: Option<u32>,
    #[serde(default)]
    next_page: Option<u32>,
    #[serde(default)]
    last_page: Option<u32>,
    #[serde(default)]
    total_entries: Option<u32>,
}

impl From<PaginationBody> for Pagination {
    fn from(body: PaginationBody) -> Self {
        Self {
            page: body.page,
            per_page: body.per_page,
            previous_page: body.previous_page,
            next_page: body.next_page.unwrap_or(0),
            last_page: body.last_page.unwrap_or(0),
            total_entries: body.total_entries.unwrap_or(0),
        }
    }
}
