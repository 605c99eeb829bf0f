//! Requests flowing through the handler chain.

use crate::Context;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use url::Url;

/// A fully built API request.
///
/// Requests are cheap to clone: the body is a shared, re-readable
/// [`Bytes`] buffer, so the retry handler can replay it any number of times.
#[derive(Debug, Clone)]
pub struct Request {
    /// The HTTP method (GET, POST, etc.).
    pub method: Method,

    /// The absolute request URL.
    pub url: Url,

    /// Request headers.
    pub headers: HeaderMap,

    /// Optional request body.
    pub body: Option<Bytes>,

    /// Low-cardinality path template used as a metrics label, e.g.
    /// `/servers/-/actions/attach`.
    pub operation_path: String,

    context: Context,
}

impl Request {
    /// Creates a request without headers or body.
    pub fn new(ctx: &Context, method: Method, url: Url) -> Self {
        let operation_path = operation_path(url.path());
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            operation_path,
            context: ctx.clone(),
        }
    }

    /// Returns the context the request runs in.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Replaces the request context.
    pub fn with_context(mut self, ctx: &Context) -> Self {
        self.context = ctx.clone();
        self
    }

    /// Overrides the operation path label.
    pub fn with_operation_path(mut self, operation_path: impl Into<String>) -> Self {
        self.operation_path = operation_path.into();
        self
    }

    /// Adds a header to the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, crate::Error> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| crate::Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| crate::Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Appends query parameters to the URL, keeping their order.
    pub fn with_query_pairs<'a>(
        mut self,
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let mut pairs = pairs.into_iter().peekable();
        if pairs.peek().is_some() {
            self.url.query_pairs_mut().extend_pairs(pairs);
        }
        self
    }
}

/// Builds the metrics label for a URL path.
///
/// The API version prefix is dropped and every numeric segment is replaced
/// with `-`.
pub(crate) fn operation_path(path: &str) -> String {
    let path = path.split('?').next().unwrap_or_default();
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments
        .first()
        .is_some_and(|s| s.len() > 1 && s.starts_with('v') && s[1..].bytes().all(|b| b.is_ascii_digit()))
    {
        segments.remove(0);
    }

    let mut label = String::new();
    for segment in segments {
        label.push('/');
        if segment.bytes().all(|b| b.is_ascii_digit()) {
            label.push('-');
        } else {
            label.push_str(segment);
        }
    }
    if label.is_empty() {
        label.push('/');
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_path() {
        assert_eq!(
            operation_path("/v1/servers/42/actions/attach"),
            "/servers/-/actions/attach"
        );
        assert_eq!(operation_path("/servers/42?page=2"), "/servers/-");
        assert_eq!(operation_path("/actions"), "/actions");
        assert_eq!(operation_path("/"), "/");
    }

    #[test]
    fn test_query_pairs_keep_order() {
        let url = Url::parse("https://api.example.com/actions").unwrap();
        let req = Request::new(&Context::background(), Method::GET, url)
            .with_query_pairs([("sort", "status"), ("sort", "id")]);
        assert_eq!(req.url.query(), Some("sort=status&sort=id"));
        assert_eq!(req.operation_path, "/actions");
    }

    #[test]
    fn test_empty_query_pairs_leave_url_untouched() {
        let url = Url::parse("https://api.example.com/actions").unwrap();
        let req = Request::new(&Context::background(), Method::GET, url)
            .with_query_pairs(std::iter::empty());
        assert_eq!(req.url.as_str(), "https://api.example.com/actions");
    }

    #[test]
    fn test_invalid_header_is_rejected() {
        let url = Url::parse("https://api.example.com/").unwrap();
        let result = Request::new(&Context::background(), Method::GET, url)
            .with_header("bad header", "value");
        assert!(matches!(
            result,
            Err(crate::Error::ConfigurationError(_))
        ));
    }
}
