//! Rate limit header parsing.
//!
//! Every API response carries `RateLimit-Limit`, `RateLimit-Remaining` and
//! `RateLimit-Reset` headers. Malformed or missing headers are ignored.

use http::HeaderMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Rate limit state reported by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimit {
    /// Number of requests allowed in the current window.
    pub limit: u64,

    /// Number of requests remaining in the current window.
    pub remaining: u64,

    /// When the window resets (from the `RateLimit-Reset` Unix timestamp).
    pub reset: Option<SystemTime>,

    /// How long to wait before retrying (from the `Retry-After` header).
    pub retry_after: Option<Duration>,
}

impl RateLimit {
    /// Extracts rate limit information from HTTP response headers.
    ///
    /// # Examples
    ///
    /// ```
    /// use hcloud::rate_limit::RateLimit;
    /// use http::HeaderMap;
    /// use std::time::{Duration, UNIX_EPOCH};
    ///
    /// let mut headers = HeaderMap::new();
    /// headers.insert("ratelimit-limit", "1000".parse().unwrap());
    /// headers.insert("ratelimit-remaining", "999".parse().unwrap());
    /// headers.insert("ratelimit-reset", "1511954577".parse().unwrap());
    ///
    /// let ratelimit = RateLimit::from_headers(&headers);
    /// assert_eq!(ratelimit.limit, 1000);
    /// assert_eq!(ratelimit.remaining, 999);
    /// assert_eq!(
    ///     ratelimit.reset,
    ///     Some(UNIX_EPOCH + Duration::from_secs(1511954577))
    /// );
    /// ```
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            limit: parse_number(headers, "ratelimit-limit").unwrap_or_default(),
            remaining: parse_number(headers, "ratelimit-remaining").unwrap_or_default(),
            reset: parse_number(headers, "ratelimit-reset")
                .and_then(|ts| UNIX_EPOCH.checked_add(Duration::from_secs(ts))),
            retry_after: parse_retry_after(headers),
        }
    }

    /// Returns `true` if the current window is used up.
    pub fn is_exhausted(&self) -> bool {
        self.retry_after.is_some() || (self.limit > 0 && self.remaining == 0)
    }
}

fn parse_number(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// Parses the Retry-After header.
///
/// Supports both delay-seconds (integer) and HTTP-date formats.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header = headers.get("retry-after")?.to_str().ok()?;

    if let Ok(seconds) = header.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    if let Ok(date_time) = httpdate::parse_http_date(header) {
        if let Ok(duration) = date_time.duration_since(SystemTime::now()) {
            return Some(duration);
        }
    }

    None
}
