//! The API client.
//!
//! The [`Client`] type builds requests and sends them through the handler
//! chain. Use [`ClientBuilder`] to configure and create clients.

use crate::action::ActionClient;
use crate::handler::{self, ChainConfig, DebugWriter, Handler};
use crate::instrumentation::Metrics;
use crate::retry::{Backoff, RetryOnRetryable, RetryPredicate};
use crate::{Context, Error, Request, Response, Result};
use bytes::Bytes;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use http::{HeaderValue, Method};
use serde::{de::DeserializeOwned, Serialize};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// The public API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.hetzner.cloud/v1";

/// Retries after the first attempt before a retriable failure is returned.
pub const DEFAULT_MAX_RETRIES: usize = 5;

const USER_AGENT_BASE: &str = concat!("hcloud-rust/", env!("CARGO_PKG_VERSION"));

/// A client for the Hetzner Cloud API.
///
/// The client is cheap to clone and meant to be shared. All clones use the
/// same connection pool and handler chain.
///
/// # Examples
///
/// ```no_run
/// use hcloud::{Client, Context};
/// use http::Method;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct ServerEnvelope {
///     server: serde_json::Value,
/// }
///
/// # async fn example() -> Result<(), hcloud::Error> {
/// let client = Client::builder().token("secret").build()?;
/// let ctx = Context::background();
///
/// let req = client.new_request(&ctx, Method::GET, "/servers/42", None)?;
/// let (envelope, response) = client.execute_json::<ServerEnvelope>(req).await?;
/// println!("{} ({} requests left)", envelope.server, response.meta.ratelimit.remaining);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    endpoint: String,
    authorization: Option<HeaderValue>,
    user_agent: HeaderValue,
    poll_backoff: Backoff,
    handler: Box<dyn Handler>,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Returns the configured endpoint, without trailing slash.
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    /// Returns the client for the `/actions` endpoints.
    pub fn action(&self) -> ActionClient {
        ActionClient::new(self.clone())
    }

    pub(crate) fn poll_backoff(&self) -> &Backoff {
        &self.inner.poll_backoff
    }

    /// Builds a request for `path`, relative to the endpoint.
    ///
    /// Sets the authorization, user agent and accept headers, and the JSON
    /// content type when a body is given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the endpoint and path do not form a
    /// valid URL.
    pub fn new_request(
        &self,
        ctx: &Context,
        method: Method,
        path: &str,
        body: Option<Bytes>,
    ) -> Result<Request> {
        let url = Url::parse(&format!("{}{}", self.inner.endpoint, path))?;
        let mut req = Request::new(ctx, method, url);

        if let Some(authorization) = &self.inner.authorization {
            req.headers.insert(AUTHORIZATION, authorization.clone());
        }
        req.headers.insert(USER_AGENT, self.inner.user_agent.clone());
        req.headers
            .insert(ACCEPT, HeaderValue::from_static("application/json"));
        if body.is_some() {
            req.headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        req.body = body;

        Ok(req)
    }

    /// Builds a request with `body` encoded as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationFailed`] if `body` cannot be encoded.
    pub fn new_json_request<B: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<Request> {
        let body = serde_json::to_vec(body).map_err(|e| Error::SerializationFailed(e.to_string()))?;
        self.new_request(ctx, method, path, Some(Bytes::from(body)))
    }

    /// Sends `req` through the handler chain.
    pub async fn execute(&self, req: Request) -> Result<Response> {
        self.inner.handler.handle(req).await
    }

    /// Sends `req` and decodes the response body into `T`.
    ///
    /// # Errors
    ///
    /// Besides the errors of [`execute`](Self::execute), returns
    /// [`Error::DeserializationFailed`] if the body does not match `T`.
    pub async fn execute_json<T: DeserializeOwned>(&self, req: Request) -> Result<(T, Response)> {
        let response = self.execute(req).await?;
        let value = response.json::<T>()?;
        Ok((value, response))
    }
}

/// Options for polling actions.
#[derive(Debug, Clone)]
pub struct PollOpts {
    /// Wait between two polls.
    pub backoff: Backoff,
}

impl Default for PollOpts {
    fn default() -> Self {
        Self {
            backoff: Backoff::default_poll(),
        }
    }
}

/// Options for retrying failed requests.
#[derive(Debug, Clone)]
pub struct RetryOpts {
    /// Wait before each retry.
    pub backoff: Backoff,
    /// Retries after the first attempt.
    pub max_retries: usize,
}

impl Default for RetryOpts {
    fn default() -> Self {
        Self {
            backoff: Backoff::default_retry(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use hcloud::{Backoff, ClientBuilder, RetryOpts};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), hcloud::Error> {
/// let client = ClientBuilder::new()
///     .token("secret")
///     .application("my-tool", "1.2.0")
///     .retry_opts(RetryOpts {
///         backoff: Backoff::Constant(Duration::from_secs(2)),
///         max_retries: 3,
///     })
///     .poll_backoff(Backoff::Constant(Duration::from_secs(1)))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    endpoint: String,
    token: String,
    user_agent: Option<String>,
    application: Option<(String, String)>,
    http_client: Option<reqwest::Client>,
    timeout: Option<Duration>,
    poll: PollOpts,
    retry: RetryOpts,
    retry_predicate: Arc<dyn RetryPredicate>,
    debug_writer: Option<DebugWriter>,
    registry: Option<prometheus::Registry>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token: String::new(),
            user_agent: None,
            application: None,
            http_client: None,
            timeout: None,
            poll: PollOpts::default(),
            retry: RetryOpts::default(),
            retry_predicate: Arc::new(RetryOnRetryable),
            debug_writer: None,
            registry: None,
        }
    }

    /// Sets the API endpoint. Trailing slashes are removed.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the API token sent as bearer token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// Replaces the base user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Prefixes the user agent with an application name and version.
    ///
    /// An empty version prefixes the name only.
    pub fn application(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.application = Some((name.into(), version.into()));
        self
    }

    /// Uses a preconfigured HTTP client instead of a default one.
    pub fn http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Sets a per-request timeout on the default HTTP client.
    ///
    /// Ignored when a client is passed with [`http_client`](Self::http_client).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the wait before each retry.
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.retry.backoff = backoff;
        self
    }

    /// Sets the number of retries after the first attempt.
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.retry.max_retries = max_retries;
        self
    }

    /// Sets backoff and retry count at once.
    pub fn retry_opts(mut self, opts: RetryOpts) -> Self {
        self.retry = opts;
        self
    }

    /// Sets the wait between two action polls.
    pub fn poll_backoff(mut self, backoff: Backoff) -> Self {
        self.poll.backoff = backoff;
        self
    }

    /// Sets the action polling options.
    pub fn poll_opts(mut self, opts: PollOpts) -> Self {
        self.poll = opts;
        self
    }

    /// Sets a custom retry predicate.
    ///
    /// By default, requests are retried based on [`Error::is_retryable`].
    pub fn retry_predicate(mut self, predicate: impl RetryPredicate + 'static) -> Self {
        self.retry_predicate = Arc::new(predicate);
        self
    }

    /// Dumps every request and response to `writer`, with the token redacted.
    pub fn debug_writer(mut self, writer: impl Write + Send + 'static) -> Self {
        let writer: DebugWriter = Arc::new(Mutex::new(writer));
        self.debug_writer = Some(writer);
        self
    }

    /// Records request metrics in `registry`.
    pub fn instrumentation(mut self, registry: &prometheus::Registry) -> Self {
        self.registry = Some(registry.clone());
        self
    }

    fn user_agent_value(&self) -> String {
        let base = self.user_agent.as_deref().unwrap_or(USER_AGENT_BASE);
        match &self.application {
            Some((name, version)) if !version.is_empty() => {
                format!("{}/{} {}", name, version, base)
            }
            Some((name, _)) => format!("{} {}", name, base),
            None => base.to_string(),
        }
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a valid URL, the token or user
    /// agent contain invalid header characters, or the metrics cannot be
    /// registered.
    pub fn build(self) -> Result<Client> {
        Url::parse(&self.endpoint)?;

        let authorization = if self.token.is_empty() {
            None
        } else {
            let mut value = HeaderValue::try_from(format!("Bearer {}", self.token))
                .map_err(|_| Error::ConfigurationError("Invalid token".to_string()))?;
            value.set_sensitive(true);
            Some(value)
        };

        let user_agent = HeaderValue::try_from(self.user_agent_value())
            .map_err(|e| Error::ConfigurationError(format!("Invalid user agent: {}", e)))?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => {
                let mut builder = reqwest::Client::builder();
                if let Some(timeout) = self.timeout {
                    builder = builder.timeout(timeout);
                }
                builder.build().map_err(|e| {
                    Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
                })?
            }
        };

        let metrics = self
            .registry
            .as_ref()
            .map(Metrics::register)
            .transpose()?;

        let handler = handler::assemble(ChainConfig {
            http_client,
            metrics,
            debug_writer: self.debug_writer,
            backoff: self.retry.backoff,
            max_retries: self.retry.max_retries,
            retry_predicate: self.retry_predicate,
        });

        Ok(Client {
            inner: Arc::new(ClientInner {
                endpoint: self.endpoint,
                authorization,
                user_agent,
                poll_backoff: self.poll.backoff,
                handler,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
