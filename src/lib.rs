//! # hcloud - core of a Hetzner Cloud API client
//!
//! This crate carries the plumbing every Hetzner Cloud resource client is
//! built on: request construction, a handler chain with retries and typed
//! error decoding, page iteration, and polling of long-running actions.
//!
//! ## Quick Start
//!
//! ```no_run
//! use hcloud::{Action, Client, Context};
//! use http::Method;
//! use serde::Deserialize;
//! use std::time::Duration;
//!
//! #[derive(Deserialize)]
//! struct PowerOnResult {
//!     action: Action,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), hcloud::Error> {
//!     let client = Client::builder()
//!         .token(std::env::var("HCLOUD_TOKEN").unwrap_or_default())
//!         .application("my-tool", "0.1.0")
//!         .build()?;
//!
//!     let ctx = Context::background().with_timeout(Duration::from_secs(300));
//!
//!     // Start an action and wait for it to finish
//!     let req = client.new_request(&ctx, Method::POST, "/servers/42/actions/poweron", None)?;
//!     let (result, _) = client.execute_json::<PowerOnResult>(req).await?;
//!     client.action().wait_for(&ctx, &[result.action]).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Handler chain** - parse, retry, debug, error and rate-limit stages around the HTTP transport
//! - **Typed API errors** - error codes and details decoded from the error envelope, matched with [`is_error`]
//! - **Retries** - exponential backoff with jitter for conflicts, rate limits, timeouts and gateway errors
//! - **Pagination** - [`iter_pages`] follows `next_page` until the last page
//! - **Action polling** - wait for actions, with callbacks or progress channels
//! - **Cancellation** - every request and wait runs in a [`Context`] with optional deadline
//! - **Logging and metrics** - structured `tracing` events and optional Prometheus collectors
//!
//! ## Error Handling
//!
//! ```no_run
//! use hcloud::{Client, Context, Error, ErrorCode, ErrorDetails};
//! use http::Method;
//!
//! # async fn example(client: Client) -> Result<(), Error> {
//! let ctx = Context::background();
//! let req = client.new_json_request(&ctx, Method::POST, "/servers", &serde_json::json!({}))?;
//!
//! match client.execute(req).await {
//!     Ok(_) => {}
//!     Err(Error::Api(err)) if err.code == ErrorCode::InvalidInput => {
//!         if let Some(ErrorDetails::InvalidInput(details)) = &err.details {
//!             for field in &details.fields {
//!                 eprintln!("{}: {}", field.name, field.messages.join(", "));
//!             }
//!         }
//!     }
//!     Err(err) if err.is_error(&ErrorCode::Locked) => eprintln!("resource is locked"),
//!     Err(err) => return Err(err),
//! }
//! # Ok(())
//! # }
//! ```

mod action;
mod client;
mod context;
mod error;
mod handler;
mod instrumentation;
mod pagination;
pub mod rate_limit;
mod request;
mod response;
pub mod retry;

pub use action::{
    Action, ActionClient, ActionError, ActionErrorBody, ActionListOpts, ActionResource,
    ActionStatus,
};
pub use client::{
    Client, ClientBuilder, PollOpts, RetryOpts, DEFAULT_ENDPOINT, DEFAULT_MAX_RETRIES,
};
pub use context::Context;
pub use error::{
    is_error, ApiError, DeprecatedApiEndpointDetails, Error, ErrorBody, ErrorCode, ErrorDetails,
    ErrorEnvelope, InvalidInputDetails, InvalidInputField, Result,
};
pub use handler::Handler;
pub use pagination::{first_by_name, iter_pages, ListOpts};
pub use request::Request;
pub use response::{Meta, Pagination, Response};
pub use retry::{Backoff, RetryOnRetryable, RetryPredicate};
