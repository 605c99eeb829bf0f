use super::Handler;
use crate::{Error, Request, Response, Result};
use async_trait::async_trait;
use http::header::AUTHORIZATION;
use http::HeaderMap;
use std::fmt::Write as _;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Shared sink for request/response dumps.
pub(crate) type DebugWriter = Arc<Mutex<dyn Write + Send>>;

/// Dumps every request and response to a writer, with the token redacted.
pub(crate) struct DebugHandler {
    next: Box<dyn Handler>,
    output: DebugWriter,
}

impl DebugHandler {
    pub(crate) fn new(next: Box<dyn Handler>, output: DebugWriter) -> Self {
        Self { next, output }
    }

    fn write(&self, dump: &str) {
        match self.output.lock() {
            Ok(mut output) => {
                if let Err(e) = output.write_all(dump.as_bytes()) {
                    tracing::warn!(error = %e, "Failed to write debug output");
                }
            }
            Err(_) => tracing::warn!("Debug writer lock poisoned"),
        }
    }
}

#[async_trait]
impl Handler for DebugHandler {
    async fn handle(&self, req: Request) -> Result<Response> {
        self.write(&format!("--- Request:\n{}\n\n", dump_request(&req)));

        let result = self.next.handle(req).await;

        let response = match &result {
            Ok(response) => Some(response),
            Err(Error::Status { response }) => Some(response.as_ref()),
            Err(Error::Api(err)) => err.response(),
            Err(_) => None,
        };
        if let Some(response) = response {
            self.write(&format!("--- Response:\n{}\n\n", dump_response(response)));
        }

        result
    }
}

fn dump_request(req: &Request) -> String {
    let mut target = req.url.path().to_string();
    if let Some(query) = req.url.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut out = format!("{} {} HTTP/1.1\r\n", req.method, target);
    if let Some(host) = req.url.host_str() {
        let _ = write!(out, "Host: {}\r\n", host);
    }

    let mut headers = req.headers.clone();
    if headers.contains_key(AUTHORIZATION) {
        headers.insert(AUTHORIZATION, http::HeaderValue::from_static("REDACTED"));
    }
    write_headers(&mut out, &headers);
    out.push_str("\r\n");

    if let Some(body) = &req.body {
        out.push_str(&String::from_utf8_lossy(body));
    }
    out
}

fn dump_response(response: &Response) -> String {
    let mut out = format!("HTTP/1.1 {}\r\n", response.status);
    write_headers(&mut out, &response.headers);
    out.push_str("\r\n");
    out.push_str(&response.text());
    out
}

fn write_headers(out: &mut String, headers: &HeaderMap) {
    for (name, value) in headers {
        let _ = write!(
            out,
            "{}: {}\r\n",
            name,
            String::from_utf8_lossy(value.as_bytes())
        );
    }
}
