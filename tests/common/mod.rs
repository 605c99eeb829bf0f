#![allow(dead_code)]

use hcloud::{Action, Backoff, Client, ClientBuilder};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use wiremock::{MockServer, Request, Respond, ResponseTemplate};

/// Logs through the test harness; filter with `RUST_LOG=hcloud=debug`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn builder(server: &MockServer) -> ClientBuilder {
    init_tracing();
    Client::builder()
        .endpoint(server.uri())
        .token("token")
        .backoff(Backoff::Constant(Duration::ZERO))
        .poll_backoff(Backoff::Constant(Duration::ZERO))
}

pub fn client(server: &MockServer) -> Client {
    builder(server).build().unwrap()
}

pub fn action_json(id: i64, status: &str, progress: u32) -> Value {
    let mut action = json!({
        "id": id,
        "command": "create_server",
        "status": status,
        "progress": progress,
        "started": "2016-01-30T23:55:00+00:00",
        "finished": null,
        "resources": [{"id": 42, "type": "server"}],
        "error": null
    });
    if status == "error" {
        action["finished"] = json!("2016-01-30T23:56:00+00:00");
        action["error"] = json!({"code": "action_failed", "message": "Action failed"});
    }
    action
}

pub fn action(id: i64, status: &str, progress: u32) -> Action {
    serde_json::from_value(action_json(id, status, progress)).unwrap()
}

pub fn actions_page(actions: Vec<Value>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "actions": actions,
        "meta": {"pagination": {
            "page": 1,
            "per_page": 25,
            "previous_page": null,
            "next_page": null,
            "last_page": 1,
            "total_entries": 1
        }}
    }))
}

/// Answers with the given templates in order and repeats the last one.
pub struct Sequence(Mutex<VecDeque<ResponseTemplate>>);

impl Sequence {
    pub fn new(templates: Vec<ResponseTemplate>) -> Self {
        Self(Mutex::new(templates.into()))
    }
}

impl Respond for Sequence {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let mut templates = self.0.lock().unwrap();
        if templates.len() > 1 {
            templates.pop_front().unwrap()
        } else {
            templates
                .front()
                .cloned()
                .unwrap_or_else(|| ResponseTemplate::new(500))
        }
    }
}
