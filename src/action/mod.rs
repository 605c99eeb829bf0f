//! Actions: long-running server-side operations.
//!
//! Most mutating API calls return one or more [`Action`]s. The
//! [`ActionClient`] fetches them and waits for them to finish, either
//! blocking ([`ActionClient::wait_for`], [`ActionClient::wait_for_func`]) or
//! from a background task that reports progress over channels
//! ([`ActionClient::watch_overall_progress`], [`ActionClient::watch_progress`]).

mod waiter;
mod watch;

use crate::pagination::{encode_query, iter_pages, ListOpts};
use crate::{Client, Context, Error, ErrorCode, Response, Result};
use chrono::{DateTime, Utc};
use http::Method;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of an [`Action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Running,
    Success,
    Error,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Running => "running",
            ActionStatus::Success => "success",
            ActionStatus::Error => "error",
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A snapshot of a long-running operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: i64,
    pub status: ActionStatus,
    #[serde(default)]
    pub command: String,
    /// Completion in percent, `0..=100`.
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub started: DateTime<Utc>,
    #[serde(default)]
    pub finished: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<ActionErrorBody>,
    #[serde(default)]
    pub resources: Vec<ActionResource>,
}

impl Action {
    /// Returns `true` once the action succeeded or failed.
    pub fn is_finished(&self) -> bool {
        self.status != ActionStatus::Running
    }

    /// Returns the failure of an action with status `error`.
    pub fn error(&self) -> Option<ActionError> {
        if self.status != ActionStatus::Error {
            return None;
        }
        let (code, message) = match &self.error {
            Some(body) => (body.code.clone(), body.message.clone()),
            None => (ErrorCode::ActionFailed, "action failed".to_string()),
        };
        Some(ActionError {
            code,
            message,
            action_id: Some(self.id),
        })
    }
}

/// The `error` object of a failed action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

/// A resource an action operates on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResource {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

/// The failure of an action.
///
/// Displayed as `<message> (<code>, <action id>)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionError {
    pub code: ErrorCode,
    pub message: String,
    pub action_id: Option<i64>,
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action_id {
            Some(id) => write!(f, "{} ({}, {})", self.message, self.code, id),
            None => write!(f, "{} ({})", self.message, self.code),
        }
    }
}

impl std::error::Error for ActionError {}

/// Filters for [`ActionClient::list`] and [`ActionClient::all`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionListOpts {
    pub list: ListOpts,
    pub id: Vec<i64>,
    pub status: Vec<ActionStatus>,
    pub sort: Vec<String>,
}

impl ActionListOpts {
    fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.list.query_pairs();
        pairs.extend(self.id.iter().map(|id| ("id".to_string(), id.to_string())));
        pairs.extend(
            self.status
                .iter()
                .map(|status| ("status".to_string(), status.to_string())),
        );
        pairs.extend(self.sort.iter().map(|sort| ("sort".to_string(), sort.clone())));
        encode_query(pairs)
    }
}

#[derive(Deserialize)]
struct ActionEnvelope {
    action: Action,
}

#[derive(Deserialize)]
struct ActionListEnvelope {
    actions: Vec<Action>,
}

/// Access to the `/actions` endpoints.
#[derive(Clone)]
pub struct ActionClient {
    client: Client,
}

impl ActionClient {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetches a single action. A `not_found` answer yields `None`.
    pub async fn get_by_id(&self, ctx: &Context, id: i64) -> Result<(Option<Action>, Response)> {
        let req = self
            .client
            .new_request(ctx, Method::GET, &format!("/actions/{}", id), None)?;

        match self.client.execute_json::<ActionEnvelope>(req).await {
            Ok((envelope, response)) => Ok((Some(envelope.action), response)),
            Err(Error::Api(err)) if err.code == ErrorCode::NotFound => match err.response() {
                Some(response) => Ok((None, response.clone())),
                None => Err(Error::Api(err)),
            },
            Err(e) => Err(e),
        }
    }

    /// Fetches a single page of actions.
    pub async fn list(&self, ctx: &Context, opts: &ActionListOpts) -> Result<(Vec<Action>, Response)> {
        let pairs = opts.query_pairs();
        let req = self
            .client
            .new_request(ctx, Method::GET, "/actions", None)?
            .with_query_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let (envelope, response) = self.client.execute_json::<ActionListEnvelope>(req).await?;
        Ok((envelope.actions, response))
    }

    /// Fetches all pages of actions matching `opts`.
    pub async fn all(&self, ctx: &Context, opts: ActionListOpts) -> Result<Vec<Action>> {
        iter_pages(|page| {
            let mut opts = opts.clone();
            opts.list.page = Some(page);
            async move { self.list(ctx, &opts).await }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn action(status: &str) -> Action {
        serde_json::from_value(json!({
            "id": 1509772237,
            "command": "create_server",
            "status": status,
            "progress": 100,
            "started": "2016-01-30T23:55:00+00:00",
            "finished": "2016-01-30T23:56:13+00:00",
            "resources": [{"id": 42, "type": "server"}],
            "error": {"code": "action_failed", "message": "Action failed"}
        }))
        .unwrap()
    }

    #[test]
    fn test_decode_action() {
        let action = action("success");
        assert_eq!(action.status, ActionStatus::Success);
        assert_eq!(action.command, "create_server");
        assert_eq!(action.started.to_rfc3339(), "2016-01-30T23:55:00+00:00");
        assert!(action.finished.is_some());
        assert_eq!(
            action.resources,
            vec![ActionResource {
                id: 42,
                kind: "server".to_string()
            }]
        );
        assert!(action.is_finished());
    }

    #[test]
    fn test_error_only_for_failed_actions() {
        assert!(action("success").error().is_none());
        assert!(action("running").error().is_none());

        let err = action("error").error().unwrap();
        assert_eq!(err.code, ErrorCode::ActionFailed);
        assert_eq!(err.to_string(), "Action failed (action_failed, 1509772237)");
    }

    #[test]
    fn test_list_query() {
        let opts = ActionListOpts {
            list: ListOpts {
                page: Some(1),
                ..Default::default()
            },
            id: vec![3, 1],
            status: vec![ActionStatus::Running],
            sort: vec!["status".to_string(), "id".to_string()],
        };
        let query: Vec<String> = opts
            .query_pairs()
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        assert_eq!(
            query.join("&"),
            "id=3&id=1&page=1&sort=status&sort=id&status=running"
        );
    }
}
