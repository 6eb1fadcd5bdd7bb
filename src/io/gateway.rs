use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::task::{Task, TaskId, TaskPatch};

/// Uniform failure from the remote resource. Non-success HTTP responses carry
/// their status; transport and decoding failures carry none.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct GatewayError {
    pub status: Option<u16>,
    pub message: String,
}

impl GatewayError {
    pub fn http(status: u16) -> Self {
        GatewayError {
            status: Some(status),
            message: format!("HTTP error! status: {}", status),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        GatewayError {
            status: None,
            message: message.into(),
        }
    }
}

/// Contract to the remote task collection. Knows nothing about categories or
/// client ordering; returned tasks are remote-origin with no category.
pub trait TaskGateway {
    fn list(&self, limit: usize, skip: usize) -> Result<Vec<Task>, GatewayError>;
    fn get(&self, id: TaskId) -> Result<Task, GatewayError>;
    fn create(&self, text: &str) -> Result<Task, GatewayError>;
    fn update(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, GatewayError>;
    fn delete(&self, id: TaskId) -> Result<(), GatewayError>;
}

impl<G: TaskGateway + ?Sized> TaskGateway for &G {
    fn list(&self, limit: usize, skip: usize) -> Result<Vec<Task>, GatewayError> {
        (**self).list(limit, skip)
    }
    fn get(&self, id: TaskId) -> Result<Task, GatewayError> {
        (**self).get(id)
    }
    fn create(&self, text: &str) -> Result<Task, GatewayError> {
        (**self).create(text)
    }
    fn update(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, GatewayError> {
        (**self).update(id, patch)
    }
    fn delete(&self, id: TaskId) -> Result<(), GatewayError> {
        (**self).delete(id)
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTask {
    id: TaskId,
    todo: String,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    user_id: u64,
}

impl From<WireTask> for Task {
    fn from(w: WireTask) -> Self {
        Task::new(w.id, w.todo, w.completed, w.user_id)
    }
}

#[derive(Debug, Deserialize)]
struct WirePage {
    todos: Vec<WireTask>,
    #[serde(default)]
    total: usize,
    #[serde(default)]
    skip: usize,
    #[serde(default)]
    limit: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireCreate<'a> {
    todo: &'a str,
    completed: bool,
    user_id: u64,
}

#[derive(Debug, Serialize)]
struct WirePatch<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    todo: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed: Option<bool>,
}

impl<'a> From<&'a TaskPatch> for WirePatch<'a> {
    fn from(p: &'a TaskPatch) -> Self {
        WirePatch {
            todo: p.text.as_deref(),
            completed: p.completed,
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// Blocking HTTP client for a `/todos` collection resource
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    user_id: u64,
}

impl HttpGateway {
    /// With `timeout` unset a request waits as long as the server does; reqwest's
    /// blocking default of 30 seconds is overridden.
    pub fn new(base_url: &str, user_id: u64, timeout: Option<Duration>) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::transport(e.to_string()))?;
        Ok(HttpGateway {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

/// Map a response to the decoded body, or to the uniform gateway error
fn handle_response<T: DeserializeOwned>(
    response: reqwest::Result<Response>,
) -> Result<T, GatewayError> {
    let response = response.map_err(|e| GatewayError::transport(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(GatewayError::http(status.as_u16()));
    }
    response
        .json()
        .map_err(|e| GatewayError::transport(format!("invalid response body: {}", e)))
}

impl TaskGateway for HttpGateway {
    fn list(&self, limit: usize, skip: usize) -> Result<Vec<Task>, GatewayError> {
        let page: WirePage = handle_response(
            self.client
                .get(self.url("todos"))
                .query(&[("limit", limit), ("skip", skip)])
                .send(),
        )?;
        debug!(
            total = page.total,
            skip = page.skip,
            limit = page.limit,
            received = page.todos.len(),
            "fetched task page"
        );
        Ok(page.todos.into_iter().map(Task::from).collect())
    }

    fn get(&self, id: TaskId) -> Result<Task, GatewayError> {
        let task: WireTask = handle_response(self.client.get(self.url(&format!("todos/{}", id))).send())?;
        Ok(task.into())
    }

    fn create(&self, text: &str) -> Result<Task, GatewayError> {
        let body = WireCreate {
            todo: text,
            completed: false,
            user_id: self.user_id,
        };
        let task: WireTask =
            handle_response(self.client.post(self.url("todos/add")).json(&body).send())?;
        Ok(task.into())
    }

    fn update(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, GatewayError> {
        let body = WirePatch::from(patch);
        let task: WireTask = handle_response(
            self.client
                .put(self.url(&format!("todos/{}", id)))
                .json(&body)
                .send(),
        )?;
        Ok(task.into())
    }

    fn delete(&self, id: TaskId) -> Result<(), GatewayError> {
        let _ack: serde_json::Value =
            handle_response(self.client.delete(self.url(&format!("todos/{}", id))).send())?;
        Ok(())
    }
}
