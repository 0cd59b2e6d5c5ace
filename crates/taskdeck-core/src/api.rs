use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use taskdeck_shared::{TaskDto, TaskId, TaskPayload};
use thiserror::Error;
use tracing::{debug, instrument, warn};

pub const SAVE_FALLBACK_MESSAGE: &str = "Failed to save task.";

pub type ApiResult<T> = Result<T, ApiError>;

/// Remote task collection. Identifiers are always assigned on the far side.
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// `GET /tasks/`
    async fn list_tasks(&self) -> ApiResult<Vec<TaskDto>>;

    /// `POST /tasks/`
    async fn create_task(&self, payload: &TaskPayload) -> ApiResult<TaskDto>;

    /// `PUT /tasks/{id}/`
    async fn update_task(&self, id: TaskId, payload: &TaskPayload) -> ApiResult<TaskDto>;

    /// `DELETE /tasks/{id}/`
    async fn delete_task(&self, id: TaskId) -> ApiResult<()>;
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response. `body` holds the JSON payload when there was one.
    #[error("server responded with HTTP {status}")]
    Status { status: u16, body: Option<Value> },

    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("invalid API base url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ApiError {
    /// Field-level messages from a validation payload, joined with `", "`.
    ///
    /// Returns `None` when the error carries no payload or the payload yields
    /// no messages.
    pub fn validation_message(&self) -> Option<String> {
        let ApiError::Status {
            body: Some(body), ..
        } = self
        else {
            return None;
        };

        let top_level: Vec<&Value> = match body {
            Value::Object(map) => map.values().collect(),
            Value::Array(items) => items.iter().collect(),
            _ => return None,
        };

        let mut messages = Vec::new();
        for value in top_level {
            match value {
                Value::Array(items) => {
                    messages.extend(items.iter().map(message_text));
                }
                other => messages.push(message_text(other)),
            }
        }
        messages.retain(|message| !message.is_empty());

        if messages.is_empty() {
            None
        } else {
            Some(messages.join(", "))
        }
    }

    /// Message shown inline on the editor after a failed save.
    pub fn save_message(&self) -> String {
        self.validation_message()
            .unwrap_or_else(|| SAVE_FALLBACK_MESSAGE.to_string())
    }
}

fn message_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub fn tasks_path() -> String {
    "tasks/".to_string()
}

pub fn task_path(id: TaskId) -> String {
    format!("tasks/{id}/")
}

#[derive(Debug, Clone)]
pub struct HttpTaskApi {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl HttpTaskApi {
    #[instrument(skip(access_token), fields(has_token = access_token.is_some()))]
    pub fn new(
        base_url: &str,
        timeout: Duration,
        access_token: Option<String>,
    ) -> anyhow::Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        reqwest::Url::parse(trimmed).map_err(|err| ApiError::InvalidUrl {
            url: base_url.to_string(),
            reason: err.to_string(),
        })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed building HTTP client for task API")?;

        debug!(base_url = %trimmed, "task API client ready");
        Ok(Self {
            client,
            base_url: trimmed.to_string(),
            access_token,
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .request(method, self.endpoint(path))
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = self.access_token.as_deref() {
            request = request.bearer_auth(token);
        }
        request
    }
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    #[instrument(skip(self))]
    async fn list_tasks(&self) -> ApiResult<Vec<TaskDto>> {
        let response = self.request(Method::GET, &tasks_path()).send().await?;
        let tasks: Vec<TaskDto> = read_json(response).await?;
        debug!(count = tasks.len(), "listed tasks");
        Ok(tasks)
    }

    #[instrument(skip(self, payload), fields(title_len = payload.title.len()))]
    async fn create_task(&self, payload: &TaskPayload) -> ApiResult<TaskDto> {
        let response = self
            .request(Method::POST, &tasks_path())
            .json(payload)
            .send()
            .await?;
        let created: TaskDto = read_json(response).await?;
        debug!(id = ?created.id, "created task");
        Ok(created)
    }

    #[instrument(skip(self, payload))]
    async fn update_task(&self, id: TaskId, payload: &TaskPayload) -> ApiResult<TaskDto> {
        // PUT replaces the whole record, identifier included.
        let body = TaskPayload {
            id: Some(id),
            ..payload.clone()
        };
        let response = self
            .request(Method::PUT, &task_path(id))
            .json(&body)
            .send()
            .await?;
        read_json(response).await
    }

    #[instrument(skip(self))]
    async fn delete_task(&self, id: TaskId) -> ApiResult<()> {
        let response = self.request(Method::DELETE, &task_path(id)).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let bytes = response.bytes().await?;
        Err(status_error(status, &bytes))
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
    let status = response.status();
    let bytes = response.bytes().await?;
    if !status.is_success() {
        return Err(status_error(status, &bytes));
    }
    serde_json::from_slice(&bytes).map_err(ApiError::Decode)
}

fn status_error(status: StatusCode, bytes: &[u8]) -> ApiError {
    let body = serde_json::from_slice::<Value>(bytes).ok();
    warn!(
        status = status.as_u16(),
        has_body = body.is_some(),
        "task API returned an error status"
    );
    ApiError::Status {
        status: status.as_u16(),
        body,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::{ApiError, HttpTaskApi, SAVE_FALLBACK_MESSAGE, task_path, tasks_path};

    fn status(body: Option<serde_json::Value>) -> ApiError {
        ApiError::Status { status: 400, body }
    }

    #[test]
    fn field_messages_are_concatenated() {
        let err = status(Some(json!({
            "title": ["This field is required."],
            "due_date": ["Date has wrong format.", "Use YYYY-MM-DD."]
        })));

        assert_eq!(
            err.save_message(),
            "This field is required., Date has wrong format., Use YYYY-MM-DD."
        );
    }

    #[test]
    fn plain_string_values_are_kept() {
        let err = status(Some(json!({ "detail": "Not found." })));
        assert_eq!(err.validation_message().as_deref(), Some("Not found."));
    }

    #[test]
    fn unrecognized_payloads_fall_back() {
        assert_eq!(status(None).save_message(), SAVE_FALLBACK_MESSAGE);
        assert_eq!(status(Some(json!({}))).save_message(), SAVE_FALLBACK_MESSAGE);
        assert_eq!(
            status(Some(json!("server exploded"))).save_message(),
            SAVE_FALLBACK_MESSAGE
        );
        assert_eq!(
            ApiError::InvalidUrl {
                url: "x".to_string(),
                reason: "y".to_string()
            }
            .save_message(),
            SAVE_FALLBACK_MESSAGE
        );
    }

    #[test]
    fn endpoints_join_base_and_path() {
        let api = HttpTaskApi::new("http://localhost:8000/api/v1/", Duration::from_secs(5), None)
            .expect("client");

        assert_eq!(api.endpoint(&tasks_path()), "http://localhost:8000/api/v1/tasks/");
        assert_eq!(api.endpoint(&task_path(42)), "http://localhost:8000/api/v1/tasks/42/");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = HttpTaskApi::new("not a url", Duration::from_secs(5), None)
            .expect_err("should reject");
        assert!(err.to_string().contains("invalid API base url"));
    }
}
