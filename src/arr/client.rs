//! Blocking HTTP client for the media server's REST API.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::ApiError;
use super::flavor::ServerFlavor;
use super::models::{CommandBody, CommandStatus, Episode, HistoryPage, Movie, QueueEntry};
use super::MediaServerApi;

/// Records requested per history page.
pub const HISTORY_PAGE_SIZE: u32 = 10;

/// HTTP client for a Sonarr/Radarr style server.
///
/// Every request carries the API key as the `apikey` query parameter. The key
/// is never written to logs.
pub struct ArrClient {
    client: Client,
    base_url: String,
    api_key: String,
    flavor: ServerFlavor,
}

impl ArrClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `base_url` - Server root (e.g., "http://localhost:8989")
    /// * `api_key` - API key from the server's settings
    /// * `flavor` - Which kind of server is on the other end
    /// * `timeout_sec` - Request timeout in seconds
    pub fn new(
        base_url: &str,
        api_key: String,
        flavor: ServerFlavor,
        timeout_sec: u64,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()?;

        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            api_key,
            flavor,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.query(&[("apikey", self.api_key.as_str())])
    }

    fn send(&self, operation: &str, request: RequestBuilder) -> Result<String, ApiError> {
        let response = self.authorized(request).send()?;
        if let Some(err) = status_error(operation, response.status()) {
            return Err(err);
        }
        Ok(response.text()?)
    }

    fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let body = self.send(operation, request)?;
        serde_json::from_str(&body).map_err(|source| ApiError::Decode {
            operation: operation.to_string(),
            source,
        })
    }
}

/// Maps a response status to the error it stands for, if any.
fn status_error(operation: &str, status: StatusCode) -> Option<ApiError> {
    if status == StatusCode::UNAUTHORIZED {
        Some(ApiError::Unauthorized)
    } else if !status.is_success() {
        Some(ApiError::Status {
            operation: operation.to_string(),
            status: status.as_u16(),
        })
    } else {
        None
    }
}

impl MediaServerApi for ArrClient {
    fn flavor(&self) -> ServerFlavor {
        self.flavor
    }

    fn get_queue(&self) -> Result<Vec<QueueEntry>, ApiError> {
        let request = self.client.get(self.endpoint("queue"));
        self.send_json("get queue", request)
    }

    fn delete_queue_item(&self, id: i64) -> Result<(), ApiError> {
        let request = self.client.delete(self.endpoint(&format!("queue/{}", id)));
        self.send(&format!("delete queue item {}", id), request)?;
        Ok(())
    }

    fn get_history(&self, page: u32) -> Result<HistoryPage, ApiError> {
        debug!("Fetching history page {}", page);
        let request = self.client.get(self.endpoint("history")).query(&[
            ("page", page.to_string()),
            ("pageSize", HISTORY_PAGE_SIZE.to_string()),
            ("sortKey", "date".to_string()),
            ("sortDir", "desc".to_string()),
        ]);
        self.send_json("get history", request)
    }

    fn get_episode(&self, id: i64) -> Result<Episode, ApiError> {
        let request = self.client.get(self.endpoint(&format!("episode/{}", id)));
        self.send_json("get episode", request)
    }

    fn get_movie(&self, id: i64) -> Result<Movie, ApiError> {
        let request = self.client.get(self.endpoint(&format!("movie/{}", id)));
        self.send_json("get movie", request)
    }

    fn execute_command(&self, command: &CommandBody) -> Result<CommandStatus, ApiError> {
        debug!("Submitting command {}", command.name);
        let request = self.client.post(self.endpoint("command")).json(command);
        self.send_json("submit command", request)
    }

    fn get_command_status(&self, id: i64) -> Result<CommandStatus, ApiError> {
        let request = self.client.get(self.endpoint(&format!("command/{}", id)));
        self.send_json("get command status", request)
    }
}
