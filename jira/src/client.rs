use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::{
    CreatedIssue, NewTicket, RawIssue, SearchResponse, Ticket, TicketUpdate, TransitionsResponse,
};

const SEARCH_FIELDS: &str = "summary,description,status,priority";
const PAGE_SIZE: usize = 100;

#[derive(Error, Debug)]
pub enum JiraError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Ticket not found: {0}")]
    NotFound(String),
    #[error("Jira API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Request error: {0}")]
    Request(String),
    #[error("Failed to parse response: {0}")]
    Parsing(String),
}

impl JiraError {
    /// Transport failures and server-side errors are worth retrying;
    /// everything else is a definitive answer from the API.
    fn is_retryable(&self) -> bool {
        match self {
            JiraError::Request(_) => true,
            JiraError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Attach the ticket key to a 404 so callers see which key was missing.
    fn with_key_context(self, key: &str) -> Self {
        match self {
            JiraError::Api { status: 404, .. } => JiraError::NotFound(key.to_string()),
            other => other,
        }
    }
}

pub struct JiraClient {
    http: reqwest::Client,
    base_url: String,
    auth_header: String,
    project_key: String,
}

impl JiraClient {
    const MAX_ATTEMPTS: usize = 3;
    const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(2);
    const MAX_RETRY_DELAY: Duration = Duration::from_secs(10);

    pub fn new(
        base_url: impl Into<String>,
        email: &str,
        api_token: &str,
        project_key: impl Into<String>,
    ) -> Result<Self, JiraError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| JiraError::Request(e.to_string()))?;

        let credentials = STANDARD.encode(format!("{}:{}", email, api_token));

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_header: format!("Basic {}", credentials),
            project_key: project_key.into(),
        })
    }

    pub fn project_key(&self) -> &str {
        &self.project_key
    }

    /// Fetch every ticket in the configured project, most recently updated
    /// first. Pages through the search endpoint until the reported total is
    /// exhausted.
    #[tracing::instrument(name = "JiraClient::fetch_all_tickets", skip(self))]
    pub async fn fetch_all_tickets(&self) -> Result<Vec<Ticket>, JiraError> {
        let jql = format!("project = {} ORDER BY updated DESC", self.project_key);
        let mut tickets: Vec<Ticket> = Vec::new();
        let mut start_at = 0usize;

        loop {
            let page: SearchResponse = self
                .get_with_retries("/rest/api/2/search", &[
                    ("jql", jql.as_str()),
                    ("startAt", &start_at.to_string()),
                    ("maxResults", &PAGE_SIZE.to_string()),
                    ("fields", SEARCH_FIELDS),
                ])
                .await?;

            let fetched = page.issues.len();
            tickets.extend(page.issues.into_iter().map(Ticket::from));

            start_at = page.start_at + fetched;
            if fetched == 0 || start_at >= page.total {
                break;
            }
        }

        tracing::info!(count = tickets.len(), "Fetched tickets from Jira");
        Ok(tickets)
    }

    /// Create a ticket and return its fresh state.
    #[tracing::instrument(name = "JiraClient::create_ticket", skip(self, fields))]
    pub async fn create_ticket(&self, fields: &NewTicket) -> Result<Ticket, JiraError> {
        let body = serde_json::json!({
            "fields": {
                "project": { "key": self.project_key },
                "summary": fields.summary,
                "description": fields.description,
                "issuetype": { "name": fields.issue_type.as_deref().unwrap_or("Task") },
                "priority": { "name": fields.priority.as_deref().unwrap_or("Medium") },
            }
        });

        let created: CreatedIssue = self
            .post_with_retries("/rest/api/2/issue", &body)
            .await?;

        tracing::info!(key = %created.key, "Created ticket");

        // The create response only carries the key; fetch the full issue.
        self.get_ticket(&created.key).await
    }

    /// Apply field changes and/or a status transition to an existing ticket,
    /// returning its refreshed state.
    #[tracing::instrument(name = "JiraClient::update_ticket", skip(self, update))]
    pub async fn update_ticket(
        &self,
        key: &str,
        update: &TicketUpdate,
    ) -> Result<Ticket, JiraError> {
        let mut fields = serde_json::Map::new();
        if let Some(summary) = &update.summary {
            fields.insert("summary".into(), serde_json::json!(summary));
        }
        if let Some(description) = &update.description {
            fields.insert("description".into(), serde_json::json!(description));
        }
        if let Some(priority) = &update.priority {
            fields.insert("priority".into(), serde_json::json!({ "name": priority }));
        }

        if !fields.is_empty() {
            let body = serde_json::json!({ "fields": fields });
            self.put_with_retries(&format!("/rest/api/2/issue/{}", key), &body)
                .await
                .map_err(|e| e.with_key_context(key))?;
        }

        if let Some(status) = &update.status {
            self.transition_ticket(key, status).await?;
        }

        tracing::info!(key, "Updated ticket");
        self.get_ticket(key).await
    }

    /// Fetch a single ticket by key.
    pub async fn get_ticket(&self, key: &str) -> Result<Ticket, JiraError> {
        let issue: RawIssue = self
            .get_with_retries(
                &format!("/rest/api/2/issue/{}", key),
                &[("fields", SEARCH_FIELDS)],
            )
            .await
            .map_err(|e| e.with_key_context(key))?;

        Ok(Ticket::from(issue))
    }

    /// Move a ticket to the named status via the transitions endpoint. The
    /// transition whose name matches (case-insensitively) is applied; an
    /// unknown status name is a mutation error, not a silent no-op.
    async fn transition_ticket(&self, key: &str, status: &str) -> Result<(), JiraError> {
        let transitions: TransitionsResponse = self
            .get_with_retries(&format!("/rest/api/2/issue/{}/transitions", key), &[])
            .await
            .map_err(|e| e.with_key_context(key))?;

        let transition = transitions
            .transitions
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(status))
            .ok_or_else(|| JiraError::Api {
                status: 400,
                message: format!("No transition to status '{}' for {}", status, key),
            })?;

        let body = serde_json::json!({ "transition": { "id": transition.id } });
        self.post_no_content_with_retries(
            &format!("/rest/api/2/issue/{}/transitions", key),
            &body,
        )
        .await
        .map_err(|e| e.with_key_context(key))
    }

    async fn get_with_retries<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, JiraError> {
        self.execute_with_retries(|| {
            self.http
                .get(format!("{}{}", self.base_url, path))
                .query(query)
        })
        .await
    }

    async fn post_with_retries<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, JiraError> {
        self.execute_with_retries(|| {
            self.http
                .post(format!("{}{}", self.base_url, path))
                .json(body)
        })
        .await
    }

    async fn put_with_retries(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<(), JiraError> {
        self.execute_no_content_with_retries(|| {
            self.http
                .put(format!("{}{}", self.base_url, path))
                .json(body)
        })
        .await
    }

    async fn post_no_content_with_retries(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<(), JiraError> {
        self.execute_no_content_with_retries(|| {
            self.http
                .post(format!("{}{}", self.base_url, path))
                .json(body)
        })
        .await
    }

    async fn execute_with_retries<T: DeserializeOwned>(
        &self,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> Result<T, JiraError> {
        let response = self.send_with_retries(build).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| JiraError::Parsing(e.to_string()))
    }

    async fn execute_no_content_with_retries(
        &self,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> Result<(), JiraError> {
        self.send_with_retries(build).await.map(|_| ())
    }

    async fn send_with_retries(
        &self,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, JiraError> {
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            let result = self.send_once(build()).await;

            match result {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && attempt < Self::MAX_ATTEMPTS => {
                    let delay = Self::backoff_delay(attempt);
                    tracing::warn!(
                        attempt,
                        max = Self::MAX_ATTEMPTS,
                        delay_secs = delay.as_secs_f64(),
                        error = %err,
                        "Jira request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_once(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, JiraError> {
        let response = request
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| JiraError::Request(e.to_string()))?;

        let status = response.status();
        if status == 401 || status == 403 {
            return Err(JiraError::Unauthorized);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(JiraError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    fn backoff_delay(attempt: usize) -> Duration {
        let base = Self::INITIAL_RETRY_DELAY.as_secs_f64();
        let max = Self::MAX_RETRY_DELAY.as_secs_f64();

        // initial_delay * 2^(attempt - 1), capped
        let exp = base * 2_f64.powi(attempt as i32 - 1);
        Duration::from_secs_f64(exp.min(max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        assert_eq!(JiraClient::backoff_delay(1), Duration::from_secs(2));
        assert_eq!(JiraClient::backoff_delay(2), Duration::from_secs(4));
        assert_eq!(JiraClient::backoff_delay(3), Duration::from_secs(8));
        assert_eq!(JiraClient::backoff_delay(4), Duration::from_secs(10));
    }

    #[test]
    fn retryable_errors() {
        assert!(JiraError::Request("timeout".into()).is_retryable());
        assert!(JiraError::Api {
            status: 503,
            message: String::new()
        }
        .is_retryable());
        assert!(!JiraError::Api {
            status: 400,
            message: String::new()
        }
        .is_retryable());
        assert!(!JiraError::Unauthorized.is_retryable());
        assert!(!JiraError::NotFound("SCRUM-1".into()).is_retryable());
    }

    #[test]
    fn not_found_context_only_rewrites_404() {
        let err = JiraError::Api {
            status: 404,
            message: String::new(),
        }
        .with_key_context("SCRUM-9");
        assert!(matches!(err, JiraError::NotFound(key) if key == "SCRUM-9"));

        let err = JiraError::Api {
            status: 500,
            message: "boom".into(),
        }
        .with_key_context("SCRUM-9");
        assert!(matches!(err, JiraError::Api { status: 500, .. }));
    }
}
