use checklist_core::{
    AuthResponse, BoardView, ErrorResponse, GuideStepView, InitializeResponse, LoginRequest,
    ReconciliationResponse, RegisterRequest, SessionResponse, ToggleResponse,
};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::errors::{ClientError, ClientResult};

/// HTTP client for the checklist server.
#[derive(Clone)]
pub struct ChecklistClient {
    http: Client,
    base_url: String,
}

impl ChecklistClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn session_url(&self, session_id: Uuid, path: &str) -> String {
        self.url(&format!("/api/sessions/{}{}", session_id, path))
    }

    async fn check(response: Response) -> ClientResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|error| error.message)
            .unwrap_or(body);
        Err(ClientError::Server {
            status: status.as_u16(),
            message,
        })
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn health(&self) -> ClientResult<bool> {
        let response = self.http.get(self.url("/health")).send().await?;
        Ok(response.status().is_success())
    }

    pub async fn register(&self, username: &str, password: &str) -> ClientResult<AuthResponse> {
        let request = RegisterRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        request.validate()?;

        let response = self
            .http
            .post(self.url("/api/auth/register"))
            .json(&request)
            .send()
            .await?;
        Self::parse(response).await
    }

    pub async fn login(&self, username: &str, password: &str) -> ClientResult<AuthResponse> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        request.validate()?;

        let response = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&request)
            .send()
            .await?;
        Self::parse(response).await
    }

    /// Session over the shared checklist, no login required.
    pub async fn open_session(&self) -> ClientResult<SessionResponse> {
        let response = self.http.post(self.url("/api/sessions")).send().await?;
        Self::parse(response).await
    }

    pub async fn close_session(&self, session_id: Uuid) -> ClientResult<()> {
        let response = self
            .http
            .delete(self.session_url(session_id, ""))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn board(&self, session_id: Uuid) -> ClientResult<BoardView> {
        let response = self
            .http
            .get(self.session_url(session_id, "/board"))
            .send()
            .await?;
        Self::parse(response).await
    }

    pub async fn toggle(
        &self,
        session_id: Uuid,
        section_id: &str,
        task_id: &str,
    ) -> ClientResult<ToggleResponse> {
        let path = format!("/tasks/{}/{}/toggle", section_id, task_id);
        let response = self
            .http
            .post(self.session_url(session_id, &path))
            .send()
            .await?;
        Self::parse(response).await
    }

    pub async fn test_connection(&self, session_id: Uuid) -> ClientResult<BoardView> {
        let response = self
            .http
            .post(self.session_url(session_id, "/connection/test"))
            .send()
            .await?;
        Self::parse(response).await
    }

    pub async fn initialize(&self, session_id: Uuid) -> ClientResult<InitializeResponse> {
        let response = self
            .http
            .post(self.session_url(session_id, "/connection/initialize"))
            .send()
            .await?;
        Self::parse(response).await
    }

    pub async fn complete_setup(&self, session_id: Uuid) -> ClientResult<BoardView> {
        let response = self
            .http
            .post(self.session_url(session_id, "/setup/complete"))
            .send()
            .await?;
        Self::parse(response).await
    }

    pub async fn reconciliation(&self, session_id: Uuid) -> ClientResult<ReconciliationResponse> {
        let response = self
            .http
            .get(self.session_url(session_id, "/reconciliation"))
            .send()
            .await?;
        Self::parse(response).await
    }

    pub async fn retry_failed_writes(
        &self,
        session_id: Uuid,
    ) -> ClientResult<ReconciliationResponse> {
        let response = self
            .http
            .post(self.session_url(session_id, "/reconciliation/retry"))
            .send()
            .await?;
        Self::parse(response).await
    }

    pub async fn setup_script(&self) -> ClientResult<String> {
        let response = self.http.get(self.url("/api/setup/script")).send().await?;
        Ok(Self::check(response).await?.text().await?)
    }

    pub async fn setup_guide(&self) -> ClientResult<Vec<GuideStepView>> {
        let response = self.http.get(self.url("/api/setup/guide")).send().await?;
        Self::parse(response).await
    }
}
