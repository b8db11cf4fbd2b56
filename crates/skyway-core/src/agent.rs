use reqwest::Client;
use thiserror::Error;
use uuid::Uuid;

/// Path of the agent endpoint, relative to the configured base URL.
pub const AGENT_PATH: &str = "/api/v1/agent";

/// Failure of a single agent call. The conversation flow treats every variant
/// the same way.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("API error: {0}")]
    Status(u16),
    #[error("request to agent failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("failed to read agent response body: {0}")]
    Body(#[source] reqwest::Error),
}

/// Connection settings for [`AgentClient`].
///
/// An empty `base_url` means "same origin": the request path is used as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentConfig {
    pub base_url: String,
    pub conversation_id: Option<Uuid>,
}

impl AgentConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            conversation_id: None,
        }
    }

    pub fn with_conversation_id(mut self, id: Uuid) -> Self {
        self.conversation_id = Some(id);
        self
    }
}

#[derive(Clone, Debug)]
pub struct AgentClient {
    client: Client,
    base_url: String,
    conversation_id: Option<Uuid>,
}

impl AgentClient {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            conversation_id: config.conversation_id,
        }
    }

    /// Build the GET URL for one user message.
    pub fn request_url(&self, user_input: &str) -> String {
        let mut url = format!(
            "{}{}?userInput={}",
            self.base_url,
            AGENT_PATH,
            urlencoding::encode(user_input)
        );
        if let Some(id) = self.conversation_id {
            url.push_str("&conversationId=");
            url.push_str(&id.to_string());
        }
        url
    }

    /// Send one message to the agent and return its reply body verbatim.
    pub async fn call(&self, user_input: &str) -> Result<String, AgentError> {
        let url = self.request_url(user_input);
        tracing::debug!(%url, "calling travel agent");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(AgentError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::Status(status.as_u16()));
        }

        response.text().await.map_err(AgentError::Body)
    }
}
