//! Minimal client for OpenAI-style `chat/completions` endpoints.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::LlmConfig;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no API key configured")]
    NotConfigured,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("bad endpoint URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("API returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("API returned no choices")]
    EmptyResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

pub struct ChatClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl ChatClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Whether there's a key to talk to the API with at all.
    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// `base_url` may or may not end with a slash; [`Url::join`] would
    /// drop the last path segment in the latter case.
    fn endpoint(&self) -> Result<Url, Error> {
        let mut base = self.config.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(base.join("chat/completions")?)
    }

    /// Send the conversation and get the assistant's reply.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, Error> {
        let Some(key) = &self.config.api_key else {
            return Err(Error::NotConfigured);
        };

        let body = CompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
        };

        let response = self
            .http
            .post(self.endpoint()?)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api { status, body });
        }

        let response: CompletionResponse = response.json().await?;
        let answer = response
            .choices
            .into_iter()
            .next()
            .ok_or(Error::EmptyResponse)?
            .message
            .content;

        Ok(answer.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str, api_key: Option<&str>) -> ChatClient {
        ChatClient::new(LlmConfig {
            api_key: api_key.map(str::to_string),
            base_url: Url::parse(base_url).unwrap(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
        })
    }

    #[test]
    fn endpoint_keeps_base_path() {
        for base in ["https://api.openai.com/v1", "https://api.openai.com/v1/"] {
            assert_eq!(
                client(base, None).endpoint().unwrap().as_str(),
                "https://api.openai.com/v1/chat/completions"
            );
        }
    }

    #[test]
    fn request_shape() {
        let messages = [
            ChatMessage::new(Role::System, "be nice"),
            ChatMessage::new(Role::User, "привет"),
        ];
        let body = CompletionRequest {
            model: "m",
            messages: &messages,
            temperature: 0.5,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "m",
                "messages": [
                    {"role": "system", "content": "be nice"},
                    {"role": "user", "content": "привет"},
                ],
                "temperature": 0.5,
            })
        );
    }

    #[test]
    fn response_parses() {
        let raw = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":" Здравствуйте! "},"finish_reason":"stop"}]}"#;
        let response: CompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.choices[0].message.role, Role::Assistant);
    }

    #[tokio::test]
    async fn no_key_no_request() {
        let client = client("http://127.0.0.1:9", None);
        assert!(!client.is_configured());
        assert!(matches!(
            client.complete(&[]).await,
            Err(Error::NotConfigured)
        ));
    }
}
