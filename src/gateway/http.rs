use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use super::models::{ApiEnvelope, ErrorBody, PinnedBody, TitleBody};
use super::traits::ChatGateway;
use super::types::{ChatAnswer, FeedbackRequest, GatewayError, SendOutcome, SendRequest};
use crate::config::{ClientConfig, APP_NAME};
use crate::models::{Conversation, Message};
use crate::services::credentials::Credentials;

const ENVELOPE_OK: i64 = 200;

/// `ChatGateway` over the service's REST API.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: Url,
    credentials: Credentials,
}

impl HttpGateway {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        credentials: Credentials,
    ) -> Result<Self, GatewayError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| GatewayError::Config(format!("invalid base URL {:?}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::Config(format!(
                "base URL {} cannot carry a path",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("{}/{}", APP_NAME, env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    pub fn from_config(config: &ClientConfig, credentials: Credentials) -> Result<Self, GatewayError> {
        Self::new(
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
            credentials,
        )
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::Config(format!("base URL {} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Issue a request and return the status and raw body. 401 clears the session token.
    async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<(StatusCode, String), GatewayError> {
        let url = self.endpoint(segments)?;
        tracing::debug!("{} {}", method, url);

        let mut req = self.client.request(method, url);
        if let Some(auth) = self.credentials.bearer().await {
            req = req.header(reqwest::header::AUTHORIZATION, auth);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let response = req
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.credentials.clear().await;
            return Err(GatewayError::Unauthorized);
        }

        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        Ok((status, text))
    }

    async fn call<T, B>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<T, GatewayError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let (status, text) = self.execute(method, segments, body).await?;
        if !status.is_success() {
            return Err(Self::api_error(status, &text));
        }
        let data = Self::unwrap_envelope(status, Self::parse_json(&text)?)?;
        serde_json::from_value(data).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }

    fn parse_json(text: &str) -> Result<serde_json::Value, GatewayError> {
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(text).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }

    /// Strip the `{code, msg, data}` wrapper when present. Bare payloads pass through.
    fn unwrap_envelope(
        status: StatusCode,
        value: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        let is_envelope = value
            .as_object()
            .map(|o| o.contains_key("code") && (o.contains_key("data") || o.contains_key("msg")))
            .unwrap_or(false);
        if !is_envelope {
            return Ok(value);
        }

        let envelope: ApiEnvelope = serde_json::from_value(value)
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        if envelope.code == ENVELOPE_OK {
            Ok(envelope.data)
        } else {
            Err(GatewayError::Api {
                status: u16::try_from(envelope.code).unwrap_or(status.as_u16()),
                message: envelope.msg.unwrap_or_else(|| "Request failed".to_string()),
            })
        }
    }

    fn api_error(status: StatusCode, body: &str) -> GatewayError {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.best_message())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });
        GatewayError::Api {
            status: status.as_u16(),
            message,
        }
    }

    fn detail_of(value: &serde_json::Value) -> Option<String> {
        if !value.is_object() || value.get("detail").is_none() {
            return None;
        }
        serde_json::from_value::<ErrorBody>(value.clone())
            .ok()
            .and_then(|b| b.detail_text())
    }
}

#[async_trait]
impl ChatGateway for HttpGateway {
    async fn send_message(&self, request: SendRequest) -> Result<SendOutcome, GatewayError> {
        let (status, text) = self
            .execute(Method::POST, &["chat"], Some(&request))
            .await?;

        // Client errors with a `detail` are the service refusing the query, not a transport fault.
        if status.is_client_error() {
            if let Some(detail) = Self::parse_json(&text).ok().as_ref().and_then(Self::detail_of) {
                return Ok(SendOutcome::Rejected { detail });
            }
        }
        if !status.is_success() {
            return Err(Self::api_error(status, &text));
        }

        let data = match Self::unwrap_envelope(status, Self::parse_json(&text)?) {
            Ok(data) => data,
            Err(GatewayError::Api { message, .. }) => {
                return Ok(SendOutcome::Rejected { detail: message })
            }
            Err(e) => return Err(e),
        };
        if let Some(detail) = Self::detail_of(&data) {
            return Ok(SendOutcome::Rejected { detail });
        }

        let answer: ChatAnswer = serde_json::from_value(data)
            .map_err(|e| GatewayError::InvalidResponse(format!("Failed to parse answer: {}", e)))?;
        Ok(SendOutcome::Answered(answer))
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, GatewayError> {
        self.call(Method::GET, &["chat", "conversations"], None::<&()>)
            .await
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>, GatewayError> {
        let mut messages: Vec<Message> = self
            .call(
                Method::GET,
                &["chat", "conversations", conversation_id, "messages"],
                None::<&()>,
            )
            .await?;
        for msg in &mut messages {
            if msg.conversation_id.is_empty() {
                msg.conversation_id = conversation_id.to_string();
            }
        }
        Ok(messages)
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), GatewayError> {
        self.call::<serde_json::Value, ()>(
            Method::DELETE,
            &["chat", "conversations", conversation_id],
            None,
        )
        .await?;
        Ok(())
    }

    async fn rename_conversation(
        &self,
        conversation_id: &str,
        title: &str,
    ) -> Result<(), GatewayError> {
        self.call::<serde_json::Value, _>(
            Method::PUT,
            &["chat", "conversations", conversation_id, "title"],
            Some(&TitleBody { title }),
        )
        .await?;
        Ok(())
    }

    async fn set_pinned(&self, conversation_id: &str, pinned: bool) -> Result<(), GatewayError> {
        self.call::<serde_json::Value, _>(
            Method::PUT,
            &["chat", "conversations", conversation_id, "pinned"],
            Some(&PinnedBody { pinned }),
        )
        .await?;
        Ok(())
    }

    async fn submit_feedback(&self, feedback: FeedbackRequest) -> Result<(), GatewayError> {
        self.call::<serde_json::Value, _>(Method::POST, &["chat", "feedback"], Some(&feedback))
            .await?;
        Ok(())
    }
}
