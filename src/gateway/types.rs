use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::wire;
use crate::models::{Citation, MessageId};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Session expired or not authenticated")]
    Unauthorized,

    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl GatewayError {
    /// Text the server itself supplied, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            GatewayError::Api { message, .. } if !message.is_empty() => Some(message),
            _ => None,
        }
    }
}

/// Parameters for a single question sent to the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SendRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub query: String,
    pub kb_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

/// An answer the service produced for a query.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatAnswer {
    pub conversation_id: String,
    pub message_id: MessageId,
    #[serde(alias = "content")]
    pub answer: String,
    #[serde(default)]
    pub citations: Option<Vec<Citation>>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// The service answers a send either with an answer or with a rejection whose
/// reason travels in a `detail` field.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    Answered(ChatAnswer),
    Rejected { detail: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackRequest {
    #[serde(serialize_with = "wire::as_string")]
    pub message_id: MessageId,
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}
