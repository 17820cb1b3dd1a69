use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::MessageId;
use super::wire;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A knowledge-base passage the assistant answer was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(alias = "doc_id", deserialize_with = "wire::string_or_number")]
    pub document_id: String,
    pub filename: String,
    pub chunk_id: String,
    pub content: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    /// Empty when the server omits it; the loader stamps the requested conversation id.
    #[serde(default)]
    pub conversation_id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, deserialize_with = "wire::lenient_citations")]
    pub citations: Option<Vec<Citation>>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(deserialize_with = "wire::timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// A user message that has not been acknowledged by the server yet.
    pub fn provisional_user(conversation_id: String, content: String) -> Self {
        Self {
            id: MessageId::provisional(),
            conversation_id,
            role: Role::User,
            content,
            citations: None,
            confidence: None,
            created_at: Utc::now(),
        }
    }
}
