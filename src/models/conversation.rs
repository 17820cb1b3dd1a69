use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{is_provisional, provisional_conversation_id};
use super::message::Message;
use super::wire;

pub const NEW_CONVERSATION_TITLE: &str = "New conversation";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub kb_id: Option<String>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(deserialize_with = "wire::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "wire::timestamp")]
    pub updated_at: DateTime<Utc>,
    /// `None` means the message history has not been loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,
}

impl Conversation {
    /// An unsent conversation that only exists locally.
    pub fn provisional() -> Self {
        let now = Utc::now();
        Self {
            id: provisional_conversation_id(),
            title: NEW_CONVERSATION_TITLE.to_string(),
            kb_id: None,
            pinned: false,
            created_at: now,
            updated_at: now,
            messages: None,
        }
    }

    pub fn is_provisional(&self) -> bool {
        is_provisional(&self.id)
    }
}
