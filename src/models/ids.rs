use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reserved prefix marking ids that were generated locally and never acknowledged by the server.
pub const PROVISIONAL_PREFIX: &str = "temp_";

static MESSAGE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Whether a conversation id is a local placeholder.
pub fn is_provisional(id: &str) -> bool {
    id.starts_with(PROVISIONAL_PREFIX)
}

/// Generate a placeholder conversation id.
pub fn provisional_conversation_id() -> String {
    format!("{}{}", PROVISIONAL_PREFIX, Uuid::new_v4())
}

/// Message ids as the server emits them: sometimes integers, sometimes strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Number(i64),
    Text(String),
}

impl MessageId {
    /// Generate a placeholder message id. Ids are time-derived and strictly increasing
    /// within the process, so two ids minted in the same millisecond still differ.
    pub fn provisional() -> Self {
        let seq = MESSAGE_SEQ.fetch_add(1, Ordering::Relaxed);
        MessageId::Text(format!(
            "{}{}_{}",
            PROVISIONAL_PREFIX,
            Utc::now().timestamp_millis(),
            seq
        ))
    }

    pub fn is_provisional(&self) -> bool {
        match self {
            MessageId::Number(_) => false,
            MessageId::Text(s) => is_provisional(s),
        }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Number(n) => write!(f, "{}", n),
            MessageId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for MessageId {
    fn from(n: i64) -> Self {
        MessageId::Number(n)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        MessageId::Text(s.to_string())
    }
}
