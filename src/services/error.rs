use thiserror::Error;

use crate::gateway::GatewayError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The service accepted the request but refused it in the payload.
    #[error("{0}")]
    Rejected(String),

    #[error("message cannot be empty")]
    EmptyMessage,

    #[error("rating must be between 1 and 3, got {0}")]
    InvalidRating(u8),

    #[error("message {0} has not been confirmed by the server")]
    ProvisionalMessage(String),

    #[error("conversation {0} has not been created on the server yet")]
    ProvisionalConversation(String),
}

impl EngineError {
    /// Text for the `error` field: the server's own words when it gave any,
    /// otherwise `fallback` with the cause appended.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            EngineError::Rejected(detail) => detail.clone(),
            EngineError::Gateway(e) => match e.server_message() {
                Some(message) => message.to_string(),
                None => format!("{}: {}", fallback, e),
            },
            other => other.to_string(),
        }
    }
}
