use async_trait::async_trait;

use super::types::{FeedbackRequest, GatewayError, SendOutcome, SendRequest};
use crate::models::{Conversation, Message};

/// The remote chat service as seen by the engine. Implementations are stateless
/// from the engine's point of view: each call is issued and awaited.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn send_message(&self, request: SendRequest) -> Result<SendOutcome, GatewayError>;

    async fn list_conversations(&self) -> Result<Vec<Conversation>, GatewayError>;

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>, GatewayError>;

    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), GatewayError>;

    async fn rename_conversation(
        &self,
        conversation_id: &str,
        title: &str,
    ) -> Result<(), GatewayError>;

    async fn set_pinned(&self, conversation_id: &str, pinned: bool) -> Result<(), GatewayError>;

    async fn submit_feedback(&self, feedback: FeedbackRequest) -> Result<(), GatewayError>;
}
