use chrono::Utc;

use super::conversation::derive_title;
use super::engine::ChatEngine;
use super::error::EngineError;
use super::state::{Answer, Promotion, StateChange};
use crate::gateway::{SendOutcome, SendRequest};
use crate::models::ids::provisional_conversation_id;
use crate::models::{is_provisional, Conversation, Message, Role};

impl ChatEngine {
    /// Send `text` in the current conversation, or in a new one when none is current.
    ///
    /// The user message shows up in `messages` before the service answers. If the service
    /// refuses or the call fails, that message is taken back out and the error is both
    /// recorded and returned. On success the assistant message is returned and, for a new
    /// conversation, every trace of the placeholder id is replaced by the server's id.
    ///
    /// Sends to the same conversation are not serialized; callers keep at most one in
    /// flight (see `ChatState::is_sending`).
    pub async fn send(
        &self,
        text: &str,
        knowledge_base_id: Option<&str>,
        model_id: Option<&str>,
    ) -> Result<Message, EngineError> {
        if text.trim().is_empty() {
            return Err(self.fail(EngineError::EmptyMessage, "Failed to send message"));
        }

        let _sending = self.begin(StateChange::SendingChanged);

        let target = self.state.borrow().current_id().map(str::to_string);
        let stamped_id = target.clone().unwrap_or_else(provisional_conversation_id);
        let user = Message::provisional_user(stamped_id.clone(), text.to_string());
        let pending = self.append_pending(user.clone());

        let request = SendRequest {
            conversation_id: target.clone().filter(|id| !is_provisional(id)),
            query: text.to_string(),
            kb_ids: knowledge_base_id.map(|kb| vec![kb.to_string()]).unwrap_or_default(),
            model_id: model_id.map(str::to_string),
        };
        tracing::debug!(
            "Sending message {} in conversation {}",
            user.id,
            stamped_id
        );

        let outcome = self.gateway.send_message(request).await;
        pending.disarm();

        let answer = match outcome {
            Ok(SendOutcome::Answered(answer)) => answer,
            Ok(SendOutcome::Rejected { detail }) => {
                return Err(self.roll_back(&user, EngineError::Rejected(detail)));
            }
            Err(e) => return Err(self.roll_back(&user, e.into())),
        };

        let now = Utc::now();
        let assistant = Message {
            id: answer.message_id,
            conversation_id: answer.conversation_id.clone(),
            role: Role::Assistant,
            content: answer.answer,
            citations: answer.citations,
            confidence: answer.confidence,
            created_at: now,
        };
        let reorder = self.config.reorder_on_activity;

        match target.as_deref().filter(|id| !is_provisional(id)) {
            Some(conversation_id) => {
                self.apply(StateChange::AnswerRecorded(Answer {
                    conversation_id: conversation_id.to_string(),
                    user,
                    assistant: assistant.clone(),
                    at: now,
                    reorder,
                }));
            }
            None => {
                let mut confirmed_user = user;
                confirmed_user.conversation_id = answer.conversation_id.clone();
                let conversation = Conversation {
                    id: answer.conversation_id,
                    title: derive_title(text),
                    kb_id: knowledge_base_id.map(str::to_string),
                    pinned: false,
                    created_at: now,
                    updated_at: now,
                    messages: Some(vec![confirmed_user, assistant.clone()]),
                };
                tracing::info!(
                    "Conversation {} confirmed as {}",
                    stamped_id,
                    conversation.id
                );
                self.apply(StateChange::Promoted(Promotion {
                    target,
                    provisional_id: stamped_id,
                    conversation,
                    assistant: assistant.clone(),
                    reorder,
                }));
            }
        }

        Ok(assistant)
    }

    /// Undo the optimistic insert of `user` and record why.
    fn roll_back(&self, user: &Message, err: EngineError) -> EngineError {
        let message = err.user_message("Failed to send message");
        tracing::warn!("Send failed, retracting message {}: {}", user.id, message);
        self.apply_all([
            StateChange::MessageRetracted(user.id.clone()),
            StateChange::ErrorSet(message),
        ]);
        err
    }
}
