use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;

use super::error::EngineError;
use super::state::{ChatState, StateChange};
use crate::config::ClientConfig;
use crate::gateway::{ChatGateway, FeedbackRequest};
use crate::models::{is_provisional, Conversation, Message, MessageId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Re-sort after sends and renames as well as after loads and pin changes.
    pub reorder_on_activity: bool,
}

impl From<&ClientConfig> for EngineConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            reorder_on_activity: config.reorder_on_activity,
        }
    }
}

/// Owns the conversation cache and runs every operation that touches it.
///
/// State lives in a `watch` channel: each transition is applied in place and
/// published to subscribers in one step, so readers never observe half of a change.
pub struct ChatEngine {
    pub(super) gateway: Arc<dyn ChatGateway>,
    pub(super) state: watch::Sender<ChatState>,
    pub(super) config: EngineConfig,
}

/// Resets a status flag when dropped, whichever way the operation ends.
pub(super) struct FlagGuard<'a> {
    state: &'a watch::Sender<ChatState>,
    change: fn(bool) -> StateChange,
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        let change = (self.change)(false);
        self.state.send_modify(|s| s.apply(change));
    }
}

/// Takes an optimistic message back out of the cache unless disarmed.
pub(super) struct PendingMessage<'a> {
    state: &'a watch::Sender<ChatState>,
    id: Option<MessageId>,
}

impl PendingMessage<'_> {
    /// The request has settled; its outcome decides what happens to the message.
    pub(super) fn disarm(mut self) {
        self.id = None;
    }
}

impl Drop for PendingMessage<'_> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            tracing::debug!("Send abandoned, retracting message {}", id);
            self.state
                .send_modify(|s| s.apply(StateChange::MessageRetracted(id)));
        }
    }
}

impl ChatEngine {
    pub fn new(gateway: Arc<dyn ChatGateway>, config: EngineConfig) -> Self {
        let (state, _) = watch::channel(ChatState::default());
        Self {
            gateway,
            state,
            config,
        }
    }

    pub fn snapshot(&self) -> ChatState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.state.subscribe()
    }

    pub(super) fn apply(&self, change: StateChange) {
        self.state.send_modify(|s| s.apply(change));
    }

    /// Apply several transitions as one published step.
    pub(super) fn apply_all<I>(&self, changes: I)
    where
        I: IntoIterator<Item = StateChange>,
    {
        self.state.send_modify(|s| {
            for change in changes {
                s.apply(change);
            }
        });
    }

    /// Raise a status flag and clear the previous error.
    pub(super) fn begin(&self, change: fn(bool) -> StateChange) -> FlagGuard<'_> {
        self.apply_all([change(true), StateChange::ErrorCleared]);
        FlagGuard {
            state: &self.state,
            change,
        }
    }

    /// Insert `message` ahead of the server's reply.
    pub(super) fn append_pending(&self, message: Message) -> PendingMessage<'_> {
        let id = message.id.clone();
        self.apply(StateChange::MessageAppended(message));
        PendingMessage {
            state: &self.state,
            id: Some(id),
        }
    }

    /// Record `err` in the `error` field and hand it back for the caller to return.
    pub(super) fn fail(&self, err: EngineError, fallback: &str) -> EngineError {
        let message = err.user_message(fallback);
        tracing::error!("{}", message);
        self.apply(StateChange::ErrorSet(message));
        err
    }

    pub fn clear_error(&self) {
        self.apply(StateChange::ErrorCleared);
    }

    pub async fn load_conversations(&self) -> Result<Vec<Conversation>, EngineError> {
        let _loading = self.begin(StateChange::LoadingChanged);
        let conversations = self
            .gateway
            .list_conversations()
            .await
            .map_err(|e| self.fail(e.into(), "Failed to load conversations"))?;

        tracing::debug!("Loaded {} conversations", conversations.len());
        self.apply(StateChange::ConversationsLoaded(conversations));
        let ordered = self.state.borrow().conversations.clone();
        Ok(ordered)
    }

    pub async fn load_messages(&self, conversation_id: &str) -> Result<Vec<Message>, EngineError> {
        if is_provisional(conversation_id) {
            self.apply(StateChange::MessagesLoaded(Vec::new()));
            return Ok(Vec::new());
        }

        let _loading = self.begin(StateChange::LoadingChanged);
        let messages = self
            .gateway
            .get_messages(conversation_id)
            .await
            .map_err(|e| self.fail(e.into(), "Failed to load messages"))?;

        tracing::debug!(
            "Loaded {} messages for conversation {}",
            messages.len(),
            conversation_id
        );
        self.apply(StateChange::MessagesLoaded(messages.clone()));
        Ok(messages)
    }

    /// Make `conversation` current. Never performs network I/O.
    pub fn select_conversation(&self, conversation: Option<Conversation>) {
        self.apply(StateChange::Selected(conversation));
    }

    /// Open a local, unsent conversation and make it current.
    pub fn start_new_conversation(&self) -> Conversation {
        let conversation = Conversation::provisional();
        self.apply_all([
            StateChange::ConversationAdded(conversation.clone()),
            StateChange::Selected(Some(conversation.clone())),
        ]);
        conversation
    }

    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<(), EngineError> {
        // The server has never heard of a placeholder; dropping it is purely local.
        if is_provisional(conversation_id) {
            self.apply(StateChange::ConversationRemoved(conversation_id.to_string()));
            return Ok(());
        }

        let _loading = self.begin(StateChange::LoadingChanged);
        self.gateway
            .delete_conversation(conversation_id)
            .await
            .map_err(|e| self.fail(e.into(), "Failed to delete conversation"))?;

        tracing::info!("Deleted conversation {}", conversation_id);
        self.apply(StateChange::ConversationRemoved(conversation_id.to_string()));
        Ok(())
    }

    pub async fn rename_conversation(
        &self,
        conversation_id: &str,
        title: &str,
    ) -> Result<(), EngineError> {
        self.ensure_confirmed(conversation_id)?;

        let _loading = self.begin(StateChange::LoadingChanged);
        self.gateway
            .rename_conversation(conversation_id, title)
            .await
            .map_err(|e| self.fail(e.into(), "Failed to rename conversation"))?;

        self.apply(StateChange::ConversationRenamed {
            id: conversation_id.to_string(),
            title: title.to_string(),
            at: Utc::now(),
            reorder: self.config.reorder_on_activity,
        });
        Ok(())
    }

    pub async fn toggle_pinned(&self, conversation_id: &str, pinned: bool) -> Result<(), EngineError> {
        self.ensure_confirmed(conversation_id)?;

        let _loading = self.begin(StateChange::LoadingChanged);
        self.gateway
            .set_pinned(conversation_id, pinned)
            .await
            .map_err(|e| self.fail(e.into(), "Failed to change pin state"))?;

        self.apply(StateChange::PinChanged {
            id: conversation_id.to_string(),
            pinned,
        });
        Ok(())
    }

    /// Rate an assistant answer from 1 to 3.
    pub async fn submit_feedback(
        &self,
        message_id: &MessageId,
        rating: u8,
        comment: Option<&str>,
    ) -> Result<(), EngineError> {
        if !(1..=3).contains(&rating) {
            return Err(self.fail(EngineError::InvalidRating(rating), "Invalid feedback"));
        }
        if message_id.is_provisional() {
            return Err(self.fail(
                EngineError::ProvisionalMessage(message_id.to_string()),
                "Invalid feedback",
            ));
        }

        let _loading = self.begin(StateChange::LoadingChanged);
        self.gateway
            .submit_feedback(FeedbackRequest {
                message_id: message_id.clone(),
                rating,
                comment: comment.map(str::to_string),
            })
            .await
            .map_err(|e| self.fail(e.into(), "Failed to submit feedback"))?;
        Ok(())
    }

    fn ensure_confirmed(&self, conversation_id: &str) -> Result<(), EngineError> {
        if is_provisional(conversation_id) {
            return Err(self.fail(
                EngineError::ProvisionalConversation(conversation_id.to_string()),
                "Conversation not saved yet",
            ));
        }
        Ok(())
    }
}
