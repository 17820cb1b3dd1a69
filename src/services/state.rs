//! Snapshot of the client-side conversation cache and the transitions that change it.
//!
//! `ChatState::apply` is the only way state moves. It is synchronous and performs no I/O,
//! so every ordering, rollback and promotion rule can be checked without a gateway.

use chrono::{DateTime, Utc};

use super::ordering;
use crate::models::{Conversation, Message, MessageId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatState {
    pub conversations: Vec<Conversation>,
    pub current_conversation: Option<Conversation>,
    /// Loaded message sequence of the current conversation, in insertion order.
    pub messages: Vec<Message>,
    pub is_loading: bool,
    pub is_sending: bool,
    pub error: Option<String>,
}

/// Replaces a provisional conversation with the one the server confirmed.
#[derive(Debug, Clone, PartialEq)]
pub struct Promotion {
    /// Id of the conversation that was current when the send started, if any.
    pub target: Option<String>,
    /// Provisional id the optimistic user message was stamped with.
    pub provisional_id: String,
    /// Confirmed record, carrying the user/assistant pair as its messages.
    pub conversation: Conversation,
    pub assistant: Message,
    pub reorder: bool,
}

/// A reply that landed in a conversation that was already confirmed.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub conversation_id: String,
    pub user: Message,
    pub assistant: Message,
    pub at: DateTime<Utc>,
    pub reorder: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    ConversationsLoaded(Vec<Conversation>),
    MessagesLoaded(Vec<Message>),
    Selected(Option<Conversation>),
    ConversationAdded(Conversation),
    ConversationRemoved(String),
    ConversationRenamed {
        id: String,
        title: String,
        at: DateTime<Utc>,
        reorder: bool,
    },
    PinChanged {
        id: String,
        pinned: bool,
    },
    MessageAppended(Message),
    MessageRetracted(MessageId),
    Promoted(Promotion),
    AnswerRecorded(Answer),
    LoadingChanged(bool),
    SendingChanged(bool),
    ErrorSet(String),
    ErrorCleared,
}

impl ChatState {
    pub fn current_id(&self) -> Option<&str> {
        self.current_conversation.as_ref().map(|c| c.id.as_str())
    }

    pub fn apply(&mut self, change: StateChange) {
        match change {
            StateChange::ConversationsLoaded(mut conversations) => {
                ordering::sort_conversations(&mut conversations);
                self.conversations = conversations;
            }
            StateChange::MessagesLoaded(messages) => {
                self.messages = messages;
            }
            StateChange::Selected(conversation) => self.select(conversation),
            StateChange::ConversationAdded(conversation) => {
                let at = ordering::insertion_index(&self.conversations, conversation.pinned);
                self.conversations.insert(at, conversation);
            }
            StateChange::ConversationRemoved(id) => {
                self.conversations.retain(|c| c.id != id);
                if self.current_id() == Some(id.as_str()) {
                    self.current_conversation = None;
                    self.messages.clear();
                }
            }
            StateChange::ConversationRenamed {
                id,
                title,
                at,
                reorder,
            } => {
                self.for_each_copy(&id, |c| {
                    c.title = title.clone();
                    c.updated_at = at;
                });
                if reorder {
                    ordering::sort_conversations(&mut self.conversations);
                }
            }
            StateChange::PinChanged { id, pinned } => {
                self.for_each_copy(&id, |c| c.pinned = pinned);
                ordering::sort_conversations(&mut self.conversations);
            }
            StateChange::MessageAppended(message) => {
                self.messages.push(message);
            }
            StateChange::MessageRetracted(id) => {
                self.messages.retain(|m| m.id != id);
            }
            StateChange::Promoted(promotion) => self.promote(promotion),
            StateChange::AnswerRecorded(answer) => self.record_answer(answer),
            StateChange::LoadingChanged(loading) => self.is_loading = loading,
            StateChange::SendingChanged(sending) => self.is_sending = sending,
            StateChange::ErrorSet(message) => self.error = Some(message),
            StateChange::ErrorCleared => self.error = None,
        }
    }

    fn select(&mut self, conversation: Option<Conversation>) {
        match &conversation {
            // Nothing has been persisted for an unsent conversation.
            Some(c) if c.is_provisional() => self.messages.clear(),
            Some(Conversation {
                messages: Some(attached),
                ..
            }) => self.messages = attached.clone(),
            _ => {}
        }
        self.current_conversation = conversation;
    }

    /// Apply `f` to the list entry and the current conversation when they carry `id`.
    fn for_each_copy<F>(&mut self, id: &str, mut f: F)
    where
        F: FnMut(&mut Conversation),
    {
        if let Some(entry) = self.conversations.iter_mut().find(|c| c.id == id) {
            f(entry);
        }
        if let Some(current) = self.current_conversation.as_mut().filter(|c| c.id == id) {
            f(current);
        }
    }

    fn promote(&mut self, promotion: Promotion) {
        let Promotion {
            target,
            provisional_id,
            mut conversation,
            assistant,
            reorder,
        } = promotion;
        let confirmed_id = conversation.id.clone();
        let still_current = self.current_id() == target.as_deref();

        // List entry: replace the placeholder in place, else refresh an entry that already
        // carries the confirmed id, else insert. Exactly one entry ends up with the id.
        let placeholder = self
            .conversations
            .iter()
            .position(|c| c.id == provisional_id);
        let existing = self
            .conversations
            .iter()
            .position(|c| c.id == confirmed_id);
        if let Some(p) = placeholder {
            conversation.pinned = self.conversations[p].pinned;
        }
        match (placeholder, existing) {
            (Some(p), Some(e)) => {
                self.conversations[p] = conversation.clone();
                self.conversations.remove(e);
            }
            (Some(i), None) | (None, Some(i)) => {
                self.conversations[i] = conversation.clone();
            }
            (None, None) => {
                if target.as_deref() == Some(provisional_id.as_str()) {
                    tracing::warn!(
                        "Provisional conversation {} missing from list; inserting {}",
                        provisional_id,
                        confirmed_id
                    );
                }
                let at = ordering::insertion_index(&self.conversations, conversation.pinned);
                self.conversations.insert(at, conversation.clone());
            }
        }

        for message in &mut self.messages {
            if message.conversation_id == provisional_id {
                message.conversation_id = confirmed_id.clone();
            }
        }

        if still_current {
            self.current_conversation = Some(conversation);
            self.messages.push(assistant);
        }

        if reorder {
            ordering::sort_conversations(&mut self.conversations);
        }
    }

    fn record_answer(&mut self, answer: Answer) {
        let Answer {
            conversation_id,
            user,
            assistant,
            at,
            reorder,
        } = answer;

        self.for_each_copy(&conversation_id, |c| {
            c.updated_at = at;
            if let Some(attached) = c.messages.as_mut() {
                attached.push(user.clone());
                attached.push(assistant.clone());
            }
        });

        if self.current_id() == Some(conversation_id.as_str()) {
            self.messages.push(assistant);
        }

        if reorder {
            ordering::sort_conversations(&mut self.conversations);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ids, Role};
    use chrono::{Duration, TimeZone};

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn conv(id: &str, pinned: bool, minutes: i64) -> Conversation {
        Conversation {
            id: id.to_string(),
            title: id.to_string(),
            kb_id: None,
            pinned,
            created_at: at(0),
            updated_at: at(minutes),
            messages: None,
        }
    }

    fn msg(id: i64, conversation_id: &str, role: Role) -> Message {
        Message {
            id: MessageId::Number(id),
            conversation_id: conversation_id.to_string(),
            role,
            content: format!("message {}", id),
            citations: None,
            confidence: None,
            created_at: at(id),
        }
    }

    fn ids_of(state: &ChatState) -> Vec<&str> {
        state.conversations.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_load_applies_ordering() {
        let mut state = ChatState::default();
        state.apply(StateChange::ConversationsLoaded(vec![
            conv("a", false, 10),
            conv("b", true, 0),
        ]));
        assert_eq!(ids_of(&state), vec!["b", "a"]);
    }

    #[test]
    fn test_select_provisional_clears_messages() {
        let mut state = ChatState {
            messages: vec![msg(1, "a", Role::User)],
            ..Default::default()
        };
        let draft = Conversation::provisional();
        state.apply(StateChange::Selected(Some(draft.clone())));
        assert!(state.messages.is_empty());
        assert_eq!(state.current_conversation, Some(draft));
    }

    #[test]
    fn test_select_uses_attached_messages() {
        let mut state = ChatState {
            messages: vec![msg(1, "a", Role::User)],
            ..Default::default()
        };
        let mut b = conv("b", false, 0);
        b.messages = Some(vec![msg(7, "b", Role::User), msg(8, "b", Role::Assistant)]);
        state.apply(StateChange::Selected(Some(b)));
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[0].id, MessageId::Number(7));
    }

    #[test]
    fn test_select_without_attached_messages_keeps_sequence() {
        let mut state = ChatState {
            messages: vec![msg(1, "a", Role::User)],
            ..Default::default()
        };
        state.apply(StateChange::Selected(Some(conv("b", false, 0))));
        assert_eq!(state.messages.len(), 1);
        state.apply(StateChange::Selected(None));
        assert!(state.current_conversation.is_none());
        assert_eq!(state.messages.len(), 1);
    }

    #[test]
    fn test_remove_current_clears_messages() {
        let mut state = ChatState {
            conversations: vec![conv("a", false, 1), conv("b", false, 0)],
            current_conversation: Some(conv("a", false, 1)),
            messages: vec![msg(1, "a", Role::User)],
            ..Default::default()
        };
        state.apply(StateChange::ConversationRemoved("b".to_string()));
        assert_eq!(ids_of(&state), vec!["a"]);
        assert_eq!(state.messages.len(), 1);

        state.apply(StateChange::ConversationRemoved("a".to_string()));
        assert!(state.conversations.is_empty());
        assert!(state.current_conversation.is_none());
        assert!(state.messages.is_empty());
    }

    #[test]
    fn test_rename_updates_both_copies_without_reordering() {
        let mut state = ChatState {
            conversations: vec![conv("a", false, 5), conv("b", false, 1)],
            current_conversation: Some(conv("b", false, 1)),
            ..Default::default()
        };
        state.apply(StateChange::ConversationRenamed {
            id: "b".to_string(),
            title: "Renamed".to_string(),
            at: at(20),
            reorder: false,
        });
        assert_eq!(ids_of(&state), vec!["a", "b"]);
        assert_eq!(state.conversations[1].title, "Renamed");
        assert_eq!(state.conversations[1].updated_at, at(20));
        assert_eq!(state.current_conversation.as_ref().unwrap().title, "Renamed");
    }

    #[test]
    fn test_rename_with_reorder() {
        let mut state = ChatState {
            conversations: vec![conv("a", false, 5), conv("b", false, 1)],
            ..Default::default()
        };
        state.apply(StateChange::ConversationRenamed {
            id: "b".to_string(),
            title: "Renamed".to_string(),
            at: at(20),
            reorder: true,
        });
        assert_eq!(ids_of(&state), vec!["b", "a"]);
    }

    #[test]
    fn test_pin_change_resorts() {
        let mut state = ChatState {
            conversations: vec![conv("a", false, 5), conv("b", false, 1)],
            current_conversation: Some(conv("b", false, 1)),
            ..Default::default()
        };
        state.apply(StateChange::PinChanged {
            id: "b".to_string(),
            pinned: true,
        });
        assert_eq!(ids_of(&state), vec!["b", "a"]);
        assert!(state.current_conversation.as_ref().unwrap().pinned);
    }

    #[test]
    fn test_added_conversation_heads_unpinned_group() {
        let mut state = ChatState {
            conversations: vec![conv("p", true, 0), conv("a", false, 5)],
            ..Default::default()
        };
        state.apply(StateChange::ConversationAdded(conv("new", false, 9)));
        assert_eq!(ids_of(&state), vec!["p", "new", "a"]);
    }

    #[test]
    fn test_retract_removes_only_that_message() {
        let mut state = ChatState {
            messages: vec![msg(1, "a", Role::User), msg(2, "a", Role::Assistant)],
            ..Default::default()
        };
        state.apply(StateChange::MessageRetracted(MessageId::Number(2)));
        assert_eq!(state.messages, vec![msg(1, "a", Role::User)]);
    }

    fn promotion_for(state: &ChatState, provisional_id: &str, user: &Message) -> Promotion {
        let assistant = msg(42, "c1", Role::Assistant);
        let mut user = user.clone();
        user.conversation_id = "c1".to_string();
        let mut confirmed = conv("c1", false, 30);
        confirmed.messages = Some(vec![user, assistant.clone()]);
        Promotion {
            target: state.current_id().map(str::to_string),
            provisional_id: provisional_id.to_string(),
            conversation: confirmed,
            assistant,
            reorder: false,
        }
    }

    #[test]
    fn test_promotion_replaces_placeholder_in_place() {
        let mut draft = Conversation::provisional();
        draft.pinned = true;
        let draft_id = draft.id.clone();
        let user = Message::provisional_user(draft_id.clone(), "Hello".to_string());
        let mut state = ChatState {
            conversations: vec![conv("a", true, 5), draft.clone(), conv("b", false, 1)],
            current_conversation: Some(draft),
            messages: vec![user.clone()],
            ..Default::default()
        };

        let promotion = promotion_for(&state, &draft_id, &user);
        state.apply(StateChange::Promoted(promotion));

        assert_eq!(ids_of(&state), vec!["a", "c1", "b"]);
        assert_eq!(state.current_id(), Some("c1"));
        assert!(state.current_conversation.as_ref().unwrap().pinned);
        assert_eq!(state.messages.len(), 2);
        assert!(state.messages.iter().all(|m| m.conversation_id == "c1"));
        assert!(!state.conversations.iter().any(|c| c.is_provisional()));
    }

    #[test]
    fn test_promotion_without_placeholder_inserts_after_pinned() {
        let provisional_id = ids::provisional_conversation_id();
        let user = Message::provisional_user(provisional_id.clone(), "Hello".to_string());
        let mut state = ChatState {
            conversations: vec![conv("p", true, 0), conv("a", false, 5)],
            messages: vec![user.clone()],
            ..Default::default()
        };

        let promotion = promotion_for(&state, &provisional_id, &user);
        state.apply(StateChange::Promoted(promotion));

        assert_eq!(ids_of(&state), vec!["p", "c1", "a"]);
        assert_eq!(state.current_id(), Some("c1"));
        assert_eq!(state.messages[1].id, MessageId::Number(42));
    }

    #[test]
    fn test_promotion_keeps_confirmed_id_unique() {
        let provisional_id = ids::provisional_conversation_id();
        let user = Message::provisional_user(provisional_id.clone(), "Hello".to_string());
        let mut state = ChatState {
            // A list load landed while the send was in flight and already contains c1.
            conversations: vec![conv("c1", false, 9), conv("a", false, 5)],
            messages: vec![user.clone()],
            ..Default::default()
        };

        let promotion = promotion_for(&state, &provisional_id, &user);
        state.apply(StateChange::Promoted(promotion));

        assert_eq!(ids_of(&state), vec!["c1", "a"]);
        assert!(state.conversations[0].messages.is_some());
    }

    #[test]
    fn test_promotion_after_navigation_leaves_view_alone() {
        let provisional_id = ids::provisional_conversation_id();
        let user = Message::provisional_user(provisional_id.clone(), "Hello".to_string());
        let mut state = ChatState {
            conversations: vec![conv("a", false, 5)],
            messages: vec![user.clone()],
            ..Default::default()
        };
        let promotion = promotion_for(&state, &provisional_id, &user);

        // The user opened another conversation before the reply arrived.
        state.apply(StateChange::Selected(Some(conv("a", false, 5))));
        state.apply(StateChange::MessagesLoaded(vec![msg(3, "a", Role::User)]));
        state.apply(StateChange::Promoted(promotion));

        assert_eq!(ids_of(&state), vec!["c1", "a"]);
        assert_eq!(state.current_id(), Some("a"));
        assert_eq!(state.messages, vec![msg(3, "a", Role::User)]);
    }

    #[test]
    fn test_answer_bumps_activity_without_reordering() {
        let mut current = conv("b", false, 1);
        current.messages = Some(vec![]);
        let mut state = ChatState {
            conversations: vec![conv("a", false, 5), current.clone()],
            current_conversation: Some(current),
            messages: vec![msg(1, "b", Role::User)],
            ..Default::default()
        };

        state.apply(StateChange::AnswerRecorded(Answer {
            conversation_id: "b".to_string(),
            user: msg(1, "b", Role::User),
            assistant: msg(2, "b", Role::Assistant),
            at: at(30),
            reorder: false,
        }));

        assert_eq!(ids_of(&state), vec!["a", "b"]);
        assert_eq!(state.conversations[1].updated_at, at(30));
        assert_eq!(state.conversations[1].messages.as_ref().unwrap().len(), 2);
        assert_eq!(state.current_conversation.as_ref().unwrap().updated_at, at(30));
        assert_eq!(state.messages.len(), 2);
    }

    #[test]
    fn test_answer_with_reorder_moves_conversation_up() {
        let mut state = ChatState {
            conversations: vec![conv("a", false, 5), conv("b", false, 1)],
            current_conversation: Some(conv("b", false, 1)),
            ..Default::default()
        };
        state.apply(StateChange::AnswerRecorded(Answer {
            conversation_id: "b".to_string(),
            user: msg(1, "b", Role::User),
            assistant: msg(2, "b", Role::Assistant),
            at: at(30),
            reorder: true,
        }));
        assert_eq!(ids_of(&state), vec!["b", "a"]);
    }
}
