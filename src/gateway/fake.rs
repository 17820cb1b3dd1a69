//! Scripted in-memory gateway for engine tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::traits::ChatGateway;
use super::types::{ChatAnswer, FeedbackRequest, GatewayError, SendOutcome, SendRequest};
use crate::models::{Conversation, Message, MessageId};

type Scripted<T> = Mutex<VecDeque<(Duration, Result<T, GatewayError>)>>;

#[derive(Default)]
pub struct FakeGateway {
    sends: Scripted<SendOutcome>,
    lists: Scripted<Vec<Conversation>>,
    messages: Scripted<Vec<Message>>,
    acks: Scripted<()>,
    send_gate: Mutex<Option<oneshot::Receiver<()>>>,
    pub sent: Mutex<Vec<SendRequest>>,
    pub feedback: Mutex<Vec<FeedbackRequest>>,
    pub calls: Mutex<Vec<String>>,
}

fn pop<T>(queue: &Scripted<T>, what: &str) -> (Duration, Result<T, GatewayError>) {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| panic!("no scripted response for {}", what))
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(self, conversation_id: &str, message_id: i64, answer: &str) -> Self {
        self.send_outcome(Ok(SendOutcome::Answered(ChatAnswer {
            conversation_id: conversation_id.to_string(),
            message_id: MessageId::Number(message_id),
            answer: answer.to_string(),
            citations: None,
            confidence: None,
        })))
    }

    pub fn reject(self, detail: &str) -> Self {
        self.send_outcome(Ok(SendOutcome::Rejected {
            detail: detail.to_string(),
        }))
    }

    pub fn send_outcome(self, outcome: Result<SendOutcome, GatewayError>) -> Self {
        self.sends
            .lock()
            .unwrap()
            .push_back((Duration::ZERO, outcome));
        self
    }

    pub fn list(self, delay: Duration, result: Result<Vec<Conversation>, GatewayError>) -> Self {
        self.lists.lock().unwrap().push_back((delay, result));
        self
    }

    pub fn messages(self, result: Result<Vec<Message>, GatewayError>) -> Self {
        self.messages
            .lock()
            .unwrap()
            .push_back((Duration::ZERO, result));
        self
    }

    pub fn ack(self, result: Result<(), GatewayError>) -> Self {
        self.acks.lock().unwrap().push_back((Duration::ZERO, result));
        self
    }

    /// Hold the next send until the returned sender fires.
    pub fn gate_send(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.send_gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ChatGateway for FakeGateway {
    async fn send_message(&self, request: SendRequest) -> Result<SendOutcome, GatewayError> {
        self.record(format!("send {}", request.query));
        self.sent.lock().unwrap().push(request);
        let gate = self.send_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let (delay, result) = pop(&self.sends, "send_message");
        tokio::time::sleep(delay).await;
        result
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, GatewayError> {
        self.record("list".to_string());
        let (delay, result) = pop(&self.lists, "list_conversations");
        tokio::time::sleep(delay).await;
        result
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>, GatewayError> {
        self.record(format!("messages {}", conversation_id));
        pop(&self.messages, "get_messages").1
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), GatewayError> {
        self.record(format!("delete {}", conversation_id));
        pop(&self.acks, "delete_conversation").1
    }

    async fn rename_conversation(
        &self,
        conversation_id: &str,
        title: &str,
    ) -> Result<(), GatewayError> {
        self.record(format!("rename {} {}", conversation_id, title));
        pop(&self.acks, "rename_conversation").1
    }

    async fn set_pinned(&self, conversation_id: &str, pinned: bool) -> Result<(), GatewayError> {
        self.record(format!("pin {} {}", conversation_id, pinned));
        pop(&self.acks, "set_pinned").1
    }

    async fn submit_feedback(&self, feedback: FeedbackRequest) -> Result<(), GatewayError> {
        self.record(format!("feedback {}", feedback.message_id));
        self.feedback.lock().unwrap().push(feedback);
        pop(&self.acks, "submit_feedback").1
    }
}
