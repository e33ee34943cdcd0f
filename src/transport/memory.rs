//! In-process chat backend
//!
//! Keeps conversations in memory and asks a [`Responder`] for replies and
//! titles. Conversations are kept most recently updated first.

use crate::error::TransportError;
use crate::runtime::ChatTransport;
use crate::state_machine::state::{ChatMessage, Conversation, ConversationId, SendReply};
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;

/// Title used when none could be generated
pub const FALLBACK_TITLE: &str = "New Chat";

const MAX_TITLE_WORDS: usize = 6;
const TITLE_TIMEOUT: Duration = Duration::from_secs(5);
/// Prior messages handed to the responder for context
const HISTORY_WINDOW: usize = 20;

/// Produces assistant replies
#[async_trait]
pub trait Responder: Send + Sync {
    /// Reply to `message` given the conversation so far (oldest first)
    async fn reply(&self, history: &[ChatMessage], message: &str) -> Result<String, TransportError>;

    /// Short title for a conversation opened by `first_message`
    async fn title(&self, first_message: &str) -> Result<String, TransportError> {
        Ok(first_message.to_string())
    }
}

/// Responder that repeats the user back
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoResponder;

#[async_trait]
impl Responder for EchoResponder {
    async fn reply(&self, _history: &[ChatMessage], message: &str) -> Result<String, TransportError> {
        Ok(format!("You said: {}", message.trim()))
    }
}

pub struct InMemoryTransport<R: Responder> {
    responder: R,
    conversations: Mutex<Vec<Conversation>>,
}

impl<R: Responder> InMemoryTransport<R> {
    pub fn new(responder: R) -> Self {
        Self {
            responder,
            conversations: Mutex::new(Vec::new()),
        }
    }

    async fn generate_title(&self, message: &str) -> String {
        match timeout(TITLE_TIMEOUT, self.responder.title(message)).await {
            Ok(Ok(title)) => sanitize_title(&title),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Title generation failed");
                FALLBACK_TITLE.to_string()
            }
            Err(_) => {
                tracing::warn!("Title generation timed out");
                FALLBACK_TITLE.to_string()
            }
        }
    }

    /// Open a conversation and return its id
    async fn create(&self, message: &str) -> String {
        let title = self.generate_title(message).await;
        let id = uuid::Uuid::new_v4().to_string();
        let conversation = Conversation::new(ConversationId::confirmed(id.clone()), title, Utc::now());
        tracing::info!(conv_id = %id, title = %conversation.title, "Created conversation");
        self.conversations.lock().await.insert(0, conversation);
        id
    }

    /// Tail of the stored history, or `NotFound`
    async fn history(&self, conversation_id: &str) -> Result<Vec<ChatMessage>, TransportError> {
        let conversations = self.conversations.lock().await;
        let conversation = find(&conversations, conversation_id)?;
        let start = conversation.messages.len().saturating_sub(HISTORY_WINDOW);
        Ok(conversation.messages[start..].to_vec())
    }

    /// Store both sides of an exchange and move the conversation to the front
    async fn commit(
        &self,
        conversation_id: &str,
        user_text: &str,
        assistant_text: String,
    ) -> Result<SendReply, TransportError> {
        let mut conversations = self.conversations.lock().await;
        let index = position(&conversations, conversation_id)?;
        let mut conversation = conversations.remove(index);

        let now = Utc::now();
        conversation.messages.push(ChatMessage::user(
            uuid::Uuid::new_v4().to_string(),
            user_text,
            now,
        ));
        conversation.messages.push(ChatMessage::assistant(
            uuid::Uuid::new_v4().to_string(),
            assistant_text.clone(),
            now,
        ));
        conversation.updated_at = now;

        let reply = SendReply {
            conversation_id: conversation_id.to_string(),
            title: conversation.title.clone(),
            user_text: user_text.to_string(),
            assistant_text,
            timestamp: now,
        };
        conversations.insert(0, conversation);
        Ok(reply)
    }

    async fn discard(&self, conversation_id: &str) {
        let mut conversations = self.conversations.lock().await;
        if let Ok(index) = position(&conversations, conversation_id) {
            conversations.remove(index);
            tracing::info!(conv_id = %conversation_id, "Discarded conversation after failed reply");
        }
    }
}

fn position(conversations: &[Conversation], conversation_id: &str) -> Result<usize, TransportError> {
    conversations
        .iter()
        .position(|c| c.id.server_id() == Some(conversation_id))
        .ok_or_else(|| TransportError::not_found("Conversation not found"))
}

fn find<'a>(conversations: &'a [Conversation], conversation_id: &str) -> Result<&'a Conversation, TransportError> {
    position(conversations, conversation_id).map(|i| &conversations[i])
}

/// At most a handful of words, no quotes
fn sanitize_title(title: &str) -> String {
    let words: Vec<&str> = title
        .split_whitespace()
        .map(|w| w.trim_matches('"'))
        .filter(|w| !w.is_empty())
        .take(MAX_TITLE_WORDS)
        .collect();
    if words.is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        words.join(" ").replace('"', "")
    }
}

#[async_trait]
impl<R: Responder> ChatTransport for InMemoryTransport<R> {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, TransportError> {
        Ok(self.conversations.lock().await.clone())
    }

    async fn fetch_messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>, TransportError> {
        let conversations = self.conversations.lock().await;
        Ok(find(&conversations, conversation_id)?.messages.clone())
    }

    async fn send_message(
        &self,
        text: &str,
        conversation_id: Option<&str>,
    ) -> Result<SendReply, TransportError> {
        if text.trim().is_empty() {
            return Err(TransportError::invalid_request("Message content is required"));
        }

        let (conversation_id, history, is_new) = match conversation_id {
            Some(id) => (id.to_string(), self.history(id).await?, false),
            None => (self.create(text).await, Vec::new(), true),
        };

        match self.responder.reply(&history, text).await {
            Ok(answer) => self.commit(&conversation_id, text, answer).await,
            Err(e) => {
                tracing::error!(conv_id = %conversation_id, error = %e, "Responder failed");
                if is_new {
                    self.discard(&conversation_id).await;
                }
                Err(TransportError::server(e.message))
            }
        }
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), TransportError> {
        let mut conversations = self.conversations.lock().await;
        let index = position(&conversations, conversation_id)?;
        conversations.remove(index);
        tracing::info!(conv_id = %conversation_id, "Deleted conversation");
        Ok(())
    }
}
