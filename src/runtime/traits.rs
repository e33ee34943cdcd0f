//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the runtime with mock implementations.

use crate::error::TransportError;
use crate::state_machine::state::{ChatMessage, Conversation, SendReply, Settings, SettingsPatch};
use async_trait::async_trait;
use std::sync::Arc;

/// Remote conversation service
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// All conversations, most recently updated first
    async fn list_conversations(&self) -> Result<Vec<Conversation>, TransportError>;

    /// Full message history of one conversation
    async fn fetch_messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>, TransportError>;

    /// Send a user message. `None` asks the service to start a conversation.
    async fn send_message(
        &self,
        text: &str,
        conversation_id: Option<&str>,
    ) -> Result<SendReply, TransportError>;

    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), TransportError>;
}

/// Where user settings live
#[async_trait]
pub trait SettingsTransport: Send + Sync {
    async fn get_settings(&self) -> Result<Settings, TransportError>;

    /// Apply a partial update and return the stored result
    async fn update_settings(&self, patch: &SettingsPatch) -> Result<Settings, TransportError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ChatTransport + ?Sized> ChatTransport for Arc<T> {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, TransportError> {
        (**self).list_conversations().await
    }

    async fn fetch_messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>, TransportError> {
        (**self).fetch_messages(conversation_id).await
    }

    async fn send_message(
        &self,
        text: &str,
        conversation_id: Option<&str>,
    ) -> Result<SendReply, TransportError> {
        (**self).send_message(text, conversation_id).await
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), TransportError> {
        (**self).delete_conversation(conversation_id).await
    }
}

#[async_trait]
impl<T: SettingsTransport + ?Sized> SettingsTransport for Arc<T> {
    async fn get_settings(&self) -> Result<Settings, TransportError> {
        (**self).get_settings().await
    }

    async fn update_settings(&self, patch: &SettingsPatch) -> Result<Settings, TransportError> {
        (**self).update_settings(patch).await
    }
}
