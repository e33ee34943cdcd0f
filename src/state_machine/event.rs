//! Events that drive the chat state machine

use super::state::{ChatMessage, Conversation, ConversationId, InFlightSend, SendReply, Settings, SettingsPatch};
use crate::error::TransportError;
use chrono::{DateTime, Utc};

/// Events that trigger state transitions.
///
/// User intents start a request (the pending phase); transport outcomes settle
/// it (fulfilled or rejected).
#[derive(Debug, Clone)]
pub enum Event {
    // User intents
    SubmitMessage {
        text: String,
        /// Id of the optimistic user message
        message_id: String,
        at: DateTime<Utc>,
    },
    SelectConversation {
        id: Option<ConversationId>,
    },
    /// Leave the current conversation so the next message starts a new one
    NewChat,
    ClearError,
    RenameConversation {
        id: ConversationId,
        title: String,
    },
    RefreshConversations,
    LoadMessages {
        id: ConversationId,
    },
    DeleteConversation {
        id: ConversationId,
    },
    LoadSettings,
    UpdateSettings {
        patch: SettingsPatch,
    },
    /// Switch model locally, then persist it
    ChangeModel {
        model: String,
    },

    // Transport outcomes
    ConversationsLoaded {
        conversations: Vec<Conversation>,
    },
    ConversationsFailed {
        error: TransportError,
    },
    MessagesLoaded {
        conversation_id: String,
        messages: Vec<ChatMessage>,
    },
    MessagesFailed {
        conversation_id: String,
        error: TransportError,
    },
    MessageSent {
        request: InFlightSend,
        reply: SendReply,
        /// Id for the appended assistant message
        assistant_message_id: String,
    },
    MessageFailed {
        request: InFlightSend,
        error: TransportError,
    },
    ConversationDeleted {
        conversation_id: String,
    },
    DeleteFailed {
        conversation_id: String,
        error: TransportError,
    },
    SettingsLoaded {
        settings: Settings,
    },
    SettingsFailed {
        error: TransportError,
    },
    SettingsUpdated {
        settings: Settings,
    },
    SettingsUpdateFailed {
        error: TransportError,
    },
}

impl Event {
    /// User submitted `text` just now
    pub fn submit(text: impl Into<String>) -> Self {
        Event::SubmitMessage {
            text: text.into(),
            message_id: uuid::Uuid::new_v4().to_string(),
            at: Utc::now(),
        }
    }

    pub fn select(id: ConversationId) -> Self {
        Event::SelectConversation { id: Some(id) }
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Event::SubmitMessage { .. } => "submit_message",
            Event::SelectConversation { .. } => "select_conversation",
            Event::NewChat => "new_chat",
            Event::ClearError => "clear_error",
            Event::RenameConversation { .. } => "rename_conversation",
            Event::RefreshConversations => "refresh_conversations",
            Event::LoadMessages { .. } => "load_messages",
            Event::DeleteConversation { .. } => "delete_conversation",
            Event::LoadSettings => "load_settings",
            Event::UpdateSettings { .. } => "update_settings",
            Event::ChangeModel { .. } => "change_model",
            Event::ConversationsLoaded { .. } => "conversations_loaded",
            Event::ConversationsFailed { .. } => "conversations_failed",
            Event::MessagesLoaded { .. } => "messages_loaded",
            Event::MessagesFailed { .. } => "messages_failed",
            Event::MessageSent { .. } => "message_sent",
            Event::MessageFailed { .. } => "message_failed",
            Event::ConversationDeleted { .. } => "conversation_deleted",
            Event::DeleteFailed { .. } => "delete_failed",
            Event::SettingsLoaded { .. } => "settings_loaded",
            Event::SettingsFailed { .. } => "settings_failed",
            Event::SettingsUpdated { .. } => "settings_updated",
            Event::SettingsUpdateFailed { .. } => "settings_update_failed",
        }
    }
}
