//! Effects produced by state transitions

use super::state::{ConversationId, InFlightSend, RequestKind, SettingsPatch};

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ListConversations,

    FetchMessages { conversation_id: String },

    /// Send a message; the request travels with the call so the outcome can
    /// be correlated with the optimistic insert
    SendMessage { request: InFlightSend },

    DeleteConversation { conversation_id: String },

    FetchSettings,

    UpdateSettings { patch: SettingsPatch },

    /// Tell the UI something it cannot derive from state
    Notify(Notice),
}

/// One-shot notifications for the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A send failed; put its text back into the input box
    RestoreInput { text: String },

    RequestFailed { kind: RequestKind, message: String },

    /// A reply arrived for a conversation that no longer existed locally and
    /// it was created again
    ConversationRecreated { id: ConversationId },
}

impl Effect {
    pub fn restore_input(text: impl Into<String>) -> Self {
        Effect::Notify(Notice::RestoreInput { text: text.into() })
    }

    pub fn request_failed(kind: RequestKind, message: impl Into<String>) -> Self {
        Effect::Notify(Notice::RequestFailed {
            kind,
            message: message.into(),
        })
    }
}
