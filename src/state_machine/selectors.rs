//! Read-only projections over the chat state

use super::state::{ChatMessage, ChatState, Conversation, ConversationId, RequestKind, Settings, Theme};

pub fn conversations(state: &ChatState) -> &[Conversation] {
    state.store.conversations()
}

pub fn active_conversation_id(state: &ChatState) -> Option<&ConversationId> {
    state.store.active_id()
}

/// The active conversation, if the pointer names one that exists
pub fn active_conversation(state: &ChatState) -> Option<&Conversation> {
    state.store.active_id().and_then(|id| state.store.get(id))
}

pub fn active_messages(state: &ChatState) -> &[ChatMessage] {
    active_conversation(state)
        .map(|c| c.messages.as_slice())
        .unwrap_or_default()
}

/// A list or history fetch is in flight
pub fn is_loading(state: &ChatState) -> bool {
    state.requests.is_in_flight(RequestKind::ListConversations)
        || state.requests.is_in_flight(RequestKind::FetchMessages)
}

/// A send is awaiting the assistant
pub fn is_typing(state: &ChatState) -> bool {
    state.requests.is_in_flight(RequestKind::SendMessage)
}

pub fn is_deleting(state: &ChatState) -> bool {
    state.requests.is_in_flight(RequestKind::DeleteConversation)
}

pub fn last_error(state: &ChatState) -> Option<&str> {
    state.requests.last_error().map(|e| e.message.as_str())
}

pub fn settings(state: &ChatState) -> &Settings {
    &state.settings
}

pub fn current_model(state: &ChatState) -> &str {
    &state.settings.model
}

pub fn current_theme(state: &ChatState) -> Theme {
    state.settings.theme
}

pub fn settings_loading(state: &ChatState) -> bool {
    state.settings_requests.is_in_flight(RequestKind::FetchSettings)
        || state.settings_requests.is_in_flight(RequestKind::UpdateSettings)
}

pub fn settings_error(state: &ChatState) -> Option<&str> {
    state.settings_requests.last_error().map(|e| e.message.as_str())
}
