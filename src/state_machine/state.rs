//! Client-side chat state types

use super::store::ConversationStore;
use crate::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Reserved prefix of client-local conversation ids
pub const TEMP_PREFIX: &str = "temp-";

/// Title given to a conversation drafted before the server names it
pub const NEW_CONVERSATION_TITLE: &str = "New Conversation";

// ============================================================================
// Identity
// ============================================================================

/// Disambiguator of a temporary conversation: whatever follows the prefix.
/// Tokens minted by the store are decimal and unique per store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TempToken(pub String);

impl TempToken {
    pub fn minted(n: u64) -> Self {
        TempToken(n.to_string())
    }
}

/// Conversation identity: client-local draft or server-issued id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConversationId {
    Temporary(TempToken),
    Confirmed(String),
}

impl ConversationId {
    pub fn confirmed(id: impl Into<String>) -> Self {
        ConversationId::Confirmed(id.into())
    }

    /// Classify a raw id string. Anything carrying the reserved prefix is
    /// temporary.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(TEMP_PREFIX) {
            Some(token) => ConversationId::Temporary(TempToken(token.to_string())),
            None => ConversationId::Confirmed(raw.to_string()),
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, ConversationId::Temporary(_))
    }

    /// The id the server knows this conversation by, if any
    pub fn server_id(&self) -> Option<&str> {
        match self {
            ConversationId::Temporary(_) => None,
            ConversationId::Confirmed(id) => Some(id),
        }
    }
}

/// Whether a raw id string is in the reserved temporary form
pub fn is_temporary_id(raw: &str) -> bool {
    raw.starts_with(TEMP_PREFIX)
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationId::Temporary(TempToken(token)) => write!(f, "{TEMP_PREFIX}{token}"),
            ConversationId::Confirmed(id) => f.write_str(id),
        }
    }
}

impl Serialize for ConversationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Ids read off the wire come from the server and are always confirmed.
impl<'de> Deserialize<'de> for ConversationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(ConversationId::Confirmed)
    }
}

// ============================================================================
// Conversations and Messages
// ============================================================================

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A single chat message. Content may contain markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(with = "timestamp::wire")]
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(id: impl Into<String>, content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            role: MessageRole::User,
            content: content.into(),
            created_at: at,
        }
    }

    pub fn assistant(id: impl Into<String>, content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            role: MessageRole::Assistant,
            content: content.into(),
            created_at: at,
        }
    }
}

/// A titled thread of messages in chronological order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(with = "timestamp::wire")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp::wire")]
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(id: ConversationId, title: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.into(),
            messages: Vec::new(),
            created_at: at,
            updated_at: at,
        }
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}

/// Successful reply to a sent message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReply {
    pub conversation_id: String,
    pub title: String,
    #[serde(rename = "user")]
    pub user_text: String,
    #[serde(rename = "assistant")]
    pub assistant_text: String,
    #[serde(with = "timestamp::wire")]
    pub timestamp: DateTime<Utc>,
}

/// A send whose transport call has not resolved yet.
///
/// `origin` is the conversation the optimistic user message was attached to;
/// it is the correlation token used to reconcile or roll back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlightSend {
    pub request_id: u64,
    pub origin: ConversationId,
    pub text: String,
}

impl InFlightSend {
    /// Conversation id to tell the server (`None` for drafts)
    pub fn server_conversation_id(&self) -> Option<&str> {
        self.origin.server_id()
    }
}

// ============================================================================
// Settings
// ============================================================================

/// UI colour scheme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            "system" => Some(Theme::System),
            _ => None,
        }
    }
}

pub const DEFAULT_MODEL: &str = "llama2";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub model: String,
    pub theme: Theme,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            theme: Theme::System,
        }
    }
}

impl Settings {
    /// Overwrite the fields present in `patch`
    pub fn merge(&mut self, patch: &SettingsPatch) {
        if let Some(model) = &patch.model {
            self.model.clone_from(model);
        }
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
    }
}

/// Partial settings update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
}

impl SettingsPatch {
    pub fn model(model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            theme: None,
        }
    }

    pub fn theme(theme: Theme) -> Self {
        Self {
            model: None,
            theme: Some(theme),
        }
    }
}

// ============================================================================
// Request Tracking
// ============================================================================

/// The transport operations whose lifecycle is tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RequestKind {
    ListConversations,
    FetchMessages,
    SendMessage,
    DeleteConversation,
    FetchSettings,
    UpdateSettings,
}

impl RequestKind {
    /// Description recorded when the transport gives no message
    pub fn default_failure(self) -> &'static str {
        match self {
            RequestKind::ListConversations => "Failed to fetch conversations",
            RequestKind::FetchMessages => "Failed to fetch chat messages",
            RequestKind::SendMessage => "Failed to send message",
            RequestKind::DeleteConversation => "Failed to delete conversation",
            RequestKind::FetchSettings => "Failed to fetch settings",
            RequestKind::UpdateSettings => "Failed to update settings",
        }
    }
}

/// Last rejected request and its description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFailure {
    pub kind: RequestKind,
    pub message: String,
}

/// In-flight counters per request kind plus the last error
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestState {
    in_flight: BTreeMap<RequestKind, u32>,
    last_error: Option<RequestFailure>,
}

impl RequestState {
    /// Pending: count the request and clear an error left by the same kind
    pub fn begin(&mut self, kind: RequestKind) {
        *self.in_flight.entry(kind).or_insert(0) += 1;
        if self.last_error.as_ref().is_some_and(|e| e.kind == kind) {
            self.last_error = None;
        }
    }

    /// Fulfilled
    pub fn finish(&mut self, kind: RequestKind) {
        if let Some(count) = self.in_flight.get_mut(&kind) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.in_flight.remove(&kind);
            }
        }
    }

    /// Rejected: settle the request and record why
    pub fn fail(&mut self, kind: RequestKind, message: &str) {
        self.finish(kind);
        let message = if message.trim().is_empty() {
            kind.default_failure().to_string()
        } else {
            message.to_string()
        };
        self.last_error = Some(RequestFailure { kind, message });
    }

    pub fn is_in_flight(&self, kind: RequestKind) -> bool {
        self.in_flight.get(&kind).is_some_and(|n| *n > 0)
    }

    pub fn last_error(&self) -> Option<&RequestFailure> {
        self.last_error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }
}

// ============================================================================
// Root State
// ============================================================================

/// Everything the client knows, owned by one writer (the runtime loop)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatState {
    pub store: ConversationStore,
    pub requests: RequestState,
    pub settings: Settings,
    pub settings_requests: RequestState,
    next_request_id: u64,
}

impl Default for ChatState {
    fn default() -> Self {
        Self::new(ConversationStore::default(), Settings::default())
    }
}

impl ChatState {
    pub fn new(store: ConversationStore, settings: Settings) -> Self {
        Self {
            store,
            requests: RequestState::default(),
            settings,
            settings_requests: RequestState::default(),
            next_request_id: 1,
        }
    }

    /// Allocate an id for a new in-flight send
    pub fn next_request_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }
}
