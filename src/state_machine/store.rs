//! Conversation collection and active-conversation pointer
//!
//! The store is the only thing that mutates conversations. Every operation is
//! total: a target that is not in the collection makes the call a no-op, so
//! late transport results for deleted or not-yet-loaded conversations never
//! fail. Mutators report whether they changed anything.

use super::state::{
    ChatMessage, Conversation, ConversationId, MessageRole, SendReply, TempToken,
    NEW_CONVERSATION_TITLE,
};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationStore {
    /// Newest drafts and fallbacks are inserted at the front
    conversations: Vec<Conversation>,
    active: Option<ConversationId>,
    /// Last temporary token handed out; tokens only grow
    last_temp_token: u64,
}

/// Where a reconciled reply landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// A draft was promoted to the server id
    PromotedDraft,
    /// The reply belonged to an already-confirmed conversation
    Existing,
    /// Nothing matched; a conversation was created for the reply
    Created,
}

impl ConversationStore {
    pub fn with_conversations(conversations: Vec<Conversation>) -> Self {
        Self {
            conversations,
            ..Self::default()
        }
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn active_id(&self) -> Option<&ConversationId> {
        self.active.as_ref()
    }

    pub fn get(&self, id: &ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| &c.id == id)
    }

    pub fn contains(&self, id: &ConversationId) -> bool {
        self.get(id).is_some()
    }

    fn get_mut(&mut self, id: &ConversationId) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| &c.id == id)
    }

    fn position(&self, id: &ConversationId) -> Option<usize> {
        self.conversations.iter().position(|c| &c.id == id)
    }

    /// Point at a conversation. The id is not validated; an unknown id
    /// simply selects nothing downstream.
    pub fn set_active(&mut self, id: Option<ConversationId>) {
        self.active = id;
    }

    /// Optimistically append a user message.
    ///
    /// With no target, or a temporary target that no longer exists, the
    /// message goes to a draft that is made active: the draft still waiting
    /// on a reply if there is one, otherwise a fresh draft at the front. A
    /// confirmed target that is missing leaves the store untouched. Returns
    /// the id the message was attached to.
    pub fn insert_provisional_user_message(
        &mut self,
        target: Option<&ConversationId>,
        message: ChatMessage,
    ) -> Option<ConversationId> {
        debug_assert_eq!(message.role, MessageRole::User);

        let id = match target {
            Some(id) if self.contains(id) => id.clone(),
            Some(ConversationId::Confirmed(_)) => return None,
            Some(ConversationId::Temporary(_)) | None => match self.pending_draft() {
                Some(id) => {
                    self.active = Some(id.clone());
                    id
                }
                None => self.open_draft(message.created_at),
            },
        };

        let conversation = self.get_mut(&id)?;
        conversation.updated_at = message.created_at;
        conversation.messages.push(message);
        Some(id)
    }

    /// The draft that holds messages; at most one exists
    fn pending_draft(&self) -> Option<ConversationId> {
        self.conversations
            .iter()
            .find(|c| c.id.is_temporary() && !c.messages.is_empty())
            .map(|c| c.id.clone())
    }

    /// Open a new draft conversation, replacing any abandoned empty draft.
    fn open_draft(&mut self, at: DateTime<Utc>) -> ConversationId {
        self.conversations
            .retain(|c| !(c.id.is_temporary() && c.messages.is_empty()));

        let millis = u64::try_from(at.timestamp_millis()).unwrap_or_default();
        let token = millis.max(self.last_temp_token + 1);
        self.last_temp_token = token;

        let id = ConversationId::Temporary(TempToken::minted(token));
        self.conversations
            .insert(0, Conversation::new(id.clone(), NEW_CONVERSATION_TITLE, at));
        self.active = Some(id.clone());
        id
    }

    /// Undo an optimistic insert: remove the most recent user message with
    /// exactly this content.
    pub fn remove_last_matching_user_message(&mut self, id: &ConversationId, content: &str) -> bool {
        let Some(conversation) = self.get_mut(id) else {
            return false;
        };
        match conversation
            .messages
            .iter()
            .rposition(|m| m.role == MessageRole::User && m.content == content)
        {
            Some(index) => {
                conversation.messages.remove(index);
                true
            }
            None => false,
        }
    }

    /// Replace a conversation's history with a freshly fetched one
    pub fn replace_messages(&mut self, id: &ConversationId, messages: Vec<ChatMessage>) -> bool {
        match self.get_mut(id) {
            Some(conversation) => {
                conversation.messages = messages;
                true
            }
            None => false,
        }
    }

    /// Delete a conversation, clearing the active pointer if it pointed there
    pub fn remove_conversation(&mut self, id: &ConversationId) -> bool {
        let before = self.conversations.len();
        self.conversations.retain(|c| &c.id != id);
        if self.active.as_ref() == Some(id) {
            self.active = None;
        }
        self.conversations.len() != before
    }

    /// Replace the whole collection after a list fetch
    pub fn upsert_conversations(&mut self, conversations: Vec<Conversation>) {
        self.conversations = conversations;
    }

    /// Local title change
    pub fn rename(&mut self, id: &ConversationId, title: impl Into<String>) -> bool {
        match self.get_mut(id) {
            Some(conversation) => {
                conversation.title = title.into();
                true
            }
            None => false,
        }
    }

    /// Merge a successful send into local state.
    ///
    /// `origin` is the conversation the user message was attached to. A
    /// temporary origin is promoted to the server id. With no origin, the
    /// first temporary conversation in the collection is promoted instead.
    /// Otherwise the conversation is located by server id, and created at the
    /// front if it is gone. The assistant reply is appended, the title and
    /// `updated_at` refreshed, and the server id becomes active.
    pub fn reconcile_sent_message(
        &mut self,
        reply: &SendReply,
        origin: Option<&ConversationId>,
        assistant_message_id: String,
    ) -> (ConversationId, Reconciled) {
        let server_id = ConversationId::confirmed(reply.conversation_id.clone());

        let draft = match origin {
            Some(id @ ConversationId::Temporary(_)) => self.position(id),
            Some(ConversationId::Confirmed(_)) => None,
            None => self.conversations.iter().position(|c| c.id.is_temporary()),
        };

        let (index, outcome) = if let Some(mut index) = draft {
            // A listing may already hold the server copy; the draft replaces it
            if let Some(stale) = self.position(&server_id) {
                self.conversations.remove(stale);
                if stale < index {
                    index -= 1;
                }
            }
            self.conversations[index].id = server_id.clone();
            (index, Reconciled::PromotedDraft)
        } else if let Some(index) = self.position(&server_id) {
            (index, Reconciled::Existing)
        } else {
            self.conversations.insert(
                0,
                Conversation::new(server_id.clone(), reply.title.clone(), reply.timestamp),
            );
            (0, Reconciled::Created)
        };

        let conversation = &mut self.conversations[index];
        conversation.messages.push(ChatMessage::assistant(
            assistant_message_id,
            reply.assistant_text.clone(),
            reply.timestamp,
        ));
        conversation.title.clone_from(&reply.title);
        conversation.updated_at = reply.timestamp;

        self.active = Some(server_id.clone());
        (server_id, outcome)
    }
}
