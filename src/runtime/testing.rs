//! Mock implementations for testing
//!
//! These mocks enable integration testing of the runtime without real I/O.

use super::traits::*;
use super::ChatHandle;
use crate::error::TransportError;
use crate::state_machine::state::{
    ChatMessage, Conversation, SendReply, Settings, SettingsPatch,
};
use crate::state_machine::{ChatState, Notice};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

// ============================================================================
// Mock Chat Transport
// ============================================================================

/// A transport call as the mock saw it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    ListConversations,
    FetchMessages(String),
    SendMessage {
        text: String,
        conversation_id: Option<String>,
    },
    DeleteConversation(String),
}

/// Mock chat transport that returns queued results
#[allow(dead_code)]
#[derive(Default)]
pub struct MockChatTransport {
    conversations: Mutex<VecDeque<Result<Vec<Conversation>, TransportError>>>,
    messages: Mutex<VecDeque<Result<Vec<ChatMessage>, TransportError>>>,
    replies: Mutex<VecDeque<Result<SendReply, TransportError>>>,
    deletes: Mutex<VecDeque<Result<(), TransportError>>>,
    /// Record of all calls made
    pub calls: Mutex<Vec<TransportCall>>,
}

#[allow(dead_code)]
impl MockChatTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_conversations(&self, result: Result<Vec<Conversation>, TransportError>) {
        self.conversations.lock().unwrap().push_back(result);
    }

    pub fn queue_messages(&self, result: Result<Vec<ChatMessage>, TransportError>) {
        self.messages.lock().unwrap().push_back(result);
    }

    /// Queue a successful reply
    pub fn queue_reply(&self, reply: SendReply) {
        self.replies.lock().unwrap().push_back(Ok(reply));
    }

    /// Queue a failed send
    pub fn queue_send_error(&self, error: TransportError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn queue_delete(&self, result: Result<(), TransportError>) {
        self.deletes.lock().unwrap().push_back(result);
    }

    /// Get recorded calls
    pub fn recorded_calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: TransportCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn next<R>(queue: &Mutex<VecDeque<Result<R, TransportError>>>) -> Result<R, TransportError> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::network("No mock response queued")))
    }
}

#[async_trait]
impl ChatTransport for MockChatTransport {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, TransportError> {
        self.record(TransportCall::ListConversations);
        Self::next(&self.conversations)
    }

    async fn fetch_messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>, TransportError> {
        self.record(TransportCall::FetchMessages(conversation_id.to_string()));
        Self::next(&self.messages)
    }

    async fn send_message(
        &self,
        text: &str,
        conversation_id: Option<&str>,
    ) -> Result<SendReply, TransportError> {
        self.record(TransportCall::SendMessage {
            text: text.to_string(),
            conversation_id: conversation_id.map(str::to_string),
        });
        Self::next(&self.replies)
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), TransportError> {
        self.record(TransportCall::DeleteConversation(conversation_id.to_string()));
        Self::next(&self.deletes)
    }
}

// ============================================================================
// Gated Mock Chat Transport (for out-of-order testing)
// ============================================================================

/// Mock transport whose sends wait until the test releases them
#[allow(dead_code)]
pub struct GatedMockChatTransport {
    pub inner: MockChatTransport,
    /// Notified when a send starts (for test synchronization)
    pub send_started: Arc<Notify>,
    /// Notify once per send to let it finish
    pub release: Arc<Notify>,
}

#[allow(dead_code)]
impl GatedMockChatTransport {
    pub fn new() -> Self {
        Self {
            inner: MockChatTransport::new(),
            send_started: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }
}

#[async_trait]
impl ChatTransport for GatedMockChatTransport {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, TransportError> {
        self.inner.list_conversations().await
    }

    async fn fetch_messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>, TransportError> {
        self.inner.fetch_messages(conversation_id).await
    }

    async fn send_message(
        &self,
        text: &str,
        conversation_id: Option<&str>,
    ) -> Result<SendReply, TransportError> {
        self.send_started.notify_one();
        self.release.notified().await;
        self.inner.send_message(text, conversation_id).await
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), TransportError> {
        self.inner.delete_conversation(conversation_id).await
    }
}

// ============================================================================
// In-Memory Settings
// ============================================================================

/// In-memory settings store for testing
#[allow(dead_code)]
#[derive(Default)]
pub struct InMemorySettings {
    settings: Mutex<Settings>,
    /// Fail the next update with this error
    next_error: Mutex<Option<TransportError>>,
    pub patches: Mutex<Vec<SettingsPatch>>,
}

#[allow(dead_code)]
impl InMemorySettings {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(settings),
            ..Self::default()
        }
    }

    pub fn fail_next_update(&self, error: TransportError) {
        *self.next_error.lock().unwrap() = Some(error);
    }

    pub fn current(&self) -> Settings {
        self.settings.lock().unwrap().clone()
    }
}

#[async_trait]
impl SettingsTransport for InMemorySettings {
    async fn get_settings(&self) -> Result<Settings, TransportError> {
        Ok(self.current())
    }

    async fn update_settings(&self, patch: &SettingsPatch) -> Result<Settings, TransportError> {
        self.patches.lock().unwrap().push(patch.clone());
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Err(error);
        }
        let mut settings = self.settings.lock().unwrap();
        settings.merge(patch);
        Ok(settings.clone())
    }
}

// ============================================================================
// Test Runtime Builder
// ============================================================================

const WAIT: Duration = Duration::from_secs(2);

/// A running runtime plus a notice subscription taken before any event
pub struct TestChat {
    pub handle: ChatHandle,
    pub notices: broadcast::Receiver<Notice>,
}

#[allow(dead_code)]
impl TestChat {
    pub fn start<T: ChatTransport + 'static>(chat: T) -> Self {
        Self::start_with(ChatState::default(), chat, InMemorySettings::default())
    }

    pub fn start_with<T, S>(state: ChatState, chat: T, settings: S) -> Self
    where
        T: ChatTransport + 'static,
        S: SettingsTransport + 'static,
    {
        let handle = super::spawn(state, chat, settings, 32);
        let notices = handle.subscribe();
        Self { handle, notices }
    }

    /// Wait for a state matching `predicate`, panicking after a timeout
    pub async fn wait_until(&self, predicate: impl FnMut(&ChatState) -> bool) -> ChatState {
        tokio::time::timeout(WAIT, self.handle.wait_for(predicate))
            .await
            .expect("timed out waiting for state")
            .expect("runtime stopped")
    }

    /// Next notice, panicking after a timeout
    pub async fn next_notice(&mut self) -> Notice {
        tokio::time::timeout(WAIT, self.notices.recv())
            .await
            .expect("timed out waiting for notice")
            .expect("notice channel closed")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::state_machine::state::{ConversationId, RequestKind, Theme};
    use crate::state_machine::store::ConversationStore;
    use crate::state_machine::{selectors, Event};
    use crate::runtime::ChatRuntime;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, secs).unwrap()
    }

    fn reply(conversation_id: &str, title: &str, text: &str) -> SendReply {
        SendReply {
            conversation_id: conversation_id.to_string(),
            title: title.to_string(),
            user_text: "Hello".to_string(),
            assistant_text: text.to_string(),
            timestamp: at(5),
        }
    }

    #[tokio::test]
    async fn test_mock_chat_transport() {
        let mock = MockChatTransport::new();
        mock.queue_reply(reply("c1", "Greeting", "Hi there"));

        let result = mock.send_message("Hello", None).await.unwrap();
        assert_eq!(result.conversation_id, "c1");

        // Second call should fail (no more responses)
        let result = mock.send_message("Hello", Some("c1")).await;
        assert!(result.is_err());

        assert_eq!(
            mock.recorded_calls(),
            vec![
                TransportCall::SendMessage {
                    text: "Hello".to_string(),
                    conversation_id: None
                },
                TransportCall::SendMessage {
                    text: "Hello".to_string(),
                    conversation_id: Some("c1".to_string())
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_in_memory_settings() {
        let settings = InMemorySettings::default();
        let updated = settings
            .update_settings(&SettingsPatch::theme(Theme::Dark))
            .await
            .unwrap();
        assert_eq!(updated.theme, Theme::Dark);

        settings.fail_next_update(TransportError::server("disk full"));
        assert!(settings.update_settings(&SettingsPatch::model("x")).await.is_err());
        assert_eq!(settings.current().model, Settings::default().model);
    }

    /// Integration test: new conversation round trip
    #[tokio::test]
    async fn test_send_round_trip() {
        let chat = Arc::new(MockChatTransport::new());
        chat.queue_reply(reply("c1", "Greeting", "Hi there"));

        let rt = TestChat::start(chat.clone());
        rt.handle.send_message("Hello").await.unwrap();

        let state = rt
            .wait_until(|s| selectors::active_conversation_id(s) == Some(&ConversationId::confirmed("c1")))
            .await;

        let conversations = selectors::conversations(&state);
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].title, "Greeting");
        let contents: Vec<_> = selectors::active_messages(&state)
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["Hello", "Hi there"]);
        assert!(!selectors::is_typing(&state));

        assert_eq!(
            chat.recorded_calls(),
            vec![TransportCall::SendMessage {
                text: "Hello".to_string(),
                conversation_id: None
            }]
        );
    }

    /// Integration test: a follow-up message goes to the confirmed conversation
    #[tokio::test]
    async fn test_follow_up_uses_server_id() {
        let chat = Arc::new(MockChatTransport::new());
        chat.queue_reply(reply("c1", "Greeting", "Hi there"));
        chat.queue_reply(reply("c1", "Greeting", "Still here"));

        let rt = TestChat::start(chat.clone());
        rt.handle.send_message("Hello").await.unwrap();
        rt.wait_until(|s| selectors::active_messages(s).len() == 2).await;

        rt.handle.send_message("Are you there?").await.unwrap();
        let state = rt
            .wait_until(|s| selectors::active_messages(s).len() == 4)
            .await;

        assert_eq!(selectors::conversations(&state).len(), 1);
        assert_eq!(
            chat.recorded_calls()[1],
            TransportCall::SendMessage {
                text: "Are you there?".to_string(),
                conversation_id: Some("c1".to_string())
            }
        );
    }

    /// Integration test: failed send rolls back and hands the text back
    #[tokio::test]
    async fn test_send_failure_restores_input() {
        let chat = MockChatTransport::new();
        chat.queue_send_error(TransportError::network("offline"));

        let mut rt = TestChat::start(chat);
        rt.handle.send_message("Hello").await.unwrap();

        assert_eq!(
            rt.next_notice().await,
            Notice::RestoreInput {
                text: "Hello".to_string()
            }
        );
        assert_eq!(
            rt.next_notice().await,
            Notice::RequestFailed {
                kind: RequestKind::SendMessage,
                message: "offline".to_string()
            }
        );

        let state = rt.handle.snapshot();
        let conversations = selectors::conversations(&state);
        assert_eq!(conversations.len(), 1);
        assert!(conversations[0].id.is_temporary());
        assert!(conversations[0].messages.is_empty());
        assert_eq!(selectors::last_error(&state), Some("offline"));
        assert!(!selectors::is_typing(&state));
    }

    /// Integration test: a reply that outlives its conversation recreates it
    #[tokio::test]
    async fn test_slow_reply_after_delete_recreates_conversation() {
        let chat = Arc::new(GatedMockChatTransport::new());
        chat.inner.queue_reply(reply("c1", "Greeting", "late reply"));
        chat.inner.queue_delete(Ok(()));

        let store = ConversationStore::with_conversations(vec![Conversation::new(
            ConversationId::confirmed("c1"),
            "Greeting",
            at(0),
        )]);
        let mut rt = TestChat::start_with(
            ChatState::new(store, Settings::default()),
            chat.clone(),
            InMemorySettings::default(),
        );
        let c1 = ConversationId::confirmed("c1");

        rt.handle.dispatch(Event::select(c1.clone())).await.unwrap();
        rt.handle.send_message("Hello").await.unwrap();
        tokio::time::timeout(WAIT, chat.send_started.notified())
            .await
            .unwrap();

        rt.handle
            .dispatch(Event::DeleteConversation { id: c1.clone() })
            .await
            .unwrap();
        let state = rt.wait_until(|s| selectors::conversations(s).is_empty()).await;
        assert!(selectors::is_typing(&state));
        assert_eq!(selectors::active_conversation_id(&state), None);

        chat.release.notify_one();
        assert_eq!(
            rt.next_notice().await,
            Notice::ConversationRecreated { id: c1.clone() }
        );

        let state = rt.handle.snapshot();
        let conversations = selectors::conversations(&state);
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].id, c1);
        assert_eq!(conversations[0].messages.len(), 1);
        assert_eq!(conversations[0].messages[0].content, "late reply");
        assert!(!selectors::is_typing(&state));
    }

    /// Integration test: list then load one conversation's history
    #[tokio::test]
    async fn test_refresh_and_load_messages() {
        let chat = Arc::new(MockChatTransport::new());
        chat.queue_conversations(Ok(vec![
            Conversation::new(ConversationId::confirmed("c2"), "Newer", at(2)),
            Conversation::new(ConversationId::confirmed("c1"), "Older", at(1)),
        ]));
        chat.queue_messages(Ok(vec![
            ChatMessage::user("m1", "Hello", at(1)),
            ChatMessage::assistant("m2", "Hi there", at(1)),
        ]));

        let rt = TestChat::start(chat.clone());
        rt.handle.dispatch(Event::RefreshConversations).await.unwrap();
        rt.wait_until(|s| selectors::conversations(s).len() == 2 && !selectors::is_loading(s))
            .await;

        let c1 = ConversationId::confirmed("c1");
        rt.handle.dispatch(Event::select(c1.clone())).await.unwrap();
        rt.handle
            .dispatch(Event::LoadMessages { id: c1 })
            .await
            .unwrap();
        let state = rt
            .wait_until(|s| selectors::active_messages(s).len() == 2)
            .await;

        assert_eq!(selectors::active_conversation(&state).unwrap().title, "Older");
        assert_eq!(
            chat.recorded_calls(),
            vec![
                TransportCall::ListConversations,
                TransportCall::FetchMessages("c1".to_string())
            ]
        );
    }

    /// Integration test: model change shows immediately and is persisted
    #[tokio::test]
    async fn test_change_model_persists() {
        let settings = Arc::new(InMemorySettings::default());
        let rt = TestChat::start_with(ChatState::default(), MockChatTransport::new(), settings.clone());

        rt.handle
            .dispatch(Event::ChangeModel {
                model: "mistral".to_string(),
            })
            .await
            .unwrap();
        let state = rt
            .wait_until(|s| selectors::current_model(s) == "mistral" && !selectors::settings_loading(s))
            .await;

        assert_eq!(selectors::current_model(&state), "mistral");
        assert_eq!(settings.current().model, "mistral");
        assert_eq!(
            settings.patches.lock().unwrap().clone(),
            vec![SettingsPatch::model("mistral")]
        );
    }

    #[tokio::test]
    async fn test_dispatch_until_skips_earlier_states() {
        let chat = MockChatTransport::new();
        chat.queue_conversations(Ok(vec![Conversation::new(
            ConversationId::confirmed("c1"),
            "Greeting",
            at(0),
        )]));
        let rt = TestChat::start(chat);

        // The initial state is already "not loading"; only the settled one counts
        let state = tokio::time::timeout(
            WAIT,
            rt.handle
                .dispatch_until(Event::RefreshConversations, |s| !selectors::is_loading(s)),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(selectors::conversations(&state).len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_after_runtime_dropped() {
        let (runtime, handle) = ChatRuntime::new(
            ChatState::default(),
            MockChatTransport::new(),
            InMemorySettings::default(),
            8,
        );
        drop(runtime);

        let result = handle.dispatch(Event::RefreshConversations).await;
        assert!(matches!(result, Err(ClientError::RuntimeStopped)));
    }
}
