//! In-memory session projection rendered by the presentation layer.
//!
//! [`SessionStore`] is only changed through [`SessionStore::dispatch`]; the
//! controller reads repository results and dispatches the matching
//! [`SessionAction`]. Collections handed out by the accessors are read-only
//! views.

mod composer;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

pub use composer::Composer;

use crate::models::{AvailableModel, Conversation, ConversationMessage};

pub type SharedSession = Arc<RwLock<SessionStore>>;

#[derive(Debug, Clone)]
pub enum SessionAction {
    SetConversations(Vec<Conversation>),
    AddConversation(Conversation),
    SetFocusedConvId(Option<String>),
    SetFocusedConvMeta(Option<Conversation>),
    SetFocusedConvData(Vec<ConversationMessage>),
    SetLastUsedModel(String),
    SetAvailableModels(Vec<AvailableModel>),
    SetServerConnected(bool),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionStore {
    conversations: Vec<Conversation>,
    focused_conv_id: Option<String>,
    focused_conv_meta: Option<Conversation>,
    focused_conv_data: Vec<ConversationMessage>,
    last_used_model: String,
    available_models: Vec<AvailableModel>,
    server_connected: bool,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedSession {
        Arc::new(RwLock::new(Self::new()))
    }

    pub fn dispatch(&mut self, action: SessionAction) {
        match action {
            SessionAction::SetConversations(conversations) => self.conversations = conversations,
            SessionAction::AddConversation(conversation) => self.conversations.push(conversation),
            SessionAction::SetFocusedConvId(id) => self.focused_conv_id = id,
            SessionAction::SetFocusedConvMeta(meta) => self.focused_conv_meta = meta,
            SessionAction::SetFocusedConvData(messages) => self.focused_conv_data = messages,
            SessionAction::SetLastUsedModel(model) => self.last_used_model = model,
            SessionAction::SetAvailableModels(models) => self.available_models = models,
            SessionAction::SetServerConnected(connected) => self.server_connected = connected,
        }
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn focused_conv_id(&self) -> Option<&str> {
        self.focused_conv_id.as_deref()
    }

    pub fn focused_conv_meta(&self) -> Option<&Conversation> {
        self.focused_conv_meta.as_ref()
    }

    pub fn focused_conv_data(&self) -> &[ConversationMessage] {
        &self.focused_conv_data
    }

    pub fn last_used_model(&self) -> &str {
        &self.last_used_model
    }

    pub fn available_models(&self) -> &[AvailableModel] {
        &self.available_models
    }

    pub fn server_connected(&self) -> bool {
        self.server_connected
    }

    pub fn is_focused(&self, id: &str) -> bool {
        self.focused_conv_id.as_deref() == Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unfocused_and_empty() {
        let store = SessionStore::new();
        assert!(store.conversations().is_empty());
        assert!(store.focused_conv_id().is_none());
        assert!(store.focused_conv_meta().is_none());
        assert!(store.focused_conv_data().is_empty());
        assert_eq!(store.last_used_model(), "");
    }

    #[test]
    fn add_conversation_appends_last() {
        let mut store = SessionStore::new();
        let first = Conversation::placeholder("mistral");
        let second = Conversation::placeholder("llama3");
        store.dispatch(SessionAction::AddConversation(first.clone()));
        store.dispatch(SessionAction::AddConversation(second.clone()));
        assert_eq!(store.conversations(), &[first, second]);
    }

    #[test]
    fn focus_actions_are_independent() {
        let mut store = SessionStore::new();
        let conv = Conversation::placeholder("mistral");
        store.dispatch(SessionAction::SetFocusedConvId(Some(conv.id.clone())));
        assert!(store.is_focused(&conv.id));
        assert!(store.focused_conv_meta().is_none());

        store.dispatch(SessionAction::SetFocusedConvMeta(Some(conv.clone())));
        store.dispatch(SessionAction::SetFocusedConvData(vec![
            ConversationMessage::user(conv.id.clone(), "hi"),
        ]));
        assert_eq!(store.focused_conv_data().len(), 1);

        store.dispatch(SessionAction::SetFocusedConvId(None));
        assert!(!store.is_focused(&conv.id));
    }

    #[test]
    fn last_used_model_is_sticky() {
        let mut store = SessionStore::new();
        store.dispatch(SessionAction::SetLastUsedModel("llama3".into()));
        store.dispatch(SessionAction::SetFocusedConvId(None));
        store.dispatch(SessionAction::SetConversations(vec![]));
        assert_eq!(store.last_used_model(), "llama3");
    }
}
