use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::agent::ModelExchange;
use crate::context::ContextPolicy;
use crate::db::conversation_repository::ConversationRepository;
use crate::db::message_repository::MessageRepository;
use crate::db::Store;
use crate::errors::AppError;
use crate::models::{title_from_message, ChatTurn, Conversation, ConversationMessage};
use crate::state::{Composer, SessionAction, SessionStore, SharedSession};

/// Orchestrates the repositories, the model exchange and the session
/// projection. Every projection change goes through
/// [`SessionStore::dispatch`], and only after the matching write succeeded.
#[derive(Clone)]
pub struct ChatService {
    store: Store,
    conversation_repo: ConversationRepository,
    message_repo: MessageRepository,
    agent: Arc<dyn ModelExchange>,
    session: SharedSession,
    composer: Arc<RwLock<Composer>>,
    default_model: String,
    context_policy: ContextPolicy,
}

impl ChatService {
    pub fn new(store: Store, agent: Arc<dyn ModelExchange>, default_model: impl Into<String>) -> Self {
        Self {
            conversation_repo: ConversationRepository::new(store.clone()),
            message_repo: MessageRepository::new(store.clone()),
            store,
            agent,
            session: SessionStore::shared(),
            composer: Arc::new(RwLock::new(Composer::default())),
            default_model: default_model.into(),
            context_policy: ContextPolicy::default(),
        }
    }

    pub fn with_context_policy(mut self, policy: ContextPolicy) -> Self {
        self.context_policy = policy;
        self
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub async fn snapshot(&self) -> SessionStore {
        self.session.read().await.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.composer.read().await.is_loading()
    }

    pub async fn draft(&self) -> String {
        self.composer.read().await.draft().to_string()
    }

    pub async fn set_draft(&self, text: impl Into<String>) {
        self.composer.write().await.set_draft(text);
    }

    async fn dispatch(&self, action: SessionAction) {
        self.session.write().await.dispatch(action);
    }

    fn model_or_default(&self, model: &str) -> String {
        if model.trim().is_empty() {
            self.default_model.clone()
        } else {
            model.to_string()
        }
    }

    // ── Reads straight from the store ────────────────────────────────────────

    pub async fn get_conversations(&self) -> Result<Vec<Conversation>, AppError> {
        self.conversation_repo.find_all().await
    }

    pub async fn get_messages(&self, conversation_id: &str) -> Result<Vec<ConversationMessage>, AppError> {
        self.message_repo.find_by_conversation_id(conversation_id).await
    }

    // ── Sidebar / header operations ──────────────────────────────────────────

    /// Publishes every persisted conversation into the projection.
    pub async fn load_conversations(&self) -> Result<(), AppError> {
        let conversations = self.conversation_repo.find_all().await?;
        info!("Loaded {} conversations", conversations.len());
        self.dispatch(SessionAction::SetConversations(conversations)).await;
        Ok(())
    }

    /// Creates an empty conversation with the last-used model and focuses it.
    pub async fn new_conversation(&self) -> Result<Conversation, AppError> {
        let last_used = self.session.read().await.last_used_model().to_string();
        let conversation = Conversation::placeholder(self.model_or_default(&last_used));
        self.conversation_repo.save(&conversation).await?;
        info!("Created conversation {}", conversation.id);
        self.focus_new(&conversation).await;
        Ok(conversation)
    }

    async fn focus_new(&self, conversation: &Conversation) {
        let mut session = self.session.write().await;
        session.dispatch(SessionAction::SetFocusedConvId(Some(conversation.id.clone())));
        session.dispatch(SessionAction::SetFocusedConvMeta(Some(conversation.clone())));
        session.dispatch(SessionAction::SetFocusedConvData(Vec::new()));
        session.dispatch(SessionAction::AddConversation(conversation.clone()));
    }

    /// Focuses an existing conversation and loads its messages.
    pub async fn open_conversation(&self, id: &str) -> Result<Vec<ConversationMessage>, AppError> {
        let known = self
            .session
            .read()
            .await
            .conversations()
            .iter()
            .find(|c| c.id == id)
            .cloned();
        let conversation = match known {
            Some(c) => c,
            None => self
                .conversation_repo
                .find_by_id(id)
                .await?
                .ok_or_else(|| AppError::ConversationNotFound { id: id.to_string() })?,
        };

        let messages = self.message_repo.find_by_conversation_id(id).await?;
        let mut session = self.session.write().await;
        session.dispatch(SessionAction::SetFocusedConvId(Some(conversation.id.clone())));
        session.dispatch(SessionAction::SetFocusedConvMeta(Some(conversation)));
        session.dispatch(SessionAction::SetFocusedConvData(messages.clone()));
        Ok(messages)
    }

    /// Picks the model for new conversations and for the focused one.
    /// The choice lives only in the projection.
    pub async fn change_model(&self, model: &str) {
        let mut session = self.session.write().await;
        session.dispatch(SessionAction::SetLastUsedModel(model.to_string()));
        if let Some(meta) = session.focused_conv_meta().cloned() {
            session.dispatch(SessionAction::SetFocusedConvMeta(Some(Conversation {
                model: model.to_string(),
                ..meta
            })));
        }
    }

    pub async fn delete_conversation(&self, id: &str) -> Result<(), AppError> {
        self.conversation_repo.delete(id).await?;
        info!("Deleted conversation {id}");

        let mut session = self.session.write().await;
        let remaining: Vec<Conversation> =
            session.conversations().iter().filter(|c| c.id != id).cloned().collect();
        session.dispatch(SessionAction::SetConversations(remaining));
        if session.is_focused(id) {
            clear_focus(&mut session);
        }
        Ok(())
    }

    /// Deletes every conversation and message, keeping the tables.
    pub async fn clear_history(&self) -> Result<(), AppError> {
        self.store.clear_all().await?;
        info!("Cleared conversation history");

        let mut session = self.session.write().await;
        session.dispatch(SessionAction::SetConversations(Vec::new()));
        clear_focus(&mut session);
        Ok(())
    }

    pub async fn refresh_models(&self) -> Result<(), AppError> {
        let models = self.agent.list_models().await?;
        info!("{} models available", models.len());
        self.dispatch(SessionAction::SetAvailableModels(models)).await;
        Ok(())
    }

    pub async fn check_server(&self) -> bool {
        let connected = self.agent.ping().await;
        self.dispatch(SessionAction::SetServerConnected(connected)).await;
        connected
    }

    // ── Send ─────────────────────────────────────────────────────────────────

    /// Runs one chat turn: resolve the conversation, persist and project the
    /// user message, ask the model, persist and project the reply.
    ///
    /// A model failure leaves the user message persisted without a reply.
    /// The loading flag is cleared on every exit path.
    pub async fn send_message(&self, input: &str) -> Result<ChatTurn, AppError> {
        if input.trim().is_empty() {
            return Err(AppError::EmptyField { field_name: "message".to_string() });
        }

        self.composer.write().await.set_loading(true);
        let result = self.run_turn(input).await;
        self.composer.write().await.set_loading(false);
        result
    }

    /// Sends whatever is in the composer.
    pub async fn send_draft(&self) -> Result<ChatTurn, AppError> {
        let draft = self.draft().await;
        self.send_message(&draft).await
    }

    async fn run_turn(&self, input: &str) -> Result<ChatTurn, AppError> {
        let conversation = self.resolve_conversation().await?;
        let conversation_id = conversation.id.clone();
        let history = self.session.read().await.focused_conv_data().to_vec();
        debug!("Turn on {conversation_id} with {} prior messages", history.len());

        // ── Persist user message ──────────────────────────────────────────────
        let user_message = ConversationMessage::user(conversation_id.clone(), input);
        self.message_repo.save(&user_message).await?;
        let mut with_user = history.clone();
        with_user.push(user_message.clone());
        self.publish_messages(&conversation_id, with_user.clone()).await;
        self.composer.write().await.clear_draft();

        // ── First message names the conversation ──────────────────────────────
        if history.is_empty() {
            self.rename_from_first_message(&conversation, input).await;
        }

        // ── Ask the model ─────────────────────────────────────────────────────
        let context = self.context_policy.derive(&history);
        let model = self.model_or_default(&conversation.model);
        let generation = self
            .agent
            .generate(&model, input, &context)
            .await
            .map_err(|e| {
                error!("Model exchange failed for conversation {conversation_id}: {e}");
                e
            })?;

        // ── Persist reply ─────────────────────────────────────────────────────
        let reply = ConversationMessage::reply(
            conversation_id.clone(),
            generation.response,
            &generation.context,
        );
        self.message_repo.save(&reply).await?;
        let mut with_reply = with_user;
        with_reply.push(reply.clone());
        self.publish_messages(&conversation_id, with_reply).await;

        Ok(ChatTurn { conversation_id, user_message, reply })
    }

    /// The focused conversation, or a freshly created and focused one.
    async fn resolve_conversation(&self) -> Result<Conversation, AppError> {
        let (focused, last_used) = {
            let session = self.session.read().await;
            let focused = session
                .focused_conv_id()
                .and(session.focused_conv_meta())
                .cloned();
            (focused, session.last_used_model().to_string())
        };
        if let Some(conversation) = focused {
            return Ok(conversation);
        }

        let conversation = Conversation::placeholder(self.model_or_default(&last_used));
        self.conversation_repo.save(&conversation).await?;
        info!("Created conversation {} for first message", conversation.id);
        self.focus_new(&conversation).await;
        Ok(conversation)
    }

    async fn rename_from_first_message(&self, conversation: &Conversation, input: &str) {
        let title = title_from_message(input);
        if let Err(e) = self.conversation_repo.rename(&title, &conversation.id).await {
            warn!("Keeping placeholder title for {}: {e}", conversation.id);
            return;
        }

        let mut session = self.session.write().await;
        if session.is_focused(&conversation.id) {
            if let Some(meta) = session.focused_conv_meta().cloned() {
                session.dispatch(SessionAction::SetFocusedConvMeta(Some(Conversation {
                    title: title.clone(),
                    ..meta
                })));
            }
        }
        let renamed: Vec<Conversation> = session
            .conversations()
            .iter()
            .map(|c| {
                if c.id == conversation.id {
                    Conversation { title: title.clone(), ..c.clone() }
                } else {
                    c.clone()
                }
            })
            .collect();
        session.dispatch(SessionAction::SetConversations(renamed));
    }

    // The user may have switched conversations while the model was busy.
    async fn publish_messages(&self, conversation_id: &str, messages: Vec<ConversationMessage>) {
        let mut session = self.session.write().await;
        if session.is_focused(conversation_id) {
            session.dispatch(SessionAction::SetFocusedConvData(messages));
        } else {
            debug!("Conversation {conversation_id} no longer focused, skipping projection");
        }
    }
}

fn clear_focus(session: &mut SessionStore) {
    session.dispatch(SessionAction::SetFocusedConvId(None));
    session.dispatch(SessionAction::SetFocusedConvMeta(None));
    session.dispatch(SessionAction::SetFocusedConvData(Vec::new()));
}
