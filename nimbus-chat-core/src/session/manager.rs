//! Conversation session manager
//!
//! Keeps the current session id, the local message history and the remote
//! session store in agreement. Every operation takes `&self`; the state sits
//! behind a lock that is never held across an await, so a caller may have
//! several operations in flight at once.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::events::ChatEvent;
use super::store::{
    sort_by_recency, ChatMessage, CompletionRequest, ImageAttachment, SessionSummary,
    IMAGE_PLACEHOLDER,
};
use crate::backend::ChatBackend;
use crate::models::{ModelCatalog, ModelListing};
use crate::storage::{KeyValueStore, CURRENT_SESSION_KEY};
use crate::{Error, Result};

/// How `restore_on_load` ended up with a current session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The cached session was fetched and adopted
    Restored(String),
    /// A fresh session was created (nothing cached, or the cached one was invalid)
    Created(String),
}

impl RestoreOutcome {
    pub fn session_id(&self) -> &str {
        match self {
            RestoreOutcome::Restored(id) | RestoreOutcome::Created(id) => id,
        }
    }
}

#[derive(Debug, Default)]
struct ConversationState {
    current_session_id: Option<String>,
    history: Vec<ChatMessage>,
    /// Bumped whenever the current conversation is switched or cleared
    epoch: u64,
    selected_model: Option<String>,
}

/// Owns the single active conversation on the client
pub struct SessionManager {
    backend: Arc<dyn ChatBackend>,
    store: Arc<dyn KeyValueStore>,
    state: Mutex<ConversationState>,
    /// Latest dispatched `load_session`
    load_generation: AtomicU64,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<ChatEvent>>>,
}

impl SessionManager {
    /// Create a manager with no current session
    pub fn new(backend: Arc<dyn ChatBackend>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            store,
            state: Mutex::new(ConversationState::default()),
            load_generation: AtomicU64::new(0),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Preselect a model (usually from configuration)
    pub fn with_model(self, model: Option<String>) -> Self {
        self.state.lock().selected_model = model.filter(|m| !m.trim().is_empty());
        self
    }

    /// Receive every event published from now on
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ChatEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    fn emit(&self, event: ChatEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn current_session_id(&self) -> Option<String> {
        self.state.lock().current_session_id.clone()
    }

    /// Snapshot of the local conversation history
    pub fn history(&self) -> Vec<ChatMessage> {
        self.state.lock().history.clone()
    }

    pub fn selected_model(&self) -> Option<String> {
        self.state.lock().selected_model.clone()
    }

    pub fn select_model(&self, model: impl Into<String>) {
        let model = model.into();
        info!("Selected model {}", model);
        self.state.lock().selected_model = Some(model);
    }

    /// Session id remembered from a previous run, if any
    pub fn cached_session_id(&self) -> Option<String> {
        self.store.get(CURRENT_SESSION_KEY)
    }

    /// Adopt the remembered session, or start a new one
    ///
    /// A remembered id that can no longer be fetched is purged before a new
    /// session is created, so the manager never ends up pointing at it.
    pub async fn restore_on_load(&self) -> Result<RestoreOutcome> {
        if let Some(cached) = self.cached_session_id() {
            match self.load_session(&cached).await {
                Ok(()) => {
                    info!("Restored chat session {}", cached);
                    return Ok(RestoreOutcome::Restored(cached));
                }
                Err(Error::Superseded) => return Err(Error::Superseded),
                Err(e) => {
                    warn!(
                        "Failed to restore chat session {}: {}; creating a new one",
                        cached, e
                    );
                    self.invalidate(&cached)?;
                }
            }
        }

        let session_id = self.create_session().await?;
        Ok(RestoreOutcome::Created(session_id))
    }

    /// Start a new, empty session and make it current
    pub async fn create_session(&self) -> Result<String> {
        debug!("Requesting new chat session");
        let session_id = self.backend.create_session().await.map_err(|e| {
            warn!("Session creation failed: {}", e);
            Error::from(e)
        })?;

        self.adopt(&session_id, Vec::new())?;
        info!("New chat session created: {}", session_id);

        self.emit(ChatEvent::SessionChanged(Some(session_id.clone())));
        self.emit(ChatEvent::ConversationCleared);
        self.emit(ChatEvent::SessionsChanged);
        Ok(session_id)
    }

    /// All sessions, most recently updated first
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let mut sessions = self.backend.list_sessions().await.map_err(|e| {
            warn!("Error loading sessions: {}", e);
            Error::from(e)
        })?;
        sort_by_recency(&mut sessions);
        Ok(sessions)
    }

    /// Make `session_id` current and replace the history with the server's copy
    ///
    /// On failure the previous session stays current. A response that arrives
    /// after a newer `load_session` was dispatched is dropped with
    /// [`Error::Superseded`].
    pub async fn load_session(&self, session_id: &str) -> Result<()> {
        let generation = self.load_generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Loading chat session {} (generation {})", session_id, generation);

        let messages = self.backend.get_session(session_id).await.map_err(|e| {
            warn!("Error loading session {}: {}", session_id, e);
            Error::from(e)
        })?;

        {
            let mut state = self.state.lock();
            if self.load_generation.load(Ordering::SeqCst) != generation {
                debug!(
                    "Discarding stale load of {} (generation {})",
                    session_id, generation
                );
                return Err(Error::Superseded);
            }
            self.store.set(CURRENT_SESSION_KEY, session_id)?;
            state.current_session_id = Some(session_id.to_string());
            state.history = messages.clone();
            state.epoch += 1;
        }

        self.emit(ChatEvent::SessionChanged(Some(session_id.to_string())));
        self.emit(ChatEvent::HistoryReplaced {
            session_id: session_id.to_string(),
            messages,
        });
        self.emit(ChatEvent::SessionsChanged);
        Ok(())
    }

    /// Delete a session on the server, dropping it locally if it was current
    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        self.backend
            .delete_session(session_id)
            .await
            .map_err(|e| {
                warn!("Error deleting session {}: {}", session_id, e);
                Error::from(e)
            })?;
        info!("Deleted chat session {}", session_id);

        let was_current = {
            let mut state = self.state.lock();
            if state.current_session_id.as_deref() == Some(session_id) {
                state.current_session_id = None;
                state.history.clear();
                state.epoch += 1;
                true
            } else {
                false
            }
        };

        if was_current {
            self.emit(ChatEvent::SessionChanged(None));
            self.emit(ChatEvent::ConversationCleared);
        }
        self.emit(ChatEvent::SessionsChanged);

        if self.cached_session_id().as_deref() == Some(session_id) {
            self.store.remove(CURRENT_SESSION_KEY)?;
        }
        Ok(())
    }

    /// Forget the current session locally; the server keeps its copy
    pub fn clear_conversation(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            state.current_session_id = None;
            state.history.clear();
            state.epoch += 1;
            self.store.remove(CURRENT_SESSION_KEY)?;
        }
        self.emit(ChatEvent::SessionChanged(None));
        self.emit(ChatEvent::ConversationCleared);
        Ok(())
    }

    /// Send a message (and optional image) in the current session
    ///
    /// Creates a session first when none is current. The user entry is
    /// recorded before the request goes out and stays even if the request
    /// fails; the assistant entry is recorded only for a successful reply.
    pub async fn send_message(
        &self,
        text: &str,
        image: Option<ImageAttachment>,
    ) -> Result<String> {
        let text = text.trim();
        if text.is_empty() && image.is_none() {
            return Err(Error::Validation("message is empty".to_string()));
        }
        let model = self
            .selected_model()
            .ok_or_else(|| Error::Validation("no model selected".to_string()))?;

        if self.current_session_id().is_none() {
            info!("No active session, creating one before sending");
            if let Err(e) = self.create_session().await {
                let reason = match &e {
                    Error::Api(api) => api.reason(),
                    other => other.to_string(),
                };
                self.emit(ChatEvent::Notice(format!(
                    "Error: Could not create chat session - {}",
                    reason
                )));
                return Err(e);
            }
        }

        let user = ChatMessage::user(if text.is_empty() {
            IMAGE_PLACEHOLDER
        } else {
            text
        });
        let (request, epoch) = {
            let mut state = self.state.lock();
            let session_id = state
                .current_session_id
                .clone()
                .ok_or(Error::NoActiveSession)?;
            state.history.push(user.clone());
            let request = CompletionRequest {
                model,
                message: text.to_string(),
                image: image.map(|i| i.as_base64().to_string()),
                history: state.history.clone(),
                session_id,
            };
            (request, state.epoch)
        };
        self.emit(ChatEvent::MessageAppended(user));

        debug!(
            model = %request.model,
            message_length = request.message.len(),
            session_id = %request.session_id,
            history_length = request.history.len(),
            "Sending message"
        );

        let reply = match self.backend.send_message(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                if self.state.lock().epoch != epoch {
                    debug!(
                        "Dropping send failure for {}: conversation switched ({})",
                        request.session_id, e
                    );
                    return Err(Error::Superseded);
                }
                warn!("Message send failed: {}", e);
                self.emit(ChatEvent::Notice(e.user_message()));
                return Err(e.into());
            }
        };

        let assistant = ChatMessage::assistant(reply.clone());
        {
            let mut state = self.state.lock();
            if state.epoch != epoch {
                debug!(
                    "Dropping reply for {}: conversation switched",
                    request.session_id
                );
                return Err(Error::Superseded);
            }
            state.history.push(assistant.clone());
        }
        self.emit(ChatEvent::MessageAppended(assistant));
        self.emit(ChatEvent::SessionsChanged);
        Ok(reply)
    }

    /// Fetch the model list and keep the selection valid
    ///
    /// Never fails: transport and shape errors are reported in
    /// [`ModelCatalog::error`] with an empty list.
    pub async fn refresh_models(&self) -> ModelCatalog {
        let catalog = match self.backend.list_models().await {
            Ok(body) => ModelListing::from_value(&body).into_catalog(),
            Err(e) => {
                warn!("fetch models error: {}", e);
                ModelCatalog::failed(e.user_message())
            }
        };

        let mut state = self.state.lock();
        let keep = match state.selected_model.as_deref() {
            Some(selected) => catalog.models.is_empty() || catalog.contains(selected),
            None => false,
        };
        if !keep {
            state.selected_model = catalog.first().map(str::to_string);
        }
        catalog
    }

    fn adopt(&self, session_id: &str, history: Vec<ChatMessage>) -> Result<()> {
        let mut state = self.state.lock();
        self.store.set(CURRENT_SESSION_KEY, session_id)?;
        state.current_session_id = Some(session_id.to_string());
        state.history = history;
        state.epoch += 1;
        Ok(())
    }

    /// Drop a session id known to be unusable from memory and storage
    fn invalidate(&self, session_id: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.current_session_id.as_deref() == Some(session_id) {
            state.current_session_id = None;
            state.history.clear();
            state.epoch += 1;
        }
        self.store.remove(CURRENT_SESSION_KEY)
    }
}
