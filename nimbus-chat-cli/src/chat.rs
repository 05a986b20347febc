//! Interactive chat loop

use anyhow::Result;
use console::style;
use nimbus_chat_core::session::{ChatEvent, ImageAttachment, SessionManager};
use nimbus_chat_core::storage::{KeyValueStore, Preferences};
use nimbus_chat_core::Error;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::commands::{self, ChatCommand, HELP};
use crate::render;

type InputLines = Lines<BufReader<Stdin>>;

pub struct ChatSession {
    manager: Arc<SessionManager>,
    store: Arc<dyn KeyValueStore>,
    events: mpsc::UnboundedReceiver<ChatEvent>,
    pending_image: Option<ImageAttachment>,
}

impl ChatSession {
    pub fn new(manager: Arc<SessionManager>, store: Arc<dyn KeyValueStore>) -> Self {
        let events = manager.subscribe();
        Self {
            manager,
            store,
            events,
            pending_image: None,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        println!(
            "{}",
            style("nimbus-chat: type a message, /help for commands").bold()
        );

        if let Err(e) = self.manager.restore_on_load().await {
            render::print_error(&format!(
                "Could not start a chat session: {}",
                e.user_message()
            ));
        }
        if self.manager.selected_model().is_none() {
            let catalog = self.manager.refresh_models().await;
            if let Some(error) = catalog.error {
                render::print_error(&format!("Error fetching models: {}", error));
            }
        }
        self.flush_events();
        if let Some(model) = self.manager.selected_model() {
            println!("{}", style(format!("model: {}", model)).dim());
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            prompt("› ").await?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            let command =
                commands::with_attachment(commands::parse(&line), self.pending_image.is_some());
            debug!("Interactive command: {:?}", command);
            if command == ChatCommand::Quit {
                break;
            }
            self.handle(command, &mut lines).await?;
            self.flush_events();
        }
        Ok(())
    }

    async fn handle(&mut self, command: ChatCommand, lines: &mut InputLines) -> Result<()> {
        match command {
            ChatCommand::Send(text) => self.send(&text).await,
            ChatCommand::New => {
                if let Err(e) = self.manager.create_session().await {
                    render::print_error(&e.user_message());
                }
            }
            ChatCommand::Sessions => self.show_sessions().await,
            ChatCommand::Open(id) => {
                if let Err(e) = self.manager.load_session(&id).await {
                    render::print_error(&e.user_message());
                }
            }
            ChatCommand::Delete(id) => {
                if confirm("Delete this chat?", lines).await? {
                    match self.manager.delete_session(&id).await {
                        Ok(()) => self.show_sessions().await,
                        Err(e) => render::print_error(&e.user_message()),
                    }
                }
            }
            ChatCommand::Clear => {
                if confirm("Clear current chat (not saved)?", lines).await? {
                    if let Err(e) = self.manager.clear_conversation() {
                        render::print_error(&e.user_message());
                    }
                }
            }
            ChatCommand::Models => {
                let catalog = self.manager.refresh_models().await;
                render::print_models(&catalog, self.manager.selected_model().as_deref());
            }
            ChatCommand::Model(id) => {
                self.manager.select_model(id.clone());
                println!("{}", style(format!("model: {}", id)).dim());
            }
            ChatCommand::Image(path) => self.attach(&path).await,
            ChatCommand::Sidebar => {
                let collapsed = Preferences::new(self.store.as_ref()).toggle_sidebar()?;
                let state = if collapsed { "hidden" } else { "shown" };
                println!("{}", style(format!("chat list {} after replies", state)).dim());
            }
            ChatCommand::Help => println!("{}", HELP),
            ChatCommand::Invalid(message) => render::print_error(&message),
            ChatCommand::Empty | ChatCommand::Quit => {}
        }
        Ok(())
    }

    async fn send(&mut self, text: &str) {
        let image = self.pending_image.take();
        match self.manager.send_message(text, image.clone()).await {
            Ok(_) => {
                self.flush_events();
                if !Preferences::new(self.store.as_ref()).sidebar_collapsed() {
                    self.show_sessions().await;
                }
            }
            // the manager already published a notice for these
            Err(Error::Api(_)) | Err(Error::Superseded) => {}
            Err(e @ Error::Validation(_)) => {
                // nothing went out; keep the attachment for the next try
                self.pending_image = image;
                render::print_error(&e.user_message());
            }
            Err(e) => render::print_error(&e.user_message()),
        }
    }

    async fn attach(&mut self, path: &Path) {
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                self.pending_image = Some(ImageAttachment::from_bytes(&bytes));
                println!(
                    "{}",
                    style(format!("attached {} to the next message", path.display())).dim()
                );
            }
            Err(e) => {
                warn!("Failed to read image {:?}: {}", path, e);
                render::print_error(&format!("Could not read {}: {}", path.display(), e));
            }
        }
    }

    async fn show_sessions(&self) {
        match self.manager.list_sessions().await {
            Ok(sessions) => {
                render::print_sessions(&sessions, self.manager.current_session_id().as_deref())
            }
            Err(e) => render::print_error(&e.user_message()),
        }
    }

    fn flush_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            render::print_event(&event);
        }
    }
}

async fn prompt(text: &str) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    stdout.flush().await
}

/// Ask a yes/no question on the same input stream as the chat
async fn confirm(question: &str, lines: &mut InputLines) -> Result<bool> {
    prompt(&format!("{} [y/N] ", question)).await?;
    let answer = lines.next_line().await?.unwrap_or_default();
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nimbus_chat_core::session::{ChatMessage, CompletionRequest, SessionSummary};
    use nimbus_chat_core::storage::MemoryStore;
    use nimbus_chat_core::{ApiError, ApiResult, ChatBackend};
    use serde_json::Value;

    struct Unreachable;

    #[async_trait]
    impl ChatBackend for Unreachable {
        async fn list_models(&self) -> ApiResult<Value> {
            Err(ApiError::Network("offline".into()))
        }
        async fn create_session(&self) -> ApiResult<String> {
            Err(ApiError::Network("offline".into()))
        }
        async fn list_sessions(&self) -> ApiResult<Vec<SessionSummary>> {
            Err(ApiError::Network("offline".into()))
        }
        async fn get_session(&self, _session_id: &str) -> ApiResult<Vec<ChatMessage>> {
            Err(ApiError::Network("offline".into()))
        }
        async fn delete_session(&self, _session_id: &str) -> ApiResult<()> {
            Err(ApiError::Network("offline".into()))
        }
        async fn send_message(&self, _request: &CompletionRequest) -> ApiResult<String> {
            Err(ApiError::Network("offline".into()))
        }
    }

    #[tokio::test]
    async fn test_rejected_send_keeps_attachment() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let manager = Arc::new(SessionManager::new(Arc::new(Unreachable), store.clone()));
        let mut chat = ChatSession::new(manager, store);
        let image = ImageAttachment::from_bytes(b"png");
        chat.pending_image = Some(image.clone());

        // no model selected, so the manager refuses before any request
        chat.send("").await;

        assert_eq!(chat.pending_image, Some(image));
    }
}
