//! CLI entry point for nimbus-chat

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::{Confirm, Input};
use nimbus_chat_client::HttpChatBackend;
use nimbus_chat_core::config::{Config, ConfigLoader, LoggingConfig};
use nimbus_chat_core::logging::init_logging;
use nimbus_chat_core::session::{ImageAttachment, RestoreOutcome, SessionManager};
use nimbus_chat_core::storage::{clear_client_state, FileStore, KeyValueStore, Preferences};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

mod chat;
mod commands;
mod render;

#[derive(Parser)]
#[command(name = "nimbus-chat")]
#[command(about = "Terminal client for a nimbus chat server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a configuration file interactively
    Onboard,
    /// Show configuration and cached client state
    Status,
    /// List the models the server offers
    Models,
    /// List chat sessions, most recent first
    Sessions,
    /// Start a new chat session and make it current
    New,
    /// Make a session current and print its history
    Open {
        /// Session id
        session_id: String,
    },
    /// Delete a chat session
    Delete {
        /// Session id
        session_id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Send one message in the current session and print the reply
    Send {
        /// Message to send
        #[arg(short, long)]
        message: String,
        /// Image file to attach
        #[arg(short, long)]
        image: Option<PathBuf>,
        /// Model to use
        #[arg(long)]
        model: Option<String>,
    },
    /// Interactive chat
    Chat {
        /// Model to use
        #[arg(long)]
        model: Option<String>,
    },
    /// Forget the current session locally
    Clear,
    /// Forget all cached client state
    Logout,
}

/// Wired-up client for one invocation
struct App {
    loader: ConfigLoader,
    config: Config,
    store: Arc<dyn KeyValueStore>,
    manager: Arc<SessionManager>,
}

impl App {
    fn build(loader: ConfigLoader, config: Config) -> Self {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(loader.state_path(&config)));
        let backend = Arc::new(HttpChatBackend::from_config(&config.server));
        let manager = Arc::new(
            SessionManager::new(backend, store.clone()).with_model(config.chat.model.clone()),
        );
        Self {
            loader,
            config,
            store,
            manager,
        }
    }

    /// Use `model`, or fall back to the configured one, or the server's first
    async fn ensure_model(&self, model: Option<String>) -> Result<()> {
        if let Some(model) = model {
            self.manager.select_model(model);
            return Ok(());
        }
        if self.manager.selected_model().is_some() {
            return Ok(());
        }
        let catalog = self.manager.refresh_models().await;
        if let Some(error) = catalog.error {
            anyhow::bail!("Error fetching models: {}", error);
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    if let Commands::Onboard = cli.command {
        return run_onboard(&loader);
    }

    let config = loader
        .load()
        .with_context(|| format!("Failed to load config from {}", loader.config_dir().display()))?;
    let _guard = init_logging(&resolve_log_dir(&config.logging, loader.config_dir()));
    let app = App::build(loader, config);

    match cli.command {
        Commands::Onboard => {}
        Commands::Status => run_status(&app),
        Commands::Models => run_models(&app).await?,
        Commands::Sessions => run_sessions(&app).await?,
        Commands::New => {
            let session_id = app.manager.create_session().await?;
            println!("{} {}", style("New chat").green().bold(), session_id);
        }
        Commands::Open { session_id } => {
            info!("Opening chat session {}", session_id);
            app.manager.load_session(&session_id).await?;
            render::print_history(&app.manager.history());
        }
        Commands::Delete { session_id, yes } => run_delete(&app, &session_id, yes).await?,
        Commands::Send {
            message,
            image,
            model,
        } => run_send(&app, &message, image, model).await?,
        Commands::Chat { model } => {
            if let Some(model) = model {
                app.manager.select_model(model);
            }
            chat::ChatSession::new(app.manager.clone(), app.store.clone())
                .run()
                .await?;
        }
        Commands::Clear => {
            app.manager.clear_conversation()?;
            println!("Current chat cleared");
        }
        Commands::Logout => {
            clear_client_state(app.store.as_ref())?;
            println!("Cached chat state removed");
        }
    }

    Ok(())
}

/// Relative log directories live under the config directory
fn resolve_log_dir(logging: &LoggingConfig, config_dir: &Path) -> LoggingConfig {
    let mut resolved = logging.clone();
    let dir = expand_tilde(&logging.dir);
    resolved.dir = if dir.is_absolute() {
        dir.to_string_lossy().into_owned()
    } else {
        config_dir.join(dir).to_string_lossy().into_owned()
    };
    resolved
}

/// Expand tilde in path
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Run the onboard wizard
fn run_onboard(loader: &ConfigLoader) -> Result<()> {
    println!("{}", style("Welcome to nimbus-chat!").bold().cyan());
    println!("Let's set up your configuration.\n");

    let config_path = loader.config_dir().join("config.json");
    if config_path.exists() {
        let overwrite = Confirm::new()
            .with_prompt("Configuration already exists. Overwrite?")
            .default(false)
            .interact()?;
        if !overwrite {
            println!("Onboard cancelled.");
            return Ok(());
        }
    }

    let mut config = Config::default();

    config.server.base_url = Input::new()
        .with_prompt("Chat server URL")
        .default(config.server.base_url.clone())
        .interact_text()?;

    let cookie: String = Input::new()
        .with_prompt("Session cookie (name=value, blank to skip)")
        .allow_empty(true)
        .interact_text()?;
    config.server.session_cookie = Some(cookie.trim().to_string()).filter(|c| !c.is_empty());

    let model: String = Input::new()
        .with_prompt("Default model (blank to use the server's first)")
        .allow_empty(true)
        .interact_text()?;
    config.chat.model = Some(model.trim().to_string()).filter(|m| !m.is_empty());

    loader.save(&config)?;

    println!(
        "\n{}",
        style("Configuration saved successfully!").green().bold()
    );
    println!("Config location: {}", config_path.display());
    println!("\nYou can now run:");
    println!("  {} - Start chatting", style("nimbus-chat chat").cyan());
    println!("  {} - List your chats", style("nimbus-chat sessions").cyan());
    Ok(())
}

/// Show configuration and cached client state
fn run_status(app: &App) {
    println!("{}", style("nimbus-chat status").bold());
    println!(
        "  Config: {}",
        app.loader.config_dir().join("config.json").display()
    );
    println!("  State: {}", app.loader.state_path(&app.config).display());
    println!("  Server: {}", app.config.server.base_url);

    let cookie = if app.config.server.session_cookie.is_some() {
        style("set").green()
    } else {
        style("not set").dim()
    };
    println!("  Session cookie: {}", cookie);
    println!(
        "  Model: {}",
        app.config.chat.model.as_deref().unwrap_or("(server default)")
    );
    println!(
        "  Current chat: {}",
        app.manager
            .cached_session_id()
            .unwrap_or_else(|| "(none)".to_string())
    );
    let sidebar = if Preferences::new(app.store.as_ref()).sidebar_collapsed() {
        "collapsed"
    } else {
        "expanded"
    };
    println!("  Chat list: {}", sidebar);
}

async fn run_models(app: &App) -> Result<()> {
    let catalog = app.manager.refresh_models().await;
    render::print_models(&catalog, app.config.chat.model.as_deref());
    if catalog.models.is_empty() && catalog.error.is_some() {
        anyhow::bail!("No models available");
    }
    Ok(())
}

async fn run_sessions(app: &App) -> Result<()> {
    let sessions = app.manager.list_sessions().await?;
    render::print_sessions(&sessions, app.manager.cached_session_id().as_deref());
    Ok(())
}

async fn run_delete(app: &App, session_id: &str, yes: bool) -> Result<()> {
    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete chat {}?", session_id))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Delete cancelled.");
            return Ok(());
        }
    }
    app.manager.delete_session(session_id).await?;
    println!("{} {}", style("Deleted").green(), session_id);
    Ok(())
}

async fn run_send(
    app: &App,
    message: &str,
    image: Option<PathBuf>,
    model: Option<String>,
) -> Result<()> {
    app.ensure_model(model).await?;

    match app.manager.restore_on_load().await? {
        RestoreOutcome::Restored(id) => info!("Continuing chat session {}", id),
        RestoreOutcome::Created(id) => info!("Started chat session {}", id),
    }

    let image = match image {
        Some(path) => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Could not read {}", path.display()))?;
            Some(ImageAttachment::from_bytes(&bytes))
        }
        None => None,
    };

    match app.manager.send_message(message, image).await {
        Ok(reply) => {
            println!("{}", reply);
            Ok(())
        }
        Err(e) => {
            warn!("Send failed: {}", e);
            anyhow::bail!(e.user_message())
        }
    }
}
