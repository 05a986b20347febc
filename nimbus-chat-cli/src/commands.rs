//! Interactive chat input parsing

use std::path::PathBuf;

/// One line of interactive input, mapped to a session manager operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Plain text: send it
    Send(String),
    New,
    Sessions,
    Open(String),
    Delete(String),
    Clear,
    Models,
    Model(String),
    /// Attach an image to the next message
    Image(PathBuf),
    Sidebar,
    Help,
    Quit,
    Empty,
    /// Recognized command with bad arguments, or an unknown command
    Invalid(String),
}

pub const HELP: &str = "\
Commands:
  /new              start a new chat
  /sessions         list chats, most recent first
  /open <id>        switch to a chat
  /delete <id>      delete a chat
  /clear            forget the current chat locally
  /models           list available models
  /model <id>       use a model for the next messages
  /image <path>     attach an image to the next message (empty line sends it alone)
  /sidebar          toggle the chat list shown after each reply
  /help             show this help
  /quit             leave
Anything else is sent as a message.";

pub fn parse(line: &str) -> ChatCommand {
    let line = line.trim();
    if line.is_empty() {
        return ChatCommand::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return ChatCommand::Send(line.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let with_arg = |usage: &str, build: fn(String) -> ChatCommand| {
        if arg.is_empty() {
            ChatCommand::Invalid(format!("usage: {}", usage))
        } else {
            build(arg.to_string())
        }
    };

    match name.to_ascii_lowercase().as_str() {
        "new" => ChatCommand::New,
        "sessions" | "list" => ChatCommand::Sessions,
        "open" | "load" => with_arg("/open <session-id>", ChatCommand::Open),
        "delete" | "rm" => with_arg("/delete <session-id>", ChatCommand::Delete),
        "clear" => ChatCommand::Clear,
        "models" => ChatCommand::Models,
        "model" => with_arg("/model <model-id>", ChatCommand::Model),
        "image" => with_arg("/image <path>", |p| ChatCommand::Image(PathBuf::from(p))),
        "sidebar" => ChatCommand::Sidebar,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        other => ChatCommand::Invalid(format!("unknown command /{} (try /help)", other)),
    }
}

/// An empty line sends the pending attachment on its own
pub fn with_attachment(command: ChatCommand, has_attachment: bool) -> ChatCommand {
    match command {
        ChatCommand::Empty if has_attachment => ChatCommand::Send(String::new()),
        other => other,
    }
}
