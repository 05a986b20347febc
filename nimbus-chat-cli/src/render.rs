//! Terminal rendering of conversation events and session lists

use chrono::{DateTime, Utc};
use console::style;
use nimbus_chat_core::models::ModelCatalog;
use nimbus_chat_core::session::{ChatEvent, ChatMessage, Role, SessionSummary};
use nimbus_chat_core::utils::{time_ago, truncate};

const TITLE_WIDTH: usize = 40;

pub fn print_event(event: &ChatEvent) {
    match event {
        ChatEvent::MessageAppended(message) if message.role == Role::Assistant => {
            println!("{}", format_message(message));
        }
        ChatEvent::HistoryReplaced { messages, .. } => print_history(messages),
        ChatEvent::ConversationCleared => {
            println!("{}", style("Start a conversation by typing a message below").dim());
        }
        ChatEvent::SessionChanged(Some(id)) => {
            println!("{}", style(format!("[chat {}]", id)).dim());
        }
        ChatEvent::Notice(text) => println!("{}", style(text).red()),
        // user messages are already on screen; list refreshes are pulled by the caller
        _ => {}
    }
}

pub fn print_history(messages: &[ChatMessage]) {
    if messages.is_empty() {
        println!("{}", style("No messages yet").dim());
    }
    for message in messages {
        println!("{}", format_message(message));
    }
}

pub fn format_message(message: &ChatMessage) -> String {
    match message.role {
        Role::User => format!("{} {}", style("you ›").cyan().bold(), message.content),
        Role::Assistant => format!("{} {}", style("ai  ›").green().bold(), message.content),
    }
}

/// `* Title · 4 · 5m ago  <id>`, starred when current
pub fn format_session_line(
    session: &SessionSummary,
    current: Option<&str>,
    now: DateTime<Utc>,
) -> String {
    let marker = if current == Some(session.session_id.as_str()) {
        "*"
    } else {
        " "
    };
    let age = session
        .updated_at
        .map(|ts| time_ago(ts, now))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{} {} · {} · {}  {}",
        marker,
        truncate(session.display_title(), TITLE_WIDTH),
        session.message_count,
        age,
        session.session_id
    )
}

pub fn print_sessions(sessions: &[SessionSummary], current: Option<&str>) {
    if sessions.is_empty() {
        println!("{}", style("No chat history yet").dim());
        return;
    }
    let now = Utc::now();
    for session in sessions {
        let line = format_session_line(session, current, now);
        if current == Some(session.session_id.as_str()) {
            println!("{}", style(line).bold());
        } else {
            println!("{}", line);
        }
    }
}

pub fn print_models(catalog: &ModelCatalog, selected: Option<&str>) {
    if let Some(error) = &catalog.error {
        println!("{}", style(format!("Error fetching models: {}", error)).red());
    }
    for model in &catalog.models {
        if selected == Some(model.as_str()) {
            println!("* {}", style(model).bold());
        } else {
            println!("  {}", model);
        }
    }
}

pub fn print_error(message: &str) {
    eprintln!("{}", style(message).red());
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn summary(id: &str, title: Option<&str>, age: Option<Duration>, now: DateTime<Utc>) -> SessionSummary {
        SessionSummary {
            session_id: id.to_string(),
            title: title.map(str::to_string),
            message_count: 4,
            created_at: None,
            updated_at: age.map(|a| now - a),
        }
    }

    #[test]
    fn test_current_session_is_starred() {
        console::set_colors_enabled(false);
        let now = Utc::now();
        let s = summary("abc", Some("Rust questions"), Some(Duration::minutes(5)), now);
        assert_eq!(
            format_session_line(&s, Some("abc"), now),
            "* Rust questions · 4 · 5m ago  abc"
        );
        assert_eq!(
            format_session_line(&s, Some("other"), now),
            "  Rust questions · 4 · 5m ago  abc"
        );
    }

    #[test]
    fn test_untitled_and_undated_sessions() {
        let now = Utc::now();
        let s = summary("xyz", None, None, now);
        assert_eq!(format_session_line(&s, None, now), "  New Chat · 4 · -  xyz");
    }

    #[test]
    fn test_message_prefix_by_role() {
        console::set_colors_enabled(false);
        assert_eq!(format_message(&ChatMessage::user("hi")), "you › hi");
        assert_eq!(format_message(&ChatMessage::assistant("hello")), "ai  › hello");
    }
}
