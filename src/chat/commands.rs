//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the service.

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the service.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Set web search; `None` flips the current value.
    Search(Option<bool>),

    /// Set thinking; `None` flips the current value.
    Thinking(Option<bool>),

    /// Set image generation; `None` flips the current value.
    Image(Option<bool>),

    /// Set preview mode; `None` flips the current value.
    Preview(Option<bool>),

    /// Start a new conversation.
    New,

    /// Print the conversation history.
    History,

    /// Change the model.
    Model(String),

    /// Set or clear the system prompt.
    /// `None` clears the current system prompt.
    System(Option<String>),

    /// Show the current toggles and session statistics.
    Status,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Exit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a valid command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use zchat::chat::{ChatCommand, parse_command};
/// assert_eq!(parse_command("/exit"), Some(ChatCommand::Exit));
/// assert_eq!(parse_command("/search on"), Some(ChatCommand::Search(Some(true))));
/// assert!(parse_command("Hello!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "search" => parse_toggle(argument, ChatCommand::Search, "/search"),
        "thinking" | "think" => parse_toggle(argument, ChatCommand::Thinking, "/thinking"),
        "image" => parse_toggle(argument, ChatCommand::Image, "/image"),
        "preview" => parse_toggle(argument, ChatCommand::Preview, "/preview"),
        "new" | "clear" => ChatCommand::New,
        "history" => ChatCommand::History,
        "model" => match argument {
            Some(model) => ChatCommand::Model(model.to_string()),
            None => ChatCommand::Invalid("/model requires a model name".to_string()),
        },
        "system" => ChatCommand::System(argument.map(|s| s.to_string())),
        "status" | "stats" => ChatCommand::Status,
        "help" | "?" => ChatCommand::Help,
        "exit" | "quit" | "q" => ChatCommand::Exit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn parse_toggle<F>(argument: Option<&str>, constructor: F, name: &str) -> ChatCommand
where
    F: Fn(Option<bool>) -> ChatCommand,
{
    match argument {
        None => constructor(None),
        Some(arg) => match parse_on_off(arg) {
            Some(value) => constructor(Some(value)),
            None => ChatCommand::Invalid(format!("{name} expects 'on', 'off', or nothing")),
        },
    }
}

fn parse_on_off(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /search [on|off]       Toggle web search
  /thinking [on|off]     Toggle thinking output
  /image [on|off]        Toggle image generation (notices only)
  /preview [on|off]      Toggle preview mode
  /new                   Start a new conversation
  /history               Show the conversation so far
  /model <name>          Change the model (glm-5, glm-4.7, glm-4.5)
  /system [prompt]       Set system prompt (no argument clears it)
  /status                Show toggles and session statistics
  /help                  Show this help message
  /exit                  Exit the chat"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_exit_commands() {
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Exit));
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Exit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Exit));
        assert_eq!(parse_command("  /exit  "), Some(ChatCommand::Exit));
    }

    #[test]
    fn parse_toggles() {
        assert_eq!(parse_command("/search"), Some(ChatCommand::Search(None)));
        assert_eq!(
            parse_command("/search on"),
            Some(ChatCommand::Search(Some(true)))
        );
        assert_eq!(
            parse_command("/THINKING off"),
            Some(ChatCommand::Thinking(Some(false)))
        );
        assert_eq!(parse_command("/image"), Some(ChatCommand::Image(None)));
        assert_eq!(
            parse_command("/preview yes"),
            Some(ChatCommand::Preview(Some(true)))
        );
        assert!(matches!(
            parse_command("/search maybe"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("expects")
        ));
    }

    #[test]
    fn parse_session_commands() {
        assert_eq!(parse_command("/new"), Some(ChatCommand::New));
        assert_eq!(parse_command("/history"), Some(ChatCommand::History));
        assert_eq!(parse_command("/status"), Some(ChatCommand::Status));
        assert_eq!(parse_command("/help"), Some(ChatCommand::Help));
    }

    #[test]
    fn parse_model() {
        assert_eq!(
            parse_command("/model   glm-4.7  "),
            Some(ChatCommand::Model("glm-4.7".to_string()))
        );
        assert_eq!(
            parse_command("/model"),
            Some(ChatCommand::Invalid(
                "/model requires a model name".to_string()
            ))
        );
    }

    #[test]
    fn parse_system() {
        assert_eq!(
            parse_command("/system You are a pirate"),
            Some(ChatCommand::System(Some("You are a pirate".to_string())))
        );
        assert_eq!(parse_command("/system"), Some(ChatCommand::System(None)));
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            parse_command("/upload file.txt"),
            Some(ChatCommand::Invalid("Unknown command: /upload".to_string()))
        );
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Hello, GLM!"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
    }

    #[test]
    fn help_text_lists_commands() {
        let help = help_text();
        for command in ["/search", "/thinking", "/image", "/preview", "/new", "/history", "/exit"] {
            assert!(help.contains(command), "missing {command}");
        }
    }
}
