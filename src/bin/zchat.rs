//! Interactive chat application for the Z.AI chat service.
//!
//! This binary provides a streaming REPL interface for chatting with GLM
//! models.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with default settings
//! zchat
//!
//! # Specify a model and start with web search on
//! zchat --model glm-4.7 --search
//!
//! # Read settings from a file, then override the system prompt
//! zchat --config zchat.yaml --system "You are a helpful coding assistant"
//!
//! # Disable colors (useful for piping output)
//! zchat --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/search`, `/thinking`, `/image`, `/preview` - Toggle features
//! - `/new` - Start a new conversation
//! - `/history` - Show the conversation so far
//! - `/exit` - Exit the application

use std::sync::{Arc, Mutex};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio_util::sync::CancellationToken;

use zchat::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, help_text,
    parse_command,
};
use zchat::utils::time;
use zchat::{JsonlLogger, KnownModel, Message, MessageKind, Model, Role, Toggles, ZaiClient};

/// Main entry point for the zchat application.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Must run while the process is still single-threaded.
    time::init_local_offset();
    tokio::runtime::Runtime::new()?.block_on(run())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("zchat [OPTIONS]");
    let config = ChatConfig::from_args(args)?;
    let mut renderer = PlainTextRenderer::with_color(config.use_color);

    let client = ZaiClient::with_options(None, config.base_url.as_deref(), config.timeout)?;
    let mut session = ChatSession::new(client, config.model.clone(), config.toggles)
        .with_system_prompt(config.system_prompt.clone());
    if let Some(path) = &config.log_file {
        session = session.with_logger(Arc::new(JsonlLogger::open(path)?));
    }
    if let Err(err) = session.initialize().await {
        renderer.print_error(&format!("Could not initialize session: {err}"));
    }

    let mut rl = DefaultEditor::new()?;

    // Token for the turn in flight; replaced before each turn.
    let cancel = Arc::new(Mutex::new(CancellationToken::new()));

    // Set up Ctrl+C handler
    let cancel_clone = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        if let Ok(token) = cancel_clone.lock() {
            token.cancel();
        }
    })?;

    println!("Z.AI Chat (model: {})", session.model());
    println!("{}", describe_toggles(&session.toggles()));
    println!("Type /help for commands, /exit to exit\n");

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands
                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Exit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Search(value) => {
                            let enabled = apply_toggle(
                                session.toggles_mut(),
                                value,
                                Toggles::set_web_search,
                                Toggles::toggle_web_search,
                            );
                            renderer.print_info(&format!("Web search {}.", on_off(enabled)));
                        }
                        ChatCommand::Thinking(value) => {
                            let enabled = apply_toggle(
                                session.toggles_mut(),
                                value,
                                Toggles::set_thinking,
                                Toggles::toggle_thinking,
                            );
                            renderer.print_info(&format!("Thinking {}.", on_off(enabled)));
                        }
                        ChatCommand::Image(value) => {
                            let enabled = apply_toggle(
                                session.toggles_mut(),
                                value,
                                Toggles::set_image_gen,
                                Toggles::toggle_image_gen,
                            );
                            renderer
                                .print_info(&format!("Image generation {}.", on_off(enabled)));
                        }
                        ChatCommand::Preview(value) => {
                            let enabled = apply_toggle(
                                session.toggles_mut(),
                                value,
                                Toggles::set_preview,
                                Toggles::toggle_preview,
                            );
                            renderer.print_info(&format!("Preview mode {}.", on_off(enabled)));
                        }
                        ChatCommand::New => {
                            session.reset();
                            renderer.print_info("Started a new conversation.");
                        }
                        ChatCommand::History => {
                            print_history(session.history());
                        }
                        ChatCommand::Model(model_name) => {
                            let model = Model::parse_or_custom(&model_name);
                            if let Model::Custom(_) = model {
                                renderer.print_warning(&format!(
                                    "{model_name} is not one of {}",
                                    known_models()
                                ));
                            }
                            session.set_model(model);
                            renderer.print_info(&format!("Model changed to: {}", session.model()));
                        }
                        ChatCommand::System(prompt) => {
                            session.set_system_prompt(prompt.clone());
                            match prompt {
                                Some(p) => {
                                    renderer.print_info(&format!("System prompt set to: {}", p))
                                }
                                None => renderer.print_info("System prompt cleared."),
                            }
                            if !session.history().is_empty() {
                                renderer.print_info("Use /new to apply it to a new conversation.");
                            }
                        }
                        ChatCommand::Status => {
                            print_stats(&session);
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message - send upstream
                let token = CancellationToken::new();
                if let Ok(mut current) = cancel.lock() {
                    *current = token.clone();
                }
                println!("GLM:");
                if let Err(e) = session.chat(line, &mut renderer, &token).await {
                    renderer.print_error(&e.to_string());
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn apply_toggle(
    toggles: &mut Toggles,
    value: Option<bool>,
    set: fn(&mut Toggles, bool),
    flip: fn(&mut Toggles) -> bool,
) -> bool {
    match value {
        Some(enabled) => {
            set(toggles, enabled);
            enabled
        }
        None => flip(toggles),
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

fn known_models() -> String {
    KnownModel::ALL
        .iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_toggles(toggles: &Toggles) -> String {
    format!(
        "search: {}  thinking: {}  image: {}  preview: {}",
        on_off(toggles.use_web_search),
        on_off(toggles.use_thinking),
        on_off(toggles.use_image_gen),
        on_off(toggles.preview)
    )
}

fn print_history(history: &[Message]) {
    if history.is_empty() {
        println!("    (no messages)");
        return;
    }
    for message in history {
        let label = match message.role {
            Role::User => "You",
            Role::Assistant => "GLM",
            Role::System => "System",
        };
        println!("    [{}] {}:", message.ordinal, label);
        if let Some(thinking) = &message.thinking {
            println!("      (thinking) {}", thinking);
        }
        if message.kind == Some(MessageKind::Thinking) {
            println!("      (no answer text)");
        }
        for line in message.content.lines() {
            println!("      {}", line);
        }
    }
}

fn print_stats(session: &ChatSession<ZaiClient>) {
    let stats = session.stats();
    println!("    Session Status:");
    println!("      Model: {}", stats.model);
    println!("      Toggles: {}", describe_toggles(&stats.toggles));
    println!("      Messages: {}", stats.message_count);
    println!("      Turns: {}", stats.turns);
    if let Some(prompt) = stats.system_prompt.as_deref() {
        println!("      System prompt: {}", prompt);
    } else {
        println!("      System prompt: (none)");
    }
    println!(
        "      Requests: {} ({} failed turns, {} interrupted)",
        stats.total_requests, stats.failed_turns, stats.interrupted_turns
    );
    println!("      Endpoint: {}", session.transport().base_url());
}
