//! Chat application module for interactive conversations with GLM models.
//!
//! This module provides a streaming REPL chat interface built on top of the
//! zchat client library. It supports:
//!
//! - Streaming responses with real-time token display
//! - ANSI-styled output for thinking text and notices
//! - Slash commands for toggles and session control
//! - Configuration from a YAML file and command-line flags
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: The per-turn state machine and upstream interaction
//! - [`commands`]: Slash command parsing

mod commands;
mod config;
mod session;

pub use crate::render::{BufferRenderer, PlainTextRenderer, Rendered, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, FileConfig};
pub use session::{ChatSession, SessionStats, SharedSession, TurnOutcome, TurnState};
