// Public modules
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod conversation;
pub mod error;
pub mod observability;
pub mod render;
pub mod sse;
pub mod types;
pub mod utils;

// Re-exports
pub use client::{ByteStream, TOKEN_ENV_VAR, Transport, ZaiClient};
pub use client_logger::{ClientLogger, JsonlLogger};
pub use conversation::Conversation;
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use render::{BufferRenderer, PlainTextRenderer, Rendered, Renderer};
pub use sse::{RecordDecoder, decode_stream};
pub use types::*;
