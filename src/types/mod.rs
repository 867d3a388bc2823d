// Public modules
pub mod message;
pub mod model;
pub mod request;
pub mod stream_event;
pub mod toggles;

// Re-exports
pub use message::{Message, MessageKind, Role};
pub use model::{KnownModel, Model, UnknownModel};
pub use request::{BackgroundTasks, ChatRequest, Features, WireMessage, fold_system_prompt};
pub use stream_event::{ImageEvent, SearchEvent, SearchResult, StreamEvent};
pub use toggles::Toggles;
