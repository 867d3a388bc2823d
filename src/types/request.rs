use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::types::{Message, Model, Role, Toggles};

/// Prefix placed before system instructions folded into a user message.
const SYSTEM_PREFIX: &str = "[System instructions]";

/// A role/content pair as the upstream expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    /// The role of the message.
    pub role: Role,

    /// The content of the message.
    pub content: String,
}

impl WireMessage {
    /// Create a new `WireMessage`.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self::new(message.role, message.content.clone())
    }
}

/// Feature switches sent with every completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Features {
    /// Enable image generation.
    pub image_generation: bool,

    /// Enable web search.
    pub web_search: bool,

    /// Let the model decide when to search.
    pub auto_web_search: bool,

    /// Enable preview mode.
    pub preview_mode: bool,

    /// Reserved upstream flags.
    pub flags: Vec<String>,

    /// Emit chain-of-thought content.
    pub enable_thinking: bool,
}

impl From<Toggles> for Features {
    fn from(toggles: Toggles) -> Self {
        Self {
            image_generation: toggles.use_image_gen,
            web_search: toggles.use_web_search,
            auto_web_search: toggles.use_web_search,
            preview_mode: toggles.preview,
            flags: Vec::new(),
            enable_thinking: toggles.use_thinking,
        }
    }
}

/// Background work the upstream may run after answering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundTasks {
    /// Generate a conversation title.
    pub title_generation: bool,

    /// Generate conversation tags.
    pub tags_generation: bool,
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self {
            title_generation: true,
            tags_generation: true,
        }
    }
}

/// The payload of one streaming completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The model to answer with.
    pub model: Model,

    /// Fresh identifier for this request.
    pub chat_id: String,

    /// Conversation so far, system instructions folded in.
    pub messages: Vec<WireMessage>,

    /// The newest user prompt.
    pub signature_prompt: String,

    /// Always true; the client only speaks the streaming protocol.
    pub stream: bool,

    /// Sampling parameters; left empty.
    pub params: Map<String, Value>,

    /// Reserved.
    pub extra: Map<String, Value>,

    /// Feature switches derived from the turn's toggles.
    pub features: Features,

    /// Values for the upstream's prompt template variables.
    pub variables: BTreeMap<String, String>,

    /// Background work requested from the upstream.
    pub background_tasks: BackgroundTasks,
}

impl ChatRequest {
    /// Builds a request from conversation history ending with the new prompt.
    pub fn new(
        model: Model,
        history: &[Message],
        toggles: Toggles,
        variables: BTreeMap<String, String>,
    ) -> Self {
        let signature_prompt = history
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let messages = fold_system_prompt(history.iter().map(WireMessage::from).collect());
        Self {
            model,
            chat_id: Uuid::new_v4().to_string(),
            messages,
            signature_prompt,
            stream: true,
            params: Map::new(),
            extra: Map::new(),
            features: Features::from(toggles),
            variables,
            background_tasks: BackgroundTasks::default(),
        }
    }
}

/// Moves system messages into the first user message.
///
/// The upstream may ignore `role=system`, so the instructions are joined and
/// prepended to the first user message instead.  With no user message, a
/// user message holding only the instructions is inserted first.
pub fn fold_system_prompt(messages: Vec<WireMessage>) -> Vec<WireMessage> {
    let (system, rest): (Vec<_>, Vec<_>) = messages
        .into_iter()
        .partition(|m| m.role == Role::System);
    if system.is_empty() {
        return rest;
    }
    let block = system
        .into_iter()
        .map(|m| m.content)
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut injected = false;
    let mut folded = Vec::with_capacity(rest.len() + 1);
    for message in rest {
        if message.role == Role::User && !injected {
            folded.push(WireMessage::new(
                Role::User,
                format!("{SYSTEM_PREFIX}\n{block}\n\n{}", message.content),
            ));
            injected = true;
        } else {
            folded.push(message);
        }
    }
    if !injected {
        folded.insert(
            0,
            WireMessage::new(Role::User, format!("{SYSTEM_PREFIX}\n{block}")),
        );
    }
    folded
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn fold_into_first_user() {
        let folded = fold_system_prompt(vec![
            WireMessage::new(Role::System, "You are a pirate"),
            WireMessage::new(Role::User, "Hello"),
            WireMessage::new(Role::Assistant, "Arr"),
            WireMessage::new(Role::User, "Again"),
        ]);
        assert_eq!(
            folded,
            vec![
                WireMessage::new(Role::User, "[System instructions]\nYou are a pirate\n\nHello"),
                WireMessage::new(Role::Assistant, "Arr"),
                WireMessage::new(Role::User, "Again"),
            ]
        );
    }

    #[test]
    fn fold_joins_multiple_system_messages() {
        let folded = fold_system_prompt(vec![
            WireMessage::new(Role::System, "One"),
            WireMessage::new(Role::System, "Two"),
        ]);
        assert_eq!(
            folded,
            vec![WireMessage::new(
                Role::User,
                "[System instructions]\nOne\n\nTwo"
            )]
        );
    }

    #[test]
    fn fold_without_system_is_identity() {
        let messages = vec![WireMessage::new(Role::User, "Hi")];
        assert_eq!(fold_system_prompt(messages.clone()), messages);
    }

    #[test]
    fn request_reflects_toggles() {
        let history = vec![Message::user("Hello! Who are you?", 0)];
        let toggles = Toggles {
            use_web_search: true,
            use_thinking: false,
            use_image_gen: false,
            preview: true,
        };
        let request = ChatRequest::new(Model::default(), &history, toggles, BTreeMap::new());
        let json = to_value(&request).unwrap();
        assert_eq!(json["model"], json!("glm-5"));
        assert_eq!(json["stream"], json!(true));
        assert_eq!(json["signature_prompt"], json!("Hello! Who are you?"));
        assert_eq!(
            json["features"],
            json!({
                "image_generation": false,
                "web_search": true,
                "auto_web_search": true,
                "preview_mode": true,
                "flags": [],
                "enable_thinking": false
            })
        );
        assert_eq!(
            json["messages"],
            json!([{"role": "user", "content": "Hello! Who are you?"}])
        );
        assert!(Uuid::parse_str(&request.chat_id).is_ok());
    }
}
