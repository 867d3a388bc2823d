//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg`, an optional YAML
//! configuration file, and the resolved [`ChatConfig`] a session runs with.
//! Command-line flags take precedence over the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Model, Toggles};

/// Command-line arguments for the zchat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: glm-5)", "MODEL")]
    pub model: Option<String>,

    /// System prompt to set context for the conversation.
    #[arrrg(optional, "System prompt for the conversation", "PROMPT")]
    pub system: Option<String>,

    /// Base URL of the chat service.
    #[arrrg(optional, "Base URL of the chat service", "URL")]
    pub base_url: Option<String>,

    /// YAML configuration file.
    #[arrrg(optional, "YAML configuration file", "FILE")]
    pub config: Option<String>,

    /// File to append JSON-lines session logs to.
    #[arrrg(optional, "Append session logs to this file", "FILE")]
    pub log_file: Option<String>,

    /// Start with web search enabled.
    #[arrrg(flag, "Enable web search")]
    pub search: bool,

    /// Start with thinking disabled.
    #[arrrg(flag, "Disable thinking output")]
    pub no_thinking: bool,

    /// Start with image generation enabled.
    #[arrrg(flag, "Enable image generation")]
    pub image: bool,

    /// Start in preview mode.
    #[arrrg(flag, "Enable preview mode")]
    pub preview: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// The on-disk configuration file.
///
/// ```yaml
/// model: glm-4.7
/// system: You are terse.
/// timeout_secs: 90
/// toggles:
///   use_web_search: true
/// ```
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Model to use.
    pub model: Option<String>,

    /// System prompt.
    pub system: Option<String>,

    /// Base URL of the chat service.
    pub base_url: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,

    /// Initial feature toggles.
    pub toggles: Toggles,

    /// Whether to use ANSI colors.
    pub use_color: Option<bool>,

    /// JSON-lines log file.
    pub log_file: Option<PathBuf>,
}

impl FileConfig {
    /// Reads and parses a YAML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|err| {
            Error::io(format!("failed to read config {}", path.display()), err)
        })?;
        Ok(serde_yaml::from_str(&content)?)
    }
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// the configuration file and command-line arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// The model to use for generating responses.
    pub model: Model,

    /// Optional system prompt to set conversation context.
    pub system_prompt: Option<String>,

    /// Base URL override for the chat service.
    pub base_url: Option<String>,

    /// Request timeout override.
    pub timeout: Option<Duration>,

    /// Feature toggles the session starts with.
    pub toggles: Toggles,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Where to write JSON-lines session logs.
    pub log_file: Option<PathBuf>,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: glm-5
    /// - Toggles: search off, thinking on, image off, preview off
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: Model::default(),
            system_prompt: None,
            base_url: None,
            timeout: None,
            toggles: Toggles::default(),
            use_color: true,
            log_file: None,
        }
    }

    /// Resolves command-line arguments, reading `--config` first if given.
    pub fn from_args(args: ChatArgs) -> Result<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::from_file_config(file).apply_args(args))
    }

    /// Builds a configuration from a parsed file.
    pub fn from_file_config(file: FileConfig) -> Self {
        let defaults = Self::new();
        Self {
            model: file
                .model
                .as_deref()
                .map(Model::parse_or_custom)
                .unwrap_or(defaults.model),
            system_prompt: file.system,
            base_url: file.base_url,
            timeout: file.timeout_secs.map(Duration::from_secs),
            toggles: file.toggles,
            use_color: file.use_color.unwrap_or(defaults.use_color),
            log_file: file.log_file,
        }
    }

    fn apply_args(mut self, args: ChatArgs) -> Self {
        if let Some(model) = args.model {
            self.model = Model::parse_or_custom(&model);
        }
        if args.system.is_some() {
            self.system_prompt = args.system;
        }
        if args.base_url.is_some() {
            self.base_url = args.base_url;
        }
        if let Some(log_file) = args.log_file {
            self.log_file = Some(PathBuf::from(log_file));
        }
        if args.search {
            self.toggles.use_web_search = true;
        }
        if args.no_thinking {
            self.toggles.use_thinking = false;
        }
        if args.image {
            self.toggles.use_image_gen = true;
        }
        if args.preview {
            self.toggles.preview = true;
        }
        if args.no_color {
            self.use_color = false;
        }
        self
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, prompt: String) -> Self {
        self.system_prompt = Some(prompt);
        self
    }

    /// Sets the initial toggles.
    pub fn with_toggles(mut self, toggles: Toggles) -> Self {
        self.toggles = toggles;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KnownModel;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert_eq!(config.model, Model::Known(KnownModel::Glm5));
        assert!(config.use_color);
        assert!(config.system_prompt.is_none());
        assert_eq!(config.toggles, Toggles::default());
        assert!(config.log_file.is_none());
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::from_args(ChatArgs::default()).unwrap();
        assert_eq!(config, ChatConfig::new());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            model: Some("glm-4.5".to_string()),
            system: Some("You are helpful.".to_string()),
            search: true,
            no_thinking: true,
            no_color: true,
            ..ChatArgs::default()
        };
        let config = ChatConfig::from_args(args).unwrap();
        assert_eq!(config.model, Model::Known(KnownModel::Glm45));
        assert_eq!(config.system_prompt, Some("You are helpful.".to_string()));
        assert!(config.toggles.use_web_search);
        assert!(!config.toggles.use_thinking);
        assert!(!config.use_color);
    }

    #[test]
    fn yaml_file_then_flags() {
        let file: FileConfig = serde_yaml::from_str(
            "model: glm-4.7\nsystem: Be terse.\ntimeout_secs: 90\ntoggles:\n  use_web_search: true\n  use_thinking: false\n",
        )
        .unwrap();
        let config = ChatConfig::from_file_config(file);
        assert_eq!(config.model, Model::Known(KnownModel::Glm47));
        assert_eq!(config.timeout, Some(Duration::from_secs(90)));
        assert!(config.toggles.use_web_search);
        assert!(!config.toggles.use_thinking);

        let config = config.apply_args(ChatArgs {
            model: Some("glm-next".to_string()),
            image: true,
            ..ChatArgs::default()
        });
        assert_eq!(config.model, Model::Custom("glm-next".to_string()));
        assert_eq!(config.system_prompt.as_deref(), Some("Be terse."));
        assert!(config.toggles.use_image_gen);
    }

    #[test]
    fn unknown_file_keys_rejected() {
        assert!(serde_yaml::from_str::<FileConfig>("modle: glm-5\n").is_err());
    }

    #[test]
    fn missing_config_file() {
        let err = FileConfig::from_file("/nonexistent/zchat.yaml").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
