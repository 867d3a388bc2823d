use serde::{Deserialize, Serialize};

/// Feature flags consulted when a turn's request is built.
///
/// A session hands each turn a copy of its toggles, so changing a flag only
/// affects the next `chat` call.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Toggles {
    /// Let the upstream search the web before answering.
    pub use_web_search: bool,

    /// Ask for and display chain-of-thought content.
    pub use_thinking: bool,

    /// Let the upstream generate images.
    pub use_image_gen: bool,

    /// Upstream preview mode.
    pub preview: bool,
}

impl Toggles {
    /// Search off, thinking on, image generation off, preview off.
    pub fn new() -> Self {
        Self {
            use_web_search: false,
            use_thinking: true,
            use_image_gen: false,
            preview: false,
        }
    }

    /// Sets web search.
    pub fn set_web_search(&mut self, enabled: bool) {
        self.use_web_search = enabled;
    }

    /// Sets thinking.
    pub fn set_thinking(&mut self, enabled: bool) {
        self.use_thinking = enabled;
    }

    /// Sets image generation.
    pub fn set_image_gen(&mut self, enabled: bool) {
        self.use_image_gen = enabled;
    }

    /// Sets preview mode.
    pub fn set_preview(&mut self, enabled: bool) {
        self.preview = enabled;
    }

    /// Flips web search and returns the new value.
    pub fn toggle_web_search(&mut self) -> bool {
        self.use_web_search = !self.use_web_search;
        self.use_web_search
    }

    /// Flips thinking and returns the new value.
    pub fn toggle_thinking(&mut self) -> bool {
        self.use_thinking = !self.use_thinking;
        self.use_thinking
    }

    /// Flips image generation and returns the new value.
    pub fn toggle_image_gen(&mut self) -> bool {
        self.use_image_gen = !self.use_image_gen;
        self.use_image_gen
    }

    /// Flips preview mode and returns the new value.
    pub fn toggle_preview(&mut self) -> bool {
        self.preview = !self.preview;
        self.preview
    }
}

impl Default for Toggles {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let toggles = Toggles::default();
        assert!(!toggles.use_web_search);
        assert!(toggles.use_thinking);
        assert!(!toggles.use_image_gen);
        assert!(!toggles.preview);
    }

    #[test]
    fn toggle_returns_new_value() {
        let mut toggles = Toggles::new();
        assert!(toggles.toggle_web_search());
        assert!(!toggles.toggle_thinking());
        assert!(toggles.toggle_image_gen());
        assert!(toggles.toggle_preview());
        assert!(!toggles.toggle_web_search());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let toggles: Toggles = serde_yaml::from_str("use_web_search: true\n").unwrap();
        assert!(toggles.use_web_search);
        assert!(toggles.use_thinking);
    }
}
