use std::fmt;

use serde::{Deserialize, Serialize};

/// A single web search hit reported by the upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Page title, when provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Page URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Progress of an upstream web search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchEvent {
    /// The upstream started searching for this query.
    Query {
        /// The search query.
        query: String,
    },

    /// The upstream received search results.
    Results {
        /// The search hits.
        results: Vec<SearchResult>,
    },
}

/// Progress of an upstream image generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageEvent {
    /// The upstream is generating an image for this prompt.
    Prompt {
        /// The image prompt.
        prompt: String,
    },

    /// A generated image is available at this URL.
    Url {
        /// The image URL.
        url: String,
    },
}

/// An event decoded from the upstream response stream.
///
/// Events are transient: they are produced and consumed within one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A fragment of answer text.
    TextDelta(String),

    /// A fragment of chain-of-thought text.
    ThinkingDelta(String),

    /// Web search progress.
    Search(SearchEvent),

    /// Image generation progress.
    Image(ImageEvent),

    /// The upstream finished the response.
    Done,

    /// A record could not be decoded or reported an upstream error.
    Error(String),
}

impl StreamEvent {
    /// Returns true for the end-of-stream event.
    pub fn is_done(&self) -> bool {
        matches!(self, StreamEvent::Done)
    }
}

impl fmt::Display for SearchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchEvent::Query { query } => write!(f, "searching the web for \"{query}\""),
            SearchEvent::Results { results } => {
                write!(f, "found {} search result", results.len())?;
                if results.len() != 1 {
                    write!(f, "s")?;
                }
                for result in results {
                    match (&result.title, &result.url) {
                        (Some(title), Some(url)) => write!(f, "\n  - {title} <{url}>")?,
                        (Some(title), None) => write!(f, "\n  - {title}")?,
                        (None, Some(url)) => write!(f, "\n  - <{url}>")?,
                        (None, None) => {}
                    }
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for ImageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageEvent::Prompt { prompt } => write!(f, "generating image: {prompt}"),
            ImageEvent::Url { url } => write!(f, "image available at {url}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn search_notice_lists_results() {
        let event = SearchEvent::Results {
            results: vec![
                SearchResult {
                    title: Some("Python".to_string()),
                    url: Some("https://python.org".to_string()),
                },
                SearchResult {
                    title: None,
                    url: Some("https://docs.python.org".to_string()),
                },
            ],
        };
        assert_eq!(
            event.to_string(),
            "found 2 search results\n  - Python <https://python.org>\n  - <https://docs.python.org>"
        );
    }

    #[test]
    fn event_serialization() {
        let json = to_value(StreamEvent::TextDelta("hi".to_string())).unwrap();
        assert_eq!(json, json!({"type": "text_delta", "data": "hi"}));
        let json = to_value(StreamEvent::Done).unwrap();
        assert_eq!(json, json!({"type": "done"}));
    }
}
