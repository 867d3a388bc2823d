//! Output rendering for streamed chat turns.
//!
//! A [`Renderer`] is the sink a session forwards incremental output to.  The
//! default implementation writes to stdout with ANSI escape codes that style
//! thinking text and notices differently from the answer.

use std::io::{self, Stdout, Write};

/// ANSI escape code for dim text (used for thinking blocks).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for italic text (used for thinking blocks).
const ANSI_ITALIC: &str = "\x1b[3m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for search and image notices).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for warnings).
const ANSI_YELLOW: &str = "\x1b[33m";

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
/// - In-memory capture for tests or embedding
pub trait Renderer: Send {
    /// Print a chunk of answer text.
    ///
    /// This is called incrementally as deltas are decoded.
    fn print_text(&mut self, text: &str);

    /// Print a chunk of thinking text.
    fn print_thinking(&mut self, text: &str);

    /// Print a notice about upstream activity such as a web search.
    fn print_notice(&mut self, notice: &str);

    /// Print a recoverable problem, such as an undecodable record.
    fn print_warning(&mut self, warning: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Called when a response is complete.
    ///
    /// Used to ensure proper newlines and cleanup after streaming.
    fn finish_response(&mut self);

    /// Called when the stream is interrupted by the user.
    fn print_interrupted(&mut self);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    in_thinking: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            in_thinking: false,
        }
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn reset_thinking(&mut self) {
        if self.in_thinking {
            if self.use_color {
                print!("{ANSI_RESET}");
            }
            println!();
            self.in_thinking = false;
        }
    }

    fn styled_line(&mut self, color: &str, label: &str, text: &str) {
        self.reset_thinking();
        if self.use_color {
            println!("\n{color}[{label}]{ANSI_RESET} {text}");
        } else {
            println!("\n[{label}] {text}");
        }
        self.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_text(&mut self, text: &str) {
        self.reset_thinking();
        print!("{text}");
        self.flush();
    }

    fn print_thinking(&mut self, text: &str) {
        if !self.in_thinking {
            if self.use_color {
                print!("{ANSI_DIM}{ANSI_ITALIC}");
            } else {
                print!("[thinking] ");
            }
            self.in_thinking = true;
        }
        print!("{text}");
        self.flush();
    }

    fn print_notice(&mut self, notice: &str) {
        self.styled_line(ANSI_CYAN, "info", notice);
    }

    fn print_warning(&mut self, warning: &str) {
        self.styled_line(ANSI_YELLOW, "warning", warning);
    }

    fn print_error(&mut self, error: &str) {
        self.reset_thinking();
        eprintln!("\nError: {error}");
    }

    fn print_info(&mut self, info: &str) {
        self.reset_thinking();
        println!("{info}");
    }

    fn finish_response(&mut self) {
        self.reset_thinking();
        println!();
        self.flush();
    }

    fn print_interrupted(&mut self) {
        self.reset_thinking();
        println!("\n[interrupted]");
        self.flush();
    }
}

/// One piece of output captured by [`BufferRenderer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// Answer text.
    Text(String),
    /// Thinking text.
    Thinking(String),
    /// A notice.
    Notice(String),
    /// A warning.
    Warning(String),
    /// An error.
    Error(String),
    /// An informational message.
    Info(String),
    /// End of a response.
    Finished,
    /// The turn was interrupted.
    Interrupted,
}

/// Renderer that records everything in memory.
#[derive(Debug, Default, Clone)]
pub struct BufferRenderer {
    /// Everything rendered so far, in order.
    pub output: Vec<Rendered>,
}

impl BufferRenderer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Concatenated answer text.
    pub fn text(&self) -> String {
        self.output
            .iter()
            .filter_map(|r| match r {
                Rendered::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Concatenated thinking text.
    pub fn thinking(&self) -> String {
        self.output
            .iter()
            .filter_map(|r| match r {
                Rendered::Thinking(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Notices and warnings, in order.
    pub fn notices(&self) -> Vec<&str> {
        self.output
            .iter()
            .filter_map(|r| match r {
                Rendered::Notice(n) | Rendered::Warning(n) => Some(n.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Renderer for BufferRenderer {
    fn print_text(&mut self, text: &str) {
        self.output.push(Rendered::Text(text.to_string()));
    }

    fn print_thinking(&mut self, text: &str) {
        self.output.push(Rendered::Thinking(text.to_string()));
    }

    fn print_notice(&mut self, notice: &str) {
        self.output.push(Rendered::Notice(notice.to_string()));
    }

    fn print_warning(&mut self, warning: &str) {
        self.output.push(Rendered::Warning(warning.to_string()));
    }

    fn print_error(&mut self, error: &str) {
        self.output.push(Rendered::Error(error.to_string()));
    }

    fn print_info(&mut self, info: &str) {
        self.output.push(Rendered::Info(info.to_string()));
    }

    fn finish_response(&mut self) {
        self.output.push(Rendered::Finished);
    }

    fn print_interrupted(&mut self) {
        self.output.push(Rendered::Interrupted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
    }

    #[test]
    fn renderer_without_color() {
        let renderer = PlainTextRenderer::with_color(false);
        assert!(!renderer.use_color);
    }

    #[test]
    fn buffer_collects_in_order() {
        let mut buffer = BufferRenderer::new();
        buffer.print_thinking("hmm");
        buffer.print_text("a");
        buffer.print_notice("searching");
        buffer.print_text("b");
        buffer.print_warning("bad record");
        buffer.finish_response();
        assert_eq!(buffer.text(), "ab");
        assert_eq!(buffer.thinking(), "hmm");
        assert_eq!(buffer.notices(), vec!["searching", "bad record"]);
        assert_eq!(buffer.output.last(), Some(&Rendered::Finished));
    }
}
