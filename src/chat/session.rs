//! Core chat session management.
//!
//! This module provides the [`ChatSession`] struct which drives one turn at a
//! time through `Idle → Requesting → Streaming → Finalizing → Idle`, and
//! [`SharedSession`] for callers that share a session across tasks.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

use crate::client::{ByteStream, Transport};
use crate::client_logger::ClientLogger;
use crate::conversation::Conversation;
use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_AUTH_RECOVERIES, SESSION_BUSY, SESSION_INTERRUPTS, SESSION_TURN_DURATION,
    SESSION_TURN_ERRORS, SESSION_TURNS,
};
use crate::render::Renderer;
use crate::sse::decode_stream;
use crate::types::{ChatRequest, Message, Model, StreamEvent, Toggles};
use crate::utils::time;

/// Where a session is within its current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// No turn in progress.
    Idle,
    /// The request has been sent; no bytes have been decoded yet.
    Requesting,
    /// Events are being decoded and applied.
    Streaming,
    /// The assistant message is being closed.
    Finalizing,
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TurnState::Idle => "idle",
            TurnState::Requesting => "requesting",
            TurnState::Streaming => "streaming",
            TurnState::Finalizing => "finalizing",
        };
        f.write_str(s)
    }
}

/// The result of a completed turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// The finalized assistant message.
    ///
    /// `None` only when the turn was cancelled before the response started.
    pub message: Option<Message>,
    /// Search, image, and warning notices shown during the turn.
    pub notices: usize,
    /// Whether the turn was cut short by cancellation.
    pub interrupted: bool,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// The model used for the session.
    pub model: Model,
    /// The number of messages in the conversation.
    pub message_count: usize,
    /// Completed turns in the current conversation.
    pub turns: u64,
    /// The toggles the next turn will use.
    pub toggles: Toggles,
    /// The system prompt, if any.
    pub system_prompt: Option<String>,
    /// Total number of requests opened, retries included.
    pub total_requests: u64,
    /// Turns that ended in an error.
    pub failed_turns: u64,
    /// Turns that were cancelled.
    pub interrupted_turns: u64,
}

/// A chat session that manages conversation state and upstream interactions.
pub struct ChatSession<T: Transport> {
    transport: T,
    conversation: Conversation,
    toggles: Toggles,
    model: Model,
    system_prompt: Option<String>,
    state: TurnState,
    logger: Option<Arc<dyn ClientLogger>>,
    request_count: u64,
    failed_turns: u64,
    interrupted_turns: u64,
}

impl<T: Transport> ChatSession<T> {
    /// Creates a new chat session over `transport`.
    pub fn new(transport: T, model: Model, toggles: Toggles) -> Self {
        Self {
            transport,
            conversation: Conversation::new(),
            toggles,
            model,
            system_prompt: None,
            state: TurnState::Idle,
            logger: None,
            request_count: 0,
            failed_turns: 0,
            interrupted_turns: 0,
        }
    }

    /// Attaches a logger that sees every request, event, and finalized message.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Sets the system prompt the session starts with.
    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }

    /// Prepares the transport, e.g. by obtaining a session token.
    pub async fn initialize(&mut self) -> Result<()> {
        self.transport.initialize().await
    }

    /// Sends a user prompt and streams the response into `renderer`.
    ///
    /// Returns [`Error::Validation`] for an empty prompt without touching the
    /// conversation.  A turn left open by a dropped `chat` future is closed
    /// through [`ChatSession::recover`] first.  If the request cannot be
    /// opened, the user message is rolled back and the error returned.  Once
    /// streaming has begun the assistant message is always finalized, even
    /// when cancelled through `cancel` or cut off by a transport error.
    pub async fn chat(
        &mut self,
        prompt: &str,
        renderer: &mut dyn Renderer,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome> {
        if prompt.trim().is_empty() {
            return Err(Error::validation(
                "prompt must not be empty",
                Some("prompt".to_string()),
            ));
        }
        self.recover();

        let start = Instant::now();
        let result = self.run_turn(prompt, renderer, cancel).await;
        self.state = TurnState::Idle;
        SESSION_TURN_DURATION.add(start.elapsed().as_secs_f64());
        match &result {
            Ok(outcome) => {
                SESSION_TURNS.click();
                if outcome.interrupted {
                    SESSION_INTERRUPTS.click();
                    self.interrupted_turns += 1;
                }
            }
            Err(_) => {
                SESSION_TURN_ERRORS.click();
                self.failed_turns += 1;
            }
        }
        result
    }

    async fn run_turn(
        &mut self,
        prompt: &str,
        renderer: &mut dyn Renderer,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome> {
        self.state = TurnState::Requesting;
        if self.conversation.history().is_empty()
            && let Some(system) = &self.system_prompt
        {
            self.conversation.append_system(system.clone())?;
        }
        self.conversation.append_user(prompt)?;

        let toggles = self.toggles;
        let variables = time::template_variables(time::now(), self.transport.user_name());
        let request = ChatRequest::new(
            self.model.clone(),
            self.conversation.history(),
            toggles,
            variables,
        );
        if let Some(logger) = &self.logger {
            logger.log_request(&request);
        }

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            opened = self.open_with_recovery(&request) => Some(opened),
        };
        let byte_stream = match opened {
            None => {
                self.conversation.rollback_user();
                renderer.print_interrupted();
                return Ok(TurnOutcome {
                    message: None,
                    notices: 0,
                    interrupted: true,
                });
            }
            Some(Err(err)) => {
                self.conversation.rollback_user();
                return Err(err);
            }
            Some(Ok(byte_stream)) => byte_stream,
        };

        self.state = TurnState::Streaming;
        self.conversation.begin_assistant()?;
        let mut events = Box::pin(decode_stream(byte_stream, toggles.use_thinking));
        let mut notices = 0;
        let mut interrupted = false;
        let mut failure = None;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    interrupted = true;
                    break;
                }
                next = events.next() => next,
            };
            let event = match next {
                Some(Ok(event)) => event,
                Some(Err(err)) => {
                    failure = Some(err);
                    break;
                }
                None => break,
            };
            if let Some(logger) = &self.logger {
                logger.log_stream_event(&event);
            }
            self.conversation.apply_delta(&event)?;
            match &event {
                StreamEvent::TextDelta(text) => renderer.print_text(text),
                StreamEvent::ThinkingDelta(text) => renderer.print_thinking(text),
                StreamEvent::Search(search) => {
                    notices += 1;
                    renderer.print_notice(&search.to_string());
                }
                StreamEvent::Image(image) => {
                    notices += 1;
                    renderer.print_notice(&image.to_string());
                }
                StreamEvent::Error(message) => {
                    notices += 1;
                    renderer.print_warning(message);
                }
                StreamEvent::Done => break,
            }
        }
        drop(events);

        self.state = TurnState::Finalizing;
        let message = self.conversation.finalize_assistant()?.clone();
        if let Some(logger) = &self.logger {
            logger.log_message(&message);
        }
        if interrupted {
            renderer.print_interrupted();
        } else {
            renderer.finish_response();
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(TurnOutcome {
                message: Some(message),
                notices,
                interrupted,
            }),
        }
    }

    async fn open_with_recovery(&mut self, request: &ChatRequest) -> Result<ByteStream> {
        self.request_count += 1;
        match self.transport.open(request).await {
            Err(err) if err.is_authentication() => {
                CLIENT_AUTH_RECOVERIES.click();
                self.transport.initialize().await?;
                self.request_count += 1;
                self.transport.open(request).await
            }
            result => result,
        }
    }

    /// Returns the session to `Idle` after a `chat` future was dropped.
    ///
    /// A partially streamed assistant message is finalized; a user message
    /// that never got a response is rolled back.  The abandoned turn counts as
    /// interrupted.  Returns the finalized message, if any.  Does nothing when
    /// the session is already `Idle`.
    pub fn recover(&mut self) -> Option<Message> {
        if self.state == TurnState::Idle {
            return None;
        }
        SESSION_INTERRUPTS.click();
        self.interrupted_turns += 1;
        let finalized = if self.conversation.is_streaming() {
            self.conversation.finalize_assistant().ok().cloned()
        } else {
            if self.state == TurnState::Requesting {
                self.conversation.rollback_user();
            }
            None
        };
        self.state = TurnState::Idle;
        finalized
    }

    /// Starts a new conversation, discarding any turn a dropped `chat` future
    /// left open.
    pub fn reset(&mut self) {
        self.state = TurnState::Idle;
        self.conversation.reset();
    }

    /// The finalized messages of the current conversation.
    pub fn history(&self) -> &[Message] {
        self.conversation.history()
    }

    /// Where the session is within the current turn.
    pub fn state(&self) -> TurnState {
        self.state
    }

    /// The toggles the next turn will use.
    pub fn toggles(&self) -> Toggles {
        self.toggles
    }

    /// The toggles for mutation.  Changes apply from the next turn.
    pub fn toggles_mut(&mut self) -> &mut Toggles {
        &mut self.toggles
    }

    /// Changes the model used for responses.
    pub fn set_model(&mut self, model: Model) {
        self.model = model;
    }

    /// Returns the current model.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Sets or clears the system prompt.
    ///
    /// The prompt is recorded when a conversation's first turn starts, so a
    /// change takes effect from the next conversation.
    pub fn set_system_prompt(&mut self, prompt: Option<String>) {
        self.system_prompt = prompt;
    }

    /// Returns the current system prompt, if any.
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            model: self.model.clone(),
            message_count: self.conversation.history().len(),
            turns: self.conversation.turns(),
            toggles: self.toggles,
            system_prompt: self.system_prompt.clone(),
            total_requests: self.request_count,
            failed_turns: self.failed_turns,
            interrupted_turns: self.interrupted_turns,
        }
    }
}

/// A session shared between tasks.
///
/// A whole turn runs under the lock; a caller that arrives while another
/// turn is in progress gets [`Error::Busy`] immediately instead of waiting.
pub struct SharedSession<T: Transport> {
    inner: Arc<Mutex<ChatSession<T>>>,
}

impl<T: Transport> Clone for SharedSession<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> SharedSession<T> {
    /// Wraps `session` for sharing.
    pub fn new(session: ChatSession<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Runs a turn, or fails with `Busy` if one is already running.
    pub async fn chat(
        &self,
        prompt: &str,
        renderer: &mut dyn Renderer,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome> {
        let mut session = self.try_lock()?;
        session.chat(prompt, renderer, cancel).await
    }

    /// Locks the session if no turn is running.
    pub fn try_lock(&self) -> Result<MutexGuard<'_, ChatSession<T>>> {
        self.inner.try_lock().map_err(|_| {
            SESSION_BUSY.click();
            Error::busy("a turn is already in progress")
        })
    }

    /// Waits for the current turn, if any, and locks the session.
    pub async fn lock(&self) -> MutexGuard<'_, ChatSession<T>> {
        self.inner.lock().await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use bytes::Bytes;
    use futures::stream;

    use super::*;
    use crate::render::{BufferRenderer, Rendered};
    use crate::types::{KnownModel, MessageKind, Role};

    enum Script {
        Fail(fn() -> Error),
        Chunks(Vec<&'static str>),
        BrokenAfter(Vec<&'static str>),
        Stalled(Vec<&'static str>),
    }

    #[derive(Default)]
    struct ScriptedTransport {
        scripts: StdMutex<VecDeque<Script>>,
        requests: StdMutex<Vec<ChatRequest>>,
        initialized: u32,
    }

    impl ScriptedTransport {
        fn new(scripts: Vec<Script>) -> Self {
            Self {
                scripts: StdMutex::new(scripts.into()),
                ..Self::default()
            }
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl Transport for ScriptedTransport {
        async fn initialize(&mut self) -> Result<()> {
            self.initialized += 1;
            Ok(())
        }

        async fn open(&self, request: &ChatRequest) -> Result<ByteStream> {
            self.requests.lock().unwrap().push(request.clone());
            let script = self
                .scripts
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected request");
            let items = |chunks: Vec<&'static str>| -> Vec<Result<Bytes>> {
                chunks
                    .into_iter()
                    .map(|c| Ok(Bytes::from_static(c.as_bytes())))
                    .collect()
            };
            match script {
                Script::Fail(make) => Err(make()),
                Script::Chunks(chunks) => Ok(Box::pin(stream::iter(items(chunks)))),
                Script::BrokenAfter(chunks) => {
                    let mut items = items(chunks);
                    items.push(Err(Error::streaming("connection reset", None)));
                    Ok(Box::pin(stream::iter(items)))
                }
                Script::Stalled(chunks) => Ok(Box::pin(
                    stream::iter(items(chunks)).chain(stream::pending()),
                )),
            }
        }
    }

    fn session(scripts: Vec<Script>) -> ChatSession<ScriptedTransport> {
        ChatSession::new(
            ScriptedTransport::new(scripts),
            Model::default(),
            Toggles::default(),
        )
    }

    const GREETING: &str = concat!(
        "data: {\"type\":\"chat:completion\",\"data\":{\"phase\":\"answer\",\"delta_content\":\"I'm \"}}\n",
        "data: {\"type\":\"chat:completion\",\"data\":{\"phase\":\"answer\",\"delta_content\":\"GLM.\"}}\n",
        "data: [DONE]\n",
    );

    #[tokio::test]
    async fn simple_turn() {
        let mut session = session(vec![Script::Chunks(vec![GREETING])]);
        let mut renderer = BufferRenderer::new();
        let outcome = session
            .chat("Hello! Who are you?", &mut renderer, &CancellationToken::new())
            .await
            .unwrap();

        let message = outcome.message.unwrap();
        assert_eq!(message.content, "I'm GLM.");
        assert_eq!(message.kind, Some(MessageKind::Normal));
        assert!(!outcome.interrupted);
        assert_eq!(renderer.text(), "I'm GLM.");
        assert_eq!(renderer.output.last(), Some(&Rendered::Finished));

        let history = session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "Hello! Who are you?");
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(session.state(), TurnState::Idle);
        assert_eq!(session.stats().turns, 1);
    }

    #[tokio::test]
    async fn empty_prompt_rejected() {
        let mut session = session(vec![]);
        let mut renderer = BufferRenderer::new();
        let err = session
            .chat("   ", &mut renderer, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(session.history().is_empty());
        assert!(session.transport().requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_turn_recovered_by_next_chat() {
        let mut session = session(vec![
            Script::Stalled(vec![
                "data: {\"data\":{\"phase\":\"answer\",\"delta_content\":\"Partial\"}}\n",
            ]),
            Script::Chunks(vec![GREETING]),
        ]);
        let mut renderer = BufferRenderer::new();
        let cancel = CancellationToken::new();
        let elapsed = tokio::time::timeout(
            Duration::from_secs(5),
            session.chat("first", &mut renderer, &cancel),
        )
        .await;
        assert!(elapsed.is_err());
        assert_eq!(session.state(), TurnState::Streaming);

        let outcome = session.chat("second", &mut renderer, &cancel).await.unwrap();
        assert_eq!(outcome.message.unwrap().content, "I'm GLM.");
        assert_eq!(session.state(), TurnState::Idle);
        let history = session.history();
        assert_eq!(history.len(), 4);
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].content, "Partial");
        assert_eq!(history[2].content, "second");
        assert_eq!(session.stats().interrupted_turns, 1);
    }

    #[tokio::test]
    async fn unanswered_prompt_rolled_back_before_next_chat() {
        let mut session = session(vec![Script::Chunks(vec![GREETING])]);
        session.conversation.append_user("lost").unwrap();
        session.state = TurnState::Requesting;
        let mut renderer = BufferRenderer::new();
        session
            .chat("hi", &mut renderer, &CancellationToken::new())
            .await
            .unwrap();
        let history = session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "hi");
    }

    #[test]
    fn reset_discards_open_turn() {
        let mut session = session(vec![]);
        session.conversation.append_user("hi").unwrap();
        session.conversation.begin_assistant().unwrap();
        session.state = TurnState::Streaming;
        session.reset();
        assert!(session.history().is_empty());
        assert_eq!(session.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn transport_failure_rolls_back() {
        let mut session = session(vec![Script::Fail(|| {
            Error::connection("refused", None)
        })]);
        let mut renderer = BufferRenderer::new();
        let err = session
            .chat("hi", &mut renderer, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_connection());
        assert!(session.history().is_empty());
        assert_eq!(session.state(), TurnState::Idle);
        assert_eq!(session.stats().failed_turns, 1);
    }

    #[tokio::test]
    async fn authentication_retried_once() {
        let mut session = session(vec![
            Script::Fail(|| Error::authentication("expired")),
            Script::Chunks(vec![GREETING]),
        ]);
        let mut renderer = BufferRenderer::new();
        let outcome = session
            .chat("hi", &mut renderer, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.message.unwrap().content, "I'm GLM.");
        assert_eq!(session.transport().initialized, 1);
        assert_eq!(session.stats().total_requests, 2);
    }

    #[tokio::test]
    async fn second_authentication_failure_returned() {
        let mut session = session(vec![
            Script::Fail(|| Error::authentication("expired")),
            Script::Fail(|| Error::authentication("still expired")),
        ]);
        let mut renderer = BufferRenderer::new();
        let err = session
            .chat("hi", &mut renderer, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_authentication());
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn mid_stream_failure_keeps_partial() {
        let mut session = session(vec![Script::BrokenAfter(vec![
            "data: {\"data\":{\"phase\":\"answer\",\"delta_content\":\"Partial\"}}\n",
        ])]);
        let mut renderer = BufferRenderer::new();
        let err = session
            .chat("hi", &mut renderer, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Streaming { .. }));
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[1].content, "Partial");
        assert_eq!(session.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn warnings_and_notices_forwarded() {
        let mut session = session(vec![Script::Chunks(vec![concat!(
            "data: {\"data\":{\"phase\":\"answer\",\"delta_content\":\"a\"}}\n",
            "data: {not json\n",
            "data: {\"type\":\"search\",\"query\":\"rust\"}\n",
            "data: {\"data\":{\"phase\":\"answer\",\"delta_content\":\"b\"}}\n",
        )])]);
        let mut renderer = BufferRenderer::new();
        let outcome = session
            .chat("hi", &mut renderer, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.message.unwrap().content, "ab");
        assert_eq!(outcome.notices, 2);
        assert_eq!(renderer.notices().len(), 2);
    }

    #[tokio::test]
    async fn cancelled_before_response() {
        let mut session = session(vec![Script::Chunks(vec![GREETING])]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut renderer = BufferRenderer::new();
        let outcome = session.chat("hi", &mut renderer, &cancel).await.unwrap();
        assert!(outcome.interrupted);
        assert!(outcome.message.is_none());
        assert!(session.history().is_empty());
        assert_eq!(renderer.output, vec![Rendered::Interrupted]);
    }

    #[tokio::test]
    async fn system_prompt_recorded_once() {
        let mut session = session(vec![
            Script::Chunks(vec![GREETING]),
            Script::Chunks(vec![GREETING]),
        ])
        .with_system_prompt(Some("Be brief.".to_string()));
        let mut renderer = BufferRenderer::new();
        let cancel = CancellationToken::new();
        session.chat("one", &mut renderer, &cancel).await.unwrap();
        session.chat("two", &mut renderer, &cancel).await.unwrap();

        let history = session.history();
        assert_eq!(history.len(), 5);
        assert_eq!(history[0].role, Role::System);
        let requests = session.transport().requests();
        assert_eq!(requests.len(), 2);
        assert!(
            requests[0].messages[0]
                .content
                .starts_with("[System instructions]\nBe brief.")
        );
        assert_eq!(requests[1].signature_prompt, "two");
        assert_eq!(requests[1].messages.len(), 3);
    }

    #[tokio::test]
    async fn toggles_snapshot_per_turn() {
        let mut session = session(vec![Script::Chunks(vec![GREETING])]);
        session.toggles_mut().set_web_search(true);
        session.set_model(Model::Known(KnownModel::Glm47));
        let mut renderer = BufferRenderer::new();
        session
            .chat("hi", &mut renderer, &CancellationToken::new())
            .await
            .unwrap();
        let request = &session.transport().requests()[0];
        assert!(request.features.web_search);
        assert!(request.features.enable_thinking);
        assert_eq!(request.model, Model::Known(KnownModel::Glm47));
    }

    #[test]
    fn recover_rolls_back_unanswered_prompt() {
        let mut session = session(vec![]);
        session.conversation.append_user("hi").unwrap();
        session.state = TurnState::Requesting;
        assert!(session.recover().is_none());
        assert!(session.history().is_empty());
        assert_eq!(session.state(), TurnState::Idle);
        assert_eq!(session.stats().interrupted_turns, 1);
        assert!(session.recover().is_none());
        assert_eq!(session.stats().interrupted_turns, 1);
    }

    #[test]
    fn recover_finalizes_partial() {
        let mut session = session(vec![]);
        session.conversation.append_user("hi").unwrap();
        session.conversation.begin_assistant().unwrap();
        session
            .conversation
            .apply_delta(&StreamEvent::TextDelta("par".to_string()))
            .unwrap();
        session.state = TurnState::Streaming;
        let message = session.recover().unwrap();
        assert_eq!(message.content, "par");
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn set_system_prompt() {
        let mut session = session(vec![]);
        assert!(session.system_prompt().is_none());
        session.set_system_prompt(Some("Be helpful".to_string()));
        assert_eq!(session.system_prompt(), Some("Be helpful"));
        session.set_system_prompt(None);
        assert!(session.system_prompt().is_none());
    }

    #[tokio::test]
    async fn shared_session_busy() {
        let shared = SharedSession::new(session(vec![]));
        let guard = shared.lock().await;
        let mut renderer = BufferRenderer::new();
        let err = shared
            .chat("hi", &mut renderer, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_busy());
        drop(guard);
        assert!(shared.try_lock().is_ok());
    }
}
