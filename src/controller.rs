//! Conversation view controller.
//!
//! Everything here operates on an explicit [`SessionState`]; the egui shell in
//! `app.rs` only renders what these functions leave behind.

use futures_util::StreamExt;

use crate::client::{ChatBackend, RunConfig, StreamChunk, StreamMode, TurnInput};
use crate::registry::{self, SessionState};
use crate::types::messages::{BackendMessage, DisplayMessage, to_display_messages};

/// Reconcile the session with the backend on startup.
///
/// Loads the backend's thread list when nothing is known yet (a failure leaves
/// the list empty), registers the active thread and builds every title.
pub async fn initialize(state: &mut SessionState, backend: &dyn ChatBackend) {
    if state.threads.is_empty() {
        match backend.retrieve_all_threads().await {
            Ok(ids) => {
                tracing::info!(count = ids.len(), "loaded thread list");
                for id in &ids {
                    state.add_thread(id);
                }
            }
            Err(e) => tracing::warn!(error = %e, "could not load thread list"),
        }
    }

    let active = state.active_thread_id.clone();
    state.add_thread(&active);
    state.ensure_title(&active);

    for thread_id in state.threads.clone() {
        registry::get_or_build_title(state, backend, &thread_id).await;
    }
}

/// Persisted history of a thread in display form; empty if it can't be loaded.
pub async fn load_conversation(backend: &dyn ChatBackend, thread_id: &str) -> Vec<DisplayMessage> {
    match backend.get_state(&RunConfig::for_thread(thread_id)).await {
        Ok(state) => to_display_messages(state.messages()),
        Err(e) => {
            tracing::warn!(thread_id, error = %e, "could not load conversation");
            Vec::new()
        }
    }
}

/// Switch the view to `thread_id` and replay its history.
pub async fn select_thread(state: &mut SessionState, backend: &dyn ChatBackend, thread_id: &str) {
    state.active_thread_id = thread_id.to_string();
    state.add_thread(thread_id);
    state.ensure_title(thread_id);
    state.history = load_conversation(backend, thread_id).await;
    tracing::debug!(thread_id, messages = state.history.len(), "switched thread");
}

/// A turn ready to be sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    pub thread_id: String,
    pub input: String,
}

/// Record the user's message and prepare the turn. Blank input is ignored.
pub fn submit_user_input(state: &mut SessionState, input: &str) -> Option<TurnRequest> {
    if input.trim().is_empty() {
        return None;
    }
    let thread_id = state.active_thread_id.clone();
    state.history.push(DisplayMessage::user(input));
    state.set_title_if_default(&thread_id, input);
    Some(TurnRequest {
        thread_id,
        input: input.to_string(),
    })
}

/// What the UI needs to know about one streamed update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    Tool(String),
    Content(String),
    Complete,
    Failed(String),
}

/// Map a stream chunk to a UI event. Chunks the UI doesn't show map to `None`.
pub fn classify_chunk(chunk: &StreamChunk) -> Option<TurnEvent> {
    match &chunk.message {
        BackendMessage::Tool { .. } => chunk
            .message
            .tool_name()
            .map(|name| TurnEvent::Tool(name.to_string())),
        BackendMessage::Assistant { .. } => Some(TurnEvent::Content(chunk.message.text())),
        BackendMessage::User { .. } | BackendMessage::Other => None,
    }
}

/// Drive one turn to completion, reporting every event through `emit`.
///
/// Always ends with exactly one `Complete` or `Failed`.
pub async fn run_turn(
    backend: &dyn ChatBackend,
    request: TurnRequest,
    mut emit: impl FnMut(TurnEvent),
) {
    let config = RunConfig::for_turn(&request.thread_id);
    tracing::info!(thread_id = %request.thread_id, "starting turn");

    let mut stream = match backend
        .stream(TurnInput::human(request.input), &config, StreamMode::Messages)
        .await
    {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!(thread_id = %request.thread_id, error = %e, "could not start turn");
            emit(TurnEvent::Failed(e.to_string()));
            return;
        }
    };

    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) => {
                tracing::trace!(node = ?chunk.metadata.get("langgraph_node"), "chunk");
                if let Some(event) = classify_chunk(&chunk) {
                    emit(event);
                }
            }
            Err(e) => {
                tracing::error!(thread_id = %request.thread_id, error = %e, "turn stream failed");
                emit(TurnEvent::Failed(e.to_string()));
                return;
            }
        }
    }

    tracing::info!(thread_id = %request.thread_id, "turn complete");
    emit(TurnEvent::Complete);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorState {
    Running,
    Complete,
}

/// The single tool-usage indicator shown for a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusIndicator {
    pub label: String,
    pub state: IndicatorState,
    pub expanded: bool,
    /// Every tool used this turn, in order of first use.
    pub tools: Vec<String>,
}

impl StatusIndicator {
    fn running(tool: &str) -> Self {
        Self {
            label: running_label(tool),
            state: IndicatorState::Running,
            expanded: true,
            tools: vec![tool.to_string()],
        }
    }

    fn update(&mut self, tool: &str) {
        self.label = running_label(tool);
        self.state = IndicatorState::Running;
        self.expanded = true;
        if !self.tools.iter().any(|t| t == tool) {
            self.tools.push(tool.to_string());
        }
    }

    fn complete(&mut self) {
        self.label = "✅ Tool finished".to_string();
        self.state = IndicatorState::Complete;
        self.expanded = false;
    }
}

fn running_label(tool: &str) -> String {
    format!("🔧 Using `{tool}` …")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnPhase {
    AwaitingStream,
    Streaming,
    Complete,
    Failed(String),
}

/// Accumulates a streaming turn for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnFold {
    pub thread_id: String,
    pub text: String,
    pub status: Option<StatusIndicator>,
    pub phase: TurnPhase,
}

impl TurnFold {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            text: String::new(),
            status: None,
            phase: TurnPhase::AwaitingStream,
        }
    }

    /// Events after the turn finished are ignored.
    pub fn apply(&mut self, event: TurnEvent) {
        if self.is_finished() {
            return;
        }
        match event {
            TurnEvent::Tool(name) => {
                self.phase = TurnPhase::Streaming;
                match &mut self.status {
                    Some(status) => status.update(&name),
                    None => self.status = Some(StatusIndicator::running(&name)),
                }
            }
            TurnEvent::Content(text) => {
                self.phase = TurnPhase::Streaming;
                self.text.push_str(&text);
            }
            TurnEvent::Complete => {
                if let Some(status) = &mut self.status {
                    status.complete();
                }
                self.phase = TurnPhase::Complete;
            }
            TurnEvent::Failed(reason) => {
                self.phase = TurnPhase::Failed(reason);
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, TurnPhase::Complete | TurnPhase::Failed(_))
    }
}

/// Append a completed turn's assistant message to the active history.
///
/// Returns the collapsed status indicator, if the turn used tools. Failed
/// turns append nothing.
pub fn append_turn(state: &mut SessionState, fold: TurnFold) -> Option<StatusIndicator> {
    if fold.phase != TurnPhase::Complete {
        return None;
    }
    if !state.is_active(&fold.thread_id) {
        tracing::debug!(thread_id = %fold.thread_id, "dropping turn for inactive thread");
        return None;
    }
    state.history.push(DisplayMessage::assistant(fold.text));
    fold.status
}
