//! Thread registry: known threads, their titles, and the session that views them.

use std::collections::HashMap;

use crate::client::{ChatBackend, RunConfig};
use crate::types::messages::{BackendMessage, DisplayMessage};

pub const DEFAULT_TITLE: &str = "New chat";
pub const TITLE_MAX_CHARS: usize = 40;

/// Per-UI-session state, owned by the app and passed by reference into every
/// handler.
///
/// A freshly constructed session has an empty history and a newly generated
/// active thread that is not registered yet; [`crate::controller::initialize`]
/// registers and titles it. After that the active thread is always in
/// `threads` and every known thread has a title entry.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub active_thread_id: String,
    pub threads: Vec<String>,
    pub titles: HashMap<String, String>,
    pub history: Vec<DisplayMessage>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            active_thread_id: generate_thread_id(),
            threads: Vec::new(),
            titles: HashMap::new(),
            history: Vec::new(),
        }
    }

    /// Idempotently register a thread id, keeping registration order.
    pub fn add_thread(&mut self, thread_id: &str) {
        if !self.threads.iter().any(|t| t == thread_id) {
            self.threads.push(thread_id.to_string());
        }
    }

    /// Start a new conversation and make it active.
    pub fn reset_chat(&mut self) -> &str {
        let thread_id = generate_thread_id();
        self.add_thread(&thread_id);
        self.history.clear();
        self.titles
            .insert(thread_id.clone(), DEFAULT_TITLE.to_string());
        tracing::debug!(thread_id = %thread_id, "started new chat");
        self.active_thread_id = thread_id;
        &self.active_thread_id
    }

    pub fn cached_title(&self, thread_id: &str) -> Option<&str> {
        self.titles.get(thread_id).map(String::as_str)
    }

    /// Title shown in the sidebar; threads whose title is still unresolved
    /// show the default.
    pub fn title(&self, thread_id: &str) -> &str {
        self.cached_title(thread_id).unwrap_or(DEFAULT_TITLE)
    }

    pub fn ensure_title(&mut self, thread_id: &str) {
        self.titles
            .entry(thread_id.to_string())
            .or_insert_with(|| DEFAULT_TITLE.to_string());
    }

    /// Derive the title from `text` while the thread still has the default.
    pub fn set_title_if_default(&mut self, thread_id: &str, text: &str) {
        let is_default = self
            .cached_title(thread_id)
            .is_none_or(|t| t.is_empty() || t == DEFAULT_TITLE);
        if is_default {
            self.titles
                .insert(thread_id.to_string(), build_title_from_text(text));
        }
    }

    /// Known threads, most recently registered first.
    pub fn threads_newest_first(&self) -> impl Iterator<Item = (&str, &str)> {
        self.threads
            .iter()
            .rev()
            .map(|id| (id.as_str(), self.title(id)))
    }

    pub fn is_active(&self, thread_id: &str) -> bool {
        self.active_thread_id == thread_id
    }
}

pub fn generate_thread_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// First line of `text`, at most [`TITLE_MAX_CHARS`] characters long.
pub fn build_title_from_text(text: &str) -> String {
    let first_line = text.trim().lines().next().unwrap_or("");
    if first_line.is_empty() {
        return DEFAULT_TITLE.to_string();
    }
    if first_line.chars().count() > TITLE_MAX_CHARS {
        let mut title: String = first_line.chars().take(TITLE_MAX_CHARS - 1).collect();
        title.push('…');
        title
    } else {
        first_line.to_string()
    }
}

/// Title for a persisted conversation: its first user message.
pub fn title_from_history(messages: &[BackendMessage]) -> String {
    let first_user = messages
        .iter()
        .find(|m| matches!(m, BackendMessage::User { .. }));
    match first_user {
        Some(msg) => build_title_from_text(&msg.text()),
        None => DEFAULT_TITLE.to_string(),
    }
}

/// Fetch a thread's history and derive its title. Retrieval failures are
/// logged and reported as the default title.
pub async fn fetch_title(backend: &dyn ChatBackend, thread_id: &str) -> String {
    match backend.get_state(&RunConfig::for_thread(thread_id)).await {
        Ok(state) => title_from_history(state.messages()),
        Err(e) => {
            tracing::warn!(thread_id, error = %e, "could not load history for title");
            DEFAULT_TITLE.to_string()
        }
    }
}

/// Cached title, or one built from the backend's persisted history.
pub async fn get_or_build_title(
    state: &mut SessionState,
    backend: &dyn ChatBackend,
    thread_id: &str,
) -> String {
    if let Some(title) = state.cached_title(thread_id) {
        return title.to_string();
    }
    let title = fetch_title(backend, thread_id).await;
    state.titles.insert(thread_id.to_string(), title.clone());
    title
}
