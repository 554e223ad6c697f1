//! Boundary to the chatbot engine.
//!
//! The engine owns reasoning, tool execution and persistence. The UI only
//! needs three things from it: a thread's persisted state, a streaming turn,
//! and the list of threads it knows about.

pub mod api;
pub mod events;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::Serialize;

use crate::error::prelude::*;
use crate::types::messages::BackendMessage;
use crate::types::thread::ThreadState;

pub const TURN_RUN_NAME: &str = "chat_turn";

/// Per-call configuration; the thread id is the correlation key for a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub thread_id: String,
    pub run_name: Option<String>,
}

impl RunConfig {
    pub fn for_thread(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            run_name: None,
        }
    }

    pub fn for_turn(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            run_name: Some(TURN_RUN_NAME.to_string()),
        }
    }
}

/// How the engine should report progress while a turn runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StreamMode {
    /// Message chunks paired with their run metadata.
    #[serde(rename = "messages-tuple")]
    Messages,
}

/// Input for a single turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnInput {
    pub text: String,
}

impl TurnInput {
    pub fn human(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// One partial update emitted while a turn streams.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamChunk {
    pub message: BackendMessage,
    pub metadata: serde_json::Value,
}

impl StreamChunk {
    pub fn new(message: BackendMessage) -> Self {
        Self {
            message,
            metadata: serde_json::Value::Null,
        }
    }
}

/// Lazy, finite, non-restartable sequence of updates for one turn.
pub type ChunkStream = BoxStream<'static, Result<StreamChunk, EventsError>>;

#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn get_state(&self, config: &RunConfig) -> Result<ThreadState, ApiError>;

    async fn stream(
        &self,
        input: TurnInput,
        config: &RunConfig,
        mode: StreamMode,
    ) -> Result<ChunkStream, EventsError>;

    async fn retrieve_all_threads(&self) -> Result<Vec<String>, ApiError>;
}
