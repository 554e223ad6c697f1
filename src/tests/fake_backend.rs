use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;

use crate::client::{ChatBackend, ChunkStream, RunConfig, StreamChunk, StreamMode, TurnInput};
use crate::error::api::ApiError;
use crate::error::events::EventsError;
use crate::types::messages::BackendMessage;
use crate::types::thread::ThreadState;

/// One scripted item of a turn stream.
#[derive(Clone)]
pub(crate) enum Scripted {
    Chunk(BackendMessage),
    Fail(String),
}

/// In-memory backend with scripted histories and turn streams.
#[derive(Default)]
pub(crate) struct FakeBackend {
    pub histories: HashMap<String, Vec<BackendMessage>>,
    pub thread_list: Option<Vec<String>>,
    pub fail_state: bool,
    pub fail_stream_start: bool,
    pub script: Vec<Scripted>,
    pub state_calls: Mutex<Vec<String>>,
    pub stream_calls: Mutex<Vec<(TurnInput, RunConfig, StreamMode)>>,
}

impl FakeBackend {
    pub fn with_history(mut self, thread_id: &str, messages: Vec<BackendMessage>) -> Self {
        self.histories.insert(thread_id.to_string(), messages);
        self
    }

    pub fn with_threads(mut self, ids: &[&str]) -> Self {
        self.thread_list = Some(ids.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_script(mut self, script: Vec<Scripted>) -> Self {
        self.script = script;
        self
    }

    pub fn state_call_count(&self) -> usize {
        self.state_calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn get_state(&self, config: &RunConfig) -> Result<ThreadState, ApiError> {
        if let Ok(mut calls) = self.state_calls.lock() {
            calls.push(config.thread_id.clone());
        }
        if self.fail_state {
            return Err(ApiError::Http("connection refused".to_string()));
        }
        let messages = self
            .histories
            .get(&config.thread_id)
            .cloned()
            .unwrap_or_default();
        Ok(ThreadState::with_messages(messages))
    }

    async fn stream(
        &self,
        input: TurnInput,
        config: &RunConfig,
        mode: StreamMode,
    ) -> Result<ChunkStream, EventsError> {
        if let Ok(mut calls) = self.stream_calls.lock() {
            calls.push((input, config.clone(), mode));
        }
        if self.fail_stream_start {
            return Err(EventsError::Http("Status 503".to_string()));
        }
        let items: Vec<Result<StreamChunk, EventsError>> = self
            .script
            .iter()
            .map(|item| match item {
                Scripted::Chunk(msg) => Ok(StreamChunk::new(msg.clone())),
                Scripted::Fail(reason) => Err(EventsError::Server(reason.clone())),
            })
            .collect();
        Ok(stream::iter(items).boxed())
    }

    async fn retrieve_all_threads(&self) -> Result<Vec<String>, ApiError> {
        self.thread_list
            .clone()
            .ok_or_else(|| ApiError::Status(500))
    }
}
