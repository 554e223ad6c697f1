use serde::{Deserialize, Serialize};

use crate::types::messages::BackendMessage;

/// Response from GET /threads/:id/state
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadState {
    #[serde(default)]
    pub values: StateValues,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateValues {
    #[serde(default)]
    pub messages: Vec<BackendMessage>,
}

impl ThreadState {
    pub fn with_messages(messages: Vec<BackendMessage>) -> Self {
        Self {
            values: StateValues { messages },
        }
    }

    pub fn messages(&self) -> &[BackendMessage] {
        &self.values.messages
    }
}

/// Entry of the POST /threads/search response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThreadInfo {
    pub thread_id: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Request body for POST /threads/search
#[derive(Debug, Clone, Serialize)]
pub struct ThreadSearchRequest {
    pub limit: u32,
    pub offset: u32,
}

/// Request body for POST /threads
#[derive(Debug, Clone, Serialize)]
pub struct CreateThreadRequest<'a> {
    pub thread_id: &'a str,
    pub if_exists: &'static str,
}
