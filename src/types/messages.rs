use serde::Deserialize;
use serde_json::Value;

pub const TOOL_NAME_FALLBACK: &str = "tool";

/// A message as serialized by the agent server.
///
/// Chunk variants (`AIMessageChunk`, `ToolMessageChunk`) arrive while a turn
/// is streaming and are folded into the same variants as the persisted forms.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum BackendMessage {
    #[serde(rename = "human", alias = "HumanMessageChunk")]
    User {
        #[serde(default)]
        content: Option<Value>,
    },
    #[serde(rename = "ai", alias = "AIMessageChunk")]
    Assistant {
        #[serde(default)]
        content: Option<Value>,
    },
    #[serde(rename = "tool", alias = "ToolMessageChunk")]
    Tool {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        content: Option<Value>,
    },
    /// System prompts, removals and anything else the UI never shows.
    #[serde(other)]
    Other,
}

impl BackendMessage {
    pub fn user(text: impl Into<String>) -> Self {
        BackendMessage::User {
            content: Some(Value::String(text.into())),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        BackendMessage::Assistant {
            content: Some(Value::String(text.into())),
        }
    }

    pub fn tool(name: impl Into<String>, text: impl Into<String>) -> Self {
        BackendMessage::Tool {
            name: Some(name.into()),
            content: Some(Value::String(text.into())),
        }
    }

    /// Flattened text content; empty for [`BackendMessage::Other`].
    pub fn text(&self) -> String {
        match self {
            BackendMessage::User { content }
            | BackendMessage::Assistant { content }
            | BackendMessage::Tool { content, .. } => content_to_text(content.as_ref()),
            BackendMessage::Other => String::new(),
        }
    }

    pub fn tool_name(&self) -> Option<&str> {
        match self {
            BackendMessage::Tool { name, .. } => {
                Some(name.as_deref().unwrap_or(TOOL_NAME_FALLBACK))
            }
            _ => None,
        }
    }
}

/// Normalize message content into display text.
///
/// Content blocks are joined with a single space. Text blocks contribute their
/// `text` field, other blocks their JSON form. Absent or null content is empty.
pub fn content_to_text(content: Option<&Value>) -> String {
    match content {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(parts)) => parts
            .iter()
            .map(block_to_text)
            .collect::<Vec<_>>()
            .join(" "),
        Some(other) => other.to_string(),
    }
}

fn block_to_text(block: &Value) -> String {
    match block {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("text").and_then(|v| v.as_str()) {
            Some(text) => text.to_string(),
            None => block.to_string(),
        },
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the in-memory history shown in the main panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMessage {
    pub role: Role,
    pub content: String,
}

impl DisplayMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Translate a persisted message into display form. Messages the UI does
    /// not show yield `None`.
    pub fn from_backend(msg: &BackendMessage) -> Option<Self> {
        match msg {
            BackendMessage::User { .. } => Some(Self::user(msg.text())),
            BackendMessage::Assistant { .. } => Some(Self::assistant(msg.text())),
            BackendMessage::Tool { .. } => {
                let name = msg.tool_name().unwrap_or(TOOL_NAME_FALLBACK);
                Some(Self::assistant(format!("[tool: {name}] {}", msg.text())))
            }
            BackendMessage::Other => None,
        }
    }
}

/// Translate a thread's persisted history into display form, in order.
pub fn to_display_messages(messages: &[BackendMessage]) -> Vec<DisplayMessage> {
    messages
        .iter()
        .filter_map(DisplayMessage::from_backend)
        .collect()
}
