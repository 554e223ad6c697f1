use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::json;

use crate::client::events::stream_run;
use crate::client::{ChatBackend, ChunkStream, RunConfig, StreamMode, TurnInput};
use crate::error::api::ApiError;
use crate::error::events::EventsError;
use crate::types::thread::{CreateThreadRequest, ThreadInfo, ThreadSearchRequest, ThreadState};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for a LangGraph agent server.
#[derive(Clone)]
pub struct LangGraphClient {
    base: Url,
    http: reqwest::Client,
    pub assistant_id: String,
    pub thread_page_size: u32,
}

impl LangGraphClient {
    pub fn new(base_url: &str, assistant_id: impl Into<String>) -> Result<Self, ApiError> {
        // Url::join drops the last path segment unless the base ends in '/'.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base = Url::parse(&normalized).map_err(|e| ApiError::Url(e.to_string()))?;
        Ok(Self {
            base,
            // No client-wide timeout: a turn stream stays open as long as the run does.
            http: reqwest::Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .build()
                .map_err(|e| ApiError::Http(e.to_string()))?,
            assistant_id: assistant_id.into(),
            thread_page_size: 100,
        })
    }

    pub fn with_thread_page_size(mut self, size: u32) -> Self {
        // A zero page size would never advance the offset.
        self.thread_page_size = size.max(1);
        self
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base.join(path).map_err(|e| ApiError::Url(e.to_string()))
    }

    fn prepare_query(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.timeout(REQUEST_TIMEOUT)
            .header("Accept", "application/json")
    }

    pub async fn get_thread_state(&self, thread_id: &str) -> Result<ThreadState, ApiError> {
        let url = self.url(&format!("threads/{thread_id}/state"))?;
        let resp = self
            .prepare_query(self.http.get(url))
            .send()
            .await
            .map_err(|e| ApiError::Http(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ApiError::Status(resp.status().as_u16()));
        }
        resp.json::<ThreadState>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// One page of the server's thread list.
    pub async fn search_threads(&self, offset: u32) -> Result<Vec<ThreadInfo>, ApiError> {
        let url = self.url("threads/search")?;
        let body = ThreadSearchRequest {
            limit: self.thread_page_size,
            offset,
        };
        let resp = self
            .prepare_query(self.http.post(url).json(&body))
            .send()
            .await
            .map_err(|e| ApiError::Http(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ApiError::Status(resp.status().as_u16()));
        }
        resp.json::<Vec<ThreadInfo>>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Every thread the server knows, fetched page by page until a short page.
    pub async fn list_all_threads(&self) -> Result<Vec<ThreadInfo>, ApiError> {
        let mut threads = Vec::new();
        loop {
            let page = self.search_threads(threads.len() as u32).await?;
            let short = (page.len() as u32) < self.thread_page_size || page.is_empty();
            threads.extend(page);
            if short {
                break;
            }
        }
        tracing::debug!(count = threads.len(), "listed threads");
        Ok(threads)
    }

    /// Make sure a locally generated thread id exists server side.
    pub async fn ensure_thread(&self, thread_id: &str) -> Result<(), ApiError> {
        let url = self.url("threads")?;
        let body = CreateThreadRequest {
            thread_id,
            if_exists: "do_nothing",
        };
        let resp = self
            .prepare_query(self.http.post(url).json(&body))
            .send()
            .await
            .map_err(|e| ApiError::Http(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ApiError::Status(resp.status().as_u16()));
        }
        Ok(())
    }

    fn run_request(
        &self,
        input: &TurnInput,
        config: &RunConfig,
        mode: StreamMode,
    ) -> Result<reqwest::RequestBuilder, ApiError> {
        let url = self.url(&format!("threads/{}/runs/stream", config.thread_id))?;
        let mut run_config = json!({
            "configurable": { "thread_id": config.thread_id },
        });
        if let Some(name) = &config.run_name {
            run_config["run_name"] = json!(name);
        }
        let body = json!({
            "assistant_id": self.assistant_id,
            "input": {
                "messages": [ { "type": "human", "content": input.text } ],
            },
            "config": run_config,
            "metadata": { "thread_id": config.thread_id },
            "stream_mode": [mode],
        });
        Ok(self
            .http
            .post(url)
            .header("Accept", "text/event-stream")
            .json(&body))
    }
}

#[async_trait]
impl ChatBackend for LangGraphClient {
    async fn get_state(&self, config: &RunConfig) -> Result<ThreadState, ApiError> {
        self.get_thread_state(&config.thread_id).await
    }

    async fn stream(
        &self,
        input: TurnInput,
        config: &RunConfig,
        mode: StreamMode,
    ) -> Result<ChunkStream, EventsError> {
        self.ensure_thread(&config.thread_id)
            .await
            .map_err(|e| EventsError::Http(e.to_string()))?;
        let req = self
            .run_request(&input, config, mode)
            .map_err(|e| EventsError::Http(e.to_string()))?;
        stream_run(req)
    }

    async fn retrieve_all_threads(&self) -> Result<Vec<String>, ApiError> {
        let threads = self.list_all_threads().await?;
        Ok(threads.into_iter().map(|t| t.thread_id).collect())
    }
}
