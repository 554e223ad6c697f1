use futures_util::stream::{self, StreamExt};
use reqwest_eventsource::retry::Never;
use reqwest_eventsource::{Error as SseError, Event, EventSource};
use serde_json::Value;

use crate::client::{ChunkStream, StreamChunk};
use crate::error::events::EventsError;
use crate::types::messages::BackendMessage;

/// What a single SSE event means for the turn.
#[derive(Debug)]
enum Parsed {
    Chunk(StreamChunk),
    Skip,
    End,
    Failed(EventsError),
}

fn parse_event(event: &str, data: &str) -> Parsed {
    match event {
        "messages" => match serde_json::from_str::<(BackendMessage, Value)>(data) {
            Ok((message, metadata)) => Parsed::Chunk(StreamChunk { message, metadata }),
            Err(e) => Parsed::Failed(EventsError::Decode(e.to_string())),
        },
        "error" => {
            let reason = serde_json::from_str::<Value>(data)
                .ok()
                .and_then(|v| {
                    v.get("message")
                        .or_else(|| v.get("error"))
                        .and_then(|m| m.as_str().map(str::to_owned))
                })
                .unwrap_or_else(|| data.to_string());
            Parsed::Failed(EventsError::Server(reason))
        }
        "end" => Parsed::End,
        // metadata, values, debug and anything newer the server adds
        _ => Parsed::Skip,
    }
}

/// Open the run stream and expose it as a finite stream of chunks.
///
/// The event source is closed on the first error or when the server ends the
/// stream, so it never reconnects and replays a turn.
pub fn stream_run(req: reqwest::RequestBuilder) -> Result<ChunkStream, EventsError> {
    let mut es = EventSource::new(req).map_err(|_| EventsError::Request)?;
    es.set_retry_policy(Box::new(Never));

    let chunks = stream::unfold(es, |mut es| async move {
        loop {
            match es.next().await {
                Some(Ok(Event::Open)) => {}
                Some(Ok(Event::Message(message))) => match parse_event(&message.event, &message.data) {
                    Parsed::Chunk(chunk) => return Some((Ok(chunk), es)),
                    Parsed::Skip => {}
                    Parsed::End => {
                        es.close();
                        return None;
                    }
                    Parsed::Failed(err) => {
                        tracing::warn!(error = %err, "turn stream failed");
                        es.close();
                        return Some((Err(err), es));
                    }
                },
                Some(Err(SseError::StreamEnded)) | None => {
                    es.close();
                    return None;
                }
                Some(Err(SseError::InvalidStatusCode(status, _))) => {
                    es.close();
                    return Some((Err(EventsError::Http(format!("Status {status}"))), es));
                }
                Some(Err(e)) => {
                    es.close();
                    return Some((Err(EventsError::Http(e.to_string())), es));
                }
            }
        }
    });

    Ok(chunks.boxed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_messages_event_when_parse_then_chunk_with_metadata() {
        // Given
        let data = r#"[{"type":"AIMessageChunk","content":"Hel"},{"langgraph_node":"chat_node"}]"#;

        // When
        let parsed = parse_event("messages", data);

        // Then
        match parsed {
            Parsed::Chunk(chunk) => {
                assert_eq!(chunk.message, BackendMessage::assistant("Hel"));
                assert_eq!(chunk.metadata["langgraph_node"], "chat_node");
            }
            other => panic!("expected chunk, got {other:?}"),
        }
    }

    #[test]
    fn given_error_event_when_parse_then_server_message_surfaces() {
        let parsed = parse_event("error", r#"{"error":"ValueError","message":"boom"}"#);
        assert!(matches!(parsed, Parsed::Failed(EventsError::Server(ref m)) if m == "boom"));
    }

    #[test]
    fn given_metadata_event_when_parse_then_skipped() {
        let parsed = parse_event("metadata", r#"{"run_id":"r1"}"#);
        assert!(matches!(parsed, Parsed::Skip));
    }

    #[test]
    fn given_garbled_messages_event_when_parse_then_decode_error() {
        let parsed = parse_event("messages", "not json");
        assert!(matches!(parsed, Parsed::Failed(EventsError::Decode(_))));
    }

    const TURN_EVENTS: &str = "event: metadata\n\
        data: {\"run_id\":\"r1\"}\n\n\
        event: messages\n\
        data: [{\"type\":\"AIMessageChunk\",\"content\":\"Hel\"},{}]\n\n\
        event: messages\n\
        data: [{\"type\":\"AIMessageChunk\",\"content\":\"lo\"},{}]\n\n\
        event: messages\n\
        data: [{\"type\":\"AIMessageChunk\",\"content\":\"!\"},{}]\n\n";

    fn sse_response(status: u16, body: String) -> wiremock::ResponseTemplate {
        wiremock::ResponseTemplate::new(status)
            .insert_header("content-type", "text/event-stream")
            .set_body_string(body)
    }

    async fn mount_run(status: u16, body: String) -> wiremock::MockServer {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/threads/t-1/runs/stream"))
            .respond_with(sse_response(status, body))
            // A second request would mean the event source reconnected.
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    async fn collect_run(server: &wiremock::MockServer) -> Vec<Result<StreamChunk, EventsError>> {
        let req = reqwest::Client::new().post(format!("{}/threads/t-1/runs/stream", server.uri()));
        stream_run(req).unwrap().collect().await
    }

    fn texts(items: &[Result<StreamChunk, EventsError>]) -> Vec<String> {
        items
            .iter()
            .map(|item| item.as_ref().unwrap().message.text())
            .collect()
    }

    #[tokio::test]
    async fn given_end_event_when_stream_run_then_chunks_then_finish() {
        // Given
        let body = format!("{TURN_EVENTS}event: end\ndata: null\n\n");
        let server = mount_run(200, body).await;

        // When
        let items = collect_run(&server).await;

        // Then
        assert_eq!(texts(&items), vec!["Hel", "lo", "!"]);
    }

    #[tokio::test]
    async fn given_events_after_end_when_stream_run_then_they_are_ignored() {
        let body = format!(
            "{TURN_EVENTS}event: end\ndata: null\n\n\
             event: messages\ndata: [{{\"type\":\"AIMessageChunk\",\"content\":\"late\"}},{{}}]\n\n"
        );
        let server = mount_run(200, body).await;

        let items = collect_run(&server).await;

        assert_eq!(texts(&items), vec!["Hel", "lo", "!"]);
    }

    #[tokio::test]
    async fn given_server_closes_without_end_when_stream_run_then_finish_without_reconnect() {
        // Given
        let server = mount_run(200, TURN_EVENTS.to_string()).await;

        // When
        let items = collect_run(&server).await;

        // Then
        assert_eq!(texts(&items), vec!["Hel", "lo", "!"]);
    }

    #[tokio::test]
    async fn given_error_event_when_stream_run_then_single_error_ends_stream() {
        let body = format!(
            "{TURN_EVENTS}event: error\ndata: {{\"error\":\"ValueError\",\"message\":\"boom\"}}\n\n"
        );
        let server = mount_run(200, body).await;

        let items = collect_run(&server).await;

        assert_eq!(items.len(), 4);
        assert!(matches!(&items[3], Err(EventsError::Server(m)) if m == "boom"));
    }

    #[tokio::test]
    async fn given_non_success_status_when_stream_run_then_http_error_without_reconnect() {
        // Given
        let server = mount_run(500, String::new()).await;

        // When
        let items = collect_run(&server).await;

        // Then
        assert_eq!(items.len(), 1);
        assert!(matches!(&items[0], Err(EventsError::Http(m)) if m.contains("500")));
    }
}
