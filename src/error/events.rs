use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventsError {
    #[error("http error: {0}")]
    Http(String),
    #[error("stream request could not be prepared")]
    Request,
    #[error("malformed stream event: {0}")]
    Decode(String),
    #[error("backend reported an error: {0}")]
    Server(String),
}
