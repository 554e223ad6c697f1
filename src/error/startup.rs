use thiserror::Error;

use crate::error::api::ApiError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("failed to create backend client: {0}")]
    Client(#[from] ApiError),
}
