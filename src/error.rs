use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::api::error_response;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read store file {path:?}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write store file {path:?}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("store file {path:?} is not a valid document")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to serialize collection")]
    Serialize(#[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("book {0} not found")]
    NotFound(String),
    #[error("invalid request body: {0}")]
    InvalidBody(String),
    #[error("storage failure")]
    Store(#[from] StoreError),
}

impl HandlerError {
    pub fn status(&self) -> StatusCode {
        use HandlerError::*;
        match self {
            NotFound(_) => StatusCode::NOT_FOUND,
            InvalidBody(_) => StatusCode::BAD_REQUEST,
            Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %crate::unpack_error(&self), "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        error_response(status, &self.to_string())
    }
}
