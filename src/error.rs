use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification shared by every failure the bill workflows can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Server,
    Network,
}

impl ErrorKind {
    /// Whether re-invoking the same step can reasonably succeed.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Network | ErrorKind::Server)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Server => "server",
            ErrorKind::Network => "network",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure returned by a [`RemoteBillGateway`](crate::services::gateway::RemoteBillGateway) call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct GatewayError {
    pub kind: ErrorKind,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        GatewayError {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl std::fmt::Display) -> Self {
        Self::new(ErrorKind::Network, format!("Erreur réseau: {}", message))
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Server, message)
    }

    /// Builds the error for a non-success HTTP status. The backend body is
    /// reported verbatim when it carries something, `"Erreur <status>"` otherwise.
    pub fn from_status(status: u16, body: &str) -> Self {
        let body = body.trim();
        let message = if body.is_empty() {
            format!("Erreur {}", status)
        } else {
            body.to_string()
        };
        Self::new(classify_status(status), message)
    }
}

/// Maps a non-success status code onto an error kind.
pub fn classify_status(status: u16) -> ErrorKind {
    match status {
        404 => ErrorKind::NotFound,
        _ => ErrorKind::Server,
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("file name is empty")]
    EmptyFileName,

    #[error("unsupported file type")]
    UnsupportedFileType(String),

    #[error("invalid bill: {0}")]
    InvalidDraft(String),

    #[error("bill already submitted")]
    AlreadySubmitted,
}
