use client_platform::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ClientLifecycleState;

/// Broad error category used for user-facing handling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClientErrorCategory {
    /// Invalid configuration or unsupported state.
    Config,
    /// User input rejected before any request was made.
    Validation,
    /// The API rejected the session or credentials (401/403).
    Auth,
    /// The request never reached the API or the response never arrived.
    Network,
    /// The API answered with a non-2xx status.
    Rejected,
    /// The API asked the client to slow down.
    RateLimited,
    /// The response did not have the expected shape.
    Malformed,
    /// Local durable storage failure.
    Storage,
    /// Client bug or invariant break.
    Internal,
}

/// Stable client error payload emitted across the command/event boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[error("{category:?}:{code}: {message}")]
pub struct ClientError {
    pub category: ClientErrorCategory,
    /// Stable machine-readable error code.
    pub code: String,
    /// Diagnostic message.
    pub message: String,
    /// HTTP status when the API answered.
    pub status: Option<u16>,
    /// `message` field of the API error envelope, when present.
    pub server_message: Option<String>,
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    pub fn new(
        category: ClientErrorCategory,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
            status: None,
            server_message: None,
        }
    }

    /// Build the error for a non-2xx API answer.
    pub fn from_status(status: u16, server_message: Option<String>) -> Self {
        let server_message = server_message
            .map(|message| message.trim().to_owned())
            .filter(|message| !message.is_empty());
        let message = match &server_message {
            Some(message) => format!("api answered {status}: {message}"),
            None => format!("api answered {status}"),
        };
        Self {
            category: classify_http_status(status),
            code: "http_status".to_owned(),
            message,
            status: Some(status),
            server_message,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ClientErrorCategory::Network, "network_error", message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ClientErrorCategory::Malformed, "malformed_response", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ClientErrorCategory::Validation, "invalid_input", message)
    }

    /// Build a standard invalid-state-transition error.
    pub fn invalid_state(current: ClientLifecycleState, action: impl Into<String>) -> Self {
        let action = action.into();
        Self::new(
            ClientErrorCategory::Internal,
            "invalid_state_transition",
            format!("cannot run '{action}' while client is in state {current:?}"),
        )
    }

    /// `true` when the API never produced an answer.
    pub fn is_transport_failure(&self) -> bool {
        self.status.is_none() && self.category == ClientErrorCategory::Network
    }

    /// Text to show the user.
    ///
    /// Server-supplied messages win, validation messages are already
    /// user-facing, everything else collapses to `fallback`.
    pub fn user_notice(&self, fallback: &str) -> String {
        if let Some(message) = &self.server_message {
            return message.clone();
        }
        if self.category == ClientErrorCategory::Validation {
            return self.message.clone();
        }
        fallback.to_owned()
    }
}

impl From<StoreError> for ClientError {
    fn from(err: StoreError) -> Self {
        let code = match &err {
            StoreError::Unavailable(_) => "store_unavailable",
            StoreError::Corrupt(_) => "store_corrupt",
            StoreError::Backend(_) => "store_error",
        };
        Self::new(ClientErrorCategory::Storage, code, err.to_string())
    }
}

/// Map HTTP status codes to client error categories.
pub fn classify_http_status(status: u16) -> ClientErrorCategory {
    match status {
        401 | 403 => ClientErrorCategory::Auth,
        429 => ClientErrorCategory::RateLimited,
        400..=599 => ClientErrorCategory::Rejected,
        _ => ClientErrorCategory::Malformed,
    }
}
