use thiserror::Error;

use super::jsonrpc::JsonRpcError;

/// Code carried by every timeout failure, whichever transport raised it.
pub const TIMEOUT_CODE: &str = "ETIMEDOUT";

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request timeout after {0}ms (ETIMEDOUT)")]
    Timeout(u64),

    #[error("{0}")]
    Remote(JsonRpcError),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("{0}")]
    Middleware(String),

    /// A failure re-raised by middleware with a marker attached.
    #[error("{source}")]
    Annotated {
        note: String,
        source: Box<RpcError>,
    },
}

impl RpcError {
    /// Wraps this error with a marker, keeping the original reachable via [`root`](Self::root).
    pub fn annotate(self, note: impl Into<String>) -> Self {
        RpcError::Annotated {
            note: note.into(),
            source: Box::new(self),
        }
    }

    /// Markers attached by middleware, outermost first.
    pub fn notes(&self) -> Vec<&str> {
        let mut notes = Vec::new();
        let mut current = self;
        while let RpcError::Annotated { note, source } = current {
            notes.push(note.as_str());
            current = source;
        }
        notes
    }

    pub fn has_note(&self, note: &str) -> bool {
        self.notes().contains(&note)
    }

    /// The innermost error, underneath any annotations.
    pub fn root(&self) -> &RpcError {
        let mut current = self;
        while let RpcError::Annotated { source, .. } = current {
            current = source;
        }
        current
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), RpcError::Timeout(_))
    }

    /// The server-reported error object, if this failure came from the remote side.
    pub fn remote(&self) -> Option<&JsonRpcError> {
        match self.root() {
            RpcError::Remote(err) => Some(err),
            _ => None,
        }
    }

    /// Distinguished code for branching on the failure class.
    ///
    /// Timeouts report [`TIMEOUT_CODE`]; remote errors report their code as
    /// text (string codes unquoted, anything else as compact JSON). Everything
    /// else has no code.
    pub fn code(&self) -> Option<String> {
        match self.root() {
            RpcError::Timeout(_) => Some(TIMEOUT_CODE.to_string()),
            RpcError::Remote(err) => err.code.as_ref().map(|code| match code {
                serde_json::Value::String(code) => code.clone(),
                other => other.to_string(),
            }),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;
