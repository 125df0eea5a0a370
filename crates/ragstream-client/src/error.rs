use thiserror::Error;

/// Errors that abort a query or a stream session.
#[derive(Error, Debug)]
pub enum StreamError {
    /// The backend could not be reached or answered with a non-success status.
    /// No record of such a response is ever parsed.
    #[error("{message}")]
    Connection {
        status: Option<u16>,
        message: String,
    },

    /// The backend sent an in-band `error` record.
    #[error("{0}")]
    ServerReported(String),

    /// The body stream failed after some body bytes had been received.
    /// A failure before the first byte is reported as `Connection`.
    #[error("Stream error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Stream cancelled")]
    Cancelled,

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    /// A non-streaming response body did not match the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl StreamError {
    pub(crate) fn status(status: reqwest::StatusCode) -> Self {
        StreamError::Connection {
            status: Some(status.as_u16()),
            message: format!("HTTP error! Status: {}", status.as_u16()),
        }
    }

    pub(crate) fn unreachable(err: reqwest::Error) -> Self {
        StreamError::Connection {
            status: None,
            message: format!("Failed to send request: {}", err),
        }
    }

    /// HTTP status carried by a connection failure, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            StreamError::Connection { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, StreamError::Cancelled)
    }
}

/// A single line that could not be parsed as a stream record.
///
/// Never fatal: the decoder logs it and moves on to the next line.
#[derive(Error, Debug)]
#[error("Malformed stream record {line:?}: {source}")]
pub struct MalformedRecord {
    pub line: String,
    #[source]
    pub source: serde_json::Error,
}

pub type Result<T> = std::result::Result<T, StreamError>;
