use ragstream_client::StreamError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("A question is already being answered")]
    SlotBusy,

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("History I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("History format error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ChatError>;
