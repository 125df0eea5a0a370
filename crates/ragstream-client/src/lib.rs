//! Client side of a streamed RAG question/answer exchange.
//!
//! The backend answers `POST /query/stream` with a JSON Lines body; this crate
//! turns that body into typed events as bytes arrive and pushes them into a
//! [`StreamHandler`], or exposes them as a lazy [`EventStream`].

pub mod buffer_utils;
pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod session;
pub mod streaming;
pub mod traits;
pub mod types;

pub use client::{run_stream, RagClient};
pub use config::ClientConfig;
pub use error::{MalformedRecord, Result, StreamError};
pub use handler::{FnHandler, StreamHandler};
pub use session::dispatch_events;
pub use streaming::{decode_events, parse_record, EventStream, StreamEvent};
pub use traits::QueryBackend;
pub use types::{HealthStatus, QueryRequest, QueryResponse, Source};

pub use tokio_util::sync::CancellationToken;
