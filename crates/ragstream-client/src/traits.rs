use async_trait::async_trait;

use crate::error::Result;
use crate::streaming::EventStream;
use crate::types::QueryRequest;

/// Anything that can answer a question as a stream of events.
///
/// `RagClient` is the HTTP implementation; front-ends depend on this trait so
/// they can be driven without a live backend.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Open a stream session for one question
    async fn query_stream(&self, request: QueryRequest) -> Result<EventStream>;
}
