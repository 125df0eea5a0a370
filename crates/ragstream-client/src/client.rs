// HTTP client for a RAG question-answering backend

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Response;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{Result, StreamError};
use crate::handler::StreamHandler;
use crate::session::dispatch_events;
use crate::streaming::{decode_events, EventStream};
use crate::traits::QueryBackend;
use crate::types::{HealthStatus, QueryRequest, QueryResponse};

const STREAM_PATH: &str = "query/stream";
const QUERY_PATH: &str = "query";
const HEALTH_PATH: &str = "health";

/// RAG backend client (plain HTTP + JSON Lines)
#[derive(Debug, Clone)]
pub struct RagClient {
    http_client: reqwest::Client,
    base_url: Url,
}

impl RagClient {
    /// Create a client for the backend at `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::from_config(&ClientConfig::new(base_url))
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        let http_client = builder.build().map_err(|e| StreamError::Connection {
            status: None,
            message: format!("Failed to create HTTP client: {}", e),
        })?;

        Ok(Self {
            http_client,
            base_url: directory_url(&config.base_url)?,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Ask a question and push every decoded event into `handler`.
    pub async fn run_stream<H>(&self, request: &QueryRequest, handler: &mut H) -> Result<()>
    where
        H: StreamHandler + ?Sized,
    {
        self.run_stream_cancellable(request, handler, &CancellationToken::new())
            .await
    }

    /// Like `run_stream`, but stops promptly once `cancel` fires.
    pub async fn run_stream_cancellable<H>(
        &self,
        request: &QueryRequest,
        handler: &mut H,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        H: StreamHandler + ?Sized,
    {
        let url = self.endpoint(STREAM_PATH)?;
        run_session(&self.http_client, url, request, handler, cancel).await
    }

    /// Non-streaming question
    pub async fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let response = self
            .http_client
            .post(self.endpoint(QUERY_PATH)?)
            .json(request)
            .send()
            .await
            .map_err(StreamError::unreachable)?;

        check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| StreamError::Decode(e.to_string()))
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        let response = self
            .http_client
            .get(self.endpoint(HEALTH_PATH)?)
            .send()
            .await
            .map_err(StreamError::unreachable)?;

        check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| StreamError::Decode(e.to_string()))
    }
}

#[async_trait]
impl QueryBackend for RagClient {
    async fn query_stream(&self, request: QueryRequest) -> Result<EventStream> {
        open_stream(&self.http_client, self.endpoint(STREAM_PATH)?, &request).await
    }
}

/// One-shot stream session against an explicit endpoint URL.
///
/// Posts `payload` as JSON, then decodes the JSON Lines body and calls the
/// handler for every event as it arrives. Fails with `Connection` on a
/// non-success status (no events dispatched) and with `ServerReported` on an
/// in-band error record; malformed lines are logged and skipped.
pub async fn run_stream<P, H>(endpoint: &str, payload: &P, handler: &mut H) -> Result<()>
where
    P: Serialize + ?Sized,
    H: StreamHandler + ?Sized,
{
    let url = Url::parse(endpoint)?;
    let http_client = reqwest::Client::new();
    run_session(&http_client, url, payload, handler, &CancellationToken::new()).await
}

async fn run_session<P, H>(
    http_client: &reqwest::Client,
    url: Url,
    payload: &P,
    handler: &mut H,
    cancel: &CancellationToken,
) -> Result<()>
where
    P: Serialize + ?Sized,
    H: StreamHandler + ?Sized,
{
    let span = tracing::debug_span!("stream_session", session_id = %Uuid::new_v4());

    async move {
        let events = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StreamError::Cancelled),
            opened = open_stream(http_client, url, payload) => opened?,
        };

        dispatch_events(events, handler, cancel).await
    }
    .instrument(span)
    .await
}

async fn open_stream<P>(http_client: &reqwest::Client, url: Url, payload: &P) -> Result<EventStream>
where
    P: Serialize + ?Sized,
{
    tracing::debug!(%url, "Starting stream request (JSONL)");

    let response = http_client
        .post(url)
        .json(payload)
        .send()
        .await
        .map_err(StreamError::unreachable)?;

    let response = check_status(response).await?;
    Ok(decode_events(response.bytes_stream()))
}

/// Reject non-success responses without ever parsing their body as records.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::error!(status = status.as_u16(), body = %body, "Backend returned an error status");
    Err(StreamError::status(status))
}

/// Make sure relative joins land under the base path.
fn directory_url(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
