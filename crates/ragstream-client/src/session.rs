use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, StreamError};
use crate::handler::StreamHandler;
use crate::streaming::{EventStream, StreamEvent};

/// Drive a decoded event stream into a handler until it ends.
///
/// Returns the first fatal error (`ServerReported`, `Transport`), or
/// `Cancelled` as soon as `cancel` fires. Callbacks that already ran are
/// never rolled back.
pub async fn dispatch_events<H>(
    mut events: EventStream,
    handler: &mut H,
    cancel: &CancellationToken,
) -> Result<()>
where
    H: StreamHandler + ?Sized,
{
    let mut dispatched = 0usize;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(dispatched, "Stream session cancelled");
                return Err(StreamError::Cancelled);
            }
            item = events.next() => item,
        };

        match next {
            None => {
                tracing::debug!(dispatched, "Stream session finished");
                return Ok(());
            }
            Some(Ok(event)) => {
                dispatch(event, handler);
                dispatched += 1;
            }
            Some(Err(e)) => {
                tracing::debug!(dispatched, error = %e, "Stream session aborted");
                return Err(e);
            }
        }
    }
}

fn dispatch<H: StreamHandler + ?Sized>(event: StreamEvent, handler: &mut H) {
    match event {
        StreamEvent::Chunk { content } => handler.on_chunk(content),
        StreamEvent::Final { sources } => handler.on_final(sources),
        StreamEvent::Images { content } => handler.on_images(content),
        // decode_events turns these into errors or drops them
        StreamEvent::Error { message } => {
            tracing::warn!(server_message = %message, "Error record reached dispatch");
        }
        StreamEvent::Unknown => {}
    }
}
