use std::future::Future;

use ragstream_client::CancellationToken;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::OverlapPolicy;
use crate::error::{ChatError, Result};

struct Running {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Admits at most one in-flight stream session per conversation.
pub struct ConversationSlot {
    policy: OverlapPolicy,
    current: Mutex<Option<Running>>,
}

impl ConversationSlot {
    pub fn new(policy: OverlapPolicy) -> Self {
        Self {
            policy,
            current: Mutex::new(None),
        }
    }

    /// Spawn `session` in the slot, applying the overlap policy if a previous
    /// session is still running. The session gets its own cancellation token.
    pub async fn start<F, Fut>(&self, session: F) -> Result<()>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut current = self.current.lock().await;

        if let Some(running) = current.take() {
            if !running.handle.is_finished() {
                match self.policy {
                    OverlapPolicy::Reject => {
                        *current = Some(running);
                        return Err(ChatError::SlotBusy);
                    }
                    OverlapPolicy::CancelAndReplace => {
                        tracing::info!("Cancelling in-flight question");
                        running.token.cancel();
                        if let Err(e) = running.handle.await {
                            tracing::warn!(error = %e, "Cancelled session task failed");
                        }
                    }
                }
            }
        }

        let token = CancellationToken::new();
        let handle = tokio::spawn(session(token.clone()));
        *current = Some(Running { token, handle });

        Ok(())
    }

    pub async fn is_busy(&self) -> bool {
        self.current
            .lock()
            .await
            .as_ref()
            .map(|running| !running.handle.is_finished())
            .unwrap_or(false)
    }

    /// Ask the running session, if any, to stop
    pub async fn cancel(&self) {
        if let Some(running) = self.current.lock().await.as_ref() {
            running.token.cancel();
        }
    }

    /// Wait for the running session, if any, to finish
    pub async fn wait(&self) {
        let running = self.current.lock().await.take();
        if let Some(running) = running {
            if let Err(e) = running.handle.await {
                tracing::warn!(error = %e, "Session task failed");
            }
        }
    }
}
