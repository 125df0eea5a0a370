use std::path::PathBuf;
use std::sync::Arc;

use ragstream_client::{
    dispatch_events, CancellationToken, QueryBackend, QueryRequest, StreamError,
};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;

use crate::answer::{failure_message, AnswerBuilder, ChatUpdate};
use crate::config::ChatConfig;
use crate::error::Result;
use crate::history::{ChatHistory, Exchange};
use crate::slot::ConversationSlot;

/// Conversation state owned by the front-end.
///
/// History is written to `history_path` after every change only when
/// persistence is enabled.
pub struct ChatState {
    history: ChatHistory,
    history_path: Option<PathBuf>,
}

impl ChatState {
    pub fn new(config: &ChatConfig) -> Result<Self> {
        if config.persist {
            Ok(Self {
                history: ChatHistory::load(&config.history_path, config.max_history)?,
                history_path: Some(config.history_path.clone()),
            })
        } else {
            Ok(Self {
                history: ChatHistory::new(config.max_history),
                history_path: None,
            })
        }
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn record(&mut self, exchange: Exchange) -> Result<()> {
        self.history.push(exchange);
        self.save()
    }

    pub fn clear(&mut self) -> Result<()> {
        self.history.clear();
        self.save()
    }

    fn save(&self) -> Result<()> {
        match &self.history_path {
            Some(path) => self.history.save(path),
            None => Ok(()),
        }
    }
}

/// Terminal chat: one conversation slot against one backend.
pub struct ChatApp {
    backend: Arc<dyn QueryBackend>,
    state: Arc<Mutex<ChatState>>,
    slot: ConversationSlot,
    updates: UnboundedSender<ChatUpdate>,
}

impl ChatApp {
    pub fn new(
        backend: Arc<dyn QueryBackend>,
        config: &ChatConfig,
        updates: UnboundedSender<ChatUpdate>,
    ) -> Result<Self> {
        Ok(Self {
            backend,
            state: Arc::new(Mutex::new(ChatState::new(config)?)),
            slot: ConversationSlot::new(config.overlap_policy),
            updates,
        })
    }

    /// Start answering `question` in the background.
    ///
    /// Blank questions are ignored. Fails with `SlotBusy` only under the
    /// `reject` overlap policy.
    pub async fn ask(&self, question: &str) -> Result<()> {
        let question = question.trim().to_string();
        if question.is_empty() {
            return Ok(());
        }

        let backend = Arc::clone(&self.backend);
        let state = Arc::clone(&self.state);
        let updates = self.updates.clone();

        self.slot
            .start(move |cancel| run_exchange(backend, state, updates, question, cancel))
            .await
    }

    /// Wait for the question in flight, if any
    pub async fn wait(&self) {
        self.slot.wait().await
    }

    pub async fn cancel(&self) {
        self.slot.cancel().await
    }

    /// Cancel the question in flight and wait for it to wind down
    pub async fn shutdown(&self) {
        self.slot.cancel().await;
        self.slot.wait().await
    }

    pub async fn clear(&self) -> Result<()> {
        self.state.lock().await.clear()
    }

    pub async fn transcript(&self, include_roles: bool) -> String {
        self.state.lock().await.history().as_text(include_roles)
    }

    pub async fn history(&self) -> Vec<Exchange> {
        self.state.lock().await.history().iter().cloned().collect()
    }
}

async fn run_exchange(
    backend: Arc<dyn QueryBackend>,
    state: Arc<Mutex<ChatState>>,
    updates: UnboundedSender<ChatUpdate>,
    question: String,
    cancel: CancellationToken,
) {
    let mut answer = AnswerBuilder::new(updates.clone());

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StreamError::Cancelled),
        opened = backend.query_stream(QueryRequest::new(question.clone())) => match opened {
            Ok(events) => dispatch_events(events, &mut answer, &cancel).await,
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(()) => {
            let _ = updates.send(ChatUpdate::Finished);
            let exchange = answer.into_exchange(question);
            if let Err(e) = state.lock().await.record(exchange) {
                tracing::error!(error = %e, "Failed to save chat history");
            }
        }
        Err(StreamError::Cancelled) => {
            tracing::debug!(partial = answer.answer().len(), "Question cancelled");
            let _ = updates.send(ChatUpdate::Cancelled);
        }
        Err(e) => {
            tracing::error!(error = %e, "Streaming error");
            let _ = updates.send(ChatUpdate::Failed(failure_message(&e)));
        }
    }
}
