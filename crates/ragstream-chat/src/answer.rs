use ragstream_client::{Source, StreamHandler};
use tokio::sync::mpsc::UnboundedSender;

use crate::history::Exchange;

/// What the renderer is told while a question is being answered
#[derive(Debug, Clone, PartialEq)]
pub enum ChatUpdate {
    Chunk(String),
    Sources(Vec<Source>),
    Images(Vec<String>),
    Finished,
    /// Rendered error text shown after any partial answer
    Failed(String),
    Cancelled,
}

/// Accumulates one streamed answer and forwards every piece to the renderer.
pub struct AnswerBuilder {
    answer: String,
    sources: Vec<Source>,
    images: Vec<String>,
    updates: UnboundedSender<ChatUpdate>,
}

impl AnswerBuilder {
    pub fn new(updates: UnboundedSender<ChatUpdate>) -> Self {
        Self {
            answer: String::new(),
            sources: Vec::new(),
            images: Vec::new(),
            updates,
        }
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    fn send(&self, update: ChatUpdate) {
        // Renderer gone means nobody is watching; keep accumulating anyway
        let _ = self.updates.send(update);
    }

    pub fn into_exchange(self, question: impl Into<String>) -> Exchange {
        let mut exchange = Exchange::new(question, self.answer);
        exchange.sources = self.sources;
        exchange.images = self.images;
        exchange
    }
}

impl StreamHandler for AnswerBuilder {
    fn on_chunk(&mut self, content: String) {
        self.answer.push_str(&content);
        self.send(ChatUpdate::Chunk(content));
    }

    fn on_final(&mut self, sources: Vec<Source>) {
        self.sources = sources.clone();
        self.send(ChatUpdate::Sources(sources));
    }

    fn on_images(&mut self, paths: Vec<String>) {
        self.images.extend(paths.iter().cloned());
        self.send(ChatUpdate::Images(paths));
    }
}

/// Message shown in place of an answer when the exchange fails
pub fn failure_message(error: &impl std::fmt::Display) -> String {
    format!(
        "Sorry, there was an error processing your request: {}",
        error
    )
}
