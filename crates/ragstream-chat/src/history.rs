use chrono::{DateTime, Local, Utc};
use ragstream_client::Source;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;

use crate::error::Result;

/// One completed question/answer pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub images: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl Exchange {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            sources: Vec::new(),
            images: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Local wall-clock time, `HH:MM`
    pub fn time_label(&self) -> String {
        self.timestamp.with_timezone(&Local).format("%H:%M").to_string()
    }
}

/// Bounded chat history; the oldest exchange is dropped first.
#[derive(Debug, Clone)]
pub struct ChatHistory {
    exchanges: VecDeque<Exchange>,
    max_history: usize,
}

impl ChatHistory {
    pub fn new(max_history: usize) -> Self {
        Self {
            exchanges: VecDeque::with_capacity(max_history),
            max_history,
        }
    }

    pub fn push(&mut self, exchange: Exchange) {
        self.exchanges.push_back(exchange);
        while self.exchanges.len() > self.max_history {
            self.exchanges.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.exchanges.clear();
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Exchange> {
        self.exchanges.iter()
    }

    /// Transcript, one line per turn
    pub fn as_text(&self, include_roles: bool) -> String {
        let mut lines = Vec::with_capacity(self.exchanges.len() * 2);
        for exchange in &self.exchanges {
            if include_roles {
                lines.push(format!("USER: {}", exchange.question));
                lines.push(format!("ASSISTANT: {}", exchange.answer));
            } else {
                lines.push(exchange.question.clone());
                lines.push(exchange.answer.clone());
            }
        }
        lines.join("\n")
    }

    /// Read a saved history. A missing file is an empty history.
    pub fn load(path: &Path, max_history: usize) -> Result<Self> {
        let mut history = Self::new(max_history);
        if !path.exists() {
            return Ok(history);
        }

        let data = std::fs::read_to_string(path)?;
        let exchanges: Vec<Exchange> = serde_json::from_str(&data)?;
        for exchange in exchanges {
            history.push(exchange);
        }

        tracing::debug!(path = %path.display(), count = history.len(), "Loaded chat history");
        Ok(history)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let exchanges: Vec<&Exchange> = self.exchanges.iter().collect();
        std::fs::write(path, serde_json::to_string_pretty(&exchanges)?)?;
        Ok(())
    }
}
