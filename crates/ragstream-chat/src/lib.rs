pub mod answer;
pub mod app;
pub mod command;
pub mod config;
pub mod error;
pub mod history;
pub mod render;
pub mod slot;

pub use answer::{AnswerBuilder, ChatUpdate};
pub use app::{ChatApp, ChatState};
pub use config::{ChatConfig, Config, LoggingConfig, OverlapPolicy};
pub use error::{ChatError, Result};
pub use history::{ChatHistory, Exchange};
