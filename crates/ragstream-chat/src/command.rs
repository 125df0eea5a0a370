/// A line typed at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ask(String),
    Clear,
    History,
    Health,
    Cancel,
    Help,
    Quit,
    Empty,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }

        match line {
            "/clear" => Command::Clear,
            "/history" => Command::History,
            "/health" => Command::Health,
            "/cancel" => Command::Cancel,
            "/help" => Command::Help,
            "/quit" | "/exit" => Command::Quit,
            _ => Command::Ask(line.to_string()),
        }
    }
}

pub const HELP: &str = "\
Type a question and press enter.
  /history  show the conversation so far
  /clear    forget the conversation
  /cancel   stop the answer being streamed
  /health   check the backend
  /quit     leave";
