/// Accumulates decoded text until it can be resolved into whole lines.
///
/// Lines are handed out without their terminating `\n`; whatever follows the
/// last newline stays buffered until more text arrives or the stream ends.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: String,
    // Start of the unread text; consumed lines are compacted away on push
    start: usize,
}

impl LineBuffer {
    /// Create a new buffer with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: String::with_capacity(capacity),
            start: 0,
        }
    }

    /// Append decoded text
    pub fn push_str(&mut self, text: &str) {
        if self.start > 0 {
            self.buffer.drain(..self.start);
            self.start = 0;
        }
        self.buffer.push_str(text);
    }

    /// Extract next complete line (up to \n)
    /// Returns None if no complete line is available
    pub fn next_line(&mut self) -> Option<String> {
        let newline_pos = self.start + self.as_str().find('\n')?;

        let line = self.buffer[self.start..newline_pos].to_string();
        self.start = newline_pos + 1;
        Some(line)
    }

    /// Take whatever is left, leaving the buffer empty
    pub fn take_remainder(&mut self) -> String {
        let rest = self.buffer.split_off(self.start);
        self.buffer.clear();
        self.start = 0;
        rest
    }

    pub fn as_str(&self) -> &str {
        &self.buffer[self.start..]
    }

    /// Unread size in bytes
    pub fn len(&self) -> usize {
        self.buffer.len() - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
