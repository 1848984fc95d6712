//! Dialogue output

use sdk::types::Role;
use std::io::Write;

const SEPARATOR: &str = "--------";

/// Where the dialogue is shown to the operator
pub trait DialogueDisplay: Send {
    /// A whole turn, introduced by a separator
    fn show_message(&mut self, role: Role, text: &str, translation: &str);

    /// One sentence about to be spoken
    fn show_sentence(&mut self, role: Role, text: &str, translation: &str);

    /// Prompt left open while waiting for a key
    fn prompt(&mut self, text: &str);

    /// Close the open prompt line
    fn end_prompt(&mut self);

    /// A one-line status message
    fn notice(&mut self, text: &str);
}

/// Writes the dialogue to a terminal (or any writer)
pub struct TerminalDisplay<W: Write + Send> {
    out: W,
}

impl TerminalDisplay<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> TerminalDisplay<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, role: Role, text: &str, translation: &str) {
        let result = writeln!(self.out, "{}: {}", role, text).and_then(|()| {
            if translation.is_empty() {
                Ok(())
            } else {
                writeln!(self.out, "   {}", translation)
            }
        });
        self.finish(result);
    }

    fn finish(&mut self, result: std::io::Result<()>) {
        if let Err(e) = result.and_then(|()| self.out.flush()) {
            tracing::warn!("Failed to write to terminal: {}", e);
        }
    }
}

impl<W: Write + Send> DialogueDisplay for TerminalDisplay<W> {
    fn show_message(&mut self, role: Role, text: &str, translation: &str) {
        let result = writeln!(self.out, "{}", SEPARATOR);
        self.finish(result);
        self.write_line(role, text, translation);
    }

    fn show_sentence(&mut self, role: Role, text: &str, translation: &str) {
        self.write_line(role, text, translation);
    }

    fn prompt(&mut self, text: &str) {
        let result = write!(self.out, "{}", text);
        self.finish(result);
    }

    fn end_prompt(&mut self) {
        let result = writeln!(self.out);
        self.finish(result);
    }

    fn notice(&mut self, text: &str) {
        let result = writeln!(self.out, "{}", text);
        self.finish(result);
    }
}
