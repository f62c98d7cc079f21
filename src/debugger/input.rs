use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use tracing::warn;

/// Where the session reads its commands from.
///
/// `None` means the input is exhausted.
pub trait CommandSource {
    fn read_line(&mut self, prompt: &str) -> Option<String>;
}

impl<T: CommandSource + ?Sized> CommandSource for Box<T> {
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        (**self).read_line(prompt)
    }
}

/// Line editor on the terminal, with history. Falls back to plain stdin
/// when no terminal is available.
pub struct ConsoleInput {
    editor: Option<DefaultEditor>,
}

impl ConsoleInput {
    pub fn new() -> Self {
        let editor = match DefaultEditor::new() {
            Ok(editor) => Some(editor),
            Err(err) => {
                warn!(%err, "line editing unavailable, reading plain stdin");
                None
            }
        };
        Self { editor }
    }

    fn read_stdin(prompt: &str) -> Option<String> {
        print!("{prompt}");
        io::stdout().flush().ok()?;
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

impl Default for ConsoleInput {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandSource for ConsoleInput {
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        let Some(editor) = self.editor.as_mut() else {
            return Self::read_stdin(prompt);
        };
        match editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = editor.add_history_entry(line.as_str());
                }
                Some(line)
            }
            // Ctrl-C abandons the current line only
            Err(ReadlineError::Interrupted) => Some(String::new()),
            Err(_) => None,
        }
    }
}

/// Pre-recorded commands, optionally followed by another source once they
/// run out.
pub struct ScriptedInput {
    lines: VecDeque<String>,
    fallback: Option<Box<dyn CommandSource>>,
}

impl ScriptedInput {
    pub fn new<I>(lines: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            fallback: None,
        }
    }

    pub fn then(mut self, fallback: impl CommandSource + 'static) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

impl CommandSource for ScriptedInput {
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        match self.lines.pop_front() {
            Some(line) => Some(line),
            None => self.fallback.as_mut()?.read_line(prompt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_lines_come_back_in_order_then_run_out() {
        let mut input = ScriptedInput::new(["break main.obs:3", "run"]);
        assert_eq!(input.read_line("> ").as_deref(), Some("break main.obs:3"));
        assert_eq!(input.remaining(), 1);
        assert_eq!(input.read_line("> ").as_deref(), Some("run"));
        assert_eq!(input.read_line("> "), None);
    }

    #[test]
    fn fallback_takes_over_after_script() {
        let mut input = ScriptedInput::new(["one"]).then(ScriptedInput::new(["two"]));
        assert_eq!(input.read_line("> ").as_deref(), Some("one"));
        assert_eq!(input.read_line("> ").as_deref(), Some("two"));
        assert_eq!(input.read_line("> "), None);
    }
}
