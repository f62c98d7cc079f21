//! Source listings around a line.

use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Lines shown before the requested line.
const LINES_BEFORE: usize = 5;
/// Lines shown after the requested line.
const LINES_AFTER: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("invalid line number.")]
    InvalidLine,
}

#[derive(Debug, Clone)]
pub struct SourceFile {
    lines: Vec<String>,
}

impl SourceFile {
    pub fn load(path: &Path) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self::from_text(&text))
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.lines().map(|line| line.trim_end().to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Renders up to five lines either side of `line`, with the shared
    /// indentation removed.
    ///
    /// Markers: `=>` the current line when it is also a breakpoint, `->` the
    /// current line, ` #` a breakpoint.
    pub fn window(
        &self,
        line: i32,
        current: Option<i32>,
        is_break: impl Fn(i32) -> bool,
    ) -> Result<Vec<String>, SourceError> {
        if line <= 0 || line as usize > self.lines.len() {
            return Err(SourceError::InvalidLine);
        }
        let index = line as usize - 1;
        let start = index.saturating_sub(LINES_BEFORE);
        let end = self.lines.len().min(index + LINES_AFTER + 1);
        let shown = &self.lines[start..end];

        let indent = shown
            .iter()
            .filter(|text| !text.trim().is_empty())
            .map(|text| text.len() - text.trim_start().len())
            .min()
            .unwrap_or(0);

        let rendered = shown
            .iter()
            .enumerate()
            .map(|(offset, text)| {
                let number = (start + offset + 1) as i32;
                let marker = match (current == Some(number), is_break(number)) {
                    (true, true) => "=>",
                    (true, false) => "->",
                    (false, true) => " #",
                    (false, false) => "  ",
                };
                let body = text.get(indent..).unwrap_or_else(|| text.trim_start());
                format!("{marker}{number:>5}: {body}")
            })
            .collect();
        Ok(rendered)
    }
}
