//! Terminal output for rendered frames.
//!
//! Ordinary output goes through [`RenderSink::print`] and is delivered at the
//! end of a frame. [`RenderSink::flush_now`] bypasses that for writes that
//! must reach the terminal immediately.

use std::fmt;
use std::io::{IsTerminal, Write};

use crossterm::cursor::MoveTo;
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::Command;

use crate::error::{Result, WatchError};

/// Control sequences used in redraw mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermCodes {
    pub clear_screen: String,
    pub home: String,
    pub erase_line: String,
    pub erase_down: String,
}

impl TermCodes {
    /// ANSI sequences, without checking what stdout is connected to
    pub fn ansi() -> Self {
        Self {
            clear_screen: ansi_string(Clear(ClearType::All)),
            home: ansi_string(MoveTo(0, 0)),
            erase_line: ansi_string(Clear(ClearType::UntilNewLine)),
            erase_down: ansi_string(Clear(ClearType::FromCursorDown)),
        }
    }

    /// Check that stdout is a usable terminal and return its sequences
    pub fn query() -> Result<Self> {
        if !std::io::stdout().is_terminal() {
            return Err(WatchError::Terminal(
                "redraw mode needs stdout to be a terminal".to_string(),
            ));
        }
        let (cols, rows) =
            terminal::size().map_err(|e| WatchError::Terminal(e.to_string()))?;
        tracing::debug!("Terminal size: {}x{}", cols, rows);
        Ok(Self::ansi())
    }
}

fn ansi_string(command: impl Command) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _: fmt::Result = command.write_ansi(&mut out);
    out
}

/// Writer for rendered output, with optional redraw sequences
pub struct RenderSink<W: Write> {
    out: W,
    codes: Option<TermCodes>,
}

impl<W: Write> RenderSink<W> {
    /// Create a sink for plain incremental output
    pub fn new(out: W) -> Self {
        Self { out, codes: None }
    }

    /// Create a sink that redraws using the given sequences
    pub fn with_codes(out: W, codes: TermCodes) -> Self {
        Self {
            out,
            codes: Some(codes),
        }
    }

    /// Attach redraw sequences after construction
    pub fn set_codes(&mut self, codes: TermCodes) {
        self.codes = Some(codes);
    }

    /// Whether redraw sequences are available
    pub fn has_codes(&self) -> bool {
        self.codes.is_some()
    }

    /// Buffered write
    pub fn print(&mut self, text: &str) -> Result<()> {
        self.out
            .write_all(text.as_bytes())
            .map_err(WatchError::Output)
    }

    /// Write and deliver immediately
    pub fn flush_now(&mut self, text: &str) -> Result<()> {
        self.print(text)?;
        self.flush()
    }

    /// Deliver anything buffered
    pub fn flush(&mut self) -> Result<()> {
        self.out.flush().map_err(WatchError::Output)
    }

    /// Clear the whole screen
    pub fn clear_screen(&mut self) -> Result<()> {
        match self.codes.as_ref().map(|c| c.clear_screen.clone()) {
            Some(seq) => self.flush_now(&seq),
            None => Ok(()),
        }
    }

    /// Move the cursor to the top-left corner
    pub fn home(&mut self) -> Result<()> {
        match self.codes.as_ref().map(|c| c.home.clone()) {
            Some(seq) => self.print(&seq),
            None => Ok(()),
        }
    }

    /// Erase from the cursor to the end of the screen, immediately
    pub fn erase_down_now(&mut self) -> Result<()> {
        match self.codes.as_ref().map(|c| c.erase_down.clone()) {
            Some(seq) => self.flush_now(&seq),
            None => Ok(()),
        }
    }

    /// Erase from the cursor to the end of the line, immediately
    pub fn erase_line_now(&mut self) -> Result<()> {
        match self.codes.as_ref().map(|c| c.erase_line.clone()) {
            Some(seq) => self.flush_now(&seq),
            None => Ok(()),
        }
    }

    /// Prefix every line of `text` with erase-to-end-of-line
    pub fn erase_lines(&self, text: &str) -> String {
        match self.codes {
            Some(ref codes) => prefix_lines(text, &codes.erase_line),
            None => text.to_string(),
        }
    }

    /// Get a reference to the underlying writer
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Consume the sink and return the underlying writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Put `prefix` at the start of every line, including a final unterminated one
pub fn prefix_lines(text: &str, prefix: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        out.push_str(prefix);
        out.push_str(line);
    }
    out
}
