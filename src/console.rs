//! Console output for grumble
//!
//! Handles:
//! - Writing lines to stdout with broken pipe handling for piped commands
//! - Capturing lines in memory for test harnesses

use parking_lot::Mutex;
use std::io::{stdout, ErrorKind, Write};

use crate::errors::{GrumbleError, GrumbleResult};

/// Destination for console text
pub trait ConsoleSink: Send + Sync {
    /// Write `text` followed by a newline
    fn emit(&self, text: &str) -> GrumbleResult<()>;

    /// Whether ANSI styling may be added to summary lines
    fn supports_color(&self) -> bool {
        false
    }
}

/// Standard output
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutConsole;

impl ConsoleSink for StdoutConsole {
    fn emit(&self, text: &str) -> GrumbleResult<()> {
        let mut out = stdout().lock();
        let result = writeln!(out, "{}", text).and_then(|_| out.flush());

        match result {
            Ok(()) => Ok(()),
            // Reader went away (e.g. `| head`); nothing left to show
            Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
            Err(e) => Err(GrumbleError::Console(e)),
        }
    }

    fn supports_color(&self) -> bool {
        colored::control::SHOULD_COLORIZE.should_colorize()
    }
}

/// In-memory console, one entry per `emit`
#[derive(Debug, Default)]
pub struct MemoryConsole {
    lines: Mutex<Vec<String>>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Everything emitted so far, newline-terminated as stdout would show it
    pub fn contents(&self) -> String {
        self.lines
            .lock()
            .iter()
            .map(|line| format!("{}\n", line))
            .collect()
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl ConsoleSink for MemoryConsole {
    fn emit(&self, text: &str) -> GrumbleResult<()> {
        self.lines.lock().push(text.to_string());
        Ok(())
    }
}
