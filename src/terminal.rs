//! Terminal rendering of playback: stands in for the avatar and the two text
//! lines when running from the command line.

use crate::defaults::{IDLE_ANIMATION, STATUS_DONE, SYMBOL_PREFIX};
use crate::error::Result;
use crate::playback::{AnimationSink, StatusSink};
use owo_colors::OwoColorize;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

/// Prints clips, captions and status changes to stdout.
///
/// The countdown refreshes its label every tick; only changes are printed.
pub struct TerminalSink {
    color: bool,
    last_status: Mutex<Option<String>>,
}

impl TerminalSink {
    pub fn new(color: bool) -> Self {
        Self {
            color,
            last_status: Mutex::new(None),
        }
    }

    fn write_line(&self, line: &str) -> Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }

    /// Returns `true` if `text` differs from the previous status.
    fn status_changed(&self, text: &str) -> bool {
        let mut last = self.last_status.lock().unwrap_or_else(PoisonError::into_inner);
        if last.as_deref() == Some(text) {
            return false;
        }
        *last = Some(text.to_string());
        true
    }

    pub fn render_animation(&self, name: &str) -> String {
        let label = match name.strip_prefix(SYMBOL_PREFIX) {
            Some(letter) => format!("[{letter}]"),
            None if name == IDLE_ANIMATION => "(idle)".to_string(),
            None => format!("<{name}>"),
        };
        if self.color {
            format!("  {}", label.bold().cyan())
        } else {
            format!("  {label}")
        }
    }

    pub fn render_caption(&self, text: &str) -> String {
        if self.color {
            format!("{} {}", "caption:".dimmed(), text.trim_start().bold())
        } else {
            format!("caption: {}", text.trim_start())
        }
    }

    pub fn render_status(&self, text: &str) -> String {
        if !self.color {
            return format!("status: {text}");
        }
        if text == STATUS_DONE {
            format!("{} {}", "status:".dimmed(), text.green())
        } else if text.ends_with("...") {
            format!("{} {}", "status:".dimmed(), text.yellow())
        } else {
            format!("{} {}", "status:".dimmed(), text)
        }
    }
}

impl AnimationSink for TerminalSink {
    fn play_animation(&self, name: &str) -> Result<()> {
        self.write_line(&self.render_animation(name))
    }

    fn name(&self) -> &'static str {
        "terminal"
    }
}

impl StatusSink for TerminalSink {
    fn set_status(&self, text: &str) -> Result<()> {
        if !self.status_changed(text) || text.is_empty() {
            return Ok(());
        }
        self.write_line(&self.render_status(text))
    }

    fn set_caption(&self, text: &str) -> Result<()> {
        self.write_line(&self.render_caption(text))
    }

    fn name(&self) -> &'static str {
        "terminal"
    }
}
