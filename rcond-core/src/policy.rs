//! Default handling of errors and warnings nobody intercepted
//!
//! Errors are recorded as the last error message, printed, and abort the
//! current top-level unit. Warnings are printed at once, buffered until the
//! next checkpoint, dropped, or turned into errors depending on
//! [`WarnMode`]. Buffered warnings are printed, numbered, by
//! [`Session::print_deferred_warnings`].

use crate::config::WarnMode;
use crate::session::Session;
use crate::signal::Unwind;
use rcond_types::Condition;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

const TRUNCATION_MARK: &str = " [... truncated]";

/// A warning waiting to be printed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredWarning {
    pub message: String,
    pub call: Option<String>,
}

/// Pending warnings plus a count of those that did not fit
#[derive(Debug, Default)]
pub(crate) struct WarningBuffer {
    entries: Vec<DeferredWarning>,
    suppressed: usize,
}

impl WarningBuffer {
    fn push(&mut self, warning: DeferredWarning, max: usize) {
        if self.entries.len() < max.max(1) {
            self.entries.push(warning);
        } else {
            self.suppressed += 1;
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.suppressed == 0
    }

    fn take(&mut self) -> (Vec<DeferredWarning>, usize) {
        let suppressed = std::mem::take(&mut self.suppressed);
        (std::mem::take(&mut self.entries), suppressed)
    }
}

impl Session {
    /// Default action for an unhandled error
    ///
    /// Records `message` as the last error, prints it along with any
    /// pending warnings and asks the host to abandon the top-level unit.
    pub fn default_stop(&mut self, message: &str, call: Option<&str>) -> Unwind {
        let message = self.truncate_message(message);
        self.errmsg.set(message.clone());

        let text = self.format_error(&message, call);
        self.console.write_err(&text);
        tracing::debug!(%message, "unhandled error, aborting unit");

        if !self.warnings.is_empty() {
            self.console.write_err("In addition: ");
            self.print_deferred_warnings();
        }
        Unwind::TopLevel
    }

    /// Default action for an unhandled warning
    ///
    /// `Err` only in [`WarnMode::Error`], where the warning is re-raised as
    /// an error.
    pub fn default_warn(&mut self, message: &str, call: Option<&str>) -> Result<(), Unwind> {
        let message = self.truncate_message(message);
        match self.options.warn {
            WarnMode::Ignore => {
                tracing::debug!(%message, "warning ignored");
                Ok(())
            }
            WarnMode::Deferred => {
                let max = self.options.max_warnings;
                self.warnings.push(
                    DeferredWarning {
                        message,
                        call: call.map(str::to_string),
                    },
                    max,
                );
                Ok(())
            }
            WarnMode::Immediate => {
                let text = match call {
                    Some(call) if self.options.show_error_calls => {
                        format!("Warning in {} : {}\n", call, message)
                    }
                    _ => format!("Warning: {}\n", message),
                };
                self.console.write_err(&text);
                Ok(())
            }
            WarnMode::Error => {
                let converted = Condition::error(format!("(converted from warning) {}", message))
                    .with_call_opt(call.map(str::to_string));
                Err(self.stop(&converted))
            }
        }
    }

    /// Print and clear buffered warnings
    ///
    /// Does nothing when the buffer is empty.
    pub fn print_deferred_warnings(&mut self) {
        if self.warnings.is_empty() {
            return;
        }
        let (entries, suppressed) = self.warnings.take();
        let text = self.format_deferred(&entries, suppressed);
        self.console.write_err(&text);
        tracing::debug!(count = entries.len(), suppressed, "deferred warnings flushed");
        self.last_warnings = entries;
    }

    pub fn deferred_warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Warnings printed by the most recent flush
    pub fn last_warnings(&self) -> &[DeferredWarning] {
        &self.last_warnings
    }

    pub(crate) fn truncate_message(&self, message: &str) -> String {
        let limit = self.options.message_length;
        match message.char_indices().nth(limit) {
            Some((cut, _)) => format!("{}{}", &message[..cut], TRUNCATION_MARK),
            None => message.to_string(),
        }
    }

    fn format_error(&self, message: &str, call: Option<&str>) -> String {
        match call {
            Some(call) if self.options.show_error_calls => {
                format!("Error in {} : {}\n", call, message)
            }
            _ => format!("Error: {}\n", message),
        }
    }

    fn format_deferred(&self, entries: &[DeferredWarning], suppressed: usize) -> String {
        let mut text = String::new();
        let header = if entries.len() == 1 {
            "Warning message:"
        } else {
            "Warning messages:"
        };
        let _ = writeln!(text, "{}", header);
        for (i, warning) in entries.iter().enumerate() {
            match &warning.call {
                Some(call) if self.options.show_error_calls => {
                    let _ = writeln!(text, "{}: In {} : {}", i + 1, call, warning.message);
                }
                _ => {
                    let _ = writeln!(text, "{}: {}", i + 1, warning.message);
                }
            }
        }
        match suppressed {
            0 => {}
            1 => {
                let _ = writeln!(text, "There was 1 additional warning suppressed");
            }
            n => {
                let _ = writeln!(text, "There were {} additional warnings suppressed", n);
            }
        }
        text
    }
}
