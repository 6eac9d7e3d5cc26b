//! Shared types for rcond
//!
//! This crate provides the values that flow between the condition system
//! and its host evaluator: frame identifiers and condition records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Class tag carried by every condition
pub const CONDITION: &str = "condition";
/// Class tag of error conditions
pub const ERROR: &str = "error";
/// Class tag of warning conditions
pub const WARNING: &str = "warning";
/// Class tag of message conditions
pub const MESSAGE: &str = "message";

/// Identity of a dynamic extent or stack registration
///
/// Frame ids are handed out by a session and never reused within it, so a
/// stale id can always be told apart from a live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameId(pub u64);

impl FrameId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for FrameId {
    fn from(id: u64) -> Self {
        FrameId(id)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A signaled condition
///
/// Classes are ordered most specific first. The condition system only ever
/// matches against them; it never interprets the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub classes: Vec<String>,
    pub message: String,
    #[serde(default)]
    pub call: Option<String>,
}

impl Condition {
    pub fn new<I, S>(classes: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            classes: classes.into_iter().map(Into::into).collect(),
            message: message.into(),
            call: None,
        }
    }

    /// `simpleError`, `error`, `condition`
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(["simpleError", ERROR, CONDITION], message)
    }

    /// `simpleWarning`, `warning`, `condition`
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(["simpleWarning", WARNING, CONDITION], message)
    }

    /// `simpleMessage`, `message`, `condition`
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(["simpleMessage", MESSAGE, CONDITION], message)
    }

    pub fn with_call(mut self, call: impl Into<String>) -> Self {
        self.call = Some(call.into());
        self
    }

    pub fn with_call_opt(mut self, call: Option<String>) -> Self {
        self.call = call;
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// True if any of `classes` is carried by this condition
    pub fn matches_any<S: AsRef<str>>(&self, classes: &[S]) -> bool {
        classes.iter().any(|c| self.has_class(c.as_ref()))
    }

    pub fn is_error(&self) -> bool {
        self.has_class(ERROR)
    }

    pub fn is_warning(&self) -> bool {
        self.has_class(WARNING)
    }

    pub fn is_message(&self) -> bool {
        self.has_class(MESSAGE)
    }
}
