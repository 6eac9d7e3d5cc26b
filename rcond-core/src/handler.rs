//! Handler registrations

use crate::session::Session;
use crate::signal::Unwind;
use crate::stack::{ScopedStack, StackSnapshot};
use rcond_types::{Condition, FrameId};
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

/// How a matched handler hands control back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerMode {
    /// Runs at the signal site; the search continues if it returns
    Calling,
    /// Always transfers control to the registration's target after running
    Exiting,
}

/// Code run when a handler matches
///
/// The action receives the session so it can signal, install handlers or
/// invoke restarts. Returning `Err` requests a transfer of control that
/// overrides whatever the search would have done next.
pub type Action = Rc<dyn Fn(&mut Session, &Condition) -> Result<Value, Unwind>>;

/// One entry of the condition stack
#[derive(Clone)]
pub struct HandlerEntry {
    pub classes: Vec<String>,
    pub action: Action,
    /// Extent that an exiting handler unwinds to
    pub target: FrameId,
    pub mode: HandlerMode,
    /// Opaque scope the handler was established in
    pub parent_scope: Value,
}

impl HandlerEntry {
    pub fn new(class: impl Into<String>, action: Action, target: FrameId, mode: HandlerMode) -> Self {
        Self {
            classes: vec![class.into()],
            action,
            target,
            mode,
            parent_scope: Value::Null,
        }
    }

    pub fn with_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classes = classes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_parent_scope(mut self, scope: Value) -> Self {
        self.parent_scope = scope;
        self
    }

    pub fn matches(&self, condition: &Condition) -> bool {
        condition.matches_any(&self.classes)
    }
}

impl fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("classes", &self.classes)
            .field("target", &self.target)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

pub type ConditionStack = ScopedStack<HandlerEntry>;
pub type HandlerSnapshot = StackSnapshot<HandlerEntry>;

/// Wrap a closure as an [`Action`]
pub fn action<F>(f: F) -> Action
where
    F: Fn(&mut Session, &Condition) -> Result<Value, Unwind> + 'static,
{
    Rc::new(f)
}
