//! Evaluation sessions
//!
//! A [`Session`] owns every piece of condition-system state: both stacks,
//! the open dynamic extents, the deferred warning buffer and the last error
//! message. Independent sessions share nothing.

use crate::config::SessionOptions;
use crate::console::{Console, StdConsole};
use crate::errmsg::ErrorMessageState;
use crate::error::{ConditionError, Result};
use crate::handler::{Action, ConditionStack, HandlerEntry, HandlerMode, HandlerSnapshot};
use crate::policy::{DeferredWarning, WarningBuffer};
use crate::restart::{RestartSnapshot, RestartStack};
use rcond_types::FrameId;
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

/// Stack state recorded when an extent was entered
struct Extent {
    frame: FrameId,
    handlers: HandlerSnapshot,
    restarts: RestartSnapshot,
}

/// One isolated evaluation session
pub struct Session {
    pub(crate) handlers: ConditionStack,
    pub(crate) restarts: RestartStack,
    extents: Vec<Extent>,
    pub(crate) warnings: WarningBuffer,
    pub(crate) last_warnings: Vec<DeferredWarning>,
    pub(crate) errmsg: ErrorMessageState,
    pub(crate) options: SessionOptions,
    pub(crate) console: Box<dyn Console>,
    next_frame: u64,
}

impl Session {
    /// Create a session writing to stdout/stderr
    pub fn new(options: SessionOptions) -> Self {
        Self::with_console(options, StdConsole)
    }

    pub fn with_console(options: SessionOptions, console: impl Console + 'static) -> Self {
        Self {
            handlers: ConditionStack::new("handler"),
            restarts: RestartStack::new("restart"),
            extents: Vec::new(),
            warnings: WarningBuffer::default(),
            last_warnings: Vec::new(),
            errmsg: ErrorMessageState::new(),
            options,
            console: Box::new(console),
            next_frame: 1,
        }
    }

    pub(crate) fn fresh_frame(&mut self) -> FrameId {
        let frame = FrameId::new(self.next_frame);
        self.next_frame += 1;
        frame
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut SessionOptions {
        &mut self.options
    }

    pub fn console_mut(&mut self) -> &mut dyn Console {
        self.console.as_mut()
    }

    // Dynamic extents

    /// Open a dynamic extent and return its frame
    ///
    /// The frame can be used as the target of exiting handlers and as the
    /// establishment point of restarts.
    pub fn enter_extent(&mut self) -> FrameId {
        let frame = self.fresh_frame();
        self.extents.push(Extent {
            frame,
            handlers: self.handlers.snapshot(),
            restarts: self.restarts.snapshot(),
        });
        tracing::trace!(%frame, depth = self.extents.len(), "enter extent");
        frame
    }

    /// Close the innermost extent, dropping every registration made inside it
    ///
    /// # Panics
    ///
    /// Panics if `frame` is not the innermost open extent.
    pub fn exit_extent(&mut self, frame: FrameId) {
        match self.extents.last() {
            Some(extent) if extent.frame == frame => {}
            other => {
                let innermost = other.map(|e| e.frame);
                tracing::error!(%frame, ?innermost, "exit of non-innermost extent");
                panic!(
                    "extent {} exited while {:?} is innermost",
                    frame, innermost
                );
            }
        }
        if let Some(extent) = self.extents.pop() {
            self.handlers.restore_to(extent.handlers);
            self.restarts.restore_to(extent.restarts);
            tracing::trace!(%frame, depth = self.extents.len(), "exit extent");
        }
    }

    /// Land an unwind at `frame`
    ///
    /// Every extent opened after `frame` is discarded and both stacks go back
    /// to their state when `frame` was entered. `frame` itself stays open.
    ///
    /// # Panics
    ///
    /// Panics if `frame` is not an open extent.
    pub fn unwind_to(&mut self, frame: FrameId) {
        let Some(index) = self.extents.iter().rposition(|e| e.frame == frame) else {
            tracing::error!(%frame, "unwind to unknown extent");
            panic!("unwind to extent {} which is not open", frame);
        };
        let discarded = self.extents.len() - index - 1;
        self.extents.truncate(index + 1);
        let extent = &self.extents[index];
        self.handlers.restore_to(extent.handlers.clone());
        self.restarts.restore_to(extent.restarts.clone());
        tracing::debug!(%frame, discarded, "unwound");
    }

    /// Stacks recorded when `frame` was entered, if it is still open
    pub(crate) fn extent_snapshots(&self, frame: FrameId) -> Option<(HandlerSnapshot, RestartSnapshot)> {
        self.extents
            .iter()
            .rev()
            .find(|e| e.frame == frame)
            .map(|e| (e.handlers.clone(), e.restarts.clone()))
    }

    pub fn is_open(&self, frame: FrameId) -> bool {
        self.extents.iter().any(|e| e.frame == frame)
    }

    pub fn extent_depth(&self) -> usize {
        self.extents.len()
    }

    /// Drop every extent and registration
    pub fn reset_to_top_level(&mut self) {
        self.extents.clear();
        self.handlers.clear();
        self.restarts.clear();
        tracing::debug!("reset to top level");
    }

    // Condition stack

    /// Push a single handler registration
    pub fn push_handler(&mut self, entry: HandlerEntry) -> FrameId {
        let frame = self.fresh_frame();
        self.handlers.push(frame, entry);
        frame
    }

    /// Pop the handler registered under `frame`, which must be on top
    pub fn pop_handler(&mut self, frame: FrameId) -> Rc<HandlerEntry> {
        self.handlers.pop(frame)
    }

    /// Register one handler per class, all sharing `target` and `mode`
    ///
    /// The first class ends up on top and so takes priority. Returns the
    /// handler stack as it was before the call.
    pub fn install_handlers<S: AsRef<str>>(
        &mut self,
        classes: &[S],
        actions: Vec<Action>,
        parent_scope: Value,
        target: FrameId,
        mode: HandlerMode,
    ) -> Result<HandlerSnapshot> {
        if classes.len() != actions.len() {
            return Err(ConditionError::BadHandlerData {
                classes: classes.len(),
                actions: actions.len(),
            });
        }
        let previous = self.handlers.snapshot();
        for (class, action) in classes.iter().zip(actions).rev() {
            let entry = HandlerEntry::new(class.as_ref(), action, target, mode)
                .with_parent_scope(parent_scope.clone());
            self.push_handler(entry);
        }
        tracing::debug!(count = classes.len(), %target, ?mode, "handlers installed");
        Ok(previous)
    }

    /// Put the handler stack back to a saved state
    pub fn reset_handlers(&mut self, snapshot: HandlerSnapshot) {
        self.handlers.restore_to(snapshot);
    }

    pub fn handler_snapshot(&self) -> HandlerSnapshot {
        self.handlers.snapshot()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Handler at 1-based `position` from the top
    pub fn handler_at(&self, position: usize) -> Option<Rc<HandlerEntry>> {
        self.handlers.get(position).map(|(_, entry)| entry)
    }

    // Last error message

    pub fn error_message(&self) -> &str {
        self.errmsg.get()
    }

    pub fn set_error_message(&mut self, message: impl Into<String>) {
        self.errmsg.set(message);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("handlers", &self.handlers.len())
            .field("restarts", &self.restarts.len())
            .field("extents", &self.extents.len())
            .field("deferred_warnings", &self.warnings.len())
            .field("options", &self.options)
            .finish()
    }
}
