//! Condition signaling
//!
//! [`Session::signal`] walks the handler stack from the most recently
//! installed registration down. Calling handlers run in place and the walk
//! continues past them; the first matching exiting handler ends the walk
//! with a transfer to its target. While any handler runs, its own
//! registration and everything above it are hidden from the stack, so
//! conditions signaled from inside the handler only reach handlers further
//! down.

use crate::handler::{HandlerEntry, HandlerMode, HandlerSnapshot};
use crate::restart::RestartEntry;
use crate::session::Session;
use rcond_types::{Condition, FrameId};
use serde_json::Value;

/// Name of the restart established around every warning
pub const MUFFLE_WARNING: &str = "muffleWarning";
/// Name of the restart established around every message
pub const MUFFLE_MESSAGE: &str = "muffleMessage";

/// Non-local transfer of control requested by the condition system
///
/// Hosts propagate this outward (as the `Err` side of a `Result`) until it
/// reaches the extent it names, then call [`Session::unwind_to`].
#[derive(Debug, Clone, PartialEq)]
pub enum Unwind {
    /// Resume at `target` with `value`
    Frame { target: FrameId, value: Value },
    /// Abandon the current top-level unit
    TopLevel,
}

impl Unwind {
    pub fn target(&self) -> Option<FrameId> {
        match self {
            Unwind::Frame { target, .. } => Some(*target),
            Unwind::TopLevel => None,
        }
    }

    /// True if this unwind lands at `frame`
    pub fn lands_at(&self, frame: FrameId) -> bool {
        self.target() == Some(frame)
    }
}

/// Result of a handler search that did not transfer control on its own
#[derive(Debug, Clone, PartialEq)]
pub enum SignalOutcome {
    /// An exiting handler ran; the caller must unwind to `target`
    Handled { value: Value, target: FrameId },
    /// No exiting handler matched
    Unhandled,
}

impl SignalOutcome {
    /// Turn a handled outcome into the unwind it calls for
    pub fn into_unwind(self) -> Option<Unwind> {
        match self {
            SignalOutcome::Handled { value, target } => Some(Unwind::Frame { target, value }),
            SignalOutcome::Unhandled => None,
        }
    }
}

impl Session {
    /// Search the handler stack for `condition`
    ///
    /// `Err` means a handler requested a transfer itself (by invoking a
    /// restart or unwinding); it takes precedence over the rest of the search.
    pub fn signal(&mut self, condition: &Condition) -> Result<SignalOutcome, Unwind> {
        let mut cursor = self.handlers.snapshot();
        while let Some((frame, entry, below)) = cursor.split() {
            if entry.matches(condition) {
                tracing::debug!(
                    handler = %frame,
                    mode = ?entry.mode,
                    classes = ?condition.classes,
                    "handler matched"
                );
                let value = self.run_handler(&entry, &below, condition)?;
                if entry.mode == HandlerMode::Exiting {
                    return Ok(SignalOutcome::Handled {
                        value,
                        target: entry.target,
                    });
                }
            }
            cursor = below;
        }
        tracing::debug!(classes = ?condition.classes, "condition unhandled");
        Ok(SignalOutcome::Unhandled)
    }

    /// Run a matched handler's action with itself and everything above it
    /// hidden
    ///
    /// An exiting action sees both stacks as they were when its target was
    /// entered, so nothing established between the target and the signal
    /// site can divert the transfer.
    fn run_handler(
        &mut self,
        entry: &HandlerEntry,
        below: &HandlerSnapshot,
        condition: &Condition,
    ) -> Result<Value, Unwind> {
        let saved_handlers = self.handlers.snapshot();
        let saved_restarts = self.restarts.snapshot();

        let at_target = match entry.mode {
            HandlerMode::Exiting => self.extent_snapshots(entry.target),
            HandlerMode::Calling => None,
        };
        match at_target {
            Some((handlers, restarts)) => {
                // A target entered after the registration still must not
                // expose the handler to itself
                let handlers = if handlers.len() <= below.len() {
                    handlers
                } else {
                    below.clone()
                };
                self.handlers.restore_to(handlers);
                self.restarts.restore_to(restarts);
            }
            None => self.handlers.restore_to(below.clone()),
        }

        let result = (entry.action)(self, condition);
        self.handlers.restore_to(saved_handlers);
        self.restarts.restore_to(saved_restarts);
        result
    }

    /// Signal with no default action
    pub fn signal_condition(&mut self, condition: &Condition) -> Result<(), Unwind> {
        match self.signal(condition)?.into_unwind() {
            Some(unwind) => Err(unwind),
            None => Ok(()),
        }
    }

    /// Raise an error
    ///
    /// Never returns normally: the result is either a handler's transfer or,
    /// when nothing handled the error, an abort of the top-level unit.
    pub fn stop(&mut self, condition: &Condition) -> Unwind {
        let message = self.truncate_message(&condition.message);
        self.errmsg.set(message);
        match self.signal(condition) {
            Err(unwind) => unwind,
            Ok(SignalOutcome::Handled { value, target }) => Unwind::Frame { target, value },
            Ok(SignalOutcome::Unhandled) => {
                self.default_stop(&condition.message, condition.call.as_deref())
            }
        }
    }

    /// Raise a warning
    ///
    /// A `muffleWarning` restart is available to handlers for the duration
    /// of the signal; invoking it skips the default warning action.
    pub fn warning(&mut self, condition: &Condition) -> Result<(), Unwind> {
        match self.signal_with_muffle(condition, MUFFLE_WARNING)? {
            Some(SignalOutcome::Unhandled) => {
                self.default_warn(&condition.message, condition.call.as_deref())
            }
            Some(handled) => Err(handled.into_unwind().unwrap_or(Unwind::TopLevel)),
            None => Ok(()),
        }
    }

    /// Raise a message
    ///
    /// Returns `true` if the message should be shown, i.e. no handler
    /// invoked `muffleMessage`. Showing it is up to the caller.
    pub fn message(&mut self, condition: &Condition) -> Result<bool, Unwind> {
        match self.signal_with_muffle(condition, MUFFLE_MESSAGE)? {
            Some(SignalOutcome::Unhandled) => Ok(true),
            Some(handled) => Err(handled.into_unwind().unwrap_or(Unwind::TopLevel)),
            None => Ok(false),
        }
    }

    /// Signal inside an extent carrying a muffle restart
    ///
    /// `None` means the restart was invoked.
    fn signal_with_muffle(
        &mut self,
        condition: &Condition,
        restart: &str,
    ) -> Result<Option<SignalOutcome>, Unwind> {
        let frame = self.enter_extent();
        let registration = self.fresh_frame();
        self.restarts.push(
            registration,
            RestartEntry {
                name: restart.to_string(),
                description: String::new(),
                payload: RestartEntry::payload(restart, Value::Null),
                establishment: frame,
            },
        );

        let result = self.signal(condition);
        self.unwind_to(frame);
        self.exit_extent(frame);

        match result {
            Ok(outcome) => Ok(Some(outcome)),
            Err(unwind) if unwind.lands_at(frame) => {
                tracing::debug!(restart, "condition muffled");
                Ok(None)
            }
            Err(unwind) => Err(unwind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::CapturedConsole;
    use crate::handler::{action, HandlerEntry};
    use crate::SessionOptions;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn session() -> (Session, CapturedConsole) {
        let console = CapturedConsole::new();
        (
            Session::with_console(SessionOptions::default(), console.clone()),
            console,
        )
    }

    #[test]
    fn test_no_handlers_is_unhandled() {
        let (mut session, _) = session();
        assert_eq!(
            session.signal(&Condition::error("boom")).unwrap(),
            SignalOutcome::Unhandled
        );
    }

    #[test]
    fn test_disjoint_classes_are_unhandled() {
        let (mut session, _) = session();
        let frame = session.enter_extent();
        session.push_handler(HandlerEntry::new(
            "myCondition",
            action(|_, _| Ok(json!("never"))),
            frame,
            HandlerMode::Exiting,
        ));
        assert_eq!(
            session.signal(&Condition::warning("w")).unwrap(),
            SignalOutcome::Unhandled
        );
    }

    #[test]
    fn test_classless_condition_never_matches() {
        let (mut session, _) = session();
        let frame = session.enter_extent();
        session.push_handler(
            HandlerEntry::new("condition", action(|_, _| Ok(Value::Null)), frame, HandlerMode::Exiting),
        );
        let bare = Condition::new(Vec::<String>::new(), "nothing");
        assert_eq!(session.signal(&bare).unwrap(), SignalOutcome::Unhandled);
    }

    #[test]
    fn test_calling_then_exiting_chain() {
        let (mut session, _) = session();
        let log = Rc::new(RefCell::new(Vec::new()));

        let outer = session.enter_extent();
        let seen = Rc::clone(&log);
        session.push_handler(HandlerEntry::new(
            "error",
            action(move |_, _| {
                seen.borrow_mut().push("H2");
                Ok(json!("from H2"))
            }),
            outer,
            HandlerMode::Exiting,
        ));

        let inner = session.enter_extent();
        let seen = Rc::clone(&log);
        session.push_handler(HandlerEntry::new(
            "error",
            action(move |_, _| {
                seen.borrow_mut().push("H1");
                Ok(Value::Null)
            }),
            inner,
            HandlerMode::Calling,
        ));

        let outcome = session.signal(&Condition::error("boom")).unwrap();
        assert_eq!(*log.borrow(), vec!["H1", "H2"]);
        assert_eq!(
            outcome,
            SignalOutcome::Handled {
                value: json!("from H2"),
                target: outer
            }
        );
    }

    #[test]
    fn test_exiting_targets_its_own_frame() {
        let (mut session, _) = session();
        let target = session.enter_extent();
        session.push_handler(HandlerEntry::new(
            "error",
            action(|_, _| Ok(Value::Null)),
            target,
            HandlerMode::Exiting,
        ));
        let above = session.enter_extent();
        session.push_handler(HandlerEntry::new(
            "warning",
            action(|_, _| Ok(Value::Null)),
            above,
            HandlerMode::Exiting,
        ));

        let outcome = session.signal(&Condition::error("boom")).unwrap();
        assert_eq!(
            outcome.into_unwind().and_then(|u| u.target()),
            Some(target)
        );
    }

    #[test]
    fn test_handler_runs_with_itself_excluded() {
        let (mut session, _) = session();
        let depth_seen = Rc::new(RefCell::new(Vec::new()));

        let frame = session.enter_extent();
        let seen = Rc::clone(&depth_seen);
        session.push_handler(HandlerEntry::new(
            "error",
            action(move |s, _| {
                seen.borrow_mut().push(("bottom", s.handler_count()));
                Ok(Value::Null)
            }),
            frame,
            HandlerMode::Calling,
        ));
        let seen = Rc::clone(&depth_seen);
        session.push_handler(HandlerEntry::new(
            "error",
            action(move |s, cond| {
                seen.borrow_mut().push(("top", s.handler_count()));
                // Re-signaling from here must only reach the handler below
                s.signal(cond)?;
                Ok(Value::Null)
            }),
            frame,
            HandlerMode::Calling,
        ));

        session.signal(&Condition::error("boom")).unwrap();
        assert_eq!(
            *depth_seen.borrow(),
            vec![("top", 1), ("bottom", 0), ("bottom", 0)]
        );
        assert_eq!(session.handler_count(), 2);
    }

    #[test]
    fn test_calling_handler_unwind_stops_search() {
        let (mut session, _) = session();
        let reached = Rc::new(RefCell::new(false));

        let outer = session.enter_extent();
        let flag = Rc::clone(&reached);
        session.push_handler(HandlerEntry::new(
            "error",
            action(move |_, _| {
                *flag.borrow_mut() = true;
                Ok(Value::Null)
            }),
            outer,
            HandlerMode::Exiting,
        ));

        let restart_point = session.enter_extent();
        let handle = session
            .add_restart(RestartEntry::payload("useValue", Value::Null), restart_point)
            .unwrap();
        session.push_handler(HandlerEntry::new(
            "error",
            action(move |s, _| {
                Err(s.invoke_restart(&handle, json!(7)).expect("restart is live"))
            }),
            restart_point,
            HandlerMode::Calling,
        ));

        let err = session.signal(&Condition::error("boom")).unwrap_err();
        assert_eq!(
            err,
            Unwind::Frame {
                target: restart_point,
                value: json!(7)
            }
        );
        assert!(!*reached.borrow());
        assert_eq!(session.handler_count(), 2);
    }

    #[test]
    fn test_signal_condition_has_no_default() {
        let (mut session, console) = session();
        session
            .signal_condition(&Condition::new(["custom", "condition"], "hi"))
            .unwrap();
        assert_eq!(console.err(), "");
        assert_eq!(session.error_message(), "");
    }

    #[test]
    fn test_stop_records_message_even_when_handled() {
        let (mut session, console) = session();
        let frame = session.enter_extent();
        session.push_handler(HandlerEntry::new(
            "error",
            action(|_, _| Ok(json!("caught"))),
            frame,
            HandlerMode::Exiting,
        ));

        let unwind = session.stop(&Condition::error("handled boom"));
        assert!(unwind.lands_at(frame));
        assert_eq!(session.error_message(), "handled boom");
        assert_eq!(console.err(), "");
    }

    #[test]
    fn test_muffled_warning_skips_default() {
        let (mut session, _) = session();
        let frame = session.enter_extent();
        session.push_handler(HandlerEntry::new(
            "warning",
            action(|s, _| {
                let muffle = s.find_restart(MUFFLE_WARNING).expect("muffle restart");
                Err(s.invoke_restart(&muffle, Value::Null).expect("live"))
            }),
            frame,
            HandlerMode::Calling,
        ));

        session.warning(&Condition::warning("quiet")).unwrap();
        assert_eq!(session.deferred_warning_count(), 0);
        assert_eq!(session.restart_count(), 0);
        assert_eq!(session.extent_depth(), 1);
    }

    #[test]
    fn test_message_delivery() {
        let (mut session, _) = session();
        assert!(session.message(&Condition::message("hello")).unwrap());

        let frame = session.enter_extent();
        session.push_handler(HandlerEntry::new(
            "message",
            action(|s, _| {
                let muffle = s.find_restart(MUFFLE_MESSAGE).expect("muffle restart");
                Err(s.invoke_restart(&muffle, Value::Null).expect("live"))
            }),
            frame,
            HandlerMode::Calling,
        ));
        assert!(!session.message(&Condition::message("hidden")).unwrap());
    }
}
