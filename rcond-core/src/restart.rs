//! Restart registrations and invocation
//!
//! A restart is a named point execution can resume from. Registrations
//! follow the same scope discipline as handlers; invoking one produces an
//! [`Unwind`] aimed at the extent that established it.

use crate::error::{ConditionError, Result};
use crate::session::Session;
use crate::signal::Unwind;
use crate::stack::{ScopedStack, StackSnapshot};
use rcond_types::FrameId;
use serde_json::{json, Value};
use std::rc::Rc;

/// Name of the restart that abandons the current top-level unit
pub const ABORT: &str = "abort";

/// One entry of the restart stack
#[derive(Debug, Clone, PartialEq)]
pub struct RestartEntry {
    pub name: String,
    pub description: String,
    /// The full registration payload, `[name, recipient, ...]`
    pub payload: Value,
    /// Extent control returns to when the restart is invoked
    pub establishment: FrameId,
}

impl RestartEntry {
    /// Validate a registration payload
    ///
    /// The payload must be a list of at least two slots whose first slot is
    /// the restart name. An optional third string slot is the description.
    pub fn from_payload(payload: Value, establishment: FrameId) -> Result<Self> {
        let slots = payload
            .as_array()
            .ok_or_else(|| ConditionError::bad_restart("payload is not a list"))?;
        if slots.len() < 2 {
            return Err(ConditionError::bad_restart(format!(
                "payload has {} slot(s), need at least 2",
                slots.len()
            )));
        }
        let name = slots[0]
            .as_str()
            .ok_or_else(|| ConditionError::bad_restart("restart name is not a string"))?
            .to_string();
        let description = slots
            .get(2)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            name,
            description,
            payload,
            establishment,
        })
    }

    /// Well-formed payload for `name` with the given recipient data
    pub fn payload(name: &str, recipient: Value) -> Value {
        json!([name, recipient])
    }

    /// Host data in the recipient slot
    ///
    /// Carried opaquely. Invocation always delivers its arguments to the
    /// establishment extent, whatever this holds.
    pub fn recipient(&self) -> &Value {
        &self.payload[1]
    }
}

pub type RestartStack = ScopedStack<RestartEntry>;
pub type RestartSnapshot = StackSnapshot<RestartEntry>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum HandleKind {
    Registered(FrameId),
    Abort,
}

/// Reference to a restart as returned by lookup or registration
///
/// A handle stays valid only while its registration is on the stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RestartHandle {
    name: String,
    kind: HandleKind,
}

impl RestartHandle {
    fn registered(name: String, frame: FrameId) -> Self {
        Self {
            name,
            kind: HandleKind::Registered(frame),
        }
    }

    fn abort() -> Self {
        Self {
            name: ABORT.to_string(),
            kind: HandleKind::Abort,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registration frame, or `None` for the built-in abort restart
    pub fn frame(&self) -> Option<FrameId> {
        match self.kind {
            HandleKind::Registered(frame) => Some(frame),
            HandleKind::Abort => None,
        }
    }

    pub fn is_abort(&self) -> bool {
        self.kind == HandleKind::Abort
    }
}

impl Session {
    /// Register a restart established at `establishment`
    ///
    /// Malformed payloads are rejected here and never reach the stack.
    pub fn add_restart(&mut self, payload: Value, establishment: FrameId) -> Result<RestartHandle> {
        let entry = RestartEntry::from_payload(payload, establishment)?;
        let name = entry.name.clone();
        let frame = self.fresh_frame();
        self.restarts.push(frame, entry);
        tracing::debug!(restart = %name, %frame, %establishment, "restart added");
        Ok(RestartHandle::registered(name, frame))
    }

    /// Pop a restart, which must be the most recently added one
    pub fn pop_restart(&mut self, restart: &RestartHandle) -> Option<Rc<RestartEntry>> {
        restart.frame().map(|frame| self.restarts.pop(frame))
    }

    /// Restart at 1-based `position` from the top
    ///
    /// One past the last registration is the built-in abort restart.
    pub fn get_restart(&self, position: usize) -> Option<RestartHandle> {
        let len = self.restarts.len();
        match position {
            0 => None,
            p if p <= len => self
                .restarts
                .get(p)
                .map(|(frame, entry)| RestartHandle::registered(entry.name.clone(), frame)),
            p if p == len + 1 => Some(RestartHandle::abort()),
            _ => None,
        }
    }

    /// Innermost restart called `name`
    pub fn find_restart(&self, name: &str) -> Option<RestartHandle> {
        self.restarts
            .iter()
            .find(|(_, entry)| entry.name == name)
            .map(|(frame, entry)| RestartHandle::registered(entry.name.clone(), frame))
            .or_else(|| (name == ABORT).then(RestartHandle::abort))
    }

    /// Names of every visible restart, innermost first, ending with `abort`
    pub fn compute_restarts(&self) -> Vec<String> {
        self.restarts
            .iter()
            .map(|(_, entry)| entry.name.clone())
            .chain(std::iter::once(ABORT.to_string()))
            .collect()
    }

    pub fn restart_count(&self) -> usize {
        self.restarts.len()
    }

    /// Registration behind a handle, if it is still on the stack
    pub fn restart_entry(&self, restart: &RestartHandle) -> Option<Rc<RestartEntry>> {
        restart.frame().and_then(|frame| self.restarts.find(frame))
    }

    /// Invoke a restart with `args`
    ///
    /// On success the returned [`Unwind`] must be propagated by the caller
    /// until it reaches the restart's establishment extent, which receives
    /// `args` as the unwind value.
    pub fn invoke_restart(&mut self, restart: &RestartHandle, args: Value) -> Result<Unwind> {
        let frame = match restart.kind {
            HandleKind::Abort => {
                tracing::debug!("abort restart invoked");
                return Ok(Unwind::TopLevel);
            }
            HandleKind::Registered(frame) => frame,
        };
        let entry = self.restarts.find(frame).ok_or_else(|| {
            tracing::debug!(restart = %restart.name, %frame, "restart no longer on stack");
            ConditionError::RestartNotFound {
                name: restart.name.clone(),
            }
        })?;
        tracing::debug!(
            restart = %entry.name,
            target = %entry.establishment,
            recipient = %entry.recipient(),
            "restart invoked"
        );
        Ok(Unwind::Frame {
            target: entry.establishment,
            value: args,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_payload_is_rejected_before_the_stack() {
        let mut session = Session::default();
        let frame = session.enter_extent();

        let err = session.add_restart(json!(["lonely"]), frame).unwrap_err();
        assert!(matches!(err, ConditionError::BadRestart { .. }));
        assert_eq!(session.restart_count(), 0);

        assert!(session.add_restart(json!("retry"), frame).is_err());
        assert!(session.add_restart(json!([1, 2]), frame).is_err());
        assert_eq!(session.restart_count(), 0);
    }

    #[test]
    fn test_description_slot() {
        let entry =
            RestartEntry::from_payload(json!(["retry", null, "Try again"]), FrameId::new(1)).unwrap();
        assert_eq!(entry.name, "retry");
        assert_eq!(entry.description, "Try again");

        let entry = RestartEntry::from_payload(RestartEntry::payload("skip", json!(3)), FrameId::new(1))
            .unwrap();
        assert_eq!(entry.description, "");
    }

    #[test]
    fn test_positional_lookup_ends_with_abort() {
        let mut session = Session::default();
        let frame = session.enter_extent();
        session.add_restart(RestartEntry::payload("outer", Value::Null), frame).unwrap();
        session.add_restart(RestartEntry::payload("inner", Value::Null), frame).unwrap();

        assert!(session.get_restart(0).is_none());
        assert_eq!(session.get_restart(1).unwrap().name(), "inner");
        assert_eq!(session.get_restart(2).unwrap().name(), "outer");
        assert!(session.get_restart(3).unwrap().is_abort());
        assert!(session.get_restart(4).is_none());
        assert_eq!(session.compute_restarts(), vec!["inner", "outer", "abort"]);
    }

    #[test]
    fn test_find_by_name_prefers_innermost() {
        let mut session = Session::default();
        let outer = session.enter_extent();
        session.add_restart(RestartEntry::payload("retry", Value::Null), outer).unwrap();
        let inner = session.enter_extent();
        session.add_restart(RestartEntry::payload("retry", Value::Null), inner).unwrap();

        let found = session.find_restart("retry").unwrap();
        let entry = session.restart_entry(&found).unwrap();
        assert_eq!(entry.establishment, inner);
        assert!(session.find_restart("missing").is_none());
        assert!(session.find_restart(ABORT).unwrap().is_abort());
    }

    #[test]
    fn test_invoke_targets_establishment() {
        let mut session = Session::default();
        let frame = session.enter_extent();
        let handle = session.add_restart(RestartEntry::payload("use", Value::Null), frame).unwrap();

        let unwind = session.invoke_restart(&handle, json!([42])).unwrap();
        assert_eq!(
            unwind,
            Unwind::Frame {
                target: frame,
                value: json!([42])
            }
        );
    }

    #[test]
    fn test_recipient_does_not_redirect_invocation() {
        let mut session = Session::default();
        let outer = session.enter_extent();
        let inner = session.enter_extent();
        let handle = session
            .add_restart(RestartEntry::payload("use", json!(outer.as_u64())), inner)
            .unwrap();

        let entry = session.restart_entry(&handle).unwrap();
        assert_eq!(entry.recipient(), &json!(outer.as_u64()));
        assert_eq!(
            session.invoke_restart(&handle, json!(1)).unwrap().target(),
            Some(inner)
        );
    }

    #[test]
    fn test_invoke_after_scope_exit_fails() {
        let mut session = Session::default();
        let frame = session.enter_extent();
        let handle = session.add_restart(RestartEntry::payload("gone", Value::Null), frame).unwrap();
        session.exit_extent(frame);

        let err = session.invoke_restart(&handle, Value::Null).unwrap_err();
        assert_eq!(
            err,
            ConditionError::RestartNotFound {
                name: "gone".into()
            }
        );
    }

    #[test]
    fn test_invoke_abort() {
        let mut session = Session::default();
        let abort = session.get_restart(1).unwrap();
        assert_eq!(session.invoke_restart(&abort, Value::Null).unwrap(), Unwind::TopLevel);
    }

    #[test]
    fn test_pop_restart() {
        let mut session = Session::default();
        let frame = session.enter_extent();
        let handle = session.add_restart(RestartEntry::payload("r", Value::Null), frame).unwrap();
        assert!(session.pop_restart(&handle).is_some());
        assert_eq!(session.restart_count(), 0);
        assert!(session.invoke_restart(&handle, Value::Null).is_err());
    }
}
