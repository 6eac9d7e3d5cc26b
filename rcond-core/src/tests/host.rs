//! Minimal host constructs built the way an evaluator would use the session.

use crate::*;
use serde_json::Value;
use std::rc::Rc;

pub fn captured(options: SessionOptions) -> (Session, CapturedConsole) {
    let console = CapturedConsole::new();
    (Session::with_console(options, console.clone()), console)
}

/// Run `body`; if the unwind lands here, hand back its value
fn land(
    session: &mut Session,
    frame: FrameId,
    result: std::result::Result<Value, Unwind>,
) -> std::result::Result<Value, Unwind> {
    match result {
        Err(Unwind::Frame { target, value }) if target == frame => {
            session.unwind_to(frame);
            session.exit_extent(frame);
            Ok(value)
        }
        other => {
            session.exit_extent(frame);
            other
        }
    }
}

pub fn try_catch(
    session: &mut Session,
    classes: &[&str],
    handler: Action,
    body: impl FnOnce(&mut Session) -> std::result::Result<Value, Unwind>,
) -> std::result::Result<Value, Unwind> {
    let frame = session.enter_extent();
    let actions = vec![Rc::clone(&handler); classes.len()];
    session
        .install_handlers(classes, actions, Value::Null, frame, HandlerMode::Exiting)
        .expect("one action per class");
    let result = body(session);
    land(session, frame, result)
}

pub fn with_calling_handlers(
    session: &mut Session,
    classes: &[&str],
    handler: Action,
    body: impl FnOnce(&mut Session) -> std::result::Result<Value, Unwind>,
) -> std::result::Result<Value, Unwind> {
    let frame = session.enter_extent();
    let actions = vec![Rc::clone(&handler); classes.len()];
    session
        .install_handlers(classes, actions, Value::Null, frame, HandlerMode::Calling)
        .expect("one action per class");
    let result = body(session);
    land(session, frame, result)
}

pub fn with_restart(
    session: &mut Session,
    name: &str,
    body: impl FnOnce(&mut Session) -> std::result::Result<Value, Unwind>,
) -> std::result::Result<Value, Unwind> {
    let frame = session.enter_extent();
    session
        .add_restart(RestartEntry::payload(name, Value::Null), frame)
        .expect("well-formed payload");
    let result = body(session);
    land(session, frame, result)
}
