//! Script evaluation on top of a [`Session`].
//!
//! Every construct that installs handlers or restarts opens its own dynamic
//! extent and closes it on the way out, whether the body returned normally
//! or an unwind is passing through.

use crate::script::{HandlerClause, RestartClause, Stmt, Unit};
use rcond_core::{
    action, Action, Condition, ConditionError, FrameId, HandlerMode, RestartEntry, Session, Unwind,
};
use serde_json::{json, Value};
use std::rc::Rc;

type Exec = Result<Value, Unwind>;

/// How a top-level unit ended
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome {
    Completed(Value),
    Aborted,
}

/// Evaluator state for one dynamic context
pub struct Evaluator<'s> {
    session: &'s mut Session,
    call: Option<String>,
    condition: Option<Condition>,
}

impl<'s> Evaluator<'s> {
    pub fn new(session: &'s mut Session) -> Self {
        Self {
            session,
            call: None,
            condition: None,
        }
    }

    /// Evaluate statements in order; the value is the last statement's
    pub fn eval_block(&mut self, stmts: &[Stmt]) -> Exec {
        let mut value = Value::Null;
        for stmt in stmts {
            value = self.eval(stmt)?;
        }
        Ok(value)
    }

    fn eval(&mut self, stmt: &Stmt) -> Exec {
        match stmt {
            Stmt::Print(text) => {
                self.session.console_mut().write_out(&format!("{}\n", text));
                Ok(Value::Null)
            }
            Stmt::PrintValue(body) => {
                let value = self.eval_block(body)?;
                self.session.console_mut().write_out(&format!("{}\n", value));
                Ok(value)
            }
            Stmt::Value(value) => Ok(value.clone()),
            Stmt::Stop(message) => Err(self.raise(message.clone())),
            Stmt::Warning(message) => {
                let condition = Condition::warning(message.as_str()).with_call_opt(self.call.clone());
                self.session.warning(&condition)?;
                Ok(json!(message))
            }
            Stmt::Message(message) => {
                let condition = Condition::message(message.as_str()).with_call_opt(self.call.clone());
                if self.session.message(&condition)? {
                    self.session.console_mut().write_err(&format!("{}\n", message));
                }
                Ok(Value::Null)
            }
            Stmt::Signal { classes, message } => {
                let condition = Condition::new(classes.iter().map(String::as_str), message.as_str())
                    .with_call_opt(self.call.clone());
                self.session.signal_condition(&condition)?;
                Ok(Value::Null)
            }
            Stmt::TryCatch {
                body,
                handlers,
                finally,
            } => self.eval_try_catch(body, handlers, finally),
            Stmt::WithCallingHandlers { body, handlers } => {
                self.eval_with_handlers(body, handlers, HandlerMode::Calling)
            }
            Stmt::WithRestarts { body, restarts } => self.eval_with_restarts(body, restarts),
            Stmt::InvokeRestart { name, args } => self.eval_invoke_restart(name, args.clone()),
            Stmt::Call { name, body } => {
                let saved = self.call.replace(format!("{}()", name));
                let result = self.eval_block(body);
                self.call = saved;
                result
            }
            Stmt::PrintCondition => match &self.condition {
                Some(condition) => {
                    let text = format!("{}\n", condition.message);
                    self.session.console_mut().write_out(&text);
                    Ok(json!(condition.message))
                }
                None => Err(self.raise("no condition is being handled".to_string())),
            },
            Stmt::PrintRestarts => {
                let names = self.session.compute_restarts().join(" ");
                self.session.console_mut().write_out(&format!("{}\n", names));
                Ok(Value::Null)
            }
            Stmt::SetErrorMessage(message) => {
                self.session.set_error_message(message.as_str());
                Ok(Value::Null)
            }
            Stmt::PrintErrorMessage => {
                let text = format!("{}\n", self.session.error_message());
                self.session.console_mut().write_out(&text);
                Ok(Value::Null)
            }
            Stmt::FlushWarnings => {
                self.session.print_deferred_warnings();
                Ok(Value::Null)
            }
        }
    }

    /// Raise an error attributed to the current call
    fn raise(&mut self, message: String) -> Unwind {
        let condition = Condition::error(message).with_call_opt(self.call.clone());
        self.session.stop(&condition)
    }

    fn usage_error(&mut self, err: ConditionError) -> Unwind {
        tracing::debug!(error = %err, "condition system rejected request");
        self.raise(err.to_string())
    }

    fn handler_actions(&self, handlers: &[HandlerClause]) -> Vec<Action> {
        handlers
            .iter()
            .map(|h| clause_action(Rc::new(h.body.clone()), self.call.clone()))
            .collect()
    }

    fn install(&mut self, handlers: &[HandlerClause], frame: FrameId, mode: HandlerMode) -> Result<(), Unwind> {
        let classes: Vec<&str> = handlers.iter().map(|h| h.class.as_str()).collect();
        let actions = self.handler_actions(handlers);
        let scope = json!({ "call": self.call });
        match self
            .session
            .install_handlers(&classes, actions, scope, frame, mode)
        {
            Ok(_) => Ok(()),
            Err(err) => {
                self.session.exit_extent(frame);
                Err(self.usage_error(err))
            }
        }
    }

    fn eval_try_catch(&mut self, body: &[Stmt], handlers: &[HandlerClause], finally: &[Stmt]) -> Exec {
        let frame = self.session.enter_extent();
        self.install(handlers, frame, HandlerMode::Exiting)?;
        let result = self.eval_block(body);
        let result = self.land(frame, result);
        if !finally.is_empty() {
            // A transfer out of the finally block replaces the body's outcome
            self.eval_block(finally)?;
        }
        result
    }

    fn eval_with_handlers(&mut self, body: &[Stmt], handlers: &[HandlerClause], mode: HandlerMode) -> Exec {
        let frame = self.session.enter_extent();
        self.install(handlers, frame, mode)?;
        let result = self.eval_block(body);
        self.land(frame, result)
    }

    /// Establish `restarts` around `body`, the first clause innermost
    fn eval_with_restarts(&mut self, body: &[Stmt], restarts: &[RestartClause]) -> Exec {
        let Some((outer, inner)) = restarts.split_last() else {
            return self.eval_block(body);
        };
        let frame = self.session.enter_extent();
        let payload = RestartEntry::payload(&outer.name, json!(frame.as_u64()));
        if let Err(err) = self.session.add_restart(payload, frame) {
            self.session.exit_extent(frame);
            return Err(self.usage_error(err));
        }

        let result = self.eval_with_restarts(body, inner);
        match result {
            Err(Unwind::Frame { target, value }) if target == frame => {
                self.session.unwind_to(frame);
                self.session.exit_extent(frame);
                tracing::debug!(restart = %outer.name, "restart taken");
                if outer.body.is_empty() {
                    Ok(value)
                } else {
                    self.eval_block(&outer.body)
                }
            }
            other => {
                self.session.exit_extent(frame);
                other
            }
        }
    }

    fn eval_invoke_restart(&mut self, name: &str, args: Value) -> Exec {
        let Some(restart) = self.session.find_restart(name) else {
            return Err(self.raise(format!("no 'restart' '{}' found", name)));
        };
        match self.session.invoke_restart(&restart, args) {
            Ok(unwind) => Err(unwind),
            Err(err) => Err(self.usage_error(err)),
        }
    }

    /// Close `frame`, catching an unwind aimed at it
    fn land(&mut self, frame: FrameId, result: Exec) -> Exec {
        match result {
            Err(Unwind::Frame { target, value }) if target == frame => {
                self.session.unwind_to(frame);
                self.session.exit_extent(frame);
                Ok(value)
            }
            other => {
                self.session.exit_extent(frame);
                other
            }
        }
    }
}

/// Handler action evaluating a clause body with the condition in scope
fn clause_action(body: Rc<Vec<Stmt>>, call: Option<String>) -> Action {
    action(move |session, condition| {
        let mut eval = Evaluator {
            session,
            call: call.clone(),
            condition: Some(condition.clone()),
        };
        eval.eval_block(&body)
    })
}

/// Run one top-level unit, then flush warnings and reset the session
pub fn run_unit(session: &mut Session, unit: &Unit) -> UnitOutcome {
    if let Some(name) = &unit.name {
        tracing::debug!(unit = %name, "running unit");
    }
    let result = Evaluator::new(session).eval_block(&unit.body);
    let outcome = match result {
        Ok(value) => UnitOutcome::Completed(value),
        Err(Unwind::TopLevel) => UnitOutcome::Aborted,
        Err(Unwind::Frame { target, .. }) => {
            tracing::error!(%target, "unwind escaped to top level");
            UnitOutcome::Aborted
        }
    };
    session.reset_to_top_level();
    session.print_deferred_warnings();
    outcome
}
