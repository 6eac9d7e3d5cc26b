//! # rcond-core
//!
//! Dynamically scoped condition handling with resumable restarts.
//!
//! Code signals a [`Condition`]; handlers registered further out on the
//! dynamic call chain decide what happens next:
//! - a *calling* handler runs at the signal site and may let the search
//!   continue, or transfer control by invoking a restart
//! - an *exiting* handler always unwinds to the extent that installed it
//!
//! When nothing intercepts an error or warning, the session's default
//! policy applies: errors abort the current top-level unit and are kept as
//! the last error message, warnings are printed or buffered.
//!
//! Control transfer is explicit. Every operation that may jump returns
//! [`Unwind`] on its error side, and the host propagates it until it
//! reaches the named extent.
//!
//! ## Example
//!
//! ```
//! use rcond_core::{action, Condition, HandlerMode, Session, Unwind};
//! use serde_json::json;
//!
//! let mut session = Session::default();
//! let frame = session.enter_extent();
//! session
//!     .install_handlers(
//!         &["error"],
//!         vec![action(|_, cond| Ok(json!(cond.message)))],
//!         json!(null),
//!         frame,
//!         HandlerMode::Exiting,
//!     )
//!     .unwrap();
//!
//! let unwind = session.stop(&Condition::error("boom"));
//! assert_eq!(unwind, Unwind::Frame { target: frame, value: json!("boom") });
//! session.unwind_to(frame);
//! session.exit_extent(frame);
//! ```

pub mod config;
pub mod console;
pub mod errmsg;
pub mod error;
pub mod handler;
pub mod policy;
pub mod restart;
pub mod session;
pub mod signal;
pub mod stack;

#[cfg(test)]
mod tests;

// Re-export key types
pub use config::{ConfigError, SessionOptions, WarnMode};
pub use console::{CapturedConsole, Console, StdConsole};
pub use errmsg::ErrorMessageState;
pub use error::{ConditionError, Result};
pub use handler::{action, Action, ConditionStack, HandlerEntry, HandlerMode, HandlerSnapshot};
pub use policy::DeferredWarning;
pub use restart::{RestartEntry, RestartHandle, RestartSnapshot, RestartStack, ABORT};
pub use session::Session;
pub use signal::{SignalOutcome, Unwind, MUFFLE_MESSAGE, MUFFLE_WARNING};
pub use stack::{ScopedStack, StackSnapshot};

// Re-export shared types from rcond-types
pub use rcond_types::{Condition, FrameId};
