//! User-visible output channels
//!
//! The condition system writes formatted errors and warnings here. Hosts
//! pick where that text ends up.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

/// Sink for text the user is meant to see
pub trait Console {
    /// Regular output
    fn write_out(&mut self, text: &str);

    /// Error and warning output
    fn write_err(&mut self, text: &str);
}

/// Console bound to the process's stdout and stderr
#[derive(Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn write_out(&mut self, text: &str) {
        let mut out = std::io::stdout().lock();
        // A closed stdout is not something the condition system can report
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }

    fn write_err(&mut self, text: &str) {
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(text.as_bytes());
        let _ = err.flush();
    }
}

/// Console that records everything written to it
///
/// Clones share the same buffers, so a test can keep one handle while the
/// session owns another.
#[derive(Debug, Clone, Default)]
pub struct CapturedConsole {
    out: Rc<RefCell<String>>,
    err: Rc<RefCell<String>>,
}

impl CapturedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn out(&self) -> String {
        self.out.borrow().clone()
    }

    pub fn err(&self) -> String {
        self.err.borrow().clone()
    }

    /// Drain and return the error channel
    pub fn take_err(&self) -> String {
        std::mem::take(&mut *self.err.borrow_mut())
    }

    pub fn take_out(&self) -> String {
        std::mem::take(&mut *self.out.borrow_mut())
    }
}

impl Console for CapturedConsole {
    fn write_out(&mut self, text: &str) {
        self.out.borrow_mut().push_str(text);
    }

    fn write_err(&mut self, text: &str) {
        self.err.borrow_mut().push_str(text);
    }
}
