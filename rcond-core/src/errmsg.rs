//! Last error message slot

/// Text of the most recently raised error
///
/// Starts empty; every write replaces the previous value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorMessageState {
    message: String,
}

impl ErrorMessageState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> &str {
        &self.message
    }

    pub fn set(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }
}
