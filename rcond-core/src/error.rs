/// Misuse of the condition system by its host
///
/// These are raised synchronously at the offending call. Hosts normally turn
/// them into error conditions of their own.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConditionError {
    #[error("bad handler data: {classes} classes but {actions} handlers")]
    BadHandlerData { classes: usize, actions: usize },

    #[error("bad restart: {reason}")]
    BadRestart { reason: String },

    #[error("restart '{name}' not on stack")]
    RestartNotFound { name: String },
}

pub type Result<T> = std::result::Result<T, ConditionError>;

impl ConditionError {
    pub(crate) fn bad_restart(reason: impl Into<String>) -> Self {
        ConditionError::BadRestart {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = ConditionError::BadHandlerData {
            classes: 2,
            actions: 1,
        };
        assert_eq!(err.to_string(), "bad handler data: 2 classes but 1 handlers");

        let err = ConditionError::RestartNotFound {
            name: "retry".into(),
        };
        assert_eq!(err.to_string(), "restart 'retry' not on stack");
    }
}
