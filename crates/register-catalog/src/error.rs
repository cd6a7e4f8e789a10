use thiserror::Error;

/// A problem with one register entry or one configuration source.
///
/// These are collected, never fatal on their own: the offending entry is skipped and
/// loading continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("register {register}: missing required field `{field}`")]
    MissingField {
        register: String,
        field: &'static str,
    },
    #[error("register {register}: invalid `{field}`: {reason}")]
    InvalidField {
        register: String,
        field: &'static str,
        reason: String,
    },
    #[error("register {register}: malformed entry: {reason}")]
    Malformed { register: String, reason: String },
    #[error("register {register}: already defined in {first}")]
    Duplicate { register: String, first: String },
    #[error("{path}: {reason}")]
    Source { path: String, reason: String },
}

impl ConfigurationError {
    /// Register the error is about, if it concerns a single entry.
    pub fn register(&self) -> Option<&str> {
        match self {
            ConfigurationError::MissingField { register, .. }
            | ConfigurationError::InvalidField { register, .. }
            | ConfigurationError::Malformed { register, .. }
            | ConfigurationError::Duplicate { register, .. } => Some(register),
            ConfigurationError::Source { .. } => None,
        }
    }

    pub(crate) fn unreadable(path: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigurationError::Source {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown strategy: {0}")]
pub struct UnknownStrategyError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_register_and_field() {
        let err = ConfigurationError::MissingField {
            register: "HAND_ID".into(),
            field: "address",
        };
        assert_eq!(
            err.to_string(),
            "register HAND_ID: missing required field `address`"
        );
        assert_eq!(err.register(), Some("HAND_ID"));
        assert_eq!(ConfigurationError::unreadable("a.json", "eof").register(), None);
        assert_eq!(
            UnknownStrategyError("remote".into()).to_string(),
            "unknown strategy: remote"
        );
    }
}
