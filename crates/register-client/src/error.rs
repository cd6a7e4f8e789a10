use register_catalog::{ConfigurationError, UnknownStrategyError};
use thiserror::Error;
use word_transport::TransportError;

pub type Result<T, E = ClientError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport is unusable even after one reconnect attempt, or the client is closed.
    #[error("connection unavailable: {0}")]
    Connection(String),
    #[error("unknown register: {0}")]
    UnknownRegister(String),
    #[error("reading {register} failed: {source}")]
    Read {
        register: String,
        #[source]
        source: TransportError,
    },
    #[error("register {0} has no readable address")]
    InvalidAddress(String),
    #[error("register catalog rejected: {} invalid entries", .errors.len())]
    Catalog { errors: Vec<ConfigurationError> },
    #[error(transparent)]
    UnknownStrategy(#[from] UnknownStrategyError),
    #[error("config {path}: {reason}")]
    Config { path: String, reason: String },
}

impl ClientError {
    pub(crate) fn read(register: &str, source: TransportError) -> Self {
        ClientError::Read {
            register: register.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn read_error_keeps_cause() {
        let err = ClientError::read("HAND_ID", TransportError::Timeout);
        assert_eq!(err.to_string(), "reading HAND_ID failed: timeout");
        assert!(err.source().is_some());
    }

    #[test]
    fn catalog_error_counts_entries() {
        let err = ClientError::Catalog {
            errors: vec![ConfigurationError::MissingField {
                register: "X".into(),
                field: "address",
            }],
        };
        assert_eq!(err.to_string(), "register catalog rejected: 1 invalid entries");
    }
}
