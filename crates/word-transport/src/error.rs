use thiserror::Error;

pub type Result<T, E = TransportError> = core::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("not connected")]
    NotConnected,
    #[error("timeout")]
    Timeout,
    #[error("I/O error: {0}")]
    Io(String),
    #[error("device returned exception: {0}")]
    Exception(String),
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    /// True when the device answered with an error response, as opposed to the
    /// link itself failing.
    pub fn is_protocol(&self) -> bool {
        matches!(self, TransportError::Exception(_))
    }

    /// True for faults of the link (disconnect, timeout, socket errors).
    pub fn is_link_fault(&self) -> bool {
        matches!(
            self,
            TransportError::NotConnected | TransportError::Timeout | TransportError::Io(_)
        )
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                TransportError::Timeout
            }
            std::io::ErrorKind::NotConnected => TransportError::NotConnected,
            _ => TransportError::Io(err.to_string()),
        }
    }
}
