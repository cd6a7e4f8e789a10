//! word-transport: word-addressed request/response transports
//!
//! This crate defines the contract a register-mapped device client needs from its
//! protocol collaborator: connect, close, read a run of 16-bit words, write one word.
//! Backends are feature-gated. The default build enables a `mock` backend so that
//! binaries and tests run on any host without a device attached.

mod types;
pub use types::{TransportInfo, Word, WordSpan, MAX_WORDS_PER_READ};

mod error;
pub use error::{Result, TransportError};

mod traits;
pub use traits::WordTransport;

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockHandle, MockTransport};

#[cfg(feature = "modbus-tcp")]
mod modbus;

#[cfg(feature = "modbus-tcp")]
pub use modbus::{ModbusTcpTransport, DEFAULT_MODBUS_PORT, DEFAULT_TIMEOUT};
