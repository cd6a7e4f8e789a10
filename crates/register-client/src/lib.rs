//! register-client: read and write device registers by name
//!
//! [`DeviceClient`] resolves a register name through a [`RegisterCatalog`], checks that the
//! transport is usable (reconnecting once if it is not), translates the register's address
//! into one word-level request and decodes the answer.
//!
//! `get` reports failures as typed [`ClientError`]s. `set` answers with a plain `bool` so
//! callers can probe and retry writes without matching on error kinds.

mod error;
pub use error::{ClientError, Result};

mod config;
pub use config::{ClientConfig, DEFAULT_PORT, DEFAULT_PROBE_ADDRESS, DEFAULT_TIMEOUT_MS};

mod value;
pub use value::RegisterValue;

mod health;
pub use health::ConnectionHealth;

mod metrics;
pub use metrics::{ClientMetrics, MetricsHub};

mod client;
pub use client::{DeviceClient, RegisterClient};

pub use register_catalog::{
    AccessType, Address, ConfigurationError, DataType, RegisterCatalog, RegisterDefinition,
    StrategyRegistry,
};
pub use word_transport::{TransportError, WordTransport};
