use crate::{ClientConfig, ClientError, ClientMetrics, ConnectionHealth, RegisterValue, Result};
use register_catalog::{Address, ConfigurationError, DataType, RegisterCatalog, RegisterDefinition};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, error, info};
use word_transport::{TransportError, TransportInfo, Word, WordTransport};

/// Named register access to one device.
pub trait RegisterClient {
    /// Read a register. Fails with a typed error so callers can tell a missing name
    /// from a failed read.
    fn get(&self, name: &str) -> Result<RegisterValue>;

    /// Write a register. Every refusal and every transport failure is `false`.
    fn set(&self, name: &str, value: i64) -> bool;

    fn definition(&self, name: &str) -> Result<&RegisterDefinition>;

    /// Probe the link, reconnecting once if needed.
    fn check_connection(&self) -> bool;

    /// Release the connection. Later `get`/`set` calls fail with a connection error.
    fn close(&self);
}

#[derive(Debug, Error)]
enum WriteRefused {
    #[error("register does not exist")]
    Unknown,
    #[error("register is read-only")]
    ReadOnly,
    #[error("value outside [{min}, {max}]")]
    OutOfRange { min: i64, max: i64 },
    #[error("value does not fit in one word")]
    NotAWord,
    #[error("address {0} is not writable")]
    BadAddress(Address),
    #[error("connection unavailable")]
    Connection,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Register client over any [`WordTransport`].
///
/// The transport sits behind one mutex, held for the health probe and the request
/// that follows it, so concurrent callers queue instead of interleaving exchanges.
/// `close` takes the same lock and leaves `None` behind.
pub struct DeviceClient<T: WordTransport> {
    transport: Mutex<Option<T>>,
    catalog: RegisterCatalog,
    catalog_errors: Vec<ConfigurationError>,
    health: ConnectionHealth,
    metrics: Option<ClientMetrics>,
}

impl<T: WordTransport> DeviceClient<T> {
    /// Connect `transport` and serve the registers in `catalog`.
    pub fn new(mut transport: T, catalog: RegisterCatalog) -> Result<Self> {
        let info = transport.describe();
        transport
            .connect()
            .map_err(|e| ClientError::Connection(format!("{}: {e}", info.name)))?;
        info!(
            transport = %info.name,
            driver = %info.driver,
            registers = catalog.len(),
            "device client connected"
        );
        Ok(Self {
            transport: Mutex::new(Some(transport)),
            catalog,
            catalog_errors: Vec::new(),
            health: ConnectionHealth::default(),
            metrics: None,
        })
    }

    /// Connect `transport` and load the catalog described by `config`.
    pub fn with_transport(transport: T, config: &ClientConfig) -> Result<Self> {
        let (catalog, errors) = config.load_catalog()?;
        Ok(Self::new(transport, catalog)?
            .with_probe_address(config.probe_address)
            .with_catalog_errors(errors))
    }

    pub fn with_probe_address(mut self, address: Word) -> Self {
        let mut health = ConnectionHealth::new(address);
        if let Some(m) = &self.metrics {
            health = health.with_metrics(m.clone());
        }
        self.health = health;
        self
    }

    pub fn with_metrics(mut self, metrics: ClientMetrics) -> Self {
        metrics
            .registers_loaded
            .set(i64::try_from(self.catalog.len()).unwrap_or(i64::MAX));
        self.health =
            ConnectionHealth::new(self.health.probe_address()).with_metrics(metrics.clone());
        self.metrics = Some(metrics);
        self
    }

    /// Remember the entries rejected while the catalog was built.
    pub fn with_catalog_errors(mut self, errors: Vec<ConfigurationError>) -> Self {
        self.catalog_errors = errors;
        self
    }

    pub fn catalog(&self) -> &RegisterCatalog {
        &self.catalog
    }

    pub fn catalog_errors(&self) -> &[ConfigurationError] {
        &self.catalog_errors
    }

    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    pub fn transport_info(&self) -> Option<TransportInfo> {
        self.lock().as_ref().map(|t| t.describe())
    }

    /// Read every register in name order.
    pub fn read_all(&self) -> Vec<(String, Result<RegisterValue>)> {
        self.catalog
            .names()
            .map(|name| (name.to_string(), self.get(name)))
            .collect()
    }

    /// Write the declared default of every writable register that has one.
    /// Returns the names whose write failed.
    pub fn reset_to_defaults(&self) -> Vec<String> {
        let mut failed = Vec::new();
        for def in self.catalog.iter().filter(|d| d.is_writable()) {
            if let Some(value) = def.default_value {
                if !self.set(&def.name, value) {
                    failed.push(def.name.clone());
                }
            }
        }
        failed
    }

    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.transport.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_register(&self, name: &str) -> Result<RegisterValue> {
        let mut guard = self.lock();
        let Some(transport) = guard.as_mut() else {
            return Err(ClientError::Connection("client is closed".into()));
        };
        if !self.health.ensure_healthy(transport) {
            return Err(ClientError::Connection(format!(
                "{} unreachable after reconnect",
                transport.describe().name
            )));
        }

        let def = self
            .catalog
            .get(name)
            .ok_or_else(|| ClientError::UnknownRegister(name.to_string()))?;
        let span = def
            .address
            .span()
            .ok_or_else(|| ClientError::InvalidAddress(name.to_string()))?;
        debug!(register = name, address = %span, count = span.count(), "reading");

        let words = transport
            .read_words(span.start(), span.count())
            .map_err(|e| ClientError::read(name, e))?;
        if words.len() != usize::from(span.count()) {
            return Err(ClientError::read(
                name,
                TransportError::InvalidResponse(format!(
                    "expected {} words, got {}",
                    span.count(),
                    words.len()
                )),
            ));
        }

        // Two-word shorts keep only the first word until the device's word order is confirmed.
        Ok(match def.address {
            Address::Single(_) => RegisterValue::Word(words[0]),
            Address::Range { .. } if def.data_type == DataType::Short && words.len() == 2 => {
                RegisterValue::Word(words[0])
            }
            Address::Range { .. } => RegisterValue::Words(words),
        })
    }

    fn write_register(&self, name: &str, value: i64) -> core::result::Result<Word, WriteRefused> {
        let def = self.catalog.get(name).ok_or(WriteRefused::Unknown)?;
        if !def.is_writable() {
            return Err(WriteRefused::ReadOnly);
        }
        if let Some(range) = def.value_range {
            if !range.contains(value) {
                return Err(WriteRefused::OutOfRange {
                    min: range.min,
                    max: range.max,
                });
            }
        }
        let word = Word::try_from(value).map_err(|_| WriteRefused::NotAWord)?;
        // Multi-word registers take the value in their first word only.
        let address = match def.address {
            Address::Single(offset) => offset,
            Address::Range { start, end } if end >= start => start,
            other => return Err(WriteRefused::BadAddress(other)),
        };

        let mut guard = self.lock();
        let transport = guard.as_mut().ok_or(WriteRefused::Connection)?;
        if !self.health.ensure_healthy(transport) {
            return Err(WriteRefused::Connection);
        }
        debug!(register = name, address, value = word, "writing");
        transport.write_word(address, word)?;
        Ok(address)
    }
}

impl<T: WordTransport> RegisterClient for DeviceClient<T> {
    fn get(&self, name: &str) -> Result<RegisterValue> {
        match self.read_register(name) {
            Ok(value) => {
                info!(register = name, value = %value, "register read");
                if let Some(m) = &self.metrics {
                    m.reads.inc();
                }
                Ok(value)
            }
            Err(e) => {
                error!(register = name, error = %e, "register read failed");
                if let Some(m) = &self.metrics {
                    m.read_failures.inc();
                }
                Err(e)
            }
        }
    }

    fn set(&self, name: &str, value: i64) -> bool {
        match self.write_register(name, value) {
            Ok(address) => {
                info!(register = name, value, address, "register written");
                if let Some(m) = &self.metrics {
                    m.writes.inc();
                }
                true
            }
            Err(reason) => {
                error!(register = name, value, reason = %reason, "register write refused");
                if let Some(m) = &self.metrics {
                    m.write_failures.inc();
                }
                false
            }
        }
    }

    fn definition(&self, name: &str) -> Result<&RegisterDefinition> {
        self.catalog
            .get(name)
            .ok_or_else(|| ClientError::UnknownRegister(name.to_string()))
    }

    fn check_connection(&self) -> bool {
        match self.lock().as_mut() {
            Some(transport) => self.health.ensure_healthy(transport),
            None => false,
        }
    }

    fn close(&self) {
        if let Some(mut transport) = self.lock().take() {
            transport.close();
            info!(transport = %transport.describe().name, "device client closed");
        }
    }
}

#[cfg(feature = "modbus-tcp")]
impl DeviceClient<word_transport::ModbusTcpTransport> {
    /// Open a Modbus TCP session to `config.host:config.port`.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let transport = word_transport::ModbusTcpTransport::resolve(
            &config.host,
            config.port,
            config.unit_id,
            config.timeout(),
        )
        .map_err(|e| ClientError::Connection(format!("{}:{}: {e}", config.host, config.port)))?;
        Self::with_transport(transport, config)
    }
}

impl<T: WordTransport> Drop for DeviceClient<T> {
    fn drop(&mut self) {
        let slot = self
            .transport
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(mut transport) = slot.take() {
            transport.close();
        }
    }
}

impl<T: WordTransport> std::fmt::Debug for DeviceClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceClient")
            .field("registers", &self.catalog.len())
            .field("catalog_errors", &self.catalog_errors.len())
            .field("health", &self.health)
            .field("closed", &self.is_closed())
            .finish()
    }
}
