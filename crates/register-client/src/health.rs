use crate::{ClientMetrics, DEFAULT_PROBE_ADDRESS};
use tracing::{info, warn};
use word_transport::{Word, WordTransport};

/// Probe-then-reconnect-once liveness check run before every register operation.
#[derive(Clone)]
pub struct ConnectionHealth {
    probe_address: Word,
    metrics: Option<ClientMetrics>,
}

impl Default for ConnectionHealth {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_ADDRESS)
    }
}

impl ConnectionHealth {
    pub fn new(probe_address: Word) -> Self {
        Self {
            probe_address,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: ClientMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn probe_address(&self) -> Word {
        self.probe_address
    }

    /// Read one word at the probe address; on any failure close and reconnect once.
    ///
    /// Costs at most one probe and one connect. Never returns an error.
    pub fn ensure_healthy<T: WordTransport + ?Sized>(&self, transport: &mut T) -> bool {
        let cause = match transport.read_words(self.probe_address, 1) {
            Ok(_) => return true,
            Err(e) => e,
        };
        warn!(
            address = self.probe_address,
            error = %cause,
            protocol = cause.is_protocol(),
            "health probe failed, reconnecting"
        );
        if let Some(m) = &self.metrics {
            m.reconnects.inc();
        }
        transport.close();
        match transport.connect() {
            Ok(()) => {
                info!(transport = %transport.describe().name, "reconnected");
                true
            }
            Err(e) => {
                warn!(error = %e, "reconnect failed");
                false
            }
        }
    }
}

impl std::fmt::Debug for ConnectionHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHealth")
            .field("probe_address", &self.probe_address)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}
