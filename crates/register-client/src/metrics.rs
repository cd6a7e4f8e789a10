use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

#[derive(Clone)]
pub struct ClientMetrics {
    pub reads: IntCounter,
    pub read_failures: IntCounter,
    pub writes: IntCounter,
    pub write_failures: IntCounter,
    pub reconnects: IntCounter,
    pub registers_loaded: IntGauge,
}

#[derive(Clone)]
pub struct MetricsHub {
    pub registry: Registry,
    pub client: ClientMetrics,
}

fn counter(name: &str, help: &str) -> Result<IntCounter, String> {
    IntCounter::new(name, help).map_err(|e| format!("metrics init error: {e}"))
}

impl MetricsHub {
    pub fn new() -> Result<Self, String> {
        let registry = Registry::new();
        let client = ClientMetrics {
            reads: counter("regmap_reads_total", "Successful register reads")?,
            read_failures: counter("regmap_read_failures_total", "Failed register reads")?,
            writes: counter("regmap_writes_total", "Successful register writes")?,
            write_failures: counter("regmap_write_failures_total", "Rejected or failed writes")?,
            reconnects: counter("regmap_reconnects_total", "Reconnect attempts after a failed probe")?,
            registers_loaded: IntGauge::new("regmap_registers_loaded", "Registers in the catalog")
                .map_err(|e| format!("metrics init error: {e}"))?,
        };
        let _ = registry.register(Box::new(client.reads.clone()));
        let _ = registry.register(Box::new(client.read_failures.clone()));
        let _ = registry.register(Box::new(client.writes.clone()));
        let _ = registry.register(Box::new(client.write_failures.clone()));
        let _ = registry.register(Box::new(client.reconnects.clone()));
        let _ = registry.register(Box::new(client.registers_loaded.clone()));
        Ok(Self { registry, client })
    }

    pub fn encode_text(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            return format!("error encoding metrics: {e}");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}
