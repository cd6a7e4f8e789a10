use crate::{ClientError, Result};
use register_catalog::{RegisterCatalog, StrategyRegistry, DEFAULT_STRATEGY};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 6000;
pub const DEFAULT_TIMEOUT_MS: u64 = 3000;
/// Word read by the health probe. Reading it has no side effects on the device.
pub const DEFAULT_PROBE_ADDRESS: u16 = 0;

/// Connection and catalog settings for one device session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub unit_id: u8,
    pub timeout_ms: u64,
    pub probe_address: u16,
    pub sources: Vec<PathBuf>,
    pub strategy: String,
    /// Refuse to start when any catalog entry is rejected.
    pub strict_catalog: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "192.168.11.210".to_string(),
            port: DEFAULT_PORT,
            unit_id: 1,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            probe_address: DEFAULT_PROBE_ADDRESS,
            sources: vec![PathBuf::from("configs/registers")],
            strategy: DEFAULT_STRATEGY.to_string(),
            strict_catalog: false,
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_unit_id(mut self, unit_id: u8) -> Self {
        self.unit_id = unit_id;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_probe_address(mut self, address: u16) -> Self {
        self.probe_address = address;
        self
    }

    pub fn with_sources(mut self, sources: Vec<PathBuf>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = strategy.into();
        self
    }

    pub fn with_strict_catalog(mut self, strict: bool) -> Self {
        self.strict_catalog = strict;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Read a profile from a `.json`, `.yaml` or `.yml` file. Absent keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_err = |reason: String| ClientError::Config {
            path: path.display().to_string(),
            reason,
        };
        let text = fs::read_to_string(path).map_err(|e| config_err(e.to_string()))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&text).map_err(|e| config_err(e.to_string())),
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&text).map_err(|e| config_err(e.to_string()))
            }
            _ => Err(config_err("expected a .json, .yaml or .yml file".into())),
        }
    }

    /// Build the register catalog named by `strategy` and `sources`.
    ///
    /// Rejected entries are returned next to the catalog, or turned into
    /// [`ClientError::Catalog`] when `strict_catalog` is set.
    pub fn load_catalog(
        &self,
    ) -> Result<(RegisterCatalog, Vec<register_catalog::ConfigurationError>)> {
        let registry = StrategyRegistry::with_defaults();
        let (catalog, errors) = registry.build(&self.strategy, &self.sources)?;
        if !errors.is_empty() {
            if self.strict_catalog {
                return Err(ClientError::Catalog { errors });
            }
            warn!(
                rejected = errors.len(),
                registers = catalog.len(),
                "continuing with a partial register catalog"
            );
        }
        Ok((catalog, errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(rel: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../register-catalog/tests/fixtures")
            .join(rel)
    }

    fn scratch(name: &str, body: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("regmap-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn defaults_match_device() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.port, 6000);
        assert_eq!(cfg.unit_id, 1);
        assert_eq!(cfg.timeout(), Duration::from_secs(3));
        assert_eq!(cfg.strategy, "directory");
        assert!(!cfg.strict_catalog);
    }

    #[test]
    fn builders_override() {
        let cfg = ClientConfig::new("10.0.0.2", 502)
            .with_unit_id(3)
            .with_timeout_ms(250)
            .with_strategy("file");
        assert_eq!(cfg.host, "10.0.0.2");
        assert_eq!(cfg.port, 502);
        assert_eq!(cfg.unit_id, 3);
        assert_eq!(cfg.timeout_ms, 250);
        assert_eq!(cfg.strategy, "file");
    }

    #[test]
    fn yaml_profile_fills_defaults() {
        let path = scratch("bench.yaml", "host: 127.0.0.1\nport: 1502\n");
        let cfg = ClientConfig::load(&path).unwrap();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 1502);
        assert_eq!(cfg.timeout_ms, DEFAULT_TIMEOUT_MS);
    }

    #[test]
    fn json_profile_and_bad_extension() {
        let path = scratch("bench.json", r#"{"unit_id": 7, "strict_catalog": true}"#);
        let cfg = ClientConfig::load(&path).unwrap();
        assert_eq!(cfg.unit_id, 7);
        assert!(cfg.strict_catalog);

        let path = scratch("bench.toml", "port = 1");
        assert!(matches!(
            ClientConfig::load(&path),
            Err(ClientError::Config { .. })
        ));
    }

    #[test]
    fn strict_policy_rejects_partial_catalog() {
        let lenient = ClientConfig::default().with_sources(vec![fixture("partial")]);
        let (catalog, errors) = lenient.load_catalog().unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(errors.len(), 1);

        let strict = lenient.with_strict_catalog(true);
        match strict.load_catalog() {
            Err(ClientError::Catalog { errors }) => assert_eq!(errors.len(), 1),
            other => panic!("expected catalog error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_strategy_surfaces() {
        let cfg = ClientConfig::default().with_strategy("remote");
        assert!(matches!(
            cfg.load_catalog(),
            Err(ClientError::UnknownStrategy(_))
        ));
    }
}
