use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::{error, info};

use register_catalog::{RegisterCatalog, StrategyRegistry};
use register_client::{ClientConfig, DeviceClient, MetricsHub, RegisterClient, RegisterValue};
use word_transport::{MockHandle, MockTransport, ModbusTcpTransport, WordTransport};

#[derive(Parser, Debug)]
#[command(
    name = "regctl",
    version,
    about = "Read and write device registers by name",
    disable_help_subcommand = true
)]
struct Cli {
    /// Use the in-memory backend seeded with catalog defaults
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    mock: bool,

    /// Device host (overrides the profile)
    #[arg(long, global = true)]
    host: Option<String>,

    #[arg(long, global = true)]
    port: Option<u16>,

    #[arg(long, global = true)]
    unit_id: Option<u8>,

    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Word read by the connection health check
    #[arg(long, global = true)]
    probe_address: Option<u16>,

    /// Register source (directory or file); repeatable
    #[arg(long = "config", global = true)]
    config: Vec<PathBuf>,

    /// Catalog strategy: directory, ftp or file
    #[arg(long, global = true)]
    strategy: Option<String>,

    /// JSON or YAML client profile, applied before the flags above
    #[arg(long, global = true)]
    profile: Option<PathBuf>,

    /// Print Prometheus metrics when the command finishes
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List registers with address, type and access
    List,
    /// Build the catalog and report rejected entries
    Validate {
        /// Dump the resolved definitions as JSON
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// Show one register definition
    Info { name: String },
    /// Read one register
    Get { name: String },
    /// Write one register
    Set {
        name: String,
        #[arg(allow_hyphen_values = true)]
        value: i64,
    },
    /// Read every register
    Dump {
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// Poll one register
    Watch {
        name: String,
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
        /// Number of samples; runs until interrupted when absent
        #[arg(long)]
        count: Option<u64>,
    },
    /// Write the declared default of every writable register
    ResetDefaults {
        /// Confirm writing to the device
        #[arg(long, action = ArgAction::SetTrue)]
        yes: bool,
    },
    /// Print register names, one per line
    Keys,
}

fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();
    let cfg = resolve_config(&cli)?;
    let hub = if cli.metrics {
        Some(MetricsHub::new().map_err(anyhow::Error::msg)?)
    } else {
        None
    };

    let outcome = match &cli.command {
        Commands::List => catalog_list(&cfg),
        Commands::Validate { json } => catalog_validate(&cfg, *json),
        Commands::Info { name } => register_info(&cfg, name),
        Commands::Keys => catalog_keys(&cfg),
        Commands::Get { name } => with_client(&cfg, cli.mock, hub.as_ref(), |c| {
            let value = c.get(name)?;
            println!("{name}\t{value}");
            Ok(())
        }),
        Commands::Set { name, value } => with_client(&cfg, cli.mock, hub.as_ref(), |c| {
            if !c.set(name, *value) {
                anyhow::bail!("write {value} to {name} refused");
            }
            println!("ok: {name} = {value}");
            Ok(())
        }),
        Commands::Dump { json } => {
            with_client(&cfg, cli.mock, hub.as_ref(), |c| register_dump(c, *json))
        }
        Commands::Watch {
            name,
            interval_ms,
            count,
        } => with_client(&cfg, cli.mock, hub.as_ref(), |c| {
            register_watch(c, name, Duration::from_millis(*interval_ms), *count);
            Ok(())
        }),
        Commands::ResetDefaults { yes } => {
            if !*yes {
                anyhow::bail!("reset-defaults writes to the device; pass --yes to confirm");
            }
            with_client(&cfg, cli.mock, hub.as_ref(), |c| {
                let failed = c.reset_to_defaults();
                if failed.is_empty() {
                    println!("ok: defaults written");
                    Ok(())
                } else {
                    anyhow::bail!("defaults not written for: {}", failed.join(", "))
                }
            })
        }
    };

    if let Some(hub) = &hub {
        print!("{}", hub.encode_text());
    }
    outcome
}

fn setup_tracing() {
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn resolve_config(cli: &Cli) -> Result<ClientConfig> {
    let mut cfg = match &cli.profile {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("loading profile {}", path.display()))?,
        None => ClientConfig::default(),
    };
    if let Some(host) = &cli.host {
        cfg.host = host.clone();
    }
    if let Some(port) = cli.port {
        cfg.port = port;
    }
    if let Some(unit_id) = cli.unit_id {
        cfg.unit_id = unit_id;
    }
    if let Some(ms) = cli.timeout_ms {
        cfg.timeout_ms = ms;
    }
    if let Some(address) = cli.probe_address {
        cfg.probe_address = address;
    }
    if !cli.config.is_empty() {
        cfg.sources = cli.config.clone();
    }
    if let Some(strategy) = &cli.strategy {
        cfg.strategy = strategy.clone();
    }
    Ok(cfg)
}

fn load_catalog(cfg: &ClientConfig) -> Result<RegisterCatalog> {
    let (catalog, errors) = cfg.load_catalog().context("building register catalog")?;
    for e in &errors {
        eprintln!("warning: {e}");
    }
    Ok(catalog)
}

fn catalog_list(cfg: &ClientConfig) -> Result<()> {
    let catalog = load_catalog(cfg)?;
    for def in catalog.iter() {
        println!(
            "{}\taddress={}\ttype={}\taccess={}",
            def.name,
            def.address,
            def.data_type.as_str(),
            def.access_type.as_str()
        );
    }
    Ok(())
}

fn catalog_validate(cfg: &ClientConfig, json: bool) -> Result<()> {
    let (catalog, errors) = StrategyRegistry::with_defaults().build(&cfg.strategy, &cfg.sources)?;
    println!("ok: loaded {} registers", catalog.len());
    for e in &errors {
        eprintln!("error: {e}");
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
    }
    if !errors.is_empty() {
        anyhow::bail!("{} invalid entries", errors.len());
    }
    Ok(())
}

fn register_info(cfg: &ClientConfig, name: &str) -> Result<()> {
    let catalog = load_catalog(cfg)?;
    let def = catalog
        .get(name)
        .ok_or_else(|| anyhow::anyhow!("unknown register: {name}"))?;
    println!("{}", serde_json::to_string_pretty(def)?);
    Ok(())
}

fn catalog_keys(cfg: &ClientConfig) -> Result<()> {
    for name in load_catalog(cfg)?.names() {
        println!("{name}");
    }
    Ok(())
}

type Client = DeviceClient<Box<dyn WordTransport>>;

fn with_client(
    cfg: &ClientConfig,
    mock: bool,
    hub: Option<&MetricsHub>,
    run: impl FnOnce(&Client) -> Result<()>,
) -> Result<()> {
    let client = open_client(cfg, mock, hub)?;
    let outcome = run(&client);
    client.close();
    outcome
}

fn open_client(cfg: &ClientConfig, mock: bool, hub: Option<&MetricsHub>) -> Result<Client> {
    let (catalog, errors) = cfg.load_catalog().context("building register catalog")?;
    let transport: Box<dyn WordTransport> = if mock {
        let transport = MockTransport::new("mock0");
        seed_defaults(&transport.handle(), &catalog);
        Box::new(transport)
    } else {
        Box::new(
            ModbusTcpTransport::resolve(&cfg.host, cfg.port, cfg.unit_id, cfg.timeout())
                .with_context(|| format!("resolving {}:{}", cfg.host, cfg.port))?,
        )
    };
    let mut client = DeviceClient::new(transport, catalog)
        .context("connecting to device")?
        .with_probe_address(cfg.probe_address)
        .with_catalog_errors(errors);
    if let Some(hub) = hub {
        client = client.with_metrics(hub.client.clone());
    }
    info!(
        registers = client.catalog().len(),
        rejected = client.catalog_errors().len(),
        "client ready"
    );
    Ok(client)
}

fn seed_defaults(handle: &MockHandle, catalog: &RegisterCatalog) {
    for def in catalog.iter() {
        if let Some(word) = def.default_value.and_then(|v| u16::try_from(v).ok()) {
            handle.set_word(def.address.start(), word);
        }
    }
}

#[derive(Serialize)]
struct DumpRecord<'a> {
    register: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<&'a RegisterValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn register_dump(client: &Client, json: bool) -> Result<()> {
    let results = client.read_all();
    if json {
        let records: Vec<DumpRecord<'_>> = results
            .iter()
            .map(|(name, r)| DumpRecord {
                register: name,
                value: r.as_ref().ok(),
                error: r.as_ref().err().map(ToString::to_string),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    for (name, r) in &results {
        match r {
            Ok(value) => println!("{name}\t{value}"),
            Err(e) => println!("{name}\terror: {e}"),
        }
    }
    Ok(())
}

fn register_watch(client: &Client, name: &str, interval: Duration, count: Option<u64>) {
    let mut taken = 0u64;
    while count.map_or(true, |n| taken < n) {
        let ts = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "".into());
        match client.get(name) {
            Ok(value) => println!("{ts}\t{name}\t{value}"),
            Err(e) => error!(register = name, error = %e, "watch sample failed"),
        }
        taken += 1;
        if count.map_or(true, |n| taken < n) {
            thread::sleep(interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_profile_defaults() {
        let cli = Cli::parse_from([
            "regctl",
            "--host",
            "10.1.1.5",
            "--port",
            "1502",
            "--config",
            "a",
            "--config",
            "b",
            "get",
            "HAND_ID",
        ]);
        let cfg = resolve_config(&cli).unwrap();
        assert_eq!(cfg.host, "10.1.1.5");
        assert_eq!(cfg.port, 1502);
        assert_eq!(cfg.sources, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(cfg.unit_id, 1);
        assert_eq!(cfg.probe_address, 0);
    }

    #[test]
    fn health_check_address_flag_reaches_config() {
        let cli = Cli::parse_from(["regctl", "--probe-address", "1000", "keys"]);
        let cfg = resolve_config(&cli).unwrap();
        assert_eq!(cfg.probe_address, 1000);
    }

    fn catalog_fixture(rel: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../crates/register-catalog/tests/fixtures")
            .join(rel)
    }

    #[test]
    fn validate_fails_on_rejected_entries() {
        let cfg = ClientConfig::default().with_sources(vec![catalog_fixture("partial")]);
        let err = catalog_validate(&cfg, false).unwrap_err();
        assert_eq!(err.to_string(), "1 invalid entries");

        let clean = ClientConfig::default()
            .with_strategy("file")
            .with_sources(vec![catalog_fixture("mixed/sensors.yaml")]);
        assert!(catalog_validate(&clean, false).is_ok());
    }

    #[test]
    fn negative_set_value_parses() {
        let cli = Cli::parse_from(["regctl", "--mock", "set", "HAND_ID", "-1"]);
        assert!(cli.mock);
        assert!(matches!(cli.command, Commands::Set { value: -1, .. }));
    }

    #[test]
    fn mock_client_serves_shipped_defaults() {
        let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../configs/registers");
        let cfg = ClientConfig::default().with_sources(vec![dir]);
        let client = open_client(&cfg, true, None).unwrap();
        assert_eq!(client.get("HAND_ID").unwrap(), RegisterValue::Word(1));
        assert!(client.set("POS_SET(0)", 250));
        assert!(client.reset_to_defaults().is_empty());
        client.close();
    }
}
