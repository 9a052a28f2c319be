// # ddns6d - IPv6 DDNS Daemon
//
// This daemon is a THIN integration layer: all DDNS logic lives in
// ddns6-core. It is responsible for:
// 1. Reading configuration (environment variables, optional YAML file)
// 2. Initializing logging and the runtime
// 3. Building the interface IP source and the Cloudflare client
// 4. Running the DDNS engine until SIGINT/SIGTERM
//
// ## Configuration
//
// Environment variables override values from the YAML file named by
// `DDNS_CONFIG_FILE`, or `/etc/ipv6-ddns-cloudflare/config.yaml` when that
// variable is unset and the file exists:
//
// ### Interface
// - `DDNS_INTERFACE`: Network interface to watch (required)
// - `DDNS_POLL_INTERVAL`: Seconds between polls (default 30)
// - `DDNS_STABILITY_DELAY`: Seconds a new address must hold (default 5)
//
// ### Record
// - `DDNS_PROVIDER_API_TOKEN`: Cloudflare API token (required)
// - `DDNS_PROVIDER_ZONE_ID`: Zone ID (required)
// - `DDNS_RECORD_NAME`: AAAA record to manage (required)
// - `DDNS_RECORD_TTL`: TTL in seconds, 1 = automatic (default 1)
// - `DDNS_RECORD_PROXIED`: true/false (default false)
//
// ### Daemon
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn, error (default info)
// - `DDNS_MODE`: live (default) or dry-run
//
// ## Example
//
// ```bash
// export DDNS_INTERFACE=eth0
// export DDNS_PROVIDER_API_TOKEN=your_token
// export DDNS_PROVIDER_ZONE_ID=your_zone_id
// export DDNS_RECORD_NAME=home.example.com
//
// ddns6d
// ```

use anyhow::{Context, Result};
use ddns6_core::{DdnsConfig, DdnsEngine};
use ddns6_ip_ifaddrs::InterfaceIpSource;
use ddns6_provider_cloudflare::CloudflareProvider;
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Config file read when `DDNS_CONFIG_FILE` is unset
const DEFAULT_CONFIG_FILE: &str = "/etc/ipv6-ddns-cloudflare/config.yaml";

/// Application configuration
#[derive(Debug)]
struct Config {
    ddns: DdnsConfig,
    config_file: Option<PathBuf>,
    dry_run: bool,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok(), Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Load configuration from `lookup`, layered over a YAML file
    ///
    /// The file is the one `DDNS_CONFIG_FILE` names, else `default_file`
    /// when it exists.
    fn from_lookup<F>(lookup: F, default_file: &Path) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_file = lookup("DDNS_CONFIG_FILE")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .or_else(|| default_file.is_file().then(|| default_file.to_path_buf()));

        let mut ddns = match &config_file {
            Some(path) => load_config_file(path)?,
            None => DdnsConfig::default(),
        };

        if let Some(interface) = lookup("DDNS_INTERFACE") {
            ddns.interface = interface;
        }
        if let Some(v) = lookup("DDNS_POLL_INTERVAL") {
            ddns.poll_interval = parse_var("DDNS_POLL_INTERVAL", &v)?;
        }
        if let Some(v) = lookup("DDNS_STABILITY_DELAY") {
            ddns.stability_delay = parse_var("DDNS_STABILITY_DELAY", &v)?;
        }
        if let Some(token) = lookup("DDNS_PROVIDER_API_TOKEN") {
            ddns.provider.api_token = token;
        }
        if let Some(zone_id) = lookup("DDNS_PROVIDER_ZONE_ID") {
            ddns.provider.zone_id = zone_id;
        }
        if let Some(name) = lookup("DDNS_RECORD_NAME") {
            ddns.provider.record_name = name;
        }
        if let Some(v) = lookup("DDNS_RECORD_TTL") {
            ddns.provider.ttl = parse_var("DDNS_RECORD_TTL", &v)?;
        }
        if let Some(v) = lookup("DDNS_RECORD_PROXIED") {
            ddns.provider.proxied = parse_bool("DDNS_RECORD_PROXIED", &v)?;
        }

        let dry_run = match lookup("DDNS_MODE").unwrap_or_default().to_lowercase().as_str() {
            "" | "live" => false,
            "dry-run" => true,
            other => anyhow::bail!(
                "DDNS_MODE '{}' is not valid. Valid modes: live, dry-run",
                other
            ),
        };

        Ok(Self {
            ddns,
            config_file,
            dry_run,
            log_level: lookup("DDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Core checks (required fields, ranges, record name syntax) plus
    /// daemon-level checks on the token and the log level.
    fn validate(&self) -> Result<()> {
        self.ddns.validate()?;

        let token = &self.ddns.provider.api_token;

        // Cloudflare API tokens are 40 characters
        if token.len() < 20 {
            anyhow::bail!(
                "API token appears too short ({} chars). \
                Cloudflare tokens are typically 40 characters. \
                Verify your token is correct.",
                token.len()
            );
        }

        // Check for obvious placeholder tokens (common mistake)
        let token_lower = token.to_lowercase();
        if token_lower.contains("your_token")
            || token_lower.contains("replace_me")
            || token_lower.contains("example")
        {
            anyhow::bail!(
                "API token appears to be a placeholder. \
                Use an actual API token from Cloudflare."
            );
        }

        self.log_level()?;

        Ok(())
    }

    fn log_level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "DDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }
}

/// Read the YAML configuration file
fn load_config_file(path: &Path) -> Result<DdnsConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    serde_yaml::from_str(&text)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("{} must be a number. Got '{}': {}", key, value, e))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => anyhow::bail!("{} must be true or false. Got '{}'", key, value),
    }
}

fn main() -> ExitCode {
    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DdnsExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = config.log_level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting ddns6d daemon");
    if let Some(path) = &config.config_file {
        info!("Configuration file: {}", path.display());
    }
    debug!("Configuration: {:?}", config.ddns);

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {:#}", e);
            DdnsExitCode::RuntimeError
        } else {
            DdnsExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let ddns = &config.ddns;

    if !ddns6_ip_ifaddrs::interface_exists(&ddns.interface) {
        warn!(
            "Interface {} does not exist yet, polling anyway",
            ddns.interface
        );
    }

    let ip_source = InterfaceIpSource::new(ddns.interface.clone());
    let provider = CloudflareProvider::from_config(&ddns.provider, config.dry_run)?;

    let (mut engine, mut events) = DdnsEngine::new(Box::new(ip_source), Box::new(provider), ddns)?;

    // Events duplicate the engine's own log lines; surface them at debug
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!("Engine event: {:?}", event);
        }
    });

    engine
        .run()
        .await
        .context("DDNS engine failed")?;

    info!("Shutting down daemon");
    Ok(())
}
