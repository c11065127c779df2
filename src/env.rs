//! Fns to read the service configuration from the environment.

use std::{env, fmt, time::Duration};

use thiserror::Error;
use tracing::debug;

use crate::{
    exclusions::parse_burn_addresses,
    ledger::{Address, AddressParseError},
};

// The default endpoint embeds an API key.
const SECRET_LOG_BLACKLIST: [&str; 1] = ["RPC_URL"];

const DEFAULT_RPC_URL: &str = "https://mainnet.infura.io/v3/1125fe73d87c4e5396678f4e3089b3dd";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_REFRESH_INTERVAL_SECONDS: u64 = 10;
const DEFAULT_RPC_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("env var {key} is not valid unicode")]
    NotUnicode { key: String },
    #[error("invalid bool value {value} for {key}")]
    InvalidBool { key: String, value: String },
    #[error("invalid value {value} for {key}, expected {expected}")]
    InvalidNumber {
        key: String,
        value: String,
        expected: &'static str,
    },
    #[error("invalid url {value} for {key}")]
    InvalidUrl { key: String, value: String },
    #[error("invalid burn address list: {0}")]
    InvalidBurnAddress(#[from] AddressParseError),
}

fn obfuscate_if_secret(blacklist: &[&str], key: &str, value: &str) -> String {
    if blacklist.contains(&key) {
        let mut last_four = value.to_string();
        last_four.drain(0..value.len().saturating_sub(4));
        format!("****{last_four}")
    } else {
        value.to_string()
    }
}

/// Get an environment variable, encoding found or missing as Option. Empty values count as
/// missing.
pub fn get_env_var(key: &str) -> Result<Option<String>, ConfigError> {
    let var = match env::var(key) {
        Err(env::VarError::NotPresent) => None,
        Err(env::VarError::NotUnicode(_)) => {
            return Err(ConfigError::NotUnicode {
                key: key.to_string(),
            })
        }
        Ok(var) if var.trim().is_empty() => None,
        Ok(var) => Some(var),
    };

    if let Some(ref existing_var) = var {
        let output = obfuscate_if_secret(&SECRET_LOG_BLACKLIST, key, existing_var);
        debug!("env var {key}: {output}");
    } else {
        debug!("env var {key} requested but not found")
    };

    Ok(var)
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "t" | "1" => Ok(true),
        "false" | "f" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

// Port 0 would have the OS pick a port nobody knows about.
fn parse_port(key: &str, value: &str) -> Result<u16, ConfigError> {
    match value.trim().parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ConfigError::InvalidNumber {
            key: key.to_string(),
            value: value.to_string(),
            expected: "a port number between 1 and 65535",
        }),
    }
}

fn parse_seconds(key: &str, value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(seconds) if seconds > 0 => Ok(Duration::from_secs(seconds)),
        _ => Err(ConfigError::InvalidNumber {
            key: key.to_string(),
            value: value.to_string(),
            expected: "a positive number of seconds",
        }),
    }
}

fn parse_url(key: &str, value: &str) -> Result<String, ConfigError> {
    let invalid = || ConfigError::InvalidUrl {
        key: key.to_string(),
        value: obfuscate_if_secret(&SECRET_LOG_BLACKLIST, key, value),
    };
    let url = reqwest::Url::parse(value.trim()).map_err(|_| invalid())?;
    match url.scheme() {
        "http" | "https" => Ok(url.to_string()),
        _ => Err(invalid()),
    }
}

pub struct EnvConfig {
    pub bind_public_interface: bool,
    /// Without the zero address, the exclusion set adds it.
    pub burn_addresses: Vec<Address>,
    pub log_json: bool,
    pub log_perf: bool,
    pub port: u16,
    pub refresh_interval: Duration,
    pub rpc_timeout: Duration,
    pub rpc_url: String,
}

impl EnvConfig {
    /// Builds the config from a key lookup, letting tests avoid the process environment.
    pub fn from_lookup(
        get: impl Fn(&str) -> Result<Option<String>, ConfigError>,
    ) -> Result<Self, ConfigError> {
        let get_bool = |key: &str, default: bool| -> Result<bool, ConfigError> {
            get(key)?.map_or(Ok(default), |value| parse_bool(key, &value))
        };
        let get_seconds = |key: &str, default: u64| -> Result<Duration, ConfigError> {
            get(key)?.map_or(Ok(Duration::from_secs(default)), |value| {
                parse_seconds(key, &value)
            })
        };

        Ok(EnvConfig {
            bind_public_interface: get_bool("BIND_PUBLIC_INTERFACE", true)?,
            burn_addresses: get("BURN_ADDRESSES")?
                .map_or(Ok(Vec::new()), |list| parse_burn_addresses(&list))?,
            log_json: get_bool("LOG_JSON", false)?,
            log_perf: get_bool("LOG_PERF", false)?,
            port: get("PORT")?.map_or(Ok(DEFAULT_PORT), |value| parse_port("PORT", &value))?,
            refresh_interval: get_seconds("REFRESH_INTERVAL", DEFAULT_REFRESH_INTERVAL_SECONDS)?,
            rpc_timeout: get_seconds("RPC_TIMEOUT", DEFAULT_RPC_TIMEOUT_SECONDS)?,
            rpc_url: get("RPC_URL")?.map_or(Ok(DEFAULT_RPC_URL.to_string()), |value| {
                parse_url("RPC_URL", &value)
            })?,
        })
    }

    /// The RPC url as it may appear in logs.
    pub fn rpc_url_obfuscated(&self) -> String {
        obfuscate_if_secret(&SECRET_LOG_BLACKLIST, "RPC_URL", &self.rpc_url)
    }
}

// The RPC url may carry an API key.
impl fmt::Debug for EnvConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvConfig")
            .field("bind_public_interface", &self.bind_public_interface)
            .field("burn_addresses", &self.burn_addresses)
            .field("log_json", &self.log_json)
            .field("log_perf", &self.log_perf)
            .field("port", &self.port)
            .field("refresh_interval", &self.refresh_interval)
            .field("rpc_timeout", &self.rpc_timeout)
            .field("rpc_url", &self.rpc_url_obfuscated())
            .finish()
    }
}

pub fn get_env_config() -> Result<EnvConfig, ConfigError> {
    EnvConfig::from_lookup(get_env_var)
}
