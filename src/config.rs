//! Configuration for sponsored and direct execution.
//!
//! Loaded from a JSON file. Any string value may reference an environment variable
//! (`$VAR` or `${VAR}`), and a `.env` file next to the process is honored:
//!
//! ```json
//! {
//!   "network": "testnet",
//!   "stations": [
//!     { "url": "$GAS_STATION_URL", "token": "$GAS_STATION_TOKEN" },
//!     { "url": "${GAS_STATION_2_URL}", "token": "${GAS_STATION_2_TOKEN}" }
//!   ],
//!   "gas_budget": 50000000,
//!   "reserve_duration_secs": 10,
//!   "attempts_per_station": 1,
//!   "request_timeout_secs": 30,
//!   "faucet": { "threshold": 1000000000, "poll_interval_ms": 1000, "timeout_ms": 15000 }
//! }
//! ```
//!
//! The order of `stations` is the failover order. Entries with an empty `url` or `token`
//! are skipped, so a deployment without a secondary station can leave its values blank.

use dotenvy::dotenv;
use gas_sponsor_types::chain::Network;
use gas_sponsor_types::config::LiteralOrEnv;
use gas_station_client::{GasStationClient, GasStationError, HttpFaucetClient, default_faucet_url};
use serde::Deserialize;
use std::fs;
use std::num::{NonZeroU32, NonZeroU64};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::direct::FaucetWait;

pub mod config_defaults {
    use std::num::{NonZeroU32, NonZeroU64};

    pub const DEFAULT_GAS_BUDGET: u64 = 50_000_000;
    pub const DEFAULT_RESERVE_DURATION_SECS: u64 = 10;
    pub const DEFAULT_FAUCET_THRESHOLD: u64 = 1_000_000_000;
    pub const DEFAULT_FAUCET_POLL_INTERVAL_MS: u64 = 1_000;
    pub const DEFAULT_FAUCET_TIMEOUT_MS: u64 = 15_000;
    pub const DEFAULT_COIN_TYPE: &str = "0x2::iota::IOTA";

    pub fn default_gas_budget() -> NonZeroU64 {
        NonZeroU64::new(DEFAULT_GAS_BUDGET).unwrap_or(NonZeroU64::MIN)
    }

    pub fn default_reserve_duration_secs() -> u64 {
        DEFAULT_RESERVE_DURATION_SECS
    }

    pub fn default_attempts_per_station() -> NonZeroU32 {
        NonZeroU32::MIN
    }

    pub fn default_faucet_threshold() -> u64 {
        DEFAULT_FAUCET_THRESHOLD
    }

    pub fn default_faucet_poll_interval_ms() -> u64 {
        DEFAULT_FAUCET_POLL_INTERVAL_MS
    }

    pub fn default_faucet_timeout_ms() -> u64 {
        DEFAULT_FAUCET_TIMEOUT_MS
    }

    pub fn default_coin_type() -> String {
        DEFAULT_COIN_TYPE.to_string()
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SponsorConfig {
    #[serde(default)]
    network: Network,
    #[serde(default)]
    stations: Vec<StationConfig>,
    #[serde(default = "config_defaults::default_gas_budget")]
    gas_budget: NonZeroU64,
    #[serde(default = "config_defaults::default_reserve_duration_secs")]
    reserve_duration_secs: u64,
    #[serde(default = "config_defaults::default_attempts_per_station")]
    attempts_per_station: NonZeroU32,
    #[serde(default)]
    request_timeout_secs: Option<u64>,
    #[serde(default)]
    faucet: FaucetConfig,
}

/// One gas station descriptor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StationConfig {
    #[serde(default)]
    url: Option<LiteralOrEnv<String>>,
    #[serde(default)]
    token: Option<LiteralOrEnv<String>>,
}

impl StationConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: Some(LiteralOrEnv::from_literal(url.into())),
            token: Some(LiteralOrEnv::from_literal(token.into())),
        }
    }

    /// `(url, token)` when both are present and non-blank.
    pub fn configured(&self) -> Option<(&str, &str)> {
        let url = self.url.as_deref()?.trim();
        let token = self.token.as_deref()?.trim();
        (!url.is_empty() && !token.is_empty()).then_some((url, token))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FaucetConfig {
    /// Overrides the network's public faucet.
    #[serde(default)]
    url: Option<LiteralOrEnv<String>>,
    #[serde(default = "config_defaults::default_faucet_threshold")]
    threshold: u64,
    #[serde(default = "config_defaults::default_faucet_poll_interval_ms")]
    poll_interval_ms: u64,
    #[serde(default = "config_defaults::default_faucet_timeout_ms")]
    timeout_ms: u64,
    #[serde(default = "config_defaults::default_coin_type")]
    coin_type: String,
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            url: None,
            threshold: config_defaults::DEFAULT_FAUCET_THRESHOLD,
            poll_interval_ms: config_defaults::DEFAULT_FAUCET_POLL_INTERVAL_MS,
            timeout_ms: config_defaults::DEFAULT_FAUCET_TIMEOUT_MS,
            coin_type: config_defaults::default_coin_type(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {0}: {1}")]
    FileRead(PathBuf, std::io::Error),
    #[error("Failed to parse config file: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("faucet.poll_interval_ms must be greater than zero")]
    ZeroPollInterval,
    #[error("Invalid gas station #{index}: {source}")]
    Station {
        index: usize,
        #[source]
        source: GasStationError,
    },
    #[error("Invalid faucet URL: {0}")]
    FaucetUrl(#[from] url::ParseError),
}

impl SponsorConfig {
    /// Loads `.env` if present, then reads and validates the JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        dotenv().ok();
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::FileRead(path.to_path_buf(), e))?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SponsorConfig = serde_json::from_str(json)?;
        if config.faucet.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(config)
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn stations(&self) -> &[StationConfig] {
        &self.stations
    }

    pub fn gas_budget(&self) -> NonZeroU64 {
        self.gas_budget
    }

    pub fn reserve_duration_secs(&self) -> u64 {
        self.reserve_duration_secs
    }

    pub fn attempts_per_station(&self) -> NonZeroU32 {
        self.attempts_per_station
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn faucet(&self) -> &FaucetConfig {
        &self.faucet
    }

    /// Clients for the configured stations, in failover order.
    pub fn station_clients(&self) -> Result<Vec<GasStationClient>, ConfigError> {
        let mut clients = Vec::with_capacity(self.stations.len());
        for (index, station) in self.stations.iter().enumerate() {
            let Some((url, token)) = station.configured() else {
                tracing::debug!(index, "Skipping gas station without url or token");
                continue;
            };
            let client = GasStationClient::try_new(url, token)
                .map_err(|source| ConfigError::Station { index, source })?;
            let client = match self.request_timeout() {
                Some(timeout) => client.with_timeout(timeout),
                None => client,
            };
            clients.push(client);
        }
        Ok(clients)
    }

    /// Faucet for the configured network: the explicit `faucet.url`, else the network's
    /// public faucet. `None` on networks without one.
    pub fn faucet_client(&self) -> Result<Option<HttpFaucetClient>, ConfigError> {
        let url = match self.faucet.url.as_deref() {
            Some(url) if !url.trim().is_empty() => url.trim(),
            _ => match default_faucet_url(self.network) {
                Some(url) => url,
                None => return Ok(None),
            },
        };
        let client = HttpFaucetClient::try_new(url)?;
        Ok(Some(match self.request_timeout() {
            Some(timeout) => client.with_timeout(timeout),
            None => client,
        }))
    }

    pub fn faucet_wait(&self) -> FaucetWait {
        FaucetWait {
            threshold: self.faucet.threshold,
            poll_interval: Duration::from_millis(self.faucet.poll_interval_ms),
            timeout: Duration::from_millis(self.faucet.timeout_ms),
            coin_type: self.faucet.coin_type.clone(),
        }
    }
}
