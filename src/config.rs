use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

use crate::backoff::BackoffPolicy;
use crate::blockchain::address::{is_valid_address, normalize_address};
use crate::error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub rpc: RpcConfig,
    pub chain: ChainConfig,
    pub replay: ReplayConfig,
    pub watch: WatchConfig,
    pub logging: LoggingConfig,
}

/// RPC client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Starknet JSON-RPC endpoint URL
    pub endpoint: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

/// Chain binding of the watcher
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainConfig {
    pub chain_id: String,
    pub name: String,
    /// Enables verbose per-block logging
    pub debug: bool,
    pub native_currency: NativeCurrency,
    /// Known token contracts, used to resolve transfer symbols
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NativeCurrency {
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenConfig {
    pub address: String,
    pub symbol: String,
}

/// Block replay behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Trailing blocks left alone because they may still be reorganized
    pub min_confirmations: u64,
    /// Wait before polling again for a block the node does not have yet
    pub block_poll_interval_ms: u64,
    /// Backoff between attempts at a failing block
    pub retry: BackoffPolicy,
    /// Consecutive failures of one block before the stall alarm fires
    pub stall_alarm_after: u32,
}

/// Seed lists for the bundled in-memory watch list
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WatchConfig {
    #[serde(default)]
    pub wallets: Vec<String>,
    #[serde(default)]
    pub tokens: Vec<String>,
    #[serde(default)]
    pub contracts: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9545/rpc/v0_7".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: "SN_MAIN".to_string(),
            name: "starknet".to_string(),
            debug: false,
            native_currency: NativeCurrency {
                symbol: "ETH".to_string(),
                decimals: 18,
            },
            tokens: vec![
                TokenConfig {
                    address: "0x049d36570d4e46f48e99674bd3fcc84644ddd6b96f7c741b1562b82f9e004dc7".to_string(),
                    symbol: "ETH".to_string(),
                },
                TokenConfig {
                    address: "0x053c91253bc9682c04929ca02ed00b3e423f6710d2ee7e0d5ebb06f3ecf368a8".to_string(),
                    symbol: "USDC".to_string(),
                },
            ],
        }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            min_confirmations: 1,
            block_poll_interval_ms: 1000,
            retry: BackoffPolicy::default(),
            stall_alarm_after: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl ChainConfig {
    /// Symbol of a configured token contract, compared by canonical address
    pub fn token_symbol(&self, token_address: &str) -> Option<&str> {
        let wanted = normalize_address(token_address);
        self.tokens
            .iter()
            .find(|token| normalize_address(&token.address).eq_ignore_ascii_case(&wanted))
            .map(|token| token.symbol.as_str())
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    /// Environment variables take precedence over file values
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the TOML file named by `CONFIG_FILE`
    pub fn load_from_file() -> Result<Self, ConfigError> {
        let config_path = env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        if !Path::new(&config_path).exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|_| ConfigError::FileNotFound(config_path.clone()))?;
        toml::from_str(&content).map_err(|e| ConfigError::Parsing(e.to_string()))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(endpoint) = env::var("STARKNET_RPC_URL") {
            self.rpc.endpoint = endpoint;
        }
        if let Some(timeout) = parse_env("RPC_TIMEOUT_SECONDS")? {
            self.rpc.timeout_seconds = timeout;
        }
        if let Some(debug) = parse_env("CHAIN_DEBUG")? {
            self.chain.debug = debug;
        }
        if let Some(confirmations) = parse_env("MIN_CONFIRMATIONS")? {
            self.replay.min_confirmations = confirmations;
        }
        if let Some(interval) = parse_env("BLOCK_POLL_INTERVAL_MS")? {
            self.replay.block_poll_interval_ms = interval;
        }
        if let Ok(level) = env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = env::var("LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.rpc.endpoint.starts_with("http://") && !self.rpc.endpoint.starts_with("https://") {
            return Err(ConfigError::InvalidUrl(self.rpc.endpoint.clone()));
        }

        if self.rpc.timeout_seconds == 0 || self.rpc.timeout_seconds > 300 {
            return Err(invalid("rpc.timeout_seconds", self.rpc.timeout_seconds));
        }

        if self.chain.chain_id.trim().is_empty() {
            return Err(invalid("chain.chain_id", &self.chain.chain_id));
        }

        if self.replay.min_confirmations == 0 {
            return Err(invalid("replay.min_confirmations", self.replay.min_confirmations));
        }

        if self.replay.retry.max_delay_ms < self.replay.retry.initial_delay_ms {
            return Err(invalid("replay.retry.max_delay_ms", self.replay.retry.max_delay_ms));
        }

        if self.replay.retry.backoff_multiplier < 1.0 {
            return Err(invalid("replay.retry.backoff_multiplier", self.replay.retry.backoff_multiplier));
        }

        if self.replay.stall_alarm_after == 0 {
            return Err(invalid("replay.stall_alarm_after", self.replay.stall_alarm_after));
        }

        let token_addresses = self.chain.tokens.iter().map(|t| ("chain.tokens", &t.address));
        let watched = [
            ("watch.wallets", &self.watch.wallets),
            ("watch.tokens", &self.watch.tokens),
            ("watch.contracts", &self.watch.contracts),
        ];
        let watched_addresses = watched
            .iter()
            .flat_map(|(key, list)| list.iter().map(move |address| (*key, address)));

        for (key, address) in token_addresses.chain(watched_addresses) {
            if !is_valid_address(address) {
                return Err(ConfigError::InvalidAddress {
                    key: key.to_string(),
                    address: address.clone(),
                });
            }
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(invalid("logging.level", &self.logging.level));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(invalid("logging.format", &self.logging.format));
        }

        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample_config() -> Result<String, ConfigError> {
        toml::to_string_pretty(&Self::default()).map_err(|e| ConfigError::Parsing(e.to_string()))
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

fn invalid<V: ToString>(key: &str, value: V) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.rpc.timeout_seconds, 30);
        assert_eq!(config.chain.chain_id, "SN_MAIN");
        assert_eq!(config.chain.native_currency.symbol, "ETH");
        assert_eq!(config.replay.min_confirmations, 1);
        assert_eq!(config.replay.block_poll_interval_ms, 1000);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.rpc.endpoint = "invalid-url".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));

        config = AppConfig::default();
        config.rpc.timeout_seconds = 0;
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.replay.min_confirmations = 0;
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.replay.retry.initial_delay_ms = 10_000;
        config.replay.retry.max_delay_ms = 1_000;
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.watch.wallets.push("not-an-address".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::InvalidAddress { .. })));

        config = AppConfig::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_token_symbol_lookup() {
        let config = ChainConfig::default();
        assert_eq!(
            config.token_symbol("0x49D36570D4E46F48E99674BD3FCC84644DDD6B96F7C741B1562B82F9E004DC7"),
            Some("ETH")
        );
        assert_eq!(config.token_symbol("0x1234"), None);
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        env::set_var("STARKNET_RPC_URL", "https://rpc.example/");
        env::set_var("CHAIN_DEBUG", "true");
        env::set_var("MIN_CONFIRMATIONS", "3");
        env::set_var("BLOCK_POLL_INTERVAL_MS", "250");
        env::set_var("LOG_LEVEL", "debug");

        let mut config = AppConfig::default();
        config.apply_env_overrides().unwrap();

        assert_eq!(config.rpc.endpoint, "https://rpc.example/");
        assert!(config.chain.debug);
        assert_eq!(config.replay.min_confirmations, 3);
        assert_eq!(config.replay.block_poll_interval_ms, 250);
        assert_eq!(config.logging.level, "debug");

        env::remove_var("STARKNET_RPC_URL");
        env::remove_var("CHAIN_DEBUG");
        env::remove_var("MIN_CONFIRMATIONS");
        env::remove_var("BLOCK_POLL_INTERVAL_MS");
        env::remove_var("LOG_LEVEL");
    }

    #[test]
    #[serial]
    fn test_invalid_env_values() {
        env::set_var("MIN_CONFIRMATIONS", "many");

        let mut config = AppConfig::default();
        let result = config.apply_env_overrides();

        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

        env::remove_var("MIN_CONFIRMATIONS");
    }

    #[test]
    #[serial]
    fn test_config_file_loading() {
        let config_content = r#"
[rpc]
endpoint = "https://starknet.example/rpc"
timeout_seconds = 45

[chain]
chain_id = "SN_SEPOLIA"
name = "starknet-sepolia"
debug = true

[chain.native_currency]
symbol = "ETH"
decimals = 18

[[chain.tokens]]
address = "0x04718f5a0fc34cc1af16a1cdee98ffb20c31f5cd61d6ab07201858f4287c938d"
symbol = "STRK"

[replay]
min_confirmations = 2
block_poll_interval_ms = 500
stall_alarm_after = 5

[replay.retry]
initial_delay_ms = 100
max_delay_ms = 1000
backoff_multiplier = 2.0
jitter = false

[watch]
wallets = ["0x05ec09c04e223ec0c07f0bbb4d19737bbefcf58361812f1405017c19ae5b175f"]
tokens = ["0x04718f5a0fc34cc1af16a1cdee98ffb20c31f5cd61d6ab07201858f4287c938d"]

[logging]
level = "warn"
format = "json"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut temp_file, config_content.as_bytes()).unwrap();

        env::set_var("CONFIG_FILE", temp_file.path().to_str().unwrap());
        let config = AppConfig::load_from_file().unwrap();
        env::remove_var("CONFIG_FILE");

        assert_eq!(config.rpc.endpoint, "https://starknet.example/rpc");
        assert_eq!(config.chain.chain_id, "SN_SEPOLIA");
        assert!(config.chain.debug);
        assert_eq!(config.chain.tokens.len(), 1);
        assert_eq!(config.replay.min_confirmations, 2);
        assert!(!config.replay.retry.jitter);
        assert_eq!(config.watch.wallets.len(), 1);
        assert!(config.watch.contracts.is_empty());
        assert_eq!(config.logging.format, "json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_generate_sample_config() {
        let sample = AppConfig::generate_sample_config().unwrap();
        assert!(sample.contains("[rpc]"));
        assert!(sample.contains("[chain]"));
        assert!(sample.contains("[replay]"));
        assert!(sample.contains("[logging]"));

        let parsed: AppConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.chain.tokens.len(), 2);
    }
}
