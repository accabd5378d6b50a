//! Configuration for the devnet harness.
//!
//! Configuration is loaded from a TOML file with four parts:
//! - `[node]` controls how the devnet process is spawned and supervised
//! - `[delivery]` controls fee scaling and finality polling
//! - `[events]` controls chunked event retrieval
//! - top-level `debug` raises the default log level
//!
//! String values may reference environment variables as `${VAR}` or
//! `${VAR:-default}`; they are resolved before parsing.

use devnet_types::ChainId;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the harness.
///
/// Every section has defaults, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
	/// Enables verbose per-chunk and per-poll logging.
	#[serde(default)]
	pub debug: bool,
	/// Devnet process settings.
	#[serde(default)]
	pub node: NodeConfig,
	/// Transaction delivery settings.
	#[serde(default)]
	pub delivery: DeliveryConfig,
	/// Event retrieval settings.
	#[serde(default)]
	pub events: EventsConfig,
}

/// Settings for spawning and supervising the devnet process.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeConfig {
	/// Executable to launch, looked up on `PATH` when not absolute.
	#[serde(default = "default_binary")]
	pub binary: String,
	/// Seed for the predeployed accounts.
	#[serde(default = "default_seed")]
	pub seed: u64,
	/// Initial balance of every predeployed account, as a decimal string.
	#[serde(default = "default_initial_balance")]
	pub initial_balance: String,
	/// Number of predeployed accounts.
	#[serde(default = "default_accounts")]
	pub accounts: usize,
	/// Chain the node reports and transactions are hashed for.
	#[serde(default = "default_chain")]
	pub chain: ChainId,
	/// Runs the node without block hash computation and similar extras.
	#[serde(default = "default_lite_mode")]
	pub lite_mode: bool,
	/// Attempts made when the port turns out to be taken.
	#[serde(default = "default_max_retries")]
	pub max_retries: u32,
	/// Delay between attempts in milliseconds.
	#[serde(default = "default_backoff_ms")]
	pub backoff_ms: u64,
	/// How long to wait for the node to accept connections.
	#[serde(default = "default_startup_timeout_secs")]
	pub startup_timeout_secs: u64,
	/// How long to wait after SIGINT before sending SIGKILL.
	#[serde(default = "default_shutdown_timeout_secs")]
	pub shutdown_timeout_secs: u64,
}

impl NodeConfig {
	pub fn backoff(&self) -> Duration {
		Duration::from_millis(self.backoff_ms)
	}

	pub fn startup_timeout(&self) -> Duration {
		Duration::from_secs(self.startup_timeout_secs)
	}

	pub fn shutdown_timeout(&self) -> Duration {
		Duration::from_secs(self.shutdown_timeout_secs)
	}
}

impl Default for NodeConfig {
	fn default() -> Self {
		Self {
			binary: default_binary(),
			seed: default_seed(),
			initial_balance: default_initial_balance(),
			accounts: default_accounts(),
			chain: default_chain(),
			lite_mode: default_lite_mode(),
			max_retries: default_max_retries(),
			backoff_ms: default_backoff_ms(),
			startup_timeout_secs: default_startup_timeout_secs(),
			shutdown_timeout_secs: default_shutdown_timeout_secs(),
		}
	}
}

fn default_binary() -> String {
	"starknet-devnet".to_string()
}

fn default_seed() -> u64 {
	500
}

fn default_initial_balance() -> String {
	// 10^30
	"1000000000000000000000000000000".to_string()
}

fn default_accounts() -> usize {
	15
}

fn default_chain() -> ChainId {
	ChainId::Sepolia
}

fn default_lite_mode() -> bool {
	true
}

fn default_max_retries() -> u32 {
	5
}

fn default_backoff_ms() -> u64 {
	100
}

fn default_startup_timeout_secs() -> u64 {
	30
}

fn default_shutdown_timeout_secs() -> u64 {
	5
}

/// Settings for fee estimation and finality polling.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryConfig {
	/// Factor applied to every estimated amount and price.
	#[serde(default = "default_fee_multiplier")]
	pub fee_multiplier: u64,
	/// Delay between status polls in milliseconds.
	#[serde(default = "default_check_interval_ms")]
	pub check_interval_ms: u64,
	/// Number of status polls before giving up.
	#[serde(default = "default_retries")]
	pub retries: u32,
}

impl DeliveryConfig {
	pub fn check_interval(&self) -> Duration {
		Duration::from_millis(self.check_interval_ms)
	}
}

impl Default for DeliveryConfig {
	fn default() -> Self {
		Self {
			fee_multiplier: default_fee_multiplier(),
			check_interval_ms: default_check_interval_ms(),
			retries: default_retries(),
		}
	}
}

fn default_fee_multiplier() -> u64 {
	10
}

fn default_check_interval_ms() -> u64 {
	2000
}

fn default_retries() -> u32 {
	500
}

/// Settings for chunked event retrieval.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventsConfig {
	/// Blocks covered by one query window.
	#[serde(default = "default_chunk_size")]
	pub chunk_size: u64,
	/// Events requested per page within a window.
	#[serde(default = "default_page_size")]
	pub page_size: u64,
}

impl Default for EventsConfig {
	fn default() -> Self {
		Self {
			chunk_size: default_chunk_size(),
			page_size: default_page_size(),
		}
	}
}

fn default_chunk_size() -> u64 {
	100_000
}

fn default_page_size() -> u64 {
	1000
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;
	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};
		result.push_str(&input[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, resolving environment variables.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let content = tokio::fs::read_to_string(path.as_ref()).await?;
		content.parse()
	}

	/// Validates the configuration to ensure all values are usable.
	///
	/// Zero-valued intervals and budgets are rejected here so that the
	/// components receiving them never need a fallback.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.node.binary.is_empty() {
			return Err(ConfigError::Validation(
				"node.binary cannot be empty".into(),
			));
		}
		if self.node.initial_balance.is_empty()
			|| !self.node.initial_balance.chars().all(|c| c.is_ascii_digit())
		{
			return Err(ConfigError::Validation(format!(
				"node.initial_balance must be a decimal integer, got '{}'",
				self.node.initial_balance
			)));
		}
		if self.node.accounts == 0 {
			return Err(ConfigError::Validation(
				"node.accounts must be at least 1".into(),
			));
		}
		if self.node.max_retries == 0 {
			return Err(ConfigError::Validation(
				"node.max_retries must be at least 1".into(),
			));
		}
		if self.node.startup_timeout_secs == 0 {
			return Err(ConfigError::Validation(
				"node.startup_timeout_secs must be greater than 0".into(),
			));
		}

		if self.delivery.fee_multiplier == 0 {
			return Err(ConfigError::Validation(
				"delivery.fee_multiplier must be at least 1".into(),
			));
		}
		if self.delivery.check_interval_ms == 0 {
			return Err(ConfigError::Validation(
				"delivery.check_interval_ms must be greater than 0".into(),
			));
		}
		if self.delivery.retries == 0 {
			return Err(ConfigError::Validation(
				"delivery.retries must be at least 1".into(),
			));
		}

		if self.events.chunk_size == 0 {
			return Err(ConfigError::Validation(
				"events.chunk_size must be greater than 0".into(),
			));
		}
		if self.events.page_size == 0 {
			return Err(ConfigError::Validation(
				"events.page_size must be greater than 0".into(),
			));
		}

		Ok(())
	}
}

/// Implementation of FromStr trait for Config to enable parsing from string.
///
/// Resolves environment variables, parses the TOML and validates the result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_empty_config_uses_defaults() {
		let config: Config = "".parse().unwrap();
		assert!(!config.debug);
		assert_eq!(config.node.binary, "starknet-devnet");
		assert_eq!(config.node.seed, 500);
		assert_eq!(config.node.accounts, 15);
		assert_eq!(config.node.max_retries, 5);
		assert_eq!(config.node.backoff(), Duration::from_millis(100));
		assert_eq!(config.node.chain, ChainId::Sepolia);
		assert_eq!(config.delivery.fee_multiplier, 10);
		assert_eq!(config.delivery.check_interval(), Duration::from_secs(2));
		assert_eq!(config.delivery.retries, 500);
		assert_eq!(config.events.chunk_size, 100_000);
		assert_eq!(config.events.page_size, 1000);
	}

	#[test]
	fn test_sections_override_defaults() {
		let config: Config = r#"
debug = true

[node]
seed = 42
chain = "mainnet"
lite_mode = false

[delivery]
fee_multiplier = 3
retries = 7

[events]
chunk_size = 10
"#
		.parse()
		.unwrap();

		assert!(config.debug);
		assert_eq!(config.node.seed, 42);
		assert_eq!(config.node.chain, ChainId::Mainnet);
		assert!(!config.node.lite_mode);
		assert_eq!(config.delivery.fee_multiplier, 3);
		assert_eq!(config.delivery.retries, 7);
		assert_eq!(config.events.chunk_size, 10);
	}

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("DEVNET_TEST_BINARY", "/opt/devnet/bin/starknet-devnet");

		let config: Config = r#"
[node]
binary = "${DEVNET_TEST_BINARY}"
initial_balance = "${DEVNET_TEST_UNSET_BALANCE:-1000}"
"#
		.parse()
		.unwrap();

		assert_eq!(config.node.binary, "/opt/devnet/bin/starknet-devnet");
		assert_eq!(config.node.initial_balance, "1000");

		std::env::remove_var("DEVNET_TEST_BINARY");
	}

	#[test]
	fn test_missing_env_var() {
		let result: Result<Config, _> = r#"
[node]
binary = "${DEVNET_TEST_MISSING_VAR}"
"#
		.parse();

		assert!(matches!(result, Err(ConfigError::Validation(msg)) if msg.contains("DEVNET_TEST_MISSING_VAR")));
	}

	#[test]
	fn test_validation_rejects_zero_budgets() {
		for toml in [
			"[delivery]\nretries = 0",
			"[delivery]\ncheck_interval_ms = 0",
			"[delivery]\nfee_multiplier = 0",
			"[events]\nchunk_size = 0",
			"[node]\nmax_retries = 0",
			"[node]\ninitial_balance = \"10e30\"",
		] {
			let result: Result<Config, _> = toml.parse();
			assert!(
				matches!(result, Err(ConfigError::Validation(_))),
				"expected validation error for {:?}",
				toml
			);
		}
	}

	#[test]
	fn test_invalid_chain_is_parse_error() {
		let result: Result<Config, _> = "[node]\nchain = \"goerli\"".parse();
		assert!(matches!(result, Err(ConfigError::Parse(_))));
	}

	#[tokio::test]
	async fn test_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[events]\npage_size = 50").unwrap();

		let config = Config::from_file(file.path()).await.unwrap();
		assert_eq!(config.events.page_size, 50);
	}

	#[tokio::test]
	async fn test_from_missing_file() {
		let result = Config::from_file("/nonexistent/devnet.toml").await;
		assert!(matches!(result, Err(ConfigError::Io(_))));
	}
}
