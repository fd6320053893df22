//! Configuration module for the catering orchestrator.
//!
//! This module provides structures and utilities for managing orchestrator
//! configuration. It supports loading configuration from TOML files and
//! validates that every section is usable before any component is built:
//! a restaurant with a broken provider entry should fail at startup, not
//! stall an order at schedule time.

use catering_types::{CanonicalStatus, ProviderKind, StatusMap};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
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

/// Main configuration structure for the orchestrator.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Configuration specific to the orchestrator instance.
	pub orchestrator: OrchestratorConfig,
	/// Configuration for the tracking storage backend.
	#[serde(default)]
	pub storage: StorageConfig,
	/// Default polling cadence, overridable per provider.
	#[serde(default)]
	pub polling: PollConfig,
	/// Kitchen provider entries, keyed by restaurant identifier.
	pub kitchens: HashMap<String, KitchenConfig>,
	/// Delivery provider configuration.
	pub delivery: DeliveryProviderConfig,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Configuration specific to the orchestrator instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrchestratorConfig {
	/// Unique identifier for this orchestrator instance.
	pub id: String,
}

/// Configuration for the tracking storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which backend implementation to use.
	#[serde(default = "default_storage_primary")]
	pub primary: String,
	/// TTL for tracking records in seconds. Must outlive the longest
	/// worker lifetime.
	#[serde(default = "default_tracking_ttl_seconds")]
	pub tracking_ttl_seconds: u64,
	/// Interval in seconds between expired-entry sweeps.
	#[serde(default = "default_cleanup_interval_seconds")]
	pub cleanup_interval_seconds: u64,
}

impl Default for StorageConfig {
	fn default() -> Self {
		Self {
			primary: default_storage_primary(),
			tracking_ttl_seconds: default_tracking_ttl_seconds(),
			cleanup_interval_seconds: default_cleanup_interval_seconds(),
		}
	}
}

fn default_storage_primary() -> String {
	"memory".to_string()
}

fn default_tracking_ttl_seconds() -> u64 {
	86_400 // one day
}

fn default_cleanup_interval_seconds() -> u64 {
	300
}

/// Polling cadence and retry bounds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollConfig {
	/// Base interval between polls in milliseconds.
	#[serde(default = "default_interval_ms")]
	pub interval_ms: u64,
	/// Multiplier applied to the retry delay after each transient failure.
	#[serde(default = "default_backoff_multiplier")]
	pub backoff_multiplier: f64,
	/// Jitter fraction in [0, 1) applied to every delay.
	#[serde(default = "default_jitter")]
	pub jitter: f64,
	/// Maximum lifetime of a polling loop in seconds; expiry forces the
	/// segment or delivery phase to `Failed`.
	#[serde(default = "default_max_lifetime_seconds")]
	pub max_lifetime_seconds: u64,
	/// Maximum transient-failure attempts before giving up.
	#[serde(default = "default_max_attempts")]
	pub max_attempts: u32,
}

impl Default for PollConfig {
	fn default() -> Self {
		Self {
			interval_ms: default_interval_ms(),
			backoff_multiplier: default_backoff_multiplier(),
			jitter: default_jitter(),
			max_lifetime_seconds: default_max_lifetime_seconds(),
			max_attempts: default_max_attempts(),
		}
	}
}

impl PollConfig {
	/// Base poll interval as a duration.
	pub fn interval(&self) -> Duration {
		Duration::from_millis(self.interval_ms)
	}

	/// Maximum loop lifetime as a duration.
	pub fn max_lifetime(&self) -> Duration {
		Duration::from_secs(self.max_lifetime_seconds)
	}
}

fn default_interval_ms() -> u64 {
	1_000
}

fn default_backoff_multiplier() -> f64 {
	2.0
}

fn default_jitter() -> f64 {
	0.1
}

fn default_max_lifetime_seconds() -> u64 {
	300
}

fn default_max_attempts() -> u32 {
	5
}

/// Integration mode of a kitchen provider entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderMode {
	/// The orchestrator polls the provider on an interval.
	Polling,
	/// The provider pushes status changes to our webhook endpoint.
	Webhook,
}

impl From<ProviderMode> for ProviderKind {
	fn from(mode: ProviderMode) -> Self {
		match mode {
			ProviderMode::Polling => ProviderKind::Polling,
			ProviderMode::Webhook => ProviderKind::Push,
		}
	}
}

/// One kitchen provider entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KitchenConfig {
	/// Integration mode.
	pub mode: ProviderMode,
	/// Base URL of the provider's REST API.
	pub endpoint: String,
	/// Pickup address handed to the delivery provider.
	pub pickup_address: String,
	/// Provider name; defaults to the restaurant identifier.
	#[serde(default)]
	pub provider: Option<String>,
	/// Status translation override; defaults to the kitchen table.
	#[serde(default)]
	pub statuses: Option<HashMap<String, CanonicalStatus>>,
	/// Polling override for this provider.
	#[serde(default)]
	pub polling: Option<PollConfig>,
}

impl KitchenConfig {
	/// Resolves the provider name for a restaurant entry.
	pub fn provider_name<'a>(&'a self, restaurant_id: &'a str) -> &'a str {
		self.provider.as_deref().unwrap_or(restaurant_id)
	}

	/// Builds the status map for this entry.
	pub fn status_map(&self, restaurant_id: &str) -> StatusMap {
		let provider = self.provider_name(restaurant_id);
		match &self.statuses {
			Some(entries) => StatusMap::new(provider, entries.clone()),
			None => StatusMap::kitchen_default(provider),
		}
	}
}

/// Delivery provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryProviderConfig {
	/// Provider name (e.g. "uklon").
	pub provider: String,
	/// Base URL of the provider's REST API.
	pub endpoint: String,
	/// Status translation override; defaults to the delivery table.
	#[serde(default)]
	pub statuses: Option<HashMap<String, CanonicalStatus>>,
	/// Polling override for the delivery loop.
	#[serde(default)]
	pub polling: Option<PollConfig>,
}

impl DeliveryProviderConfig {
	/// Builds the status map for the delivery provider.
	pub fn status_map(&self) -> StatusMap {
		match &self.statuses {
			Some(entries) => StatusMap::new(self.provider.clone(), entries.clone()),
			None => StatusMap::delivery_default(self.provider.clone()),
		}
	}
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether to start the HTTP server.
	#[serde(default = "default_api_enabled")]
	pub enabled: bool,
	/// Host address to bind to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to listen on.
	#[serde(default = "default_api_port")]
	pub port: u16,
}

fn default_api_enabled() -> bool {
	true
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	8000
}

impl Config {
	/// Parses and validates a configuration from a TOML string.
	pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
		let config: Config = toml::from_str(raw)?;
		config.validate()?;
		Ok(config)
	}

	/// Loads and validates a configuration file.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let raw = tokio::fs::read_to_string(path).await?;
		Self::from_toml_str(&raw)
	}

	/// Validates cross-field constraints the type system cannot express.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.orchestrator.id.is_empty() {
			return Err(ConfigError::Validation(
				"orchestrator.id must not be empty".into(),
			));
		}
		if self.kitchens.is_empty() {
			return Err(ConfigError::Validation(
				"at least one kitchen provider must be configured".into(),
			));
		}
		for (restaurant_id, kitchen) in &self.kitchens {
			if kitchen.endpoint.is_empty() {
				return Err(ConfigError::Validation(format!(
					"kitchens.{}.endpoint must not be empty",
					restaurant_id
				)));
			}
			if let Some(polling) = &kitchen.polling {
				validate_polling(polling, &format!("kitchens.{}.polling", restaurant_id))?;
			}
		}
		if self.delivery.endpoint.is_empty() {
			return Err(ConfigError::Validation(
				"delivery.endpoint must not be empty".into(),
			));
		}
		if let Some(polling) = &self.delivery.polling {
			validate_polling(polling, "delivery.polling")?;
		}
		validate_polling(&self.polling, "polling")?;
		Ok(())
	}
}

fn validate_polling(polling: &PollConfig, section: &str) -> Result<(), ConfigError> {
	if polling.interval_ms == 0 {
		return Err(ConfigError::Validation(format!(
			"{}.interval_ms must be positive",
			section
		)));
	}
	if polling.backoff_multiplier < 1.0 {
		return Err(ConfigError::Validation(format!(
			"{}.backoff_multiplier must be at least 1.0",
			section
		)));
	}
	if !(0.0..1.0).contains(&polling.jitter) {
		return Err(ConfigError::Validation(format!(
			"{}.jitter must be in [0, 1)",
			section
		)));
	}
	if polling.max_attempts == 0 {
		return Err(ConfigError::Validation(format!(
			"{}.max_attempts must be at least 1",
			section
		)));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	const SAMPLE: &str = r#"
		[orchestrator]
		id = "catering-orchestrator"

		[storage]
		primary = "memory"
		tracking_ttl_seconds = 3600

		[polling]
		interval_ms = 500
		max_lifetime_seconds = 120

		[kitchens.silpo]
		mode = "polling"
		endpoint = "http://localhost:8001/api"
		pickup_address = "Velyka Vasylkivska 100, Kyiv"

		[kitchens.kfc]
		mode = "webhook"
		endpoint = "http://localhost:8002/api"
		pickup_address = "Khreshchatyk 21, Kyiv"

		[delivery]
		provider = "uklon"
		endpoint = "http://localhost:8003/drivers"

		[api]
		port = 8080
	"#;

	#[test]
	fn parses_sample_config() {
		let config = Config::from_toml_str(SAMPLE).unwrap();
		assert_eq!(config.orchestrator.id, "catering-orchestrator");
		assert_eq!(config.storage.tracking_ttl_seconds, 3600);
		assert_eq!(config.polling.interval_ms, 500);
		// Unset polling fields fall back to defaults.
		assert_eq!(config.polling.max_attempts, 5);
		assert_eq!(config.kitchens["silpo"].mode, ProviderMode::Polling);
		assert_eq!(config.kitchens["kfc"].mode, ProviderMode::Webhook);
		assert_eq!(config.delivery.provider, "uklon");
		let api = config.api.unwrap();
		assert!(api.enabled);
		assert_eq!(api.port, 8080);
	}

	#[test]
	fn kitchen_status_map_defaults_and_overrides() {
		let config = Config::from_toml_str(SAMPLE).unwrap();
		let silpo = &config.kitchens["silpo"];
		assert_eq!(
			silpo.status_map("silpo").map("cooked").unwrap(),
			CanonicalStatus::Cooked
		);

		let with_override = format!(
			"{}\n[kitchens.silpo.statuses]\nready = \"cooked\"\n",
			SAMPLE
		);
		let config = Config::from_toml_str(&with_override).unwrap();
		let map = config.kitchens["silpo"].status_map("silpo");
		assert_eq!(map.map("ready").unwrap(), CanonicalStatus::Cooked);
		assert!(map.map("cooked").is_err());
	}

	#[test]
	fn rejects_invalid_jitter() {
		let raw = SAMPLE.replace("interval_ms = 500", "interval_ms = 500\n\t\tjitter = 1.5");
		let err = Config::from_toml_str(&raw).unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
	}

	#[test]
	fn rejects_empty_kitchen_set() {
		let raw = r#"
			[orchestrator]
			id = "x"
			[kitchens]
			[delivery]
			provider = "uklon"
			endpoint = "http://localhost:8003/drivers"
		"#;
		let err = Config::from_toml_str(raw).unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
	}

	#[test]
	fn rejects_unknown_mode() {
		let raw = SAMPLE.replace("mode = \"polling\"", "mode = \"carrier-pigeon\"");
		let err = Config::from_toml_str(&raw).unwrap_err();
		assert!(matches!(err, ConfigError::Parse(_)));
	}

	#[tokio::test]
	async fn loads_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(SAMPLE.as_bytes()).unwrap();
		let config = Config::from_file(file.path().to_str().unwrap()).await.unwrap();
		assert_eq!(config.kitchens.len(), 2);
	}
}
