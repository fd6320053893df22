//! Builder for constructing orchestrator engines from configuration.
//!
//! Wires the storage backend, provider registry and delivery service the
//! configuration describes into an [`OrchestratorEngine`]. Components
//! with alternative implementations (the durable order store) can be
//! injected before building, which is how the service binary and tests
//! share this path.

use crate::OrchestratorEngine;
use catering_config::Config;
use catering_delivery::{implementations::http::HttpDelivery, DeliveryService};
use catering_providers::{implementations::http::HttpKitchen, KitchenHandle, ProviderRegistry};
use catering_storage::{
	implementations::memory::MemoryStorage, ExternalRefIndex, MemoryOrderStore, OrderStore,
	StorageInterface, StorageService, TrackingStore,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	/// The configuration references an unknown implementation.
	#[error("Configuration error: {0}")]
	Config(String),
}

/// Builder for an [`OrchestratorEngine`].
pub struct OrchestratorBuilder {
	config: Config,
	orders: Option<Arc<dyn OrderStore>>,
}

impl OrchestratorBuilder {
	/// Creates a builder with the given configuration.
	pub fn new(config: Config) -> Self {
		Self {
			config,
			orders: None,
		}
	}

	/// Overrides the durable order store.
	pub fn with_order_store(mut self, orders: Arc<dyn OrderStore>) -> Self {
		self.orders = Some(orders);
		self
	}

	/// Builds the engine from the configuration.
	pub fn build(self) -> Result<OrchestratorEngine, BuilderError> {
		let config = self.config;

		let backend: Box<dyn StorageInterface> = match config.storage.primary.as_str() {
			"memory" => Box::new(MemoryStorage::new()),
			other => {
				return Err(BuilderError::Config(format!(
					"Unknown storage backend '{}'",
					other
				)))
			}
		};
		let storage = Arc::new(StorageService::new(backend));
		let ttl = Duration::from_secs(config.storage.tracking_ttl_seconds);
		let tracking = Arc::new(TrackingStore::new(Arc::clone(&storage), Some(ttl)));
		let refs = Arc::new(ExternalRefIndex::new(Arc::clone(&storage)));
		let orders = self
			.orders
			.unwrap_or_else(|| Arc::new(MemoryOrderStore::new()));

		let mut registry = ProviderRegistry::new();
		for (restaurant_id, kitchen) in &config.kitchens {
			let provider = kitchen.provider_name(restaurant_id).to_string();
			registry.register(KitchenHandle {
				restaurant_id: restaurant_id.clone(),
				provider: provider.clone(),
				kind: kitchen.mode.into(),
				kitchen: Arc::new(HttpKitchen::new(provider, kitchen.endpoint.clone())),
				statuses: kitchen.status_map(restaurant_id),
				pickup_address: kitchen.pickup_address.clone(),
			});
		}

		let delivery = Arc::new(DeliveryService::new(
			config.delivery.provider.clone(),
			Box::new(HttpDelivery::new(
				config.delivery.provider.clone(),
				config.delivery.endpoint.clone(),
			)),
			config.delivery.status_map(),
		));

		Ok(OrchestratorEngine::new(
			config,
			storage,
			tracking,
			refs,
			orders,
			Arc::new(registry),
			delivery,
		))
	}
}
