//! Kitchen provider module for the catering orchestrator.
//!
//! This module abstracts over external kitchen providers. Every provider
//! exposes the same two capabilities, create a sub-order and fetch its
//! current snapshot, regardless of whether the orchestrator polls it or
//! the provider pushes webhooks. Providers are registered per restaurant
//! at configuration load time; a restaurant without a registered adapter
//! fails fast at schedule time instead of stalling a segment forever.

use async_trait::async_trait;
use catering_types::{
	ExternalSnapshot, ProviderError, ProviderKind, StatusMap, SubOrderRequest,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Re-export implementations
pub mod implementations {
	pub mod http;
}

/// Trait defining the capability set of a kitchen provider.
///
/// Implementations translate these calls into the provider's REST
/// contract. Status strings in the returned snapshots are the provider's
/// raw vocabulary; callers map them through the handle's status map.
#[async_trait]
pub trait KitchenInterface: Send + Sync {
	/// Creates a sub-order with the provider and returns its snapshot.
	async fn create_sub_order(
		&self,
		body: &SubOrderRequest,
	) -> Result<ExternalSnapshot, ProviderError>;

	/// Fetches the current snapshot of an existing sub-order.
	async fn fetch_sub_order(&self, external_id: &str)
		-> Result<ExternalSnapshot, ProviderError>;
}

/// A registered kitchen provider with everything a worker needs.
pub struct KitchenHandle {
	/// Restaurant identifier this handle serves.
	pub restaurant_id: String,
	/// Provider name, used for external-reference index namespacing.
	pub provider: String,
	/// Integration style: polled or push.
	pub kind: ProviderKind,
	/// The adapter implementation.
	pub kitchen: Arc<dyn KitchenInterface>,
	/// Total status translation table for this provider.
	pub statuses: StatusMap,
	/// Pickup address handed to the delivery provider.
	pub pickup_address: String,
}

impl std::fmt::Debug for KitchenHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("KitchenHandle")
			.field("restaurant_id", &self.restaurant_id)
			.field("provider", &self.provider)
			.finish_non_exhaustive()
	}
}

/// Capability table mapping restaurant identifiers to provider handles.
///
/// Built once at configuration load time. Lookups of unregistered
/// restaurants are an [`ProviderError::UnsupportedProvider`] condition,
/// distinct from any transient failure.
#[derive(Default)]
pub struct ProviderRegistry {
	kitchens: HashMap<String, Arc<KitchenHandle>>,
}

impl ProviderRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a handle under its restaurant identifier.
	pub fn register(&mut self, handle: KitchenHandle) {
		self.kitchens
			.insert(handle.restaurant_id.clone(), Arc::new(handle));
	}

	/// Resolves the handle for a restaurant.
	pub fn get(&self, restaurant_id: &str) -> Result<Arc<KitchenHandle>, ProviderError> {
		self.kitchens
			.get(restaurant_id)
			.cloned()
			.ok_or_else(|| ProviderError::UnsupportedProvider(restaurant_id.to_string()))
	}

	/// Resolves a handle by provider name, used for webhook routing.
	pub fn by_provider(&self, provider: &str) -> Option<Arc<KitchenHandle>> {
		self.kitchens
			.values()
			.find(|handle| handle.provider == provider)
			.cloned()
	}

	/// Iterates over all registered handles.
	pub fn iter(&self) -> impl Iterator<Item = &Arc<KitchenHandle>> {
		self.kitchens.values()
	}
}
