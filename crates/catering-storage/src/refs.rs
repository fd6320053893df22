//! External-reference index.
//!
//! Push-style providers notify us with their own order id. The index maps
//! that id back to `(internal_order_id, restaurant_id)` so webhook ingest
//! can route the notification. Entries are written once at sub-order
//! creation and read many times, since providers redeliver.

use crate::{StorageError, StorageService};
use catering_types::{ExternalRef, StorageNamespace};
use std::sync::Arc;

/// Index from external provider order ids to internal routing data.
pub struct ExternalRefIndex {
	storage: Arc<StorageService>,
}

impl ExternalRefIndex {
	/// Creates an index over the given storage service.
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Records the routing entry for a freshly created sub-order.
	pub async fn record(
		&self,
		provider: &str,
		external_id: &str,
		entry: &ExternalRef,
	) -> Result<(), StorageError> {
		self.storage
			.store(
				&StorageNamespace::ExternalRefs(provider.to_string()).as_string(),
				external_id,
				entry,
			)
			.await
	}

	/// Looks up the routing entry for an inbound notification.
	///
	/// A miss yields `None`: stray or duplicate notifications are
	/// expected and handled by the caller as a no-op.
	pub async fn lookup(
		&self,
		provider: &str,
		external_id: &str,
	) -> Result<Option<ExternalRef>, StorageError> {
		match self
			.storage
			.retrieve(
				&StorageNamespace::ExternalRefs(provider.to_string()).as_string(),
				external_id,
			)
			.await
		{
			Ok(entry) => Ok(Some(entry)),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::memory::MemoryStorage;

	#[tokio::test]
	async fn lookup_roundtrip_and_miss() {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let index = ExternalRefIndex::new(storage);

		index
			.record(
				"kfc",
				"kfc-1",
				&ExternalRef {
					internal_order_id: "o1".into(),
					restaurant_id: "kfc".into(),
				},
			)
			.await
			.unwrap();

		let hit = index.lookup("kfc", "kfc-1").await.unwrap().unwrap();
		assert_eq!(hit.internal_order_id, "o1");
		assert_eq!(hit.restaurant_id, "kfc");

		// Stray notification id resolves to a miss, not an error.
		assert!(index.lookup("kfc", "kfc-999").await.unwrap().is_none());
		// Namespaces are provider-scoped.
		assert!(index.lookup("silpo", "kfc-1").await.unwrap().is_none());
	}
}
