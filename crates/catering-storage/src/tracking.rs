//! Typed tracking store for in-flight orders.
//!
//! The tracking record is shared by every segment worker, the webhook
//! ingest and the delivery dispatcher, all of which read the whole record
//! and write one field of it. To rule out the lost-update hazard of that
//! pattern, every mutation runs under an order-scoped async mutex from a
//! lock table, so two writers touching different segments of the same
//! record serialize their read-modify-write cycles.
//!
//! All writes are conditional: a status that does not advance the stored
//! one is a duplicate or stale update and produces no write at all, which
//! keeps webhook redelivery and unchanged polls idempotent.

use crate::{StorageError, StorageService};
use catering_types::{
	CanonicalStatus, Location, StorageNamespace, TrackingRecord,
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors raised by tracking store operations.
#[derive(Debug, Error)]
pub enum TrackingError {
	/// The record was not initialized at schedule time; a precondition
	/// violation for every worker of that order.
	#[error("No tracking record for order '{0}'")]
	MissingTrackingRecord(String),
	/// The record exists but lacks the expected restaurant key. The
	/// key set is fixed at schedule time, so this is also a
	/// precondition violation.
	#[error("Order '{order_id}' has no segment for restaurant '{restaurant_id}'")]
	MissingSegment {
		order_id: String,
		restaurant_id: String,
	},
	/// Error from the underlying storage backend.
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
}

/// A mutation to apply to one segment of a tracking record.
#[derive(Debug, Clone)]
pub enum SegmentUpdate {
	/// First provider response: record the external id and the mapped
	/// initial status.
	Created {
		external_id: String,
		status: CanonicalStatus,
	},
	/// A subsequent status observation for an already-created segment.
	Status(CanonicalStatus),
}

/// Outcome of a conditional segment write.
#[derive(Debug, Clone, Copy)]
pub struct SegmentWrite {
	/// Whether the record was actually written.
	pub changed: bool,
	/// The segment's status after the operation.
	pub status: CanonicalStatus,
}

/// Tracking store with order-scoped locking and conditional writes.
pub struct TrackingStore {
	storage: Arc<StorageService>,
	locks: DashMap<String, Arc<Mutex<()>>>,
	ttl: Option<Duration>,
}

impl TrackingStore {
	/// Creates a tracking store over the given storage service.
	///
	/// The TTL applies to every record write and must outlive the
	/// longest worker lifetime.
	pub fn new(storage: Arc<StorageService>, ttl: Option<Duration>) -> Self {
		Self {
			storage,
			locks: DashMap::new(),
			ttl,
		}
	}

	fn lock_for(&self, order_id: &str) -> Arc<Mutex<()>> {
		self.locks
			.entry(order_id.to_string())
			.or_insert_with(|| Arc::new(Mutex::new(())))
			.clone()
	}

	async fn read(&self, order_id: &str) -> Result<TrackingRecord, TrackingError> {
		self.storage
			.retrieve(&StorageNamespace::Orders.as_string(), order_id)
			.await
			.map_err(|e| match e {
				StorageError::NotFound => {
					TrackingError::MissingTrackingRecord(order_id.to_string())
				}
				other => TrackingError::Storage(other),
			})
	}

	async fn write(&self, order_id: &str, record: &TrackingRecord) -> Result<(), TrackingError> {
		self.storage
			.store_with_ttl(
				&StorageNamespace::Orders.as_string(),
				order_id,
				record,
				self.ttl,
			)
			.await
			.map_err(TrackingError::Storage)
	}

	/// Initializes the record for a freshly scheduled order.
	pub async fn init(&self, order_id: &str, record: &TrackingRecord) -> Result<(), TrackingError> {
		self.write(order_id, record).await
	}

	/// Returns the current record for an order.
	pub async fn get(&self, order_id: &str) -> Result<TrackingRecord, TrackingError> {
		self.read(order_id).await
	}

	/// Applies a conditional update to one segment under the order lock.
	///
	/// Status changes only ever move forward: an equal status is a
	/// duplicate and a lower-ranked one is stale, and neither produces a
	/// write. The caller can use `changed` to decide whether a
	/// completion check is warranted.
	pub async fn update_segment(
		&self,
		order_id: &str,
		restaurant_id: &str,
		update: SegmentUpdate,
	) -> Result<SegmentWrite, TrackingError> {
		let lock = self.lock_for(order_id);
		let _guard = lock.lock().await;

		let mut record = self.read(order_id).await?;
		let segment = record.restaurants.get_mut(restaurant_id).ok_or_else(|| {
			TrackingError::MissingSegment {
				order_id: order_id.to_string(),
				restaurant_id: restaurant_id.to_string(),
			}
		})?;

		let write = match update {
			SegmentUpdate::Created {
				external_id,
				status,
			} => {
				segment.external_id = Some(external_id);
				if status.rank() > segment.status.rank() {
					segment.status = status;
				}
				SegmentWrite {
					changed: true,
					status: segment.status,
				}
			}
			SegmentUpdate::Status(status) => {
				if status.rank() > segment.status.rank() {
					segment.status = status;
					SegmentWrite {
						changed: true,
						status,
					}
				} else {
					if status != segment.status {
						tracing::debug!(
							order_id,
							restaurant_id,
							stale = %status,
							current = %segment.status,
							"Dropping stale segment status"
						);
					}
					SegmentWrite {
						changed: false,
						status: segment.status,
					}
				}
			}
		};

		if write.changed {
			self.write(order_id, &record).await?;
		}
		Ok(write)
	}

	/// Applies a conditional update to the delivery sub-record.
	///
	/// Returns whether anything was written. Unchanged status and
	/// location between two consecutive polls produce no write.
	pub async fn update_delivery(
		&self,
		order_id: &str,
		external_id: Option<&str>,
		status: CanonicalStatus,
		location: Option<Location>,
	) -> Result<bool, TrackingError> {
		let lock = self.lock_for(order_id);
		let _guard = lock.lock().await;

		let mut record = self.read(order_id).await?;
		let delivery = &mut record.delivery;

		let mut changed = false;
		if let Some(external_id) = external_id {
			if delivery.external_id.as_deref() != Some(external_id) {
				delivery.external_id = Some(external_id.to_string());
				changed = true;
			}
		}
		if status.rank() > delivery.status.rank() {
			delivery.status = status;
			changed = true;
		}
		if location.is_some() && delivery.location != location {
			delivery.location = location;
			changed = true;
		}

		if changed {
			self.write(order_id, &record).await?;
		}
		Ok(changed)
	}

	/// Drops the order's lock entry once the order is terminal.
	///
	/// The entry is only removed while no caller holds a clone of the
	/// mutex; a straggler worker keeps it alive, so a concurrent writer
	/// can never be handed a second lock for the same record. The
	/// record itself is left to expire through its TTL.
	pub fn retire(&self, order_id: &str) {
		self.locks
			.remove_if(order_id, |_, lock| Arc::strong_count(lock) == 1);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::memory::MemoryStorage;
	use catering_types::SegmentState;

	fn store() -> Arc<TrackingStore> {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		Arc::new(TrackingStore::new(storage, None))
	}

	fn two_segment_record() -> TrackingRecord {
		let mut record = TrackingRecord::default();
		record
			.restaurants
			.insert("silpo".into(), SegmentState::new(serde_json::json!({})));
		record
			.restaurants
			.insert("kfc".into(), SegmentState::new(serde_json::json!({})));
		record
	}

	#[tokio::test]
	async fn missing_record_is_a_precondition_violation() {
		let store = store();
		let err = store
			.update_segment("ghost", "silpo", SegmentUpdate::Status(CanonicalStatus::Cooking))
			.await
			.unwrap_err();
		assert!(matches!(err, TrackingError::MissingTrackingRecord(_)));
	}

	#[tokio::test]
	async fn missing_segment_is_a_precondition_violation() {
		let store = store();
		store.init("o1", &two_segment_record()).await.unwrap();
		let err = store
			.update_segment("o1", "sushiya", SegmentUpdate::Status(CanonicalStatus::Cooking))
			.await
			.unwrap_err();
		assert!(matches!(err, TrackingError::MissingSegment { .. }));
	}

	#[tokio::test]
	async fn duplicate_status_produces_no_write() {
		let store = store();
		store.init("o1", &two_segment_record()).await.unwrap();

		let first = store
			.update_segment("o1", "silpo", SegmentUpdate::Status(CanonicalStatus::Cooking))
			.await
			.unwrap();
		assert!(first.changed);

		let replay = store
			.update_segment("o1", "silpo", SegmentUpdate::Status(CanonicalStatus::Cooking))
			.await
			.unwrap();
		assert!(!replay.changed);
		assert_eq!(replay.status, CanonicalStatus::Cooking);
	}

	#[tokio::test]
	async fn stale_status_never_regresses_a_segment() {
		let store = store();
		store.init("o1", &two_segment_record()).await.unwrap();

		store
			.update_segment("o1", "silpo", SegmentUpdate::Status(CanonicalStatus::Cooked))
			.await
			.unwrap();
		let stale = store
			.update_segment("o1", "silpo", SegmentUpdate::Status(CanonicalStatus::Cooking))
			.await
			.unwrap();
		assert!(!stale.changed);
		assert_eq!(stale.status, CanonicalStatus::Cooked);
	}

	#[tokio::test]
	async fn created_records_external_id_and_initial_status() {
		let store = store();
		store.init("o1", &two_segment_record()).await.unwrap();

		let write = store
			.update_segment(
				"o1",
				"kfc",
				SegmentUpdate::Created {
					external_id: "kfc-1".into(),
					status: CanonicalStatus::Cooking,
				},
			)
			.await
			.unwrap();
		assert!(write.changed);

		let record = store.get("o1").await.unwrap();
		let segment = &record.restaurants["kfc"];
		assert_eq!(segment.external_id.as_deref(), Some("kfc-1"));
		assert_eq!(segment.status, CanonicalStatus::Cooking);
	}

	#[tokio::test]
	async fn concurrent_writers_on_different_segments_lose_nothing() {
		let store = store();
		store.init("o1", &two_segment_record()).await.unwrap();

		let mut handles = Vec::new();
		for restaurant in ["silpo", "kfc"] {
			let store = Arc::clone(&store);
			handles.push(tokio::spawn(async move {
				for status in [CanonicalStatus::Cooking, CanonicalStatus::Cooked] {
					store
						.update_segment("o1", restaurant, SegmentUpdate::Status(status))
						.await
						.unwrap();
				}
			}));
		}
		for handle in handles {
			handle.await.unwrap();
		}

		let record = store.get("o1").await.unwrap();
		assert_eq!(record.restaurants["silpo"].status, CanonicalStatus::Cooked);
		assert_eq!(record.restaurants["kfc"].status, CanonicalStatus::Cooked);
		assert!(record.all_cooked());
	}

	#[tokio::test]
	async fn retire_spares_the_lock_while_a_straggler_holds_it() {
		let store = store();
		store.init("o1", &two_segment_record()).await.unwrap();

		let straggler = store.lock_for("o1");
		let guard = straggler.lock().await;
		store.retire("o1");
		assert!(store.locks.contains_key("o1"));

		// Mutations arriving after a premature retire still serialize
		// against the straggler's mutex, not a freshly minted one.
		assert!(Arc::ptr_eq(&straggler, &store.lock_for("o1")));

		drop(guard);
		drop(straggler);
		store.retire("o1");
		assert!(!store.locks.contains_key("o1"));
	}

	#[tokio::test]
	async fn unchanged_delivery_poll_writes_nothing() {
		let store = store();
		store.init("o1", &two_segment_record()).await.unwrap();

		let first = store
			.update_delivery(
				"o1",
				Some("uklon-1"),
				CanonicalStatus::Delivery,
				Some((50.45, 30.52)),
			)
			.await
			.unwrap();
		assert!(first);

		let repeat = store
			.update_delivery(
				"o1",
				Some("uklon-1"),
				CanonicalStatus::Delivery,
				Some((50.45, 30.52)),
			)
			.await
			.unwrap();
		assert!(!repeat);

		let moved = store
			.update_delivery(
				"o1",
				Some("uklon-1"),
				CanonicalStatus::Delivery,
				Some((50.46, 30.53)),
			)
			.await
			.unwrap();
		assert!(moved);
	}
}
