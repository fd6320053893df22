//! Canonical status vocabulary and per-provider status maps.
//!
//! Every external provider speaks its own status dialect. The orchestrator
//! translates each of them into a single canonical enum at the boundary and
//! only ever reasons about canonical values internally. A provider status
//! with no mapping is a configuration defect, never silently skipped: an
//! unmapped status would freeze its segment forever.

use crate::ProviderError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Internal status shared by durable orders, segments and delivery.
///
/// Statuses are ordered by `rank` and only ever move forward; a lower or
/// equal rank arriving after a higher one is a duplicate or stale update
/// and is dropped by the tracking store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalStatus {
	/// No sub-order has been created with the provider yet.
	NotStarted,
	/// The kitchen accepted the sub-order and is preparing it.
	Cooking,
	/// The kitchen finished preparing the sub-order.
	Cooked,
	/// A courier is delivering the consolidated order.
	Delivery,
	/// The order reached the customer.
	Delivered,
	/// The delivery provider gave up on the order.
	NotDelivered,
	/// The order (or one of its parts) failed.
	Failed,
}

impl CanonicalStatus {
	/// Position of the status in the forward-only lifecycle.
	///
	/// Terminal statuses share the highest rank so that no transition out
	/// of them can ever be considered an advance.
	pub fn rank(&self) -> u8 {
		match self {
			CanonicalStatus::NotStarted => 0,
			CanonicalStatus::Cooking => 1,
			CanonicalStatus::Cooked => 2,
			CanonicalStatus::Delivery => 3,
			CanonicalStatus::Delivered => 4,
			CanonicalStatus::NotDelivered => 4,
			CanonicalStatus::Failed => 4,
		}
	}

	/// Whether the status ends the lifecycle.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			CanonicalStatus::Delivered | CanonicalStatus::NotDelivered | CanonicalStatus::Failed
		)
	}

	/// String form used on the wire and in storage.
	pub fn as_str(&self) -> &'static str {
		match self {
			CanonicalStatus::NotStarted => "not_started",
			CanonicalStatus::Cooking => "cooking",
			CanonicalStatus::Cooked => "cooked",
			CanonicalStatus::Delivery => "delivery",
			CanonicalStatus::Delivered => "delivered",
			CanonicalStatus::NotDelivered => "not_delivered",
			CanonicalStatus::Failed => "failed",
		}
	}
}

impl fmt::Display for CanonicalStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Total translation table from one provider's status strings to the
/// canonical enum.
///
/// The table must cover every value the provider can emit. Lookups of
/// unknown values fail with [`ProviderError::UnmappedStatus`], which is
/// fatal for the acting worker or webhook handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusMap {
	/// Provider this table belongs to, used in error reporting.
	pub provider: String,
	/// External status string to canonical status.
	pub entries: HashMap<String, CanonicalStatus>,
}

impl StatusMap {
	/// Creates a status map from explicit entries.
	pub fn new(provider: impl Into<String>, entries: HashMap<String, CanonicalStatus>) -> Self {
		Self {
			provider: provider.into(),
			entries,
		}
	}

	/// Translates an external status string into the canonical enum.
	pub fn map(&self, external: &str) -> Result<CanonicalStatus, ProviderError> {
		self.entries
			.get(external)
			.copied()
			.ok_or_else(|| ProviderError::UnmappedStatus {
				provider: self.provider.clone(),
				status: external.to_string(),
			})
	}

	/// Default table for kitchen providers that reuse the canonical
	/// cooking vocabulary (silpo, kfc).
	pub fn kitchen_default(provider: impl Into<String>) -> Self {
		Self::new(
			provider,
			HashMap::from([
				("not_started".to_string(), CanonicalStatus::NotStarted),
				("cooking".to_string(), CanonicalStatus::Cooking),
				("cooked".to_string(), CanonicalStatus::Cooked),
			]),
		)
	}

	/// Default table for the uklon-shaped delivery provider.
	pub fn delivery_default(provider: impl Into<String>) -> Self {
		Self::new(
			provider,
			HashMap::from([
				("not_started".to_string(), CanonicalStatus::Delivery),
				("delivery".to_string(), CanonicalStatus::Delivery),
				("delivered".to_string(), CanonicalStatus::Delivered),
				("canceled".to_string(), CanonicalStatus::NotDelivered),
			]),
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn kitchen_map_is_total_over_known_statuses() {
		let map = StatusMap::kitchen_default("silpo");
		for (external, expected) in [
			("not_started", CanonicalStatus::NotStarted),
			("cooking", CanonicalStatus::Cooking),
			("cooked", CanonicalStatus::Cooked),
		] {
			assert_eq!(map.map(external).unwrap(), expected);
		}
	}

	#[test]
	fn unmapped_status_is_an_error() {
		let map = StatusMap::kitchen_default("silpo");
		let err = map.map("microwaved").unwrap_err();
		assert!(matches!(
			err,
			ProviderError::UnmappedStatus { ref provider, ref status }
				if provider == "silpo" && status == "microwaved"
		));
	}

	#[test]
	fn delivery_map_covers_cancellation() {
		let map = StatusMap::delivery_default("uklon");
		assert_eq!(map.map("delivery").unwrap(), CanonicalStatus::Delivery);
		assert_eq!(map.map("delivered").unwrap(), CanonicalStatus::Delivered);
		assert_eq!(map.map("canceled").unwrap(), CanonicalStatus::NotDelivered);
	}

	#[test]
	fn ranks_are_monotonic_and_terminal_states_share_the_top() {
		assert!(CanonicalStatus::NotStarted.rank() < CanonicalStatus::Cooking.rank());
		assert!(CanonicalStatus::Cooking.rank() < CanonicalStatus::Cooked.rank());
		assert!(CanonicalStatus::Cooked.rank() < CanonicalStatus::Delivery.rank());
		assert_eq!(
			CanonicalStatus::Delivered.rank(),
			CanonicalStatus::Failed.rank()
		);
		assert!(CanonicalStatus::Failed.is_terminal());
		assert!(!CanonicalStatus::Cooked.is_terminal());
	}
}
