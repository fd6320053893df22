//! Ephemeral tracking record schema.
//!
//! One tracking record exists per in-flight order. It is the single shared
//! mutable resource touched by segment workers, webhook ingest and the
//! delivery dispatcher, and lives in the tracking store under the
//! `orders` namespace until the order reaches a terminal status.

use crate::CanonicalStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Geographic coordinate pair reported by delivery providers.
pub type Location = (f64, f64);

/// Per-restaurant slice of an in-flight order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentState {
	/// Identifier assigned by the external provider, set on first create.
	pub external_id: Option<String>,
	/// Canonical status of this segment, forward-only.
	pub status: CanonicalStatus,
	/// Prebuilt provider request body for this segment's item group.
	pub request_body: serde_json::Value,
}

impl SegmentState {
	/// Creates a fresh segment awaiting its first provider call.
	pub fn new(request_body: serde_json::Value) -> Self {
		Self {
			external_id: None,
			status: CanonicalStatus::NotStarted,
			request_body,
		}
	}
}

/// Delivery slice of an in-flight order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryState {
	/// Identifier assigned by the delivery provider.
	pub external_id: Option<String>,
	/// Canonical status of the delivery phase.
	pub status: CanonicalStatus,
	/// Last reported courier location.
	pub location: Option<Location>,
}

impl Default for DeliveryState {
	fn default() -> Self {
		Self {
			external_id: None,
			status: CanonicalStatus::NotStarted,
			location: None,
		}
	}
}

/// Ephemeral orchestration state for one order.
///
/// The key set of `restaurants` is fixed at schedule time to exactly the
/// restaurants present among the order's items and never changes
/// afterward.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackingRecord {
	/// Segment state per restaurant identifier.
	pub restaurants: HashMap<String, SegmentState>,
	/// Delivery phase state.
	#[serde(default)]
	pub delivery: DeliveryState,
}

impl TrackingRecord {
	/// Whether every segment has reached `Cooked`.
	///
	/// An empty restaurant map is never considered cooked; a record is
	/// only ever created with at least one segment.
	pub fn all_cooked(&self) -> bool {
		!self.restaurants.is_empty()
			&& self
				.restaurants
				.values()
				.all(|segment| segment.status == CanonicalStatus::Cooked)
	}
}

/// Entry in the external-reference index.
///
/// Maps an external provider order id back to the internal order and the
/// restaurant segment it belongs to, so inbound webhooks can be routed.
/// Written once when a push-style sub-order is created, read many times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalRef {
	/// Internal order identifier.
	pub internal_order_id: String,
	/// Restaurant segment the external order belongs to.
	pub restaurant_id: String,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn all_cooked_requires_every_segment() {
		let mut record = TrackingRecord::default();
		assert!(!record.all_cooked());

		record
			.restaurants
			.insert("silpo".into(), SegmentState::new(serde_json::json!({})));
		record
			.restaurants
			.insert("kfc".into(), SegmentState::new(serde_json::json!({})));
		assert!(!record.all_cooked());

		record.restaurants.get_mut("silpo").unwrap().status = CanonicalStatus::Cooked;
		assert!(!record.all_cooked());

		record.restaurants.get_mut("kfc").unwrap().status = CanonicalStatus::Cooked;
		assert!(record.all_cooked());
	}
}
