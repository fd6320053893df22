//! Event types for inter-component communication.
//!
//! Orchestration milestones flow through a broadcast event bus so the
//! service surface and tests can observe progress without coupling to the
//! workers. Events carry identifiers rather than whole records.

use crate::{CanonicalStatus, Location};
use serde::{Deserialize, Serialize};

/// Milestones emitted while an order is orchestrated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrchestratorEvent {
	/// The order's tracking record was initialized and workers started.
	Scheduled { order_id: String },
	/// A segment's status changed in the tracking record.
	SegmentUpdated {
		order_id: String,
		restaurant_id: String,
		status: CanonicalStatus,
	},
	/// A segment reached `Failed`.
	SegmentFailed {
		order_id: String,
		restaurant_id: String,
		reason: String,
	},
	/// Every segment is cooked; the durable order advanced to `Cooked`.
	Cooked { order_id: String },
	/// The delivery dispatcher created a delivery with the provider.
	DeliveryStarted {
		order_id: String,
		external_id: String,
	},
	/// The delivery status or location changed.
	DeliveryUpdated {
		order_id: String,
		status: CanonicalStatus,
		location: Option<Location>,
	},
	/// The durable order reached `Delivered`.
	Delivered { order_id: String },
	/// The durable order reached `Failed`.
	Failed { order_id: String, reason: String },
}
