//! Provider wire types and the provider error taxonomy.
//!
//! Every kitchen and delivery provider exposes the same minimal REST
//! shape: create an order, fetch an order. These are the request and
//! response bodies for that contract, plus the inbound webhook payload
//! and the error taxonomy the workers act on.

use crate::Location;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Integration style of a kitchen provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
	/// The orchestrator actively polls `GET /orders/{id}`.
	Polling,
	/// The provider pushes status changes to our webhook endpoint.
	Push,
}

/// One line of a provider sub-order request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubOrderItem {
	/// Dish name as known to the provider.
	pub dish: String,
	/// Requested quantity.
	pub quantity: u32,
}

/// Body of `POST /orders` for kitchen providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubOrderRequest {
	/// Items belonging to this provider's segment of the order.
	pub order: Vec<SubOrderItem>,
}

/// Provider-side view of a sub-order.
///
/// The status is the provider's raw vocabulary; translation into
/// [`crate::CanonicalStatus`] happens at the caller through a status map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalSnapshot {
	/// Identifier assigned by the provider.
	pub id: String,
	/// Provider-native status string.
	pub status: String,
	/// Courier location, reported by delivery-style providers only.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub location: Option<Location>,
}

/// Consolidated request submitted to the delivery provider.
///
/// One address and one pickup note per restaurant segment, in matching
/// positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRequest {
	/// Pickup addresses, one per restaurant.
	#[serde(rename = "address")]
	pub addresses: Vec<String>,
	/// Pickup notes for the courier, one per restaurant.
	#[serde(rename = "comment")]
	pub comments: Vec<String>,
}

/// Inbound webhook notification payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookNotification {
	/// External provider order id.
	pub id: String,
	/// Provider-native status string.
	pub status: String,
	/// Courier location, carried by delivery-style providers.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub location: Option<Location>,
}

/// Errors raised at the provider boundary.
///
/// The taxonomy decides retry behavior: transient failures are retried
/// with exponential backoff up to a bounded attempt count, everything
/// else fails the acting segment immediately.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
	/// Network failure or 5xx-class response; retriable.
	#[error("Transient provider error: {0}")]
	Transient(String),
	/// 4xx-class response or malformed body; not retriable.
	#[error("Permanent provider error: {0}")]
	Permanent(String),
	/// The provider emitted a status missing from its status map.
	/// A configuration defect, fatal for the acting worker.
	#[error("Unmapped status '{status}' from provider '{provider}'")]
	UnmappedStatus { provider: String, status: String },
	/// A restaurant has no registered adapter; raised at schedule time.
	#[error("No provider registered for restaurant '{0}'")]
	UnsupportedProvider(String),
}

impl ProviderError {
	/// Whether the error warrants a retry.
	pub fn is_transient(&self) -> bool {
		matches!(self, ProviderError::Transient(_))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn only_transient_errors_are_retriable() {
		assert!(ProviderError::Transient("connection reset".into()).is_transient());
		assert!(!ProviderError::Permanent("404".into()).is_transient());
		assert!(!ProviderError::UnmappedStatus {
			provider: "kfc".into(),
			status: "grilled".into(),
		}
		.is_transient());
		assert!(!ProviderError::UnsupportedProvider("sushiya".into()).is_transient());
	}

	#[test]
	fn sub_order_request_serializes_to_provider_shape() {
		let body = SubOrderRequest {
			order: vec![SubOrderItem {
				dish: "wings".into(),
				quantity: 2,
			}],
		};
		let json = serde_json::to_value(&body).unwrap();
		assert_eq!(
			json,
			serde_json::json!({"order": [{"dish": "wings", "quantity": 2}]})
		);
	}
}
