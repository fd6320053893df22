//! Delivery provider module for the catering orchestrator.
//!
//! Once every kitchen segment of an order is cooked, the dispatcher
//! submits one consolidated delivery request to the delivery provider and
//! follows the courier until the order is delivered. This module defines
//! the provider capability trait, its HTTP implementation and the service
//! the dispatcher talks to.

use async_trait::async_trait;
use catering_types::{
	CanonicalStatus, DeliveryRequest, ExternalSnapshot, ProviderError, StatusMap,
};

/// Re-export implementations
pub mod implementations {
	pub mod http;
}

/// Trait defining the capability set of a delivery provider.
#[async_trait]
pub trait DeliveryInterface: Send + Sync {
	/// Creates a delivery and returns its initial snapshot, including
	/// the provider-assigned id and the courier's starting location.
	async fn create_delivery(
		&self,
		body: &DeliveryRequest,
	) -> Result<ExternalSnapshot, ProviderError>;

	/// Fetches the current snapshot of an existing delivery.
	async fn fetch_delivery(&self, external_id: &str)
		-> Result<ExternalSnapshot, ProviderError>;
}

/// Service wrapping the configured delivery provider.
///
/// Bundles the adapter with its status map so callers receive canonical
/// statuses and never see the provider's raw vocabulary.
pub struct DeliveryService {
	provider_name: String,
	provider: Box<dyn DeliveryInterface>,
	statuses: StatusMap,
}

impl DeliveryService {
	/// Creates a service over the given provider implementation.
	pub fn new(
		provider_name: impl Into<String>,
		provider: Box<dyn DeliveryInterface>,
		statuses: StatusMap,
	) -> Self {
		Self {
			provider_name: provider_name.into(),
			provider,
			statuses,
		}
	}

	/// Name of the configured provider.
	pub fn provider_name(&self) -> &str {
		&self.provider_name
	}

	/// Creates a delivery and maps its initial status.
	pub async fn create(
		&self,
		body: &DeliveryRequest,
	) -> Result<(ExternalSnapshot, CanonicalStatus), ProviderError> {
		let snapshot = self.provider.create_delivery(body).await?;
		let status = self.statuses.map(&snapshot.status)?;
		Ok((snapshot, status))
	}

	/// Fetches a delivery and maps its current status.
	pub async fn fetch(
		&self,
		external_id: &str,
	) -> Result<(ExternalSnapshot, CanonicalStatus), ProviderError> {
		let snapshot = self.provider.fetch_delivery(external_id).await?;
		let status = self.statuses.map(&snapshot.status)?;
		Ok((snapshot, status))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct ScriptedDelivery;

	#[async_trait]
	impl DeliveryInterface for ScriptedDelivery {
		async fn create_delivery(
			&self,
			body: &DeliveryRequest,
		) -> Result<ExternalSnapshot, ProviderError> {
			assert_eq!(body.addresses.len(), body.comments.len());
			Ok(ExternalSnapshot {
				id: "uklon-1".into(),
				status: "not_started".into(),
				location: Some((50.45, 30.52)),
			})
		}

		async fn fetch_delivery(
			&self,
			external_id: &str,
		) -> Result<ExternalSnapshot, ProviderError> {
			Ok(ExternalSnapshot {
				id: external_id.to_string(),
				status: "delivered".into(),
				location: Some((50.40, 30.60)),
			})
		}
	}

	#[tokio::test]
	async fn statuses_are_mapped_at_the_service_boundary() {
		let service = DeliveryService::new(
			"uklon",
			Box::new(ScriptedDelivery),
			StatusMap::delivery_default("uklon"),
		);

		let request = DeliveryRequest {
			addresses: vec!["Khreshchatyk 21, Kyiv".into()],
			comments: vec!["Pick up the kfc part of order o1".into()],
		};
		let (snapshot, status) = service.create(&request).await.unwrap();
		assert_eq!(snapshot.id, "uklon-1");
		assert_eq!(status, CanonicalStatus::Delivery);

		let (_, status) = service.fetch("uklon-1").await.unwrap();
		assert_eq!(status, CanonicalStatus::Delivered);
	}
}
