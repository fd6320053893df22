//! HTTP delivery provider implementation (uklon-shaped REST).
//!
//! `POST {base}/orders` with `{"address": [...], "comment": [...]}` and
//! `GET {base}/orders/{id}`, both answering `{id, status, location}`.

use crate::DeliveryInterface;
use async_trait::async_trait;
use catering_types::{DeliveryRequest, ExternalSnapshot, ProviderError};

/// Delivery adapter over a provider's REST API.
pub struct HttpDelivery {
	name: String,
	base_url: String,
	client: reqwest::Client,
}

impl HttpDelivery {
	/// Creates an adapter for the given provider endpoint.
	pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
		let mut base_url = base_url.into();
		while base_url.ends_with('/') {
			base_url.pop();
		}
		Self {
			name: name.into(),
			base_url,
			client: reqwest::Client::new(),
		}
	}

	async fn decode(&self, response: reqwest::Response) -> Result<ExternalSnapshot, ProviderError> {
		let status = response.status();
		if status.is_server_error() {
			return Err(ProviderError::Transient(format!(
				"{} responded {}",
				self.name, status
			)));
		}
		if !status.is_success() {
			return Err(ProviderError::Permanent(format!(
				"{} responded {}",
				self.name, status
			)));
		}
		response
			.json::<ExternalSnapshot>()
			.await
			.map_err(|e| ProviderError::Permanent(format!("{} malformed body: {}", self.name, e)))
	}
}

#[async_trait]
impl DeliveryInterface for HttpDelivery {
	async fn create_delivery(
		&self,
		body: &DeliveryRequest,
	) -> Result<ExternalSnapshot, ProviderError> {
		let url = format!("{}/orders", self.base_url);
		let response = self
			.client
			.post(&url)
			.json(body)
			.send()
			.await
			.map_err(|e| ProviderError::Transient(format!("{} request failed: {}", self.name, e)))?;
		let snapshot = self.decode(response).await?;
		tracing::debug!(
			provider = %self.name,
			external_id = %snapshot.id,
			"Created delivery"
		);
		Ok(snapshot)
	}

	async fn fetch_delivery(
		&self,
		external_id: &str,
	) -> Result<ExternalSnapshot, ProviderError> {
		let url = format!("{}/orders/{}", self.base_url, external_id);
		let response = self
			.client
			.get(&url)
			.send()
			.await
			.map_err(|e| ProviderError::Transient(format!("{} request failed: {}", self.name, e)))?;
		self.decode(response).await
	}
}
