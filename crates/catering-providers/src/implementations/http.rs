//! HTTP kitchen provider implementation.
//!
//! Speaks the common provider REST contract:
//! `POST {base}/orders` with `{"order": [{"dish", "quantity"}, ...]}`
//! and `GET {base}/orders/{id}`, both answering `{id, status, location?}`.
//!
//! Failures are classified into the provider error taxonomy here, at the
//! boundary: connection problems and 5xx responses are transient and
//! retriable, 4xx responses and undecodable bodies are permanent.

use crate::KitchenInterface;
use async_trait::async_trait;
use catering_types::{ExternalSnapshot, ProviderError, SubOrderRequest};

/// Kitchen adapter over a provider's REST API.
pub struct HttpKitchen {
	/// Provider name, used in error reporting.
	name: String,
	/// Base URL up to but excluding `/orders`.
	base_url: String,
	client: reqwest::Client,
}

impl HttpKitchen {
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

	fn transport_error(&self, e: reqwest::Error) -> ProviderError {
		// Anything that never produced a response is worth retrying.
		ProviderError::Transient(format!("{} request failed: {}", self.name, e))
	}
}

#[async_trait]
impl KitchenInterface for HttpKitchen {
	async fn create_sub_order(
		&self,
		body: &SubOrderRequest,
	) -> Result<ExternalSnapshot, ProviderError> {
		let url = format!("{}/orders", self.base_url);
		let response = self
			.client
			.post(&url)
			.json(body)
			.send()
			.await
			.map_err(|e| self.transport_error(e))?;
		let snapshot = self.decode(response).await?;
		tracing::debug!(
			provider = %self.name,
			external_id = %snapshot.id,
			status = %snapshot.status,
			"Created sub-order"
		);
		Ok(snapshot)
	}

	async fn fetch_sub_order(
		&self,
		external_id: &str,
	) -> Result<ExternalSnapshot, ProviderError> {
		let url = format!("{}/orders/{}", self.base_url, external_id);
		let response = self
			.client
			.get(&url)
			.send()
			.await
			.map_err(|e| self.transport_error(e))?;
		self.decode(response).await
	}
}
