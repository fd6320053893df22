//! HTTP server for the catering orchestrator API.
//!
//! Two surfaces share one server: the customer-facing order endpoints
//! under `/api`, and the provider-facing webhook endpoint under
//! `/webhooks/{provider}`. Webhooks are always acknowledged with a 200,
//! even when processing fails, because the sender cannot repair a bad
//! notification by redelivering it.

use axum::{
	extract::{Path, State},
	http::StatusCode,
	response::{IntoResponse, Json},
	routing::{get, post},
	Router,
};
use catering_config::ApiConfig;
use catering_core::{new_order, OrchestratorEngine, OrchestratorError, WebhookIngest};
use catering_storage::{OrderStoreError, TrackingError};
use catering_types::{OrderItem, ProviderError, WebhookNotification};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Reference to the orchestration engine for processing requests.
	pub engine: Arc<OrchestratorEngine>,
}

/// Body of `POST /api/orders`.
#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
	/// Requested dishes across any number of restaurants.
	pub items: Vec<OrderItem>,
	/// Expected delivery date.
	pub eta: NaiveDate,
}

/// Starts the HTTP server for the API.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<OrchestratorEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(engine);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Catering API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Builds the router with routing and middleware.
fn router(engine: Arc<OrchestratorEngine>) -> Router {
	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/orders", post(handle_place_order))
				.route("/orders/{id}", get(handle_get_order))
				.route("/orders/{id}/tracking", get(handle_get_tracking)),
		)
		.route("/webhooks/{provider}", post(handle_webhook))
		.layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
		.with_state(AppState { engine })
}

fn error_body(message: impl std::fmt::Display) -> Json<serde_json::Value> {
	Json(serde_json::json!({ "error": message.to_string() }))
}

/// Handles POST /api/orders requests.
///
/// Places a new order and schedules its orchestration. The response is
/// returned as soon as the segment workers are spawned; progress is
/// observable through the tracking endpoint.
async fn handle_place_order(
	State(state): State<AppState>,
	Json(request): Json<PlaceOrderRequest>,
) -> impl IntoResponse {
	let order = new_order(request.items, request.eta);
	match state.engine.place_order(order).await {
		Ok(order) => (StatusCode::CREATED, Json(serde_json::json!(order))).into_response(),
		Err(
			e @ (OrchestratorError::EmptyOrder(_)
			| OrchestratorError::Provider(ProviderError::UnsupportedProvider(_))),
		) => (StatusCode::UNPROCESSABLE_ENTITY, error_body(e)).into_response(),
		Err(e) => {
			tracing::error!(error = %e, "Order placement failed");
			(StatusCode::INTERNAL_SERVER_ERROR, error_body(e)).into_response()
		}
	}
}

/// Handles GET /api/orders/{id} requests.
async fn handle_get_order(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> impl IntoResponse {
	match state.engine.context().orders.get(&id).await {
		Ok(order) => (StatusCode::OK, Json(serde_json::json!(order))).into_response(),
		Err(OrderStoreError::NotFound(_)) => {
			(StatusCode::NOT_FOUND, error_body(format!("Order not found: {}", id)))
				.into_response()
		}
		Err(e) => {
			tracing::error!(order_id = %id, error = %e, "Order retrieval failed");
			(StatusCode::INTERNAL_SERVER_ERROR, error_body(e)).into_response()
		}
	}
}

/// Handles GET /api/orders/{id}/tracking requests.
///
/// Returns the in-flight tracking record: per-restaurant segment state
/// and the delivery phase. Terminal orders eventually lose their record
/// through its TTL and answer 404 here; the durable order endpoint stays
/// authoritative.
async fn handle_get_tracking(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> impl IntoResponse {
	match state.engine.context().tracking.get(&id).await {
		Ok(record) => (StatusCode::OK, Json(serde_json::json!(record))).into_response(),
		Err(TrackingError::MissingTrackingRecord(_)) => {
			(StatusCode::NOT_FOUND, error_body(format!("No tracking for order: {}", id)))
				.into_response()
		}
		Err(e) => {
			tracing::error!(order_id = %id, error = %e, "Tracking retrieval failed");
			(StatusCode::INTERNAL_SERVER_ERROR, error_body(e)).into_response()
		}
	}
}

/// Handles POST /webhooks/{provider} requests.
async fn handle_webhook(
	Path(provider): Path<String>,
	State(state): State<AppState>,
	Json(notification): Json<WebhookNotification>,
) -> StatusCode {
	let ingest = WebhookIngest::new(state.engine.context());
	if let Err(e) = ingest.handle(&provider, &notification).await {
		tracing::error!(
			provider = %provider,
			external_id = %notification.id,
			error = %e,
			"Webhook processing failed"
		);
	}
	StatusCode::OK
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn place_order_request_deserializes() {
		let raw = serde_json::json!({
			"items": [
				{"dish": "borsch", "quantity": 2, "restaurant": "silpo", "price": 120.0}
			],
			"eta": "2025-07-10"
		});
		let request: PlaceOrderRequest = serde_json::from_value(raw).unwrap();
		assert_eq!(request.items.len(), 1);
		assert_eq!(request.items[0].restaurant, "silpo");
		assert_eq!(request.eta, NaiveDate::from_ymd_opt(2025, 7, 10).unwrap());
	}

	#[test]
	fn webhook_notification_deserializes_without_location() {
		let raw = serde_json::json!({"id": "kfc-1", "status": "cooked"});
		let notification: WebhookNotification = serde_json::from_value(raw).unwrap();
		assert_eq!(notification.id, "kfc-1");
		assert!(notification.location.is_none());
	}
}
