//! Orchestration core for the catering order system.
//!
//! This module coordinates fulfillment of a customer order that is split
//! across independent kitchen providers and a delivery provider. Order
//! creation fans out one segment worker per restaurant; workers and the
//! webhook ingest mutate the shared tracking record; every mutation that
//! cooks a segment runs the completion detector, which advances the
//! durable order to `Cooked` exactly once and starts the delivery
//! dispatcher exactly once; the dispatcher follows the courier until the
//! order is `Delivered`.

use catering_config::Config;
use catering_delivery::DeliveryService;
use catering_providers::{KitchenHandle, ProviderRegistry};
use catering_storage::{
	ExternalRefIndex, OrderStore, OrderStoreError, SegmentUpdate, StorageService, TrackingError,
	TrackingStore,
};
use catering_types::{
	CanonicalStatus, Order, OrderItem, OrchestratorEvent, ProviderError, SegmentState,
	SubOrderItem, SubOrderRequest, TrackingRecord,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

pub mod builder;
pub mod completion;
pub mod dispatch;
pub mod event_bus;
pub mod ingest;
pub mod retry;
pub mod worker;

pub use builder::{BuilderError, OrchestratorBuilder};
pub use completion::CompletionDetector;
pub use dispatch::DeliveryDispatcher;
pub use event_bus::EventBus;
pub use ingest::WebhookIngest;
pub use retry::{retry_transient, PollPolicy};
pub use worker::SegmentWorker;

/// Errors that can occur during orchestration.
#[derive(Debug, Error)]
pub enum OrchestratorError {
	/// An order without items cannot be scheduled.
	#[error("Order '{0}' has no items")]
	EmptyOrder(String),
	/// Error from a provider adapter or registry lookup.
	#[error(transparent)]
	Provider(#[from] ProviderError),
	/// Error from the tracking store.
	#[error(transparent)]
	Tracking(#[from] TrackingError),
	/// Error from the durable order store.
	#[error(transparent)]
	OrderStore(#[from] OrderStoreError),
	/// Error assembling a stored payload.
	#[error("Serialization error: {0}")]
	Serialization(String),
}

/// Shared services every orchestration component works against.
///
/// Constructor-injected into workers, ingest, completion detection and
/// dispatch; there is no ambient global state.
pub struct OrchestratorContext {
	/// Tracking store for in-flight order state.
	pub tracking: Arc<TrackingStore>,
	/// External-reference index for webhook routing.
	pub refs: Arc<ExternalRefIndex>,
	/// Durable order store.
	pub orders: Arc<dyn OrderStore>,
	/// Kitchen provider registry keyed by restaurant identifier.
	pub registry: Arc<ProviderRegistry>,
	/// Delivery provider service.
	pub delivery: Arc<DeliveryService>,
	/// Event bus for orchestration milestones.
	pub event_bus: EventBus,
	/// Shutdown signal observed by every loop.
	pub shutdown: watch::Receiver<bool>,
	/// Default polling bounds.
	pub default_policy: PollPolicy,
	/// Per-restaurant polling overrides.
	pub kitchen_policies: HashMap<String, PollPolicy>,
	/// Polling bounds for the delivery loop.
	pub delivery_policy: PollPolicy,
}

impl OrchestratorContext {
	/// Polling bounds for one restaurant's worker.
	pub fn policy_for(&self, restaurant_id: &str) -> PollPolicy {
		self.kitchen_policies
			.get(restaurant_id)
			.unwrap_or(&self.default_policy)
			.clone()
	}

	/// Whether the durable order already reached a terminal status.
	///
	/// Loops use this as their cancellation check: once another segment
	/// failed the order (or it was cancelled externally), remaining
	/// workers stop instead of driving a dead order.
	pub async fn order_is_terminal(&self, order_id: &str) -> bool {
		match self.orders.get(order_id).await {
			Ok(order) => order.status.is_terminal(),
			Err(_) => true,
		}
	}

	/// Marks one segment failed and escalates to the whole order.
	///
	/// Failure policy: the first segment to fail fails the order. The
	/// durable transition is a compare-and-advance, so concurrent
	/// failures escalate once.
	pub async fn fail_segment(&self, order_id: &str, restaurant_id: &str, reason: &str) {
		tracing::error!(order_id, restaurant_id, reason, "Segment failed");
		if let Err(e) = self
			.tracking
			.update_segment(
				order_id,
				restaurant_id,
				SegmentUpdate::Status(CanonicalStatus::Failed),
			)
			.await
		{
			tracing::warn!(order_id, restaurant_id, error = %e, "Could not record segment failure");
		}
		self.event_bus.publish(OrchestratorEvent::SegmentFailed {
			order_id: order_id.to_string(),
			restaurant_id: restaurant_id.to_string(),
			reason: reason.to_string(),
		});
		self.fail_order(order_id, reason).await;
	}

	/// Advances the durable order to `Failed` if it is not terminal yet.
	pub async fn fail_order(&self, order_id: &str, reason: &str) {
		match self
			.orders
			.advance_status(order_id, CanonicalStatus::Failed)
			.await
		{
			Ok(true) => {
				tracing::error!(order_id, reason, "Order failed");
				self.event_bus.publish(OrchestratorEvent::Failed {
					order_id: order_id.to_string(),
					reason: reason.to_string(),
				});
				self.tracking.retire(order_id);
			}
			Ok(false) => {}
			Err(e) => {
				tracing::error!(order_id, error = %e, "Could not fail order");
			}
		}
	}
}

/// Main engine that owns the orchestration context and schedules orders.
pub struct OrchestratorEngine {
	config: Config,
	context: Arc<OrchestratorContext>,
	storage: Arc<StorageService>,
	shutdown_tx: watch::Sender<bool>,
}

impl std::fmt::Debug for OrchestratorEngine {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("OrchestratorEngine").finish_non_exhaustive()
	}
}

impl OrchestratorEngine {
	/// Creates an engine over pre-built components.
	///
	/// Most callers go through [`OrchestratorBuilder`]; tests inject
	/// mock providers and stores here directly.
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		config: Config,
		storage: Arc<StorageService>,
		tracking: Arc<TrackingStore>,
		refs: Arc<ExternalRefIndex>,
		orders: Arc<dyn OrderStore>,
		registry: Arc<ProviderRegistry>,
		delivery: Arc<DeliveryService>,
	) -> Self {
		let (shutdown_tx, shutdown_rx) = watch::channel(false);
		let default_policy = PollPolicy::from(&config.polling);
		let kitchen_policies = config
			.kitchens
			.iter()
			.filter_map(|(restaurant_id, kitchen)| {
				kitchen
					.polling
					.as_ref()
					.map(|polling| (restaurant_id.clone(), PollPolicy::from(polling)))
			})
			.collect();
		let delivery_policy = config
			.delivery
			.polling
			.as_ref()
			.map(PollPolicy::from)
			.unwrap_or_else(|| default_policy.clone());

		let context = Arc::new(OrchestratorContext {
			tracking,
			refs,
			orders,
			registry,
			delivery,
			event_bus: EventBus::default(),
			shutdown: shutdown_rx,
			default_policy,
			kitchen_policies,
			delivery_policy,
		});
		Self {
			config,
			context,
			storage,
			shutdown_tx,
		}
	}

	/// The engine's configuration.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// The shared orchestration context.
	pub fn context(&self) -> Arc<OrchestratorContext> {
		Arc::clone(&self.context)
	}

	/// The engine's event bus.
	pub fn event_bus(&self) -> &EventBus {
		&self.context.event_bus
	}

	/// Inserts a new durable order and schedules its orchestration.
	pub async fn place_order(&self, order: Order) -> Result<Order, OrchestratorError> {
		self.context.orders.insert(order.clone()).await?;
		self.schedule_order(&order).await?;
		Ok(order)
	}

	/// Schedules orchestration for an existing durable order.
	///
	/// Fans out one segment worker per restaurant group and returns
	/// immediately; nothing here blocks on provider calls. A restaurant
	/// without a registered adapter fails the order fast before any
	/// worker starts.
	pub async fn schedule_order(&self, order: &Order) -> Result<(), OrchestratorError> {
		let groups = order.items_by_restaurant();
		if groups.is_empty() {
			return Err(OrchestratorError::EmptyOrder(order.id.clone()));
		}

		// Resolve every adapter up front so an unsupported restaurant
		// cannot leave a sibling segment half-scheduled.
		let mut segments: Vec<(String, Arc<KitchenHandle>, SubOrderRequest)> = Vec::new();
		for (restaurant_id, items) in &groups {
			let handle = match self.context.registry.get(restaurant_id) {
				Ok(handle) => handle,
				Err(e) => {
					self.context
						.fail_order(&order.id, &e.to_string())
						.await;
					return Err(e.into());
				}
			};
			let request = SubOrderRequest {
				order: items
					.iter()
					.map(|item| SubOrderItem {
						dish: item.dish.clone(),
						quantity: item.quantity,
					})
					.collect(),
			};
			segments.push((restaurant_id.clone(), handle, request));
		}

		let mut record = TrackingRecord::default();
		for (restaurant_id, _, request) in &segments {
			let body = serde_json::to_value(request)
				.map_err(|e| OrchestratorError::Serialization(e.to_string()))?;
			record
				.restaurants
				.insert(restaurant_id.clone(), SegmentState::new(body));
		}
		self.context.tracking.init(&order.id, &record).await?;

		tracing::info!(
			order_id = %order.id,
			segments = segments.len(),
			"Scheduled order"
		);
		self.context.event_bus.publish(OrchestratorEvent::Scheduled {
			order_id: order.id.clone(),
		});

		for (restaurant_id, handle, _) in segments {
			let worker = SegmentWorker::new(
				self.context(),
				order.id.clone(),
				handle,
				self.context.policy_for(&restaurant_id),
			);
			tokio::spawn(worker.run());
		}
		Ok(())
	}

	/// Runs housekeeping until shutdown: periodic expired-entry sweeps
	/// over the tracking storage.
	pub async fn run(&self) {
		let mut shutdown = self.context.shutdown.clone();
		let interval = Duration::from_secs(self.config.storage.cleanup_interval_seconds);
		let mut ticker = tokio::time::interval(interval);
		ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
		loop {
			tokio::select! {
				_ = ticker.tick() => {
					match self.storage.cleanup_expired().await {
						Ok(0) => {}
						Ok(removed) => {
							tracing::debug!(removed, "Swept expired tracking entries");
						}
						Err(e) => {
							tracing::warn!(error = %e, "Cleanup sweep failed");
						}
					}
				}
				_ = shutdown.changed() => {
					if *shutdown.borrow() {
						break;
					}
				}
			}
		}
	}

	/// Signals every loop to stop.
	pub fn shutdown(&self) {
		let _ = self.shutdown_tx.send(true);
	}
}

/// Builds a durable order from request items with a generated id.
pub fn new_order(items: Vec<OrderItem>, eta: chrono::NaiveDate) -> Order {
	Order::new(uuid::Uuid::new_v4().to_string(), items, eta)
}
