//! Delivery dispatch.
//!
//! Started exactly once per order by the completion detector. Builds one
//! consolidated delivery request out of every restaurant segment's pickup
//! address, submits it, then long-polls the delivery provider until the
//! courier delivers, writing the tracking record's delivery sub-record
//! only when the status or location actually changes.

use crate::{retry_transient, OrchestratorContext};
use catering_types::{CanonicalStatus, DeliveryRequest, OrchestratorEvent};
use std::sync::Arc;
use tokio::time::Instant;

/// Single delivery workflow for one order.
pub struct DeliveryDispatcher {
	ctx: Arc<OrchestratorContext>,
	order_id: String,
}

impl DeliveryDispatcher {
	/// Creates a dispatcher for one cooked order.
	pub fn new(ctx: Arc<OrchestratorContext>, order_id: String) -> Self {
		Self { ctx, order_id }
	}

	/// Drives the order from `Cooked` to `Delivered`.
	pub async fn run(self) {
		if let Err(reason) = self.dispatch().await {
			if let Err(e) = self
				.ctx
				.tracking
				.update_delivery(&self.order_id, None, CanonicalStatus::Failed, None)
				.await
			{
				tracing::warn!(
					order_id = %self.order_id,
					error = %e,
					"Could not record delivery failure"
				);
			}
			self.ctx.fail_order(&self.order_id, &reason).await;
		}
	}

	async fn dispatch(&self) -> Result<(), String> {
		let request = self.build_request().await?;
		let policy = &self.ctx.delivery_policy;
		// One lifetime bound covers creation retries and the follow
		// loop together.
		let deadline = Instant::now() + policy.max_lifetime;

		let (snapshot, mut current) = retry_transient(policy, policy.max_lifetime, || {
			self.ctx.delivery.create(&request)
		})
		.await
		.map_err(|e| e.to_string())?;
		let external_id = snapshot.id.clone();
		self.ctx
			.tracking
			.update_delivery(&self.order_id, Some(&external_id), current, snapshot.location)
			.await
			.map_err(|e| e.to_string())?;
		self.ctx
			.orders
			.advance_status(&self.order_id, CanonicalStatus::Delivery)
			.await
			.map_err(|e| e.to_string())?;

		tracing::info!(
			order_id = %self.order_id,
			provider = %self.ctx.delivery.provider_name(),
			%external_id,
			"Delivery created"
		);
		self.ctx.event_bus.publish(OrchestratorEvent::DeliveryStarted {
			order_id: self.order_id.clone(),
			external_id: external_id.clone(),
		});

		let mut shutdown = self.ctx.shutdown.clone();

		while current != CanonicalStatus::Delivered {
			if current == CanonicalStatus::NotDelivered {
				return Err("delivery provider gave up on the order".into());
			}
			if self.ctx.order_is_terminal(&self.order_id).await {
				tracing::debug!(
					order_id = %self.order_id,
					"Order is terminal, stopping delivery loop"
				);
				return Ok(());
			}

			let delay = policy.jittered_interval();
			if Instant::now() + delay >= deadline {
				return Err(format!(
					"delivery lifetime of {:?} exceeded",
					policy.max_lifetime
				));
			}
			tokio::select! {
				_ = tokio::time::sleep(delay) => {}
				_ = shutdown.changed() => {
					if *shutdown.borrow() {
						return Ok(());
					}
				}
			}

			let budget = deadline.saturating_duration_since(Instant::now());
			let (snapshot, status) =
				retry_transient(policy, budget, || self.ctx.delivery.fetch(&external_id))
					.await
					.map_err(|e| e.to_string())?;
			let changed = self
				.ctx
				.tracking
				.update_delivery(&self.order_id, None, status, snapshot.location)
				.await
				.map_err(|e| e.to_string())?;
			if changed {
				tracing::info!(
					order_id = %self.order_id,
					%status,
					location = ?snapshot.location,
					"Delivery progressed"
				);
				self.ctx.event_bus.publish(OrchestratorEvent::DeliveryUpdated {
					order_id: self.order_id.clone(),
					status,
					location: snapshot.location,
				});
			}
			current = status;
		}

		self.ctx
			.orders
			.advance_status(&self.order_id, CanonicalStatus::Delivered)
			.await
			.map_err(|e| e.to_string())?;
		tracing::info!(order_id = %self.order_id, "Order delivered");
		self.ctx.event_bus.publish(OrchestratorEvent::Delivered {
			order_id: self.order_id.clone(),
		});
		self.ctx.tracking.retire(&self.order_id);
		Ok(())
	}

	/// Builds the consolidated pickup list, one address and note per
	/// restaurant segment, in a stable order.
	async fn build_request(&self) -> Result<DeliveryRequest, String> {
		let record = self
			.ctx
			.tracking
			.get(&self.order_id)
			.await
			.map_err(|e| e.to_string())?;

		let mut restaurants: Vec<&String> = record.restaurants.keys().collect();
		restaurants.sort();

		let mut addresses = Vec::with_capacity(restaurants.len());
		let mut comments = Vec::with_capacity(restaurants.len());
		for restaurant_id in restaurants {
			let handle = self
				.ctx
				.registry
				.get(restaurant_id)
				.map_err(|e| e.to_string())?;
			addresses.push(handle.pickup_address.clone());
			comments.push(format!(
				"Pick up the {} part of order {}",
				restaurant_id, self.order_id
			));
		}
		Ok(DeliveryRequest {
			addresses,
			comments,
		})
	}
}
