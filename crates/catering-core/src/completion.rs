//! Completion detection.
//!
//! Invoked by every mutation that cooks a segment. The check itself is
//! cheap and racy by nature; the exactly-once guarantee lives in the
//! durable order store's compare-and-advance, so any number of callers
//! can race here and exactly one of them wins the `Cooked` transition
//! and starts the delivery dispatcher.

use crate::{DeliveryDispatcher, OrchestratorContext, OrchestratorError};
use catering_types::{CanonicalStatus, OrchestratorEvent};
use std::sync::Arc;

/// Decides whether an order is fully cooked and triggers delivery.
pub struct CompletionDetector {
	ctx: Arc<OrchestratorContext>,
}

impl CompletionDetector {
	/// Creates a detector over the shared context.
	pub fn new(ctx: Arc<OrchestratorContext>) -> Self {
		Self { ctx }
	}

	/// Runs the check-and-act sequence for one order.
	///
	/// Returns whether this caller won the `Cooked` transition. A false
	/// return means either not all segments are cooked yet or another
	/// caller already completed the order; both are no-ops.
	pub async fn check(&self, order_id: &str) -> Result<bool, OrchestratorError> {
		let record = self.ctx.tracking.get(order_id).await?;
		if !record.all_cooked() {
			tracing::debug!(order_id, "Order not fully cooked yet");
			return Ok(false);
		}

		let won = self
			.ctx
			.orders
			.advance_status(order_id, CanonicalStatus::Cooked)
			.await?;
		if !won {
			tracing::debug!(order_id, "Order already completed by a concurrent caller");
			return Ok(false);
		}

		tracing::info!(order_id, "All segments cooked, starting delivery");
		self.ctx.event_bus.publish(OrchestratorEvent::Cooked {
			order_id: order_id.to_string(),
		});
		let dispatcher = DeliveryDispatcher::new(Arc::clone(&self.ctx), order_id.to_string());
		tokio::spawn(dispatcher.run());
		Ok(true)
	}
}
