//! Webhook ingest.
//!
//! Push-style providers notify us of status changes instead of being
//! polled. A notification carries the provider's own order id; the
//! external-reference index routes it to the internal order and segment.
//! Processing is idempotent under redelivery: a repeated status produces
//! no write and no completion re-check, and a notification that cannot
//! be routed is dropped as a no-op, never surfaced as an error.

use crate::{CompletionDetector, OrchestratorContext, OrchestratorError};
use catering_storage::{SegmentUpdate, TrackingError};
use catering_types::{CanonicalStatus, OrchestratorEvent, WebhookNotification};
use std::sync::Arc;

/// Handles inbound provider notifications.
pub struct WebhookIngest {
	ctx: Arc<OrchestratorContext>,
}

impl WebhookIngest {
	/// Creates an ingest over the shared context.
	pub fn new(ctx: Arc<OrchestratorContext>) -> Self {
		Self { ctx }
	}

	/// Applies one notification from the named provider.
	///
	/// Returns `Ok(())` for dropped notifications as well; only
	/// configuration defects (unmapped status) and storage failures
	/// surface as errors, and the HTTP layer still acknowledges those
	/// with a 200 so providers do not retry a hopeless delivery.
	pub async fn handle(
		&self,
		provider: &str,
		notification: &WebhookNotification,
	) -> Result<(), OrchestratorError> {
		let Some(reference) = self
			.ctx
			.refs
			.lookup(provider, &notification.id)
			.await
			.map_err(TrackingError::Storage)?
		else {
			tracing::debug!(
				provider,
				external_id = %notification.id,
				"Dropping notification with no matching reference"
			);
			return Ok(());
		};

		let handle = self.ctx.registry.get(&reference.restaurant_id)?;
		let status = match handle.statuses.map(&notification.status) {
			Ok(status) => status,
			Err(e) => {
				// Incomplete status table; a configuration defect, not
				// a runtime fluke.
				tracing::error!(
					provider,
					external_id = %notification.id,
					error = %e,
					"Webhook carried an unmapped status"
				);
				return Err(e.into());
			}
		};

		let write = self
			.ctx
			.tracking
			.update_segment(
				&reference.internal_order_id,
				&reference.restaurant_id,
				SegmentUpdate::Status(status),
			)
			.await?;
		if !write.changed {
			tracing::debug!(
				provider,
				order_id = %reference.internal_order_id,
				restaurant_id = %reference.restaurant_id,
				"Notification carried an already-applied status"
			);
			return Ok(());
		}

		self.ctx.event_bus.publish(OrchestratorEvent::SegmentUpdated {
			order_id: reference.internal_order_id.clone(),
			restaurant_id: reference.restaurant_id.clone(),
			status: write.status,
		});
		if write.status == CanonicalStatus::Cooked {
			CompletionDetector::new(Arc::clone(&self.ctx))
				.check(&reference.internal_order_id)
				.await?;
		}
		Ok(())
	}
}
