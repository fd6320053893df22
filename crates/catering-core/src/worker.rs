//! Segment workers.
//!
//! One worker drives one restaurant segment of an order from
//! `NotStarted` to `Cooked`. Polling-style providers are driven by a
//! bounded poll loop; push-style providers get the initial create call
//! plus an external-reference index entry, after which webhook ingest
//! takes over (with a watchdog so a lost webhook cannot stall the
//! segment forever).

use crate::{
	retry_transient, CompletionDetector, OrchestratorContext, PollPolicy,
};
use catering_providers::KitchenHandle;
use catering_storage::{SegmentUpdate, SegmentWrite, TrackingError};
use catering_types::{
	CanonicalStatus, ExternalRef, OrchestratorEvent, ProviderError, SubOrderRequest,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::time::Instant;

/// Reasons a worker stops without cooking its segment.
#[derive(Debug, Error)]
enum WorkerError {
	#[error(transparent)]
	Provider(#[from] ProviderError),
	#[error(transparent)]
	Tracking(#[from] TrackingError),
	#[error("Segment lifetime of {0:?} exceeded")]
	LifetimeExceeded(std::time::Duration),
	#[error("Completion check failed: {0}")]
	Completion(String),
}

/// Concurrent unit of work for one restaurant segment.
pub struct SegmentWorker {
	ctx: Arc<OrchestratorContext>,
	order_id: String,
	handle: Arc<KitchenHandle>,
	policy: PollPolicy,
}

impl SegmentWorker {
	/// Creates a worker for one segment.
	pub fn new(
		ctx: Arc<OrchestratorContext>,
		order_id: String,
		handle: Arc<KitchenHandle>,
		policy: PollPolicy,
	) -> Self {
		Self {
			ctx,
			order_id,
			handle,
			policy,
		}
	}

	/// Drives the segment to a terminal state.
	pub async fn run(self) {
		let result = match self.handle.kind {
			catering_types::ProviderKind::Polling => self.run_polling().await,
			catering_types::ProviderKind::Push => self.run_push().await,
		};
		if let Err(e) = result {
			self.report(e).await;
		}
	}

	/// Contains a failure to this segment and escalates per policy.
	async fn report(&self, error: WorkerError) {
		match error {
			// The record was not initialized correctly at schedule
			// time. Abort without touching sibling segments; the order
			// can never complete, so it is failed durably.
			WorkerError::Tracking(e @ TrackingError::MissingTrackingRecord(_))
			| WorkerError::Tracking(e @ TrackingError::MissingSegment { .. }) => {
				tracing::error!(
					order_id = %self.order_id,
					restaurant_id = %self.handle.restaurant_id,
					error = %e,
					"Tracking precondition violated, aborting worker"
				);
				self.ctx.fail_order(&self.order_id, &e.to_string()).await;
			}
			other => {
				self.ctx
					.fail_segment(
						&self.order_id,
						&self.handle.restaurant_id,
						&other.to_string(),
					)
					.await;
			}
		}
	}

	/// Poll loop for short-polling providers.
	async fn run_polling(&self) -> Result<(), WorkerError> {
		let deadline = Instant::now() + self.policy.max_lifetime;
		let mut shutdown = self.ctx.shutdown.clone();

		loop {
			if self.ctx.order_is_terminal(&self.order_id).await {
				tracing::debug!(
					order_id = %self.order_id,
					restaurant_id = %self.handle.restaurant_id,
					"Order is terminal, stopping worker"
				);
				return Ok(());
			}

			let write = self.observe_once(deadline).await?;
			if write.changed {
				self.ctx.event_bus.publish(OrchestratorEvent::SegmentUpdated {
					order_id: self.order_id.clone(),
					restaurant_id: self.handle.restaurant_id.clone(),
					status: write.status,
				});
			}
			match write.status {
				CanonicalStatus::Cooked => {
					if write.changed {
						CompletionDetector::new(Arc::clone(&self.ctx))
							.check(&self.order_id)
							.await
							.map_err(|e| WorkerError::Completion(e.to_string()))?;
					}
					return Ok(());
				}
				CanonicalStatus::Failed => return Ok(()),
				_ => {}
			}

			let delay = self.policy.jittered_interval();
			if Instant::now() + delay >= deadline {
				return Err(WorkerError::LifetimeExceeded(self.policy.max_lifetime));
			}
			tokio::select! {
				_ = tokio::time::sleep(delay) => {}
				_ = shutdown.changed() => {
					if *shutdown.borrow() {
						return Ok(());
					}
				}
			}
		}
	}

	/// One observation: create the sub-order on the first pass,
	/// otherwise fetch and conditionally write the mapped status.
	///
	/// Transient-failure retries are budgeted from whatever remains of
	/// the loop's deadline, so they spend the segment's lifetime rather
	/// than extending it.
	async fn observe_once(&self, deadline: Instant) -> Result<SegmentWrite, WorkerError> {
		let budget = deadline.saturating_duration_since(Instant::now());
		let record = self.ctx.tracking.get(&self.order_id).await?;
		let segment = record
			.restaurants
			.get(&self.handle.restaurant_id)
			.ok_or_else(|| TrackingError::MissingSegment {
				order_id: self.order_id.clone(),
				restaurant_id: self.handle.restaurant_id.clone(),
			})?;

		match &segment.external_id {
			None => {
				let request: SubOrderRequest = serde_json::from_value(
					segment.request_body.clone(),
				)
				.map_err(|e| {
					ProviderError::Permanent(format!("stored request body is invalid: {}", e))
				})?;
				let snapshot = retry_transient(&self.policy, budget, || {
					self.handle.kitchen.create_sub_order(&request)
				})
				.await?;
				let status = self.handle.statuses.map(&snapshot.status)?;
				tracing::info!(
					order_id = %self.order_id,
					restaurant_id = %self.handle.restaurant_id,
					external_id = %snapshot.id,
					%status,
					"Created sub-order"
				);
				let write = self
					.ctx
					.tracking
					.update_segment(
						&self.order_id,
						&self.handle.restaurant_id,
						SegmentUpdate::Created {
							external_id: snapshot.id,
							status,
						},
					)
					.await?;
				Ok(write)
			}
			Some(external_id) => {
				let snapshot = retry_transient(&self.policy, budget, || {
					self.handle.kitchen.fetch_sub_order(external_id)
				})
				.await?;
				let status = self.handle.statuses.map(&snapshot.status)?;
				let write = self
					.ctx
					.tracking
					.update_segment(
						&self.order_id,
						&self.handle.restaurant_id,
						SegmentUpdate::Status(status),
					)
					.await?;
				Ok(write)
			}
		}
	}

	/// Create-then-wait path for push providers.
	///
	/// The worker performs the initial create call and records the
	/// external-reference index entry so inbound webhooks can be routed.
	/// It then lingers as a watchdog: if no webhook cooks or fails the
	/// segment within the lifetime bound, the segment is failed rather
	/// than left perpetually in flight.
	async fn run_push(&self) -> Result<(), WorkerError> {
		let deadline = Instant::now() + self.policy.max_lifetime;
		let write = self.observe_once(deadline).await?;
		if write.changed {
			self.ctx.event_bus.publish(OrchestratorEvent::SegmentUpdated {
				order_id: self.order_id.clone(),
				restaurant_id: self.handle.restaurant_id.clone(),
				status: write.status,
			});
		}

		let record = self.ctx.tracking.get(&self.order_id).await?;
		let segment = record
			.restaurants
			.get(&self.handle.restaurant_id)
			.ok_or_else(|| TrackingError::MissingSegment {
				order_id: self.order_id.clone(),
				restaurant_id: self.handle.restaurant_id.clone(),
			})?;
		if let Some(external_id) = &segment.external_id {
			self.ctx
				.refs
				.record(
					&self.handle.provider,
					external_id,
					&ExternalRef {
						internal_order_id: self.order_id.clone(),
						restaurant_id: self.handle.restaurant_id.clone(),
					},
				)
				.await
				.map_err(TrackingError::Storage)?;
		}

		if write.status == CanonicalStatus::Cooked {
			CompletionDetector::new(Arc::clone(&self.ctx))
				.check(&self.order_id)
				.await
				.map_err(|e| WorkerError::Completion(e.to_string()))?;
			return Ok(());
		}

		// Watchdog: wait out the rest of the lifetime, then verify the
		// webhook actually arrived. The deadline includes whatever the
		// create call's retries already spent.
		let mut shutdown = self.ctx.shutdown.clone();
		tokio::select! {
			_ = tokio::time::sleep_until(deadline) => {}
			_ = shutdown.changed() => {
				if *shutdown.borrow() {
					return Ok(());
				}
			}
		}
		if self.ctx.order_is_terminal(&self.order_id).await {
			return Ok(());
		}
		let record = self.ctx.tracking.get(&self.order_id).await?;
		let cooked = record
			.restaurants
			.get(&self.handle.restaurant_id)
			.map(|segment| segment.status.rank() >= CanonicalStatus::Cooked.rank())
			.unwrap_or(false);
		if cooked {
			Ok(())
		} else {
			Err(WorkerError::LifetimeExceeded(self.policy.max_lifetime))
		}
	}
}
