//! Broadcast event bus for orchestration milestones.
//!
//! Components publish fire-and-forget events; the service surface and
//! tests subscribe to observe progress. Publishing never blocks and a
//! missing subscriber is not an error.

use catering_types::OrchestratorEvent;
use tokio::sync::broadcast;

/// Cloneable handle to the broadcast channel.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<OrchestratorEvent>,
}

impl EventBus {
	/// Creates an event bus with the given channel capacity.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Subscribes to all future events.
	pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event to all current subscribers.
	///
	/// Events are best-effort: with no subscribers the event is dropped.
	pub fn publish(&self, event: OrchestratorEvent) {
		let _ = self.sender.send(event);
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(256)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn events_reach_every_subscriber() {
		let bus = EventBus::new(8);
		let mut first = bus.subscribe();
		let mut second = bus.subscribe();

		bus.publish(OrchestratorEvent::Scheduled {
			order_id: "o1".into(),
		});

		for receiver in [&mut first, &mut second] {
			let event = receiver.recv().await.unwrap();
			assert!(matches!(
				event,
				OrchestratorEvent::Scheduled { ref order_id } if order_id == "o1"
			));
		}
	}

	#[tokio::test]
	async fn publishing_without_subscribers_is_fine() {
		let bus = EventBus::new(8);
		bus.publish(OrchestratorEvent::Scheduled {
			order_id: "o1".into(),
		});
	}
}
