//! Durable order model.
//!
//! An order is the customer-facing aggregate: requested items, computed
//! total, expected delivery date and the canonical status the orchestrator
//! advances as segments progress. Items are immutable once the order is
//! placed and group implicitly by the restaurant their dish belongs to.

use crate::CanonicalStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// A single requested dish within an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
	/// Name of the dish as known to the kitchen provider.
	pub dish: String,
	/// Requested quantity.
	pub quantity: u32,
	/// Restaurant identifier the dish belongs to.
	pub restaurant: String,
	/// Unit price, used for the computed total.
	pub price: f64,
}

/// Durable customer order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
	/// Unique internal identifier.
	pub id: String,
	/// Current canonical status.
	pub status: CanonicalStatus,
	/// Requested items, immutable once placed.
	pub items: Vec<OrderItem>,
	/// Computed total across all items.
	pub total: f64,
	/// Expected delivery date.
	pub eta: NaiveDate,
	/// Timestamp when this order was created.
	pub created_at: u64,
	/// Timestamp when this order was last updated.
	pub updated_at: u64,
}

impl Order {
	/// Creates a new order in the `NotStarted` state with a computed total.
	pub fn new(id: impl Into<String>, items: Vec<OrderItem>, eta: NaiveDate) -> Self {
		let total = items
			.iter()
			.map(|item| item.price * item.quantity as f64)
			.sum();
		let now = unix_now();
		Self {
			id: id.into(),
			status: CanonicalStatus::NotStarted,
			items,
			total,
			eta,
			created_at: now,
			updated_at: now,
		}
	}

	/// Groups the order's items by restaurant identifier.
	///
	/// The key set of the returned map is exactly the restaurant set the
	/// tracking record is initialized with at schedule time.
	pub fn items_by_restaurant(&self) -> HashMap<String, Vec<&OrderItem>> {
		let mut groups: HashMap<String, Vec<&OrderItem>> = HashMap::new();
		for item in &self.items {
			groups.entry(item.restaurant.clone()).or_default().push(item);
		}
		groups
	}
}

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs()
}
