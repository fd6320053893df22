//! Durable order store.
//!
//! The orchestration core only needs three operations from the durable
//! side: read an order, insert a new one, and conditionally advance its
//! status. `advance_status` is the single-writer guarantee behind the
//! exactly-once COOKED and DELIVERED transitions: it is a
//! compare-and-advance that succeeds for exactly one of any set of
//! concurrent callers.

use async_trait::async_trait;
use catering_types::{CanonicalStatus, Order, unix_now};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors raised by durable order operations.
#[derive(Debug, Error)]
pub enum OrderStoreError {
	/// No order with the given id.
	#[error("Order not found: {0}")]
	NotFound(String),
	/// An order with the given id already exists.
	#[error("Order already exists: {0}")]
	AlreadyExists(String),
	/// Error from the backing store.
	#[error("Backend error: {0}")]
	Backend(String),
}

/// Interface to the durable order record.
#[async_trait]
pub trait OrderStore: Send + Sync {
	/// Reads an order by id.
	async fn get(&self, order_id: &str) -> Result<Order, OrderStoreError>;

	/// Inserts a new order.
	async fn insert(&self, order: Order) -> Result<(), OrderStoreError>;

	/// Conditionally advances the order's status.
	///
	/// The transition succeeds only if the current status is not
	/// terminal and ranks strictly below `to`. Returns whether this
	/// caller won the transition; concurrent callers racing for the
	/// same advance see `false`.
	async fn advance_status(
		&self,
		order_id: &str,
		to: CanonicalStatus,
	) -> Result<bool, OrderStoreError>;
}

/// In-memory durable order store.
///
/// The compare-and-advance runs entirely under the write lock, so the
/// check and the update are atomic with respect to other callers.
pub struct MemoryOrderStore {
	orders: Arc<RwLock<HashMap<String, Order>>>,
}

impl MemoryOrderStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self {
			orders: Arc::new(RwLock::new(HashMap::new())),
		}
	}
}

impl Default for MemoryOrderStore {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
	async fn get(&self, order_id: &str) -> Result<Order, OrderStoreError> {
		let orders = self.orders.read().await;
		orders
			.get(order_id)
			.cloned()
			.ok_or_else(|| OrderStoreError::NotFound(order_id.to_string()))
	}

	async fn insert(&self, order: Order) -> Result<(), OrderStoreError> {
		let mut orders = self.orders.write().await;
		if orders.contains_key(&order.id) {
			return Err(OrderStoreError::AlreadyExists(order.id));
		}
		orders.insert(order.id.clone(), order);
		Ok(())
	}

	async fn advance_status(
		&self,
		order_id: &str,
		to: CanonicalStatus,
	) -> Result<bool, OrderStoreError> {
		let mut orders = self.orders.write().await;
		let order = orders
			.get_mut(order_id)
			.ok_or_else(|| OrderStoreError::NotFound(order_id.to_string()))?;

		if order.status.is_terminal() || order.status.rank() >= to.rank() {
			return Ok(false);
		}
		order.status = to;
		order.updated_at = unix_now();
		Ok(true)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use catering_types::OrderItem;
	use chrono::NaiveDate;

	fn sample_order(id: &str) -> Order {
		Order::new(
			id,
			vec![OrderItem {
				dish: "borsch".into(),
				quantity: 1,
				restaurant: "silpo".into(),
				price: 120.0,
			}],
			NaiveDate::from_ymd_opt(2025, 7, 10).unwrap(),
		)
	}

	#[tokio::test]
	async fn insert_and_get() {
		let store = MemoryOrderStore::new();
		store.insert(sample_order("o1")).await.unwrap();
		assert_eq!(store.get("o1").await.unwrap().id, "o1");
		assert!(matches!(
			store.insert(sample_order("o1")).await,
			Err(OrderStoreError::AlreadyExists(_))
		));
		assert!(matches!(
			store.get("missing").await,
			Err(OrderStoreError::NotFound(_))
		));
	}

	#[tokio::test]
	async fn advance_is_exactly_once_per_transition() {
		let store = Arc::new(MemoryOrderStore::new());
		store.insert(sample_order("o1")).await.unwrap();

		let mut handles = Vec::new();
		for _ in 0..8 {
			let store = Arc::clone(&store);
			handles.push(tokio::spawn(async move {
				store.advance_status("o1", CanonicalStatus::Cooked).await.unwrap()
			}));
		}
		let wins: usize = futures_count(handles).await;
		assert_eq!(wins, 1);
		assert_eq!(store.get("o1").await.unwrap().status, CanonicalStatus::Cooked);
	}

	#[tokio::test]
	async fn advance_refuses_regressions_and_terminal_exits() {
		let store = MemoryOrderStore::new();
		store.insert(sample_order("o1")).await.unwrap();

		assert!(store.advance_status("o1", CanonicalStatus::Cooked).await.unwrap());
		// Regression attempt.
		assert!(!store.advance_status("o1", CanonicalStatus::Cooking).await.unwrap());
		// Forward again.
		assert!(store.advance_status("o1", CanonicalStatus::Delivered).await.unwrap());
		// Terminal: nothing moves anymore.
		assert!(!store.advance_status("o1", CanonicalStatus::Failed).await.unwrap());
	}

	async fn futures_count(handles: Vec<tokio::task::JoinHandle<bool>>) -> usize {
		let mut wins = 0;
		for handle in handles {
			if handle.await.unwrap() {
				wins += 1;
			}
		}
		wins
	}
}
