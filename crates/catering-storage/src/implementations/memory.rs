//! In-memory storage backend implementation.
//!
//! This module provides a memory-based implementation of the
//! StorageInterface trait. It is the backend used by the in-process
//! deployment and by tests: tracking state is ephemeral by design, so no
//! persistence across restarts is required. TTL is honored via expiry
//! timestamps with lazy eviction on read plus an explicit cleanup sweep.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
// tokio's Instant so that paused-clock tests can drive expiry.
use tokio::time::Instant;

/// A stored value with its optional expiry instant.
struct Entry {
	value: Vec<u8>,
	expires_at: Option<Instant>,
}

impl Entry {
	fn is_expired(&self, now: Instant) -> bool {
		self.expires_at.is_some_and(|at| at <= now)
	}
}

/// In-memory storage implementation.
///
/// Stores data in a HashMap protected by a read-write lock.
pub struct MemoryStorage {
	store: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryStorage {
	/// Creates a new MemoryStorage instance.
	pub fn new() -> Self {
		Self {
			store: Arc::new(RwLock::new(HashMap::new())),
		}
	}
}

impl Default for MemoryStorage {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let now = Instant::now();
		{
			let store = self.store.read().await;
			match store.get(key) {
				Some(entry) if !entry.is_expired(now) => return Ok(entry.value.clone()),
				Some(_) => {}
				None => return Err(StorageError::NotFound),
			}
		}
		// Expired entry: evict lazily under the write lock.
		let mut store = self.store.write().await;
		if store.get(key).is_some_and(|entry| entry.is_expired(now)) {
			store.remove(key);
		}
		Err(StorageError::NotFound)
	}

	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		store.insert(
			key.to_string(),
			Entry {
				value,
				expires_at: ttl.map(|ttl| Instant::now() + ttl),
			},
		);
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		store.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let now = Instant::now();
		let store = self.store.read().await;
		Ok(store.get(key).is_some_and(|entry| !entry.is_expired(now)))
	}

	async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		let now = Instant::now();
		let mut store = self.store.write().await;
		let before = store.len();
		store.retain(|_, entry| !entry.is_expired(now));
		Ok(before - store.len())
	}
}
