//! Storage namespace identifiers.

use std::fmt;

/// Namespaces for the key-value tracking store.
///
/// Provides type safety for storage operations by replacing string
/// literals with strongly typed variants. External-reference index
/// namespaces are derived per provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorageNamespace {
	/// Tracking records, keyed by internal order id.
	Orders,
	/// External-reference index for one provider, keyed by external id.
	ExternalRefs(String),
}

impl StorageNamespace {
	/// Returns the string representation of the namespace.
	pub fn as_string(&self) -> String {
		match self {
			StorageNamespace::Orders => "orders".to_string(),
			StorageNamespace::ExternalRefs(provider) => format!("{}_orders", provider),
		}
	}
}

impl fmt::Display for StorageNamespace {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.as_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn external_ref_namespace_is_scoped_per_provider() {
		assert_eq!(StorageNamespace::Orders.as_string(), "orders");
		assert_eq!(
			StorageNamespace::ExternalRefs("kfc".into()).as_string(),
			"kfc_orders"
		);
	}
}
