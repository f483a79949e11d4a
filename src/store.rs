//! Storage contracts and built-in credential store implementations.
//!
//! The gateway only ever reads and writes credentials through [`CredentialStore`], so the
//! persistence mechanism is chosen when the gateway is constructed: [`FileStore`] for a
//! persistent backing, [`MemoryStore`] for process-local sessions, and [`NoopStore`] for
//! execution contexts where persistence is unavailable.

pub mod file;
pub mod memory;
pub mod noop;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use noop::NoopStore;

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenKind, TokenSecret},
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract for the access/refresh pair.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Fetches one half of the stored pair, if present.
	fn get(&self, kind: TokenKind) -> StoreFuture<'_, Option<TokenSecret>>;

	/// Persists or replaces both tokens.
	fn set<'a>(&'a self, pair: &'a CredentialPair) -> StoreFuture<'a, ()>;

	/// Removes both tokens.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;

	#[test]
	fn store_error_converts_into_gateway_error_with_source() {
		let store_error = StoreError::Backend { message: "disk unavailable".into() };
		let gateway_error: Error = store_error.clone().into();

		assert!(matches!(gateway_error, Error::Storage(_)));
		assert!(gateway_error.to_string().contains("disk unavailable"));

		let source = StdError::source(&gateway_error)
			.expect("Gateway error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
