//! Thread-safe in-memory [`CredentialStore`] for process-local sessions and tests.

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenKind, TokenSecret},
	store::{CredentialStore, StoreFuture},
};

type Slot = Arc<RwLock<Option<CredentialPair>>>;

/// Keeps the credential pair in-process; clones share the same slot.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Slot);
impl MemoryStore {
	/// Creates a store seeded with `pair`.
	pub fn with_pair(pair: CredentialPair) -> Self {
		Self(Arc::new(RwLock::new(Some(pair))))
	}

	/// Returns a snapshot of the stored pair.
	pub fn snapshot(&self) -> Option<CredentialPair> {
		self.0.read().clone()
	}

	fn get_now(slot: &Slot, kind: TokenKind) -> Option<TokenSecret> {
		slot.read().as_ref().map(|pair| pair.get(kind).clone())
	}
}
impl CredentialStore for MemoryStore {
	fn get(&self, kind: TokenKind) -> StoreFuture<'_, Option<TokenSecret>> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(Self::get_now(&slot, kind)) })
	}

	fn set<'a>(&'a self, pair: &'a CredentialPair) -> StoreFuture<'a, ()> {
		let slot = self.0.clone();
		let pair = pair.to_owned();

		Box::pin(async move {
			*slot.write() = Some(pair);

			Ok(())
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			slot.write().take();

			Ok(())
		})
	}
}
