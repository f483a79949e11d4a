//! [`CredentialStore`] for execution contexts without persistence.

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenKind, TokenSecret},
	store::{CredentialStore, StoreFuture},
};

/// Never holds credentials: reads are always absent and writes are discarded.
///
/// A gateway built on this store never attaches a bearer header and never refreshes, so
/// any 401 surfaces to the caller unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopStore;
impl CredentialStore for NoopStore {
	fn get(&self, _kind: TokenKind) -> StoreFuture<'_, Option<TokenSecret>> {
		Box::pin(async { Ok(None) })
	}

	fn set<'a>(&'a self, _pair: &'a CredentialPair) -> StoreFuture<'a, ()> {
		Box::pin(async { Ok(()) })
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async { Ok(()) })
	}
}
