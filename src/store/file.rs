//! File-backed [`CredentialStore`] that survives process restarts.

// std
use std::{
	fs::{self, File},
	io::{ErrorKind, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenKind, TokenSecret},
	store::{CredentialStore, StoreError, StoreFuture},
};

/// On-disk snapshot format.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct Snapshot {
	pair: CredentialPair,
	saved_at: OffsetDateTime,
}

/// Persists the credential pair to a JSON file after each mutation.
///
/// Writes go to a sibling `.tmp` file which is synced and renamed over the target, so a
/// crash never leaves a half-written snapshot behind.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Option<Snapshot>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Returns the snapshot path.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Returns when the current pair was last written, if any.
	pub fn saved_at(&self) -> Option<OffsetDateTime> {
		self.inner.read().as_ref().map(|snapshot| snapshot.saved_at)
	}

	fn load_snapshot(path: &Path) -> Result<Option<Snapshot>, StoreError> {
		let bytes = match fs::read(path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
			Err(e) =>
				return Err(StoreError::Backend {
					message: format!("Failed to read {}: {e}", path.display()),
				}),
		};

		if bytes.is_empty() {
			return Ok(None);
		}

		serde_json::from_slice(&bytes).map(Some).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}
		Ok(())
	}

	fn persist_locked(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(snapshot).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize credential snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	fn remove_locked(&self) -> Result<(), StoreError> {
		match fs::remove_file(&self.path) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StoreError::Backend {
				message: format!("Failed to remove {}: {e}", self.path.display()),
			}),
		}
	}
}
impl CredentialStore for FileStore {
	fn get(&self, kind: TokenKind) -> StoreFuture<'_, Option<TokenSecret>> {
		Box::pin(async move {
			Ok(self.inner.read().as_ref().map(|snapshot| snapshot.pair.get(kind).clone()))
		})
	}

	fn set<'a>(&'a self, pair: &'a CredentialPair) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let snapshot = Snapshot { pair: pair.to_owned(), saved_at: OffsetDateTime::now_utc() };
			let mut guard = self.inner.write();

			self.persist_locked(&snapshot)?;
			*guard = Some(snapshot);

			Ok(())
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			guard.take();
			self.remove_locked()
		})
	}
}
