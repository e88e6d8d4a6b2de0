//! Thread-safe single-slot credential cache.
//!
//! The cache is deliberately dumb: it stores whatever the scheduler installs and never looks
//! at expiry. Readers clone an [`Arc`] under a read lock, so a credential is either observed
//! whole or not at all; the write lock is held only for the pointer swap, never while a new
//! credential is being fetched.

// self
use crate::{_prelude::*, auth::Credential};

#[derive(Debug, Default)]
struct Slot {
	credential: Option<Arc<Credential>>,
	stale: bool,
}

/// Shared handle to the current credential.
///
/// Cloning the handle shares the underlying slot; independent caches are created with
/// [`CredentialCache::default`].
#[derive(Clone, Debug, Default)]
pub struct CredentialCache(Arc<RwLock<Slot>>);
impl CredentialCache {
	/// Atomically installs `credential`, clears the stale flag, and returns the superseded value.
	pub fn set(&self, credential: Credential) -> Option<Arc<Credential>> {
		let credential = Arc::new(credential);
		let mut slot = self.0.write();

		slot.stale = false;

		slot.credential.replace(credential)
	}

	/// Returns the current credential, or `None` before the first successful fetch.
	pub fn get(&self) -> Option<Arc<Credential>> {
		self.0.read().credential.clone()
	}

	/// Returns the current credential together with the stale flag, read under one lock.
	pub fn snapshot(&self) -> (Option<Arc<Credential>>, bool) {
		let slot = self.0.read();

		(slot.credential.clone(), slot.stale)
	}

	/// Flags the cached credential as stale. Returns `true` if the flag changed.
	///
	/// A cache without a credential cannot be stale, so the call is ignored in that case.
	pub fn mark_stale(&self) -> bool {
		let mut slot = self.0.write();

		if slot.credential.is_none() || slot.stale {
			return false;
		}

		slot.stale = true;

		true
	}

	/// Returns `true` once the scheduler flagged the cached credential as stale.
	pub fn is_stale(&self) -> bool {
		self.0.read().stale
	}

	/// Drops the cached credential; used at shutdown.
	pub fn clear(&self) -> Option<Arc<Credential>> {
		let mut slot = self.0.write();

		slot.stale = false;

		slot.credential.take()
	}
}
