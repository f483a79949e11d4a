// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for the refresh protocol.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	waiters: AtomicU64,
	released: AtomicU64,
}
impl RefreshMetrics {
	/// Returns the number of refresh exchanges started by a leader.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of refreshes that stored a new credential pair.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of refreshes that ended with cleared credentials.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Returns how many requests queued behind an in-flight refresh.
	pub fn waiters(&self) -> u64 {
		self.waiters.load(Ordering::Relaxed)
	}

	/// Returns how many queued requests were released by a settled refresh.
	pub fn released(&self) -> u64 {
		self.released.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_waiter(&self) {
		self.waiters.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_released(&self, count: usize) {
		self.released.fetch_add(count as u64, Ordering::Relaxed);
	}
}
