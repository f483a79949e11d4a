//! Single-flight bookkeeping: the refresh-in-progress flag and the FIFO waiter map.
//!
//! Both live behind one [`Mutex`], so the check-then-set that elects a refresh leader is a
//! single critical section even on multi-threaded executors. The lock is never held across
//! an `.await`.

// std
use std::mem;
// crates.io
use tokio::sync::oneshot;
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Value handed to every waiter when the in-flight refresh settles.
pub(crate) type RefreshOutcome = std::result::Result<TokenSecret, Arc<Error>>;

/// Completion handler registered by a waiting request.
pub(crate) type Completion = Box<dyn FnOnce(RefreshOutcome) + Send>;

/// In-progress flag plus waiters keyed by a monotonically increasing id.
#[derive(Default)]
pub(crate) struct RefreshCoordinator {
	in_progress: bool,
	next_waiter: u64,
	waiters: BTreeMap<u64, Completion>,
}
impl RefreshCoordinator {
	pub(crate) fn is_refreshing(&self) -> bool {
		self.in_progress
	}

	pub(crate) fn waiting(&self) -> usize {
		self.waiters.len()
	}

	pub(crate) fn enqueue(&mut self, completion: Completion) -> u64 {
		let id = self.next_waiter;

		self.next_waiter += 1;
		self.waiters.insert(id, completion);

		id
	}

	/// Clears the flag and hands back every waiter in enqueue order.
	fn drain(&mut self) -> Vec<Completion> {
		self.in_progress = false;

		mem::take(&mut self.waiters).into_values().collect()
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("in_progress", &self.in_progress)
			.field("waiters", &self.waiters.len())
			.finish()
	}
}

/// Role assigned to a request that observed a 401.
pub(crate) enum Ticket<'a> {
	/// This request performs the refresh and must settle the lease.
	Leader(RefreshLease<'a>),
	/// A refresh is already in flight; await its outcome.
	Waiter(oneshot::Receiver<RefreshOutcome>),
}

/// Elects a leader or enqueues a waiter in one critical section.
pub(crate) fn join(coordinator: &Mutex<RefreshCoordinator>) -> Ticket<'_> {
	let mut state = coordinator.lock();

	if !state.in_progress {
		state.in_progress = true;

		return Ticket::Leader(RefreshLease { coordinator, settled: false });
	}

	let (tx, rx) = oneshot::channel();

	state.enqueue(Box::new(move |outcome| {
		// The waiter may have been dropped; nobody is left to notify.
		let _ = tx.send(outcome);
	}));

	Ticket::Waiter(rx)
}

/// Leadership over the in-flight refresh.
///
/// Dropping an unsettled lease rejects every waiter with [`Error::RefreshAbandoned`] and
/// clears the flag.
pub(crate) struct RefreshLease<'a> {
	coordinator: &'a Mutex<RefreshCoordinator>,
	settled: bool,
}
impl RefreshLease<'_> {
	/// Completes every waiter with `outcome` in enqueue order; returns how many were released.
	pub(crate) fn settle(mut self, outcome: RefreshOutcome) -> usize {
		self.settled = true;

		release(self.coordinator, outcome)
	}
}
impl Drop for RefreshLease<'_> {
	fn drop(&mut self) {
		if !self.settled {
			release(self.coordinator, Err(Arc::new(Error::RefreshAbandoned)));
		}
	}
}

fn release(coordinator: &Mutex<RefreshCoordinator>, outcome: RefreshOutcome) -> usize {
	let waiters = coordinator.lock().drain();
	let released = waiters.len();

	for complete in waiters {
		complete(outcome.clone());
	}

	released
}
