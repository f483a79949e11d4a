//! Navigation capability used to send the user back to sign-in after a refresh failure.

// self
use crate::_prelude::*;

/// Host surface that can move the user to another location.
///
/// The gateway calls [`Navigator::redirect`] exactly once per failed refresh, after stored
/// credentials have been cleared. Headless hosts use [`NoopNavigator`] and handle the
/// returned [`Error::RefreshFailed`] themselves.
pub trait Navigator
where
	Self: Send + Sync,
{
	/// Requests a hard redirect to `location`.
	fn redirect(&self, location: &str);
}

/// Navigator for hosts without a navigable surface.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNavigator;
impl Navigator for NoopNavigator {
	fn redirect(&self, _location: &str) {}
}

/// Navigator that forwards redirects to a host-provided callback.
pub struct CallbackNavigator(Box<dyn Fn(&str) + Send + Sync>);
impl CallbackNavigator {
	/// Wraps `callback`.
	pub fn new<F>(callback: F) -> Self
	where
		F: 'static + Fn(&str) + Send + Sync,
	{
		Self(Box::new(callback))
	}
}
impl Navigator for CallbackNavigator {
	fn redirect(&self, location: &str) {
		(self.0)(location);
	}
}
impl Debug for CallbackNavigator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("CallbackNavigator(..)")
	}
}

/// Navigator that records every requested location.
#[cfg(any(test, feature = "test"))]
#[derive(Debug, Default)]
pub struct RecordingNavigator(Mutex<Vec<String>>);
#[cfg(any(test, feature = "test"))]
impl RecordingNavigator {
	/// Returns the locations requested so far.
	pub fn redirects(&self) -> Vec<String> {
		self.0.lock().clone()
	}
}
#[cfg(any(test, feature = "test"))]
impl Navigator for RecordingNavigator {
	fn redirect(&self, location: &str) {
		self.0.lock().push(location.to_owned());
	}
}
