//! Temporary suppression of signal receivers.
//!
//! [`MuteSignals`] disconnects every receiver of a set of signals and puts
//! the exact same receivers back afterwards, without going through
//! `connect`/`disconnect`.
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use reinhardt_factory::MuteSignals;
//! use reinhardt_factory::orm::{Signal, SignalEvent};
//!
//! let signal = Signal::new("saved");
//! let calls = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&calls);
//! signal.connect(move |_event: &SignalEvent<'_>| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! MuteSignals::new([signal.clone()]).scope(|| {
//!     signal.send(&SignalEvent::new("app.Model"));
//! });
//! assert_eq!(calls.load(Ordering::SeqCst), 0);
//!
//! signal.send(&SignalEvent::new("app.Model"));
//! assert_eq!(calls.load(Ordering::SeqCst), 1);
//! ```

use std::fmt;

use crate::orm::{Receiver, Signal};

/// Set of signals to silence.
///
/// A `MuteSignals` is not reentrant: entering it while it is active does
/// nothing. Wrappers ([`scope`](Self::scope), [`wrap`](Self::wrap) and
/// factories decorated with it) work on a fresh [`copy`](Self::copy) per
/// invocation.
pub struct MuteSignals {
	signals: Vec<Signal>,
	paused: Vec<(Signal, Vec<Receiver>)>,
	active: bool,
}

impl MuteSignals {
	pub fn new(signals: impl IntoIterator<Item = Signal>) -> Self {
		let mut unique: Vec<Signal> = Vec::new();
		for signal in signals {
			if !unique.iter().any(|known| known.same_signal(&signal)) {
				unique.push(signal);
			}
		}
		Self {
			signals: unique,
			paused: Vec::new(),
			active: false,
		}
	}

	pub fn signals(&self) -> &[Signal] {
		&self.signals
	}

	pub fn is_active(&self) -> bool {
		self.active
	}

	/// Takes the receivers of every signal, leaving them without receivers.
	pub fn enter(&mut self) {
		if self.active {
			tracing::warn!("mute_signals: already active, ignoring nested enter");
			return;
		}
		for signal in &self.signals {
			let receivers = signal.take_receivers();
			tracing::debug!(
				signal = signal.name(),
				receivers = receivers.len(),
				"mute_signals: disabling signal handlers"
			);
			self.paused.push((signal.clone(), receivers));
		}
		self.active = true;
	}

	/// Restores the receivers taken by [`enter`](Self::enter).
	///
	/// The sender cache of each signal is cleared, since the receiver list
	/// changed behind `connect`'s back.
	pub fn exit(&mut self) {
		for (signal, receivers) in self.paused.drain(..) {
			tracing::debug!(
				signal = signal.name(),
				receivers = receivers.len(),
				"mute_signals: restoring signal handlers"
			);
			{
				let _guard = signal.lock();
				signal.set_receivers(receivers);
			}
			signal.clear_cache();
		}
		self.active = false;
	}

	/// An inactive `MuteSignals` over the same signals.
	pub fn copy(&self) -> Self {
		Self::new(self.signals.iter().cloned())
	}

	/// Enters the set and returns a guard exiting it on drop.
	pub fn activate(mut self) -> MutedSignals {
		self.enter();
		MutedSignals { mute: self }
	}

	/// Runs `f` with the signals muted.
	pub fn scope<R>(&self, f: impl FnOnce() -> R) -> R {
		let _muted = self.copy().activate();
		f()
	}

	/// Wraps `f` so that every call runs with the signals muted.
	pub fn wrap<R, F>(&self, f: F) -> impl Fn() -> R + use<R, F>
	where
		F: Fn() -> R,
	{
		let mute = self.copy();
		move || mute.scope(&f)
	}
}

/// Clones are inactive, like [`MuteSignals::copy`].
impl Clone for MuteSignals {
	fn clone(&self) -> Self {
		self.copy()
	}
}

impl fmt::Debug for MuteSignals {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let names: Vec<&str> = self.signals.iter().map(Signal::name).collect();
		f.debug_struct("MuteSignals")
			.field("signals", &names)
			.field("active", &self.active)
			.finish()
	}
}

/// Guard returned by [`MuteSignals::activate`].
#[must_use = "signals are restored as soon as the guard is dropped"]
pub struct MutedSignals {
	mute: MuteSignals,
}

impl MutedSignals {
	pub fn signals(&self) -> &[Signal] {
		self.mute.signals()
	}
}

impl Drop for MutedSignals {
	fn drop(&mut self) {
		self.mute.exit();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::orm::SignalEvent;
	use rstest::rstest;
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	fn counting_signal(name: &str) -> (Signal, Arc<AtomicUsize>) {
		let signal = Signal::new_with_caching(name);
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&calls);
		signal.connect(move |_event: &SignalEvent<'_>| {
			counter.fetch_add(1, Ordering::SeqCst);
		});
		(signal, calls)
	}

	#[rstest]
	fn test_exit_restores_exact_receivers() {
		let (signal, _calls) = counting_signal("restore");
		signal.connect_with(|_event: &SignalEvent<'_>| {}, Some("app.Model"), Some("uid"));
		let before = signal.receivers();

		let mut mute = MuteSignals::new([signal.clone()]);
		mute.enter();
		assert!(signal.receivers().is_empty());
		mute.exit();

		assert_eq!(signal.receivers(), before);
		assert!(!mute.is_active());
	}

	#[rstest]
	fn test_exit_clears_sender_cache() {
		let (signal, calls) = counting_signal("cache");
		signal.send(&SignalEvent::new("app.Model"));
		assert_eq!(signal.cached_senders(), 1);

		let mut mute = MuteSignals::new([signal.clone()]);
		mute.enter();
		assert_eq!(signal.send(&SignalEvent::new("app.Model")), 0);
		mute.exit();

		assert_eq!(signal.cached_senders(), 0);
		signal.send(&SignalEvent::new("app.Model"));
		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}

	#[rstest]
	fn test_nested_enter_is_ignored() {
		let (signal, calls) = counting_signal("nested");
		let mut mute = MuteSignals::new([signal.clone()]);
		mute.enter();
		mute.enter();
		mute.exit();

		signal.send(&SignalEvent::new("app.Model"));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[rstest]
	fn test_copy_is_independent() {
		let (signal, calls) = counting_signal("copy");
		let mut original = MuteSignals::new([signal.clone(), signal.clone()]);
		assert_eq!(original.signals().len(), 1);

		original.enter();
		let copy = original.copy();
		assert!(!copy.is_active());
		original.exit();

		let guard = copy.activate();
		signal.send(&SignalEvent::new("app.Model"));
		drop(guard);
		signal.send(&SignalEvent::new("app.Model"));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[rstest]
	fn test_wrap_mutes_every_call() {
		let (signal, calls) = counting_signal("wrap");
		let mute = MuteSignals::new([signal.clone()]);
		let sender = signal.clone();
		let wrapped = mute.wrap(move || sender.send(&SignalEvent::new("app.Model")));

		assert_eq!(wrapped(), 0);
		assert_eq!(wrapped(), 0);
		assert_eq!(signal.receivers().len(), 1);
		signal.send(&SignalEvent::new("app.Model"));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[rstest]
	fn test_guard_restores_on_panic() {
		let (signal, calls) = counting_signal("panic");
		let mute = MuteSignals::new([signal.clone()]);
		let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
			mute.scope(|| panic!("boom"));
		}));
		assert!(result.is_err());

		signal.send(&SignalEvent::new("app.Model"));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}
}
