//! Model lifecycle signals.
//!
//! A synchronous dispatcher in the Django style: receivers are connected to
//! a [`Signal`], optionally filtered by sender label, and called in
//! connection order. Signals with caching enabled memoise the receivers
//! matching each sender until the receiver list changes through
//! [`Signal::connect`] or [`Signal::disconnect`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::{Mutex, MutexGuard, RwLock};

use super::instance::Instance;

/// Receiver callback.
pub type ReceiverFn = Arc<dyn Fn(&SignalEvent<'_>) + Send + Sync>;

/// Payload delivered to receivers.
#[derive(Debug, Clone, Copy)]
pub struct SignalEvent<'a> {
	sender: &'a str,
	instance: Option<&'a Instance>,
	created: bool,
	action: Option<&'a str>,
	using: Option<&'a str>,
}

impl<'a> SignalEvent<'a> {
	/// Event sent by the model labelled `sender`.
	pub fn new(sender: &'a str) -> Self {
		Self {
			sender,
			instance: None,
			created: false,
			action: None,
			using: None,
		}
	}

	pub fn with_instance(mut self, instance: &'a Instance) -> Self {
		self.instance = Some(instance);
		self
	}

	pub fn with_created(mut self, created: bool) -> Self {
		self.created = created;
		self
	}

	pub fn with_action(mut self, action: &'a str) -> Self {
		self.action = Some(action);
		self
	}

	pub fn with_using(mut self, using: &'a str) -> Self {
		self.using = Some(using);
		self
	}

	/// Label of the sending model.
	pub fn sender(&self) -> &str {
		self.sender
	}

	pub fn instance(&self) -> Option<&Instance> {
		self.instance
	}

	/// For `post_save`: whether a new row was inserted.
	pub fn created(&self) -> bool {
		self.created
	}

	/// For `m2m_changed`: `"pre_add"`, `"post_add"`, ...
	pub fn action(&self) -> Option<&str> {
		self.action
	}

	/// Database alias of the operation.
	pub fn using(&self) -> Option<&str> {
		self.using
	}
}

/// A connected receiver.
#[derive(Clone)]
pub struct Receiver {
	func: ReceiverFn,
	sender: Option<String>,
	dispatch_uid: Option<String>,
}

impl Receiver {
	/// Sender label this receiver is restricted to, if any.
	pub fn sender(&self) -> Option<&str> {
		self.sender.as_deref()
	}

	pub fn dispatch_uid(&self) -> Option<&str> {
		self.dispatch_uid.as_deref()
	}

	fn accepts(&self, sender: &str) -> bool {
		self.sender.as_deref().is_none_or(|expected| expected == sender)
	}
}

impl PartialEq for Receiver {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.func, &other.func)
			&& self.sender == other.sender
			&& self.dispatch_uid == other.dispatch_uid
	}
}

impl fmt::Debug for Receiver {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Receiver")
			.field("func", &Arc::as_ptr(&self.func))
			.field("sender", &self.sender)
			.field("dispatch_uid", &self.dispatch_uid)
			.finish()
	}
}

struct SignalInner {
	name: String,
	receivers: RwLock<Vec<Receiver>>,
	sender_receivers_cache: RwLock<HashMap<String, Vec<Receiver>>>,
	lock: Mutex<()>,
	use_caching: bool,
}

/// Synchronous signal.
///
/// Cloning a `Signal` yields another handle to the same receiver list.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use reinhardt_factory::orm::{Signal, SignalEvent};
///
/// let signal = Signal::new("article_published");
/// let calls = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&calls);
/// signal.connect(move |_event: &SignalEvent<'_>| {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
///
/// signal.send(&SignalEvent::new("blog.Article"));
/// assert_eq!(calls.load(Ordering::SeqCst), 1);
/// ```
#[derive(Clone)]
pub struct Signal {
	inner: Arc<SignalInner>,
}

impl Signal {
	/// Creates a signal without sender caching.
	pub fn new(name: impl Into<String>) -> Self {
		Self::with_caching(name, false)
	}

	/// Creates a signal that caches receivers per sender.
	pub fn new_with_caching(name: impl Into<String>) -> Self {
		Self::with_caching(name, true)
	}

	fn with_caching(name: impl Into<String>, use_caching: bool) -> Self {
		Self {
			inner: Arc::new(SignalInner {
				name: name.into(),
				receivers: RwLock::new(Vec::new()),
				sender_receivers_cache: RwLock::new(HashMap::new()),
				lock: Mutex::new(()),
				use_caching,
			}),
		}
	}

	pub fn name(&self) -> &str {
		&self.inner.name
	}

	/// Whether both handles refer to the same signal.
	pub fn same_signal(&self, other: &Signal) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}

	/// Connects a receiver for every sender.
	pub fn connect<F>(&self, receiver: F) -> Receiver
	where
		F: Fn(&SignalEvent<'_>) + Send + Sync + 'static,
	{
		self.connect_with(receiver, None, None)
	}

	/// Connects a receiver, optionally restricted to one sender label.
	///
	/// A receiver connected with a `dispatch_uid` replaces any receiver
	/// previously connected with the same uid.
	pub fn connect_with<F>(
		&self,
		receiver: F,
		sender: Option<&str>,
		dispatch_uid: Option<&str>,
	) -> Receiver
	where
		F: Fn(&SignalEvent<'_>) + Send + Sync + 'static,
	{
		let receiver = Receiver {
			func: Arc::new(receiver),
			sender: sender.map(str::to_string),
			dispatch_uid: dispatch_uid.map(str::to_string),
		};
		let _guard = self.inner.lock.lock();
		let mut receivers = self.inner.receivers.write();
		if let Some(uid) = dispatch_uid {
			receivers.retain(|r| r.dispatch_uid.as_deref() != Some(uid));
		}
		receivers.push(receiver.clone());
		self.inner.sender_receivers_cache.write().clear();
		receiver
	}

	/// Disconnects a receiver by dispatch uid; with `None`, disconnects all.
	pub fn disconnect(&self, dispatch_uid: Option<&str>) -> bool {
		let _guard = self.inner.lock.lock();
		let mut receivers = self.inner.receivers.write();
		let original_len = receivers.len();
		match dispatch_uid {
			Some(uid) => receivers.retain(|r| r.dispatch_uid.as_deref() != Some(uid)),
			None => receivers.clear(),
		}
		self.inner.sender_receivers_cache.write().clear();
		receivers.len() < original_len
	}

	/// Disconnects one receiver previously returned by `connect`.
	pub fn disconnect_receiver(&self, receiver: &Receiver) -> bool {
		let _guard = self.inner.lock.lock();
		let mut receivers = self.inner.receivers.write();
		let original_len = receivers.len();
		receivers.retain(|r| r != receiver);
		self.inner.sender_receivers_cache.write().clear();
		receivers.len() < original_len
	}

	/// Calls every receiver accepting `event.sender()`; returns how many ran.
	///
	/// Receivers run outside the signal's locks and may connect or
	/// disconnect receivers themselves.
	pub fn send(&self, event: &SignalEvent<'_>) -> usize {
		let receivers = self.live_receivers(event.sender());
		for receiver in &receivers {
			(receiver.func)(event);
		}
		receivers.len()
	}

	/// Whether any receiver would run for `sender`.
	pub fn has_listeners(&self, sender: &str) -> bool {
		!self.live_receivers(sender).is_empty()
	}

	fn live_receivers(&self, sender: &str) -> Vec<Receiver> {
		if self.inner.receivers.read().is_empty() {
			return Vec::new();
		}
		if self.inner.use_caching
			&& let Some(cached) = self.inner.sender_receivers_cache.read().get(sender)
		{
			return cached.clone();
		}
		let matched: Vec<Receiver> = self
			.inner
			.receivers
			.read()
			.iter()
			.filter(|receiver| receiver.accepts(sender))
			.cloned()
			.collect();
		if self.inner.use_caching {
			self.inner
				.sender_receivers_cache
				.write()
				.insert(sender.to_string(), matched.clone());
		}
		matched
	}

	/// Snapshot of the connected receivers, in connection order.
	pub fn receivers(&self) -> Vec<Receiver> {
		self.inner.receivers.read().clone()
	}

	/// Replaces the receiver list as-is.
	///
	/// Unlike `connect`, this does not touch the sender cache; callers that
	/// need it invalidated use [`Signal::clear_cache`].
	pub fn set_receivers(&self, receivers: Vec<Receiver>) {
		*self.inner.receivers.write() = receivers;
	}

	/// Removes and returns every receiver, leaving the sender cache untouched.
	pub fn take_receivers(&self) -> Vec<Receiver> {
		std::mem::take(&mut *self.inner.receivers.write())
	}

	/// Number of senders with a cached receiver list.
	pub fn cached_senders(&self) -> usize {
		self.inner.sender_receivers_cache.read().len()
	}

	/// Clears the per-sender receiver cache under the signal lock.
	pub fn clear_cache(&self) {
		let _guard = self.inner.lock.lock();
		self.inner.sender_receivers_cache.write().clear();
	}

	/// Acquires the signal lock, serialising receiver list changes.
	pub fn lock(&self) -> MutexGuard<'_, ()> {
		self.inner.lock.lock()
	}
}

impl fmt::Debug for Signal {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Signal")
			.field("name", &self.inner.name)
			.field("receivers", &self.inner.receivers.read().len())
			.field("use_caching", &self.inner.use_caching)
			.finish()
	}
}

static PRE_INIT: Lazy<Signal> = Lazy::new(|| Signal::new_with_caching("pre_init"));
static POST_INIT: Lazy<Signal> = Lazy::new(|| Signal::new_with_caching("post_init"));
static PRE_SAVE: Lazy<Signal> = Lazy::new(|| Signal::new_with_caching("pre_save"));
static POST_SAVE: Lazy<Signal> = Lazy::new(|| Signal::new_with_caching("post_save"));
static M2M_CHANGED: Lazy<Signal> = Lazy::new(|| Signal::new_with_caching("m2m_changed"));

/// Sent at the start of model instantiation.
pub fn pre_init() -> Signal {
	PRE_INIT.clone()
}

/// Sent once an instance has been constructed.
pub fn post_init() -> Signal {
	POST_INIT.clone()
}

/// Sent before an instance is written.
pub fn pre_save() -> Signal {
	PRE_SAVE.clone()
}

/// Sent after an instance is written.
pub fn post_save() -> Signal {
	POST_SAVE.clone()
}

/// Sent around changes to a many-to-many relation.
pub fn m2m_changed() -> Signal {
	M2M_CHANGED.clone()
}
