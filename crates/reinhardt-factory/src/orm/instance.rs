//! Model instances.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::error::{OrmError, OrmResult};
use super::field::FieldKind;
use super::manager::DEFAULT_DB_ALIAS;
use super::model::ModelRef;
use super::signals::{self, SignalEvent};
use crate::value::{Kwargs, Value};

struct InstanceState {
	model: ModelRef,
	values: Kwargs,
	adding: bool,
	db: Option<String>,
	m2m: BTreeMap<String, Vec<Instance>>,
}

/// A model instance.
///
/// Instances are shared handles: clones observe the same field values, the
/// way a related object fetched twice is the same Python object within one
/// request. Two instances compare equal when they are the same handle or
/// when they belong to the same model and carry the same primary key.
#[derive(Clone)]
pub struct Instance {
	state: Arc<RwLock<InstanceState>>,
}

impl Instance {
	pub(crate) fn new(model: ModelRef, values: Kwargs) -> Self {
		Self {
			state: Arc::new(RwLock::new(InstanceState {
				model,
				values,
				adding: true,
				db: None,
				m2m: BTreeMap::new(),
			})),
		}
	}

	pub fn model(&self) -> ModelRef {
		Arc::clone(&self.state.read().model)
	}

	/// Value of `field`, if the model has such a column.
	pub fn get(&self, field: &str) -> Option<Value> {
		self.state.read().values.get(field).cloned()
	}

	pub fn set(&self, field: &str, value: impl Into<Value>) {
		self.state
			.write()
			.values
			.insert(field.to_string(), value.into());
	}

	/// All column values.
	pub fn values(&self) -> Kwargs {
		self.state.read().values.clone()
	}

	/// Primary key value; `None` until assigned.
	pub fn pk(&self) -> Option<Value> {
		let state = self.state.read();
		let pk_field = state.model.pk_field()?;
		state
			.values
			.get(&pk_field.name)
			.filter(|value| !value.is_null())
			.cloned()
	}

	/// Whether the instance has been written to a database.
	pub fn is_saved(&self) -> bool {
		!self.state.read().adding
	}

	/// Alias of the database the instance was written to.
	pub fn db(&self) -> Option<String> {
		self.state.read().db.clone()
	}

	pub(crate) fn mark_saved(&self, alias: &str) {
		let mut state = self.state.write();
		state.adding = false;
		state.db = Some(alias.to_string());
	}

	/// Writes the instance through its model's default manager, on the
	/// database it was loaded from.
	pub fn save(&self) -> OrmResult<()> {
		let model = self.model();
		let manager = model
			.default_manager()
			.ok_or_else(|| OrmError::Database(format!("{} has no manager", model.label())))?;
		let alias = self.db().unwrap_or_else(|| DEFAULT_DB_ALIAS.to_string());
		let manager = if alias == manager.alias() {
			manager
		} else {
			manager.using(&alias)
		};
		manager.save(self)
	}

	/// Manager for the many-to-many relation `field`.
	pub fn related(&self, field: &str) -> OrmResult<RelatedManager> {
		let model = self.model();
		match model.get_field(field) {
			Some(f) if f.kind == FieldKind::ManyToMany => Ok(RelatedManager {
				owner: self.clone(),
				field: field.to_string(),
			}),
			_ => Err(OrmError::UnknownField {
				model: model.label(),
				field: field.to_string(),
			}),
		}
	}

	/// Whether both handles refer to the same instance.
	pub fn ptr_eq(&self, other: &Instance) -> bool {
		Arc::ptr_eq(&self.state, &other.state)
	}
}

impl PartialEq for Instance {
	fn eq(&self, other: &Self) -> bool {
		if self.ptr_eq(other) {
			return true;
		}
		if self.model().label() != other.model().label() {
			return false;
		}
		match (self.pk(), other.pk()) {
			(Some(left), Some(right)) => left == right,
			_ => false,
		}
	}
}

impl fmt::Debug for Instance {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state.read();
		f.debug_struct("Instance")
			.field("model", &state.model.label())
			.field("saved", &!state.adding)
			.field("values", &state.values)
			.finish()
	}
}

/// Accessor for one side of a many-to-many relation.
#[derive(Debug, Clone)]
pub struct RelatedManager {
	owner: Instance,
	field: String,
}

impl RelatedManager {
	/// Links `related` to the owner. Both must be saved.
	pub fn add(&self, related: &Instance) -> OrmResult<()> {
		let label = self.owner.model().label();
		if !self.owner.is_saved() {
			return Err(OrmError::UnsavedInstance(format!(
				"\"{}\" needs to have a value for field \"id\" before this many-to-many relationship can be used.",
				label
			)));
		}
		if !related.is_saved() {
			return Err(OrmError::UnsavedInstance(format!(
				"Cannot add \"{}\": instance is not saved",
				related.model().label()
			)));
		}

		let event = SignalEvent::new(&label).with_instance(&self.owner);
		signals::m2m_changed().send(&event.with_action("pre_add"));
		// Comparing instances reads their state, so the owner is not locked here.
		if !self.all().iter().any(|existing| existing == related) {
			self.owner
				.state
				.write()
				.m2m
				.entry(self.field.clone())
				.or_default()
				.push(related.clone());
		}
		signals::m2m_changed().send(&event.with_action("post_add"));
		Ok(())
	}

	/// Linked instances, in insertion order.
	pub fn all(&self) -> Vec<Instance> {
		self.owner
			.state
			.read()
			.m2m
			.get(&self.field)
			.cloned()
			.unwrap_or_default()
	}

	pub fn count(&self) -> usize {
		self.owner
			.state
			.read()
			.m2m
			.get(&self.field)
			.map_or(0, Vec::len)
	}

	/// Unlinks every related instance.
	pub fn clear(&self) {
		self.owner.state.write().m2m.remove(&self.field);
	}
}
