//! Managers: the query interface factories write through.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::error::{OrmError, OrmResult};
use super::field::FieldKind;
use super::instance::Instance;
use super::model::{Model, ModelRef};
use super::signals::{self, SignalEvent};
use crate::value::{Kwargs, Value};

/// Name of the default database connection.
pub const DEFAULT_DB_ALIAS: &str = "default";

/// Table-level operations on a model.
///
/// Only `alias`, `using`, `filter` and `save` must be provided; `create`,
/// `get` and `get_or_create` are expressed in terms of them.
pub trait Manager: Send + Sync {
	/// Database alias this manager routes to.
	fn alias(&self) -> &str;

	/// Same manager routed to another database.
	fn using(&self, alias: &str) -> Arc<dyn Manager>;

	/// Rows matching every `lookup` pair.
	fn filter(&self, model: &ModelRef, lookup: &Kwargs) -> OrmResult<Vec<Instance>>;

	/// Inserts or updates `instance`.
	fn save(&self, instance: &Instance) -> OrmResult<()>;

	/// Instantiates and saves a new row.
	fn create(&self, model: &ModelRef, kwargs: Kwargs) -> OrmResult<Instance> {
		let instance = model.instantiate(kwargs)?;
		self.save(&instance)?;
		Ok(instance)
	}

	/// The single row matching `lookup`.
	fn get(&self, model: &ModelRef, lookup: &Kwargs) -> OrmResult<Instance> {
		let mut rows = self.filter(model, lookup)?;
		match rows.len() {
			0 => Err(OrmError::DoesNotExist(model.label())),
			1 => Ok(rows.remove(0)),
			count => Err(OrmError::MultipleObjectsReturned {
				model: model.label(),
				count,
			}),
		}
	}

	/// Fetches the row matching `lookup`, or creates one from `lookup`
	/// merged with `defaults`. The flag is `true` when a row was created.
	fn get_or_create(
		&self,
		model: &ModelRef,
		lookup: Kwargs,
		defaults: Kwargs,
	) -> OrmResult<(Instance, bool)> {
		match self.get(model, &lookup) {
			Ok(instance) => Ok((instance, false)),
			Err(OrmError::DoesNotExist(_)) => {
				let mut kwargs = lookup;
				kwargs.extend(defaults);
				Ok((self.create(model, kwargs)?, true))
			}
			Err(error) => Err(error),
		}
	}
}

type TableKey = (String, String);

#[derive(Default)]
struct DatabaseState {
	tables: HashMap<TableKey, Vec<Instance>>,
	sequences: HashMap<TableKey, i64>,
}

/// In-memory storage shared by [`InMemoryManager`]s, one table per
/// `(alias, model)` pair.
///
/// Saving enforces `NOT NULL` and `UNIQUE` constraints and refuses
/// references to unsaved related instances, so data produced through it
/// has the shape a real database would accept.
#[derive(Clone, Default)]
pub struct InMemoryDatabase {
	state: Arc<RwLock<DatabaseState>>,
}

impl InMemoryDatabase {
	pub fn new() -> Self {
		Self::default()
	}

	/// Manager routed to the default alias.
	pub fn manager(&self) -> Arc<dyn Manager> {
		Arc::new(InMemoryManager::new(self.clone(), DEFAULT_DB_ALIAS))
	}

	/// Rows of `model` on `alias`, in insertion order.
	pub fn rows(&self, alias: &str, model: &Model) -> Vec<Instance> {
		self.state
			.read()
			.tables
			.get(&(alias.to_string(), model.label()))
			.cloned()
			.unwrap_or_default()
	}

	/// Rows of `model` on the default alias.
	pub fn all(&self, model: &Model) -> Vec<Instance> {
		self.rows(DEFAULT_DB_ALIAS, model)
	}

	/// Number of rows of `model` on the default alias.
	pub fn count(&self, model: &Model) -> usize {
		self.all(model).len()
	}

	/// Drops every row and resets every sequence.
	pub fn flush(&self) {
		let mut state = self.state.write();
		state.tables.clear();
		state.sequences.clear();
	}

	/// Validates and stores `instance`; returns `true` when a row was inserted.
	fn write(&self, alias: &str, instance: &Instance) -> OrmResult<bool> {
		let model = instance.model();
		let label = model.label();
		let key = (alias.to_string(), label.clone());
		let mut state = self.state.write();
		let rows = state.tables.get(&key).map(Vec::as_slice).unwrap_or_default();
		let others: Vec<&Instance> = rows.iter().filter(|row| !row.ptr_eq(instance)).collect();
		let created = others.len() == rows.len();

		let mut assign_pk = false;
		for field in model.fields() {
			if !field.concrete || field.kind == FieldKind::ManyToMany {
				continue;
			}
			let value = instance.get(&field.name).unwrap_or(Value::Null);
			if value.is_null() {
				if field.primary_key && matches!(field.kind, FieldKind::Auto | FieldKind::BigAuto) {
					assign_pk = true;
					continue;
				}
				if !field.null {
					return Err(OrmError::Integrity(format!(
						"NOT NULL constraint failed: {}.{}",
						label, field.name
					)));
				}
				continue;
			}
			if let Value::Instance(related) = &value
				&& !related.is_saved()
			{
				return Err(OrmError::UnsavedInstance(format!(
					"save() prohibited to prevent data loss due to unsaved related object '{}'.",
					field.name
				)));
			}
			if field.unique
				&& others
					.iter()
					.any(|row| row.get(&field.name).as_ref() == Some(&value))
			{
				return Err(OrmError::Integrity(format!(
					"UNIQUE constraint failed: {}.{}",
					label, field.name
				)));
			}
		}

		let pk_field = model.pk_field().map(|field| field.name.clone());
		let sequence = state.sequences.entry(key.clone()).or_insert(0);
		if let Some(pk_field) = pk_field {
			if assign_pk {
				*sequence += 1;
				instance.set(&pk_field, *sequence);
			} else if let Some(Value::Int(pk)) = instance.get(&pk_field) {
				*sequence = (*sequence).max(pk);
			}
		}
		if created {
			state.tables.entry(key).or_default().push(instance.clone());
		}
		Ok(created)
	}
}

/// [`Manager`] over an [`InMemoryDatabase`].
pub struct InMemoryManager {
	db: InMemoryDatabase,
	alias: String,
}

impl InMemoryManager {
	pub fn new(db: InMemoryDatabase, alias: impl Into<String>) -> Self {
		Self {
			db,
			alias: alias.into(),
		}
	}

	pub fn database(&self) -> &InMemoryDatabase {
		&self.db
	}
}

impl Manager for InMemoryManager {
	fn alias(&self) -> &str {
		&self.alias
	}

	fn using(&self, alias: &str) -> Arc<dyn Manager> {
		Arc::new(InMemoryManager::new(self.db.clone(), alias))
	}

	fn filter(&self, model: &ModelRef, lookup: &Kwargs) -> OrmResult<Vec<Instance>> {
		if let Some(unknown) = lookup.keys().find(|key| model.get_field(key).is_none()) {
			return Err(OrmError::UnknownField {
				model: model.label(),
				field: unknown.clone(),
			});
		}
		Ok(self
			.db
			.rows(&self.alias, model)
			.into_iter()
			.filter(|row| {
				lookup
					.iter()
					.all(|(field, expected)| row.get(field).as_ref() == Some(expected))
			})
			.collect())
	}

	fn save(&self, instance: &Instance) -> OrmResult<()> {
		let label = instance.model().label();
		let event = SignalEvent::new(&label)
			.with_instance(instance)
			.with_using(&self.alias);
		signals::pre_save().send(&event);
		let created = self.db.write(&self.alias, instance)?;
		instance.mark_saved(&self.alias);
		signals::post_save().send(&event.with_created(created));
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::kwargs;
	use crate::orm::field::Field;
	use rstest::{fixture, rstest};

	struct Fixture {
		db: InMemoryDatabase,
		author: ModelRef,
		book: ModelRef,
	}

	#[fixture]
	fn schema() -> Fixture {
		let db = InMemoryDatabase::new();
		let author = Model::builder("managertests", "Author")
			.field(Field::char("name", 30).with_unique())
			.field(Field::new("age", FieldKind::Integer).with_null())
			.manager(db.manager())
			.build();
		let book = Model::builder("managertests", "Book")
			.field(Field::char("title", 30))
			.field(Field::foreign_key("author", &author))
			.manager(db.manager())
			.build();
		Fixture { db, author, book }
	}

	#[rstest]
	fn test_create_assigns_sequential_pks(schema: Fixture) {
		let manager = schema.db.manager();
		let first = manager.create(&schema.author, kwargs! { "name" => "a" }).unwrap();
		let second = manager.create(&schema.author, kwargs! { "name" => "b" }).unwrap();
		assert_eq!(first.pk(), Some(Value::Int(1)));
		assert_eq!(second.pk(), Some(Value::Int(2)));
		assert_eq!(schema.db.count(&schema.author), 2);
	}

	#[rstest]
	fn test_unique_constraint(schema: Fixture) {
		let manager = schema.db.manager();
		manager.create(&schema.author, kwargs! { "name" => "a" }).unwrap();
		let error = manager
			.create(&schema.author, kwargs! { "name" => "a" })
			.unwrap_err();
		assert_eq!(
			error,
			OrmError::Integrity("UNIQUE constraint failed: managertests.Author.name".to_string())
		);
	}

	#[rstest]
	fn test_not_null_constraint(schema: Fixture) {
		let error = schema
			.db
			.manager()
			.create(&schema.book, kwargs! { "title" => "t" })
			.unwrap_err();
		assert_eq!(
			error,
			OrmError::Integrity("NOT NULL constraint failed: managertests.Book.author".to_string())
		);
	}

	#[rstest]
	fn test_unsaved_related_object_is_refused(schema: Fixture) {
		let author = schema.author.instantiate(kwargs! { "name" => "a" }).unwrap();
		let error = schema
			.db
			.manager()
			.create(&schema.book, kwargs! { "title" => "t", "author" => author })
			.unwrap_err();
		assert!(matches!(error, OrmError::UnsavedInstance(_)));
	}

	#[rstest]
	fn test_get_or_create(schema: Fixture) {
		let manager = schema.db.manager();
		let (created, was_created) = manager
			.get_or_create(
				&schema.author,
				kwargs! { "name" => "a" },
				kwargs! { "age" => 30i64 },
			)
			.unwrap();
		assert!(was_created);
		assert_eq!(created.get("age"), Some(Value::Int(30)));

		let (fetched, was_created) = manager
			.get_or_create(
				&schema.author,
				kwargs! { "name" => "a" },
				kwargs! { "age" => 99i64 },
			)
			.unwrap();
		assert!(!was_created);
		assert!(fetched.ptr_eq(&created));
		assert_eq!(fetched.get("age"), Some(Value::Int(30)));
	}

	#[rstest]
	fn test_get_multiple_objects(schema: Fixture) {
		let manager = schema.db.manager();
		manager.create(&schema.author, kwargs! { "name" => "a", "age" => 1i64 }).unwrap();
		manager.create(&schema.author, kwargs! { "name" => "b", "age" => 1i64 }).unwrap();
		let error = manager
			.get(&schema.author, &kwargs! { "age" => 1i64 })
			.unwrap_err();
		assert_eq!(
			error,
			OrmError::MultipleObjectsReturned {
				model: "managertests.Author".to_string(),
				count: 2,
			}
		);
	}

	#[rstest]
	fn test_filter_rejects_unknown_field(schema: Fixture) {
		let error = schema
			.db
			.manager()
			.filter(&schema.author, &kwargs! { "nickname" => "x" })
			.unwrap_err();
		assert!(matches!(error, OrmError::UnknownField { .. }));
	}

	#[rstest]
	fn test_using_routes_to_separate_tables(schema: Fixture) {
		let replica = schema.db.manager().using("replica");
		let instance = replica.create(&schema.author, kwargs! { "name" => "a" }).unwrap();
		assert_eq!(instance.db().as_deref(), Some("replica"));
		assert_eq!(schema.db.count(&schema.author), 0);
		assert_eq!(schema.db.rows("replica", &schema.author).len(), 1);
		// Same value on another alias does not collide.
		schema
			.db
			.manager()
			.create(&schema.author, kwargs! { "name" => "a" })
			.unwrap();
	}

	#[rstest]
	fn test_resave_updates_in_place(schema: Fixture) {
		let manager = schema.db.manager();
		let instance = manager.create(&schema.author, kwargs! { "name" => "a" }).unwrap();
		instance.set("age", 5i64);
		manager.save(&instance).unwrap();
		assert_eq!(schema.db.count(&schema.author), 1);
		assert_eq!(instance.pk(), Some(Value::Int(1)));
	}
}
