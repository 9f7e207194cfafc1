//! Model metadata.

use std::fmt;
use std::sync::Arc;

use super::error::{OrmError, OrmResult};
use super::field::{Field, FieldKind};
use super::instance::Instance;
use super::manager::Manager;
use super::registry;
use super::signals::{self, SignalEvent};
use crate::value::Kwargs;

/// Shared handle to a model definition.
pub type ModelRef = Arc<Model>;

/// A model: its label, ordered fields and managers.
pub struct Model {
	app_label: String,
	name: String,
	abstract_model: bool,
	fields: Vec<Field>,
	objects: Option<Arc<dyn Manager>>,
	default_manager: Option<Arc<dyn Manager>>,
}

impl Model {
	/// Starts a model definition.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_factory::orm::{Field, Model};
	///
	/// let model = Model::builder("blog", "Post")
	///     .field(Field::char("title", 100))
	///     .build();
	/// assert_eq!(model.label(), "blog.Post");
	/// // An `id` primary key is added automatically.
	/// assert_eq!(model.pk_field().map(|f| f.name.as_str()), Some("id"));
	/// ```
	pub fn builder(app_label: impl Into<String>, name: impl Into<String>) -> ModelBuilder {
		ModelBuilder {
			app_label: app_label.into(),
			name: name.into(),
			abstract_model: false,
			fields: Vec::new(),
			objects: None,
			default_manager: None,
		}
	}

	pub fn app_label(&self) -> &str {
		&self.app_label
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// `"app_label.ModelName"`.
	pub fn label(&self) -> String {
		format!("{}.{}", self.app_label, self.name)
	}

	pub fn is_abstract(&self) -> bool {
		self.abstract_model
	}

	/// Fields in declaration order, implicit primary key first.
	pub fn fields(&self) -> &[Field] {
		&self.fields
	}

	pub fn get_field(&self, name: &str) -> Option<&Field> {
		self.fields.iter().find(|field| field.name == name)
	}

	pub fn pk_field(&self) -> Option<&Field> {
		self.fields.iter().find(|field| field.primary_key)
	}

	/// The manager declared under the conventional `objects` name.
	pub fn objects(&self) -> Option<Arc<dyn Manager>> {
		self.objects.clone()
	}

	/// The model's default manager, whatever its name.
	pub fn default_manager(&self) -> Option<Arc<dyn Manager>> {
		self.default_manager.clone().or_else(|| self.objects.clone())
	}

	/// Creates an unsaved instance, the equivalent of `Model(**kwargs)`.
	///
	/// Fields missing from `kwargs` receive their default. Sends `pre_init`
	/// and `post_init`.
	pub fn instantiate(self: &Arc<Self>, mut kwargs: Kwargs) -> OrmResult<Instance> {
		if self.abstract_model {
			return Err(OrmError::AbstractModel(self.label()));
		}
		let label = self.label();
		signals::pre_init().send(&SignalEvent::new(&label));

		if let Some(unknown) = kwargs.keys().find(|key| {
			self.get_field(key)
				.is_none_or(|field| !field.concrete || field.kind == FieldKind::ManyToMany)
		}) {
			return Err(OrmError::UnknownField {
				model: label,
				field: unknown.clone(),
			});
		}

		let values = self
			.fields
			.iter()
			.filter(|field| field.concrete)
			.map(|field| {
				let value = kwargs
					.remove(&field.name)
					.unwrap_or_else(|| field.get_default());
				(field.name.clone(), value)
			})
			.collect();
		let instance = Instance::new(Arc::clone(self), values);

		signals::post_init().send(&SignalEvent::new(&label).with_instance(&instance));
		Ok(instance)
	}
}

impl fmt::Debug for Model {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Model")
			.field("label", &self.label())
			.field("abstract", &self.abstract_model)
			.field(
				"fields",
				&self.fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
			)
			.finish()
	}
}

/// Builder for [`Model`].
pub struct ModelBuilder {
	app_label: String,
	name: String,
	abstract_model: bool,
	fields: Vec<Field>,
	objects: Option<Arc<dyn Manager>>,
	default_manager: Option<Arc<dyn Manager>>,
}

impl ModelBuilder {
	pub fn field(mut self, field: Field) -> Self {
		match self.fields.iter_mut().find(|f| f.name == field.name) {
			Some(existing) => *existing = field,
			None => self.fields.push(field),
		}
		self
	}

	pub fn fields(self, fields: impl IntoIterator<Item = Field>) -> Self {
		fields.into_iter().fold(self, Self::field)
	}

	/// Marks the model abstract: it cannot be instantiated.
	pub fn abstract_model(mut self) -> Self {
		self.abstract_model = true;
		self
	}

	/// Installs `manager` as `objects`.
	pub fn manager(mut self, manager: Arc<dyn Manager>) -> Self {
		self.objects = Some(manager);
		self
	}

	/// Installs a default manager under a custom name; `objects` stays unset.
	pub fn default_manager(mut self, manager: Arc<dyn Manager>) -> Self {
		self.default_manager = Some(manager);
		self
	}

	/// Copies the fields and managers of `parent` (model inheritance).
	pub fn inherit(mut self, parent: &Model) -> Self {
		let own = std::mem::take(&mut self.fields);
		self.fields = parent
			.fields
			.iter()
			.filter(|field| !(field.auto_created && field.primary_key))
			.cloned()
			.collect();
		self = self.fields(own);
		if self.objects.is_none() {
			self.objects = parent.objects.clone();
		}
		if self.default_manager.is_none() {
			self.default_manager = parent.default_manager.clone();
		}
		self
	}

	/// Finishes the definition, adding an auto-created `id` primary key when
	/// no field is the primary key.
	pub fn build(mut self) -> ModelRef {
		if !self.fields.iter().any(|field| field.primary_key) {
			self.fields.insert(
				0,
				Field::new("id", FieldKind::Auto)
					.with_primary_key()
					.with_auto_created(),
			);
		}
		Arc::new(Model {
			app_label: self.app_label,
			name: self.name,
			abstract_model: self.abstract_model,
			fields: self.fields,
			objects: self.objects,
			default_manager: self.default_manager,
		})
	}

	/// Builds the model and registers it under its label.
	pub fn register(self) -> ModelRef {
		let model = self.build();
		registry::register_model(Arc::clone(&model));
		model
	}
}
