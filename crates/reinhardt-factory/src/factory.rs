//! Model factories.
//!
//! A [`ModelFactory`] generates instances of one model from an ordered list
//! of [`Declaration`]s. Generation happens in four steps:
//!
//! 1. the next sequence number is drawn;
//! 2. declarations that do not need the instance are resolved in order,
//!    related instances first;
//! 3. the instance is built (unsaved) or created through the model's
//!    manager, optionally with `get_or_create`;
//! 4. post-generation declarations run, after which a created instance is
//!    saved again.
//!
//! ## Example
//!
//! ```
//! use reinhardt_factory::{Declaration, ModelFactory, Value};
//! use reinhardt_factory::orm::{Field, InMemoryDatabase, Model};
//!
//! let db = InMemoryDatabase::new();
//! let author = Model::builder("docs", "Author")
//!     .field(Field::char("name", 30))
//!     .field(Field::char("bio", 200).with_blank())
//!     .manager(db.manager())
//!     .build();
//!
//! let factory = ModelFactory::builder(&author)
//!     .declare("name", Declaration::sequence(|n| Value::from(format!("author-{}", n))))
//!     .build()
//!     .unwrap();
//!
//! let first = factory.create().unwrap();
//! assert_eq!(first.get("name"), Some(Value::from("author-0")));
//! assert!(first.is_saved());
//! assert_eq!(db.count(&author), 1);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::attachments::AttachmentParams;
use crate::declarations::{Declaration, PostGenerationContext, Resolver};
use crate::error::{FactoryError, FactoryResult};
use crate::introspector::{FieldContext, Introspector};
use crate::mute::MuteSignals;
use crate::orm::{DEFAULT_DB_ALIAS, Instance, Manager, ModelRef, get_model_by_label};
use crate::settings::settings;
use crate::value::{Kwargs, Value};

/// Keyword reserved by `get_or_create` for the non-lookup values.
const RESERVED_LOOKUP_KEY: &str = "defaults";

/// Separator routing an override to a related factory: `author__name`.
const NESTED_SEPARATOR: &str = "__";

/// Whether generated instances are saved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Strategy {
	/// Unsaved instance.
	#[default]
	Build,
	/// Instance saved through the model's manager.
	Create,
}

/// Position of one generation within a factory's sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStep {
	pub sequence: u64,
	pub strategy: Strategy,
}

impl BuildStep {
	pub fn new(sequence: u64, strategy: Strategy) -> Self {
		Self { sequence, strategy }
	}

	/// `true` under [`Strategy::Create`].
	pub fn create(&self) -> bool {
		self.strategy == Strategy::Create
	}
}

/// Model a factory generates: a model, or a label resolved through the
/// registry on first use.
#[derive(Clone)]
pub enum ModelSpec {
	Model(ModelRef),
	Label(String),
}

impl ModelSpec {
	pub fn resolve(&self) -> FactoryResult<ModelRef> {
		match self {
			ModelSpec::Model(model) => Ok(Arc::clone(model)),
			ModelSpec::Label(label) => get_model_by_label(label)
				.ok_or_else(|| FactoryError::ModelNotFound(label.clone())),
		}
	}

	pub fn label(&self) -> String {
		match self {
			ModelSpec::Model(model) => model.label(),
			ModelSpec::Label(label) => label.clone(),
		}
	}
}

impl fmt::Debug for ModelSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.label())
	}
}

impl From<ModelRef> for ModelSpec {
	fn from(model: ModelRef) -> Self {
		ModelSpec::Model(model)
	}
}

impl From<&ModelRef> for ModelSpec {
	fn from(model: &ModelRef) -> Self {
		ModelSpec::Model(Arc::clone(model))
	}
}

impl From<&str> for ModelSpec {
	fn from(label: &str) -> Self {
		ModelSpec::Label(label.to_string())
	}
}

impl From<String> for ModelSpec {
	fn from(label: String) -> Self {
		ModelSpec::Label(label)
	}
}

/// Options inherited by child factories.
#[derive(Debug, Clone)]
struct FactoryOptions {
	django_get_or_create: Vec<String>,
	database: String,
}

/// Factory generating instances of one model.
#[derive(Clone)]
pub struct ModelFactory {
	name: String,
	model: Option<ModelSpec>,
	declarations: Vec<(String, Declaration)>,
	options: FactoryOptions,
	counter: Arc<AtomicU64>,
	mute: Option<MuteSignals>,
}

impl ModelFactory {
	/// Starts the definition of a factory for `model`.
	pub fn builder(model: impl Into<ModelSpec>) -> ModelFactoryBuilder {
		ModelFactoryBuilder::new(Some(model.into()))
	}

	/// Starts the definition of a factory without a model, meant to be
	/// inherited from.
	pub fn abstract_builder(name: impl Into<String>) -> ModelFactoryBuilder {
		ModelFactoryBuilder::new(None).name(name)
	}

	/// Starts the definition of a factory inheriting the declarations and
	/// options of `parent`.
	pub fn inherit(parent: &ModelFactory) -> ModelFactoryBuilder {
		let mut builder = ModelFactoryBuilder::new(parent.model.clone());
		builder.declarations = parent.declarations.clone();
		builder.django_get_or_create = parent.options.django_get_or_create.clone();
		builder.database = Some(parent.options.database.clone());
		builder.mute = parent.mute.clone();
		builder.parent = Some(ParentFactory {
			model: parent.model.clone(),
			counter: Arc::clone(&parent.counter),
		});
		builder
	}

	/// Factory populating every required field of `model` except `exclude`,
	/// with `extra` declared on top.
	pub fn auto_factory(
		model: ModelRef,
		exclude: impl IntoIterator<Item = String>,
		extra: Vec<(String, Declaration)>,
	) -> FactoryResult<ModelFactory> {
		let name = format!("{}AutoFactory", model.name());
		let mut builder = ModelFactory::builder(model).name(name).auto_fields(exclude);
		for (field, declaration) in extra {
			builder = builder.declare(field, declaration);
		}
		builder.build()
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn model_spec(&self) -> Option<&ModelSpec> {
		self.model.as_ref()
	}

	/// The model this factory generates.
	pub fn model(&self) -> FactoryResult<ModelRef> {
		match &self.model {
			Some(spec) => spec.resolve(),
			None => Err(FactoryError::Configuration(format!(
				"No model set on {}",
				self.name
			))),
		}
	}

	pub fn declarations(&self) -> &[(String, Declaration)] {
		&self.declarations
	}

	pub fn declaration(&self, name: &str) -> Option<&Declaration> {
		self.declarations
			.iter()
			.find(|(declared, _)| declared == name)
			.map(|(_, declaration)| declaration)
	}

	pub fn django_get_or_create(&self) -> &[String] {
		&self.options.django_get_or_create
	}

	pub fn database(&self) -> &str {
		&self.options.database
	}

	/// Sequence number the next generation will use.
	pub fn sequence(&self) -> u64 {
		self.counter.load(Ordering::SeqCst)
	}

	/// Restarts the sequence at `value`, for every factory sharing it.
	pub fn reset_sequence(&self, value: u64) {
		self.counter.store(value, Ordering::SeqCst);
	}

	/// Same factory, generating with `signals` muted.
	pub fn with_muted_signals(mut self, signals: MuteSignals) -> Self {
		self.mute = Some(signals);
		self
	}

	pub fn build(&self) -> FactoryResult<Instance> {
		self.generate(Strategy::Build, Kwargs::new())
	}

	pub fn create(&self) -> FactoryResult<Instance> {
		self.generate(Strategy::Create, Kwargs::new())
	}

	pub fn build_with(&self, overrides: Kwargs) -> FactoryResult<Instance> {
		self.generate(Strategy::Build, overrides)
	}

	pub fn create_with(&self, overrides: Kwargs) -> FactoryResult<Instance> {
		self.generate(Strategy::Create, overrides)
	}

	pub fn build_batch(&self, size: usize) -> FactoryResult<Vec<Instance>> {
		(0..size).map(|_| self.build()).collect()
	}

	pub fn create_batch(&self, size: usize) -> FactoryResult<Vec<Instance>> {
		(0..size).map(|_| self.create()).collect()
	}

	/// Generates one instance.
	///
	/// `overrides` replace declarations of the same name; `name__key`
	/// entries are forwarded to the declaration `name` as `key`.
	pub fn generate(&self, strategy: Strategy, overrides: Kwargs) -> FactoryResult<Instance> {
		let _muted = self.mute.as_ref().map(|mute| mute.copy().activate());

		let model = self.model()?;
		let step = BuildStep::new(self.counter.fetch_add(1, Ordering::SeqCst), strategy);
		let (mut direct, mut nested) = self.split_overrides(overrides)?;

		let mut extracted = Kwargs::new();
		for (name, declaration) in &self.declarations {
			if declaration.is_post_generation()
				&& let Some(value) = direct.remove(name)
			{
				extracted.insert(name.clone(), value);
			}
		}

		let mut values = direct;
		for (name, declaration) in &self.declarations {
			if declaration.is_post_generation() || values.contains_key(name) {
				continue;
			}
			let nested_kwargs = nested.remove(name).unwrap_or_default();
			let value = self.resolve(name, declaration, &values, nested_kwargs, step)?;
			tracing::trace!(
				factory = %self.name,
				field = %name,
				value = value.type_name(),
				"resolved declaration"
			);
			values.insert(name.clone(), value);
		}

		let instance = match strategy {
			Strategy::Build => model.instantiate(values)?,
			Strategy::Create => self.create_instance(&model, values)?,
		};

		let mut results: BTreeMap<String, Option<Value>> = BTreeMap::new();
		for (name, declaration) in &self.declarations {
			let hook_kwargs = nested.remove(name).unwrap_or_default();
			let result = match declaration {
				Declaration::PostGeneration(hook) => hook(&PostGenerationContext {
					instance: &instance,
					create: step.create(),
					extracted: extracted.get(name),
					kwargs: &hook_kwargs,
					step,
				})?,
				Declaration::RelatedFactory(related) => {
					if let Some(value) = extracted.get(name) {
						Some(value.clone())
					} else {
						let mut kwargs = related.defaults().clone();
						kwargs.extend(hook_kwargs);
						kwargs.insert(
							related.related_name().to_string(),
							Value::Instance(instance.clone()),
						);
						let factory = related.factory()?;
						Some(Value::Instance(factory.generate(strategy, kwargs)?))
					}
				}
				_ => continue,
			};
			results.insert(name.clone(), result);
		}
		self.after_postgeneration(&instance, step, &results)?;

		tracing::debug!(
			target: "reinhardt_factory::generate",
			factory = %self.name,
			model = %model.label(),
			sequence = step.sequence,
			strategy = ?strategy,
			"generated instance"
		);
		Ok(instance)
	}

	/// Saves the instance again when creating and a post-generation
	/// declaration ran, since it may have changed the instance.
	fn after_postgeneration(
		&self,
		instance: &Instance,
		step: BuildStep,
		results: &BTreeMap<String, Option<Value>>,
	) -> FactoryResult<()> {
		if step.create() && !results.is_empty() {
			instance.save()?;
		}
		Ok(())
	}

	/// Splits `name__key` overrides from plain ones.
	fn split_overrides(&self, overrides: Kwargs) -> FactoryResult<(Kwargs, BTreeMap<String, Kwargs>)> {
		let mut direct = Kwargs::new();
		let mut nested: BTreeMap<String, Kwargs> = BTreeMap::new();
		for (key, value) in overrides {
			let Some((root, rest)) = key.split_once(NESTED_SEPARATOR) else {
				direct.insert(key, value);
				continue;
			};
			if self.declaration(root).is_none() {
				return Err(FactoryError::Configuration(format!(
					"Override '{}' in factory {} targets unknown declaration '{}'",
					key, self.name, root
				)));
			}
			nested
				.entry(root.to_string())
				.or_default()
				.insert(rest.to_string(), value);
		}
		Ok((direct, nested))
	}

	fn resolve(
		&self,
		name: &str,
		declaration: &Declaration,
		values: &Kwargs,
		nested: Kwargs,
		step: BuildStep,
	) -> FactoryResult<Value> {
		Ok(match declaration {
			Declaration::Value(value) => value.clone(),
			Declaration::Fuzzy(generate) => reinhardt_fuzzy::random::with_rng(|rng| generate(rng)),
			Declaration::Sequence(sequence) => sequence(step.sequence),
			Declaration::Lazy(lazy) => lazy(&Resolver::new(&self.name, values, step.sequence))?,
			Declaration::SubFactory(sub) => {
				Value::Instance(sub.factory()?.generate(step.strategy, nested)?)
			}
			Declaration::Attachment(field) => {
				let params = AttachmentParams::from_kwargs(&nested)?;
				Value::File(field.generate(&step, &params)?)
			}
			Declaration::PostGeneration(_) | Declaration::RelatedFactory(_) => {
				return Err(FactoryError::Configuration(format!(
					"Declaration '{}' of factory {} runs after generation",
					name, self.name
				)));
			}
		})
	}

	/// Manager the factory writes through: `objects` when the model has one,
	/// its default manager otherwise, routed to the factory's database.
	pub fn manager(&self) -> FactoryResult<Arc<dyn Manager>> {
		let model = self.model()?;
		self.manager_for(&model)
	}

	fn manager_for(&self, model: &ModelRef) -> FactoryResult<Arc<dyn Manager>> {
		let manager = model
			.objects()
			.or_else(|| model.default_manager())
			.ok_or_else(|| FactoryError::ManagerNotFound {
				factory: self.name.clone(),
				model: model.label(),
			})?;
		if self.options.database != DEFAULT_DB_ALIAS {
			return Ok(manager.using(&self.options.database));
		}
		Ok(manager)
	}

	/// Saves a new instance built from `kwargs`.
	///
	/// With `django_get_or_create` keys, those keys are moved out of
	/// `kwargs` and used as the lookup, the remaining values serving as
	/// defaults for the row created when none matches.
	pub fn create_instance(&self, model: &ModelRef, mut kwargs: Kwargs) -> FactoryResult<Instance> {
		let manager = self.manager_for(model)?;
		if self.options.django_get_or_create.is_empty() {
			return Ok(manager.create(model, kwargs)?);
		}

		let mut lookup = Kwargs::new();
		for field in &self.options.django_get_or_create {
			let value = kwargs
				.remove(field)
				.ok_or_else(|| FactoryError::MissingLookupField {
					field: field.clone(),
					factory: self.name.clone(),
				})?;
			lookup.insert(field.clone(), value);
		}
		let (instance, created) = manager.get_or_create(model, lookup, kwargs)?;
		tracing::trace!(factory = %self.name, created, "get_or_create");
		Ok(instance)
	}
}

impl fmt::Debug for ModelFactory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let names: Vec<&str> = self.declarations.iter().map(|(name, _)| name.as_str()).collect();
		f.debug_struct("ModelFactory")
			.field("name", &self.name)
			.field("model", &self.model)
			.field("declarations", &names)
			.field("django_get_or_create", &self.options.django_get_or_create)
			.field("database", &self.options.database)
			.finish()
	}
}

struct ParentFactory {
	model: Option<ModelSpec>,
	counter: Arc<AtomicU64>,
}

/// Definition of a [`ModelFactory`]; validated by [`build`](Self::build).
pub struct ModelFactoryBuilder {
	name: Option<String>,
	model: Option<ModelSpec>,
	declarations: Vec<(String, Declaration)>,
	django_get_or_create: Vec<String>,
	database: Option<String>,
	auto_fields: Option<BTreeSet<String>>,
	introspector: Introspector,
	mute: Option<MuteSignals>,
	parent: Option<ParentFactory>,
}

impl ModelFactoryBuilder {
	fn new(model: Option<ModelSpec>) -> Self {
		Self {
			name: None,
			model,
			declarations: Vec::new(),
			django_get_or_create: Vec::new(),
			database: None,
			auto_fields: None,
			introspector: Introspector::default(),
			mute: None,
			parent: None,
		}
	}

	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn model(mut self, model: impl Into<ModelSpec>) -> Self {
		self.model = Some(model.into());
		self
	}

	/// Declares how `name` is generated, replacing any inherited declaration
	/// of the same name in place.
	pub fn declare(mut self, name: impl Into<String>, declaration: Declaration) -> Self {
		let name = name.into();
		match self.declarations.iter_mut().find(|(declared, _)| *declared == name) {
			Some((_, existing)) => *existing = declaration,
			None => self.declarations.push((name, declaration)),
		}
		self
	}

	/// Fields used as the `get_or_create` lookup when creating.
	pub fn django_get_or_create<I, S>(mut self, fields: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.django_get_or_create = fields.into_iter().map(Into::into).collect();
		self
	}

	/// Database alias instances are created on.
	pub fn database(mut self, alias: impl Into<String>) -> Self {
		self.database = Some(alias.into());
		self
	}

	/// Populates every required field that is not declared, except
	/// `exclude`.
	pub fn auto_fields<I, S>(mut self, exclude: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.auto_fields = Some(exclude.into_iter().map(Into::into).collect());
		self
	}

	/// Introspector used by [`auto_fields`](Self::auto_fields).
	pub fn introspector(mut self, introspector: Introspector) -> Self {
		self.introspector = introspector;
		self
	}

	/// Mutes `signals` during every generation.
	pub fn mute_signals(mut self, signals: MuteSignals) -> Self {
		self.mute = Some(signals);
		self
	}

	/// Validates the definition and builds the factory.
	pub fn build(self) -> FactoryResult<ModelFactory> {
		let name = self.name.clone().unwrap_or_else(|| match &self.model {
			Some(ModelSpec::Model(model)) => format!("{}Factory", model.name()),
			Some(ModelSpec::Label(label)) => {
				let model_name = label.rsplit('.').next().unwrap_or(label);
				format!("{}Factory", model_name)
			}
			None => "Factory".to_string(),
		});

		if self
			.django_get_or_create
			.iter()
			.any(|field| field == RESERVED_LOOKUP_KEY)
		{
			return Err(FactoryError::Configuration(format!(
				"'{}' is a reserved keyword for get_or_create (in {}.django_get_or_create={:?})",
				RESERVED_LOOKUP_KEY, name, self.django_get_or_create
			)));
		}

		let mut declarations = self.declarations;
		if let Some(exclude) = &self.auto_fields {
			let model = match &self.model {
				Some(spec) => spec.resolve()?,
				None => {
					return Err(FactoryError::Configuration(format!(
						"No model set on {}",
						name
					)));
				}
			};
			for field_name in self.introspector.default_field_names(&model) {
				if exclude.contains(&field_name)
					|| declarations.iter().any(|(declared, _)| *declared == field_name)
				{
					continue;
				}
				let ctx = FieldContext {
					model: &model,
					field: self.introspector.field_by_name(&model, &field_name),
					field_name: &field_name,
					skips: exclude,
				};
				if let Some(declaration) = self.introspector.build_declaration(&ctx)? {
					declarations.push((field_name, declaration));
				}
			}
		}

		let counter = match self.parent {
			Some(parent) if !separate_counter(parent.model.as_ref(), self.model.as_ref()) => {
				parent.counter
			}
			_ => Arc::new(AtomicU64::new(0)),
		};

		let database = self
			.database
			.unwrap_or_else(|| settings().default_database);

		tracing::debug!(
			factory = %name,
			declarations = declarations.len(),
			database = %database,
			"defined factory"
		);

		Ok(ModelFactory {
			name,
			model: self.model,
			declarations,
			options: FactoryOptions {
				django_get_or_create: self.django_get_or_create,
				database,
			},
			counter,
			mute: self.mute,
		})
	}
}

/// A factory for a concrete model does not share the counter of a parent
/// factory for an abstract model.
fn separate_counter(parent: Option<&ModelSpec>, child: Option<&ModelSpec>) -> bool {
	let is_abstract = |spec: Option<&ModelSpec>| {
		spec.and_then(|spec| spec.resolve().ok())
			.map(|model| model.is_abstract())
	};
	is_abstract(parent) == Some(true) && is_abstract(child) == Some(false)
}
