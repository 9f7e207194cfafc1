//! In-memory test application.
//!
//! Every [`TestApp`] registers its own copy of the models under a unique app
//! label, backed by a fresh database, so tests never share rows.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use reinhardt_factory::Kwargs;
use reinhardt_factory::orm::{
	Field, FieldKind, InMemoryDatabase, InMemoryManager, Instance, IpProtocol, Manager, Model,
	ModelRef, OrmResult,
};

static APP_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Manager recording the calls factories make, on top of the in-memory
/// database.
pub struct RecordingManager {
	inner: InMemoryManager,
	calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingManager {
	pub fn new(db: InMemoryDatabase) -> Arc<Self> {
		Arc::new(Self {
			inner: InMemoryManager::new(db, "default"),
			calls: Arc::new(Mutex::new(Vec::new())),
		})
	}

	/// Calls received so far, as `method@alias`.
	pub fn calls(&self) -> Vec<String> {
		self.calls.lock().clone()
	}

	fn record(&self, method: &str) {
		self.calls
			.lock()
			.push(format!("{}@{}", method, self.inner.alias()));
	}
}

impl Manager for RecordingManager {
	fn alias(&self) -> &str {
		self.inner.alias()
	}

	fn using(&self, alias: &str) -> Arc<dyn Manager> {
		Arc::new(RecordingManager {
			inner: InMemoryManager::new(self.inner.database().clone(), alias),
			calls: Arc::clone(&self.calls),
		})
	}

	fn filter(&self, model: &ModelRef, lookup: &Kwargs) -> OrmResult<Vec<Instance>> {
		self.inner.filter(model, lookup)
	}

	fn save(&self, instance: &Instance) -> OrmResult<()> {
		self.inner.save(instance)
	}

	fn create(&self, model: &ModelRef, kwargs: Kwargs) -> OrmResult<Instance> {
		self.record("create");
		self.inner.create(model, kwargs)
	}

	fn get_or_create(
		&self,
		model: &ModelRef,
		lookup: Kwargs,
		defaults: Kwargs,
	) -> OrmResult<(Instance, bool)> {
		self.record("get_or_create");
		self.inner.get_or_create(model, lookup, defaults)
	}
}

/// Registered test models.
pub struct TestApp {
	pub label: String,
	pub db: InMemoryDatabase,
	pub custom_manager: Arc<RecordingManager>,
	pub abstract_custom_manager: Arc<RecordingManager>,
	models: HashMap<&'static str, ModelRef>,
}

impl TestApp {
	pub fn new() -> Self {
		let label = format!("djapp{}", APP_COUNTER.fetch_add(1, Ordering::SeqCst));
		let db = InMemoryDatabase::new();
		let custom_manager = RecordingManager::new(db.clone());
		let abstract_custom_manager = RecordingManager::new(db.clone());
		let mut app = Self {
			label,
			db,
			custom_manager,
			abstract_custom_manager,
			models: HashMap::new(),
		};
		app.register_models();
		app
	}

	/// A registered model, by name.
	pub fn model(&self, name: &str) -> ModelRef {
		match self.models.get(name) {
			Some(model) => Arc::clone(model),
			None => panic!("unknown test model {}", name),
		}
	}

	/// `app_label.Name` of a model of this app.
	pub fn label_of(&self, name: &str) -> String {
		format!("{}.{}", self.label, name)
	}

	fn model_builder(&self, name: &str) -> reinhardt_factory::orm::ModelBuilder {
		Model::builder(self.label.clone(), name).manager(self.db.manager())
	}

	fn add(&mut self, name: &'static str, model: ModelRef) -> ModelRef {
		self.models.insert(name, Arc::clone(&model));
		model
	}

	fn register_models(&mut self) {
		let standard = self.model_builder("StandardModel")
			.field(Field::char("foo", 20))
			.register();
		self.add("StandardModel", Arc::clone(&standard));

		let model = self.model_builder("NonIntegerPk")
			.field(Field::char("foo", 20).with_primary_key())
			.field(Field::char("bar", 20).with_blank())
			.register();
		self.add("NonIntegerPk", model);

		let model = self.model_builder("MultifieldModel")
			.field(Field::slug("slug").with_max_length(20).with_unique())
			.field(Field::char("text", 20))
			.register();
		self.add("MultifieldModel", model);

		let abstract_base = self.model_builder("AbstractBase")
			.field(Field::char("foo", 20))
			.abstract_model()
			.register();
		self.add("AbstractBase", Arc::clone(&abstract_base));

		let model = self.model_builder("ConcreteSon")
			.inherit(&abstract_base)
			.register();
		self.add("ConcreteSon", model);

		let abstract_son = self.model_builder("AbstractSon")
			.inherit(&abstract_base)
			.abstract_model()
			.register();
		self.add("AbstractSon", Arc::clone(&abstract_son));

		let model = self.model_builder("ConcreteGrandSon")
			.inherit(&abstract_son)
			.register();
		self.add("ConcreteGrandSon", model);

		let model = self.model_builder("StandardSon")
			.inherit(&standard)
			.register();
		self.add("StandardSon", model);

		let pointed = self.model_builder("PointedModel")
			.field(Field::char("foo", 20))
			.register();
		self.add("PointedModel", Arc::clone(&pointed));

		let model = self.model_builder("PointerModel")
			.field(Field::char("bar", 20))
			.field(Field::one_to_one("pointed", &pointed).with_null())
			.register();
		self.add("PointerModel", model);

		let model = self.model_builder("WithDefaultValue")
			.field(Field::char("foo", 20).with_default(""))
			.register();
		self.add("WithDefaultValue", model);

		let model = self.model_builder("WithFile")
			.field(Field::new("afile", FieldKind::File))
			.register();
		self.add("WithFile", model);

		let model = self.model_builder("WithImage")
			.field(Field::new("animage", FieldKind::Image))
			.field(Field::new("size", FieldKind::Integer).with_default(0i64))
			.register();
		self.add("WithImage", model);

		let model = self.model_builder("WithSignals")
			.field(Field::char("foo", 20))
			.register();
		self.add("WithSignals", model);

		let model = Model::builder(self.label.clone(), "WithCustomManager")
			.field(Field::char("foo", 20))
			.manager(self.custom_manager.clone())
			.register();
		self.add("WithCustomManager", model);

		let abstract_custom = Model::builder(self.label.clone(), "AbstractWithCustomManager")
			.default_manager(self.abstract_custom_manager.clone())
			.abstract_model()
			.register();
		self.add("AbstractWithCustomManager", Arc::clone(&abstract_custom));

		let model = Model::builder(self.label.clone(), "FromAbstractWithCustomManager")
			.inherit(&abstract_custom)
			.register();
		self.add("FromAbstractWithCustomManager", model);

		let comprehensive = self.model_builder("ComprehensiveMultiFieldModel")
			// Text
			.field(Field::char("chars", 4))
			.field(Field::new("text", FieldKind::Text))
			.field(Field::slug("slug"))
			// Misc
			.field(Field::new("binary", FieldKind::Binary))
			.field(Field::new("boolean", FieldKind::Boolean).with_default(false))
			.field(Field::new("nullboolean", FieldKind::NullBoolean).with_null().with_blank())
			.field(Field::new("uu", FieldKind::Uuid))
			// Date and time
			.field(Field::new("dt", FieldKind::Date))
			.field(Field::new("ts", FieldKind::DateTime))
			.field(Field::new("time", FieldKind::Time))
			.field(Field::new("duration", FieldKind::Duration))
			// Numbers
			.field(Field::new("nb", FieldKind::Integer))
			.field(Field::decimal("dec", 10, 4))
			.field(Field::new("bigint", FieldKind::BigInteger))
			.field(Field::new("posint", FieldKind::PositiveInteger))
			.field(Field::new("smallint", FieldKind::SmallInteger))
			.field(Field::new("smallposint", FieldKind::PositiveSmallInteger))
			.field(Field::new("fl", FieldKind::Float))
			// Files
			.field(Field::new("attached", FieldKind::File))
			.field(Field::new("img", FieldKind::Image))
			// Internet
			.field(Field::ip_address("ipv4", IpProtocol::Ipv4))
			.field(Field::ip_address("ipv6", IpProtocol::Ipv6))
			.field(Field::ip_address("ipany", IpProtocol::Both))
			.field(Field::email("email"))
			.field(Field::url("url"))
			.register();
		self.add("ComprehensiveMultiFieldModel", Arc::clone(&comprehensive));

		let model = self.model_builder("OptionalModel")
			.field(Field::char("req", 10))
			.field(Field::char("opt", 3).with_blank())
			.register();
		self.add("OptionalModel", model);

		let foreign_key = self.model_builder("ForeignKeyModel")
			.field(Field::char("name", 20))
			.field(Field::foreign_key("target", &comprehensive))
			.register();
		self.add("ForeignKeyModel", Arc::clone(&foreign_key));

		let model = self.model_builder("OneToOneModel")
			.field(Field::char("name", 20))
			.field(Field::one_to_one("relates_to", &foreign_key))
			.register();
		self.add("OneToOneModel", model);

		let model = self.model_builder("ManyToManySourceModel")
			.field(Field::char("name", 20))
			.field(Field::many_to_many("targets", &comprehensive))
			.register();
		self.add("ManyToManySourceModel", model);

		let through = self.model_builder("ManyToManyThroughModel")
			.field(Field::char("name", 20))
			.field(Field::foreign_key("multi", &comprehensive))
			.field(Field::foreign_key(
				"source",
				self.label_of("ManyToManyWithThroughSourceModel"),
			))
			.register();
		self.add("ManyToManyThroughModel", Arc::clone(&through));

		let model = self.model_builder("ManyToManyWithThroughSourceModel")
			.field(Field::char("name", 20))
			.field(Field::many_to_many("targets", &comprehensive).with_through(&through, None))
			.register();
		self.add("ManyToManyWithThroughSourceModel", model);

		let cycle_a = self.model_builder("CycleAModel")
			.field(Field::char("a_name", 10))
			.field(Field::foreign_key("c_fkey", self.label_of("CycleCModel")).with_null())
			.register();
		self.add("CycleAModel", Arc::clone(&cycle_a));

		let cycle_b = self.model_builder("CycleBModel")
			.field(Field::char("b_name", 10))
			.field(Field::foreign_key("a_fkey", &cycle_a))
			.register();
		self.add("CycleBModel", Arc::clone(&cycle_b));

		let model = self.model_builder("CycleCModel")
			.field(Field::char("c_name", 10))
			.field(Field::foreign_key("b_fkey", &cycle_b))
			.register();
		self.add("CycleCModel", model);

		let model = self.model_builder("Person")
			.field(Field::char("name", 10))
			.field(Field::many_to_many("friends", self.label_of("Person")))
			.register();
		self.add("Person", model);

		let team = self.model_builder("Team")
			.field(Field::char("name", 10))
			.field(Field::many_to_many("players", self.label_of("Player")))
			.register();
		self.add("Team", Arc::clone(&team));

		let model = self.model_builder("Player")
			.field(Field::char("name", 10))
			.field(Field::many_to_many("teams", &team))
			.register();
		self.add("Player", model);
	}
}

impl Default for TestApp {
	fn default() -> Self {
		Self::new()
	}
}
