//! Foreign keys, one-to-one and many-to-many relations of auto factories.


use fixtures::{TestApp, app};
use reinhardt_factory::orm::{Field, Instance, Model};
use reinhardt_factory::{FactoryError, ModelFactory, Value, kwargs, settings};
use rstest::rstest;

fn auto_factory(app: &TestApp, name: &str) -> ModelFactory {
	ModelFactory::builder(app.model(name))
		.auto_fields(Vec::<String>::new())
		.build()
		.unwrap()
}

fn related(instance: &Instance, field: &str) -> Instance {
	match instance.get(field) {
		Some(Value::Instance(related)) => related,
		other => panic!("expected an instance in {}, got {:?}", field, other),
	}
}

#[rstest]
fn test_foreign_key_target_is_created_first(app: TestApp) {
	let factory = auto_factory(&app, "ForeignKeyModel");

	let instance = factory.create().unwrap();

	let target = related(&instance, "target");
	assert!(target.is_saved());
	assert_eq!(target.model().name(), "ComprehensiveMultiFieldModel");
	assert_eq!(app.db.count(&app.model("ComprehensiveMultiFieldModel")), 1);
	assert_eq!(app.db.count(&app.model("ForeignKeyModel")), 1);
}

#[rstest]
fn test_foreign_key_target_follows_build_strategy(app: TestApp) {
	let factory = auto_factory(&app, "ForeignKeyModel");

	let instance = factory.build().unwrap();

	assert!(!instance.is_saved());
	assert!(!related(&instance, "target").is_saved());
	assert_eq!(app.db.count(&app.model("ComprehensiveMultiFieldModel")), 0);
}

#[rstest]
fn test_nested_override_reaches_related_factory(app: TestApp) {
	let factory = auto_factory(&app, "ForeignKeyModel");

	let instance = factory
		.create_with(kwargs! { "target__chars" => "abcd" })
		.unwrap();

	assert_eq!(
		related(&instance, "target").get("chars"),
		Some(Value::Text("abcd".to_string()))
	);
}

#[rstest]
fn test_existing_target_is_reused(app: TestApp) {
	let target = auto_factory(&app, "ComprehensiveMultiFieldModel")
		.create()
		.unwrap();
	let factory = auto_factory(&app, "ForeignKeyModel");

	let instance = factory
		.create_with(kwargs! { "target" => &target })
		.unwrap();

	assert!(related(&instance, "target").ptr_eq(&target));
	assert_eq!(app.db.count(&app.model("ComprehensiveMultiFieldModel")), 1);
}

#[rstest]
fn test_excluded_fields_apply_to_related_factories(app: TestApp) {
	let factory = ModelFactory::builder(app.model("ForeignKeyModel"))
		.auto_fields(["chars"])
		.build()
		.unwrap();

	let instance = factory.create().unwrap();

	assert_eq!(
		related(&instance, "target").get("chars"),
		Some(Value::Text(String::new()))
	);
}

#[rstest]
fn test_one_to_one_chain(app: TestApp) {
	let factory = auto_factory(&app, "OneToOneModel");

	let instance = factory.create().unwrap();

	let relates_to = related(&instance, "relates_to");
	assert_eq!(relates_to.model().name(), "ForeignKeyModel");
	assert!(related(&relates_to, "target").is_saved());
}

#[rstest]
fn test_nullable_one_to_one_without_blank_is_populated(app: TestApp) {
	let factory = auto_factory(&app, "PointerModel");

	let instance = factory.create().unwrap();

	assert_eq!(related(&instance, "pointed").model().name(), "PointedModel");
	assert_eq!(app.db.count(&app.model("PointedModel")), 1);
}

#[rstest]
fn test_many_to_many_rows_are_added_after_create(app: TestApp) {
	let factory = auto_factory(&app, "ManyToManySourceModel");

	let instance = factory.create().unwrap();

	let batch = settings().related_batch_size;
	let targets = instance.related("targets").unwrap();
	assert_eq!(targets.count(), batch);
	assert!(targets.all().iter().all(Instance::is_saved));
	assert_eq!(
		app.db.count(&app.model("ComprehensiveMultiFieldModel")),
		batch
	);
}

#[rstest]
fn test_many_to_many_is_skipped_on_build(app: TestApp) {
	let factory = auto_factory(&app, "ManyToManySourceModel");

	let instance = factory.build().unwrap();

	assert_eq!(instance.related("targets").unwrap().count(), 0);
	assert_eq!(app.db.count(&app.model("ComprehensiveMultiFieldModel")), 0);
}

#[rstest]
fn test_self_referential_many_to_many(app: TestApp) {
	let factory = auto_factory(&app, "Person");

	let person = factory.create().unwrap();

	let batch = settings().related_batch_size;
	let friends = person.related("friends").unwrap().all();
	assert_eq!(friends.len(), batch);
	for friend in &friends {
		assert!(friend.is_saved());
		assert_eq!(friend.related("friends").unwrap().count(), 0);
	}
	assert_eq!(app.db.count(&app.model("Person")), batch + 1);
}

#[rstest]
fn test_mutual_many_to_many(app: TestApp) {
	let factory = auto_factory(&app, "Team");

	let team = factory.create().unwrap();

	let batch = settings().related_batch_size;
	let players = team.related("players").unwrap().all();
	assert_eq!(players.len(), batch);
	assert!(
		players
			.iter()
			.all(|player| player.related("teams").unwrap().count() == 0)
	);
	assert_eq!(app.db.count(&app.model("Team")), 1);
	assert_eq!(app.db.count(&app.model("Player")), batch);
}

#[rstest]
fn test_many_to_many_through_row_points_at_owner(app: TestApp) {
	let factory = auto_factory(&app, "ManyToManyWithThroughSourceModel");

	let instance = factory.create().unwrap();

	let rows = app.db.all(&app.model("ManyToManyThroughModel"));
	assert_eq!(rows.len(), 1);
	assert!(related(&rows[0], "source").ptr_eq(&instance));
	assert!(related(&rows[0], "multi").is_saved());
}

#[rstest]
fn test_many_to_many_through_override_is_forwarded(app: TestApp) {
	let factory = auto_factory(&app, "ManyToManyWithThroughSourceModel");

	factory
		.create_with(kwargs! { "targets__name" => "link" })
		.unwrap();

	let rows = app.db.all(&app.model("ManyToManyThroughModel"));
	assert_eq!(rows[0].get("name"), Some(Value::Text("link".to_string())));
}

#[rstest]
fn test_nullable_relation_breaks_cycle(app: TestApp) {
	let factory_a = auto_factory(&app, "CycleAModel");
	assert!(factory_a.declaration("c_fkey").is_some());

	let factory_c = auto_factory(&app, "CycleCModel");
	let c = factory_c.create().unwrap();

	let b = related(&c, "b_fkey");
	let a = related(&b, "a_fkey");
	assert_eq!(a.get("c_fkey"), Some(Value::Null));
	for name in ["CycleAModel", "CycleBModel", "CycleCModel"] {
		assert_eq!(app.db.count(&app.model(name)), 1, "{}", name);
	}

	let a = factory_a.create().unwrap();
	assert_eq!(a.get("c_fkey"), Some(Value::Null));
}

#[rstest]
fn test_required_cycle_is_a_configuration_error(app: TestApp) {
	let egg_label = app.label_of("Egg");
	let chicken = Model::builder(app.label.clone(), "Chicken")
		.field(Field::foreign_key("egg", egg_label))
		.manager(app.db.manager())
		.register();
	Model::builder(app.label.clone(), "Egg")
		.field(Field::foreign_key("chicken", &chicken))
		.manager(app.db.manager())
		.register();

	let error = ModelFactory::builder(&chicken)
		.auto_fields(Vec::<String>::new())
		.build()
		.unwrap_err();

	assert!(matches!(error, FactoryError::Configuration(_)));
	assert!(error.to_string().contains("cycle"));
}

#[rstest]
fn test_model_given_by_label(app: TestApp) {
	let factory = ModelFactory::builder(app.label_of("ForeignKeyModel"))
		.auto_fields(Vec::<String>::new())
		.build()
		.unwrap();

	assert_eq!(factory.name(), "ForeignKeyModelFactory");
	let instance = factory.create().unwrap();
	assert_eq!(instance.model().label(), app.label_of("ForeignKeyModel"));
}

#[rstest]
fn test_unknown_label_fails_on_use(app: TestApp) {
	let factory = ModelFactory::builder(app.label_of("Missing")).build().unwrap();

	let error = factory.create().unwrap_err();
	assert!(matches!(error, FactoryError::ModelNotFound(label) if label == app.label_of("Missing")));
}
