//! Factory declarations.
//!
//! A [`Declaration`] describes how one attribute of a generated instance
//! gets its value. Declarations are evaluated lazily, once per generated
//! instance, in declaration order.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use rand::rngs::StdRng;
use reinhardt_fuzzy::{Faker, FakerProvider, FuzzyAttribute};

use crate::attachments::AttachmentField;
use crate::error::{FactoryError, FactoryResult};
use crate::factory::{BuildStep, ModelFactory};
use crate::orm::{Instance, RelatedModel};
use crate::value::{Kwargs, Value};

/// Random value generator.
pub type GeneratorFn = Arc<dyn Fn(&mut StdRng) -> Value + Send + Sync>;
/// Value derived from the sequence number.
pub type SequenceFn = Arc<dyn Fn(u64) -> Value + Send + Sync>;
/// Value derived from the attributes resolved so far.
pub type LazyFn = Arc<dyn Fn(&Resolver<'_>) -> FactoryResult<Value> + Send + Sync>;
/// Hook run once the instance exists.
pub type PostGenerationFn =
	Arc<dyn Fn(&PostGenerationContext<'_>) -> FactoryResult<Option<Value>> + Send + Sync>;

/// How one attribute is produced.
#[derive(Clone)]
pub enum Declaration {
	/// Fixed value.
	Value(Value),
	/// Random value drawn from the shared random source.
	Fuzzy(GeneratorFn),
	/// Value computed from the factory's sequence number.
	Sequence(SequenceFn),
	/// Value computed from previously resolved attributes.
	Lazy(LazyFn),
	/// Related instance generated by another factory before the owner.
	SubFactory(SubFactory),
	/// File produced by an attachment builder.
	Attachment(Arc<dyn AttachmentField>),
	/// Hook run after the owner is generated.
	PostGeneration(PostGenerationFn),
	/// Instance generated by another factory after the owner, pointing back at it.
	RelatedFactory(RelatedFactory),
}

impl Declaration {
	pub fn value(value: impl Into<Value>) -> Self {
		Declaration::Value(value.into())
	}

	/// Declaration drawing from a fuzzy attribute.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_factory::Declaration;
	/// use reinhardt_fuzzy::FuzzyInteger;
	///
	/// let declaration = Declaration::fuzzy(FuzzyInteger::new(0, 10).unwrap());
	/// assert!(!declaration.is_post_generation());
	/// ```
	pub fn fuzzy<F>(attribute: F) -> Self
	where
		F: FuzzyAttribute + Send + Sync + 'static,
		F::Output: Into<Value>,
	{
		Declaration::Fuzzy(Arc::new(move |rng: &mut StdRng| {
			attribute.fuzz(rng).into()
		}))
	}

	/// Declaration drawing from a faker provider.
	pub fn faker(provider: FakerProvider) -> Self {
		Self::fuzzy(Faker::new(provider))
	}

	pub fn sequence<F>(f: F) -> Self
	where
		F: Fn(u64) -> Value + Send + Sync + 'static,
	{
		Declaration::Sequence(Arc::new(f))
	}

	pub fn lazy<F>(f: F) -> Self
	where
		F: Fn(&Resolver<'_>) -> FactoryResult<Value> + Send + Sync + 'static,
	{
		Declaration::Lazy(Arc::new(f))
	}

	pub fn sub_factory(factory: ModelFactory) -> Self {
		Declaration::SubFactory(SubFactory::new(factory))
	}

	pub fn attachment(field: impl AttachmentField + 'static) -> Self {
		Declaration::Attachment(Arc::new(field))
	}

	pub fn post_generation<F>(f: F) -> Self
	where
		F: Fn(&PostGenerationContext<'_>) -> FactoryResult<Option<Value>> + Send + Sync + 'static,
	{
		Declaration::PostGeneration(Arc::new(f))
	}

	pub fn related_factory(factory: ModelFactory, related_name: impl Into<String>) -> Self {
		Declaration::RelatedFactory(RelatedFactory::new(factory, related_name))
	}

	/// Whether the declaration runs after the instance is generated.
	pub fn is_post_generation(&self) -> bool {
		matches!(
			self,
			Declaration::PostGeneration(_) | Declaration::RelatedFactory(_)
		)
	}

	fn kind(&self) -> &'static str {
		match self {
			Declaration::Value(_) => "Value",
			Declaration::Fuzzy(_) => "Fuzzy",
			Declaration::Sequence(_) => "Sequence",
			Declaration::Lazy(_) => "Lazy",
			Declaration::SubFactory(_) => "SubFactory",
			Declaration::Attachment(_) => "Attachment",
			Declaration::PostGeneration(_) => "PostGeneration",
			Declaration::RelatedFactory(_) => "RelatedFactory",
		}
	}
}

impl fmt::Debug for Declaration {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Declaration::Value(value) => f.debug_tuple("Value").field(value).finish(),
			Declaration::SubFactory(sub) => f.debug_tuple("SubFactory").field(sub).finish(),
			Declaration::RelatedFactory(related) => {
				f.debug_tuple("RelatedFactory").field(related).finish()
			}
			other => f.write_str(other.kind()),
		}
	}
}

/// Read access to the attributes resolved before a lazy declaration.
pub struct Resolver<'a> {
	factory: &'a str,
	values: &'a Kwargs,
	sequence: u64,
}

impl<'a> Resolver<'a> {
	pub(crate) fn new(factory: &'a str, values: &'a Kwargs, sequence: u64) -> Self {
		Self {
			factory,
			values,
			sequence,
		}
	}

	/// A previously resolved attribute.
	pub fn get(&self, name: &str) -> FactoryResult<&'a Value> {
		self.values
			.get(name)
			.ok_or_else(|| FactoryError::FieldNotFound {
				factory: self.factory.to_string(),
				field: name.to_string(),
			})
	}

	pub fn sequence(&self) -> u64 {
		self.sequence
	}
}

/// Arguments of a post-generation hook.
pub struct PostGenerationContext<'a> {
	/// The generated instance.
	pub instance: &'a Instance,
	/// `true` under the create strategy.
	pub create: bool,
	/// Value passed for the hook's name at call time, if any.
	pub extracted: Option<&'a Value>,
	/// `name__key` overrides addressed to the hook.
	pub kwargs: &'a Kwargs,
	pub step: BuildStep,
}

struct AutoTarget {
	model: RelatedModel,
	exclude: BTreeSet<String>,
	extra: Vec<(String, Declaration)>,
	factory: OnceCell<Arc<ModelFactory>>,
}

/// Factory referenced by a sub-factory or related factory: either given
/// up front, or an auto-factory built on first use.
#[derive(Clone)]
enum FactoryTarget {
	Factory(Arc<ModelFactory>),
	Auto(Arc<AutoTarget>),
}

impl FactoryTarget {
	fn auto(
		model: RelatedModel,
		exclude: BTreeSet<String>,
		extra: Vec<(String, Declaration)>,
	) -> Self {
		FactoryTarget::Auto(Arc::new(AutoTarget {
			model,
			exclude,
			extra,
			factory: OnceCell::new(),
		}))
	}

	fn factory(&self) -> FactoryResult<Arc<ModelFactory>> {
		match self {
			FactoryTarget::Factory(factory) => Ok(Arc::clone(factory)),
			FactoryTarget::Auto(target) => target
				.factory
				.get_or_try_init(|| {
					let model = target.model.resolve()?;
					ModelFactory::auto_factory(
						model,
						target.exclude.iter().cloned(),
						target.extra.clone(),
					)
					.map(Arc::new)
				})
				.map(Arc::clone),
		}
	}

	fn describe(&self) -> String {
		match self {
			FactoryTarget::Factory(factory) => factory.name().to_string(),
			FactoryTarget::Auto(target) => format!("auto({})", target.model.label()),
		}
	}
}

/// Related instance generated before its owner.
///
/// The sub-factory uses the owner's strategy: a built owner gets a built
/// related instance, a created owner a created one.
#[derive(Clone)]
pub struct SubFactory {
	target: FactoryTarget,
}

impl SubFactory {
	pub fn new(factory: ModelFactory) -> Self {
		Self {
			target: FactoryTarget::Factory(Arc::new(factory)),
		}
	}

	/// Sub-factory over an auto-factory of `model`, built on first use.
	pub fn auto(model: impl Into<RelatedModel>, exclude: impl IntoIterator<Item = String>) -> Self {
		Self {
			target: FactoryTarget::auto(model.into(), exclude.into_iter().collect(), Vec::new()),
		}
	}

	/// The factory generating the related instance.
	pub fn factory(&self) -> FactoryResult<Arc<ModelFactory>> {
		self.target.factory()
	}
}

impl fmt::Debug for SubFactory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.target.describe())
	}
}

/// Instance generated after its owner, receiving the owner under
/// `related_name`.
#[derive(Clone)]
pub struct RelatedFactory {
	target: FactoryTarget,
	related_name: String,
	defaults: Kwargs,
}

impl RelatedFactory {
	pub fn new(factory: ModelFactory, related_name: impl Into<String>) -> Self {
		Self {
			target: FactoryTarget::Factory(Arc::new(factory)),
			related_name: related_name.into(),
			defaults: Kwargs::new(),
		}
	}

	/// Related factory over an auto-factory of `model` with the extra
	/// declarations `extra`, built on first use.
	pub fn auto(
		model: impl Into<RelatedModel>,
		extra: Vec<(String, Declaration)>,
		related_name: impl Into<String>,
	) -> Self {
		Self {
			target: FactoryTarget::auto(model.into(), BTreeSet::new(), extra),
			related_name: related_name.into(),
			defaults: Kwargs::new(),
		}
	}

	/// Values passed to the related factory on every call.
	pub fn with_defaults(mut self, defaults: Kwargs) -> Self {
		self.defaults = defaults;
		self
	}

	pub fn related_name(&self) -> &str {
		&self.related_name
	}

	pub fn defaults(&self) -> &Kwargs {
		&self.defaults
	}

	pub fn factory(&self) -> FactoryResult<Arc<ModelFactory>> {
		self.target.factory()
	}
}

impl fmt::Debug for RelatedFactory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} -> {}", self.target.describe(), self.related_name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::kwargs;
	use rand::SeedableRng;
	use reinhardt_fuzzy::FuzzyInteger;
	use rstest::rstest;

	#[rstest]
	fn test_fuzzy_declaration_converts_output() {
		let declaration = Declaration::fuzzy(FuzzyInteger::new(3, 3).unwrap());
		let Declaration::Fuzzy(generate) = declaration else {
			panic!("expected fuzzy declaration");
		};
		let mut rng = StdRng::seed_from_u64(0);
		assert_eq!(generate(&mut rng), Value::Int(3));
	}

	#[rstest]
	fn test_post_generation_kinds() {
		assert!(Declaration::post_generation(|_ctx| Ok(None)).is_post_generation());
		assert!(!Declaration::value(1i64).is_post_generation());
		assert!(!Declaration::sequence(|n| Value::from(n as i64)).is_post_generation());
	}

	#[rstest]
	fn test_resolver_reports_missing_field() {
		let values = kwargs! { "a" => 1i64 };
		let resolver = Resolver::new("ThingFactory", &values, 4);
		assert_eq!(resolver.get("a").unwrap(), &Value::Int(1));
		assert_eq!(resolver.sequence(), 4);
		let error = resolver.get("b").unwrap_err();
		assert_eq!(error.to_string(), "Field 'b' not found in factory ThingFactory");
	}

	#[rstest]
	fn test_unresolvable_auto_target() {
		let sub = SubFactory::auto("declarationtests.Missing", Vec::new());
		assert!(matches!(
			sub.factory(),
			Err(FactoryError::Orm(crate::orm::OrmError::ModelNotRegistered(_)))
		));
	}

	#[rstest]
	fn test_debug_names_declaration_kind() {
		assert_eq!(format!("{:?}", Declaration::value(1i64)), "Value(Int(1))");
		assert_eq!(
			format!("{:?}", Declaration::lazy(|_r| Ok(Value::Null))),
			"Lazy"
		);
		assert_eq!(
			format!("{:?}", SubFactory::auto("app.Target", Vec::new())),
			"auto(app.Target)"
		);
	}
}
