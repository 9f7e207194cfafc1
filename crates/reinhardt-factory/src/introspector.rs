//! Field introspection.
//!
//! The [`Introspector`] decides which fields of a model need a generated
//! value and maps each of them to a [`Declaration`] through an ordered
//! [`RuleTable`]. The first rule whose predicate accepts the field wins;
//! fields declaring `choices` bypass the table entirely.

pub mod rules;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::declarations::Declaration;
use crate::error::{FactoryError, FactoryResult};
use crate::orm::{Field, FieldKind, Model, ModelRef};
use crate::value::Value;

/// Everything a rule needs to know about the field being populated.
#[derive(Clone, Copy)]
pub struct FieldContext<'a> {
	pub model: &'a ModelRef,
	/// `None` when `field_name` does not resolve on the model.
	pub field: Option<&'a Field>,
	pub field_name: &'a str,
	/// Fields excluded from auto-generation; forwarded to related
	/// auto-factories.
	pub skips: &'a BTreeSet<String>,
}

impl<'a> FieldContext<'a> {
	/// The resolved field, or a lookup error naming the model.
	pub fn require_field(&self) -> FactoryResult<&'a Field> {
		self.field.ok_or_else(|| FactoryError::FieldNotFound {
			factory: self.model.label(),
			field: self.field_name.to_string(),
		})
	}
}

/// Predicate selecting the fields a rule applies to.
pub type FieldPredicate = Arc<dyn Fn(&Field) -> bool + Send + Sync>;

/// Builds the declaration for an accepted field.
pub type DeclarationBuilder =
	Arc<dyn Fn(&FieldContext<'_>) -> FactoryResult<Declaration> + Send + Sync>;

/// One entry of a [`RuleTable`].
#[derive(Clone)]
pub struct Rule {
	name: String,
	predicate: FieldPredicate,
	builder: DeclarationBuilder,
}

impl Rule {
	pub fn new<P, B>(name: impl Into<String>, predicate: P, builder: B) -> Self
	where
		P: Fn(&Field) -> bool + Send + Sync + 'static,
		B: Fn(&FieldContext<'_>) -> FactoryResult<Declaration> + Send + Sync + 'static,
	{
		Self {
			name: name.into(),
			predicate: Arc::new(predicate),
			builder: Arc::new(builder),
		}
	}

	/// Rule matching exactly one field kind.
	pub fn for_kind<B>(kind: FieldKind, builder: B) -> Self
	where
		B: Fn(&FieldContext<'_>) -> FactoryResult<Declaration> + Send + Sync + 'static,
	{
		let name = kind.class_name();
		Self::new(name, move |field: &Field| field.kind == kind, builder)
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn matches(&self, field: &Field) -> bool {
		(self.predicate)(field)
	}

	pub fn build(&self, ctx: &FieldContext<'_>) -> FactoryResult<Declaration> {
		(self.builder)(ctx)
	}
}

impl fmt::Debug for Rule {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Rule").field(&self.name).finish()
	}
}

/// Ordered list of rules; the first match wins.
#[derive(Debug, Clone)]
pub struct RuleTable {
	rules: Vec<Rule>,
}

impl RuleTable {
	/// A table without any rule.
	pub fn empty() -> Self {
		Self { rules: Vec::new() }
	}

	/// Adds a rule with the lowest priority.
	pub fn push(&mut self, rule: Rule) {
		self.rules.push(rule);
	}

	/// Adds a rule with the highest priority.
	pub fn prepend(&mut self, rule: Rule) {
		self.rules.insert(0, rule);
	}

	/// First rule accepting `field`.
	pub fn find(&self, field: &Field) -> Option<&Rule> {
		self.rules.iter().find(|rule| rule.matches(field))
	}

	pub fn len(&self) -> usize {
		self.rules.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rules.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &Rule> {
		self.rules.iter()
	}
}

impl Default for RuleTable {
	fn default() -> Self {
		Self {
			rules: rules::default_rules(),
		}
	}
}

/// Maps model fields to declarations.
///
/// # Examples
///
/// ```
/// use reinhardt_factory::Introspector;
/// use reinhardt_factory::orm::{Field, Model};
///
/// let model = Model::builder("docs", "Optional")
///     .field(Field::char("req", 10))
///     .field(Field::char("opt", 3).with_blank())
///     .build();
///
/// let introspector = Introspector::default();
/// assert_eq!(introspector.default_field_names(&model), vec!["req".to_string()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Introspector {
	rules: RuleTable,
}

impl Introspector {
	pub fn new(rules: RuleTable) -> Self {
		Self { rules }
	}

	pub fn rules(&self) -> &RuleTable {
		&self.rules
	}

	pub fn rules_mut(&mut self) -> &mut RuleTable {
		&mut self.rules
	}

	/// Names of the fields needing a generated value, in model order.
	pub fn default_field_names(&self, model: &Model) -> Vec<String> {
		model
			.fields()
			.iter()
			.filter(|field| is_default_field(field))
			.map(|field| field.name.clone())
			.collect()
	}

	pub fn field_by_name<'m>(&self, model: &'m Model, name: &str) -> Option<&'m Field> {
		model.get_field(name)
	}

	/// Declaration populating the context's field.
	///
	/// Returns `None` when the field is unknown, or when no rule accepts a
	/// non-nullable field. Nullable fields without a rule are set to null.
	pub fn build_declaration(&self, ctx: &FieldContext<'_>) -> FactoryResult<Option<Declaration>> {
		let Some(field) = ctx.field else {
			return Ok(None);
		};
		if !field.choices.is_empty() {
			return rules::build_choices(ctx).map(Some);
		}
		if let Some(rule) = self.rules.find(field) {
			return rule.build(ctx).map(Some);
		}
		if field.null {
			return Ok(Some(Declaration::value(Value::Null)));
		}
		tracing::warn!(
			model = %ctx.model.label(),
			field = %field.name,
			kind = %field.kind,
			"no rule can populate field"
		);
		Ok(None)
	}
}

/// Whether `field` has to be populated by an auto-factory.
///
/// Framework-created fields, generic relations and auto-incremented keys
/// never are, nor are fields without a column other than many-to-many
/// relations. Other fields are when they are required.
pub fn is_default_field(field: &Field) -> bool {
	if field.auto_created {
		return false;
	}
	if field.is_relation() && field.related_model.is_none() {
		return false;
	}
	// Many-to-many relations have no column but are filled after saving.
	if !field.concrete && field.kind != FieldKind::ManyToMany {
		return false;
	}
	if matches!(
		field.kind,
		FieldKind::Auto | FieldKind::BigAuto | FieldKind::OrderWrt
	) {
		return false;
	}
	is_required_field(field)
}

/// Whether saving an instance that leaves `field` at its default would fail
/// validation.
pub fn is_required_field(field: &Field) -> bool {
	if field.has_default() {
		return false;
	}
	let default = field.get_default();
	if !field.blank {
		return default.is_empty_value();
	}
	!field.null && default.is_null()
}
