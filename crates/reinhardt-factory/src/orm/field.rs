//! Field metadata.
//!
//! Mirrors the attributes the ORM exposes on its field instances (`null`,
//! `blank`, `default`, `choices`, relation targets, ...). A factory only
//! reads these attributes; it never touches storage.

use std::fmt;
use std::sync::Arc;

use super::error::{OrmError, OrmResult};
use super::model::{Model, ModelRef};
use super::registry;
use crate::value::Value;

/// Concrete field class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
	Auto,
	BigAuto,
	Integer,
	PositiveInteger,
	BigInteger,
	PositiveSmallInteger,
	SmallInteger,
	Decimal,
	Float,
	Char,
	Text,
	Slug,
	Email,
	Url,
	GenericIpAddress,
	Binary,
	Boolean,
	NullBoolean,
	File,
	Image,
	Uuid,
	Date,
	DateTime,
	Time,
	Duration,
	ForeignKey,
	OneToOne,
	ManyToMany,
	/// Generic relation: a relation without a fixed target model.
	GenericForeignKey,
	/// Hidden ordering column added by `order_with_respect_to`.
	OrderWrt,
	/// Field class provided by a third-party application.
	Custom(String),
}

impl FieldKind {
	/// Whether this kind points at another model.
	pub fn is_relation(&self) -> bool {
		matches!(
			self,
			FieldKind::ForeignKey
				| FieldKind::OneToOne
				| FieldKind::ManyToMany
				| FieldKind::GenericForeignKey
		)
	}

	/// Whether the empty string is a valid stored value for this kind.
	pub fn empty_strings_allowed(&self) -> bool {
		matches!(
			self,
			FieldKind::Char
				| FieldKind::Text
				| FieldKind::Slug
				| FieldKind::Email
				| FieldKind::Url
				| FieldKind::File
				| FieldKind::Image
				| FieldKind::Binary
		)
	}

	/// Class name, e.g. `"CharField"`.
	pub fn class_name(&self) -> String {
		let name = match self {
			FieldKind::Auto => "AutoField",
			FieldKind::BigAuto => "BigAutoField",
			FieldKind::Integer => "IntegerField",
			FieldKind::PositiveInteger => "PositiveIntegerField",
			FieldKind::BigInteger => "BigIntegerField",
			FieldKind::PositiveSmallInteger => "PositiveSmallIntegerField",
			FieldKind::SmallInteger => "SmallIntegerField",
			FieldKind::Decimal => "DecimalField",
			FieldKind::Float => "FloatField",
			FieldKind::Char => "CharField",
			FieldKind::Text => "TextField",
			FieldKind::Slug => "SlugField",
			FieldKind::Email => "EmailField",
			FieldKind::Url => "URLField",
			FieldKind::GenericIpAddress => "GenericIPAddressField",
			FieldKind::Binary => "BinaryField",
			FieldKind::Boolean => "BooleanField",
			FieldKind::NullBoolean => "NullBooleanField",
			FieldKind::File => "FileField",
			FieldKind::Image => "ImageField",
			FieldKind::Uuid => "UUIDField",
			FieldKind::Date => "DateField",
			FieldKind::DateTime => "DateTimeField",
			FieldKind::Time => "TimeField",
			FieldKind::Duration => "DurationField",
			FieldKind::ForeignKey => "ForeignKey",
			FieldKind::OneToOne => "OneToOneField",
			FieldKind::ManyToMany => "ManyToManyField",
			FieldKind::GenericForeignKey => "GenericForeignKey",
			FieldKind::OrderWrt => "OrderWrt",
			FieldKind::Custom(name) => return name.clone(),
		};
		name.to_string()
	}
}

impl fmt::Display for FieldKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.class_name())
	}
}

/// Accepted address families of a `GenericIPAddressField`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IpProtocol {
	#[default]
	Both,
	Ipv4,
	Ipv6,
}

/// Target of a relation field.
///
/// Targets may be given as a model or as an `"app_label.ModelName"` label;
/// labels are resolved through the model registry when first needed, which
/// allows self references and forward references.
#[derive(Clone)]
pub enum RelatedModel {
	Model(ModelRef),
	Label(String),
}

impl RelatedModel {
	/// Resolves the target model.
	pub fn resolve(&self) -> OrmResult<ModelRef> {
		match self {
			RelatedModel::Model(model) => Ok(Arc::clone(model)),
			RelatedModel::Label(label) => registry::get_model_by_label(label)
				.ok_or_else(|| OrmError::ModelNotRegistered(label.clone())),
		}
	}

	/// Label of the target model.
	pub fn label(&self) -> String {
		match self {
			RelatedModel::Model(model) => model.label(),
			RelatedModel::Label(label) => label.clone(),
		}
	}
}

impl fmt::Debug for RelatedModel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "RelatedModel({})", self.label())
	}
}

impl From<ModelRef> for RelatedModel {
	fn from(model: ModelRef) -> Self {
		RelatedModel::Model(model)
	}
}

impl From<&ModelRef> for RelatedModel {
	fn from(model: &ModelRef) -> Self {
		RelatedModel::Model(Arc::clone(model))
	}
}

impl From<&str> for RelatedModel {
	fn from(label: &str) -> Self {
		RelatedModel::Label(label.to_string())
	}
}

impl From<String> for RelatedModel {
	fn from(label: String) -> Self {
		RelatedModel::Label(label)
	}
}

/// Metadata of a single model field.
///
/// # Examples
///
/// ```
/// use reinhardt_factory::orm::{Field, FieldKind};
///
/// let field = Field::char("title", 50).with_blank();
/// assert_eq!(field.kind, FieldKind::Char);
/// assert_eq!(field.max_length, Some(50));
/// assert!(field.blank);
/// assert!(!field.null);
/// ```
#[derive(Debug, Clone)]
pub struct Field {
	pub name: String,
	pub kind: FieldKind,
	pub null: bool,
	pub blank: bool,
	pub default: Option<Value>,
	/// `(stored value, human readable label)` pairs.
	pub choices: Vec<(Value, String)>,
	pub max_length: Option<usize>,
	pub max_digits: Option<u32>,
	pub decimal_places: Option<u32>,
	pub protocol: IpProtocol,
	pub primary_key: bool,
	pub unique: bool,
	/// Created by the framework rather than declared (implicit `id`, reverse accessors).
	pub auto_created: bool,
	/// Backed by a column of its own table.
	pub concrete: bool,
	pub related_model: Option<RelatedModel>,
	/// Intermediate model of a many-to-many relation.
	pub through: Option<RelatedModel>,
	through_field: Option<String>,
}

impl Field {
	/// Creates a concrete field with no options set.
	pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
		Self {
			name: name.into(),
			kind,
			null: false,
			blank: false,
			default: None,
			choices: Vec::new(),
			max_length: None,
			max_digits: None,
			decimal_places: None,
			protocol: IpProtocol::Both,
			primary_key: false,
			unique: false,
			auto_created: false,
			concrete: true,
			related_model: None,
			through: None,
			through_field: None,
		}
	}

	/// `CharField(max_length=...)`.
	pub fn char(name: impl Into<String>, max_length: usize) -> Self {
		Self::new(name, FieldKind::Char).with_max_length(max_length)
	}

	/// `SlugField()`, 50 characters by default.
	pub fn slug(name: impl Into<String>) -> Self {
		Self::new(name, FieldKind::Slug).with_max_length(50)
	}

	/// `EmailField()`.
	pub fn email(name: impl Into<String>) -> Self {
		Self::new(name, FieldKind::Email).with_max_length(254)
	}

	/// `URLField()`.
	pub fn url(name: impl Into<String>) -> Self {
		Self::new(name, FieldKind::Url).with_max_length(200)
	}

	/// `DecimalField(max_digits=..., decimal_places=...)`.
	pub fn decimal(name: impl Into<String>, max_digits: u32, decimal_places: u32) -> Self {
		let mut field = Self::new(name, FieldKind::Decimal);
		field.max_digits = Some(max_digits);
		field.decimal_places = Some(decimal_places);
		field
	}

	/// `GenericIPAddressField(protocol=...)`.
	pub fn ip_address(name: impl Into<String>, protocol: IpProtocol) -> Self {
		let mut field = Self::new(name, FieldKind::GenericIpAddress);
		field.protocol = protocol;
		field
	}

	/// `ForeignKey(to)`.
	pub fn foreign_key(name: impl Into<String>, to: impl Into<RelatedModel>) -> Self {
		Self::relation(name, FieldKind::ForeignKey, to.into())
	}

	/// `OneToOneField(to)`. One-to-one relations are unique.
	pub fn one_to_one(name: impl Into<String>, to: impl Into<RelatedModel>) -> Self {
		Self::relation(name, FieldKind::OneToOne, to.into()).with_unique()
	}

	/// `ManyToManyField(to)`. Many-to-many relations have no column.
	pub fn many_to_many(name: impl Into<String>, to: impl Into<RelatedModel>) -> Self {
		let mut field = Self::relation(name, FieldKind::ManyToMany, to.into());
		field.concrete = false;
		field
	}

	/// `GenericForeignKey()`: a virtual relation without a target model.
	pub fn generic_foreign_key(name: impl Into<String>) -> Self {
		let mut field = Self::new(name, FieldKind::GenericForeignKey);
		field.concrete = false;
		field
	}

	fn relation(name: impl Into<String>, kind: FieldKind, to: RelatedModel) -> Self {
		let mut field = Self::new(name, kind);
		field.related_model = Some(to);
		field
	}

	pub fn with_null(mut self) -> Self {
		self.null = true;
		self
	}

	pub fn with_blank(mut self) -> Self {
		self.blank = true;
		self
	}

	pub fn with_default(mut self, default: impl Into<Value>) -> Self {
		self.default = Some(default.into());
		self
	}

	pub fn with_choices<V, L>(mut self, choices: impl IntoIterator<Item = (V, L)>) -> Self
	where
		V: Into<Value>,
		L: Into<String>,
	{
		self.choices = choices
			.into_iter()
			.map(|(value, label)| (value.into(), label.into()))
			.collect();
		self
	}

	pub fn with_max_length(mut self, max_length: usize) -> Self {
		self.max_length = Some(max_length);
		self
	}

	pub fn with_primary_key(mut self) -> Self {
		self.primary_key = true;
		self.unique = true;
		self
	}

	pub fn with_unique(mut self) -> Self {
		self.unique = true;
		self
	}

	pub fn with_auto_created(mut self) -> Self {
		self.auto_created = true;
		self
	}

	pub fn with_concrete(mut self, concrete: bool) -> Self {
		self.concrete = concrete;
		self
	}

	/// Routes a many-to-many relation through an explicit intermediate model.
	///
	/// `through_field` names the foreign key on the intermediate model that
	/// points back at the owner; when omitted it is inferred from the
	/// intermediate model's fields.
	pub fn with_through(
		mut self,
		through: impl Into<RelatedModel>,
		through_field: Option<&str>,
	) -> Self {
		self.through = Some(through.into());
		self.through_field = through_field.map(str::to_string);
		self
	}

	/// Whether this field points at another model.
	pub fn is_relation(&self) -> bool {
		self.kind.is_relation()
	}

	/// Whether a default was declared on the field.
	pub fn has_default(&self) -> bool {
		self.default.is_some()
	}

	/// Value a new instance receives when none is given.
	///
	/// Fields without a declared default fall back to `""` when the kind
	/// accepts empty strings and the column is not nullable, and to null
	/// otherwise.
	pub fn get_default(&self) -> Value {
		match &self.default {
			Some(default) => default.clone(),
			None if self.kind.empty_strings_allowed() && !self.null => Value::Text(String::new()),
			None => Value::Null,
		}
	}

	/// Name of the foreign key on the intermediate model that points at
	/// `owner`.
	pub fn m2m_field_name(&self, owner: &Model) -> OrmResult<Option<String>> {
		if let Some(name) = &self.through_field {
			return Ok(Some(name.clone()));
		}
		let Some(through) = &self.through else {
			return Ok(None);
		};
		let through = through.resolve()?;
		let owner_label = owner.label();
		Ok(through
			.fields()
			.iter()
			.find(|field| {
				field.kind == FieldKind::ForeignKey
					&& field
						.related_model
						.as_ref()
						.is_some_and(|related| related.label() == owner_label)
			})
			.map(|field| field.name.clone()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(Field::char("name", 10), Value::Text(String::new()))]
	#[case(Field::char("name", 10).with_null(), Value::Null)]
	#[case(Field::new("count", FieldKind::Integer), Value::Null)]
	#[case(Field::new("count", FieldKind::Integer).with_default(3i64), Value::Int(3))]
	#[case(Field::new("body", FieldKind::Text), Value::Text(String::new()))]
	fn test_get_default(#[case] field: Field, #[case] expected: Value) {
		assert_eq!(field.get_default(), expected);
	}

	#[rstest]
	fn test_relation_kinds() {
		assert!(FieldKind::ForeignKey.is_relation());
		assert!(FieldKind::GenericForeignKey.is_relation());
		assert!(!FieldKind::Char.is_relation());
	}

	#[rstest]
	fn test_many_to_many_is_not_concrete() {
		let field = Field::many_to_many("tags", "app.Tag");
		assert!(!field.concrete);
		assert_eq!(field.related_model.map(|r| r.label()), Some("app.Tag".to_string()));
	}

	#[rstest]
	fn test_one_to_one_is_unique() {
		assert!(Field::one_to_one("owner", "app.Owner").unique);
	}

	#[rstest]
	fn test_class_name() {
		assert_eq!(FieldKind::GenericIpAddress.to_string(), "GenericIPAddressField");
		assert_eq!(FieldKind::Custom("MoneyField".to_string()).to_string(), "MoneyField");
	}

	#[rstest]
	fn test_explicit_through_field_name() {
		let owner = Model::builder("tests", "Owner").build();
		let field = Field::many_to_many("members", "tests.Member")
			.with_through("tests.Membership", Some("group"));
		assert_eq!(field.m2m_field_name(&owner), Ok(Some("group".to_string())));
	}

	#[rstest]
	fn test_inferred_through_field_name() {
		let owner = Model::builder("fieldtests", "Group").build();
		let member = Model::builder("fieldtests", "Member").build();
		let membership = Model::builder("fieldtests", "Membership")
			.field(Field::foreign_key("person", &member))
			.field(Field::foreign_key("team", &owner))
			.build();
		let field = Field::many_to_many("members", &member).with_through(&membership, None);
		assert_eq!(field.m2m_field_name(&owner), Ok(Some("team".to_string())));
	}
}
