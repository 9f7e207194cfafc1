//! Default declaration builders, one per field kind.

use std::collections::BTreeSet;

use chrono::Utc;
use reinhardt_fuzzy::fuzzy::{ASCII_LETTERS, DIGITS};
use reinhardt_fuzzy::{
	FakerProvider, FuzzyBytes, FuzzyChoice, FuzzyDate, FuzzyDateTime, FuzzyDecimal, FuzzyFloat,
	FuzzyInteger, FuzzyNaiveDateTime, FuzzyText, FuzzyTime,
};

use super::{FieldContext, Rule, is_default_field};
use crate::attachments::{FileField, ImageField};
use crate::declarations::{Declaration, PostGenerationContext, RelatedFactory, SubFactory};
use crate::error::{FactoryError, FactoryResult};
use crate::orm::{Field, FieldKind, IpProtocol, ModelRef};
use crate::settings::settings;
use crate::value::Value;

/// Length of generated `TextField` content.
pub const TEXT_LENGTH: usize = 3000;

/// Field-name fragments selecting a faker provider for char fields, checked
/// in order.
const CHAR_FAKER_RULES: &[(FakerProvider, &[&str])] = &[
	(FakerProvider::FirstName, &["firstname", "first_name"]),
	(FakerProvider::LastName, &["lastname", "last_name"]),
	(FakerProvider::Email, &["email"]),
	(FakerProvider::Zipcode, &["zip", "zipcode", "postcode"]),
];

/// The rule table used by [`Introspector::default`](super::Introspector).
pub fn default_rules() -> Vec<Rule> {
	let integer = |kind: FieldKind, low: i64, high: i64| {
		Rule::for_kind(kind, move |_ctx| {
			Ok(Declaration::fuzzy(FuzzyInteger::new(low, high)?))
		})
	};

	vec![
		// Integers
		integer(FieldKind::Integer, -1000, 1000),
		integer(FieldKind::PositiveInteger, 0, 10_000_000),
		integer(FieldKind::BigInteger, i64::MIN, i64::MAX),
		integer(FieldKind::PositiveSmallInteger, 0, 32767),
		integer(FieldKind::SmallInteger, -32768, 32767),
		Rule::for_kind(FieldKind::Decimal, build_decimal),
		Rule::for_kind(FieldKind::Float, |_ctx| {
			Ok(Declaration::fuzzy(FuzzyFloat::new(-1e50, 1e50)?))
		}),
		// Text
		Rule::for_kind(FieldKind::Char, build_char),
		Rule::for_kind(FieldKind::Text, |_ctx| {
			let chars = format!("{ASCII_LETTERS} .,?!\n");
			Ok(Declaration::fuzzy(
				FuzzyText::new().with_length(TEXT_LENGTH).with_chars(&chars)?,
			))
		}),
		Rule::for_kind(FieldKind::Slug, |ctx| {
			let chars = format!("{ASCII_LETTERS}{DIGITS}-_");
			Ok(Declaration::fuzzy(text_for(ctx)?.with_chars(&chars)?))
		}),
		// Internet
		Rule::for_kind(FieldKind::Email, |_ctx| Ok(Declaration::faker(FakerProvider::Email))),
		Rule::for_kind(FieldKind::Url, |_ctx| Ok(Declaration::faker(FakerProvider::Url))),
		Rule::for_kind(FieldKind::GenericIpAddress, |ctx| {
			let provider = match ctx.require_field()?.protocol {
				IpProtocol::Ipv4 => FakerProvider::Ipv4,
				IpProtocol::Ipv6 | IpProtocol::Both => FakerProvider::Ipv6,
			};
			Ok(Declaration::faker(provider))
		}),
		// Misc
		Rule::for_kind(FieldKind::Binary, |_ctx| Ok(Declaration::fuzzy(FuzzyBytes::new()))),
		Rule::for_kind(FieldKind::Boolean, |_ctx| {
			Ok(Declaration::fuzzy(FuzzyChoice::new([true, false])?))
		}),
		Rule::for_kind(FieldKind::NullBoolean, |_ctx| {
			Ok(Declaration::fuzzy(FuzzyChoice::new([
				Value::Null,
				Value::Bool(true),
				Value::Bool(false),
			])?))
		}),
		Rule::for_kind(FieldKind::File, |_ctx| Ok(Declaration::attachment(FileField::new()))),
		Rule::for_kind(FieldKind::Image, |_ctx| Ok(Declaration::attachment(ImageField::new()))),
		Rule::for_kind(FieldKind::Uuid, |_ctx| Ok(Declaration::faker(FakerProvider::Uuid4))),
		// Date / Time
		Rule::for_kind(FieldKind::Date, |_ctx| Ok(Declaration::fuzzy(FuzzyDate::default()))),
		Rule::for_kind(FieldKind::DateTime, build_datetime),
		Rule::for_kind(FieldKind::Time, |_ctx| Ok(Declaration::fuzzy(FuzzyTime::new()))),
		Rule::for_kind(FieldKind::Duration, |_ctx| {
			Ok(Declaration::faker(FakerProvider::TimeDelta))
		}),
		// Relational
		Rule::for_kind(FieldKind::ForeignKey, build_foreign_key),
		Rule::for_kind(FieldKind::OneToOne, build_foreign_key),
		Rule::for_kind(FieldKind::ManyToMany, build_many_to_many),
	]
}

fn text_for(ctx: &FieldContext<'_>) -> FactoryResult<FuzzyText> {
	let field = ctx.require_field()?;
	Ok(match field.max_length {
		Some(length) => FuzzyText::new().with_length(length),
		None => FuzzyText::new(),
	})
}

/// Uniform choice over the keys of the field's `choices`.
pub fn build_choices(ctx: &FieldContext<'_>) -> FactoryResult<Declaration> {
	let field = ctx.require_field()?;
	let keys = field.choices.iter().map(|(key, _label)| key.clone());
	Ok(Declaration::fuzzy(FuzzyChoice::new(keys)?))
}

/// Realistic data when the field name suggests it, random text of
/// `max_length` otherwise.
pub fn build_char(ctx: &FieldContext<'_>) -> FactoryResult<Declaration> {
	for (provider, fragments) in CHAR_FAKER_RULES {
		if fragments.iter().any(|fragment| ctx.field_name.contains(fragment)) {
			return Ok(Declaration::faker(*provider));
		}
	}
	Ok(Declaration::fuzzy(text_for(ctx)?))
}

/// Decimal within the digits the column can store.
pub fn build_decimal(ctx: &FieldContext<'_>) -> FactoryResult<Declaration> {
	let field = ctx.require_field()?;
	let (Some(max_digits), Some(decimal_places)) = (field.max_digits, field.decimal_places) else {
		return Err(FactoryError::Configuration(format!(
			"DecimalField '{}' on {} requires max_digits and decimal_places",
			field.name,
			ctx.model.label()
		)));
	};
	Ok(Declaration::fuzzy(FuzzyDecimal::for_digits(
		max_digits,
		decimal_places,
	)?))
}

/// Datetime between now and generation time, aware or naive depending on
/// `use_tz`.
pub fn build_datetime(_ctx: &FieldContext<'_>) -> FactoryResult<Declaration> {
	let now = Utc::now();
	if settings().use_tz {
		Ok(Declaration::fuzzy(FuzzyDateTime::new(now)))
	} else {
		Ok(Declaration::fuzzy(FuzzyNaiveDateTime::new(now.naive_utc())))
	}
}

/// Sub-factory over an auto-factory of the related model.
///
/// A nullable relation whose target leads back to the owner is left null.
/// A relation closing a cycle of non-nullable relations cannot be generated.
pub fn build_foreign_key(ctx: &FieldContext<'_>) -> FactoryResult<Declaration> {
	let field = ctx.require_field()?;
	let related = related_model(ctx, field)?;
	let owner = ctx.model.label();

	if let Ok(target) = related.resolve() {
		if field.null && leads_to(&target, &owner, ctx.skips, false) {
			tracing::debug!(
				model = %owner,
				field = %field.name,
				"nullable relation closes a cycle, leaving it null"
			);
			return Ok(Declaration::value(Value::Null));
		}
		if !field.null && leads_to(&target, &owner, ctx.skips, true) {
			return Err(FactoryError::Configuration(format!(
				"Field '{}' on {}: required relations form a cycle through {}",
				field.name,
				owner,
				target.label()
			)));
		}
	}

	Ok(Declaration::SubFactory(SubFactory::auto(
		related.clone(),
		ctx.skips.iter().cloned(),
	)))
}

/// Related rows attached once the owner exists.
///
/// Without an intermediate model, a batch of related rows is created after
/// the owner and added through the relation; nothing happens when the owner
/// is only built. With an intermediate model, one intermediate row is
/// generated pointing at the owner.
pub fn build_many_to_many(ctx: &FieldContext<'_>) -> FactoryResult<Declaration> {
	let field = ctx.require_field()?;
	let related = related_model(ctx, field)?.clone();

	if let Some(through) = &field.through {
		let Some(owner_field) = field.m2m_field_name(ctx.model)? else {
			return Err(FactoryError::Configuration(format!(
				"No foreign key to {} found on {} for field '{}'",
				ctx.model.label(),
				through.label(),
				field.name
			)));
		};
		let extra = vec![(owner_field.clone(), Declaration::value(Value::Null))];
		return Ok(Declaration::RelatedFactory(RelatedFactory::auto(
			through.clone(),
			extra,
			owner_field,
		)));
	}

	// Rows created by the hook must not run the hooks leading back here.
	let mut exclude = BTreeSet::new();
	if let Ok(target) = related.resolve()
		&& let Some(names) = many_to_many_cycle(&target, &ctx.model.label(), ctx.skips)
	{
		tracing::debug!(
			model = %ctx.model.label(),
			field = %field.name,
			excluded = ?names,
			"many-to-many relation closes a cycle"
		);
		exclude = names;
	}

	let field_name = field.name.clone();
	let related_factory = SubFactory::auto(related, exclude);
	Ok(Declaration::post_generation(
		move |hook: &PostGenerationContext<'_>| {
			if !hook.create {
				return Ok(None);
			}
			let factory = related_factory.factory()?;
			let relation = hook.instance.related(&field_name)?;
			let related = factory.create_batch(settings().related_batch_size)?;
			for instance in &related {
				relation.add(instance)?;
			}
			Ok(Some(Value::List(
				related.into_iter().map(Value::Instance).collect(),
			)))
		},
	))
}

fn related_model<'f>(
	ctx: &FieldContext<'_>,
	field: &'f Field,
) -> FactoryResult<&'f crate::orm::RelatedModel> {
	field.related_model.as_ref().ok_or_else(|| {
		FactoryError::Configuration(format!(
			"Relation '{}' on {} has no target model",
			field.name,
			ctx.model.label()
		))
	})
}

/// Whether generating `start` would generate an `owner` again through the
/// relations an auto-factory populates. With `required_only`, nullable
/// relations are not followed.
fn leads_to(start: &ModelRef, owner: &str, skips: &BTreeSet<String>, required_only: bool) -> bool {
	let mut visited = BTreeSet::new();
	let mut pending = vec![ModelRef::clone(start)];
	while let Some(model) = pending.pop() {
		let label = model.label();
		if label == owner {
			return true;
		}
		if !visited.insert(label) {
			continue;
		}
		for field in model.fields() {
			if !matches!(field.kind, FieldKind::ForeignKey | FieldKind::OneToOne)
				|| !is_default_field(field)
				|| skips.contains(&field.name)
				|| (required_only && field.null)
			{
				continue;
			}
			if let Some(related) = &field.related_model
				&& let Ok(target) = related.resolve()
			{
				pending.push(target);
			}
		}
	}
	false
}

/// When generating `start` can generate an `owner` again, the names of the
/// many-to-many fields (without an intermediate model) on every model
/// reachable from `start`. Every populated relation is followed.
fn many_to_many_cycle(
	start: &ModelRef,
	owner: &str,
	skips: &BTreeSet<String>,
) -> Option<BTreeSet<String>> {
	let mut visited = BTreeSet::new();
	let mut names = BTreeSet::new();
	let mut found = false;
	let mut pending = vec![ModelRef::clone(start)];
	while let Some(model) = pending.pop() {
		let label = model.label();
		found |= label == owner;
		if !visited.insert(label) {
			continue;
		}
		for field in model.fields() {
			if !matches!(
				field.kind,
				FieldKind::ForeignKey | FieldKind::OneToOne | FieldKind::ManyToMany
			) || !is_default_field(field)
				|| skips.contains(&field.name)
			{
				continue;
			}
			if field.kind == FieldKind::ManyToMany {
				if field.through.is_some() {
					continue;
				}
				names.insert(field.name.clone());
			}
			if let Some(related) = &field.related_model
				&& let Ok(target) = related.resolve()
			{
				pending.push(target);
			}
		}
	}
	found.then_some(names)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::introspector::Introspector;
	use crate::orm::Model;
	use rand::SeedableRng;
	use rand::rngs::StdRng;
	use reinhardt_fuzzy::{Faker, FuzzyAttribute};
	use rstest::rstest;

	fn declaration_for(model: &ModelRef, name: &str) -> FactoryResult<Option<Declaration>> {
		let skips = BTreeSet::new();
		let ctx = FieldContext {
			model,
			field: model.get_field(name),
			field_name: name,
			skips: &skips,
		};
		Introspector::default().build_declaration(&ctx)
	}

	#[rstest]
	#[case("first_name", Some(FakerProvider::FirstName))]
	#[case("author_firstname", Some(FakerProvider::FirstName))]
	#[case("last_name", Some(FakerProvider::LastName))]
	#[case("contact_email", Some(FakerProvider::Email))]
	#[case("zip", Some(FakerProvider::Zipcode))]
	#[case("postcode", Some(FakerProvider::Zipcode))]
	#[case("title", None)]
	fn test_char_faker_by_name(#[case] name: &str, #[case] expected: Option<FakerProvider>) {
		let model = Model::builder("ruletests", "Contact")
			.field(Field::char(name, 12))
			.build();
		let skips = BTreeSet::new();
		let ctx = FieldContext {
			model: &model,
			field: model.get_field(name),
			field_name: name,
			skips: &skips,
		};

		let Declaration::Fuzzy(generate) = build_char(&ctx).unwrap() else {
			panic!("expected fuzzy declaration");
		};

		// Same seed, so the value tells which generator was picked.
		let generated = generate(&mut StdRng::seed_from_u64(11));
		let mut rng = StdRng::seed_from_u64(11);
		let reference = match expected {
			Some(provider) => Value::from(Faker::new(provider).fuzz(&mut rng)),
			None => Value::from(FuzzyText::new().with_length(12).fuzz(&mut rng)),
		};
		assert_eq!(generated, reference);
	}

	#[rstest]
	fn test_every_builtin_kind_has_a_rule() {
		let rules = default_rules();
		for kind in [
			FieldKind::Integer,
			FieldKind::PositiveInteger,
			FieldKind::BigInteger,
			FieldKind::PositiveSmallInteger,
			FieldKind::SmallInteger,
			FieldKind::Decimal,
			FieldKind::Float,
			FieldKind::Char,
			FieldKind::Text,
			FieldKind::Slug,
			FieldKind::Email,
			FieldKind::Url,
			FieldKind::GenericIpAddress,
			FieldKind::Binary,
			FieldKind::Boolean,
			FieldKind::NullBoolean,
			FieldKind::File,
			FieldKind::Image,
			FieldKind::Uuid,
			FieldKind::Date,
			FieldKind::DateTime,
			FieldKind::Time,
			FieldKind::Duration,
			FieldKind::ForeignKey,
			FieldKind::OneToOne,
			FieldKind::ManyToMany,
		] {
			let field = Field::new("f", kind.clone());
			assert!(
				rules.iter().any(|rule| rule.matches(&field)),
				"no rule for {kind}"
			);
		}
	}

	#[rstest]
	fn test_decimal_without_digits_is_rejected() {
		let model = Model::builder("ruletests", "Price")
			.field(Field::new("amount", FieldKind::Decimal))
			.build();
		assert!(matches!(
			declaration_for(&model, "amount"),
			Err(FactoryError::Configuration(_))
		));
	}

	#[rstest]
	fn test_ip_protocol_selects_provider() {
		let model = Model::builder("ruletests", "Host")
			.field(Field::ip_address("v4", IpProtocol::Ipv4))
			.field(Field::ip_address("any", IpProtocol::Both))
			.build();
		let v4 = declaration_for(&model, "v4").unwrap().unwrap();
		let Declaration::Fuzzy(generate) = v4 else {
			panic!("expected fuzzy declaration");
		};
		let address = reinhardt_fuzzy::random::with_rng(|rng| generate(rng));
		assert!(address.as_str().is_some_and(|a| a.parse::<std::net::Ipv4Addr>().is_ok()));

		let any = declaration_for(&model, "any").unwrap().unwrap();
		let Declaration::Fuzzy(generate) = any else {
			panic!("expected fuzzy declaration");
		};
		let address = reinhardt_fuzzy::random::with_rng(|rng| generate(rng));
		assert!(address.as_str().is_some_and(|a| a.parse::<std::net::Ipv6Addr>().is_ok()));
	}

	#[rstest]
	fn test_unregistered_target_is_resolved_lazily() {
		let model = Model::builder("ruletests", "Orphan")
			.field(Field::foreign_key("parent", "ruletests.NotYetRegistered"))
			.build();
		let declaration = declaration_for(&model, "parent").unwrap();
		assert!(matches!(declaration, Some(Declaration::SubFactory(_))));
	}

	#[rstest]
	fn test_self_reference() {
		let model = Model::builder("ruletests", "Node")
			.field(Field::foreign_key("parent", "ruletests.Node").with_null())
			.field(Field::foreign_key("root", "ruletests.Node"))
			.register();

		let parent = declaration_for(&model, "parent").unwrap();
		assert!(matches!(parent, Some(Declaration::Value(Value::Null))));
		assert!(matches!(
			declaration_for(&model, "root"),
			Err(FactoryError::Configuration(_))
		));
	}
}
