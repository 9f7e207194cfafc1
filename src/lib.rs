//! # Reinhardt Factories
//!
//! Test data factories for Reinhardt ORM models, in the spirit of
//! factory_boy's Django integration.
//!
//! A factory produces valid model instances for a test suite, saved or
//! unsaved. Values come either from explicit declarations or from the
//! model's own field metadata:
//!
//! - **Fuzzy values**: typed random generators and faker providers
//!   ([`fuzzy`])
//! - **Field introspection**: each required field is mapped to a generator
//!   through an ordered rule table
//! - **Relations**: foreign keys are built by nested factories, many-to-many
//!   relations and their intermediate rows after the owner exists
//! - **Attachments**: file and image stubs for file columns
//! - **Signal muting**: model signals silenced for the duration of a
//!   generation and restored afterwards
//! - **Get-or-create**: factories can reuse rows matching a set of lookup
//!   fields
//!
//! ## Feature Flags
//!
//! - `full` (default) - everything below
//! - `fuzzy` - fuzzy generators only
//! - `orm` - model factories on top of the fuzzy generators
//!
//! ## Quick Example
//!
//! ```
//! use reinhardt_factories::prelude::*;
//! use reinhardt_factories::factory::orm::{Field, FieldKind, InMemoryDatabase, Model};
//!
//! let db = InMemoryDatabase::new();
//! let author = Model::builder("library", "Author")
//!     .field(Field::char("first_name", 30))
//!     .field(Field::email("email"))
//!     .manager(db.manager())
//!     .build();
//! let book = Model::builder("library", "Book")
//!     .field(Field::char("title", 80))
//!     .field(Field::foreign_key("author", &author))
//!     .field(Field::new("pages", FieldKind::PositiveInteger))
//!     .manager(db.manager())
//!     .build();
//!
//! let factory = ModelFactory::builder(&book)
//!     .declare("title", Declaration::sequence(|n| Value::Text(format!("Volume {}", n))))
//!     .auto_fields(Vec::<String>::new())
//!     .build()
//!     .unwrap();
//!
//! let first = factory.create().unwrap();
//! assert_eq!(first.get("title"), Some(Value::Text("Volume 0".to_string())));
//! assert_eq!(db.count(&author), 1);
//!
//! let draft = factory.build_with(kwargs! { "title" => "Draft" }).unwrap();
//! assert!(!draft.is_saved());
//! ```

pub mod factory;
pub mod fuzzy;

/// Common imports for writing factories.
pub mod prelude {
	#[cfg(feature = "fuzzy")]
	pub use reinhardt_fuzzy::{
		FakerProvider, FuzzyAttribute, FuzzyChoice, FuzzyDate, FuzzyDateTime, FuzzyDecimal,
		FuzzyFloat, FuzzyInteger, FuzzyText,
	};

	#[cfg(feature = "orm")]
	pub use reinhardt_factory::{
		AttachmentParams, Declaration, FactoryError, FactoryResult, FileField, ImageField,
		ModelFactory, MuteSignals, Strategy, Value, kwargs,
	};
}
