//! Model factories for the Reinhardt ORM.
//!
//! This crate generates valid model instances for tests, either
//! declaratively or by inspecting the model's fields:
//!
//! - **Factories**: [`ModelFactory`] builds unsaved instances or creates
//!   saved ones, optionally through `get_or_create`
//! - **Field introspection**: [`Introspector`] selects the fields that need
//!   a value and maps each of them to a [`Declaration`] through an ordered
//!   [`RuleTable`]
//! - **Relations**: foreign keys become sub-factories, many-to-many
//!   relations are filled after the owner is saved
//! - **Attachments**: [`FileField`] and [`ImageField`] produce named files
//!   from data, disk, an open file or a function
//! - **Signal muting**: [`MuteSignals`] silences signal receivers and
//!   restores them exactly
//!
//! # Quick Start
//!
//! ```
//! use reinhardt_factory::{ModelFactory, Value};
//! use reinhardt_factory::orm::{Field, FieldKind, InMemoryDatabase, Model};
//!
//! let db = InMemoryDatabase::new();
//! let article = Model::builder("blog", "Article")
//!     .field(Field::char("title", 50))
//!     .field(Field::slug("slug").with_unique())
//!     .field(Field::new("views", FieldKind::PositiveInteger))
//!     .field(Field::new("published", FieldKind::Boolean).with_default(false))
//!     .manager(db.manager())
//!     .build();
//!
//! let factory = ModelFactory::builder(&article)
//!     .auto_fields(Vec::<String>::new())
//!     .build()
//!     .unwrap();
//!
//! let instance = factory.create().unwrap();
//! assert_eq!(instance.get("title").and_then(|v| v.as_str().map(str::len)), Some(50));
//! assert_eq!(instance.get("published"), Some(Value::Bool(false)));
//! assert_eq!(db.count(&article), 1);
//! ```
//!
//! # Features
//!
//! - `images` (default) - render [`ImageField`] content with the `image` crate

pub mod attachments;
pub mod declarations;
pub mod error;
pub mod factory;
pub mod introspector;
pub mod mute;
pub mod orm;
pub mod settings;
pub mod value;

pub use attachments::{AttachmentField, AttachmentParams, FileField, ImageField};
pub use declarations::{Declaration, PostGenerationContext, RelatedFactory, Resolver, SubFactory};
pub use error::{FactoryError, FactoryResult};
pub use factory::{BuildStep, ModelFactory, ModelFactoryBuilder, ModelSpec, Strategy};
pub use introspector::{FieldContext, Introspector, Rule, RuleTable};
pub use mute::{MuteSignals, MutedSignals};
pub use settings::{FactorySettings, configure, settings};
pub use value::{Kwargs, Value};
