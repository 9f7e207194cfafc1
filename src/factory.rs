//! Model factories.
//!
//! Factories bound to ORM models: field introspection, relation builders,
//! file attachments and signal muting.
//!
//! # Examples
//!
//! ```
//! use reinhardt_factories::factory::ModelFactory;
//! use reinhardt_factories::factory::orm::{Field, InMemoryDatabase, Model};
//!
//! let db = InMemoryDatabase::new();
//! let tag = Model::builder("blog", "Tag")
//!     .field(Field::slug("name").with_unique())
//!     .manager(db.manager())
//!     .build();
//!
//! let factory = ModelFactory::builder(&tag)
//!     .auto_fields(Vec::<String>::new())
//!     .build()
//!     .unwrap();
//! factory.create_batch(3).unwrap();
//! assert_eq!(db.count(&tag), 3);
//! ```

#[cfg(feature = "orm")]
pub use reinhardt_factory::*;
