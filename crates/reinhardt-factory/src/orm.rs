//! ORM capability surface.
//!
//! Factories depend on a small slice of the ORM: model metadata, a manager
//! able to `create` and `get_or_create`, lifecycle signals and file values.
//! This module defines that slice, together with an in-memory manager that
//! honours the same contract.

pub mod error;
pub mod field;
pub mod files;
pub mod instance;
pub mod manager;
pub mod model;
pub mod registry;
pub mod signals;

pub use error::{OrmError, OrmResult};
pub use field::{Field, FieldKind, IpProtocol, RelatedModel};
pub use files::File;
pub use instance::{Instance, RelatedManager};
pub use manager::{DEFAULT_DB_ALIAS, InMemoryDatabase, InMemoryManager, Manager};
pub use model::{Model, ModelBuilder, ModelRef};
pub use registry::{clear_models, get_model, get_model_by_label, register_model};
pub use signals::{Receiver, Signal, SignalEvent};
