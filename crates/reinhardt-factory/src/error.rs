//! Error types for factory definition and generation.

use thiserror::Error;

use crate::orm::OrmError;
use reinhardt_fuzzy::FuzzyError;

/// Errors that can occur while defining a factory or generating instances.
///
/// Configuration errors are fatal: they are raised immediately and never
/// retried. ORM errors raised by the manager are passed through unchanged.
#[derive(Debug, Error)]
pub enum FactoryError {
	/// The factory is configured inconsistently.
	#[error("Configuration error: {0}")]
	Configuration(String),

	/// A get-or-create lookup field has no value.
	#[error(
		"django_get_or_create - Unable to find initialization value for '{field}' in factory {factory}"
	)]
	MissingLookupField {
		/// Lookup field name.
		field: String,
		/// Factory name.
		factory: String,
	},

	/// A model label could not be resolved.
	#[error("Model not found: {0}")]
	ModelNotFound(String),

	/// A field name does not resolve on the factory's model or values.
	#[error("Field '{field}' not found in factory {factory}")]
	FieldNotFound {
		/// Factory name.
		factory: String,
		/// Field name.
		field: String,
	},

	/// The model exposes no manager.
	#[error("No manager available for model {model} in factory {factory}")]
	ManagerNotFound {
		/// Factory name.
		factory: String,
		/// Model label.
		model: String,
	},

	/// Error raised by the ORM, unchanged.
	#[error(transparent)]
	Orm(#[from] OrmError),

	/// Fuzzy attribute declared with invalid bounds.
	#[error(transparent)]
	Fuzzy(#[from] FuzzyError),

	/// I/O failure while reading attachment content.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	/// Image stub could not be rendered or encoded.
	#[error("Image error: {0}")]
	Image(String),
}

/// Result type alias for factory operations.
pub type FactoryResult<T> = Result<T, FactoryError>;
