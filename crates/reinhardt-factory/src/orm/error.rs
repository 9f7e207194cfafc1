use thiserror::Error;

/// Errors raised by models and managers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrmError {
	/// A constraint was violated on save.
	#[error("IntegrityError: {0}")]
	Integrity(String),

	/// A lookup matched no row.
	#[error("{0} matching query does not exist")]
	DoesNotExist(String),

	/// A lookup expected to match one row matched several.
	#[error("get() returned more than one {model} -- it returned {count}!")]
	MultipleObjectsReturned {
		/// Model label.
		model: String,
		/// Number of matching rows.
		count: usize,
	},

	/// An operation required a saved instance.
	#[error("{0}")]
	UnsavedInstance(String),

	/// A keyword does not name a field of the model.
	#[error("{model}() got an unexpected keyword argument '{field}'")]
	UnknownField {
		/// Model label.
		model: String,
		/// Offending keyword.
		field: String,
	},

	/// Abstract models cannot be instantiated.
	#[error("Abstract model {0} cannot be instantiated")]
	AbstractModel(String),

	/// A model label is not registered.
	#[error("No installed model with label '{0}'")]
	ModelNotRegistered(String),

	/// Backend failure.
	#[error("Database error: {0}")]
	Database(String),
}

/// Result type alias for ORM operations.
pub type OrmResult<T> = Result<T, OrmError>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_unknown_field_display() {
		let error = OrmError::UnknownField {
			model: "djapp.StandardModel".to_string(),
			field: "bogus".to_string(),
		};
		assert_eq!(
			error.to_string(),
			"djapp.StandardModel() got an unexpected keyword argument 'bogus'"
		);
	}

	#[rstest]
	fn test_multiple_objects_display() {
		let error = OrmError::MultipleObjectsReturned {
			model: "djapp.StandardModel".to_string(),
			count: 2,
		};
		assert!(error.to_string().contains("it returned 2"));
	}
}
