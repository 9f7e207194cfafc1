//! Error types for fuzzy attribute construction.

use thiserror::Error;

/// Errors raised when a fuzzy attribute is declared with invalid bounds.
///
/// Generation itself never fails: every constructor validates its
/// parameters so that `fuzz` always has a non-empty range to draw from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FuzzyError {
	/// Lower bound is greater than the upper bound.
	#[error("Invalid range: low ({low}) is greater than high ({high})")]
	InvalidRange {
		/// Lower bound, rendered for display.
		low: String,
		/// Upper bound, rendered for display.
		high: String,
	},

	/// A choice attribute was declared without any candidate.
	#[error("FuzzyChoice requires at least one choice")]
	EmptyChoices,

	/// A text attribute was declared with an empty alphabet.
	#[error("FuzzyText requires a non-empty set of characters")]
	EmptyAlphabet,

	/// Decimal bounds or precision cannot be represented.
	#[error("Invalid decimal bounds: {0}")]
	InvalidDecimal(String),

	/// A faker provider name is not known.
	#[error("Unknown faker provider: {0}")]
	UnknownProvider(String),
}

/// Result type alias for fuzzy attribute construction.
pub type FuzzyResult<T> = Result<T, FuzzyError>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_invalid_range_display() {
		let error = FuzzyError::InvalidRange {
			low: "10".to_string(),
			high: "1".to_string(),
		};
		assert_eq!(
			error.to_string(),
			"Invalid range: low (10) is greater than high (1)"
		);
	}

	#[rstest]
	fn test_unknown_provider_display() {
		let error = FuzzyError::UnknownProvider("credit_card".to_string());
		assert_eq!(error.to_string(), "Unknown faker provider: credit_card");
	}
}
