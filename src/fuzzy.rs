//! Fuzzy attribute generators.
//!
//! Random integers, decimals, text, dates and faker-backed values, drawn
//! from a shared, reseedable random source.
//!
//! # Examples
//!
//! ```
//! use reinhardt_factories::fuzzy::{FuzzyAttribute, FuzzyChoice};
//!
//! let status = FuzzyChoice::new(["draft", "published"]).unwrap();
//! assert!(["draft", "published"].contains(&status.evaluate()));
//! ```

#[cfg(feature = "fuzzy")]
pub use reinhardt_fuzzy::*;
