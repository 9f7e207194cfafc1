//! Fuzzy attribute generators for Reinhardt factories.
//!
//! This crate provides the random value generators used by
//! `reinhardt-factory` when a model field has no explicit value:
//!
//! - **Fuzzy attributes**: uniformly distributed integers, decimals, floats,
//!   text, bytes, dates and times within a type-appropriate range
//! - **Faker providers**: realistic names, e-mail addresses, URLs, IP
//!   addresses, UUIDs and durations backed by the `fake` crate
//! - **Shared random source**: a process-wide seeded generator so a test
//!   suite can replay the exact data it produced
//!
//! # Quick Start
//!
//! ```
//! use reinhardt_fuzzy::{FuzzyAttribute, FuzzyInteger, FuzzyText};
//!
//! let age = FuzzyInteger::new(0, 120).unwrap();
//! let value = age.evaluate();
//! assert!((0..=120).contains(&value));
//!
//! let code = FuzzyText::new().with_length(8).with_prefix("SKU-");
//! assert_eq!(code.evaluate().len(), 12);
//! ```
//!
//! # Reproducible data
//!
//! ```
//! use reinhardt_fuzzy::{FuzzyAttribute, FuzzyInteger, random};
//!
//! let fuzzy = FuzzyInteger::new(-1000, 1000).unwrap();
//!
//! random::reseed_random(42);
//! let first = fuzzy.evaluate();
//! random::reseed_random(42);
//! assert_eq!(fuzzy.evaluate(), first);
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod faker;
pub mod fuzzy;
pub mod random;

pub use error::{FuzzyError, FuzzyResult};
pub use faker::{FakeValue, Faker, FakerProvider};
pub use fuzzy::{
	FuzzyAttribute, FuzzyBytes, FuzzyChoice, FuzzyDate, FuzzyDateTime, FuzzyDecimal, FuzzyFloat,
	FuzzyInteger, FuzzyNaiveDateTime, FuzzyText, FuzzyTime,
};
pub use random::{random_seed, reseed_random};
