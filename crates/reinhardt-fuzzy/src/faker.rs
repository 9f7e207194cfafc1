//! Faker providers backed by the `fake` crate.
//!
//! Providers are addressed by name (`"email"`, `"ipv4"`, ...) so that
//! declarations can be written the way fixtures are: as data.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use fake::Fake;
use fake::faker::address::en::ZipCode;
use fake::faker::internet::en::{DomainSuffix, IPv4, IPv6, SafeEmail};
use fake::faker::lorem::en::Word;
use fake::faker::name::en::{FirstName, LastName};
use rand::Rng;
use uuid::Uuid;

use crate::error::FuzzyError;
use crate::fuzzy::FuzzyAttribute;

/// Realistic data providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakerProvider {
	/// Given name.
	FirstName,
	/// Family name.
	LastName,
	/// Safe e-mail address.
	Email,
	/// Postal code.
	Zipcode,
	/// HTTPS URL on a random domain.
	Url,
	/// IPv4 address.
	Ipv4,
	/// IPv6 address.
	Ipv6,
	/// Random version 4 UUID.
	Uuid4,
	/// Duration of up to thirty days.
	TimeDelta,
}

impl FakerProvider {
	/// All providers, in declaration order.
	pub const ALL: [FakerProvider; 9] = [
		FakerProvider::FirstName,
		FakerProvider::LastName,
		FakerProvider::Email,
		FakerProvider::Zipcode,
		FakerProvider::Url,
		FakerProvider::Ipv4,
		FakerProvider::Ipv6,
		FakerProvider::Uuid4,
		FakerProvider::TimeDelta,
	];

	/// Provider name as used in declarations.
	pub fn name(&self) -> &'static str {
		match self {
			FakerProvider::FirstName => "first_name",
			FakerProvider::LastName => "last_name",
			FakerProvider::Email => "email",
			FakerProvider::Zipcode => "zipcode",
			FakerProvider::Url => "url",
			FakerProvider::Ipv4 => "ipv4",
			FakerProvider::Ipv6 => "ipv6",
			FakerProvider::Uuid4 => "uuid4",
			FakerProvider::TimeDelta => "time_delta",
		}
	}
}

impl fmt::Display for FakerProvider {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for FakerProvider {
	type Err = FuzzyError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		FakerProvider::ALL
			.into_iter()
			.find(|provider| provider.name() == s)
			.ok_or_else(|| FuzzyError::UnknownProvider(s.to_string()))
	}
}

/// Value produced by a [`Faker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeValue {
	/// Textual provider output.
	Text(String),
	/// UUID provider output.
	Uuid(Uuid),
	/// Duration provider output.
	Duration(Duration),
}

/// Fuzzy attribute drawing from a [`FakerProvider`].
///
/// # Examples
///
/// ```
/// use reinhardt_fuzzy::{FakeValue, Faker, FakerProvider, FuzzyAttribute};
///
/// let email = Faker::new(FakerProvider::Email);
/// match email.evaluate() {
///     FakeValue::Text(address) => assert!(address.contains('@')),
///     other => panic!("unexpected value: {:?}", other),
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Faker {
	provider: FakerProvider,
}

impl Faker {
	/// Creates a faker for `provider`.
	pub fn new(provider: FakerProvider) -> Self {
		Self { provider }
	}

	/// Creates a faker from a provider name.
	pub fn named(name: &str) -> Result<Self, FuzzyError> {
		name.parse().map(Self::new)
	}

	/// The wrapped provider.
	pub fn provider(&self) -> FakerProvider {
		self.provider
	}
}

impl FuzzyAttribute for Faker {
	type Output = FakeValue;

	fn fuzz<R: Rng + ?Sized>(&self, rng: &mut R) -> FakeValue {
		match self.provider {
			FakerProvider::FirstName => FakeValue::Text(FirstName().fake_with_rng(rng)),
			FakerProvider::LastName => FakeValue::Text(LastName().fake_with_rng(rng)),
			FakerProvider::Email => FakeValue::Text(SafeEmail().fake_with_rng(rng)),
			FakerProvider::Zipcode => FakeValue::Text(ZipCode().fake_with_rng(rng)),
			FakerProvider::Url => {
				let host: String = Word().fake_with_rng(rng);
				let suffix: String = DomainSuffix().fake_with_rng(rng);
				FakeValue::Text(format!("https://{}.{}/", host, suffix))
			}
			FakerProvider::Ipv4 => FakeValue::Text(IPv4().fake_with_rng(rng)),
			FakerProvider::Ipv6 => FakeValue::Text(IPv6().fake_with_rng(rng)),
			FakerProvider::Uuid4 => {
				FakeValue::Uuid(uuid::Builder::from_random_bytes(rng.random()).into_uuid())
			}
			FakerProvider::TimeDelta => {
				FakeValue::Duration(Duration::seconds(rng.random_range(0..=30 * 86_400)))
			}
		}
	}
}
