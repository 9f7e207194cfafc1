//! Fuzzy attributes: random values within a declared range.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::error::{FuzzyError, FuzzyResult};
use crate::random;

/// Lowercase and uppercase ASCII letters.
pub const ASCII_LETTERS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// ASCII decimal digits.
pub const DIGITS: &str = "0123456789";

/// Length of a [`FuzzyText`] when none is declared.
pub const DEFAULT_TEXT_LENGTH: usize = 12;

/// Length of a [`FuzzyBytes`] when none is declared.
pub const DEFAULT_BYTES_LENGTH: usize = 16;

/// A lazily evaluated random value generator.
pub trait FuzzyAttribute {
	/// Type of the generated value.
	type Output;

	/// Draws a value from `rng`.
	fn fuzz<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Output;

	/// Draws a value from the shared random source.
	fn evaluate(&self) -> Self::Output {
		random::with_rng(|rng| self.fuzz(rng))
	}
}

fn check_range<T: PartialOrd + ToString>(low: &T, high: &T) -> FuzzyResult<()> {
	if low > high {
		return Err(FuzzyError::InvalidRange {
			low: low.to_string(),
			high: high.to_string(),
		});
	}
	Ok(())
}

/// Uniform integer in `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyInteger {
	low: i64,
	high: i64,
}

impl FuzzyInteger {
	/// Creates an integer attribute with inclusive bounds.
	pub fn new(low: i64, high: i64) -> FuzzyResult<Self> {
		check_range(&low, &high)?;
		Ok(Self { low, high })
	}

	/// Creates an attribute in `[0, high]`.
	pub fn up_to(high: i64) -> FuzzyResult<Self> {
		Self::new(0, high)
	}

	/// Lower bound.
	pub fn low(&self) -> i64 {
		self.low
	}

	/// Upper bound.
	pub fn high(&self) -> i64 {
		self.high
	}
}

impl FuzzyAttribute for FuzzyInteger {
	type Output = i64;

	fn fuzz<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
		rng.random_range(self.low..=self.high)
	}
}

/// Uniform decimal in `[low, high]` with a fixed number of decimal places.
///
/// Bounds are converted to integer units of `10^-precision` at construction
/// so that drawing a value never overflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyDecimal {
	low_units: i128,
	high_units: i128,
	precision: u32,
}

impl FuzzyDecimal {
	/// Creates a decimal attribute.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_fuzzy::{FuzzyAttribute, FuzzyDecimal};
	/// use rust_decimal::Decimal;
	///
	/// let price = FuzzyDecimal::new(Decimal::new(1, 0), Decimal::new(100, 0), 2).unwrap();
	/// let value = price.evaluate();
	/// assert_eq!(value.scale(), 2);
	/// assert!(value >= Decimal::new(1, 0) && value <= Decimal::new(100, 0));
	/// ```
	pub fn new(low: Decimal, high: Decimal, precision: u32) -> FuzzyResult<Self> {
		check_range(&low, &high)?;
		let low_units = Self::to_units(low, precision)?;
		let high_units = Self::to_units(high, precision)?;
		Decimal::try_from_i128_with_scale(low_units, precision)
			.and_then(|_| Decimal::try_from_i128_with_scale(high_units, precision))
			.map_err(|e| FuzzyError::InvalidDecimal(e.to_string()))?;
		Ok(Self {
			low_units,
			high_units,
			precision,
		})
	}

	/// Creates the symmetric attribute that fits a column with `max_digits`
	/// total digits, `decimal_places` of them after the point.
	///
	/// The bounds are `±(10^(max_digits - decimal_places) - 1)`.
	pub fn for_digits(max_digits: u32, decimal_places: u32) -> FuzzyResult<Self> {
		let integer_digits = max_digits.checked_sub(decimal_places).ok_or_else(|| {
			FuzzyError::InvalidDecimal(format!(
				"decimal_places ({}) exceeds max_digits ({})",
				decimal_places, max_digits
			))
		})?;
		let magnitude = 10i128
			.checked_pow(integer_digits)
			.map(|power| power - 1)
			.ok_or_else(|| {
				FuzzyError::InvalidDecimal(format!("{} integer digits", integer_digits))
			})?;
		let high = Decimal::try_from_i128_with_scale(magnitude, 0)
			.map_err(|e| FuzzyError::InvalidDecimal(e.to_string()))?;
		Self::new(-high, high, decimal_places)
	}

	fn to_units(value: Decimal, precision: u32) -> FuzzyResult<i128> {
		let factor = 10i128
			.checked_pow(precision)
			.and_then(|power| Decimal::try_from_i128_with_scale(power, 0).ok())
			.ok_or_else(|| FuzzyError::InvalidDecimal(format!("precision {}", precision)))?;
		value
			.checked_mul(factor)
			.and_then(|scaled| scaled.trunc().to_i128())
			.ok_or_else(|| {
				FuzzyError::InvalidDecimal(format!("{} at precision {}", value, precision))
			})
	}

	/// Number of decimal places of generated values.
	pub fn precision(&self) -> u32 {
		self.precision
	}
}

impl FuzzyAttribute for FuzzyDecimal {
	type Output = Decimal;

	fn fuzz<R: Rng + ?Sized>(&self, rng: &mut R) -> Decimal {
		let units = rng.random_range(self.low_units..=self.high_units);
		// Both bounds were checked representable in `new`.
		Decimal::from_i128_with_scale(units, self.precision)
	}
}

/// Uniform float in `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyFloat {
	low: f64,
	high: f64,
}

impl FuzzyFloat {
	/// Creates a float attribute with inclusive bounds.
	pub fn new(low: f64, high: f64) -> FuzzyResult<Self> {
		if !low.is_finite() || !high.is_finite() {
			return Err(FuzzyError::InvalidRange {
				low: low.to_string(),
				high: high.to_string(),
			});
		}
		check_range(&low, &high)?;
		Ok(Self { low, high })
	}
}

impl FuzzyAttribute for FuzzyFloat {
	type Output = f64;

	fn fuzz<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
		rng.random_range(self.low..=self.high)
	}
}

/// Random text of a fixed length drawn from an alphabet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyText {
	length: usize,
	chars: Vec<char>,
	prefix: String,
	suffix: String,
}

impl FuzzyText {
	/// Creates a text attribute of [`DEFAULT_TEXT_LENGTH`] ASCII letters.
	pub fn new() -> Self {
		Self {
			length: DEFAULT_TEXT_LENGTH,
			chars: ASCII_LETTERS.chars().collect(),
			prefix: String::new(),
			suffix: String::new(),
		}
	}

	/// Sets the number of random characters.
	pub fn with_length(mut self, length: usize) -> Self {
		self.length = length;
		self
	}

	/// Sets the alphabet random characters are drawn from.
	pub fn with_chars(mut self, chars: &str) -> FuzzyResult<Self> {
		if chars.is_empty() {
			return Err(FuzzyError::EmptyAlphabet);
		}
		self.chars = chars.chars().collect();
		Ok(self)
	}

	/// Sets a fixed prefix, not counted in the random length.
	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = prefix.into();
		self
	}

	/// Sets a fixed suffix, not counted in the random length.
	pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
		self.suffix = suffix.into();
		self
	}

	/// Number of random characters.
	pub fn length(&self) -> usize {
		self.length
	}
}

impl Default for FuzzyText {
	fn default() -> Self {
		Self::new()
	}
}

impl FuzzyAttribute for FuzzyText {
	type Output = String;

	fn fuzz<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
		let mut text = String::with_capacity(self.prefix.len() + self.length + self.suffix.len());
		text.push_str(&self.prefix);
		for _ in 0..self.length {
			text.push(self.chars[rng.random_range(0..self.chars.len())]);
		}
		text.push_str(&self.suffix);
		text
	}
}

/// Uniform choice among a fixed set of values.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyChoice<T> {
	choices: Vec<T>,
}

impl<T: Clone> FuzzyChoice<T> {
	/// Creates a choice attribute; at least one choice is required.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_fuzzy::{FuzzyAttribute, FuzzyChoice};
	///
	/// let status = FuzzyChoice::new(["draft", "published"]).unwrap();
	/// assert!(["draft", "published"].contains(&status.evaluate()));
	/// ```
	pub fn new(choices: impl IntoIterator<Item = T>) -> FuzzyResult<Self> {
		let choices: Vec<T> = choices.into_iter().collect();
		if choices.is_empty() {
			return Err(FuzzyError::EmptyChoices);
		}
		Ok(Self { choices })
	}

	/// Candidate values.
	pub fn choices(&self) -> &[T] {
		&self.choices
	}
}

impl<T: Clone> FuzzyAttribute for FuzzyChoice<T> {
	type Output = T;

	fn fuzz<R: Rng + ?Sized>(&self, rng: &mut R) -> T {
		self.choices[rng.random_range(0..self.choices.len())].clone()
	}
}

/// Random bytes of a fixed length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyBytes {
	length: usize,
}

impl FuzzyBytes {
	/// Creates a bytes attribute of [`DEFAULT_BYTES_LENGTH`] bytes.
	pub fn new() -> Self {
		Self {
			length: DEFAULT_BYTES_LENGTH,
		}
	}

	/// Sets the number of bytes.
	pub fn with_length(mut self, length: usize) -> Self {
		self.length = length;
		self
	}
}

impl Default for FuzzyBytes {
	fn default() -> Self {
		Self::new()
	}
}

impl FuzzyAttribute for FuzzyBytes {
	type Output = Vec<u8>;

	fn fuzz<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<u8> {
		let mut bytes = vec![0u8; self.length];
		rng.fill(bytes.as_mut_slice());
		bytes
	}
}

fn default_start_date() -> NaiveDate {
	NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default()
}

/// Uniform date in `[start, end]`; `end` defaults to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyDate {
	start: NaiveDate,
	end: Option<NaiveDate>,
}

impl FuzzyDate {
	/// Creates a date attribute starting at `start` and ending today.
	pub fn new(start: NaiveDate) -> Self {
		Self { start, end: None }
	}

	/// Creates a date attribute with both bounds fixed.
	pub fn between(start: NaiveDate, end: NaiveDate) -> FuzzyResult<Self> {
		check_range(&start, &end)?;
		Ok(Self {
			start,
			end: Some(end),
		})
	}
}

impl Default for FuzzyDate {
	fn default() -> Self {
		Self::new(default_start_date())
	}
}

impl FuzzyAttribute for FuzzyDate {
	type Output = NaiveDate;

	fn fuzz<R: Rng + ?Sized>(&self, rng: &mut R) -> NaiveDate {
		let end = self.end.unwrap_or_else(|| Utc::now().date_naive());
		let span = (end - self.start).num_days().max(0);
		self.start + Duration::days(rng.random_range(0..=span))
	}
}

fn random_offset<R: Rng + ?Sized>(rng: &mut R, span: Duration) -> Duration {
	let micros = span.num_microseconds().unwrap_or(i64::MAX).max(0);
	Duration::microseconds(rng.random_range(0..=micros))
}

/// Uniform naive datetime in `[start, end]`; `end` defaults to now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyNaiveDateTime {
	start: NaiveDateTime,
	end: Option<NaiveDateTime>,
}

impl FuzzyNaiveDateTime {
	/// Creates an attribute starting at `start` and ending at generation time.
	pub fn new(start: NaiveDateTime) -> Self {
		Self { start, end: None }
	}

	/// Creates an attribute with both bounds fixed.
	pub fn between(start: NaiveDateTime, end: NaiveDateTime) -> FuzzyResult<Self> {
		check_range(&start, &end)?;
		Ok(Self {
			start,
			end: Some(end),
		})
	}
}

impl FuzzyAttribute for FuzzyNaiveDateTime {
	type Output = NaiveDateTime;

	fn fuzz<R: Rng + ?Sized>(&self, rng: &mut R) -> NaiveDateTime {
		let end = self.end.unwrap_or_else(|| Utc::now().naive_utc());
		self.start + random_offset(rng, end - self.start)
	}
}

/// Uniform timezone-aware datetime in `[start, end]`; `end` defaults to now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyDateTime {
	start: DateTime<Utc>,
	end: Option<DateTime<Utc>>,
}

impl FuzzyDateTime {
	/// Creates an attribute starting at `start` and ending at generation time.
	pub fn new(start: DateTime<Utc>) -> Self {
		Self { start, end: None }
	}

	/// Creates an attribute with both bounds fixed.
	pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> FuzzyResult<Self> {
		check_range(&start, &end)?;
		Ok(Self {
			start,
			end: Some(end),
		})
	}
}

impl FuzzyAttribute for FuzzyDateTime {
	type Output = DateTime<Utc>;

	fn fuzz<R: Rng + ?Sized>(&self, rng: &mut R) -> DateTime<Utc> {
		let end = self.end.unwrap_or_else(Utc::now);
		self.start + random_offset(rng, end - self.start)
	}
}

/// Uniform time of day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FuzzyTime;

impl FuzzyTime {
	/// Creates a time-of-day attribute.
	pub fn new() -> Self {
		Self
	}
}

impl FuzzyAttribute for FuzzyTime {
	type Output = NaiveTime;

	fn fuzz<R: Rng + ?Sized>(&self, rng: &mut R) -> NaiveTime {
		let seconds = rng.random_range(0..86_400u32);
		let nanos = rng.random_range(0..1_000_000u32) * 1_000;
		NaiveTime::from_num_seconds_from_midnight_opt(seconds, nanos).unwrap_or(NaiveTime::MIN)
	}
}
