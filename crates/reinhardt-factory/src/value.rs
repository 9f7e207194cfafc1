//! Dynamic field values.
//!
//! Factories move values between declarations, models and managers without
//! knowing the concrete field types ahead of time, so every field value is
//! carried as a [`Value`].

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use reinhardt_fuzzy::FakeValue;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::orm::{File, Instance};

/// Keyword arguments passed to models, managers and factories.
pub type Kwargs = BTreeMap<String, Value>;

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	/// SQL `NULL`.
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	Decimal(Decimal),
	Text(String),
	Bytes(Vec<u8>),
	Date(NaiveDate),
	Time(NaiveTime),
	/// Timezone-aware datetime.
	DateTime(DateTime<Utc>),
	/// Naive datetime, used when timezone support is disabled.
	NaiveDateTime(NaiveDateTime),
	Duration(Duration),
	Uuid(Uuid),
	/// File attached to a file or image field.
	File(File),
	/// Related model instance.
	Instance(Instance),
	List(Vec<Value>),
}

impl Value {
	/// Returns `true` for [`Value::Null`].
	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	/// Returns `true` for the values a field treats as "empty":
	/// null, the empty string, empty bytes and the empty list.
	pub fn is_empty_value(&self) -> bool {
		match self {
			Value::Null => true,
			Value::Text(text) => text.is_empty(),
			Value::Bytes(bytes) => bytes.is_empty(),
			Value::List(items) => items.is_empty(),
			_ => false,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::Text(text) => Some(text),
			_ => None,
		}
	}

	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Value::Int(value) => Some(*value),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Bool(value) => Some(*value),
			_ => None,
		}
	}

	pub fn as_decimal(&self) -> Option<Decimal> {
		match self {
			Value::Decimal(value) => Some(*value),
			_ => None,
		}
	}

	pub fn as_bytes(&self) -> Option<&[u8]> {
		match self {
			Value::Bytes(bytes) => Some(bytes),
			_ => None,
		}
	}

	pub fn as_file(&self) -> Option<&File> {
		match self {
			Value::File(file) => Some(file),
			_ => None,
		}
	}

	pub fn as_instance(&self) -> Option<&Instance> {
		match self {
			Value::Instance(instance) => Some(instance),
			_ => None,
		}
	}

	/// Short type name, for error messages.
	pub fn type_name(&self) -> &'static str {
		match self {
			Value::Null => "null",
			Value::Bool(_) => "bool",
			Value::Int(_) => "int",
			Value::Float(_) => "float",
			Value::Decimal(_) => "decimal",
			Value::Text(_) => "text",
			Value::Bytes(_) => "bytes",
			Value::Date(_) => "date",
			Value::Time(_) => "time",
			Value::DateTime(_) => "datetime",
			Value::NaiveDateTime(_) => "naive datetime",
			Value::Duration(_) => "duration",
			Value::Uuid(_) => "uuid",
			Value::File(_) => "file",
			Value::Instance(_) => "instance",
			Value::List(_) => "list",
		}
	}
}

macro_rules! impl_from {
	($($ty:ty => $variant:ident),* $(,)?) => {
		$(
			impl From<$ty> for Value {
				fn from(value: $ty) -> Self {
					Value::$variant(value.into())
				}
			}
		)*
	};
}

impl_from! {
	bool => Bool,
	i64 => Int,
	i32 => Int,
	i16 => Int,
	u32 => Int,
	u16 => Int,
	f64 => Float,
	f32 => Float,
	Decimal => Decimal,
	String => Text,
	&str => Text,
	Vec<u8> => Bytes,
	NaiveDate => Date,
	NaiveTime => Time,
	DateTime<Utc> => DateTime,
	NaiveDateTime => NaiveDateTime,
	Duration => Duration,
	Uuid => Uuid,
	File => File,
	Instance => Instance,
	Vec<Value> => List,
}

impl From<&Instance> for Value {
	fn from(instance: &Instance) -> Self {
		Value::Instance(instance.clone())
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(value: Option<T>) -> Self {
		value.map_or(Value::Null, Into::into)
	}
}

impl From<FakeValue> for Value {
	fn from(value: FakeValue) -> Self {
		match value {
			FakeValue::Text(text) => Value::Text(text),
			FakeValue::Uuid(uuid) => Value::Uuid(uuid),
			FakeValue::Duration(duration) => Value::Duration(duration),
		}
	}
}

/// Builds a [`Kwargs`] map from `key => value` pairs.
///
/// # Examples
///
/// ```
/// use reinhardt_factory::{kwargs, Value};
///
/// let kwargs = kwargs! { "slug" => "hello", "rank" => 3i64 };
/// assert_eq!(kwargs["slug"], Value::Text("hello".to_string()));
/// assert_eq!(kwargs["rank"], Value::Int(3));
/// ```
#[macro_export]
macro_rules! kwargs {
	() => {
		$crate::Kwargs::new()
	};
	($($key:expr => $value:expr),+ $(,)?) => {{
		let mut kwargs = $crate::Kwargs::new();
		$(
			kwargs.insert(::std::string::String::from($key), $crate::Value::from($value));
		)+
		kwargs
	}};
}
