//! Factory settings.
//!
//! Settings are read once from `REINHARDT_FACTORY_*` environment variables
//! and can be replaced at runtime with [`configure`].

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::error::{FactoryError, FactoryResult};
use crate::orm::DEFAULT_DB_ALIAS;

/// Prefix of the environment variables read by [`FactorySettings::from_env`].
pub const ENV_PREFIX: &str = "REINHARDT_FACTORY_";

/// Global factory configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorySettings {
	/// Generate timezone-aware datetimes for datetime fields.
	pub use_tz: bool,
	/// Database alias factories write to unless configured otherwise.
	pub default_database: String,
	/// Rows created for each auto-populated many-to-many relation.
	pub related_batch_size: usize,
	/// Seed applied to the shared random source by [`configure`].
	pub random_seed: Option<u64>,
}

impl Default for FactorySettings {
	fn default() -> Self {
		Self {
			use_tz: true,
			default_database: DEFAULT_DB_ALIAS.to_string(),
			related_batch_size: 2,
			random_seed: None,
		}
	}
}

impl FactorySettings {
	/// Reads settings from the process environment.
	pub fn from_env() -> FactoryResult<Self> {
		Self::from_vars(std::env::vars())
	}

	/// Reads settings from `(name, value)` pairs; names without the
	/// `REINHARDT_FACTORY_` prefix are ignored.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_factory::FactorySettings;
	///
	/// let settings = FactorySettings::from_vars([
	///     ("REINHARDT_FACTORY_USE_TZ", "off"),
	///     ("REINHARDT_FACTORY_RELATED_BATCH_SIZE", "5"),
	/// ])
	/// .unwrap();
	/// assert!(!settings.use_tz);
	/// assert_eq!(settings.related_batch_size, 5);
	/// ```
	pub fn from_vars<I, K, V>(vars: I) -> FactoryResult<Self>
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: AsRef<str>,
	{
		let mut settings = Self::default();
		for (name, value) in vars {
			let Some(key) = name.as_ref().strip_prefix(ENV_PREFIX) else {
				continue;
			};
			let value = value.as_ref().trim();
			match key {
				"USE_TZ" => settings.use_tz = parse_bool(key, value)?,
				"DEFAULT_DATABASE" => settings.default_database = value.to_string(),
				"RELATED_BATCH_SIZE" => {
					settings.related_batch_size = parse_number(key, value)?;
				}
				"RANDOM_SEED" => settings.random_seed = Some(parse_number(key, value)?),
				_ => {}
			}
		}
		Ok(settings)
	}
}

fn parse_bool(key: &str, value: &str) -> FactoryResult<bool> {
	match value.to_lowercase().as_str() {
		"true" | "1" | "yes" | "on" => Ok(true),
		"false" | "0" | "no" | "off" => Ok(false),
		_ => Err(invalid_value(key, value)),
	}
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> FactoryResult<T> {
	value.parse().map_err(|_| invalid_value(key, value))
}

fn invalid_value(key: &str, value: &str) -> FactoryError {
	FactoryError::Configuration(format!(
		"Invalid value for {}{}: '{}'",
		ENV_PREFIX, key, value
	))
}

static SETTINGS: Lazy<RwLock<FactorySettings>> = Lazy::new(|| {
	let settings = FactorySettings::from_env().unwrap_or_else(|error| {
		tracing::warn!(%error, "ignoring invalid factory settings from environment");
		FactorySettings::default()
	});
	if let Some(seed) = settings.random_seed {
		reinhardt_fuzzy::reseed_random(seed);
	}
	RwLock::new(settings)
});

/// Current settings.
pub fn settings() -> FactorySettings {
	SETTINGS.read().clone()
}

/// Replaces the current settings, reseeding the shared random source when
/// `random_seed` is set.
pub fn configure(settings: FactorySettings) {
	if let Some(seed) = settings.random_seed {
		reinhardt_fuzzy::reseed_random(seed);
	}
	*SETTINGS.write() = settings;
}
