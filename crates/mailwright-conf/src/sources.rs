//! Settings sources for layered delivery configuration
//!
//! One source is applied with base-replace semantics, every further source is layered on top
//! with sparse-override semantics, in the order it was added.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::settings::{DeliveryConfig, MailSettings, MergeStrategy};
use crate::{SettingsError, SettingsResult};

/// Trait for settings sources
pub trait SettingsSource: Send + Sync {
	/// Load settings from this source
	fn load(&self) -> SettingsResult<MailSettings>;

	/// Get a description of this source
	fn description(&self) -> String;
}

/// In-memory settings source
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
	settings: MailSettings,
}

impl StaticSource {
	/// Wrap settings held in memory
	pub fn new(settings: MailSettings) -> Self {
		Self { settings }
	}
}

impl SettingsSource for StaticSource {
	fn load(&self) -> SettingsResult<MailSettings> {
		Ok(self.settings.clone())
	}

	fn description(&self) -> String {
		"Static settings".to_string()
	}
}

/// TOML file settings source
///
/// Reads one table of the file, addressed by a dotted path such as `mail.smtp`. A missing file
/// or a missing table produces settings with every field unset.
pub struct TomlFileSource {
	path: PathBuf,
	table: Option<String>,
}

impl TomlFileSource {
	/// Create a new TOML file source reading the top-level table
	///
	/// # Examples
	///
	/// ```
	/// use mailwright_conf::TomlFileSource;
	///
	/// let source = TomlFileSource::new("mail.toml").with_table("mail.smtp");
	/// ```
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			table: None,
		}
	}

	/// Read the table at `table` (dot separated) instead of the top level
	pub fn with_table(mut self, table: impl Into<String>) -> Self {
		self.table = Some(table.into());
		self
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl SettingsSource for TomlFileSource {
	fn load(&self) -> SettingsResult<MailSettings> {
		if !self.path.exists() {
			tracing::debug!(path = %self.path.display(), "settings file not found, treating as unset");
			return Ok(MailSettings::default());
		}

		let content = fs::read_to_string(&self.path).map_err(|source| SettingsError::Io {
			path: self.path.display().to_string(),
			source,
		})?;
		let mut value = toml::Value::Table(toml::from_str::<toml::Table>(&content)?);

		if let Some(table) = &self.table {
			for key in table.split('.').filter(|k| !k.is_empty()) {
				let toml::Value::Table(mut current) = value else {
					return Err(SettingsError::InvalidSource(format!(
						"{} is not a table in {}",
						table,
						self.path.display()
					)));
				};
				match current.remove(key) {
					Some(next) => value = next,
					None => return Ok(MailSettings::default()),
				}
			}
		}

		if !value.is_table() {
			return Err(SettingsError::InvalidSource(format!(
				"{} is not a table in {}",
				self.table.as_deref().unwrap_or("<root>"),
				self.path.display()
			)));
		}

		let settings: MailSettings = value.try_into()?;
		Ok(settings)
	}

	fn description(&self) -> String {
		match &self.table {
			Some(table) => format!("TOML file: {} [{}]", self.path.display(), table),
			None => format!("TOML file: {}", self.path.display()),
		}
	}
}

/// Environment variable settings source
///
/// Reads `<PREFIX>HOST`, `<PREFIX>PORT`, `<PREFIX>DELIVERY_METHOD`, `<PREFIX>PICKUP_DIRECTORY`,
/// `<PREFIX>USER_NAME`, `<PREFIX>PASSWORD`, `<PREFIX>DEFAULT_CREDENTIALS`, `<PREFIX>SSL_MODE`,
/// `<PREFIX>TIMEOUT` and `<PREFIX>FROM`.
pub struct EnvSource {
	prefix: String,
	vars: Option<HashMap<String, String>>,
}

impl EnvSource {
	/// Create a new environment source with the `MAIL_` prefix
	pub fn new() -> Self {
		Self {
			prefix: "MAIL_".to_string(),
			vars: None,
		}
	}

	/// Set the prefix for variable names
	///
	/// # Examples
	///
	/// ```
	/// use mailwright_conf::EnvSource;
	///
	/// let source = EnvSource::new().with_prefix("APP_SMTP_");
	/// // Reads APP_SMTP_HOST, APP_SMTP_PORT, ...
	/// ```
	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = prefix.into();
		self
	}

	/// Read from a fixed set of variables instead of the process environment
	pub fn with_vars<I, K, V>(mut self, vars: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.vars = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
		self
	}

	fn var(&self, key: &str) -> Option<String> {
		let name = format!("{}{}", self.prefix, key);
		match &self.vars {
			Some(vars) => vars.get(&name).cloned(),
			None => std::env::var(&name).ok(),
		}
	}

	fn parse_number<T: std::str::FromStr>(&self, key: &str) -> SettingsResult<Option<T>> {
		match self.var(key) {
			Some(raw) if !raw.trim().is_empty() => {
				raw.trim()
					.parse::<T>()
					.map(Some)
					.map_err(|_| SettingsError::InvalidValue {
						key: format!("{}{}", self.prefix, key),
						value: raw,
					})
			}
			_ => Ok(None),
		}
	}
}

impl Default for EnvSource {
	fn default() -> Self {
		Self::new()
	}
}

impl SettingsSource for EnvSource {
	fn load(&self) -> SettingsResult<MailSettings> {
		let mut settings = MailSettings {
			host: self.var("HOST").unwrap_or_default(),
			pickup_directory: self.var("PICKUP_DIRECTORY").unwrap_or_default(),
			user_name: self.var("USER_NAME").unwrap_or_default(),
			password: self.var("PASSWORD").unwrap_or_default(),
			from: self.var("FROM").unwrap_or_default(),
			port: self.parse_number("PORT")?.unwrap_or(0),
			timeout: self.parse_number("TIMEOUT")?.unwrap_or(0),
			..Default::default()
		};

		if let Some(raw) = self.var("DELIVERY_METHOD").filter(|v| !v.trim().is_empty()) {
			settings.delivery_method = Some(raw.parse()?);
		}
		if let Some(raw) = self.var("SSL_MODE").filter(|v| !v.trim().is_empty()) {
			settings.ssl_mode = Some(raw.parse()?);
		}
		if let Some(raw) = self.var("DEFAULT_CREDENTIALS").filter(|v| !v.trim().is_empty()) {
			settings.default_credentials = Some(match raw.trim().to_lowercase().as_str() {
				"true" | "1" | "yes" | "on" => true,
				"false" | "0" | "no" | "off" => false,
				_ => {
					return Err(SettingsError::InvalidValue {
						key: format!("{}DEFAULT_CREDENTIALS", self.prefix),
						value: raw,
					});
				}
			});
		}

		Ok(settings)
	}

	fn description(&self) -> String {
		format!("Environment variables (prefix: {})", self.prefix)
	}
}

/// Builds a [`DeliveryConfig`] from a base source and sparse layers
#[derive(Default)]
pub struct DeliveryConfigBuilder {
	base: Option<Box<dyn SettingsSource>>,
	layers: Vec<Box<dyn SettingsSource>>,
}

impl DeliveryConfigBuilder {
	/// Create a builder with no sources
	pub fn new() -> Self {
		Self::default()
	}

	/// Set the source applied with base-replace semantics. Without one the system defaults are
	/// the baseline.
	pub fn base(mut self, source: impl SettingsSource + 'static) -> Self {
		self.base = Some(Box::new(source));
		self
	}

	/// Add a source applied with sparse-override semantics
	pub fn layer(mut self, source: impl SettingsSource + 'static) -> Self {
		self.layers.push(Box::new(source));
		self
	}

	pub fn build(&self) -> SettingsResult<DeliveryConfig> {
		let mut config = DeliveryConfig::default();

		if let Some(base) = &self.base {
			tracing::debug!(source = %base.description(), "applying base settings");
			config = config.apply(&base.load()?, MergeStrategy::BaseReplace);
		}
		for layer in &self.layers {
			tracing::debug!(source = %layer.description(), "applying settings layer");
			config = config.apply(&layer.load()?, MergeStrategy::SparseOverride);
		}

		Ok(config)
	}
}
