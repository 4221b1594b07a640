//! Delivery settings and the merge reducer
//!
//! [`MailSettings`] is the shape every source produces, with "unset" sentinels (empty string,
//! zero, `None`). [`DeliveryConfig`] is the resolved, fully populated configuration a delivery
//! client reads.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::SettingsError;

/// Host used when no source names one
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port used when no source names one
pub const DEFAULT_PORT: i32 = 25;

/// Transport timeout used when no source names one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100_000);

/// How a message leaves the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum DeliveryMethod {
	/// Transmit over SMTP
	#[default]
	Network,
	/// Drop a file into the configured pickup directory
	SpecifiedDirectory,
	/// Drop a file into the pickup directory reported by the host environment
	DiscoveredDirectory,
}

impl DeliveryMethod {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Network => "network",
			Self::SpecifiedDirectory => "specified_directory",
			Self::DiscoveredDirectory => "discovered_directory",
		}
	}
}

impl FromStr for DeliveryMethod {
	type Err = SettingsError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
			"network" => Ok(Self::Network),
			"specified_directory" | "specifiedpickupdirectory" => Ok(Self::SpecifiedDirectory),
			"discovered_directory" | "pickupdirectoryfromiis" => Ok(Self::DiscoveredDirectory),
			_ => Err(SettingsError::InvalidValue {
				key: "delivery_method".to_string(),
				value: s.to_string(),
			}),
		}
	}
}

impl TryFrom<String> for DeliveryMethod {
	type Error = SettingsError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

impl fmt::Display for DeliveryMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Transport security for network delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum SslMode {
	/// Plain connection
	#[default]
	None,
	/// Plain connection upgraded with STARTTLS
	Explicit,
	/// TLS from the first byte
	Implicit,
}

impl SslMode {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::None => "none",
			Self::Explicit => "explicit",
			Self::Implicit => "implicit",
		}
	}
}

impl FromStr for SslMode {
	type Err = SettingsError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"none" | "nossl" => Ok(Self::None),
			"explicit" | "explicitssl" | "starttls" => Ok(Self::Explicit),
			"implicit" | "implicitssl" => Ok(Self::Implicit),
			_ => Err(SettingsError::InvalidValue {
				key: "ssl_mode".to_string(),
				value: s.to_string(),
			}),
		}
	}
}

impl TryFrom<String> for SslMode {
	type Error = SettingsError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

impl fmt::Display for SslMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Settings as produced by a single source
///
/// Every field has an "unset" value: the empty string, `0`, or `None`. Sparse sources only
/// override the fields they actually set.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
	pub host: String,
	pub port: i32,
	pub delivery_method: Option<DeliveryMethod>,
	pub pickup_directory: String,
	pub user_name: String,
	pub password: String,
	pub default_credentials: Option<bool>,
	pub ssl_mode: Option<SslMode>,
	/// Transport timeout in milliseconds
	pub timeout: u64,
	pub from: String,
}

impl fmt::Debug for MailSettings {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MailSettings")
			.field("host", &self.host)
			.field("port", &self.port)
			.field("delivery_method", &self.delivery_method)
			.field("pickup_directory", &self.pickup_directory)
			.field("user_name", &self.user_name)
			.field("password", &redact(&self.password))
			.field("default_credentials", &self.default_credentials)
			.field("ssl_mode", &self.ssl_mode)
			.field("timeout", &self.timeout)
			.field("from", &self.from)
			.finish()
	}
}

/// How a source is folded into a [`DeliveryConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
	/// Overwrite every field, unset values included
	BaseReplace,
	/// Overwrite only the fields the source sets
	SparseOverride,
}

/// Resolved delivery configuration
#[derive(Clone, PartialEq, Eq)]
pub struct DeliveryConfig {
	pub host: String,
	/// `0` selects the protocol default for the SSL mode
	pub port: i32,
	pub delivery_method: DeliveryMethod,
	pub pickup_directory: String,
	pub user_name: String,
	pub password: String,
	pub use_default_credentials: bool,
	pub ssl_mode: SslMode,
	pub timeout: Duration,
	/// Sender used when a message has none
	pub from: String,
}

impl Default for DeliveryConfig {
	fn default() -> Self {
		Self {
			host: DEFAULT_HOST.to_string(),
			port: DEFAULT_PORT,
			delivery_method: DeliveryMethod::Network,
			pickup_directory: String::new(),
			user_name: String::new(),
			password: String::new(),
			use_default_credentials: true,
			ssl_mode: SslMode::None,
			timeout: DEFAULT_TIMEOUT,
			from: String::new(),
		}
	}
}

impl fmt::Debug for DeliveryConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DeliveryConfig")
			.field("host", &self.host)
			.field("port", &self.port)
			.field("delivery_method", &self.delivery_method)
			.field("pickup_directory", &self.pickup_directory)
			.field("user_name", &self.user_name)
			.field("password", &redact(&self.password))
			.field("use_default_credentials", &self.use_default_credentials)
			.field("ssl_mode", &self.ssl_mode)
			.field("timeout", &self.timeout)
			.field("from", &self.from)
			.finish()
	}
}

impl DeliveryConfig {
	/// Fold one source into this configuration.
	///
	/// # Examples
	///
	/// ```
	/// use mailwright_conf::{DeliveryConfig, MailSettings, MergeStrategy};
	///
	/// let base = DeliveryConfig::default();
	/// let sparse = MailSettings { port: 0, ..Default::default() };
	///
	/// let config = base.apply(&sparse, MergeStrategy::SparseOverride);
	/// assert_eq!(config.port, 25);
	/// ```
	pub fn apply(mut self, source: &MailSettings, strategy: MergeStrategy) -> Self {
		match strategy {
			MergeStrategy::BaseReplace => {
				self.host = source.host.clone();
				self.port = source.port;
				self.delivery_method = source.delivery_method.unwrap_or_default();
				self.pickup_directory = source.pickup_directory.clone();
				self.user_name = source.user_name.clone();
				self.password = source.password.clone();
				self.use_default_credentials = source.default_credentials.unwrap_or(true);
				self.ssl_mode = source.ssl_mode.unwrap_or_default();
				self.timeout = match source.timeout {
					0 => DEFAULT_TIMEOUT,
					ms => Duration::from_millis(ms),
				};
				self.from = source.from.clone();
			}
			MergeStrategy::SparseOverride => {
				if !source.host.is_empty() {
					self.host = source.host.clone();
				}
				if source.port > 0 {
					self.port = source.port;
				}
				if let Some(method) = source.delivery_method {
					self.delivery_method = method;
				}
				if !source.pickup_directory.is_empty() {
					self.pickup_directory = source.pickup_directory.clone();
				}
				if !source.user_name.is_empty() {
					self.user_name = source.user_name.clone();
				}
				if !source.password.is_empty() {
					self.password = source.password.clone();
				}
				if let Some(flag) = source.default_credentials {
					self.use_default_credentials = flag;
				}
				if let Some(mode) = source.ssl_mode {
					self.ssl_mode = mode;
				}
				if source.timeout > 0 {
					self.timeout = Duration::from_millis(source.timeout);
				}
				if !source.from.is_empty() {
					self.from = source.from.clone();
				}
			}
		}
		self
	}

	/// Set the SMTP host
	///
	/// # Examples
	///
	/// ```
	/// use mailwright_conf::{DeliveryConfig, SslMode};
	/// use std::time::Duration;
	///
	/// let config = DeliveryConfig::default()
	/// 	.with_host("smtp.example.com")
	/// 	.with_port(587)
	/// 	.with_ssl_mode(SslMode::Explicit)
	/// 	.with_timeout(Duration::from_secs(30));
	/// assert_eq!(config.host, "smtp.example.com");
	/// assert_eq!(config.port, 587);
	/// ```
	pub fn with_host(mut self, host: impl Into<String>) -> Self {
		self.host = host.into();
		self
	}

	/// Set the SMTP port. `0` picks the default port of the SSL mode.
	pub fn with_port(mut self, port: i32) -> Self {
		self.port = port;
		self
	}

	/// Choose between network delivery and pickup directories
	pub fn with_delivery_method(mut self, method: DeliveryMethod) -> Self {
		self.delivery_method = method;
		self
	}

	/// Set the directory used by [`DeliveryMethod::SpecifiedDirectory`]
	pub fn with_pickup_directory(mut self, path: impl Into<String>) -> Self {
		self.pickup_directory = path.into();
		self
	}

	/// Set explicit credentials and stop using the host's default ones.
	pub fn with_credentials(mut self, user_name: impl Into<String>, password: impl Into<String>) -> Self {
		self.user_name = user_name.into();
		self.password = password.into();
		self.use_default_credentials = false;
		self
	}

	/// Toggle use of the host's default credentials.
	///
	/// # Examples
	///
	/// ```
	/// use mailwright_conf::DeliveryConfig;
	///
	/// let config = DeliveryConfig::default().with_credentials("user", "secret");
	/// assert!(!config.use_default_credentials);
	/// assert!(config.has_explicit_credentials());
	///
	/// let config = config.with_default_credentials(true);
	/// assert!(config.use_default_credentials);
	/// ```
	pub fn with_default_credentials(mut self, enabled: bool) -> Self {
		self.use_default_credentials = enabled;
		self
	}

	/// Set the TLS mode
	pub fn with_ssl_mode(mut self, mode: SslMode) -> Self {
		self.ssl_mode = mode;
		self
	}

	/// Set the deadline for one whole SMTP transmission
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	/// Set the sender used for messages that have none
	pub fn with_from(mut self, from: impl Into<String>) -> Self {
		self.from = from.into();
		self
	}

	/// Explicit credentials are usable only when both halves are present.
	pub fn has_explicit_credentials(&self) -> bool {
		!self.user_name.is_empty() && !self.password.is_empty()
	}
}

fn redact(secret: &str) -> &'static str {
	if secret.is_empty() { "" } else { "***" }
}
