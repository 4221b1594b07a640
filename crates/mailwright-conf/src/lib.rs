//! # Mailwright Configuration
//!
//! Layered delivery settings for mailwright.
//!
//! A delivery client is configured from one "full defaults" source followed by any number of
//! sparse sources that change only the fields they set:
//!
//! ```rust
//! use mailwright_conf::{DeliveryConfigBuilder, MailSettings, SslMode, StaticSource};
//!
//! let base = MailSettings {
//! 	host: "smtp.example.com".to_string(),
//! 	port: 25,
//! 	..Default::default()
//! };
//! let tls = MailSettings {
//! 	port: 465,
//! 	ssl_mode: Some(SslMode::Implicit),
//! 	..Default::default()
//! };
//!
//! let config = DeliveryConfigBuilder::new()
//! 	.base(StaticSource::new(base))
//! 	.layer(StaticSource::new(tls))
//! 	.build()
//! 	.unwrap();
//!
//! assert_eq!(config.host, "smtp.example.com");
//! assert_eq!(config.port, 465);
//! assert_eq!(config.ssl_mode, SslMode::Implicit);
//! ```
//!
//! ## Module Organization
//!
//! - [`settings`]: the source shape, the resolved configuration and the merge reducer
//! - [`sources`]: TOML, environment and in-memory sources plus the layering builder

pub mod settings;
pub mod sources;

pub use settings::{
	DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TIMEOUT, DeliveryConfig, DeliveryMethod, MailSettings,
	MergeStrategy, SslMode,
};
pub use sources::{DeliveryConfigBuilder, EnvSource, SettingsSource, StaticSource, TomlFileSource};

/// Error type for loading delivery settings
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("IO error reading {path}: {source}")]
	Io {
		path: String,
		#[source]
		source: std::io::Error,
	},

	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("Invalid value for {key}: {value}")]
	InvalidValue { key: String, value: String },

	#[error("Invalid source: {0}")]
	InvalidSource(String),
}

/// Result type for settings operations
pub type SettingsResult<T> = Result<T, SettingsError>;
