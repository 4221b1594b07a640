//! # Mailwright
//!
//! Mail composition and delivery.
//!
//! Mailwright builds multipart messages (HTML and text views, inline resources, attachments),
//! repairs and normalizes their content so it renders the same across mail clients, and
//! delivers them either into a pickup directory or over SMTP.
//!
//! ## Feature Flags
//!
//! - `conf` - layered delivery configuration (TOML files, environment, in-memory)
//! - `mail` - composers, delivery clients and the `lettre` / `mail-send` backends
//! - `css-inline` - default CSS inliner backed by the `css-inline` crate
//! - `full` (default) - all of the above
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use mailwright::prelude::*;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DeliveryConfigBuilder::new()
//!     .base(TomlFileSource::new("mail.toml").with_table("mail"))
//!     .layer(EnvSource::new())
//!     .build()?;
//!
//! let client = mail_client(Backend::Lettre, config, Arc::new(SystemHost));
//! let mut builder = client.mail_builder();
//! builder.set_from("Reports <reports@example.com>")?;
//! builder.add_to(&["team@example.com"])?;
//! builder.set_html_body("<html><head><title>Weekly report</title></head><body/></html>")?;
//!
//! client.send(&builder.build(), false).await?;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "conf")]
pub use mailwright_conf as conf;
#[cfg(feature = "mail")]
pub use mailwright_mail as mail;

#[cfg(feature = "conf")]
pub use mailwright_conf::{
	DeliveryConfig, DeliveryConfigBuilder, DeliveryMethod, MailSettings, MergeStrategy,
	SettingsError, SslMode,
};

#[cfg(feature = "mail")]
pub use mailwright_mail::{
	Backend, BuilderPolicy, ComposedMessage, EmailError, EmailResult, MailBuilder, MailClient,
	mail_builder, mail_client,
};

/// Commonly used types
pub mod prelude {
	#[cfg(feature = "conf")]
	pub use mailwright_conf::{
		DeliveryConfig, DeliveryConfigBuilder, DeliveryMethod, EnvSource, SettingsSource,
		SslMode, StaticSource, TomlFileSource,
	};

	#[cfg(feature = "mail")]
	pub use mailwright_mail::{
		Backend, BuilderPolicy, ComposedMessage, Credentials, EmailError, HostEnvironment,
		MailBuilder, MailClient, RecipientKind, StaticHost, SystemHost, mail_builder,
		mail_client,
	};
}
