//! # Mailwright Mail
//!
//! Mail composition and delivery over two interchangeable backends.
//!
//! ## Features
//!
//! ### Composition
//! - **MailBuilder**: recipients, subject normalization, HTML and text views
//! - **HTML repair**: empty HTML bodies become a minimal valid document
//! - **Subject from title**: the `<title>` of the HTML body fills an empty subject
//! - **Logo resource**: a configured logo is attached when the HTML references its `cid:`
//! - **CSS inlining**: a default stylesheet is injected into `<head>` and inlined
//! - **Attachment names**: trimmed, accent-stripped and shortened with the extension kept
//!
//! ### Delivery
//! - **Pickup directory**: write a `.eml` file instead of sending
//! - **SMTP**: plain, STARTTLS and implicit TLS with optional authentication
//! - **Partial-failure control**: `ignore_errors_when_sending` swallows send failures
//!   while configuration and connection errors always surface
//!
//! ### Backends
//! - [`Backend::Lettre`]: rendering and transport through `lettre`
//! - [`Backend::MailSend`]: rendering through `mail-builder`, transport through `mail-send`
//!
//! ## Examples
//!
//! ### Composing a message
//!
//! ```rust
//! use mailwright_mail::{Backend, BuilderPolicy, MailBuilder, mail_builder};
//! use std::sync::Arc;
//!
//! let mut builder = mail_builder(Backend::Lettre, Arc::new(BuilderPolicy::default()));
//! builder.set_from("Reports <reports@example.com>")?;
//! builder.add_to(&["user@example.com"])?;
//! builder.set_html_body("<html><head><title>Monthly report</title></head><body/></html>")?;
//!
//! let message = builder.build();
//! assert_eq!(message.subject(), "Monthly report");
//! # Ok::<(), mailwright_mail::EmailError>(())
//! ```
//!
//! ### Dropping a message into a pickup directory
//!
//! ```rust,no_run
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use mailwright_conf::{DeliveryConfig, DeliveryMethod};
//! use mailwright_mail::{Backend, MailBuilder, MailClient, SystemHost, mail_client};
//! use std::sync::Arc;
//!
//! let config = DeliveryConfig::default()
//!     .with_delivery_method(DeliveryMethod::SpecifiedDirectory)
//!     .with_pickup_directory("/var/spool/mail-out");
//! let client = mail_client(Backend::MailSend, config, Arc::new(SystemHost));
//!
//! let mut builder = client.mail_builder();
//! builder.set_from("noreply@example.com")?;
//! builder.add_to(&["user@example.com"])?;
//! builder.set_text_body("Hello");
//!
//! client.send(&builder.build(), false).await?;
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod compose;
pub mod delivery;
pub mod host;
pub mod html;
pub mod inliner;
pub mod message;
pub mod policy;
pub mod text;

use thiserror::Error;

pub use backends::{
	Backend, LettreMailBuilder, LettreMailClient, MailSendMailBuilder, MailSendMailClient,
	mail_builder, mail_client,
};
pub use compose::{Draft, MailBuilder};
pub use delivery::{MailClient, SmtpTarget, resolve_port};
pub use host::{Credentials, HostEnvironment, StaticHost, SystemHost};
pub use inliner::{CssInliner, PassthroughInliner, default_inliner};
#[cfg(feature = "css-inline")]
pub use inliner::CssInlineInliner;
pub use message::{
	AlternateView, Attachment, ComposedMessage, EmailAddress, LinkedResource, RecipientKind,
	ViewKind,
};
pub use policy::BuilderPolicy;

#[derive(Debug, Error)]
pub enum EmailError {
	#[error("Configuration error: {0}")]
	Configuration(String),

	#[error("Invalid email address: {0}")]
	InvalidAddress(String),

	#[error("Invalid content: {0}")]
	InvalidContent(String),

	#[error("HTML parse error: {0}")]
	HtmlParse(String),

	#[error("Missing required field: {0}")]
	MissingField(String),

	#[error("Render error: {0}")]
	Render(String),

	#[error("Connection error: {0}")]
	Connection(String),

	#[error("Send failure: {0}")]
	SendFailure(String),
}

impl EmailError {
	/// Whether `ignore_errors_when_sending` may swallow this error.
	///
	/// Only failures of the final write or transmit step qualify. Configuration and
	/// connection problems always reach the caller.
	pub fn is_suppressible(&self) -> bool {
		matches!(self, Self::SendFailure(_))
	}
}

impl From<mailwright_conf::SettingsError> for EmailError {
	fn from(err: mailwright_conf::SettingsError) -> Self {
		Self::Configuration(err.to_string())
	}
}

pub type EmailResult<T> = std::result::Result<T, EmailError>;
