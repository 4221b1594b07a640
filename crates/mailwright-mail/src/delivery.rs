//! Delivery
//!
//! A [`MailClient`] hands a [`ComposedMessage`] either to a pickup directory or to an SMTP
//! server. The decision sequence is the same for every backend:
//!
//! 1. A message without a sender gets the configured default `From`.
//! 2. Host and port are validated.
//! 3. The pickup directory is resolved from the delivery method.
//! 4. With a pickup directory, the rendered message is written to `<uuid>.eml` there.
//! 5. Otherwise the message is transmitted over SMTP.
//!
//! Only failures of the final write or transmit step honor `ignore_errors_when_sending`.

use async_trait::async_trait;
use mailwright_conf::{DEFAULT_TIMEOUT, DeliveryConfig, DeliveryMethod, SslMode};
use std::borrow::Cow;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::backends::{Backend, mail_builder};
use crate::compose::MailBuilder;
use crate::host::{Credentials, HostEnvironment};
use crate::message::{ComposedMessage, EmailAddress};
use crate::policy::BuilderPolicy;
use crate::{EmailError, EmailResult};

/// Delivery interface implemented by every backend
#[async_trait]
pub trait MailClient: Send + Sync {
	fn backend(&self) -> Backend;

	fn config(&self) -> &DeliveryConfig;

	/// A composer of this client's backend, using the process-wide policy.
	fn mail_builder(&self) -> Box<dyn MailBuilder> {
		mail_builder(self.backend(), BuilderPolicy::global())
	}

	/// Deliver `message`.
	///
	/// With `ignore_errors_when_sending`, a failure of the pickup write or of the SMTP
	/// transmission is logged and swallowed. Configuration, connection and rendering errors
	/// are returned regardless.
	async fn send(
		&self,
		message: &ComposedMessage,
		ignore_errors_when_sending: bool,
	) -> EmailResult<()>;
}

/// Backend hooks used by [`deliver`]
#[async_trait]
pub(crate) trait Transport: Send + Sync {
	/// Render the message for a file, `Bcc` header included.
	fn render(&self, message: &ComposedMessage) -> EmailResult<Vec<u8>>;

	/// Connect, authenticate and transmit.
	///
	/// Connect and authentication failures are reported as [`EmailError::Connection`],
	/// failures after the session is established and timeouts as [`EmailError::SendFailure`].
	async fn transmit(&self, target: &SmtpTarget, message: &ComposedMessage) -> EmailResult<()>;
}

/// Resolved SMTP endpoint and authentication for one transmission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpTarget {
	pub host: String,
	pub port: u16,
	pub ssl_mode: SslMode,
	/// `None` sends anonymously
	pub credentials: Option<Credentials>,
	pub timeout: Duration,
}

impl SmtpTarget {
	/// Resolve the endpoint from `config`.
	///
	/// Default credentials come from `host` when `use_default_credentials` is set. Otherwise
	/// explicit credentials are used only when both user name and password are present.
	pub fn from_config(config: &DeliveryConfig, host: &dyn HostEnvironment) -> EmailResult<Self> {
		let port = validate_endpoint(config)?;

		let credentials = if config.use_default_credentials {
			if config.has_explicit_credentials() {
				warn!(
					user_name = %config.user_name,
					"explicit credentials ignored, default credentials are in effect"
				);
			}
			host.default_credentials()
		} else if config.has_explicit_credentials() {
			Some(Credentials::new(&config.user_name, &config.password))
		} else {
			None
		};

		let timeout = if config.timeout.is_zero() {
			DEFAULT_TIMEOUT
		} else {
			config.timeout
		};

		Ok(Self {
			host: config.host.trim().to_string(),
			port: resolve_port(port, config.ssl_mode),
			ssl_mode: config.ssl_mode,
			credentials,
			timeout,
		})
	}
}

/// Port used for a connection: `0` stands for the protocol default of the SSL mode.
///
/// # Examples
///
/// ```
/// use mailwright_conf::SslMode;
/// use mailwright_mail::resolve_port;
///
/// assert_eq!(resolve_port(0, SslMode::None), 25);
/// assert_eq!(resolve_port(0, SslMode::Explicit), 25);
/// assert_eq!(resolve_port(0, SslMode::Implicit), 465);
/// assert_eq!(resolve_port(2525, SslMode::Implicit), 2525);
/// ```
pub fn resolve_port(port: u16, ssl_mode: SslMode) -> u16 {
	match (port, ssl_mode) {
		(0, SslMode::Implicit) => 465,
		(0, SslMode::None | SslMode::Explicit) => 25,
		(port, _) => port,
	}
}

/// Run the delivery sequence through `transport`.
pub(crate) async fn deliver(
	transport: &dyn Transport,
	config: &DeliveryConfig,
	host: &dyn HostEnvironment,
	message: &ComposedMessage,
	ignore_errors_when_sending: bool,
) -> EmailResult<()> {
	let message = with_default_from(config, message)?;
	validate_endpoint(config)?;

	match resolve_pickup_directory(config, host)? {
		Some(directory) => {
			let written = write_pickup_file(transport, &directory, &message)
				.await
				.map(|path| info!(path = %path.display(), "message written to pickup directory"));
			suppress(written, ignore_errors_when_sending)
		}
		None => {
			let target = SmtpTarget::from_config(config, host)?;
			debug!(
				host = %target.host,
				port = target.port,
				ssl_mode = target.ssl_mode.as_str(),
				authenticated = target.credentials.is_some(),
				"transmitting message"
			);
			let transmitted = transport
				.transmit(&target, &message)
				.await
				.map(|()| info!(host = %target.host, port = target.port, "message transmitted"));
			suppress(transmitted, ignore_errors_when_sending)
		}
	}
}

/// Bound `operation` by `timeout`. Expiry counts as a send failure.
pub(crate) async fn with_timeout<T>(
	timeout: Duration,
	operation: impl Future<Output = EmailResult<T>>,
) -> EmailResult<T> {
	tokio::time::timeout(timeout, operation)
		.await
		.map_err(|_| EmailError::SendFailure(format!("timed out after {:?}", timeout)))?
}

fn with_default_from<'m>(
	config: &DeliveryConfig,
	message: &'m ComposedMessage,
) -> EmailResult<Cow<'m, ComposedMessage>> {
	if message.from_address().is_some() || config.from.trim().is_empty() {
		return Ok(Cow::Borrowed(message));
	}

	let from = EmailAddress::parse(&config.from).map_err(|e| {
		EmailError::Configuration(format!("default From address is invalid: {}", e))
	})?;
	Ok(Cow::Owned(message.clone().with_from(from)))
}

fn validate_endpoint(config: &DeliveryConfig) -> EmailResult<u16> {
	if config.host.trim().is_empty() {
		return Err(EmailError::Configuration("SMTP host is empty".to_string()));
	}
	u16::try_from(config.port).map_err(|_| {
		EmailError::Configuration(format!(
			"SMTP port {} is outside 0..=65535",
			config.port
		))
	})
}

fn resolve_pickup_directory(
	config: &DeliveryConfig,
	host: &dyn HostEnvironment,
) -> EmailResult<Option<PathBuf>> {
	let directory = match config.delivery_method {
		DeliveryMethod::Network => return Ok(None),
		DeliveryMethod::SpecifiedDirectory => PathBuf::from(&config.pickup_directory),
		DeliveryMethod::DiscoveredDirectory => {
			host.discover_pickup_directory().map_err(|e| match e {
				EmailError::Configuration(_) => e,
				other => EmailError::Configuration(format!(
					"pickup directory discovery failed: {}",
					other
				)),
			})?
		}
	};

	if directory.to_string_lossy().trim().is_empty() {
		warn!(
			method = config.delivery_method.as_str(),
			"pickup directory is empty, falling back to network delivery"
		);
		return Ok(None);
	}
	if !directory.is_absolute() {
		return Err(EmailError::Configuration(format!(
			"pickup directory {} is not an absolute path",
			directory.display()
		)));
	}
	Ok(Some(directory))
}

async fn write_pickup_file(
	transport: &dyn Transport,
	directory: &Path,
	message: &ComposedMessage,
) -> EmailResult<PathBuf> {
	let content = transport.render(message)?;
	let path = directory.join(format!("{}.eml", uuid::Uuid::new_v4()));
	let write_failure =
		|e: std::io::Error| EmailError::SendFailure(format!("{}: {}", path.display(), e));

	let mut file = tokio::fs::OpenOptions::new()
		.write(true)
		.create_new(true)
		.open(&path)
		.await
		.map_err(write_failure)?;
	file.write_all(&content).await.map_err(write_failure)?;
	file.flush().await.map_err(write_failure)?;

	Ok(path)
}

fn suppress(result: EmailResult<()>, ignore_errors_when_sending: bool) -> EmailResult<()> {
	match result {
		Err(err) if ignore_errors_when_sending && err.is_suppressible() => {
			warn!(error = %err, "send failure ignored");
			Ok(())
		}
		other => other,
	}
}
