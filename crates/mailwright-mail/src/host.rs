//! Host environment collaborators
//!
//! Delivery asks the host for two things it cannot know itself: where the local mail
//! transfer service picks up dropped messages, and which credentials stand for "the current
//! user".

use std::fmt;
use std::path::PathBuf;

use crate::{EmailError, EmailResult};

/// Username and password for SMTP authentication
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
	pub user_name: String,
	pub password: String,
}

impl Credentials {
	/// Create a credential pair
	pub fn new(user_name: impl Into<String>, password: impl Into<String>) -> Self {
		Self {
			user_name: user_name.into(),
			password: password.into(),
		}
	}
}

impl fmt::Debug for Credentials {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Credentials")
			.field("user_name", &self.user_name)
			.field("password", &"***")
			.finish()
	}
}

/// Platform services used by delivery
pub trait HostEnvironment: Send + Sync + fmt::Debug {
	/// Pickup directory of the local mail transfer service.
	///
	/// Implementations report an unavailable service as [`EmailError::Configuration`].
	fn discover_pickup_directory(&self) -> EmailResult<PathBuf>;

	/// Credentials of the current user, if the platform has any to offer.
	fn default_credentials(&self) -> Option<Credentials>;
}

/// The running host, without a discoverable pickup directory or default credentials
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHost;

impl HostEnvironment for SystemHost {
	fn discover_pickup_directory(&self) -> EmailResult<PathBuf> {
		Err(EmailError::Configuration(
			"pickup directory discovery is not supported on this host".to_string(),
		))
	}

	fn default_credentials(&self) -> Option<Credentials> {
		None
	}
}

/// Host with fixed answers
#[derive(Debug, Clone, Default)]
pub struct StaticHost {
	pickup_directory: Option<PathBuf>,
	credentials: Option<Credentials>,
}

impl StaticHost {
	/// Create a host with no pickup directory and no default credentials
	///
	/// # Examples
	///
	/// ```
	/// use mailwright_mail::{Credentials, HostEnvironment, StaticHost};
	///
	/// let host = StaticHost::new()
	/// 	.with_pickup_directory("/var/spool/mail-pickup")
	/// 	.with_credentials(Credentials::new("svc", "secret"));
	/// assert!(host.discover_pickup_directory().is_ok());
	/// assert_eq!(host.default_credentials().unwrap().user_name, "svc");
	///
	/// assert!(StaticHost::new().discover_pickup_directory().is_err());
	/// ```
	pub fn new() -> Self {
		Self::default()
	}

	/// Directory returned by [`HostEnvironment::discover_pickup_directory`]
	pub fn with_pickup_directory(mut self, path: impl Into<PathBuf>) -> Self {
		self.pickup_directory = Some(path.into());
		self
	}

	/// Credentials returned by [`HostEnvironment::default_credentials`]
	pub fn with_credentials(mut self, credentials: Credentials) -> Self {
		self.credentials = Some(credentials);
		self
	}
}

impl HostEnvironment for StaticHost {
	fn discover_pickup_directory(&self) -> EmailResult<PathBuf> {
		self.pickup_directory.clone().ok_or_else(|| {
			EmailError::Configuration("host has no mail pickup directory".to_string())
		})
	}

	fn default_credentials(&self) -> Option<Credentials> {
		self.credentials.clone()
	}
}
