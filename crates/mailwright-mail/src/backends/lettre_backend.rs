//! Backend built on `lettre`

use async_trait::async_trait;
use lettre::message::header::{ContentDisposition, ContentId, ContentType};
use lettre::message::{
	Attachment as LettreAttachment, Mailbox, MultiPart, MultiPartBuilder, SinglePart,
};
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use mailwright_conf::{DeliveryConfig, SslMode};
use std::sync::Arc;
use tracing::debug;

use super::{Backend, MimeNode, MultipartKind, body_layout};
use crate::compose::{Draft, MailBuilder};
use crate::delivery::{MailClient, SmtpTarget, Transport, deliver, with_timeout};
use crate::host::HostEnvironment;
use crate::inliner::{CssInliner, default_inliner};
use crate::message::{ComposedMessage, EmailAddress};
use crate::policy::BuilderPolicy;
use crate::{EmailError, EmailResult};

/// Composer rendering through [`lettre::Message`]
///
/// # Examples
///
/// ```
/// use mailwright_mail::{BuilderPolicy, LettreMailBuilder, MailBuilder};
/// use std::sync::Arc;
///
/// let mut builder = LettreMailBuilder::new(Arc::new(BuilderPolicy::default()));
/// builder.set_from("sender@example.com")?;
/// builder.add_to(&["rcpt@example.com"])?;
/// builder.add_bcc(&["audit@example.com"])?;
/// builder.set_text_body("Hello");
///
/// let raw = String::from_utf8(builder.serialize()?).unwrap();
/// assert!(raw.contains("Bcc: audit@example.com"));
/// # Ok::<(), mailwright_mail::EmailError>(())
/// ```
#[derive(Debug, Clone)]
pub struct LettreMailBuilder {
	draft: Draft,
}

impl LettreMailBuilder {
	/// Create a composer using [`default_inliner`]
	pub fn new(policy: Arc<BuilderPolicy>) -> Self {
		Self::with_inliner(policy, default_inliner())
	}

	/// Create a composer that inlines CSS with `inliner`
	pub fn with_inliner(policy: Arc<BuilderPolicy>, inliner: Arc<dyn CssInliner>) -> Self {
		Self::from_draft(Draft::new(policy, inliner))
	}

	pub(crate) fn from_draft(draft: Draft) -> Self {
		Self { draft }
	}
}

impl MailBuilder for LettreMailBuilder {
	fn backend(&self) -> Backend {
		Backend::Lettre
	}

	fn draft(&self) -> &Draft {
		&self.draft
	}

	fn draft_mut(&mut self) -> &mut Draft {
		&mut self.draft
	}

	fn render(&self, message: &ComposedMessage) -> EmailResult<Vec<u8>> {
		render(message)
	}
}

/// Delivery client transmitting through [`AsyncSmtpTransport`]
#[derive(Debug, Clone)]
pub struct LettreMailClient {
	config: DeliveryConfig,
	host: Arc<dyn HostEnvironment>,
}

impl LettreMailClient {
	/// Create a client for `config`. `host` answers pickup directory and default
	/// credential lookups.
	pub fn new(config: DeliveryConfig, host: Arc<dyn HostEnvironment>) -> Self {
		Self { config, host }
	}
}

#[async_trait]
impl MailClient for LettreMailClient {
	fn backend(&self) -> Backend {
		Backend::Lettre
	}

	fn config(&self) -> &DeliveryConfig {
		&self.config
	}

	async fn send(
		&self,
		message: &ComposedMessage,
		ignore_errors_when_sending: bool,
	) -> EmailResult<()> {
		deliver(
			&LettreTransport,
			&self.config,
			self.host.as_ref(),
			message,
			ignore_errors_when_sending,
		)
		.await
	}
}

struct LettreTransport;

#[async_trait]
impl Transport for LettreTransport {
	fn render(&self, message: &ComposedMessage) -> EmailResult<Vec<u8>> {
		render(message)
	}

	async fn transmit(&self, target: &SmtpTarget, message: &ComposedMessage) -> EmailResult<()> {
		let email = build_message(message, false)?;
		let transport = smtp_transport(target)?;

		with_timeout(target.timeout, async move {
			match transport.test_connection().await {
				Ok(true) => {}
				Ok(false) => {
					return Err(EmailError::Connection(format!(
						"{}:{} did not accept the session",
						target.host, target.port
					)));
				}
				Err(e) => return Err(EmailError::Connection(e.to_string())),
			}
			debug!(host = %target.host, port = target.port, "SMTP session established");

			transport
				.send(email)
				.await
				.map(|_| ())
				.map_err(|e| EmailError::SendFailure(e.to_string()))
		})
		.await
	}
}

fn render(message: &ComposedMessage) -> EmailResult<Vec<u8>> {
	Ok(build_message(message, true)?.formatted())
}

fn build_message(message: &ComposedMessage, keep_bcc: bool) -> EmailResult<Message> {
	let from = message.ensure_deliverable()?;

	let mut builder = Message::builder()
		.from(mailbox(from)?)
		.subject(message.subject());
	for address in message.to() {
		builder = builder.to(mailbox(address)?);
	}
	for address in message.cc() {
		builder = builder.cc(mailbox(address)?);
	}
	for address in message.bcc() {
		builder = builder.bcc(mailbox(address)?);
	}
	if keep_bcc {
		builder = builder.keep_bcc();
	}

	let built = match body_layout(message) {
		None => builder.body(String::new()),
		Some(layout) => match to_part(layout)? {
			Part::Single(part) => builder.singlepart(part),
			Part::Multi(part) => builder.multipart(part),
		},
	};
	built.map_err(|e| EmailError::Render(e.to_string()))
}

fn mailbox(address: &EmailAddress) -> EmailResult<Mailbox> {
	let email = address
		.address()
		.parse()
		.map_err(|e| EmailError::InvalidAddress(format!("{}: {}", address.address(), e)))?;
	Ok(Mailbox::new(address.name().map(str::to_string), email))
}

enum Part {
	Single(SinglePart),
	Multi(MultiPart),
}

fn to_part(node: MimeNode<'_>) -> EmailResult<Part> {
	let part = match node {
		MimeNode::Text(text) => Part::Single(SinglePart::plain(text.to_string())),
		MimeNode::Html(html) => Part::Single(SinglePart::html(html.to_string())),
		MimeNode::Inline(resource) => Part::Single(
			LettreAttachment::new_inline(resource.effective_content_id().to_string()).body(
				resource.content().to_vec(),
				content_type(resource.content_type())?,
			),
		),
		MimeNode::Attachment(attachment) => {
			let mut part = SinglePart::builder()
				.header(content_type(attachment.mime_type())?)
				.header(ContentDisposition::attachment(attachment.filename()));
			if let Some(cid) = attachment.content_id() {
				part = part.header(ContentId::from(format!("<{}>", cid)));
			}
			Part::Single(part.body(attachment.content().to_vec()))
		}
		MimeNode::Multipart { kind, parts } => Part::Multi(multipart(kind, parts)?),
	};
	Ok(part)
}

fn multipart(kind: MultipartKind, parts: Vec<MimeNode<'_>>) -> EmailResult<MultiPart> {
	let builder: MultiPartBuilder = match kind {
		MultipartKind::Mixed => MultiPart::mixed(),
		MultipartKind::Alternative => MultiPart::alternative(),
		MultipartKind::Related => MultiPart::related(),
	};

	let mut parts = parts.into_iter();
	let first = parts.next().ok_or_else(|| {
		EmailError::Render(format!("{} without parts", kind.content_type()))
	})?;
	let mut multipart = match to_part(first)? {
		Part::Single(part) => builder.singlepart(part),
		Part::Multi(part) => builder.multipart(part),
	};
	for node in parts {
		multipart = match to_part(node)? {
			Part::Single(part) => multipart.singlepart(part),
			Part::Multi(part) => multipart.multipart(part),
		};
	}
	Ok(multipart)
}

fn content_type(value: &str) -> EmailResult<ContentType> {
	ContentType::parse(value)
		.map_err(|e| EmailError::Render(format!("content type {}: {}", value, e)))
}

fn smtp_transport(target: &SmtpTarget) -> EmailResult<AsyncSmtpTransport<Tokio1Executor>> {
	let builder = match target.ssl_mode {
		SslMode::None => {
			AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(target.host.as_str())
		}
		SslMode::Explicit => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&target.host)
			.map_err(|e| EmailError::Configuration(format!("TLS setup failed: {}", e)))?,
		SslMode::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(&target.host)
			.map_err(|e| EmailError::Configuration(format!("TLS setup failed: {}", e)))?,
	};

	// The deadline is enforced around the whole transmission by `with_timeout`.
	let mut builder = builder.port(target.port).timeout(None);
	if let Some(credentials) = &target.credentials {
		builder = builder.credentials(SmtpCredentials::new(
			credentials.user_name.clone(),
			credentials.password.clone(),
		));
	}
	Ok(builder.build())
}
