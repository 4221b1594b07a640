//! Backend built on `mail-builder` and `mail-send`

use async_trait::async_trait;
use mail_send::mail_builder::MessageBuilder;
use mail_send::mail_builder::headers::address::Address;
use mail_send::mail_builder::mime::{BodyPart, MimePart};
use mail_send::smtp::message::Message as SmtpMessage;
use mail_send::{SmtpClient, SmtpClientBuilder};
use mailwright_conf::{DeliveryConfig, SslMode};
use std::borrow::Cow;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::{Backend, MimeNode, body_layout};
use crate::compose::{Draft, MailBuilder};
use crate::delivery::{MailClient, SmtpTarget, Transport, deliver, with_timeout};
use crate::host::HostEnvironment;
use crate::inliner::{CssInliner, default_inliner};
use crate::message::{ComposedMessage, EmailAddress};
use crate::policy::BuilderPolicy;
use crate::{EmailError, EmailResult};

/// Composer rendering through `mail-builder`
#[derive(Debug, Clone)]
pub struct MailSendMailBuilder {
	draft: Draft,
}

impl MailSendMailBuilder {
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

impl MailBuilder for MailSendMailBuilder {
	fn backend(&self) -> Backend {
		Backend::MailSend
	}

	fn draft(&self) -> &Draft {
		&self.draft
	}

	fn draft_mut(&mut self) -> &mut Draft {
		&mut self.draft
	}

	fn render(&self, message: &ComposedMessage) -> EmailResult<Vec<u8>> {
		render(message, true)
	}
}

/// Delivery client transmitting through `mail-send`'s SMTP client
#[derive(Debug, Clone)]
pub struct MailSendMailClient {
	config: DeliveryConfig,
	host: Arc<dyn HostEnvironment>,
}

impl MailSendMailClient {
	/// Create a client for `config`. `host` answers pickup directory and default
	/// credential lookups.
	pub fn new(config: DeliveryConfig, host: Arc<dyn HostEnvironment>) -> Self {
		Self { config, host }
	}
}

#[async_trait]
impl MailClient for MailSendMailClient {
	fn backend(&self) -> Backend {
		Backend::MailSend
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
			&MailSendTransport,
			&self.config,
			self.host.as_ref(),
			message,
			ignore_errors_when_sending,
		)
		.await
	}
}

struct MailSendTransport;

#[async_trait]
impl Transport for MailSendTransport {
	fn render(&self, message: &ComposedMessage) -> EmailResult<Vec<u8>> {
		render(message, true)
	}

	async fn transmit(&self, target: &SmtpTarget, message: &ComposedMessage) -> EmailResult<()> {
		let from = message.ensure_deliverable()?.address();
		let body = render(message, false)?;
		let envelope = SmtpMessage::new(
			from,
			message.recipients().map(EmailAddress::address),
			body,
		);

		let mut builder: SmtpClientBuilder<String> =
			SmtpClientBuilder::new(target.host.clone(), target.port)
				.implicit_tls(target.ssl_mode == SslMode::Implicit)
				.timeout(target.timeout);
		if let Some(credentials) = &target.credentials {
			builder = builder.credentials((
				credentials.user_name.clone(),
				credentials.password.clone(),
			));
		}

		with_timeout(target.timeout, async move {
			match target.ssl_mode {
				SslMode::None => {
					let client = builder.connect_plain().await.map_err(connect_error)?;
					send_with(client, envelope).await
				}
				SslMode::Explicit | SslMode::Implicit => {
					let client = builder.connect().await.map_err(connect_error)?;
					send_with(client, envelope).await
				}
			}
		})
		.await
	}
}

async fn send_with<T>(mut client: SmtpClient<T>, envelope: SmtpMessage<'_>) -> EmailResult<()>
where
	T: AsyncRead + AsyncWrite + Unpin,
{
	client
		.send(envelope)
		.await
		.map_err(|e| EmailError::SendFailure(e.to_string()))?;
	if let Err(e) = client.quit().await {
		debug!(error = %e, "SMTP QUIT failed after delivery");
	}
	Ok(())
}

fn connect_error(err: mail_send::Error) -> EmailError {
	match err {
		mail_send::Error::Timeout => EmailError::SendFailure(err.to_string()),
		other => EmailError::Connection(other.to_string()),
	}
}

fn render(message: &ComposedMessage, keep_bcc: bool) -> EmailResult<Vec<u8>> {
	let from = message.ensure_deliverable()?;

	let mut builder = MessageBuilder::new()
		.from(address(from))
		.subject(message.subject());
	if !message.to().is_empty() {
		builder = builder.to(address_list(message.to()));
	}
	if !message.cc().is_empty() {
		builder = builder.cc(address_list(message.cc()));
	}
	if keep_bcc && !message.bcc().is_empty() {
		builder = builder.bcc(address_list(message.bcc()));
	}

	let body = match body_layout(message) {
		Some(layout) => to_part(layout),
		None => MimePart::new("text/plain", ""),
	};

	builder
		.body(body)
		.write_to_vec()
		.map_err(|e| EmailError::Render(e.to_string()))
}

fn address(address: &EmailAddress) -> Address<'static> {
	match address.name() {
		Some(name) => Address::from((name.to_string(), address.address().to_string())),
		None => Address::from(address.address().to_string()),
	}
}

fn address_list(addresses: &[EmailAddress]) -> Address<'static> {
	match addresses {
		[single] => address(single),
		_ => Address::new_list(addresses.iter().map(address).collect()),
	}
}

fn to_part(node: MimeNode<'_>) -> MimePart<'_> {
	match node {
		MimeNode::Text(text) => MimePart::new("text/plain", text),
		MimeNode::Html(html) => MimePart::new("text/html", html),
		MimeNode::Inline(resource) => MimePart::new(
			resource.content_type(),
			BodyPart::Binary(Cow::Borrowed(resource.content().as_ref())),
		)
		.inline()
		.cid(resource.effective_content_id()),
		MimeNode::Attachment(attachment) => {
			let part = MimePart::new(
				attachment.mime_type(),
				BodyPart::Binary(Cow::Borrowed(attachment.content().as_ref())),
			)
			.attachment(attachment.filename());
			match attachment.content_id() {
				Some(cid) => part.cid(cid),
				None => part,
			}
		}
		MimeNode::Multipart { kind, parts } => MimePart::new(
			kind.content_type(),
			parts.into_iter().map(to_part).collect::<Vec<_>>(),
		),
	}
}
