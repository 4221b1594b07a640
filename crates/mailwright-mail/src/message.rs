use bytes::Bytes;
use lettre::message::Mailbox;
use std::fmt;

use crate::{EmailError, EmailResult};

/// A parsed mailbox: optional display name plus address
///
/// # Examples
///
/// ```
/// use mailwright_mail::EmailAddress;
///
/// let address = EmailAddress::new(Some("Jane Doe".to_string()), "jane@example.com");
/// assert_eq!(address.to_string(), "\"Jane Doe\" <jane@example.com>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress {
	name: Option<String>,
	address: String,
}

impl EmailAddress {
	/// Create an address without validation. A blank name is dropped.
	pub fn new(name: Option<String>, address: impl Into<String>) -> Self {
		Self {
			name: name.filter(|n| !n.trim().is_empty()),
			address: address.into(),
		}
	}

	/// Parse one mailbox, `addr` or `Name <addr>`, ignoring surrounding whitespace.
	///
	/// Both backends accept exactly the addresses this accepts. A display name holding a
	/// comma must be quoted.
	///
	/// # Examples
	///
	/// ```
	/// use mailwright_mail::EmailAddress;
	///
	/// let parsed = EmailAddress::parse("\"Doe, Jane\" <jane@example.com>")?;
	/// assert_eq!(parsed.name(), Some("Doe, Jane"));
	/// assert_eq!(parsed.address(), "jane@example.com");
	///
	/// assert!(EmailAddress::parse("Doe, Jane <jane@example.com>").is_err());
	/// # Ok::<(), mailwright_mail::EmailError>(())
	/// ```
	pub fn parse(address: &str) -> EmailResult<Self> {
		let mailbox: Mailbox = address
			.trim()
			.parse()
			.map_err(|e| EmailError::InvalidAddress(format!("{}: {}", address, e)))?;
		Ok(Self::new(mailbox.name, mailbox.email.to_string()))
	}

	/// Display name, if any
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	/// The bare `local@domain` part
	pub fn address(&self) -> &str {
		&self.address
	}
}

impl fmt::Display for EmailAddress {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.name {
			Some(name) => write!(f, "\"{}\" <{}>", name.replace('"', "\\\""), self.address),
			None => f.write_str(&self.address),
		}
	}
}

/// Recipient list an address is added to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecipientKind {
	To,
	Cc,
	Bcc,
}

/// Represents a file attachment for an email message.
///
/// The MIME type is detected from the file name.
///
/// # Examples
///
/// ```
/// use mailwright_mail::Attachment;
///
/// let attachment = Attachment::new("report.pdf", b"%PDF-1.7".to_vec());
/// assert_eq!(attachment.filename(), "report.pdf");
/// assert_eq!(attachment.mime_type(), "application/pdf");
/// assert_eq!(attachment.content_id(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
	filename: String,
	content: Bytes,
	mime_type: String,
	/// Content-ID, for attachments referenced from the HTML body
	content_id: Option<String>,
}

impl Attachment {
	pub fn new(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
		let filename = filename.into();
		let mime_type = Self::detect_mime_type(&filename);

		Self {
			filename,
			content: content.into(),
			mime_type,
			content_id: None,
		}
	}

	/// Set the Content-ID the HTML body can reference
	pub fn with_content_id(mut self, content_id: impl Into<String>) -> Self {
		self.content_id = Some(content_id.into());
		self
	}

	pub fn filename(&self) -> &str {
		&self.filename
	}

	pub fn content(&self) -> &Bytes {
		&self.content
	}

	pub fn mime_type(&self) -> &str {
		&self.mime_type
	}

	pub fn content_id(&self) -> Option<&str> {
		self.content_id.as_deref()
	}

	/// Detect MIME type from filename
	fn detect_mime_type(filename: &str) -> String {
		mime_guess::from_path(filename)
			.first()
			.map(|mime| mime.to_string())
			.unwrap_or_else(|| "application/octet-stream".to_string())
	}
}

/// A payload rendered inline and referenced from HTML through `cid:`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedResource {
	/// Generated unique name
	name: String,
	content: Bytes,
	content_type: String,
	content_id: Option<String>,
}

impl LinkedResource {
	/// Create a resource with a fresh unique name and a content type sniffed from the payload.
	pub fn new(content: impl Into<Bytes>, content_id: Option<String>) -> Self {
		let content = content.into();
		let content_type = sniff_content_type(&content).to_string();

		Self {
			name: uuid::Uuid::new_v4().to_string(),
			content,
			content_type,
			content_id,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn content(&self) -> &Bytes {
		&self.content
	}

	pub fn content_type(&self) -> &str {
		&self.content_type
	}

	pub fn content_id(&self) -> Option<&str> {
		self.content_id.as_deref()
	}

	/// The identifier used in the `Content-ID` header: the explicit content-id, or the
	/// generated name when there is none.
	pub fn effective_content_id(&self) -> &str {
		self.content_id.as_deref().unwrap_or(&self.name)
	}
}

fn sniff_content_type(content: &[u8]) -> &'static str {
	const SIGNATURES: &[(&[u8], &str)] = &[
		(b"\x89PNG\r\n\x1a\n", "image/png"),
		(b"\xFF\xD8\xFF", "image/jpeg"),
		(b"GIF87a", "image/gif"),
		(b"GIF89a", "image/gif"),
	];

	if let Some(mime) = SIGNATURES
		.iter()
		.find(|(magic, _)| content.starts_with(magic))
		.map(|(_, mime)| *mime)
	{
		return mime;
	}
	if content.len() >= 12 && &content[..4] == b"RIFF" && &content[8..12] == b"WEBP" {
		return "image/webp";
	}
	let head = &content[..content.len().min(256)];
	let head = String::from_utf8_lossy(head);
	let head = head.trim_start();
	if head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg")) {
		return "image/svg+xml";
	}
	"application/octet-stream"
}

/// Kind of an alternate body view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
	Html,
	Text,
}

/// One representation of the message body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlternateView {
	kind: ViewKind,
	content: String,
	linked_resources: Vec<LinkedResource>,
}

impl AlternateView {
	/// Create an HTML view carrying its inline resources
	pub fn html(content: impl Into<String>, linked_resources: Vec<LinkedResource>) -> Self {
		Self {
			kind: ViewKind::Html,
			content: content.into(),
			linked_resources,
		}
	}

	/// Create a plain-text view
	pub fn text(content: impl Into<String>) -> Self {
		Self {
			kind: ViewKind::Text,
			content: content.into(),
			linked_resources: Vec::new(),
		}
	}

	pub fn kind(&self) -> ViewKind {
		self.kind
	}

	pub fn content(&self) -> &str {
		&self.content
	}

	pub fn content_type(&self) -> &'static str {
		match self.kind {
			ViewKind::Html => "text/html",
			ViewKind::Text => "text/plain",
		}
	}

	pub fn linked_resources(&self) -> &[LinkedResource] {
		&self.linked_resources
	}
}

/// A fully assembled message, independent of the backend that renders it
///
/// Views are kept in priority order: HTML first, then text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposedMessage {
	pub(crate) from: Option<EmailAddress>,
	pub(crate) to: Vec<EmailAddress>,
	pub(crate) cc: Vec<EmailAddress>,
	pub(crate) bcc: Vec<EmailAddress>,
	pub(crate) subject: String,
	pub(crate) views: Vec<AlternateView>,
	pub(crate) attachments: Vec<Attachment>,
}

impl ComposedMessage {
	/// Get the sender, if one was set
	pub fn from_address(&self) -> Option<&EmailAddress> {
		self.from.as_ref()
	}

	pub fn to(&self) -> &[EmailAddress] {
		&self.to
	}

	pub fn cc(&self) -> &[EmailAddress] {
		&self.cc
	}

	pub fn bcc(&self) -> &[EmailAddress] {
		&self.bcc
	}

	pub fn subject(&self) -> &str {
		&self.subject
	}

	pub fn views(&self) -> &[AlternateView] {
		&self.views
	}

	/// Remove every alternate view.
	pub fn clear_views(&mut self) {
		self.views.clear();
	}

	pub fn attachments(&self) -> &[Attachment] {
		&self.attachments
	}

	pub fn html_view(&self) -> Option<&AlternateView> {
		self.views.iter().find(|v| v.kind == ViewKind::Html)
	}

	pub fn text_view(&self) -> Option<&AlternateView> {
		self.views.iter().find(|v| v.kind == ViewKind::Text)
	}

	pub fn html_body(&self) -> Option<&str> {
		self.html_view().map(AlternateView::content)
	}

	pub fn text_body(&self) -> Option<&str> {
		self.text_view().map(AlternateView::content)
	}

	/// All recipients in To, Cc, Bcc order.
	pub fn recipients(&self) -> impl Iterator<Item = &EmailAddress> {
		self.to.iter().chain(&self.cc).chain(&self.bcc)
	}

	pub(crate) fn with_from(mut self, from: EmailAddress) -> Self {
		self.from = Some(from);
		self
	}

	/// A message can be rendered only with a sender and at least one recipient.
	pub(crate) fn ensure_deliverable(&self) -> EmailResult<&EmailAddress> {
		let from = self
			.from
			.as_ref()
			.ok_or_else(|| EmailError::MissingField("from".to_string()))?;
		if self.recipients().next().is_none() {
			return Err(EmailError::MissingField("recipients".to_string()));
		}
		Ok(from)
	}
}
