//! Message composition
//!
//! [`Draft`] holds the state of a message under construction and implements the composition
//! rules every backend shares. [`MailBuilder`] is the composer interface; backends provide
//! wire rendering, everything else comes from the provided methods.

use bytes::Bytes;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

use crate::backends::Backend;
use crate::html::{self, EMPTY_HTML};
use crate::inliner::CssInliner;
use crate::message::{
	AlternateView, Attachment, ComposedMessage, EmailAddress, LinkedResource, RecipientKind,
};
use crate::policy::BuilderPolicy;
use crate::text::{max_length, normalize_subject, strip_accents, utf16_len};
use crate::EmailResult;

/// Composer interface implemented by every backend
///
/// # Examples
///
/// ```
/// use mailwright_mail::{Backend, BuilderPolicy, MailBuilder, RecipientKind, mail_builder};
/// use std::sync::Arc;
///
/// let mut builder = mail_builder(Backend::MailSend, Arc::new(BuilderPolicy::default()));
/// builder.set_from("sender@example.com")?;
/// builder.add_recipients(RecipientKind::To, &["a@example.com", "B <b@example.com>"])?;
/// builder.set_subject("  Weekly\tdigest ");
/// builder.set_text_body("Hello");
///
/// let message = builder.build();
/// assert_eq!(message.to().len(), 2);
/// assert_eq!(message.subject(), "Weekly digest");
/// # Ok::<(), mailwright_mail::EmailError>(())
/// ```
pub trait MailBuilder: Send {
	fn backend(&self) -> Backend;

	fn draft(&self) -> &Draft;

	fn draft_mut(&mut self) -> &mut Draft;

	/// Render a message in this backend's wire format, `Bcc` header included.
	fn render(&self, message: &ComposedMessage) -> EmailResult<Vec<u8>>;

	/// Parse and append recipients.
	///
	/// All addresses are parsed before any is added: when one is malformed the call fails
	/// with [`crate::EmailError::InvalidAddress`] and the recipient lists are left untouched.
	fn add_recipients(&mut self, kind: RecipientKind, addresses: &[&str]) -> EmailResult<()> {
		let parsed = addresses
			.iter()
			.map(|address| EmailAddress::parse(address))
			.collect::<EmailResult<Vec<_>>>()?;
		self.draft_mut().add_recipients(kind, parsed);
		Ok(())
	}

	fn add_to(&mut self, addresses: &[&str]) -> EmailResult<()> {
		self.add_recipients(RecipientKind::To, addresses)
	}

	fn add_cc(&mut self, addresses: &[&str]) -> EmailResult<()> {
		self.add_recipients(RecipientKind::Cc, addresses)
	}

	fn add_bcc(&mut self, addresses: &[&str]) -> EmailResult<()> {
		self.add_recipients(RecipientKind::Bcc, addresses)
	}

	/// Parse and replace the sender.
	fn set_from(&mut self, address: &str) -> EmailResult<()> {
		let parsed = EmailAddress::parse(address)?;
		self.draft_mut().set_from(parsed);
		Ok(())
	}

	fn set_subject(&mut self, subject: &str) {
		self.draft_mut().set_subject(subject);
	}

	fn set_html_body(&mut self, html: &str) -> EmailResult<()> {
		self.draft_mut().set_html_body(html)
	}

	fn set_text_body(&mut self, text: &str) {
		self.draft_mut().set_text_body(text);
	}

	fn add_attachment(&mut self, content: Vec<u8>, name: &str, content_id: Option<&str>) {
		self.draft_mut()
			.add_attachment(Bytes::from(content), name, content_id);
	}

	fn add_linked_resource(&mut self, content: Vec<u8>, content_id: Option<&str>) {
		self.draft_mut()
			.add_linked_resource(Bytes::from(content), content_id);
	}

	fn build(&self) -> ComposedMessage {
		self.draft().build()
	}

	fn serialize(&self) -> EmailResult<Vec<u8>> {
		self.render(&self.build())
	}
}

/// State of a message under construction
#[derive(Debug, Clone)]
pub struct Draft {
	policy: Arc<BuilderPolicy>,
	inliner: Arc<dyn CssInliner>,
	from: Option<EmailAddress>,
	to: Vec<EmailAddress>,
	cc: Vec<EmailAddress>,
	bcc: Vec<EmailAddress>,
	subject: String,
	html_body: Option<String>,
	text_body: Option<String>,
	attachments: Vec<Attachment>,
	linked_resources: Vec<LinkedResource>,
}

impl Draft {
	/// Create an empty draft
	///
	/// # Examples
	///
	/// ```
	/// use mailwright_mail::{BuilderPolicy, Draft, PassthroughInliner};
	/// use std::sync::Arc;
	///
	/// let mut draft = Draft::new(Arc::new(BuilderPolicy::default()), Arc::new(PassthroughInliner));
	/// draft.set_subject(" Status\r\nupdate ");
	/// assert_eq!(draft.subject(), "Status update");
	/// assert_eq!(draft.html_body(), None);
	/// ```
	pub fn new(policy: Arc<BuilderPolicy>, inliner: Arc<dyn CssInliner>) -> Self {
		Self {
			policy,
			inliner,
			from: None,
			to: Vec::new(),
			cc: Vec::new(),
			bcc: Vec::new(),
			subject: String::new(),
			html_body: None,
			text_body: None,
			attachments: Vec::new(),
			linked_resources: Vec::new(),
		}
	}

	/// Get the policy this draft was created with
	pub fn policy(&self) -> &BuilderPolicy {
		&self.policy
	}

	/// Get the normalized subject
	pub fn subject(&self) -> &str {
		&self.subject
	}

	/// Get the stored HTML body, after style inlining
	pub fn html_body(&self) -> Option<&str> {
		self.html_body.as_deref()
	}

	pub fn linked_resources(&self) -> &[LinkedResource] {
		&self.linked_resources
	}

	pub fn attachments(&self) -> &[Attachment] {
		&self.attachments
	}

	/// Append already parsed addresses to the `kind` list
	pub fn add_recipients(&mut self, kind: RecipientKind, addresses: Vec<EmailAddress>) {
		let list = match kind {
			RecipientKind::To => &mut self.to,
			RecipientKind::Cc => &mut self.cc,
			RecipientKind::Bcc => &mut self.bcc,
		};
		list.extend(addresses);
	}

	/// Replace the sender
	pub fn set_from(&mut self, address: EmailAddress) {
		self.from = Some(address);
	}

	/// Store `subject` with control characters removed and spaces collapsed
	pub fn set_subject(&mut self, subject: &str) {
		self.subject = normalize_subject(subject);
	}

	/// Store an HTML body.
	///
	/// An empty body is replaced by a minimal document. The `<title>` fills an empty subject
	/// when the policy asks for it, the policy logo is attached or detached depending on
	/// whether the markup references it, and finally the default stylesheet is injected and
	/// inlined. On error the draft is left as it was.
	pub fn set_html_body(&mut self, html: &str) -> EmailResult<()> {
		let html = if html.trim().is_empty() {
			EMPTY_HTML.to_string()
		} else {
			html.to_string()
		};

		let derived_subject = if self.policy.subject_from_html_title && self.subject.trim().is_empty()
		{
			Some(html::get_title(&html)?).filter(|title| !title.trim().is_empty())
		} else {
			None
		};

		let body = if self.policy.inlines_css() {
			let styled = html::inject_style(&html, &self.policy.default_css)?;
			let inlined = self.inliner.inline(&styled)?;
			debug!(inliner = ?self.inliner, "default stylesheet inlined");
			inlined
		} else {
			html.clone()
		};

		if let Some(title) = derived_subject {
			self.subject = normalize_subject(&title);
			debug!(subject = %self.subject, "subject taken from HTML title");
		}
		self.reconcile_logo(&html);
		self.html_body = Some(body);
		Ok(())
	}

	/// Store a plain-text body verbatim
	pub fn set_text_body(&mut self, text: &str) {
		self.text_body = Some(text.to_string());
	}

	/// Add an attachment. The file name is normalized under the policy.
	pub fn add_attachment(&mut self, content: Bytes, name: &str, content_id: Option<&str>) {
		let name = normalize_attachment_name(name, &self.policy);
		let mut attachment = Attachment::new(name, content);
		if let Some(content_id) = content_id {
			attachment = attachment.with_content_id(content_id);
		}
		self.attachments.push(attachment);
	}

	/// Add a resource rendered inline with the HTML view
	pub fn add_linked_resource(&mut self, content: Bytes, content_id: Option<&str>) {
		self.linked_resources
			.push(LinkedResource::new(content, content_id.map(str::to_string)));
	}

	/// Assemble the message. Every call produces a fresh value from the current state.
	pub fn build(&self) -> ComposedMessage {
		let mut views = Vec::with_capacity(2);
		if let Some(html) = &self.html_body {
			views.push(AlternateView::html(
				html.clone(),
				self.linked_resources.clone(),
			));
		}
		if let Some(text) = &self.text_body {
			views.push(AlternateView::text(text.clone()));
		}

		ComposedMessage {
			from: self.from.clone(),
			to: self.to.clone(),
			cc: self.cc.clone(),
			bcc: self.bcc.clone(),
			subject: self.subject.clone(),
			views,
			attachments: self.attachments.clone(),
		}
	}

	fn reconcile_logo(&mut self, html: &str) {
		let Some(logo) = self.policy.logo().cloned() else {
			return;
		};
		let cid = self.policy.logo_cid.clone();
		let referenced = references_content_id(html, &cid);
		let existing = self
			.linked_resources
			.iter()
			.position(|resource| resource.content_id() == Some(cid.as_str()));

		match (referenced, existing) {
			(true, None) => {
				self.add_linked_resource(logo, Some(cid.as_str()));
				debug!(cid = %cid, "logo resource attached");
			}
			(false, Some(index)) => {
				self.linked_resources.remove(index);
				debug!(cid = %cid, "logo resource detached");
			}
			_ => {}
		}
	}
}

/// Whether `html` references `cid:<content_id>` from an `<img src>` or `<a href>` attribute.
///
/// Tag and attribute names match in any case; the content-id must match exactly.
///
/// # Examples
///
/// ```
/// use mailwright_mail::compose::references_content_id;
///
/// assert!(references_content_id(r#"<img alt="" src="cid:logo"/>"#, "logo"));
/// assert!(!references_content_id(r#"<img src="cid:logo-dark"/>"#, "logo"));
/// ```
pub fn references_content_id(html: &str, content_id: &str) -> bool {
	let id = regex::escape(content_id);
	let pattern = format!(
		r#"(<(?i:img)\s+[^>]*?(?i:src)=["']cid:{id}["'])|(<(?i:a)\s+[^>]*?(?i:href)=["']cid:{id}["'])"#
	);
	Regex::new(&pattern)
		.map(|regex| regex.is_match(html))
		.unwrap_or(false)
}

/// Normalize an attachment file name under `policy`.
///
/// The name is trimmed and, if the policy says so, accent-stripped. When it is longer than
/// the policy limit, only the part before the extension is shortened so that the result is
/// exactly the limit long. A name whose extension alone exceeds the limit is cut as a whole.
///
/// # Examples
///
/// ```
/// use mailwright_mail::BuilderPolicy;
/// use mailwright_mail::compose::normalize_attachment_name;
///
/// let policy = BuilderPolicy { max_attachment_name_len: 10, ..Default::default() };
/// assert_eq!(normalize_attachment_name(" Összesítő_2024.xlsx ", &policy), "Ossze.xlsx");
/// ```
pub fn normalize_attachment_name(name: &str, policy: &BuilderPolicy) -> String {
	let mut adjusted = name.trim().to_string();

	if policy.strip_attachment_accents {
		adjusted = strip_accents(&adjusted);
	}

	let limit = policy.max_attachment_name_len;
	if limit > 0 && utf16_len(&adjusted) > limit {
		let extension = file_extension(&adjusted);
		let extension_len = utf16_len(extension);
		adjusted = if extension_len > limit {
			max_length(&adjusted, limit)
		} else {
			let base = &adjusted[..adjusted.len() - extension.len()];
			format!("{}{}", max_length(base, limit - extension_len), extension)
		};
	}

	adjusted
}

fn file_extension(name: &str) -> &str {
	match name.rfind('.') {
		Some(index) if index + 1 < name.len() => &name[index..],
		_ => "",
	}
}
