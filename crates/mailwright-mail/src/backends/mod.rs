//! Backend selection and the MIME layout both backends render
//!
//! Each backend turns the same `MimeNode` tree into its own wire types:
//!
//! ```text
//! multipart/mixed              only when attachments exist
//! ├── multipart/alternative    only when both views exist
//! │   ├── text/plain
//! │   └── multipart/related    only when linked resources exist
//! │       ├── text/html
//! │       └── inline resources
//! └── attachments
//! ```

mod lettre_backend;
mod mail_send_backend;

use mailwright_conf::DeliveryConfig;
use std::fmt;
use std::sync::Arc;

use crate::compose::{Draft, MailBuilder};
use crate::delivery::MailClient;
use crate::host::HostEnvironment;
use crate::inliner::default_inliner;
use crate::message::{Attachment, ComposedMessage, LinkedResource};
use crate::policy::BuilderPolicy;

pub use lettre_backend::{LettreMailBuilder, LettreMailClient};
pub use mail_send_backend::{MailSendMailBuilder, MailSendMailClient};

/// Library used to render and transmit messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Backend {
	/// `lettre` message builder and async SMTP transport
	#[default]
	Lettre,
	/// `mail-builder` rendering and `mail-send` SMTP client
	MailSend,
}

impl Backend {
	/// Lower-case name, as used in logs
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Lettre => "lettre",
			Self::MailSend => "mail_send",
		}
	}
}

impl fmt::Display for Backend {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Create a composer for `backend` with the default CSS inliner.
pub fn mail_builder(backend: Backend, policy: Arc<BuilderPolicy>) -> Box<dyn MailBuilder> {
	let draft = Draft::new(policy, default_inliner());
	match backend {
		Backend::Lettre => Box::new(LettreMailBuilder::from_draft(draft)),
		Backend::MailSend => Box::new(MailSendMailBuilder::from_draft(draft)),
	}
}

/// Create a delivery client for `backend`.
///
/// # Examples
///
/// ```
/// use mailwright_conf::DeliveryConfig;
/// use mailwright_mail::{Backend, MailBuilder, MailClient, StaticHost, mail_client};
/// use std::sync::Arc;
///
/// let client = mail_client(Backend::Lettre, DeliveryConfig::default(), Arc::new(StaticHost::new()));
/// assert_eq!(client.backend(), Backend::Lettre);
/// assert_eq!(client.mail_builder().backend(), Backend::Lettre);
/// ```
pub fn mail_client(
	backend: Backend,
	config: DeliveryConfig,
	host: Arc<dyn HostEnvironment>,
) -> Box<dyn MailClient> {
	match backend {
		Backend::Lettre => Box::new(LettreMailClient::new(config, host)),
		Backend::MailSend => Box::new(MailSendMailClient::new(config, host)),
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MultipartKind {
	Mixed,
	Alternative,
	Related,
}

impl MultipartKind {
	pub(crate) fn content_type(&self) -> &'static str {
		match self {
			Self::Mixed => "multipart/mixed",
			Self::Alternative => "multipart/alternative",
			Self::Related => "multipart/related",
		}
	}
}

/// Backend-neutral MIME structure of a message body
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MimeNode<'a> {
	Text(&'a str),
	Html(&'a str),
	Inline(&'a LinkedResource),
	Attachment(&'a Attachment),
	Multipart {
		kind: MultipartKind,
		parts: Vec<MimeNode<'a>>,
	},
}

/// MIME structure of `message`, or `None` when it has neither views nor attachments.
pub(crate) fn body_layout(message: &ComposedMessage) -> Option<MimeNode<'_>> {
	let html = message.html_view().map(|view| {
		let body = MimeNode::Html(view.content());
		if view.linked_resources().is_empty() {
			body
		} else {
			let mut parts = vec![body];
			parts.extend(view.linked_resources().iter().map(MimeNode::Inline));
			MimeNode::Multipart {
				kind: MultipartKind::Related,
				parts,
			}
		}
	});
	let text = message.text_body().map(MimeNode::Text);

	let body = match (text, html) {
		(Some(text), Some(html)) => Some(MimeNode::Multipart {
			kind: MultipartKind::Alternative,
			parts: vec![text, html],
		}),
		(text, html) => text.or(html),
	};

	if message.attachments().is_empty() {
		return body;
	}
	let mut parts: Vec<_> = body.into_iter().collect();
	parts.extend(message.attachments().iter().map(MimeNode::Attachment));
	Some(MimeNode::Multipart {
		kind: MultipartKind::Mixed,
		parts,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::message::{AlternateView, EmailAddress};
	use bytes::Bytes;

	fn message(views: Vec<AlternateView>, attachments: Vec<Attachment>) -> ComposedMessage {
		ComposedMessage {
			from: Some(EmailAddress::new(None, "a@example.com")),
			to: vec![EmailAddress::new(None, "b@example.com")],
			views,
			attachments,
			..Default::default()
		}
	}

	#[test]
	fn test_layout_empty_message() {
		assert_eq!(body_layout(&message(vec![], vec![])), None);
	}

	#[test]
	fn test_layout_single_view_is_not_wrapped() {
		// Arrange
		let message = message(vec![AlternateView::text("hi")], vec![]);

		// Act
		let layout = body_layout(&message);

		// Assert
		assert_eq!(layout, Some(MimeNode::Text("hi")));
	}

	#[test]
	fn test_layout_orders_text_before_html() {
		// Arrange
		let message = message(
			vec![AlternateView::html("<html/>", vec![]), AlternateView::text("hi")],
			vec![],
		);

		// Act
		let layout = body_layout(&message);

		// Assert
		assert_eq!(
			layout,
			Some(MimeNode::Multipart {
				kind: MultipartKind::Alternative,
				parts: vec![MimeNode::Text("hi"), MimeNode::Html("<html/>")],
			})
		);
	}

	#[test]
	fn test_layout_related_and_mixed() {
		// Arrange
		let resource = LinkedResource::new(Bytes::from_static(b"GIF89a"), Some("img".into()));
		let attachment = Attachment::new("a.txt", Bytes::from_static(b"x"));
		let message = message(
			vec![AlternateView::html("<html/>", vec![resource.clone()])],
			vec![attachment.clone()],
		);

		// Act
		let layout = body_layout(&message);

		// Assert
		assert_eq!(
			layout,
			Some(MimeNode::Multipart {
				kind: MultipartKind::Mixed,
				parts: vec![
					MimeNode::Multipart {
						kind: MultipartKind::Related,
						parts: vec![MimeNode::Html("<html/>"), MimeNode::Inline(&resource)],
					},
					MimeNode::Attachment(&attachment),
				],
			})
		);
	}

	#[test]
	fn test_layout_attachments_only() {
		// Arrange
		let attachment = Attachment::new("a.txt", Bytes::from_static(b"x"));
		let message = message(vec![], vec![attachment.clone()]);

		// Act
		let layout = body_layout(&message);

		// Assert
		assert_eq!(
			layout,
			Some(MimeNode::Multipart {
				kind: MultipartKind::Mixed,
				parts: vec![MimeNode::Attachment(&attachment)],
			})
		);
	}

	#[test]
	fn test_factories_pick_backend() {
		// Arrange
		let policy = Arc::new(BuilderPolicy::default());

		// Act
		let lettre = mail_builder(Backend::Lettre, policy.clone());
		let mail_send = mail_builder(Backend::MailSend, policy);

		// Assert
		assert_eq!(lettre.backend(), Backend::Lettre);
		assert_eq!(mail_send.backend(), Backend::MailSend);
		assert_eq!(Backend::MailSend.to_string(), "mail_send");
	}
}
