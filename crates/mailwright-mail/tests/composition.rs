//! Composer integration tests
//!
//! Every scenario runs against both backends: empty HTML repair, subject derivation, logo
//! reconciliation, attachment naming, address validity and all-or-nothing recipient parsing.

use mailwright_mail::html::is_html;
use mailwright_mail::{
	Backend, BuilderPolicy, EmailError, MailBuilder, PassthroughInliner, RecipientKind, ViewKind,
	mail_builder,
};
use proptest::prelude::*;
use rstest::*;
use std::sync::Arc;

const PNG_LOGO: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";

const WITH_LOGO: &str =
	r#"<html><head><title>Newsletter</title></head><body><img src="cid:brand"/></body></html>"#;

const WITHOUT_LOGO: &str =
	"<html><head><title>Newsletter</title></head><body><p>Text only</p></body></html>";

#[fixture]
fn logo_policy() -> Arc<BuilderPolicy> {
	Arc::new(BuilderPolicy::default().with_logo(PNG_LOGO.to_vec(), "brand"))
}

fn logo_count(builder: &dyn MailBuilder) -> usize {
	builder
		.build()
		.html_view()
		.map(|view| {
			view.linked_resources()
				.iter()
				.filter(|resource| resource.content_id() == Some("brand"))
				.count()
		})
		.unwrap_or(0)
}

#[rstest]
fn test_empty_html_body_is_valid_document(
	#[values(Backend::Lettre, Backend::MailSend)] backend: Backend,
) {
	// Arrange
	let mut builder = mail_builder(backend, Arc::new(BuilderPolicy::default()));

	// Act
	builder.set_html_body("").unwrap();
	let message = builder.build();

	// Assert
	let html = message.html_body().unwrap();
	assert!(!html.is_empty());
	assert!(is_html(html));
}

#[rstest]
fn test_logo_reconciliation(
	#[values(Backend::Lettre, Backend::MailSend)] backend: Backend,
	logo_policy: Arc<BuilderPolicy>,
) {
	// Arrange
	let mut builder = mail_builder(backend, logo_policy);

	// Act & Assert
	builder.set_html_body(WITH_LOGO).unwrap();
	assert_eq!(logo_count(&*builder), 1);

	builder.set_html_body(WITH_LOGO).unwrap();
	assert_eq!(logo_count(&*builder), 1);

	builder.set_html_body(WITHOUT_LOGO).unwrap();
	assert_eq!(logo_count(&*builder), 0);

	builder.set_html_body(WITH_LOGO).unwrap();
	assert_eq!(logo_count(&*builder), 1);
}

#[rstest]
fn test_logo_is_serialized_inline(
	#[values(Backend::Lettre, Backend::MailSend)] backend: Backend,
	logo_policy: Arc<BuilderPolicy>,
) {
	// Arrange
	let mut builder = mail_builder(backend, logo_policy);
	builder.set_from("news@example.com").unwrap();
	builder.add_to(&["reader@example.com"]).unwrap();

	// Act
	builder.set_html_body(WITH_LOGO).unwrap();
	let raw = String::from_utf8(builder.serialize().unwrap()).unwrap();

	// Assert
	assert!(raw.contains("multipart/related"));
	assert!(raw.contains("image/png"));
	assert!(raw.contains("<brand>"));
	assert!(raw.contains("Subject: Newsletter"));
}

#[rstest]
fn test_long_attachment_name_keeps_extension(
	#[values(Backend::Lettre, Backend::MailSend)] backend: Backend,
) {
	// Arrange
	let mut builder = mail_builder(backend, Arc::new(BuilderPolicy::default()));
	let name = format!("{}.pdf", "a".repeat(100));

	// Act
	builder.add_attachment(b"%PDF-1.4".to_vec(), &name, None);

	// Assert
	let message = builder.build();
	let stored = message.attachments()[0].filename();
	assert!(stored.len() <= 64);
	assert!(stored.ends_with(".pdf"));
}

#[rstest]
fn test_recipients_are_all_or_nothing(
	#[values(Backend::Lettre, Backend::MailSend)] backend: Backend,
	#[values(RecipientKind::To, RecipientKind::Cc, RecipientKind::Bcc)] kind: RecipientKind,
) {
	// Arrange
	let mut builder = mail_builder(backend, Arc::new(BuilderPolicy::default()));

	// Act
	let result = builder.add_recipients(kind, &["ok@example.com", "no at sign"]);

	// Assert
	assert!(matches!(result, Err(EmailError::InvalidAddress(msg)) if msg.contains("no at sign")));
	assert_eq!(builder.build().recipients().count(), 0);
}

#[rstest]
#[case("user@localhost", true)]
#[case("josé@example.com", true)]
#[case("user@exa_mple.com", true)]
#[case("\"Doe, Jane\" <jane@example.com>", true)]
#[case("Doe, Jane <jane@example.com>", false)]
fn test_backends_agree_on_address_validity(
	#[case] input: &str,
	#[case] valid: bool,
	#[values(Backend::Lettre, Backend::MailSend)] backend: Backend,
) {
	// Arrange
	let mut builder = mail_builder(backend, Arc::new(BuilderPolicy::default()));

	// Act
	let recipient = builder.add_recipients(RecipientKind::To, &[input]);
	let sender = builder.set_from(input);

	// Assert
	assert_eq!(recipient.is_ok(), valid, "recipient {:?} on {:?}", input, backend);
	assert_eq!(sender.is_ok(), valid, "sender {:?} on {:?}", input, backend);
}

#[rstest]
fn test_set_from_replaces_sender(#[values(Backend::Lettre, Backend::MailSend)] backend: Backend) {
	// Arrange
	let mut builder = mail_builder(backend, Arc::new(BuilderPolicy::default()));
	builder.set_from("first@example.com").unwrap();

	// Act
	builder.set_from("Second Sender <second@example.com>").unwrap();

	// Assert
	let message = builder.build();
	let from = message.from_address().unwrap();
	assert_eq!(from.address(), "second@example.com");
	assert_eq!(from.name(), Some("Second Sender"));
}

#[rstest]
fn test_views_are_html_then_text(#[values(Backend::Lettre, Backend::MailSend)] backend: Backend) {
	// Arrange
	let mut builder = mail_builder(backend, Arc::new(BuilderPolicy::default()));

	// Act
	builder.set_text_body("plain");
	builder.set_html_body(WITHOUT_LOGO).unwrap();

	// Assert
	let message = builder.build();
	let kinds: Vec<ViewKind> = message.views().iter().map(|view| view.kind()).collect();
	assert_eq!(kinds, vec![ViewKind::Html, ViewKind::Text]);
	assert_eq!(message.subject(), "Newsletter");
}

#[rstest]
fn test_serialize_is_stable_for_same_message(
	#[values(Backend::Lettre, Backend::MailSend)] backend: Backend,
) {
	// Arrange
	let mut builder = mail_builder(backend, Arc::new(BuilderPolicy::default()));
	builder.set_from("sender@example.com").unwrap();
	builder.add_to(&["rcpt@example.com"]).unwrap();
	builder.set_subject("Stable");
	builder.set_text_body("same bytes");

	// Act
	let first = String::from_utf8(builder.serialize().unwrap()).unwrap();
	let second = String::from_utf8(builder.serialize().unwrap()).unwrap();

	// Assert
	let body = |raw: &str| raw.split_once("\r\n\r\n").map(|(_, body)| body.to_string());
	assert_eq!(body(&first), body(&second));
	assert!(first.contains("Subject: Stable"));
}

#[test]
fn test_explicit_inliner_is_used() {
	// Arrange
	let policy = Arc::new(BuilderPolicy::default().with_default_css("p { margin: 0 }"));
	let mut builder =
		mailwright_mail::LettreMailBuilder::with_inliner(policy, Arc::new(PassthroughInliner));

	// Act
	builder.set_html_body(WITHOUT_LOGO).unwrap();

	// Assert
	let message = builder.build();
	assert!(
		message
			.html_body()
			.unwrap()
			.contains("<style type=\"text/css\">p { margin: 0 }</style>")
	);
}

proptest! {
	#[test]
	fn prop_subject_has_no_outer_or_double_spaces(subject in "[\\PC\\x00-\\x1f ]{0,40}") {
		let mut builder = mail_builder(Backend::MailSend, Arc::new(BuilderPolicy::default()));

		builder.set_subject(&subject);
		let message = builder.build();
		let normalized = message.subject();

		prop_assert!(!normalized.starts_with(' '));
		prop_assert!(!normalized.ends_with(' '));
		prop_assert!(!normalized.contains("  "));
	}
}
