//! Pickup directory delivery tests
//!
//! Covers specified and discovered pickup directories, collision-free file naming, Bcc
//! retention in files, default From substitution and the configuration errors that are never
//! suppressed.

use mailwright_conf::{DeliveryConfig, DeliveryMethod};
use mailwright_mail::{
	Backend, BuilderPolicy, ComposedMessage, EmailError, HostEnvironment, MailBuilder, MailClient,
	StaticHost, SystemHost, mail_builder, mail_client,
};
use rstest::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

#[fixture]
fn pickup_dir() -> TempDir {
	TempDir::with_prefix("mailwright_pickup_").expect("Failed to create temp dir")
}

fn message(backend: Backend) -> ComposedMessage {
	let mut builder = mail_builder(backend, Arc::new(BuilderPolicy::default()));
	builder.set_from("Sender <sender@example.com>").unwrap();
	builder.add_to(&["rcpt@example.com"]).unwrap();
	builder.add_bcc(&["audit@example.com"]).unwrap();
	builder.set_text_body("pickup body");
	builder
		.set_html_body("<html><head><title>Pickup test</title></head><body><p>hi</p></body></html>")
		.unwrap();
	builder.build()
}

fn specified(directory: &Path) -> DeliveryConfig {
	DeliveryConfig::default()
		.with_delivery_method(DeliveryMethod::SpecifiedDirectory)
		.with_pickup_directory(directory.to_string_lossy())
}

fn eml_files(directory: &Path) -> Vec<PathBuf> {
	let mut files: Vec<PathBuf> = fs::read_dir(directory)
		.expect("Failed to read dir")
		.filter_map(|entry| entry.ok())
		.map(|entry| entry.path())
		.filter(|path| path.extension().is_some_and(|ext| ext == "eml"))
		.collect();
	files.sort();
	files
}

#[rstest]
#[tokio::test]
async fn test_each_send_writes_a_new_file(
	#[values(Backend::Lettre, Backend::MailSend)] backend: Backend,
	pickup_dir: TempDir,
) {
	// Arrange
	let client = mail_client(backend, specified(pickup_dir.path()), Arc::new(SystemHost));
	let message = message(backend);

	// Act
	client.send(&message, false).await.unwrap();
	client.send(&message, false).await.unwrap();

	// Assert
	let files = eml_files(pickup_dir.path());
	assert_eq!(files.len(), 2, "Should create one file per send");
	assert_ne!(files[0], files[1]);
	for file in &files {
		let content = fs::read_to_string(file).unwrap();
		assert!(content.contains("Subject: Pickup test"));
		assert!(content.contains("audit@example.com"), "Bcc must be kept in files");
		assert!(content.contains("pickup body"));
	}
}

#[rstest]
#[tokio::test]
async fn test_discovered_directory(
	#[values(Backend::Lettre, Backend::MailSend)] backend: Backend,
	pickup_dir: TempDir,
) {
	// Arrange
	let host: Arc<dyn HostEnvironment> =
		Arc::new(StaticHost::new().with_pickup_directory(pickup_dir.path()));
	let config =
		DeliveryConfig::default().with_delivery_method(DeliveryMethod::DiscoveredDirectory);
	let client = mail_client(backend, config, host);

	// Act
	client.send(&message(backend), false).await.unwrap();

	// Assert
	assert_eq!(eml_files(pickup_dir.path()).len(), 1);
}

#[rstest]
#[tokio::test]
async fn test_discovery_unavailable_is_configuration_error(
	#[values(Backend::Lettre, Backend::MailSend)] backend: Backend,
	#[values(true, false)] ignore: bool,
) {
	// Arrange
	let config =
		DeliveryConfig::default().with_delivery_method(DeliveryMethod::DiscoveredDirectory);
	let client = mail_client(backend, config, Arc::new(SystemHost));

	// Act
	let result = client.send(&message(backend), ignore).await;

	// Assert
	assert!(matches!(result, Err(EmailError::Configuration(_))));
}

#[rstest]
#[tokio::test]
async fn test_empty_host_fails_for_both_flag_values(
	#[values(Backend::Lettre, Backend::MailSend)] backend: Backend,
	#[values(true, false)] ignore: bool,
	pickup_dir: TempDir,
) {
	// Arrange
	let config = specified(pickup_dir.path()).with_host("");
	let client = mail_client(backend, config, Arc::new(SystemHost));

	// Act
	let result = client.send(&message(backend), ignore).await;

	// Assert
	assert!(matches!(result, Err(EmailError::Configuration(_))));
	assert!(eml_files(pickup_dir.path()).is_empty());
}

#[rstest]
#[tokio::test]
async fn test_relative_pickup_directory_is_rejected(
	#[values(Backend::Lettre, Backend::MailSend)] backend: Backend,
) {
	// Arrange
	let config = specified(Path::new("outbox"));
	let client = mail_client(backend, config, Arc::new(SystemHost));

	// Act
	let result = client.send(&message(backend), true).await;

	// Assert
	assert!(matches!(result, Err(EmailError::Configuration(_))));
}

#[rstest]
#[case(true)]
#[case(false)]
#[tokio::test]
async fn test_unwritable_pickup_directory_honors_flag(
	#[case] ignore: bool,
	#[values(Backend::Lettre, Backend::MailSend)] backend: Backend,
	pickup_dir: TempDir,
) {
	// Arrange
	let missing = pickup_dir.path().join("missing").join("nested");
	let client = mail_client(backend, specified(&missing), Arc::new(SystemHost));

	// Act
	let result = client.send(&message(backend), ignore).await;

	// Assert
	if ignore {
		assert!(result.is_ok());
	} else {
		assert!(matches!(result, Err(EmailError::SendFailure(_))));
	}
}

#[rstest]
#[tokio::test]
async fn test_default_from_is_applied(
	#[values(Backend::Lettre, Backend::MailSend)] backend: Backend,
	pickup_dir: TempDir,
) {
	// Arrange
	let config = specified(pickup_dir.path()).with_from("Robot <robot@example.com>");
	let client = mail_client(backend, config, Arc::new(SystemHost));
	let mut builder = client.mail_builder();
	builder.add_to(&["rcpt@example.com"]).unwrap();
	builder.set_text_body("no sender set");

	// Act
	client.send(&builder.build(), false).await.unwrap();

	// Assert
	let files = eml_files(pickup_dir.path());
	let content = fs::read_to_string(&files[0]).unwrap();
	assert!(content.contains("robot@example.com"));
}

#[rstest]
#[tokio::test]
async fn test_message_without_recipients_is_rejected(
	#[values(Backend::Lettre, Backend::MailSend)] backend: Backend,
	pickup_dir: TempDir,
) {
	// Arrange
	let client = mail_client(backend, specified(pickup_dir.path()), Arc::new(SystemHost));
	let mut builder = client.mail_builder();
	builder.set_from("sender@example.com").unwrap();
	builder.set_text_body("nobody to read this");

	// Act
	let result = client.send(&builder.build(), true).await;

	// Assert
	assert!(matches!(result, Err(EmailError::MissingField(_))));
	assert!(eml_files(pickup_dir.path()).is_empty());
}

#[rstest]
#[tokio::test]
async fn test_client_hands_out_matching_builder(
	#[values(Backend::Lettre, Backend::MailSend)] backend: Backend,
) {
	// Arrange
	let client = mail_client(backend, DeliveryConfig::default(), Arc::new(SystemHost));

	// Act
	let builder: Box<dyn MailBuilder> = client.mail_builder();

	// Assert
	assert_eq!(builder.backend(), backend);
	assert_eq!(client.backend(), backend);
}
