//! Composition policy
//!
//! A [`BuilderPolicy`] is handed to every composer at construction. For applications that want
//! one process-wide policy, [`BuilderPolicy::global`] returns the current shared value and
//! [`BuilderPolicy::set_global`] replaces it. Composers that already hold a policy keep it.

use bytes::Bytes;
use parking_lot::RwLock;
use std::sync::{Arc, LazyLock};

static GLOBAL_POLICY: LazyLock<RwLock<Arc<BuilderPolicy>>> =
	LazyLock::new(|| RwLock::new(Arc::new(BuilderPolicy::default())));

/// Settings read by composers while building a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderPolicy {
	/// Strip accents from attachment names
	pub strip_attachment_accents: bool,
	/// Maximum attachment name length in UTF-16 units, `0` for unlimited
	pub max_attachment_name_len: usize,
	/// Fill an empty subject from the HTML `<title>`
	pub subject_from_html_title: bool,
	/// Inject `default_css` into HTML bodies and inline it
	pub inline_css: bool,
	pub default_css: String,
	/// Image attached whenever an HTML body references `cid:<logo_cid>`
	pub logo_image: Option<Bytes>,
	pub logo_cid: String,
}

impl Default for BuilderPolicy {
	fn default() -> Self {
		Self {
			strip_attachment_accents: true,
			max_attachment_name_len: 64,
			subject_from_html_title: true,
			inline_css: true,
			default_css: String::new(),
			logo_image: None,
			logo_cid: "logo".to_string(),
		}
	}
}

impl BuilderPolicy {
	/// The current process-wide policy.
	pub fn global() -> Arc<BuilderPolicy> {
		GLOBAL_POLICY.read().clone()
	}

	/// Replace the process-wide policy. Composers created afterwards observe the new value.
	pub fn set_global(policy: BuilderPolicy) {
		*GLOBAL_POLICY.write() = Arc::new(policy);
	}

	/// Modify a copy of the process-wide policy and install it.
	///
	/// # Examples
	///
	/// ```
	/// use mailwright_mail::BuilderPolicy;
	///
	/// BuilderPolicy::update_global(|policy| policy.default_css = "p { margin: 0 }".into());
	/// assert_eq!(BuilderPolicy::global().default_css, "p { margin: 0 }");
	/// ```
	pub fn update_global(update: impl FnOnce(&mut BuilderPolicy)) {
		let mut guard = GLOBAL_POLICY.write();
		let mut policy = BuilderPolicy::clone(&guard);
		update(&mut policy);
		*guard = Arc::new(policy);
	}

	/// Attach `image` as content-id `cid` whenever an HTML body references it.
	///
	/// # Examples
	///
	/// ```
	/// use mailwright_mail::BuilderPolicy;
	///
	/// let policy = BuilderPolicy::default().with_logo(b"GIF89a".to_vec(), "brand");
	/// assert_eq!(policy.logo_cid, "brand");
	/// assert!(policy.logo().is_some());
	///
	/// let empty = BuilderPolicy::default().with_logo(Vec::new(), "brand");
	/// assert!(empty.logo().is_none());
	/// ```
	pub fn with_logo(mut self, image: impl Into<Bytes>, cid: impl Into<String>) -> Self {
		self.logo_image = Some(image.into());
		self.logo_cid = cid.into();
		self
	}

	/// Set the stylesheet injected into every HTML body
	pub fn with_default_css(mut self, css: impl Into<String>) -> Self {
		self.default_css = css.into();
		self
	}

	/// The logo image, if one is configured and non-empty.
	pub fn logo(&self) -> Option<&Bytes> {
		self.logo_image.as_ref().filter(|image| !image.is_empty())
	}

	/// Whether HTML bodies go through style injection and the CSS inliner.
	pub fn inlines_css(&self) -> bool {
		self.inline_css && !self.default_css.trim().is_empty()
	}
}
