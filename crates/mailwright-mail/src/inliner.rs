//! CSS inlining collaborators
//!
//! The inliner receives an HTML document that already carries the default stylesheet in a
//! `<style>` element and moves those rules into `style` attributes. Its output is not parsed
//! again.

use std::fmt::Debug;
use std::sync::Arc;

use crate::EmailResult;

/// Moves `<style>` rules of a document into inline `style` attributes
pub trait CssInliner: Send + Sync + Debug {
	fn inline(&self, html: &str) -> EmailResult<String>;
}

/// Inliner that returns its input unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughInliner;

impl CssInliner for PassthroughInliner {
	fn inline(&self, html: &str) -> EmailResult<String> {
		Ok(html.to_string())
	}
}

/// Inliner backed by the `css-inline` crate
#[cfg(feature = "css-inline")]
#[derive(Debug, Clone, Copy, Default)]
pub struct CssInlineInliner;

#[cfg(feature = "css-inline")]
impl CssInliner for CssInlineInliner {
	fn inline(&self, html: &str) -> EmailResult<String> {
		css_inline::inline(html)
			.map_err(|e| crate::EmailError::Render(format!("CSS inlining failed: {}", e)))
	}
}

/// The inliner composers use unless one is supplied: [`CssInlineInliner`] when the
/// `css-inline` feature is enabled, [`PassthroughInliner`] otherwise.
pub fn default_inliner() -> Arc<dyn CssInliner> {
	#[cfg(feature = "css-inline")]
	{
		Arc::new(CssInlineInliner)
	}
	#[cfg(not(feature = "css-inline"))]
	{
		Arc::new(PassthroughInliner)
	}
}
