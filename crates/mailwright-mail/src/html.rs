//! HTML envelope utilities
//!
//! HTML bodies are treated as well-formed markup: every element closed, one `<html>` root.
//! Title extraction and style injection parse the document strictly and report malformed
//! markup as [`EmailError::HtmlParse`].

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};
use regex::Regex;
use std::sync::LazyLock;

use crate::{EmailError, EmailResult};

/// Document substituted for an empty HTML body
pub const EMPTY_HTML: &str = "<!DOCTYPE html>\n<html>\n<head>\n\t<title></title>\n</head>\n<body>\n\n</body>\n</html>\n";

static STARTS_WITH_HTML_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)\A\s*(<!DOCTYPE HTML[^>]*>\s*)?<HTML[^>]*>")
		.expect("STARTS_WITH_HTML_REGEX: invalid regex pattern")
});

static ENDS_WITH_HTML_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)</HTML>\s*\z").expect("ENDS_WITH_HTML_REGEX: invalid regex pattern")
});

/// Whether `text` looks like a complete HTML document: an optional doctype and an `<html>`
/// start tag at the beginning, and `</html>` followed only by whitespace at the end.
///
/// # Examples
///
/// ```
/// use mailwright_mail::html::is_html;
///
/// assert!(is_html("<!DOCTYPE html>\n<HTML lang=\"en\"><body/></HTML>\n"));
/// assert!(!is_html("<p>fragment</p>"));
/// assert!(!is_html("<html></html><p>trailing</p>"));
/// ```
pub fn is_html(text: &str) -> bool {
	STARTS_WITH_HTML_REGEX.is_match(text) && ENDS_WITH_HTML_REGEX.is_match(text)
}

/// Text content of `html/head/title`, or an empty string when the document has no title.
///
/// # Errors
///
/// [`EmailError::InvalidContent`] when `html` fails [`is_html`], [`EmailError::HtmlParse`]
/// when the markup is not well formed.
///
/// # Examples
///
/// ```
/// use mailwright_mail::html::get_title;
///
/// let html = "<html><head><title>Invoice &amp; receipt</title></head><body/></html>";
/// assert_eq!(get_title(html).unwrap(), "Invoice & receipt");
/// ```
pub fn get_title(html: &str) -> EmailResult<String> {
	ensure_html(html)?;

	let mut reader = Reader::from_str(html);
	let mut tree = Tree::default();
	let mut title: Option<String> = None;
	// depth of the open <title> element and the text collected so far
	let mut capture: Option<(usize, String)> = None;

	loop {
		let event = reader
			.read_event()
			.map_err(|e| parse_error(e, reader.buffer_position()))?;
		match event {
			Event::Eof => break,
			Event::Start(e) => {
				let is_title =
					title.is_none() && capture.is_none() && is_title_element(&tree, e.name());
				tree.open(e.name())?;
				if is_title {
					capture = Some((tree.depth(), String::new()));
				}
			}
			Event::Empty(e) => {
				if title.is_none() && capture.is_none() && is_title_element(&tree, e.name()) {
					title = Some(String::new());
				}
				tree.empty()?;
			}
			Event::End(_) => {
				if let Some((depth, _)) = &capture
					&& *depth == tree.depth()
				{
					title = capture.take().map(|(_, text)| text);
				}
				tree.close();
			}
			Event::Text(e) => {
				tree.text(&e)?;
				let text = e
					.unescape()
					.map_err(|err| parse_error(err, reader.buffer_position()))?;
				if let Some((_, buffer)) = capture.as_mut() {
					buffer.push_str(&text);
				}
			}
			Event::CData(e) => {
				if let Some((_, buffer)) = capture.as_mut() {
					buffer.push_str(&String::from_utf8_lossy(&e));
				}
			}
			_ => {}
		}
	}
	tree.finish()?;

	Ok(title.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Head {
	Missing,
	Open,
	Done,
}

/// Append `<style type="text/css">css</style>` as the last child of `<head>`, creating
/// `<head>` as the last child of `<html>` when the document has none. The XML declaration,
/// if any, is dropped from the output.
///
/// The stylesheet is written verbatim.
///
/// # Errors
///
/// [`EmailError::InvalidContent`] when `html` fails [`is_html`] or its root element is not
/// `<html>`, [`EmailError::HtmlParse`] when the markup is not well formed.
///
/// # Examples
///
/// ```
/// use mailwright_mail::html::inject_style;
///
/// let html = "<html><body><p>Hi</p></body></html>";
/// let styled = inject_style(html, "p { color: red }").unwrap();
/// assert_eq!(
/// 	styled,
/// 	"<html><body><p>Hi</p></body><head><style type=\"text/css\">p { color: red }</style></head></html>"
/// );
/// ```
pub fn inject_style(html: &str, css: &str) -> EmailResult<String> {
	ensure_html(html)?;

	let mut reader = Reader::from_str(html);
	let mut writer = Writer::new(Vec::with_capacity(html.len() + css.len() + 48));
	let mut tree = Tree::default();
	let mut head = Head::Missing;

	loop {
		let event = reader
			.read_event()
			.map_err(|e| parse_error(e, reader.buffer_position()))?;
		match event {
			Event::Eof => break,
			Event::Decl(_) => {}
			Event::Start(e) => {
				let depth = tree.depth();
				ensure_html_root(&tree, e.name())?;
				if depth == 1 && head == Head::Missing && is_named(e.name(), "head") {
					head = Head::Open;
				}
				tree.open(e.name())?;
				write(&mut writer, Event::Start(e))?;
			}
			Event::Empty(e) => {
				let depth = tree.depth();
				ensure_html_root(&tree, e.name())?;
				tree.empty()?;
				if depth == 0 {
					// <html/>
					let end = e.to_end().into_owned();
					write(&mut writer, Event::Start(e))?;
					write_head(&mut writer, css)?;
					write(&mut writer, Event::End(end))?;
					head = Head::Done;
				} else if depth == 1 && head == Head::Missing && is_named(e.name(), "head") {
					let end = e.to_end().into_owned();
					write(&mut writer, Event::Start(e))?;
					write_style(&mut writer, css)?;
					write(&mut writer, Event::End(end))?;
					head = Head::Done;
				} else {
					write(&mut writer, Event::Empty(e))?;
				}
			}
			Event::End(e) => {
				match tree.depth() {
					2 if head == Head::Open => {
						write_style(&mut writer, css)?;
						head = Head::Done;
					}
					1 if head == Head::Missing => {
						write_head(&mut writer, css)?;
						head = Head::Done;
					}
					_ => {}
				}
				tree.close();
				write(&mut writer, Event::End(e))?;
			}
			Event::Text(e) => {
				tree.text(&e)?;
				write(&mut writer, Event::Text(e))?;
			}
			other => write(&mut writer, other)?,
		}
	}
	tree.finish()?;

	String::from_utf8(writer.into_inner()).map_err(|e| EmailError::HtmlParse(e.to_string()))
}

fn ensure_html(text: &str) -> EmailResult<()> {
	if is_html(text) {
		Ok(())
	} else {
		Err(EmailError::InvalidContent(
			"content is not a complete HTML document".to_string(),
		))
	}
}

fn ensure_html_root(tree: &Tree, name: QName<'_>) -> EmailResult<()> {
	if tree.depth() == 0 && !tree.root_seen && !is_named(name, "html") {
		return Err(EmailError::InvalidContent(format!(
			"root element is <{}>, expected <html>",
			String::from_utf8_lossy(name.as_ref())
		)));
	}
	Ok(())
}

fn is_named(name: QName<'_>, expected: &str) -> bool {
	name.as_ref().eq_ignore_ascii_case(expected.as_bytes())
}

fn is_title_element(tree: &Tree, name: QName<'_>) -> bool {
	is_named(name, "title") && tree.ends_with(&["html", "head"])
}

fn write_head(writer: &mut Writer<Vec<u8>>, css: &str) -> EmailResult<()> {
	write(writer, Event::Start(BytesStart::new("head")))?;
	write_style(writer, css)?;
	write(writer, Event::End(BytesEnd::new("head")))
}

fn write_style(writer: &mut Writer<Vec<u8>>, css: &str) -> EmailResult<()> {
	let mut style = BytesStart::new("style");
	style.push_attribute(("type", "text/css"));
	write(writer, Event::Start(style))?;
	write(writer, Event::Text(BytesText::from_escaped(css)))?;
	write(writer, Event::End(BytesEnd::new("style")))
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> EmailResult<()> {
	writer
		.write_event(event)
		.map_err(|e| EmailError::HtmlParse(e.to_string()))
}

fn parse_error(err: impl std::fmt::Display, position: impl std::fmt::Display) -> EmailError {
	EmailError::HtmlParse(format!("{} at position {}", err, position))
}

/// Open-element bookkeeping that enforces a single root
#[derive(Default)]
struct Tree {
	stack: Vec<String>,
	root_seen: bool,
}

impl Tree {
	fn depth(&self) -> usize {
		self.stack.len()
	}

	fn ends_with(&self, path: &[&str]) -> bool {
		self.stack.len() >= path.len()
			&& self.stack[self.stack.len() - path.len()..]
				.iter()
				.zip(path)
				.all(|(open, expected)| open.eq_ignore_ascii_case(expected))
	}

	fn open(&mut self, name: QName<'_>) -> EmailResult<()> {
		self.check_root()?;
		self.stack
			.push(String::from_utf8_lossy(name.as_ref()).into_owned());
		Ok(())
	}

	fn empty(&mut self) -> EmailResult<()> {
		self.check_root()?;
		if self.stack.is_empty() {
			self.root_seen = true;
		}
		Ok(())
	}

	fn close(&mut self) {
		self.stack.pop();
		if self.stack.is_empty() {
			self.root_seen = true;
		}
	}

	fn text(&self, raw: &[u8]) -> EmailResult<()> {
		if self.stack.is_empty() && !raw.iter().all(u8::is_ascii_whitespace) {
			return Err(EmailError::HtmlParse(
				"text outside the root element".to_string(),
			));
		}
		Ok(())
	}

	fn check_root(&self) -> EmailResult<()> {
		if self.stack.is_empty() && self.root_seen {
			return Err(EmailError::HtmlParse(
				"more than one root element".to_string(),
			));
		}
		Ok(())
	}

	fn finish(&self) -> EmailResult<()> {
		if let Some(open) = self.stack.last() {
			return Err(EmailError::HtmlParse(format!("element <{}> is not closed", open)));
		}
		if !self.root_seen {
			return Err(EmailError::HtmlParse("document has no root element".to_string()));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use rstest::rstest;

	#[rstest]
	#[case("<html></html>", true)]
	#[case("  \n<!doctype html>\n<html lang=\"en\">\n<body/>\n</html>\n\t", true)]
	#[case("<HTML><BODY></BODY></HTML>", true)]
	#[case("<html><body></body></html> trailing", false)]
	#[case("<div><html></html></div>", false)]
	#[case("", false)]
	#[case("plain text", false)]
	fn test_is_html(#[case] input: &str, #[case] expected: bool) {
		assert_eq!(is_html(input), expected);
	}

	#[test]
	fn test_empty_html_is_html() {
		assert!(is_html(EMPTY_HTML));
		assert_eq!(get_title(EMPTY_HTML).unwrap(), "");
	}

	#[rstest]
	#[case("<html><head><title>Hello</title></head><body/></html>", "Hello")]
	#[case("<html><head><title/></head></html>", "")]
	#[case("<html><body><title>Not in head</title></body></html>", "")]
	#[case("<HTML><HEAD><TITLE>Upper</TITLE></HEAD></HTML>", "Upper")]
	#[case("<html><head><title>A <b>bold</b> title</title></head></html>", "A bold title")]
	#[case("<html><head><title><![CDATA[x < y]]></title></head></html>", "x < y")]
	fn test_get_title(#[case] html: &str, #[case] expected: &str) {
		assert_eq!(get_title(html).unwrap(), expected);
	}

	#[test]
	fn test_get_title_rejects_non_html() {
		// Act
		let result = get_title("<p>fragment</p>");

		// Assert
		assert!(matches!(result, Err(EmailError::InvalidContent(_))));
	}

	#[rstest]
	#[case("<html><head><title>x</title></head><body><p></body></html>")]
	#[case("<html><body><br></body></html>")]
	#[case("<html><head><title>&nbsp;</title></head></html>")]
	fn test_get_title_reports_malformed_markup(#[case] html: &str) {
		// Act
		let result = get_title(html);

		// Assert
		assert!(matches!(result, Err(EmailError::HtmlParse(_))), "{:?}", result);
	}

	#[test]
	fn test_inject_style_appends_to_existing_head() {
		// Arrange
		let html = "<html><head><title>T</title><style>a{}</style></head><body/></html>";

		// Act
		let styled = inject_style(html, "p { margin: 0 }").unwrap();

		// Assert
		assert_eq!(
			styled,
			"<html><head><title>T</title><style>a{}</style><style type=\"text/css\">p { margin: 0 }</style></head><body/></html>"
		);
	}

	#[test]
	fn test_inject_style_expands_empty_head() {
		// Act
		let styled = inject_style("<html><head/><body/></html>", "b{}").unwrap();

		// Assert
		assert_eq!(
			styled,
			"<html><head><style type=\"text/css\">b{}</style></head><body/></html>"
		);
	}

	#[test]
	fn test_inject_style_keeps_doctype() {
		// Arrange
		let html = "<!DOCTYPE html>\n<html><head></head></html>\n";

		// Act
		let styled = inject_style(html, "").unwrap();

		// Assert
		assert!(styled.starts_with("<!DOCTYPE html>"));
		assert!(is_html(&styled));
	}

	#[test]
	fn test_inject_style_writes_css_verbatim() {
		// Act
		let styled = inject_style("<html><head/></html>", "a > b { content: \"&\" }").unwrap();

		// Assert
		assert!(styled.contains("a > b { content: \"&\" }"));
	}

	#[test]
	fn test_inject_style_only_touches_first_head() {
		// Arrange
		let html = "<html><head></head><body><head></head></body></html>";

		// Act
		let styled = inject_style(html, "x{}").unwrap();

		// Assert
		assert_eq!(styled.matches("<style").count(), 1);
		assert!(styled.starts_with("<html><head><style"));
	}

	#[rstest]
	#[case("<html><body></body></html><html></html>")]
	#[case("<html><body></html>")]
	fn test_inject_style_rejects_malformed(#[case] html: &str) {
		assert!(matches!(inject_style(html, "a{}"), Err(EmailError::HtmlParse(_))));
	}

	#[test]
	fn test_inject_style_rejects_fragment() {
		assert!(matches!(
			inject_style("<body></body>", "a{}"),
			Err(EmailError::InvalidContent(_))
		));
	}

	fn html_document() -> impl Strategy<Value = String> {
		(
			proptest::bool::ANY,
			proptest::option::of("[A-Za-z ]{0,12}"),
			proptest::option::of("[A-Za-z ]{0,20}"),
			"[ \n\t]{0,3}",
		)
			.prop_map(|(doctype, title, body, tail)| {
				let mut html = String::new();
				if doctype {
					html.push_str("<!DOCTYPE html>\n");
				}
				html.push_str("<html>");
				if let Some(title) = title {
					html.push_str(&format!("<head><title>{}</title></head>", title));
				}
				match body {
					Some(body) => html.push_str(&format!("<body><p>{}</p></body>", body)),
					None => html.push_str("<body/>"),
				}
				html.push_str("</html>");
				html.push_str(&tail);
				html
			})
	}

	proptest! {
		#[test]
		fn prop_inject_style_preserves_html_envelope(html in html_document(), css in "[a-z{}:; ]{0,30}") {
			prop_assume!(is_html(&html));

			let styled = inject_style(&html, &css).unwrap();

			prop_assert!(is_html(&styled));
		}

		#[test]
		fn prop_inject_style_keeps_title(html in html_document()) {
			let before = get_title(&html).unwrap();

			let styled = inject_style(&html, "p{}").unwrap();

			prop_assert_eq!(get_title(&styled).unwrap(), before);
		}
	}
}
