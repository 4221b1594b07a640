//! Text normalization utilities shared by composers of every backend.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

static NON_PRINTABLE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"\p{C}").expect("NON_PRINTABLE_REGEX: invalid regex pattern")
});

static MULTIPLE_SPACES_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r" {2,}").expect("MULTIPLE_SPACES_REGEX: invalid regex pattern")
});

static NON_SPACING_MARK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"\p{Mn}").expect("NON_SPACING_MARK_REGEX: invalid regex pattern")
});

// Simplified RFC 2822 addr-spec
const EMAIL_PATTERN: &str = r"[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?";

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(&format!("(?i){}", EMAIL_PATTERN)).expect("EMAIL_REGEX: invalid regex pattern")
});

static FULL_EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(&format!("(?i)^(?:{})$", EMAIL_PATTERN))
		.expect("FULL_EMAIL_REGEX: invalid regex pattern")
});

/// Replace every Unicode "other" character (controls, format characters, unassigned code
/// points) with `replacement`.
///
/// # Examples
///
/// ```
/// use mailwright_mail::text::strip_non_printable;
///
/// assert_eq!(strip_non_printable("a\u{0007}b\tc", ""), "abc");
/// assert_eq!(strip_non_printable("line\nbreak", " "), "line break");
/// ```
pub fn strip_non_printable(text: &str, replacement: &str) -> String {
	NON_PRINTABLE_REGEX.replace_all(text, replacement).into_owned()
}

/// Collapse runs of the space character into a single space. Other whitespace is untouched.
pub fn singletonize_spaces(text: &str) -> String {
	MULTIPLE_SPACES_REGEX.replace_all(text, " ").into_owned()
}

/// Remove leading and trailing whitespace of any Unicode whitespace class.
pub fn trim_whitespace(text: &str) -> String {
	text.trim().to_string()
}

/// Truncate `text` to at most `max` UTF-16 code units.
///
/// A character whose surrogate pair would straddle the limit is dropped entirely.
///
/// # Examples
///
/// ```
/// use mailwright_mail::text::max_length;
///
/// assert_eq!(max_length("report", 3), "rep");
/// assert_eq!(max_length("a😀b", 2), "a");
/// assert_eq!(max_length("short", 64), "short");
/// ```
pub fn max_length(text: &str, max: usize) -> String {
	let mut units = 0;
	let mut end = 0;
	for (idx, ch) in text.char_indices() {
		units += ch.len_utf16();
		if units > max {
			break;
		}
		end = idx + ch.len_utf8();
	}
	text[..end].to_string()
}

/// Length of `text` in UTF-16 code units.
pub fn utf16_len(text: &str) -> usize {
	text.encode_utf16().count()
}

/// Decompose, drop non-spacing marks, recompose.
///
/// Compatibility decomposition is used, so ligatures and similar compatibility characters are
/// folded as well.
///
/// # Examples
///
/// ```
/// use mailwright_mail::text::strip_accents;
///
/// assert_eq!(strip_accents("Árvíztűrő tükörfúrógép"), "Arvizturo tukorfurogep");
/// ```
pub fn strip_accents(text: &str) -> String {
	let decomposed: String = text.nfkd().collect();
	NON_SPACING_MARK_REGEX
		.replace_all(&decomposed, "")
		.nfc()
		.collect()
}

/// Normalize a subject line: non-printables become spaces, then the result is trimmed, then
/// runs of spaces are collapsed.
///
/// # Examples
///
/// ```
/// use mailwright_mail::text::normalize_subject;
///
/// assert_eq!(normalize_subject("\u{0007} Quarterly\r\n   report "), "Quarterly report");
/// ```
pub fn normalize_subject(subject: &str) -> String {
	let replaced = strip_non_printable(subject, " ");
	let trimmed = trim_whitespace(&replaced);
	singletonize_spaces(&trimmed)
}

/// Whether the whole of `text` (after trimming) is one e-mail address.
pub fn is_email(text: &str) -> bool {
	let text = text.trim();
	!text.is_empty() && FULL_EMAIL_REGEX.is_match(text)
}

/// Collect every e-mail address found in free text, in order of appearance.
///
/// # Examples
///
/// ```
/// use mailwright_mail::text::fetch_emails;
///
/// let found = fetch_emails("John <john@example.com>; jane@example.org");
/// assert_eq!(found, vec!["john@example.com", "jane@example.org"]);
/// ```
pub fn fetch_emails(text: &str) -> Vec<String> {
	if text.trim().is_empty() {
		return Vec::new();
	}
	EMAIL_REGEX
		.find_iter(text)
		.map(|m| m.as_str().to_string())
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use rstest::rstest;

	#[rstest]
	#[case("plain", "plain")]
	#[case("tab\there", "tabhere")]
	#[case("zero\u{200B}width", "zerowidth")]
	#[case("bell\u{0007}", "bell")]
	fn test_strip_non_printable(#[case] input: &str, #[case] expected: &str) {
		assert_eq!(strip_non_printable(input, ""), expected);
	}

	#[rstest]
	#[case("a  b", "a b")]
	#[case("a     b  c", "a b c")]
	#[case("a\t\tb", "a\t\tb")]
	#[case(" lead", " lead")]
	fn test_singletonize_spaces(#[case] input: &str, #[case] expected: &str) {
		assert_eq!(singletonize_spaces(input), expected);
	}

	#[test]
	fn test_trim_whitespace_handles_unicode_spaces() {
		// Arrange
		let input = "\u{3000}\u{00A0} text \u{2003}\n";

		// Act
		let trimmed = trim_whitespace(input);

		// Assert
		assert_eq!(trimmed, "text");
	}

	#[rstest]
	#[case("abcdef", 3, "abc")]
	#[case("abc", 3, "abc")]
	#[case("abc", 0, "")]
	#[case("éé", 1, "é")]
	#[case("😀😀", 3, "😀")]
	fn test_max_length_counts_utf16_units(
		#[case] input: &str,
		#[case] max: usize,
		#[case] expected: &str,
	) {
		assert_eq!(max_length(input, max), expected);
	}

	#[rstest]
	#[case("café", "cafe")]
	#[case("Ångström", "Angstrom")]
	#[case("naïve résumé", "naive resume")]
	#[case("ﬁle", "file")]
	#[case("plain", "plain")]
	fn test_strip_accents(#[case] input: &str, #[case] expected: &str) {
		assert_eq!(strip_accents(input), expected);
	}

	#[test]
	fn test_normalize_subject_order_leaves_no_edge_space() {
		// Arrange
		let subject = "\u{0007} Hello  world \u{0008}";

		// Act
		let normalized = normalize_subject(subject);

		// Assert
		assert_eq!(normalized, "Hello world");
	}

	#[test]
	fn test_normalize_subject_replaces_line_breaks() {
		assert_eq!(normalize_subject("Line one\r\nLine two"), "Line one Line two");
	}

	#[rstest]
	#[case("user@example.com", true)]
	#[case("  First.Last+tag@Sub.Example.ORG ", true)]
	#[case("user@localhost", false)]
	#[case("John <john@example.com>", false)]
	#[case("", false)]
	#[case("no-at-sign.example.com", false)]
	fn test_is_email(#[case] input: &str, #[case] expected: bool) {
		assert_eq!(is_email(input), expected);
	}

	#[test]
	fn test_fetch_emails_from_outlook_style_list() {
		// Arrange
		let text = "\"Doe, John\" <john.doe@example.com>; Jane <JANE@example.org>, bogus@";

		// Act
		let emails = fetch_emails(text);

		// Assert
		assert_eq!(emails, vec!["john.doe@example.com", "JANE@example.org"]);
	}

	proptest! {
		#[test]
		fn prop_strip_accents_is_idempotent(s in "\\PC{0,40}") {
			let once = strip_accents(&s);
			let twice = strip_accents(&once);
			prop_assert_eq!(once, twice);
		}

		#[test]
		fn prop_normalized_subject_has_no_edge_or_double_spaces(s in "[ a-z\\x00-\\x1f\\xa0]{0,40}") {
			let normalized = normalize_subject(&s);
			prop_assert_eq!(normalized.trim(), normalized.as_str());
			prop_assert!(!normalized.contains("  "));
		}

		#[test]
		fn prop_max_length_never_exceeds_limit(s in "\\PC{0,40}", max in 0usize..50) {
			prop_assert!(utf16_len(&max_length(&s, max)) <= max);
		}
	}
}
