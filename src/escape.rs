//! HTML special-character escaping for filter output.

use std::borrow::Cow;

/// Escape `&`, `<`, `>`, `"`, and `'` so `text` can be embedded in markup.
///
/// Existing entities are escaped again: `&amp;` becomes `&amp;amp;`.
/// Returns the input unchanged when nothing needs escaping.
#[must_use]
pub fn escape_html(text: &str) -> Cow<'_, str> {
    match escape_html_bytes(text.as_bytes()) {
        Cow::Borrowed(_) => Cow::Borrowed(text),
        Cow::Owned(bytes) => Cow::Owned(
            String::from_utf8(bytes)
                .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned()),
        ),
    }
}

/// Byte-level [`escape_html`].
///
/// Only the five ASCII markup characters are rewritten, so other bytes,
/// including invalid UTF-8, pass through untouched.
#[must_use]
pub fn escape_html_bytes(bytes: &[u8]) -> Cow<'_, [u8]> {
    if !bytes.iter().any(|byte| matches!(byte, b'&' | b'<' | b'>' | b'"' | b'\'')) {
        return Cow::Borrowed(bytes);
    }
    let mut escaped = Vec::with_capacity(bytes.len() + 16);
    for &byte in bytes {
        match byte {
            b'&' => escaped.extend_from_slice(b"&amp;"),
            b'<' => escaped.extend_from_slice(b"&lt;"),
            b'>' => escaped.extend_from_slice(b"&gt;"),
            b'"' => escaped.extend_from_slice(b"&quot;"),
            b'\'' => escaped.extend_from_slice(b"&#039;"),
            _ => escaped.push(byte),
        }
    }
    Cow::Owned(escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#039;Jerry&#039;&lt;/a&gt;"
        );
    }

    #[test]
    fn double_encodes_existing_entities() {
        assert_eq!(escape_html("&lt;"), "&amp;lt;");
    }

    #[test]
    fn plain_text_is_borrowed() {
        assert!(matches!(escape_html("plain text"), Cow::Borrowed("plain text")));
    }

    #[test]
    fn invalid_utf8_bytes_survive_escaping() {
        assert_eq!(escape_html_bytes(b"<caf\xe9>").as_ref(), b"&lt;caf\xe9&gt;");
    }
}
