//! Escaping for text interpolated into generated HTML.

/// Escapes text placed between tags.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for character in text.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Escapes text placed inside a double-quoted attribute. Newlines are kept as entities so
/// multi-line prompt templates survive a round trip through `data-base`.
pub fn escape_attr(text: &str) -> String {
    escape_html(text).replace('\n', "&#10;").replace('\r', "&#13;")
}

/// Escapes text and turns newlines into `<br />`.
pub fn escape_multiline(text: &str) -> String {
    escape_html(text).replace("\r\n", "\n").replace('\n', "<br />\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_significant_characters() {
        assert_eq!(escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#), "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#039;Jerry&#039;&lt;/a&gt;");
    }

    #[test]
    fn attribute_escaping_preserves_newlines_as_entities() {
        assert_eq!(escape_attr("Line {a}\nLine \"b\""), "Line {a}&#10;Line &quot;b&quot;");
    }

    #[test]
    fn multiline_text_gets_line_breaks() {
        assert_eq!(escape_multiline("a\r\nb<c>"), "a<br />\nb&lt;c&gt;");
    }
}
