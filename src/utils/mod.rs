//! Utility functions and helpers.

pub mod http;
pub mod log;
pub mod poll;

use url::Url;

/// Check that a string is an absolute http(s) URL.
pub fn is_http_url(candidate: &str) -> bool {
    Url::parse(candidate)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

/// Percent-decode a service key once.
///
/// Registry keys are handed out both raw and URL-encoded; sending an encoded
/// key through the query builder would encode it twice.
pub fn decode_service_key(key: &str) -> String {
    let key = key.trim();
    if !key.contains('%') {
        return key.to_string();
    }
    let protected = key.replace('+', "%2B");
    url::form_urlencoded::parse(format!("k={protected}").as_bytes())
        .next()
        .map(|(_, value)| value.into_owned())
        .unwrap_or_else(|| key.to_string())
}

/// Escape text for HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_http_url() {
        assert!(is_http_url("https://example.com/a.jpg"));
        assert!(is_http_url("http://openapi.animal.go.kr/files/shelter/a.jpg"));
        assert!(!is_http_url("ftp://example.com/a.jpg"));
        assert!(!is_http_url("/files/shelter/a.jpg"));
        assert!(!is_http_url(""));
    }

    #[test]
    fn test_decode_service_key() {
        assert_eq!(decode_service_key("abc%2Fdef%3D%3D"), "abc/def==");
        assert_eq!(decode_service_key("abc+def=="), "abc+def==");
        assert_eq!(decode_service_key("a+b%3D"), "a+b=");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"목줄" & 'tag'</b>"#),
            "&lt;b&gt;&quot;목줄&quot; &amp; &#39;tag&#39;&lt;/b&gt;"
        );
    }
}
