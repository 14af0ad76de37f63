//! HTML escaping for untrusted text.

/// Escape `&`, `<` and `>` for safe insertion into HTML text content.
///
/// `&` is replaced first so entities introduced here are never re-escaped.
/// Quotes are left alone: escaped text is only ever placed between tags.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
