//! Assistant message rendering.
//!
//! Turns free-form assistant text into a safe HTML fragment. The only
//! structure recognised is:
//! - markdown links `[label](http(s)://...)`
//! - bare `http://` / `https://` URLs preceded by whitespace or the start of the text
//! - blank lines separating paragraphs
//! - lines starting with `-` or `•` forming a bullet list
//!
//! Every character outside a link is escaped exactly once. Rendering is not
//! idempotent: feeding rendered HTML back in escapes it a second time.

use crate::sanitize::escape_html;
use regex::Regex;
use std::sync::OnceLock;

/// Inline content of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    /// Raw, unescaped text. May contain `\n` inside paragraphs.
    Text(String),
    /// A recognised link. `href` is emitted verbatim, `label` is escaped.
    Link { href: String, label: String },
}

/// One block of a rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderBlock {
    Paragraph(Vec<Inline>),
    /// Bullet items in original order, markers stripped.
    List(Vec<Vec<Inline>>),
}

fn markdown_link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\[([^\]]+)\]\((https?://[^\s)"<>]+)\)"#).expect("markdown link regex")
    })
}

fn bare_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(^|\s)(https?://[^\s<)">]+)"#).expect("bare url regex"))
}

fn blank_lines_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{2,}").expect("blank lines regex"))
}

fn line_break_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n").expect("line break regex"))
}

fn bullet_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*[-•]\s+").expect("bullet regex"))
}

/// Render assistant text to an HTML fragment.
///
/// Blocks are joined with `\n`. Empty input renders as `<p></p>`.
pub fn render_message_html(text: &str) -> String {
    parse_blocks(text)
        .iter()
        .map(block_html)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Like [`render_message_html`], treating a missing message as empty text.
pub fn render_optional(text: Option<&str>) -> String {
    render_message_html(text.unwrap_or_default())
}

/// Parse assistant text into blocks without producing HTML.
pub fn parse_blocks(text: &str) -> Vec<RenderBlock> {
    let text = text.replace("\r\n", "\n");
    let inlines = linearize(&text);

    split_inlines(&inlines, blank_lines_regex())
        .into_iter()
        .map(classify)
        .collect()
}

/// Split text into text runs and links. Markdown links are matched first,
/// bare URLs only in the text between them.
fn linearize(text: &str) -> Vec<Inline> {
    let mut inlines = Vec::new();
    let mut cursor = 0;

    for caps in markdown_link_regex().captures_iter(text) {
        let (Some(whole), Some(label), Some(url)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        autolink(&text[cursor..whole.start()], cursor == 0, &mut inlines);
        inlines.push(Inline::Link {
            href: url.as_str().to_string(),
            label: label.as_str().to_string(),
        });
        cursor = whole.end();
    }
    autolink(&text[cursor..], cursor == 0, &mut inlines);

    inlines
}

/// `at_start` tells whether `segment` begins at the start of the whole text;
/// a URL directly after a markdown link is not preceded by whitespace.
fn autolink(segment: &str, at_start: bool, inlines: &mut Vec<Inline>) {
    let mut cursor = 0;

    for caps in bare_url_regex().captures_iter(segment) {
        let (Some(lead), Some(url)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if lead.as_str().is_empty() && !at_start {
            continue;
        }
        push_text(inlines, &segment[cursor..url.start()]);
        inlines.push(Inline::Link {
            href: url.as_str().to_string(),
            label: url.as_str().to_string(),
        });
        cursor = url.end();
    }
    push_text(inlines, &segment[cursor..]);
}

/// Append text, merging with a trailing text run so runs are never adjacent.
fn push_text(inlines: &mut Vec<Inline>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Inline::Text(last)) = inlines.last_mut() {
        last.push_str(text);
    } else {
        inlines.push(Inline::Text(text.to_string()));
    }
}

/// Split on `separator` inside text runs. Links are never split.
fn split_inlines(inlines: &[Inline], separator: &Regex) -> Vec<Vec<Inline>> {
    let mut parts = Vec::new();
    let mut current = Vec::new();

    for inline in inlines {
        match inline {
            Inline::Text(text) => {
                let mut fragments = separator.split(text);
                if let Some(first) = fragments.next() {
                    push_text(&mut current, first);
                }
                for fragment in fragments {
                    parts.push(std::mem::take(&mut current));
                    push_text(&mut current, fragment);
                }
            }
            link => current.push(link.clone()),
        }
    }
    parts.push(current);

    parts
}

fn classify(block: Vec<Inline>) -> RenderBlock {
    let lines = split_inlines(&block, line_break_regex());
    if !lines.iter().any(|line| bullet_marker_len(line).is_some()) {
        return RenderBlock::Paragraph(block);
    }

    // Lines without a marker are dropped from list blocks.
    let items = lines
        .into_iter()
        .filter_map(|mut line| {
            let marker_len = bullet_marker_len(&line)?;
            strip_marker(&mut line, marker_len);
            Some(line)
        })
        .collect();

    RenderBlock::List(items)
}

fn bullet_marker_len(line: &[Inline]) -> Option<usize> {
    match line.first() {
        Some(Inline::Text(text)) => bullet_regex().find(text).map(|m| m.end()),
        _ => None,
    }
}

fn strip_marker(line: &mut Vec<Inline>, marker_len: usize) {
    if let Some(Inline::Text(text)) = line.first_mut() {
        text.replace_range(..marker_len, "");
        if text.is_empty() {
            line.remove(0);
        }
    }
}

fn block_html(block: &RenderBlock) -> String {
    match block {
        RenderBlock::Paragraph(inlines) => {
            format!("<p>{}</p>", inline_html(inlines).replace('\n', "<br>"))
        }
        RenderBlock::List(items) => {
            let mut html = String::from("<ul>");
            for item in items {
                html.push_str("<li>");
                html.push_str(&inline_html(item));
                html.push_str("</li>");
            }
            html.push_str("</ul>");
            html
        }
    }
}

fn inline_html(inlines: &[Inline]) -> String {
    inlines
        .iter()
        .map(|inline| match inline {
            Inline::Text(text) => escape_html(text),
            Inline::Link { href, label } => anchor_html(href, label),
        })
        .collect()
}

fn anchor_html(href: &str, label: &str) -> String {
    format!(
        r#"<a href="{}" target="_blank" rel="noopener noreferrer">{}</a>"#,
        href,
        escape_html(label)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(href: &str, label: &str) -> String {
        format!(r#"<a href="{href}" target="_blank" rel="noopener noreferrer">{label}</a>"#)
    }

    #[test]
    fn test_empty_input_is_one_empty_paragraph() {
        assert_eq!(render_message_html(""), "<p></p>");
        assert_eq!(render_optional(None), "<p></p>");
    }

    #[test]
    fn test_single_newline_becomes_line_break() {
        assert_eq!(render_message_html("line1\nline2"), "<p>line1<br>line2</p>");
    }

    #[test]
    fn test_paragraph_text_is_escaped() {
        assert_eq!(
            render_message_html("a < b & c\nd > e"),
            "<p>a &lt; b &amp; c<br>d &gt; e</p>"
        );
    }

    #[test]
    fn test_blank_lines_split_paragraphs() {
        assert_eq!(render_message_html("a\n\nb"), "<p>a</p>\n<p>b</p>");
        assert_eq!(render_message_html("a\n\n\n\nb"), "<p>a</p>\n<p>b</p>");
    }

    #[test]
    fn test_crlf_is_normalised() {
        assert_eq!(
            render_message_html("a\r\nb\r\n\r\nc"),
            "<p>a<br>b</p>\n<p>c</p>"
        );
    }

    #[test]
    fn test_bullet_list() {
        assert_eq!(
            render_message_html("- a\n- b"),
            "<ul><li>a</li><li>b</li></ul>"
        );
    }

    #[test]
    fn test_bullet_markers_and_indentation() {
        assert_eq!(
            render_message_html("• een\n   -   twee"),
            "<ul><li>een</li><li>twee</li></ul>"
        );
    }

    #[test]
    fn test_list_block_drops_unmarked_lines() {
        assert_eq!(
            render_message_html("Intro\n- a\nlos\n- b"),
            "<ul><li>a</li><li>b</li></ul>"
        );
    }

    #[test]
    fn test_dash_without_space_is_not_a_bullet() {
        assert_eq!(render_message_html("-a\n-b"), "<p>-a<br>-b</p>");
    }

    #[test]
    fn test_mixed_blocks_keep_order() {
        assert_eq!(
            render_message_html("Intro\n\n- a\n- b <i>\n\nSlot"),
            "<p>Intro</p>\n<ul><li>a</li><li>b &lt;i&gt;</li></ul>\n<p>Slot</p>"
        );
    }

    #[test]
    fn test_markdown_link() {
        assert_eq!(
            render_message_html("[Docs](https://example.com/x)"),
            format!("<p>{}</p>", anchor("https://example.com/x", "Docs"))
        );
    }

    #[test]
    fn test_markdown_label_is_escaped() {
        assert_eq!(
            render_message_html("[<b>&</b>](https://x.nl)"),
            format!("<p>{}</p>", anchor("https://x.nl", "&lt;b&gt;&amp;&lt;/b&gt;"))
        );
    }

    #[test]
    fn test_markdown_link_requires_http_scheme() {
        assert_eq!(render_message_html("[a](ftp://x)"), "<p>[a](ftp://x)</p>");
    }

    #[test]
    fn test_bare_url_is_autolinked() {
        assert_eq!(
            render_message_html("See https://example.com for info"),
            format!(
                "<p>See {} for info</p>",
                anchor("https://example.com", "https://example.com")
            )
        );
    }

    #[test]
    fn test_bare_url_at_start_of_text() {
        assert_eq!(
            render_message_html("http://a.nl/b"),
            format!("<p>{}</p>", anchor("http://a.nl/b", "http://a.nl/b"))
        );
    }

    #[test]
    fn test_bare_url_stops_at_closing_paren() {
        assert_eq!(
            render_message_html("zie https://a.nl/x) nu"),
            format!("<p>zie {}) nu</p>", anchor("https://a.nl/x", "https://a.nl/x"))
        );
    }

    #[test]
    fn test_bare_url_needs_whitespace_before_it() {
        assert_eq!(
            render_message_html("(https://a.nl)"),
            "<p>(https://a.nl)</p>"
        );
    }

    #[test]
    fn test_bare_url_label_is_escaped() {
        assert_eq!(
            render_message_html("https://a.nl/?x=1&y=2"),
            format!(
                "<p>{}</p>",
                anchor("https://a.nl/?x=1&y=2", "https://a.nl/?x=1&amp;y=2")
            )
        );
    }

    #[test]
    fn test_url_inside_markdown_link_is_not_wrapped_twice() {
        let html = render_message_html("[https://a.nl](https://b.nl)");
        assert_eq!(html.matches("<a ").count(), 1);
        assert_eq!(html, format!("<p>{}</p>", anchor("https://b.nl", "https://a.nl")));
    }

    #[test]
    fn test_url_glued_to_markdown_link_is_not_linked() {
        let html = render_message_html("[a](https://a.nl)https://b.nl");
        assert_eq!(html.matches("<a ").count(), 1);
        assert!(html.ends_with("</a>https://b.nl</p>"));
    }

    #[test]
    fn test_quote_ends_url() {
        let html = render_message_html(r#"x https://a.nl/"onmouseover="boom"#);
        assert!(html.contains(r#"href="https://a.nl/""#));
        assert!(html.ends_with(r#"</a>"onmouseover="boom</p>"#));
    }

    #[test]
    fn test_links_inside_list_items() {
        assert_eq!(
            render_message_html("- [Docs](https://x.nl/d)\n- meer via https://y.nl"),
            format!(
                "<ul><li>{}</li><li>meer via {}</li></ul>",
                anchor("https://x.nl/d", "Docs"),
                anchor("https://y.nl", "https://y.nl")
            )
        );
    }

    #[test]
    fn test_markup_outside_links_is_escaped() {
        let html = render_message_html("<script>alert(1)</script> https://x.nl");
        assert!(html.starts_with("<p>&lt;script&gt;alert(1)&lt;/script&gt; <a "));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_rendering_twice_escapes_twice() {
        let once = render_message_html("a & b");
        assert_eq!(once, "<p>a &amp; b</p>");
        assert_eq!(render_message_html(&once), "<p>&lt;p&gt;a &amp;amp; b&lt;/p&gt;</p>");
    }

    #[test]
    fn test_parse_blocks_structure() {
        let blocks = parse_blocks("Hoi\n\n- [a](https://a.nl)\n- b");
        assert_eq!(
            blocks,
            vec![
                RenderBlock::Paragraph(vec![Inline::Text("Hoi".to_string())]),
                RenderBlock::List(vec![
                    vec![Inline::Link {
                        href: "https://a.nl".to_string(),
                        label: "a".to_string(),
                    }],
                    vec![Inline::Text("b".to_string())],
                ]),
            ]
        );
    }

    #[test]
    fn test_leading_blank_lines_yield_empty_paragraph() {
        assert_eq!(render_message_html("\n\nabc"), "<p></p>\n<p>abc</p>");
    }
}
